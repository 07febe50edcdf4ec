//! Operator configuration: a TOML file overlaid with `CAMPUS_*` variables.
//!
//! Nested keys use a double underscore, e.g. `CAMPUS_TOKEN__SECRET`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use campus_identity::TokenConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CampusConfig {
  /// SQLite database file; a leading `~/` is expanded.
  pub store_path:      PathBuf,
  pub token:           TokenConfig,
  /// Argon2 PHC string of the setup key. Without it `bootstrap-admin` is
  /// refused.
  #[serde(default)]
  pub setup_key_hash:  Option<String>,
  /// Argon2 PHC string of the admin verification code. Without it
  /// `admin-login` is refused.
  #[serde(default)]
  pub admin_code_hash: Option<String>,
}

impl CampusConfig {
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path.to_path_buf()).required(false))
      .add_source(
        config::Environment::with_prefix("CAMPUS")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise CampusConfig")
  }

  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
