//! `campus` operator binary.
//!
//! Reads `campus.toml` (or the path given with `--config`), opens the SQLite
//! store, and runs one administrative command against it.
//!
//! # First start
//!
//! ```text
//! campus hash-secret            # paste the output into setup_key_hash
//! campus bootstrap-admin --id root --email root@example.com --display-name Root
//! ```

use std::{
  io::{self, BufRead, Write},
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use campus_core::principal::Principal;
use campus_engine::{Campus, NewAdmin, secret};
use campus_identity::TokenIdentity;
use campus_store_sqlite::SqliteStore;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

mod settings;

use settings::CampusConfig;

#[derive(Parser)]
#[command(author, version, about = "Campus operator tool")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "campus.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Print the argon2 hash of a secret entered on stdin and exit.
  HashSecret,
  /// Create the first administrator. Prompts for the setup key.
  BootstrapAdmin {
    #[arg(long)]
    id:           String,
    #[arg(long)]
    email:        String,
    #[arg(long)]
    display_name: String,
  },
  /// Rewrite legacy role discriminants in stored users.
  NormalizeRoles,
  /// Mint a bearer token for a subject.
  IssueToken { subject: String },
  /// Resolve a bearer token to its principal.
  Whoami { token: String },
  /// Log an administrator in. Prompts for the admin verification code.
  AdminLogin { token: String },
  /// List every stored user.
  ListUsers,
}

type Engine = Campus<SqliteStore, TokenIdentity<SqliteStore>>;

/// The engine plus the concrete token provider behind it.
struct Runtime {
  campus:   Engine,
  identity: Arc<TokenIdentity<SqliteStore>>,
}

impl Runtime {
  async fn load(config_path: &Path) -> anyhow::Result<Self> {
    let cfg = CampusConfig::load(config_path)?;
    let store_path = cfg.store_path();
    let store = SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?;

    let identity = Arc::new(TokenIdentity::new(store.clone(), cfg.token.clone()));
    let campus = Campus::new(
      Arc::new(store),
      Arc::clone(&identity),
      cfg.setup_key_hash.clone(),
    )
    .with_admin_code_hash(cfg.admin_code_hash.clone());
    Ok(Self { campus, identity })
  }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();

  match cli.command {
    Command::HashSecret => {
      let secret = read_secret("Secret: ")?;
      println!("{}", secret::hash_secret(&secret)?);
    }

    Command::BootstrapAdmin {
      id,
      email,
      display_name,
    } => {
      let rt = Runtime::load(&cli.config).await?;
      let setup_key = read_secret("Setup key: ")?;
      let admin = rt
        .campus
        .admin
        .bootstrap_admin(&setup_key, NewAdmin {
          id,
          email,
          display_name,
        })
        .await
        .context("bootstrap refused")?;
      let token = rt.identity.issue(&admin.id).await?;
      tracing::info!(user_id = %admin.id, "administrator created");
      println!("{token}");
    }

    Command::NormalizeRoles => {
      let rt = Runtime::load(&cli.config).await?;
      let rewritten = rt.campus.users.normalize_roles().await?;
      println!("{rewritten} user document(s) rewritten");
    }

    Command::IssueToken { subject } => {
      let rt = Runtime::load(&cli.config).await?;
      // Such a token verifies but resolves to NotFound until the user exists.
      if rt.campus.users.find(&subject).await?.is_none() {
        tracing::warn!(subject_id = %subject, "issuing a token for an unregistered subject");
      }
      println!("{}", rt.identity.issue(&subject).await?);
    }

    Command::Whoami { token } => {
      let rt = Runtime::load(&cli.config).await?;
      let principal = rt
        .campus
        .auth
        .resolve(&token)
        .await
        .context("could not resolve token")?;
      print_principal(&principal);
    }

    Command::AdminLogin { token } => {
      let rt = Runtime::load(&cli.config).await?;
      let code = read_secret("Admin code: ")?;
      let principal = rt
        .campus
        .auth
        .admin_login(&token, &code)
        .await
        .context("admin login refused")?;
      tracing::info!(user_id = %principal.subject_id, "administrator logged in");
      print_principal(&principal);
    }

    Command::ListUsers => {
      let rt = Runtime::load(&cli.config).await?;
      for user in rt.campus.users.list().await? {
        println!(
          "{}\t{}\t{}\t{}",
          user.id,
          user.role(),
          user.email,
          user.display_name
        );
      }
    }
  }

  Ok(())
}

fn print_principal(principal: &Principal) {
  println!("subject: {}", principal.subject_id);
  println!("role:    {}", principal.role);
  for (key, value) in &principal.attributes {
    println!("  {key}: {value}");
  }
}

/// Read one line from stdin after printing `prompt` to stderr.
fn read_secret(prompt: &str) -> anyhow::Result<String> {
  eprint!("{prompt}");
  io::stderr().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}
