//! [`TokenIdentity`], the HS256 implementation of [`IdentityVerifier`].

use campus_core::{
  identity::{Attributes, IdentityVerifier, VerifiedIdentity},
  store::{Collection, Document, DocumentStore, from_document, to_document},
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  claims::{RESERVED, TokenClaims},
  config::TokenConfig,
};

/// Server-side record of one subject, stored in [`Collection::Identities`].
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityRecord {
  #[serde(default)]
  attributes:     Attributes,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  last_issued_at: Option<chrono::DateTime<Utc>>,
}

fn now_secs() -> u64 { u64::try_from(Utc::now().timestamp()).unwrap_or_default() }

/// Issues and verifies bearer tokens, keeping subject attributes in `S`.
pub struct TokenIdentity<S> {
  store:      S,
  config:     TokenConfig,
  encoding:   EncodingKey,
  decoding:   DecodingKey,
  validation: Validation,
}

impl<S: DocumentStore> TokenIdentity<S> {
  pub fn new(store: S, config: TokenConfig) -> Self {
    // jsonwebtoken only checks `iss`/`aud` when present, so configured ones
    // must also be required.
    let mut required = vec!["exp", "sub"];
    if config.issuer.is_some() {
      required.push("iss");
    }
    if config.audience.is_some() {
      required.push("aud");
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&required);

    if let Some(aud) = &config.audience {
      validation.set_audience(&[aud]);
    } else {
      validation.validate_aud = false;
    }

    if let Some(iss) = &config.issuer {
      validation.set_issuer(&[iss]);
    }

    Self {
      encoding: EncodingKey::from_secret(config.secret.as_bytes()),
      decoding: DecodingKey::from_secret(config.secret.as_bytes()),
      store,
      config,
      validation,
    }
  }

  pub fn config(&self) -> &TokenConfig { &self.config }

  async fn record(&self, subject_id: &str) -> Result<Option<IdentityRecord>> {
    let doc = self
      .store
      .get(Collection::Identities, subject_id)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;
    Ok(doc.map(from_document).transpose()?)
  }

  async fn write_record(&self, subject_id: &str, fields: Document) -> Result<()> {
    self
      .store
      .merge(Collection::Identities, subject_id, fields)
      .await
      .map_err(|e| Error::Store(Box::new(e)))
  }

  /// Mint a token for `subject_id`, registering the subject if it is new.
  /// The token carries the subject's attributes as they are right now.
  pub async fn issue(&self, subject_id: &str) -> Result<String> {
    if subject_id.is_empty() {
      return Err(Error::EmptySubject);
    }

    let mut record = self.record(subject_id).await?.unwrap_or_default();
    record.last_issued_at = Some(Utc::now());
    self.write_record(subject_id, to_document(&record)?).await?;

    let iat = now_secs();
    let claims = TokenClaims {
      sub: subject_id.to_owned(),
      iat,
      exp: iat.saturating_add(self.config.ttl_seconds),
      iss: self.config.issuer.clone(),
      aud: self.config.audience.clone(),
      attributes: record.attributes,
    };

    let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
    tracing::debug!(subject_id, "issued token");
    Ok(token)
  }

  /// Decode and validate a token's claims without consulting the store.
  pub fn decode_claims(&self, token: &str) -> Result<TokenClaims> {
    let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &self.validation)
      .inspect_err(|e| tracing::debug!(error = %e, "token validation failed"))?;
    Ok(data.claims)
  }

  /// The subject's current server-side attributes.
  pub async fn attributes(&self, subject_id: &str) -> Result<Option<Attributes>> {
    Ok(self.record(subject_id).await?.map(|r| r.attributes))
  }
}

// ─── IdentityVerifier impl ───────────────────────────────────────────────────

impl<S: DocumentStore> IdentityVerifier for TokenIdentity<S> {
  type Error = Error;

  async fn verify(&self, token: &str) -> Result<VerifiedIdentity> {
    let claims = self.decode_claims(token)?;

    // An empty subject is passed through; callers reject it.
    if !claims.sub.is_empty() && self.record(&claims.sub).await?.is_none() {
      return Err(Error::UnknownSubject(claims.sub));
    }

    Ok(VerifiedIdentity {
      subject_id: claims.sub,
      attributes: claims.attributes,
    })
  }

  async fn set_attributes(&self, subject_id: &str, attributes: Attributes) -> Result<()> {
    if let Some(key) = attributes.keys().find(|k| RESERVED.contains(&k.as_str())) {
      return Err(Error::ReservedAttribute(key.clone()));
    }

    let mut record = self.record(subject_id).await?.unwrap_or_default();
    record.attributes.extend(attributes);

    let mut fields = Document::new();
    fields.insert(
      "attributes".to_owned(),
      serde_json::to_value(&record.attributes)?,
    );
    self.write_record(subject_id, fields).await
  }

  async fn remove_subject(&self, subject_id: &str) -> Result<()> {
    self
      .store
      .delete(Collection::Identities, subject_id)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;
    tracing::debug!(subject_id, "removed subject");
    Ok(())
  }
}
