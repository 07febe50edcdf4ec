//! Tests for `TokenIdentity` over an in-memory SQLite store.

use campus_core::identity::{Attributes, IdentityVerifier, ROLE_ATTRIBUTE};
use campus_store_sqlite::SqliteStore;
use jsonwebtoken::{Algorithm, EncodingKey, Header};

use crate::{Error, TokenClaims, TokenConfig, TokenIdentity};

async fn provider(config: TokenConfig) -> TokenIdentity<SqliteStore> {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  TokenIdentity::new(store, config)
}

fn role(value: &str) -> Attributes {
  Attributes::from([(ROLE_ATTRIBUTE.to_owned(), value.to_owned())])
}

#[tokio::test]
async fn issued_token_verifies_with_current_attributes() {
  let p = provider(TokenConfig::new("s3cret")).await;
  p.set_attributes("sub-1", role("Student")).await.unwrap();

  let token = p.issue("sub-1").await.unwrap();
  let verified = p.verify(&token).await.unwrap();
  assert_eq!(verified.subject_id, "sub-1");
  assert_eq!(verified.role_attribute(), Some("Student"));
}

#[tokio::test]
async fn old_tokens_keep_their_attributes() {
  let p = provider(TokenConfig::new("s3cret")).await;
  p.set_attributes("sub-1", role("Student")).await.unwrap();
  let stale = p.issue("sub-1").await.unwrap();

  p.set_attributes("sub-1", role("Admin")).await.unwrap();
  let fresh = p.issue("sub-1").await.unwrap();

  assert_eq!(p.verify(&stale).await.unwrap().role_attribute(), Some("Student"));
  assert_eq!(p.verify(&fresh).await.unwrap().role_attribute(), Some("Admin"));
}

#[tokio::test]
async fn set_attributes_merges() {
  let p = provider(TokenConfig::new("s3cret")).await;
  p.set_attributes("sub-1", role("Teacher")).await.unwrap();
  p.set_attributes(
    "sub-1",
    Attributes::from([("campus".to_owned(), "north".to_owned())]),
  )
  .await
  .unwrap();

  let attrs = p.attributes("sub-1").await.unwrap().unwrap();
  assert_eq!(attrs.len(), 2);
  assert_eq!(attrs[ROLE_ATTRIBUTE], "Teacher");
}

#[tokio::test]
async fn reserved_attribute_names_are_rejected() {
  let p = provider(TokenConfig::new("s3cret")).await;
  let err = p
    .set_attributes("sub-1", Attributes::from([("exp".to_owned(), "0".to_owned())]))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ReservedAttribute(_)));
}

#[tokio::test]
async fn removed_subject_fails_verification() {
  let p = provider(TokenConfig::new("s3cret")).await;
  let token = p.issue("sub-1").await.unwrap();
  p.remove_subject("sub-1").await.unwrap();

  let err = p.verify(&token).await.unwrap_err();
  assert!(matches!(err, Error::UnknownSubject(s) if s == "sub-1"));
}

#[tokio::test]
async fn wrong_secret_fails_verification() {
  let issuer = provider(TokenConfig::new("one")).await;
  let verifier = provider(TokenConfig::new("two")).await;
  let token = issuer.issue("sub-1").await.unwrap();
  assert!(matches!(verifier.verify(&token).await, Err(Error::Token(_))));
}

#[tokio::test]
async fn issuer_and_audience_are_enforced() {
  let mut strict = TokenConfig::new("s3cret");
  strict.issuer = Some("campus".to_owned());
  strict.audience = Some("campus-api".to_owned());
  let strict = provider(strict).await;

  let token = strict.issue("sub-1").await.unwrap();
  assert!(strict.verify(&token).await.is_ok());

  let lax = provider(TokenConfig::new("s3cret")).await;
  let foreign = lax.issue("sub-1").await.unwrap();
  assert!(matches!(strict.verify(&foreign).await, Err(Error::Token(_))));
}

#[tokio::test]
async fn configured_audience_must_be_present() {
  let mut config = TokenConfig::new("s3cret");
  config.issuer = Some("campus".to_owned());
  config.audience = Some("campus-api".to_owned());
  let p = provider(config).await;
  p.issue("sub-1").await.unwrap();

  let far_future = 4_000_000_000;
  let sign = |iss: Option<&str>, aud: Option<&str>| {
    let claims = TokenClaims {
      sub:        "sub-1".to_owned(),
      iat:        1_000,
      exp:        far_future,
      iss:        iss.map(str::to_owned),
      aud:        aud.map(str::to_owned),
      attributes: Attributes::new(),
    };
    jsonwebtoken::encode(
      &Header::new(Algorithm::HS256),
      &claims,
      &EncodingKey::from_secret(b"s3cret"),
    )
    .unwrap()
  };

  assert!(p.verify(&sign(Some("campus"), Some("campus-api"))).await.is_ok());
  assert!(matches!(
    p.verify(&sign(Some("campus"), None)).await,
    Err(Error::Token(_))
  ));
  assert!(matches!(
    p.verify(&sign(None, Some("campus-api"))).await,
    Err(Error::Token(_))
  ));
}

#[tokio::test]
async fn expired_token_fails_verification() {
  let p = provider(TokenConfig::new("s3cret")).await;
  p.issue("sub-1").await.unwrap();

  let claims = TokenClaims {
    sub:        "sub-1".to_owned(),
    iat:        1_000,
    exp:        2_000,
    iss:        None,
    aud:        None,
    attributes: Attributes::new(),
  };
  let token = jsonwebtoken::encode(
    &Header::new(Algorithm::HS256),
    &claims,
    &EncodingKey::from_secret(b"s3cret"),
  )
  .unwrap();

  assert!(matches!(p.verify(&token).await, Err(Error::Token(_))));
}

#[tokio::test]
async fn garbage_and_empty_subjects() {
  let p = provider(TokenConfig::new("s3cret")).await;
  assert!(p.verify("not-a-token").await.is_err());
  assert!(matches!(p.issue("").await, Err(Error::EmptySubject)));
}
