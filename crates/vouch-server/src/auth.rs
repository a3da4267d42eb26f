//! HTTP Basic auth for supervisors.
//!
//! [`identify_supervisor`] runs in front of the API. A request without an
//! `Authorization` header passes through anonymously; one with valid
//! credentials gets a [`Supervisor`] extension; one with bad credentials is
//! refused outright.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, header},
  middleware::Next,
  response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use vouch_api::Supervisor;

use crate::error::Error;

/// Credentials accepted as valid for this server instance.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Verify Basic credentials from `headers`, returning the username.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<String, Error> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  if username != config.username {
    return Err(Error::Unauthorized);
  }

  let parsed_hash =
    PasswordHash::new(&config.password_hash).map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(username.to_owned())
}

/// Middleware: attach the authenticated [`Supervisor`] to the request.
pub async fn identify_supervisor(
  State(auth): State<Arc<AuthConfig>>,
  mut req: Request,
  next: Next,
) -> Response {
  if req.headers().contains_key(header::AUTHORIZATION) {
    match verify_auth(req.headers(), &auth) {
      Ok(username) => {
        req.extensions_mut().insert(Supervisor(username));
      }
      Err(e) => {
        tracing::warn!(uri = %req.uri(), "rejected supervisor credentials");
        return e.into_response();
      }
    }
  }
  next.run(req).await
}

#[cfg(test)]
mod tests {
  use argon2::{PasswordHasher, password_hash::SaltString};
  use axum::http::HeaderValue;
  use rand_core::OsRng;

  use super::*;

  fn config(password: &str) -> AuthConfig {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();
    AuthConfig { username: "sam".to_string(), password_hash: hash }
  }

  fn headers(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    headers
  }

  fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  #[test]
  fn correct_credentials_yield_username() {
    let config = config("secret");
    let user = verify_auth(&headers(&basic("sam", "secret")), &config).unwrap();
    assert_eq!(user, "sam");
  }

  #[test]
  fn wrong_password() {
    let config = config("secret");
    assert!(matches!(
      verify_auth(&headers(&basic("sam", "wrong")), &config),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn wrong_user() {
    let config = config("secret");
    assert!(matches!(
      verify_auth(&headers(&basic("alex", "secret")), &config),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn missing_header() {
    let config = config("secret");
    assert!(matches!(
      verify_auth(&HeaderMap::new(), &config),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn invalid_base64() {
    let config = config("secret");
    assert!(matches!(
      verify_auth(&headers("Basic !!!not-base64!!!"), &config),
      Err(Error::Unauthorized)
    ));
  }
}
