//! Bearer-token identity plumbing.
//!
//! Token issuance and the OAuth dance live entirely at the identity
//! provider; this module only turns an incoming `Authorization: Bearer`
//! header into a verified subject. Every `/api` handler calls
//! [`require_identity`] first; the verified `sub` is the sole authorization
//! input downstream (ownership predicates in SQL).

use std::collections::HashMap;

use anyhow::{Context, Result};
use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

/// Identity attested by the provider: subject id plus profile claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub sub: String,
    pub email: String,
    pub name: String,
}

/// How bearer tokens get verified.
#[derive(Clone)]
pub enum IdentityVerifier {
    /// Ask the identity provider's userinfo endpoint. A valid token yields
    /// the standard `sub`/`email`/`name` claims.
    Remote {
        client: reqwest::Client,
        userinfo_url: String,
    },
    /// Fixture identities keyed by token, for local dev and in-process tests.
    Static(HashMap<String, VerifiedIdentity>),
}

impl IdentityVerifier {
    pub fn from_config(cfg: &mensa_config::IdentityConfig) -> Result<Self> {
        match cfg.mode.as_str() {
            "remote" => {
                let userinfo_url = cfg
                    .userinfo_url
                    .clone()
                    .context("identity.mode=remote requires identity.userinfo_url")?;
                Ok(IdentityVerifier::Remote {
                    client: reqwest::Client::new(),
                    userinfo_url,
                })
            }
            "static" => {
                let map = cfg
                    .static_identities
                    .iter()
                    .map(|s| {
                        (
                            s.token.clone(),
                            VerifiedIdentity {
                                sub: s.sub.clone(),
                                email: s.email.clone(),
                                name: s.name.clone(),
                            },
                        )
                    })
                    .collect();
                Ok(IdentityVerifier::Static(map))
            }
            other => anyhow::bail!("unknown identity.mode {other:?}"),
        }
    }

    pub async fn verify(&self, token: &str) -> Result<VerifiedIdentity, ApiError> {
        match self {
            IdentityVerifier::Remote {
                client,
                userinfo_url,
            } => {
                let resp = client
                    .get(userinfo_url)
                    .bearer_auth(token)
                    .send()
                    .await
                    .map_err(|e| {
                        ApiError::Internal(
                            anyhow::Error::new(e).context("userinfo request failed"),
                        )
                    })?;

                if !resp.status().is_success() {
                    return Err(ApiError::Unauthorized(
                        "Unauthorized. Please login or register.".to_string(),
                    ));
                }

                resp.json::<VerifiedIdentity>().await.map_err(|e| {
                    ApiError::Internal(
                        anyhow::Error::new(e).context("userinfo response malformed"),
                    )
                })
            }
            IdentityVerifier::Static(map) => map.get(token).cloned().ok_or_else(|| {
                ApiError::Unauthorized("Unauthorized. Please login or register.".to_string())
            }),
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ")
}

/// Resolve the acting identity or fail the request with 401.
pub async fn require_identity(
    st: &AppState,
    headers: &HeaderMap,
) -> Result<VerifiedIdentity, ApiError> {
    let token = bearer_token(headers).ok_or_else(|| {
        ApiError::Unauthorized("Unauthorized. Please login or register.".to_string())
    })?;
    st.verifier.verify(token).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer tok-123"),
        );
        assert_eq!(bearer_token(&headers), Some("tok-123"));

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwdw=="),
        );
        assert!(bearer_token(&headers).is_none());
    }

    #[tokio::test]
    async fn static_verifier_maps_tokens() {
        let mut map = HashMap::new();
        map.insert(
            "tok-alice".to_string(),
            VerifiedIdentity {
                sub: "alice".to_string(),
                email: "alice@example.com".to_string(),
                name: "Alice".to_string(),
            },
        );
        let verifier = IdentityVerifier::Static(map);

        let ident = verifier.verify("tok-alice").await.expect("known token");
        assert_eq!(ident.sub, "alice");

        assert!(verifier.verify("tok-unknown").await.is_err());
    }
}
