/// Connection authentication.
///
/// The credential is looked for, in order, in the `Authorization: Bearer`
/// header, a `token.<t>` entry of `Sec-WebSocket-Protocol` (browsers cannot set
/// headers on a websocket), and finally the `token` query parameter. A token
/// carried as a subprotocol must be echoed back in the upgrade response, or
/// the browser aborts the handshake.
use std::borrow::Cow;
use std::collections::HashMap;

use actix_web::HttpRequest;
use actix_web::http::header;
use log::debug;
use thiserror::Error;

use crate::config::server::TokenGrant;
use crate::server::types::Principal;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("no authorization token provided")]
    MissingToken,

    #[error("invalid token")]
    InvalidToken,
}

/// Resolves a bearer credential to the principal it was issued to.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, token: &str) -> Result<Principal, AuthError>;
}

/// Fixed token table loaded from configuration.
#[derive(Debug, Default)]
pub struct StaticTokenAuthenticator {
    grants: HashMap<String, Principal>,
}

impl StaticTokenAuthenticator {
    pub fn new(grants: &[TokenGrant]) -> Self {
        let grants = grants
            .iter()
            .map(|g| {
                (
                    g.token.clone(),
                    Principal::new(g.user_id.clone(), g.display_name.clone()),
                )
            })
            .collect();
        Self { grants }
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

impl Authenticator for StaticTokenAuthenticator {
    fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        self.grants.get(token).cloned().ok_or(AuthError::InvalidToken)
    }
}

/// A credential and, when it arrived as a subprotocol, the exact entry to echo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub subprotocol: Option<String>,
}

impl Credential {
    fn bare(token: &str) -> Self {
        Self {
            token: token.to_string(),
            subprotocol: None,
        }
    }
}

/// Outcome of a successful upgrade check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    pub principal: Principal,
    pub subprotocol: Option<String>,
}

pub fn extract_credential(req: &HttpRequest) -> Option<Credential> {
    let headers = req.headers();

    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        let mut parts = value.split_whitespace();
        if let (Some(scheme), Some(token), None) = (parts.next(), parts.next(), parts.next()) {
            if scheme.eq_ignore_ascii_case("bearer") {
                return Some(Credential::bare(token));
            }
        }
    }

    if let Some(protocols) = headers
        .get(header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(entry) = protocols
            .split(',')
            .map(str::trim)
            .find(|p| p.starts_with("token."))
        {
            return Some(Credential {
                token: entry["token.".len()..].to_string(),
                subprotocol: Some(entry.to_string()),
            });
        }
    }

    for kv in req.query_string().split('&') {
        let mut split = kv.splitn(2, '=');
        if let (Some("token"), Some(raw)) = (split.next(), split.next()) {
            let token = urlencoding::decode(raw)
                .unwrap_or(Cow::Borrowed(""))
                .into_owned();
            if !token.is_empty() {
                return Some(Credential::bare(&token));
            }
        }
    }

    debug!("[Auth] No credential on {}", req.path());
    None
}

/// Extract and check the credential of an upgrade request.
pub fn authenticate_request(
    req: &HttpRequest,
    authenticator: &dyn Authenticator,
) -> Result<Authenticated, AuthError> {
    let credential = extract_credential(req).ok_or(AuthError::MissingToken)?;
    let principal = authenticator.authenticate(&credential.token)?;
    Ok(Authenticated {
        principal,
        subprotocol: credential.subprotocol,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn authenticator() -> StaticTokenAuthenticator {
        StaticTokenAuthenticator::new(&[TokenGrant {
            token: "s3cr3t/x".to_string(),
            user_id: "u1".to_string(),
            display_name: "alice".to_string(),
        }])
    }

    fn token_of(req: &HttpRequest) -> Option<String> {
        extract_credential(req).map(|c| c.token)
    }

    #[test]
    fn bearer_header() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer abc"))
            .to_http_request();
        assert_eq!(extract_credential(&req), Some(Credential::bare("abc")));

        let req = TestRequest::default()
            .insert_header(("Authorization", "Basic abc"))
            .to_http_request();
        assert_eq!(extract_credential(&req), None);
    }

    #[test]
    fn websocket_protocol_header_keeps_the_entry_to_echo() {
        let req = TestRequest::default()
            .insert_header(("Sec-WebSocket-Protocol", "chess, token.xyz"))
            .to_http_request();
        assert_eq!(
            extract_credential(&req),
            Some(Credential {
                token: "xyz".to_string(),
                subprotocol: Some("token.xyz".to_string()),
            })
        );
    }

    #[test]
    fn query_parameter_is_url_decoded() {
        let req = TestRequest::with_uri("/ws?foo=1&token=s3cr3t%2Fx").to_http_request();
        assert_eq!(token_of(&req).as_deref(), Some("s3cr3t/x"));
        assert_eq!(
            authenticate_request(&req, &authenticator()),
            Ok(Authenticated {
                principal: Principal::new("u1", "alice"),
                subprotocol: None,
            })
        );
    }

    #[test]
    fn missing_and_unknown_tokens() {
        let auth = authenticator();
        let req = TestRequest::with_uri("/ws").to_http_request();
        assert_eq!(
            authenticate_request(&req, &auth),
            Err(AuthError::MissingToken)
        );
        assert_eq!(auth.authenticate("nope"), Err(AuthError::InvalidToken));
        assert_eq!(auth.authenticate(""), Err(AuthError::MissingToken));
    }
}
