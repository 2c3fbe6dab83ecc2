use attest_sdk::PrincipalId;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ServerError;

/// Header carrying the authenticated principal, set by the upstream auth
/// layer.
pub const PRINCIPAL_HEADER: &str = "x-principal";

/// The principal making the request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller(pub PrincipalId);

impl Caller {
    pub fn from_parts(parts: &Parts) -> Result<Self, ServerError> {
        let value = parts
            .headers
            .get(PRINCIPAL_HEADER)
            .ok_or_else(|| ServerError::Unauthenticated(format!("missing {PRINCIPAL_HEADER} header")))?;
        let text = value
            .to_str()
            .map_err(|_| ServerError::Unauthenticated(format!("{PRINCIPAL_HEADER} is not valid UTF-8")))?;
        PrincipalId::new(text)
            .map(Self)
            .map_err(|e| ServerError::Unauthenticated(e.to_string()))
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_parts(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(PRINCIPAL_HEADER, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn header_becomes_principal() {
        let caller = Caller::from_parts(&parts(Some("alice"))).unwrap();
        assert_eq!(caller.0.as_str(), "alice");
    }

    #[test]
    fn missing_or_blank_header_is_rejected() {
        assert!(matches!(
            Caller::from_parts(&parts(None)),
            Err(ServerError::Unauthenticated(_))
        ));
        assert!(matches!(
            Caller::from_parts(&parts(Some("   "))),
            Err(ServerError::Unauthenticated(_))
        ));
    }
}
