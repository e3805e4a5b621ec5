//! # Operator Authentication
//!
//! Two endpoints act with the operator's authority: `POST /swaps/complete`
//! prepares the admin-signed attestation of a fiat outcome, and
//! `POST /vaults/initialize` spends the admin's lamports. Both take an
//! [`Operator`] argument, which only extracts when the request carries
//! `X-Operator-Key` equal to `OPERATOR_API_KEY`.
//!
//! ```text
//! request ──> Operator::from_request ──┬── key matches ──> handler
//!                                      └── otherwise ───> 401 UNAUTHORIZED
//! ```

use std::fmt;
use std::future::{ready, Ready};

use actix_web::{
    dev::Payload, error::InternalError, http::StatusCode, web, FromRequest, HttpRequest,
    HttpResponse,
};
use tracing::{error, warn};

use crate::models::ApiResponse;

pub const OPERATOR_KEY_HEADER: &str = "X-Operator-Key";

/// The configured operator secret, registered as `web::Data<OperatorKey>`.
#[derive(Clone)]
pub struct OperatorKey(String);

impl OperatorKey {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Compare without exiting at the first differing byte.
    fn matches(&self, presented: &[u8]) -> bool {
        let expected = self.0.as_bytes();
        if expected.len() != presented.len() {
            return false;
        }
        expected
            .iter()
            .zip(presented)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
    }
}

impl fmt::Debug for OperatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OperatorKey(..)")
    }
}

/// Marker extracted from a request that presented the operator key.
#[derive(Debug)]
pub struct Operator;

impl FromRequest for Operator {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<Operator, actix_web::Error> {
    let Some(key) = req.app_data::<web::Data<OperatorKey>>() else {
        error!("Operator key not registered, refusing {}", req.path());
        return Err(reject(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "Operator authentication is not configured",
        ));
    };

    match req.headers().get(OPERATOR_KEY_HEADER) {
        Some(value) if key.matches(value.as_bytes()) => Ok(Operator),
        Some(_) => {
            warn!("Rejected {} {}: wrong operator key", req.method(), req.path());
            Err(reject(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Invalid operator key"))
        }
        None => {
            warn!("Rejected {} {}: no {}", req.method(), req.path(), OPERATOR_KEY_HEADER);
            Err(reject(
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Operator key required for this endpoint",
            ))
        }
    }
}

fn reject(status: StatusCode, code: &str, message: &str) -> actix_web::Error {
    let response = HttpResponse::build(status).json(ApiResponse::<()>::error(code, message));
    InternalError::from_response(message.to_string(), response).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    const SECRET: &str = "operator-secret-for-tests";

    fn key_data() -> web::Data<OperatorKey> {
        web::Data::new(OperatorKey::new(SECRET))
    }

    #[test]
    fn test_key_comparison() {
        let key = OperatorKey::new(SECRET);
        assert!(key.matches(SECRET.as_bytes()));
        assert!(!key.matches(b"operator-secret-for-test"));
        assert!(!key.matches(b"operator-secret-for-tesTs"));
        assert!(!key.matches(b""));
        assert_eq!(format!("{:?}", key), "OperatorKey(..)");
    }

    #[actix_web::test]
    async fn test_extractor_requires_matching_header() {
        let ok = test::TestRequest::default()
            .app_data(key_data())
            .insert_header((OPERATOR_KEY_HEADER, SECRET))
            .to_http_request();
        assert!(authenticate(&ok).is_ok());

        let wrong = test::TestRequest::default()
            .app_data(key_data())
            .insert_header((OPERATOR_KEY_HEADER, "guess"))
            .to_http_request();
        let err = authenticate(&wrong).unwrap_err();
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);

        let unconfigured = test::TestRequest::default()
            .insert_header((OPERATOR_KEY_HEADER, SECRET))
            .to_http_request();
        let err = authenticate(&unconfigured).unwrap_err();
        assert_eq!(
            err.as_response_error().status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn test_completion_route_refuses_anonymous_callers() {
        let app = test::init_service(
            App::new()
                .app_data(key_data())
                .configure(crate::api::configure_routes),
        )
        .await;

        let body = serde_json::json!({
            "authority": "11111111111111111111111111111111",
            "sequenceIndex": 1,
            "success": false,
            "amount": 100
        });

        for path in ["/swaps/complete", "/vaults/initialize"] {
            let anonymous = test::TestRequest::post()
                .uri(path)
                .set_json(&body)
                .to_request();
            let resp = test::call_service(&app, anonymous).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", path);

            let json: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(json["success"], false);
            assert_eq!(json["error"]["code"], "UNAUTHORIZED");

            let forged = test::TestRequest::post()
                .uri(path)
                .insert_header((OPERATOR_KEY_HEADER, "not-the-operator-key"))
                .set_json(&body)
                .to_request();
            let resp = test::call_service(&app, forged).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", path);
        }

        // The operator gets past authentication. No app state is registered
        // here, so the next extractor fails instead.
        let operator = test::TestRequest::post()
            .uri("/swaps/complete")
            .insert_header((OPERATOR_KEY_HEADER, SECRET))
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, operator).await;
        assert_ne!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
