//! Common types used throughout the middleware chain.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;
use warden_core::ApiError;

/// The HTTP request type used in the middleware chain.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the middleware chain.
pub type Response = http::Response<Full<Bytes>>;

/// What every stage and handler returns.
///
/// `Ok(())` means the request was handled and, by the time it reaches the
/// outermost stage, a response is in the context.
pub type StageResult = Result<(), ApiError>;

const FALLBACK_ERROR_BODY: &str = r#"{"error":"Internal Server Error"}"#;

/// Builds a response with a JSON body.
///
/// # Errors
///
/// Returns `ApiError::Internal` if `value` cannot be serialized.
pub fn json_response<T: Serialize + ?Sized>(
    status: StatusCode,
    value: &T,
) -> Result<Response, ApiError> {
    let body = serde_json::to_vec(value)
        .map_err(|e| ApiError::internal_with_source("failed to encode response body", e))?;
    Ok(with_json_body(status, Bytes::from(body)))
}

/// Builds a response with no body.
#[must_use]
pub fn empty_response(status: StatusCode) -> Response {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

/// Builds the client-facing response for an error.
///
/// Only [`ApiError::to_body`] reaches the client.
#[must_use]
pub fn error_response(err: &ApiError) -> Response {
    let body = serde_json::to_vec(&err.to_body())
        .map_or_else(|_| Bytes::from_static(FALLBACK_ERROR_BODY.as_bytes()), Bytes::from);
    with_json_body(err.status_code(), body)
}

fn with_json_body(status: StatusCode, body: Bytes) -> Response {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use warden_core::FieldErrors;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_json_response() {
        let response = json_response(StatusCode::OK, &serde_json::json!({"status": "OK"})).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(body_json(response).await["status"], "OK");
    }

    #[test]
    fn test_empty_response() {
        let response = empty_response(StatusCode::NO_CONTENT);
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn test_error_response_hides_cause() {
        let err = ApiError::authentication("token expired");
        let response = error_response(&err);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body, serde_json::json!({"error": "Unauthorized"}));
    }

    #[tokio::test]
    async fn test_error_response_validation_fields() {
        let mut fields = FieldErrors::new();
        fields.add("email", "must be a valid email address");
        let response = error_response(&ApiError::validation("data validation error", fields));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "data validation error");
        assert_eq!(body["fields"][0]["field"], "email");
        assert_eq!(body["fields"][0]["error"], "must be a valid email address");
    }
}
