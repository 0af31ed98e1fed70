use actix_web::http::StatusCode;
use actix_web::http::header::{ContentType, InvalidHeaderName};
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use serde_json::json;

/// Reason a request was rejected by the CSRF middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CsrfError {
    /// The header token is missing, the cookie token is missing, or the two differ.
    #[error("invalid token")]
    InvalidToken,
}

impl ResponseError for CsrfError {
    fn status_code(&self) -> StatusCode {
        StatusCode::FORBIDDEN
    }

    fn error_response(&self) -> HttpResponse {
        forbidden_text(self)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid CSRF header name {name:?}: {source}")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: InvalidHeaderName,
    },

    #[error("CSRF cookie max age of {minutes} minutes is too large")]
    InvalidMaxAge { minutes: i64 },

    #[error("CSRF token length {len} exceeds the maximum of {max} bytes")]
    InvalidTokenLength { len: usize, max: usize },
}

/// Builds the response for a rejected request.
///
/// The handler owns the whole response; the middleware adds nothing to it
/// and does not forward the request.
pub trait ErrorHandler: Send + Sync + 'static {
    fn handle(&self, req: &HttpRequest, err: &CsrfError) -> HttpResponse;
}

impl<F> ErrorHandler for F
where
    F: Fn(&HttpRequest, &CsrfError) -> HttpResponse + Send + Sync + 'static,
{
    fn handle(&self, req: &HttpRequest, err: &CsrfError) -> HttpResponse {
        self(req, err)
    }
}

/// Default handler: `403 Forbidden` with a plain text reason,
/// e.g. `Forbidden - invalid token`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForbiddenHandler;

impl ErrorHandler for ForbiddenHandler {
    fn handle(&self, _req: &HttpRequest, err: &CsrfError) -> HttpResponse {
        forbidden_text(err)
    }
}

/// `403 Forbidden` with a JSON body: `{"error":"invalid token","status":403}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonErrorHandler;

impl ErrorHandler for JsonErrorHandler {
    fn handle(&self, _req: &HttpRequest, err: &CsrfError) -> HttpResponse {
        let status = err.status_code();
        HttpResponse::build(status).json(json!({
            "error": err.to_string(),
            "status": status.as_u16(),
        }))
    }
}

fn forbidden_text(err: &CsrfError) -> HttpResponse {
    let status = StatusCode::FORBIDDEN;
    HttpResponse::build(status)
        .content_type(ContentType::plaintext())
        .body(format!(
            "{} - {}",
            status.canonical_reason().unwrap_or("Forbidden"),
            err
        ))
}
