//! Stateless double-submit cookie CSRF protection for actix-web.
//!
//! Every forwarded response carries a fresh token twice: in a cookie and in a
//! response header of the same name. Client script keeps the latest header
//! value and echoes it back in the request header on every state-changing
//! request; the browser sends the `HttpOnly` cookie on its own. The
//! middleware accepts the request only when the header and the cookie sent
//! with it are equal.

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::http::Method;
use actix_web::http::header::{self, HeaderValue};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures_util::future::{LocalBoxFuture, Ready, err, ok};
use std::rc::Rc;
use std::sync::Arc;

mod config;
mod error;
mod token;

pub use config::{
    CsrfConfig, CsrfConfigBuilder, DEFAULT_COOKIE_NAME, DEFAULT_HEADER, DEFAULT_MAX_AGE,
    DEFAULT_TOKEN_LEN, MAX_TOKEN_LEN,
};
pub use error::{ConfigError, CsrfError, ErrorHandler, ForbiddenHandler, JsonErrorHandler};
pub use token::{TokenGenerator, eq_csrf_tokens, eq_tokens};

/// Returns true for methods exempt from validation: `GET`, `HEAD`, `OPTIONS`
/// and `TRACE`. The match is exact and case-sensitive.
pub fn is_safe_method(method: &Method) -> bool {
    matches!(method.as_str(), "GET" | "HEAD" | "OPTIONS" | "TRACE")
}

/// Middleware factory. Wrap an `App` or scope with it.
///
/// All workers built from one factory share its [`TokenGenerator`].
///
/// The token header and cookie are written after the wrapped service returns,
/// so they replace any header or cookie of the same name set by a handler.
#[derive(Clone)]
pub struct CsrfMiddleware {
    config: Arc<CsrfConfig>,
    generator: Arc<TokenGenerator>,
}

impl CsrfMiddleware {
    pub fn new(config: CsrfConfig) -> Self {
        Self::with_generator(config, Arc::new(TokenGenerator::new()))
    }

    /// Uses the given generator instead of a freshly seeded one.
    pub fn with_generator(config: CsrfConfig, generator: Arc<TokenGenerator>) -> Self {
        Self {
            config: Arc::new(config),
            generator,
        }
    }
}

impl Default for CsrfMiddleware {
    fn default() -> Self {
        Self::new(CsrfConfig::default())
    }
}

impl<S, B> Transform<S, ServiceRequest> for CsrfMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = CsrfMiddlewareImpl<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(CsrfMiddlewareImpl {
            service: Rc::new(service),
            config: Arc::clone(&self.config),
            generator: Arc::clone(&self.generator),
        })
    }
}

pub struct CsrfMiddlewareImpl<S> {
    service: Rc<S>,
    config: Arc<CsrfConfig>,
    generator: Arc<TokenGenerator>,
}

impl<S> CsrfMiddlewareImpl<S> {
    // Compares the header token against the cookie token of the same request.
    fn validate(&self, req: &ServiceRequest) -> Result<(), CsrfError> {
        let header_token = req
            .headers()
            .get(&self.config.header_name)
            .and_then(|hv| hv.to_str().ok())
            .filter(|token| !token.is_empty())
            .ok_or(CsrfError::InvalidToken)?;

        let cookie = req
            .cookie(&self.config.cookie_name)
            .ok_or(CsrfError::InvalidToken)?;
        let cookie_token = cookie.value();
        if cookie_token.is_empty() {
            return Err(CsrfError::InvalidToken);
        }

        if eq_csrf_tokens(header_token, cookie_token) {
            Ok(())
        } else {
            Err(CsrfError::InvalidToken)
        }
    }
}

impl<S, B> Service<ServiceRequest> for CsrfMiddlewareImpl<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if !is_safe_method(req.method()) {
            if let Err(e) = self.validate(&req) {
                log::warn!("CSRF check failed for {} {}: {}", req.method(), req.path(), e);
                let response = self.config.error_handler.handle(req.request(), &e);
                return Box::pin(ok(req.into_response(response).map_into_right_body()));
            }
        }

        let token = self.generator.generate(self.config.token_length);
        let cookie = self.config.token_cookie(&token);
        let header_name = self.config.header_name.clone();
        req.extensions_mut().insert(CsrfToken(token.clone()));

        let fut = self.service.call(req);

        Box::pin(async move {
            let mut res = fut.await?.map_into_left_body();

            res.headers_mut()
                .insert(header_name, HeaderValue::from_str(&token)?);
            res.response_mut().add_cookie(&cookie)?;
            res.headers_mut()
                .append(header::VARY, HeaderValue::from_static("Cookie"));
            log::debug!("issued new CSRF token for {}", res.request().path());

            Ok(res)
        })
    }
}

/// The token issued with the current response.
///
/// Available to handlers behind [`CsrfMiddleware`], e.g. to embed it in a
/// rendered page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsrfToken(pub String);

impl FromRequest for CsrfToken {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        match req.extensions().get::<CsrfToken>() {
            Some(token) => ok(token.clone()),
            None => {
                log::error!("CsrfToken extractor used without CSRF middleware");
                err(actix_web::error::ErrorInternalServerError(
                    "CSRF middleware is not configured",
                ))
            }
        }
    }
}
