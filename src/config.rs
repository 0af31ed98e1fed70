use crate::error::{ConfigError, ErrorHandler, ForbiddenHandler};
use actix_web::cookie::{Cookie, SameSite, time::Duration};
use actix_web::http::header::HeaderName;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_HEADER: &str = "X-CSRF-Token";
pub const DEFAULT_COOKIE_NAME: &str = "X-CSRF-Token";
pub const DEFAULT_TOKEN_LEN: usize = 32;
/// Upper bound accepted by [`CsrfConfigBuilder::token_length`].
pub const MAX_TOKEN_LEN: usize = 1024;
/// Cookie lifetime in minutes.
pub const DEFAULT_MAX_AGE: i64 = 60;

/// Immutable middleware settings. Build one with [`CsrfConfig::builder`].
#[derive(Clone)]
pub struct CsrfConfig {
    pub(crate) token_length: usize,
    pub(crate) max_age_secs: i64,
    pub(crate) domain: Option<String>,
    pub(crate) path: Option<String>,
    pub(crate) secure: bool,
    pub(crate) same_site: Option<SameSite>,
    pub(crate) header_name: HeaderName,
    pub(crate) cookie_name: String,
    pub(crate) error_handler: Arc<dyn ErrorHandler>,
}

impl CsrfConfig {
    pub fn builder() -> CsrfConfigBuilder {
        CsrfConfigBuilder::default()
    }

    pub fn token_length(&self) -> usize {
        self.token_length
    }

    /// Cookie lifetime in seconds.
    pub fn max_age_secs(&self) -> i64 {
        self.max_age_secs
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub(crate) fn token_cookie(&self, token: &str) -> Cookie<'static> {
        let mut cookie = Cookie::build(self.cookie_name.clone(), token.to_owned())
            .max_age(Duration::seconds(self.max_age_secs))
            .http_only(true)
            .secure(self.secure)
            .finish();

        if let Some(domain) = &self.domain {
            cookie.set_domain(domain.clone());
        }
        if let Some(path) = &self.path {
            cookie.set_path(path.clone());
        }
        if let Some(same_site) = self.same_site {
            cookie.set_same_site(same_site);
        }

        cookie
    }
}

impl Default for CsrfConfig {
    fn default() -> Self {
        CsrfConfig {
            token_length: DEFAULT_TOKEN_LEN,
            max_age_secs: DEFAULT_MAX_AGE * 60,
            domain: None,
            path: None,
            secure: true,
            same_site: None,
            header_name: HeaderName::from_static("x-csrf-token"),
            cookie_name: DEFAULT_COOKIE_NAME.into(),
            error_handler: Arc::new(ForbiddenHandler),
        }
    }
}

impl fmt::Debug for CsrfConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfConfig")
            .field("token_length", &self.token_length)
            .field("max_age_secs", &self.max_age_secs)
            .field("domain", &self.domain)
            .field("path", &self.path)
            .field("secure", &self.secure)
            .field("same_site", &self.same_site)
            .field("header_name", &self.header_name)
            .field("cookie_name", &self.cookie_name)
            .finish_non_exhaustive()
    }
}

/// Collects settings in call order; a later call to the same setter wins.
///
/// Anything left unset falls back to the defaults: 32 byte tokens, a 60
/// minute cookie, no `Domain`, `Secure` on, `X-CSRF-Token` for both the header
/// and the cookie, and the plain text 403 handler.
#[derive(Default)]
pub struct CsrfConfigBuilder {
    token_length: Option<usize>,
    max_age: Option<i64>,
    domain: Option<String>,
    path: Option<String>,
    secure: Option<bool>,
    same_site: Option<SameSite>,
    header_name: Option<String>,
    cookie_name: Option<String>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
}

impl CsrfConfigBuilder {
    /// Number of random bytes before base64 encoding, at most
    /// [`MAX_TOKEN_LEN`].
    pub fn token_length(mut self, len: usize) -> Self {
        self.token_length = Some(len);
        self
    }

    /// Cookie lifetime in minutes.
    pub fn max_age(mut self, minutes: i64) -> Self {
        self.max_age = Some(minutes);
        self
    }

    /// Cookie `Domain`. Leave unset to scope the cookie to the current host.
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Cookie `Secure` flag. Only turn this off for local development over
    /// plain HTTP.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    /// Header inspected on requests and set on responses.
    pub fn request_header(mut self, name: impl Into<String>) -> Self {
        self.header_name = Some(name.into());
        self
    }

    /// Cookie names should not contain whitespace, commas, semicolons,
    /// backslashes or control characters (RFC 6265).
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = Some(name.into());
        self
    }

    pub fn error_handler(mut self, handler: impl ErrorHandler) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Result<CsrfConfig, ConfigError> {
        let defaults = CsrfConfig::default();

        let header_name = match self.header_name.filter(|name| !name.is_empty()) {
            Some(name) => HeaderName::from_bytes(name.as_bytes())
                .map_err(|source| ConfigError::InvalidHeaderName { name, source })?,
            None => defaults.header_name,
        };

        let token_length = match self.token_length.filter(|len| *len > 0) {
            Some(len) if len > MAX_TOKEN_LEN => {
                return Err(ConfigError::InvalidTokenLength {
                    len,
                    max: MAX_TOKEN_LEN,
                });
            }
            Some(len) => len,
            None => defaults.token_length,
        };

        let max_age_secs = match self.max_age.filter(|minutes| *minutes > 0) {
            Some(minutes) => minutes
                .checked_mul(60)
                .ok_or(ConfigError::InvalidMaxAge { minutes })?,
            None => defaults.max_age_secs,
        };

        Ok(CsrfConfig {
            token_length,
            max_age_secs,
            domain: self.domain.filter(|domain| !domain.is_empty()),
            path: self.path.filter(|path| !path.is_empty()),
            secure: self.secure.unwrap_or(defaults.secure),
            same_site: self.same_site,
            header_name,
            cookie_name: self
                .cookie_name
                .filter(|name| !name.is_empty())
                .unwrap_or(defaults.cookie_name),
            error_handler: self.error_handler.unwrap_or(defaults.error_handler),
        })
    }
}
