//! Request header validation.
//!
//! # Rules (in order)
//! 1. `x-correlation-id` must be present and non-empty; it is echoed on
//!    the response from here on.
//! 2. With an API key secret configured, `x-api-key` must match it.
//!    Failures are a bare 401 that does not say what was wrong.
//! 3. With an API key secret configured, `x-user-id` must be present.
//!
//! On success a [`RequestContext`] is attached to the request extensions.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::http::request::{header_str, X_API_KEY, X_CORRELATION_ID, X_USER_ID};
use crate::http::response::ApiError;
use crate::security::{client_ip, is_exempt, reject};

/// Per-request identity established by the validator.
#[derive(Clone)]
pub struct RequestContext {
    pub correlation_id: String,
    pub api_key: Option<String>,
    pub user_id: Option<String>,
    pub client_ip: Option<IpAddr>,
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("correlation_id", &self.correlation_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("user_id", &self.user_id)
            .field("client_ip", &self.client_ip)
            .finish()
    }
}

/// Compare a presented secret against the configured one.
///
/// Length mismatch returns early; equal-length content is compared in
/// constant time.
pub fn secrets_match(presented: &[u8], expected: &[u8]) -> bool {
    presented.len() == expected.len() && bool::from(presented.ct_eq(expected))
}

/// Stateless checks over the request headers.
pub struct HeaderValidator {
    api_key_secret: Option<String>,
}

impl HeaderValidator {
    /// Any configured secret turns authentication on. Config validation
    /// refuses blank secrets; one that gets here anyway matches nothing.
    pub fn new(api_key_secret: Option<String>) -> Self {
        Self { api_key_secret }
    }

    pub fn requires_api_key(&self) -> bool {
        self.api_key_secret.is_some()
    }

    /// Rule 1.
    pub fn correlation_id<'a>(&self, headers: &'a HeaderMap) -> Result<&'a str, ApiError> {
        header_str(headers, &X_CORRELATION_ID).ok_or(ApiError::MissingHeader("x-correlation-id"))
    }

    /// Rules 2 and 3. Returns the user id when authentication is enabled.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Option<String>, ApiError> {
        let Some(secret) = &self.api_key_secret else {
            return Ok(None);
        };

        let presented = headers
            .get(X_API_KEY)
            .map(|value| value.as_bytes())
            .unwrap_or_default();
        if presented.is_empty() || !secrets_match(presented, secret.as_bytes()) {
            return Err(ApiError::Unauthorized);
        }

        let user_id =
            header_str(headers, &X_USER_ID).ok_or(ApiError::MissingHeader("x-user-id"))?;
        Ok(Some(user_id.to_string()))
    }
}

impl fmt::Debug for HeaderValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderValidator")
            .field("requires_api_key", &self.requires_api_key())
            .finish()
    }
}

/// State for the header validation middleware.
#[derive(Debug)]
pub struct ValidationState {
    pub validator: HeaderValidator,
    pub trust_proxy_hops: usize,
}

impl ValidationState {
    pub fn new(api_key_secret: Option<String>, trust_proxy_hops: usize) -> Self {
        Self {
            validator: HeaderValidator::new(api_key_secret),
            trust_proxy_hops,
        }
    }
}

/// First stage of the security pipeline.
pub async fn header_validation_middleware(
    State(state): State<Arc<ValidationState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if is_exempt(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    let correlation_id = match state.validator.correlation_id(request.headers()) {
        Ok(id) => id.to_string(),
        Err(err) => return reject(err, &request),
    };
    let echo = request.headers().get(X_CORRELATION_ID).cloned();

    let mut response = match state.validator.authenticate(request.headers()) {
        Ok(user_id) => {
            let context = RequestContext {
                api_key: header_str(request.headers(), &X_API_KEY).map(str::to_string),
                client_ip: client_ip::resolve(&request, state.trust_proxy_hops),
                correlation_id,
                user_id,
            };
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(err) => reject(err, &request),
    };

    if let Some(echo) = echo {
        response.headers_mut().insert(X_CORRELATION_ID, echo);
    }
    response
}
