//! Request handling.
//!
//! # Responsibilities
//! - Name the request ID header
//! - Convert inbound HTTP headers into the form rules match against
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Header values that are not valid UTF-8 cannot match a rule and are dropped

use axum::http::HeaderMap;

use crate::routing::RequestHeaders;

/// Header carrying the request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

impl From<&HeaderMap> for RequestHeaders {
    fn from(headers: &HeaderMap) -> Self {
        let mut out = RequestHeaders::new();
        for (name, value) in headers {
            match value.to_str() {
                Ok(v) => out.insert(name.as_str(), v),
                Err(_) => tracing::debug!(header = %name, "Dropping non UTF-8 header value"),
            }
        }
        out
    }
}
