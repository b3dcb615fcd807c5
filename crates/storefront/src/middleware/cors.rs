//! CORS for a browser client served from another origin.

use axum::http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::CorsLayer;

use super::request_id::REQUEST_ID_HEADER;
use crate::config::StorefrontConfig;

/// Build the CORS layer, or `None` when no client origin is configured.
///
/// Credentials are allowed so the session cookie travels with requests.
#[must_use]
pub fn create_cors_layer(config: &StorefrontConfig) -> Option<CorsLayer> {
    let origin = config.client_base_url.as_deref()?;
    let origin = match HeaderValue::from_str(origin.trim_end_matches('/')) {
        Ok(origin) => origin,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring invalid CLIENT_BASE_URL");
            return None;
        }
    };

    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([
                header::CONTENT_TYPE,
                header::CACHE_CONTROL,
                HeaderName::from_static(REQUEST_ID_HEADER),
            ])
            .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)]),
    )
}
