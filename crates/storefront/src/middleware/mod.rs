//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. CORS (only when a separate client origin is configured)
//! 3. `TraceLayer` (request span with a `request_id` field)
//! 4. Request ID (add unique ID to each request)
//! 5. Session layer (tower-sessions)
//!
//! Identity is resolved per handler by the [`CartIdentity`] extractor.

pub mod cors;
pub mod identity;
pub mod request_id;
pub mod session;

pub use cors::create_cors_layer;
pub use identity::{CartIdentity, clear_current_user, current_guest, resolve_identity, set_current_user};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use session::{create_session_layer, postgres_session_store};
