//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (CSP, frame and isolation policies)
//! 5. Session layer (tower-sessions with in-memory store)
//! 6. Error pages (`crate::routes::errors`, renders failures in the layout)
//! 7. Access gate (role check, periodic `/auth/me` revalidation)
//! 8. Rate limiting on auth and review forms (governor, per route)

pub mod auth;
pub mod flash;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    AuthSession, OptionalAuth, RequireAuth, access_gate, clear_current_user, expire_session,
    set_current_user,
};
pub use flash::{push_flash, take_flashes};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::{REQUEST_ID_HEADER, current_request_id, request_id_middleware, request_span};
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
