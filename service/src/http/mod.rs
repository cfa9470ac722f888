//! HTTP utilities and middleware.
//!
//! This module provides the application assembly and the security-header
//! middleware used by the server.

pub mod app;
pub mod security;

pub use app::build_app;
pub use security::{security_headers_middleware, HeaderPolicy};
