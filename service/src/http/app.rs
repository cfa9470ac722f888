//! Application assembly.
//!
//! Builds the full request pipeline from a validated [`Config`]:
//! [security headers (outermost)] → [`GET /` index] → [`/_api` sub-router]
//! → [static assets] → [fallback: index document]. `main` and the
//! integration tests share this one wiring path.

use std::sync::Arc;

use axum::{middleware, Extension, Router};
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::{
    api,
    build_info::BuildInfoProvider,
    config::Config,
    http::security::{security_headers_middleware, HeaderPolicy, HeaderPolicyError},
};

/// Build the application router.
///
/// The configuration is constructed once at startup and passed by
/// reference; nothing in the pipeline mutates it afterwards.
///
/// # Errors
/// Returns [`HeaderPolicyError`] if the configured security policy cannot
/// be compiled into header values. Startup must abort in that case rather
/// than serve with a broken policy.
pub fn build_app(
    config: &Config,
    build_info: &BuildInfoProvider,
) -> Result<Router, HeaderPolicyError> {
    let index = ServeFile::new(&config.static_files.index_file);

    let mut app = Router::new()
        .route_service("/", index.clone())
        .nest("/_api", api::router())
        // Unknown paths fall through the asset directory to the index
        // document, so the static site keeps working for client-side routes
        .fallback_service(ServeDir::new(&config.static_files.public_dir).fallback(index))
        .layer(Extension(build_info.build_info()))
        .layer(TraceLayer::new_for_http());

    // Security headers are the outermost layer so every response, including
    // static files and fallbacks, carries the policy
    if config.security_headers.enabled {
        let policy = Arc::new(HeaderPolicy::from_config(&config.security_headers)?);
        tracing::info!(steps = policy.steps().len(), "security header policy compiled");
        app = app
            .layer(middleware::from_fn(security_headers_middleware))
            .layer(Extension(policy));
    } else {
        tracing::warn!("security headers disabled by configuration");
    }

    Ok(app)
}
