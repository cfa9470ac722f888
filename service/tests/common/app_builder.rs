//! Test app builder sharing the production `build_app` wiring.
//!
//! Unlike ad-hoc routers, everything built here goes through the same
//! [`ironhat_api::http::build_app`] path as `main.rs`, so layer ordering in
//! tests always matches production. The builder only adjusts configuration.
//!
//! # Preset Builders
//!
//! - [`TestAppBuilder::with_defaults()`] - Full app with the default policy
//! - [`TestAppBuilder::without_security_headers()`] - Policy layer disabled

use axum::Router;
use ironhat_api::{
    build_info::BuildInfoProvider,
    config::{Config, SecurityHeadersConfig},
    http::build_app,
};

/// Builder for test applications configured like production.
pub struct TestAppBuilder {
    config: Config,
    build_info: BuildInfoProvider,
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAppBuilder {
    /// Create a builder with default configuration and static paths anchored
    /// to the crate directory (integration tests may run from elsewhere).
    #[must_use]
    pub fn new() -> Self {
        let mut config = Config::default();
        config.static_files.public_dir = format!("{}/public", env!("CARGO_MANIFEST_DIR"));
        config.static_files.index_file =
            format!("{}/views/index.html", env!("CARGO_MANIFEST_DIR"));

        Self {
            config,
            build_info: BuildInfoProvider::from_env(),
        }
    }

    // =========================================================================
    // Preset Builders
    // =========================================================================

    /// Full app with the default security policy.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new()
    }

    /// Full app with the policy layer disabled.
    #[must_use]
    pub fn without_security_headers() -> Self {
        let mut builder = Self::new();
        builder.config.security_headers.enabled = false;
        builder
    }

    // =========================================================================
    // Component Configuration
    // =========================================================================

    /// Replace the security headers configuration.
    #[must_use]
    pub fn with_security_headers(mut self, security_headers: SecurityHeadersConfig) -> Self {
        self.config.security_headers = security_headers;
        self
    }

    /// Use a custom build info provider.
    #[must_use]
    pub fn with_build_info(mut self, provider: BuildInfoProvider) -> Self {
        self.build_info = provider;
        self
    }

    // =========================================================================
    // Build
    // =========================================================================

    /// Build the Axum router through the production assembly path.
    ///
    /// # Panics
    /// Panics if the configured policy fails to compile; tests construct
    /// valid policies, so this indicates a test bug.
    #[must_use]
    pub fn build(self) -> Router {
        build_app(&self.config, &self.build_info).expect("app builds")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_default_builder_serves_api_health() {
        let app = TestAppBuilder::with_defaults().build();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/_api/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_disabled_builder_omits_policy_headers() {
        let app = TestAppBuilder::without_security_headers().build();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/_api/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("x-frame-options").is_none());
    }
}
