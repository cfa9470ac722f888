//! Security headers middleware for HTTP responses.
//!
//! This module compiles a [`SecurityHeadersConfig`] into a [`HeaderPolicy`],
//! an explicit ordered list of header mutations (fingerprint removal,
//! clickjacking and MIME-sniffing protection, HSTS, DNS-prefetch control,
//! optional cache busting, CSP) applied to every outgoing response.

use std::sync::Arc;

use axum::{
    extract::Request,
    http::{
        header::{
            InvalidHeaderValue, CACHE_CONTROL, CONTENT_SECURITY_POLICY, EXPIRES, PRAGMA, SERVER,
            STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS, X_DNS_PREFETCH_CONTROL,
            X_FRAME_OPTIONS, X_XSS_PROTECTION,
        },
        HeaderMap, HeaderName, HeaderValue,
    },
    middleware::Next,
    response::Response,
    Extension,
};

use crate::config::{SecurityHeadersConfig, SourceList};

const X_POWERED_BY: HeaderName = HeaderName::from_static("x-powered-by");
const X_DOWNLOAD_OPTIONS: HeaderName = HeaderName::from_static("x-download-options");
const SURROGATE_CONTROL: HeaderName = HeaderName::from_static("surrogate-control");

/// Errors compiling configured values into HTTP header values.
///
/// Surfaced at startup; a policy that cannot be compiled must prevent the
/// server from starting.
#[derive(Debug, thiserror::Error)]
pub enum HeaderPolicyError {
    #[error("invalid value for {header} header: {source}")]
    InvalidHeaderValue {
        header: &'static str,
        #[source]
        source: InvalidHeaderValue,
    },
}

/// One header mutation applied to an outgoing response.
#[derive(Debug, Clone)]
pub enum PolicyStep {
    /// Remove the header if present.
    Remove(HeaderName),
    /// Set the header, overwriting any existing value.
    Set(HeaderName, HeaderValue),
    /// Set the header only when the request was detected as HTTPS.
    SetOnSecure(HeaderName, HeaderValue),
}

/// An ordered, precompiled list of header mutations.
///
/// Compiled once at startup from validated configuration and shared across
/// requests behind `Arc`; applying it is pure header manipulation with no
/// per-request error paths. Steps overwrite singleton headers, so applying
/// the policy twice yields the same header set as applying it once.
#[derive(Debug, Clone, Default)]
pub struct HeaderPolicy {
    steps: Vec<PolicyStep>,
}

impl HeaderPolicy {
    /// Compile the configured policy into its ordered step list.
    ///
    /// Ordering is declared here rather than accumulated through
    /// registration side effects; CSP and frame control both run before the
    /// response is sent, and the remaining steps touch distinct headers.
    ///
    /// # Errors
    /// Returns [`HeaderPolicyError`] if a configured value is not a legal
    /// HTTP header value.
    pub fn from_config(config: &SecurityHeadersConfig) -> Result<Self, HeaderPolicyError> {
        let mut steps = Vec::new();

        // Hide the serving technology
        steps.push(PolicyStep::Remove(X_POWERED_BY));
        steps.push(PolicyStep::Remove(SERVER));

        // Clickjacking: restrict who may frame the site
        steps.push(PolicyStep::Set(
            X_FRAME_OPTIONS,
            parse_value("X-Frame-Options", &config.frame_action.to_uppercase())?,
        ));

        // Legacy XSS filter for older browsers
        steps.push(PolicyStep::Set(
            X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ));

        // Forbid MIME sniffing past the declared Content-Type
        steps.push(PolicyStep::Set(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ));

        // Keep IE from opening downloads in the site's security context
        steps.push(PolicyStep::Set(
            X_DOWNLOAD_OPTIONS,
            HeaderValue::from_static("noopen"),
        ));

        if config.hsts_enabled {
            let value = parse_value("Strict-Transport-Security", &hsts_value(config))?;
            // force applies the header on every response; otherwise only
            // responses to requests detected as HTTPS carry it
            steps.push(if config.hsts_force {
                PolicyStep::Set(STRICT_TRANSPORT_SECURITY, value)
            } else {
                PolicyStep::SetOnSecure(STRICT_TRANSPORT_SECURITY, value)
            });
        }

        steps.push(PolicyStep::Set(
            X_DNS_PREFETCH_CONTROL,
            HeaderValue::from_static("off"),
        ));

        // Cache busting is opt-in; it trades away all client caching
        if config.no_cache {
            steps.push(PolicyStep::Set(
                SURROGATE_CONTROL,
                HeaderValue::from_static("no-store"),
            ));
            steps.push(PolicyStep::Set(
                CACHE_CONTROL,
                HeaderValue::from_static("no-store, no-cache, must-revalidate, proxy-revalidate"),
            ));
            steps.push(PolicyStep::Set(
                PRAGMA,
                HeaderValue::from_static("no-cache"),
            ));
            steps.push(PolicyStep::Set(EXPIRES, HeaderValue::from_static("0")));
        }

        steps.push(PolicyStep::Set(
            CONTENT_SECURITY_POLICY,
            parse_value(
                "Content-Security-Policy",
                &csp_value(&config.csp.directives),
            )?,
        ));

        Ok(Self { steps })
    }

    /// The compiled steps, in application order.
    #[must_use]
    pub fn steps(&self) -> &[PolicyStep] {
        &self.steps
    }

    /// Run every step against a response header map.
    pub fn apply(&self, secure: bool, headers: &mut HeaderMap) {
        for step in &self.steps {
            match step {
                PolicyStep::Remove(name) => {
                    headers.remove(name);
                }
                PolicyStep::Set(name, value) => {
                    headers.insert(name.clone(), value.clone());
                }
                PolicyStep::SetOnSecure(name, value) => {
                    if secure {
                        headers.insert(name.clone(), value.clone());
                    }
                }
            }
        }
    }
}

fn parse_value(header: &'static str, raw: &str) -> Result<HeaderValue, HeaderPolicyError> {
    HeaderValue::from_str(raw)
        .map_err(|source| HeaderPolicyError::InvalidHeaderValue { header, source })
}

fn hsts_value(config: &SecurityHeadersConfig) -> String {
    if config.hsts_include_subdomains {
        format!("max-age={}; includeSubDomains", config.hsts_max_age)
    } else {
        format!("max-age={}", config.hsts_max_age)
    }
}

/// Join CSP directives into a header value: each directive name followed by
/// its space-joined sources, directives separated by `; `.
fn csp_value<'a, I>(directives: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a SourceList)>,
{
    directives
        .into_iter()
        .map(|(name, SourceList(sources))| format!("{} {}", name, sources.join(" ")))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Whether the request arrived over HTTPS, directly or via a proxy.
fn request_is_secure(request: &Request) -> bool {
    if request.uri().scheme_str() == Some("https") {
        return true;
    }
    request
        .headers()
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|proto| proto.eq_ignore_ascii_case("https"))
}

/// Middleware that applies the compiled [`HeaderPolicy`] to every response.
///
/// Reads the policy from an `Extension` layer; add it as the outermost layer
/// so headers cover every route including static services and the fallback.
pub async fn security_headers_middleware(
    Extension(policy): Extension<Arc<HeaderPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let secure = request_is_secure(&request);
    let mut response = next.run(request).await;
    policy.apply(secure, response.headers_mut());
    response
}
