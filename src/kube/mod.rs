//! Kubernetes client module
//!
//! Handles connection to the Kubernetes API server.
//!
//! Supports HTTP/HTTPS proxy configuration via standard environment variables:
//! - `HTTP_PROXY` / `http_proxy`: HTTP proxy URL
//! - `HTTPS_PROXY` / `https_proxy`: HTTPS proxy URL
//! - `NO_PROXY` / `no_proxy`: Comma-separated list of hosts to bypass proxy
//!
//! Internal cluster hosts are added to NO_PROXY automatically.

use anyhow::{Context, Result};
use kube::config::KubeConfigOptions;
use kube::{Client, Config};
use url::Url;

/// Initialize and return a Kubernetes client with automatic proxy support
///
/// Without a context the default loading strategy applies:
/// 1. In-cluster config (if running in a pod)
/// 2. KUBECONFIG environment variable
/// 3. ~/.kube/config
///
/// With a context, that kubeconfig context is used instead of the current one.
pub async fn create_client(context: Option<&str>) -> Result<Client> {
    let config = match context {
        Some(context) => Config::from_kubeconfig(&KubeConfigOptions {
            context: Some(context.to_string()),
            ..Default::default()
        })
        .await
        .with_context(|| format!("Failed to load kubeconfig context '{}'", context))?,
        None => Config::infer()
            .await
            .context("Failed to infer Kubernetes configuration")?,
    };

    if let Ok(url) = Url::parse(&config.cluster_url.to_string()) {
        if let Some(host) = url.host_str() {
            ensure_no_proxy_bypass(host);
        }
    }

    let client = Client::try_from(config)?;
    Ok(client)
}

/// Ensure that an internal host is included in NO_PROXY
fn ensure_no_proxy_bypass(host: &str) {
    if !is_internal_host(host) {
        return;
    }

    // NO_PROXY takes precedence over no_proxy
    let current_no_proxy = std::env::var("NO_PROXY")
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| std::env::var("no_proxy").ok())
        .unwrap_or_default();

    if no_proxy_contains(&current_no_proxy, host) {
        return;
    }

    let updated_no_proxy = if current_no_proxy.is_empty() {
        host.to_string()
    } else {
        format!("{},{}", current_no_proxy, host)
    };
    tracing::debug!("Adding {} to NO_PROXY", host);

    // SAFETY: called once during startup, before the runtime spawns any task
    // that reads the environment.
    unsafe {
        std::env::set_var("NO_PROXY", &updated_no_proxy);
        std::env::set_var("no_proxy", &updated_no_proxy);
    }
}

/// Check if a host looks like an internal/private address
///
/// - Private IP addresses (10.x.x.x, 172.16-31.x.x, 192.168.x.x)
/// - Localhost addresses
/// - Common internal TLDs (.local, .internal, .cluster.local)
fn is_internal_host(host: &str) -> bool {
    if host.starts_with("10.")
        || host.starts_with("192.168.")
        || host == "localhost"
        || host == "127.0.0.1"
        || host == "::1"
    {
        return true;
    }

    if let Some(rest) = host.strip_prefix("172.") {
        let second = rest.split('.').next().and_then(|o| o.parse::<u8>().ok());
        if matches!(second, Some(16..=31)) {
            return true;
        }
    }

    host.ends_with(".local") || host.ends_with(".internal")
}

/// Check if NO_PROXY already covers the host
///
/// - Exact matches: "example.com" matches "example.com"
/// - Leading dot: ".example.com" matches "example.com" and its subdomains
/// - Plain domain: "example.com" also matches its subdomains
fn no_proxy_contains(no_proxy: &str, host: &str) -> bool {
    no_proxy
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .any(|pattern| {
            let domain = pattern.strip_prefix('.').unwrap_or(pattern);
            host == domain || host.ends_with(&format!(".{}", domain))
        })
}
