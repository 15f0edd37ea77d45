//! Shared outbound HTTP client construction.

use std::sync::Once;

static CRYPTO_PROVIDER: Once = Once::new();

/// Install the process-wide rustls crypto provider.
///
/// reqwest is built with `rustls-no-provider`, so a provider must be installed before the
/// first client is built. Safe to call any number of times.
pub fn install_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        // An Err here means another provider was installed first, which is equally usable
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    });
}

/// Build a reqwest client with default timeouts. No retries are layered on top.
pub fn client() -> anyhow::Result<reqwest::Client> {
    install_crypto_provider();
    reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {e}"))
}

/// Makes sure a url has a trailing slash.
///
/// `Url::join` drops the last path segment of a base without one: joining `/hello` and
/// `world` gives `/world`, joining `/hello/` and `world` gives `/hello/world`. Call this on
/// configured base URLs before joining.
pub fn ensure_slash(url: &url::Url) -> url::Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let mut path = new_url.path().to_string();
        path.push('/');
        new_url.set_path(&path);
        new_url
    }
}
