//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `HSCTL_CONFIG`
//! environment variable. A missing file is not an error: every value can come from the
//! environment.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `HSCTL_` override YAML values
//! 3. **Provider variables** - `SUPABASE_URL`, `SUPABASE_SERVICE_ROLE_KEY` and `ASTRIA_API_KEY`
//!    override `provider.url`, `provider.service_role_key` and `tunes.api_key` if set
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `HSCTL_FEATURES__CREDITS_PURCHASE=true` sets the `features.credits_purchase` field.
//!
//! ## Required Values
//!
//! The provider URL, the provider service role key and the image API key have no defaults.
//! [`Config::load`] validates them once and fails with a message naming the missing variable,
//! so a misconfigured process never starts serving.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use hsctl::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}", config.bind_address());
//! # Ok(())
//! # }
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "HSCTL_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Product name shown in the navigation bar
    pub site_name: String,
    /// Auth + database provider (Supabase) settings
    pub provider: ProviderConfig,
    /// Image-generation API settings
    pub tunes: TunesConfig,
    /// Session cookie settings
    pub auth: AuthConfig,
    /// UI feature toggles
    pub features: FeatureFlags,
    /// Console log output format
    pub log_format: LogFormat,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
    /// Raw `SUPABASE_URL` override, folded into `provider.url` on load
    #[serde(skip_serializing)]
    pub supabase_url: Option<Url>,
    /// Raw `SUPABASE_SERVICE_ROLE_KEY` override, folded into `provider.service_role_key` on load
    #[serde(skip_serializing)]
    pub supabase_service_role_key: Option<String>,
    /// Raw `ASTRIA_API_KEY` override, folded into `tunes.api_key` on load
    #[serde(skip_serializing)]
    pub astria_api_key: Option<String>,
}

/// Connection settings for the auth + database provider.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Project URL, e.g. `https://xyzcompany.supabase.co`
    pub url: Option<Url>,
    /// Service role key. Bypasses row level security, only ever sent server to server.
    #[serde(skip_serializing)]
    pub service_role_key: Option<String>,
}

/// Settings for the image-generation API hosting trained models.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TunesConfig {
    pub base_url: Url,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for TunesConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://api.astria.ai").expect("static URL is valid"),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub session: SessionConfig,
}

/// Session cookie settings.
///
/// The cookie carries the provider access token issued at login. This service never mints
/// sessions itself; it only reads the cookie and expires it on sign-out or account deletion.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Set the `Secure` attribute on cookies written by this service
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "sb-access-token".to_string(),
            secure: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureFlags {
    /// Show the "Get Credits" link. Enable once a payment provider is wired up.
    pub credits_purchase: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            site_name: "Headshots AI".to_string(),
            provider: ProviderConfig::default(),
            tunes: TunesConfig::default(),
            auth: AuthConfig::default(),
            features: FeatureFlags::default(),
            log_format: LogFormat::default(),
            enable_otel_export: false,
            supabase_url: None,
            supabase_service_role_key: None,
            astria_api_key: None,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        if let Some(url) = config.supabase_url.take() {
            config.provider.url = Some(url);
        }
        if let Some(key) = config.supabase_service_role_key.take() {
            config.provider.service_role_key = Some(key);
        }
        if let Some(key) = config.astria_api_key.take() {
            config.tunes.api_key = Some(key);
        }

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Check that every value needed to talk to the provider and the image API is present
    pub fn validate(&self) -> Result<(), Error> {
        if self.provider.url.is_none() {
            return Err(Error::Internal {
                operation: "validate config: provider URL is missing. \
                     Set SUPABASE_URL or provider.url in the config file"
                    .to_string(),
            });
        }

        if is_blank(self.provider.service_role_key.as_deref()) {
            return Err(Error::Internal {
                operation: "validate config: provider service role key is missing. \
                     Set SUPABASE_SERVICE_ROLE_KEY or provider.service_role_key in the config file"
                    .to_string(),
            });
        }

        if is_blank(self.tunes.api_key.as_deref()) {
            return Err(Error::Internal {
                operation: "validate config: image API key is missing. \
                     Set ASTRIA_API_KEY or tunes.api_key in the config file"
                    .to_string(),
            });
        }

        if self.auth.session.cookie_name.trim().is_empty() {
            return Err(Error::Internal {
                operation: "validate config: auth.session.cookie_name must not be empty".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("HSCTL_").ignore(&["config"]).split("__"))
            .merge(Env::raw().only(&["SUPABASE_URL", "SUPABASE_SERVICE_ROLE_KEY", "ASTRIA_API_KEY"]))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}
