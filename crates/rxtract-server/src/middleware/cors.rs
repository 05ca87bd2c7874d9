//! CORS middleware configuration.

use anyhow::Context;
use axum::http::{HeaderName, HeaderValue, Method, header};
use clap::Args;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// CORS configuration.
///
/// Origins are carried as a JSON array string to match how deployments
/// already provide them, e.g. `CORS_ORIGINS='["https://app.example.com"]'`.
#[derive(Debug, Clone, Default, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct CorsConfig {
    /// JSON array of allowed origins. Allows any origin when unset.
    #[arg(long, env = "CORS_ORIGINS")]
    pub cors_origins: Option<String>,
}

impl CorsConfig {
    /// Parses the configured origins list.
    pub fn origins(&self) -> anyhow::Result<Option<Vec<HeaderValue>>> {
        let Some(raw) = &self.cors_origins else {
            return Ok(None);
        };

        let origins: Vec<String> = serde_json::from_str(raw)
            .context("CORS_ORIGINS must be a JSON array of origin strings")?;

        origins
            .iter()
            .map(|origin| {
                origin
                    .parse()
                    .with_context(|| format!("invalid CORS origin {origin:?}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()
            .map(Some)
    }
}

/// Creates a CORS layer based on the provided configuration.
pub fn cors_layer(config: &CorsConfig) -> anyhow::Result<CorsLayer> {
    let origin = match config.origins()? {
        Some(origins) => AllowOrigin::list(origins),
        None => AllowOrigin::any(),
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(super::api_key::API_KEY_HEADER),
        ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_origin_list() {
        let config = CorsConfig {
            cors_origins: Some(r#"["https://app.example.com", "http://localhost:3000"]"#.into()),
        };
        let origins = config.origins().unwrap().unwrap();
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], "https://app.example.com");
    }

    #[test]
    fn unset_origins_allow_any() {
        assert!(CorsConfig::default().origins().unwrap().is_none());
        let _layer = cors_layer(&CorsConfig::default()).unwrap();
    }

    #[test]
    fn rejects_non_json_origins() {
        let config = CorsConfig {
            cors_origins: Some("https://app.example.com".into()),
        };
        assert!(config.origins().is_err());
    }
}
