//! Assistant configuration

use crate::viewer::intersection::ObserverOptions;
use crate::viewer::render_window::{DEFAULT_WINDOW_RADIUS, PLACEHOLDER_ASPECT};
use std::path::PathBuf;
use std::time::Duration;

/// Model used until the user picks another one
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Public Gemini API host
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Viewer tunables
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Pages on either side of the current page that are fully rendered (default: 2)
    pub window_radius: u32,
    /// How long organic observation stays suspended after a programmatic scroll (default: 800ms)
    pub settle_delay: Duration,
    /// Height/width ratio used for placeholders before real page sizes are known (default: 1.294)
    pub placeholder_aspect: f64,
    /// Total padding subtracted from the container on each axis (default: 64px)
    pub container_padding: f64,
    /// Content width assumed before the container reports its size (default: 600px)
    pub initial_content_width: f64,
    /// Intersection thresholds and root margin for current-page tracking
    pub observer: ObserverOptions,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_radius: DEFAULT_WINDOW_RADIUS,
            settle_delay: Duration::from_millis(800),
            placeholder_aspect: PLACEHOLDER_ASPECT,
            container_padding: 64.0,
            initial_content_width: 600.0,
            observer: ObserverOptions::default(),
        }
    }
}

/// Document Query Service tunables
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// API key used when no custom key is enabled
    pub api_key: Option<String>,
    /// Service host used when no custom base URL is enabled
    pub base_url: String,
    /// Language every end-user answer is written in
    pub target_language: String,
    /// Per-request timeout (default: 120s)
    pub request_timeout: Duration,
    /// Largest document sent inline as base64 (default: 20MB)
    pub max_inline_bytes: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            target_language: "Simplified Chinese (简体中文)".to_string(),
            request_timeout: Duration::from_secs(120),
            max_inline_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Page render cache budget
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Maximum number of rendered pages kept (default: 32)
    pub cache_max_entries: usize,
    /// Maximum total PNG bytes kept (default: 128MB)
    pub cache_max_bytes: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            cache_max_entries: 32,
            cache_max_bytes: 128 * 1024 * 1024,
        }
    }
}

/// Per-user data directory, `.insightpdf` in the working directory when the
/// platform has none
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("insightpdf"))
        .unwrap_or_else(|| PathBuf::from(".insightpdf"))
}

/// Top-level configuration
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Directory holding settings, session and the current document
    /// (default: [`default_data_dir`])
    pub data_dir: PathBuf,
    /// Model used when no saved setting exists
    pub default_model: String,
    pub viewer: ViewerConfig,
    pub query: QueryConfig,
    pub render: RenderConfig,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            default_model: DEFAULT_MODEL.to_string(),
            viewer: ViewerConfig::default(),
            query: QueryConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl AssistantConfig {
    /// Defaults overridden by `GEMINI_API_KEY` (or `API_KEY`),
    /// `INSIGHTPDF_BASE_URL`, `INSIGHTPDF_MODEL` and `INSIGHTPDF_DATA_DIR`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        config.query.api_key = non_empty("GEMINI_API_KEY").or_else(|| non_empty("API_KEY"));

        if let Some(base_url) = non_empty("INSIGHTPDF_BASE_URL") {
            config.query.base_url = base_url;
        }
        if let Some(model) = non_empty("INSIGHTPDF_MODEL") {
            config.default_model = model;
        }
        if let Some(dir) = non_empty("INSIGHTPDF_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AssistantConfig::default();
        assert_eq!(config.default_model, "gemini-3-flash-preview");
        assert_eq!(config.viewer.window_radius, 2);
        assert_eq!(config.viewer.settle_delay, Duration::from_millis(800));
        assert_eq!(config.viewer.placeholder_aspect, 1.294);
        assert_eq!(config.viewer.container_padding, 64.0);
        assert!(config.query.api_key.is_none());
        assert_eq!(config.query.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_from_lookup_prefers_gemini_key() {
        let vars: HashMap<&str, &str> = [
            ("GEMINI_API_KEY", "gem-key"),
            ("API_KEY", "generic-key"),
            ("INSIGHTPDF_MODEL", "gemini-2.5-pro"),
        ]
        .into_iter()
        .collect();

        let config = AssistantConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.query.api_key.as_deref(), Some("gem-key"));
        assert_eq!(config.default_model, "gemini-2.5-pro");
    }

    #[test]
    fn test_from_lookup_ignores_blank_values() {
        let vars: HashMap<&str, &str> = [("GEMINI_API_KEY", "  "), ("API_KEY", "fallback")]
            .into_iter()
            .collect();

        let config = AssistantConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.query.api_key.as_deref(), Some("fallback"));
        assert_eq!(config.data_dir, default_data_dir());
    }

    #[test]
    fn test_default_data_dir_is_per_user() {
        let dir = default_data_dir();
        assert!(dir.ends_with("insightpdf") || dir.ends_with(".insightpdf"));
        if let Some(base) = dirs::data_dir() {
            assert_eq!(dir, base.join("insightpdf"));
            assert!(dir.is_absolute());
        }
    }

    #[test]
    fn test_data_dir_override() {
        let config = AssistantConfig::from_lookup(|k| {
            (k == "INSIGHTPDF_DATA_DIR").then(|| "/srv/insight".to_string())
        });
        assert_eq!(config.data_dir, PathBuf::from("/srv/insight"));
    }
}
