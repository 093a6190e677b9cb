use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Shape of the authored site tree and how hard to hit the content source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    /// Codename of the item that is both the page tree root and the site configuration.
    pub root_codename: String,
    /// Depth for sitemap fetches: the tree level plus one for the content block type.
    pub sitemap_depth: u32,
    pub page_depth: u32,
    pub config_depth: u32,
    /// Upper bound on requests in flight during one sitemap round.
    pub max_concurrent_fetches: usize,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            root_codename: "homepage".to_string(),
            sitemap_depth: 3,
            page_depth: 5,
            config_depth: 6,
            max_concurrent_fetches: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverySettings {
    pub project_id: Option<String>,
    pub preview_api_key: Option<String>,
    pub base_url: String,
    pub preview_base_url: String,
    pub timeout_secs: u64,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            project_id: None,
            preview_api_key: None,
            base_url: "https://deliver.kontent.ai".to_string(),
            preview_base_url: "https://preview-deliver.kontent.ai".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub site: SiteSettings,
    pub delivery: DeliverySettings,
}

impl Settings {
    /// Read settings from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)
                    .with_context(|| format!("reading settings {}", p.display()))?;
                Self::from_toml(&raw).with_context(|| format!("parsing settings {}", p.display()))?
            }
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        if let Some(id) = non_empty("KONTENT_PROJECT_ID") { self.delivery.project_id = Some(id); }
        if let Some(key) = non_empty("KONTENT_PREVIEW_API_KEY") { self.delivery.preview_api_key = Some(key); }
        if let Some(n) = non_empty("TRELLIS_MAX_CONCURRENT_FETCHES").and_then(|s| s.parse().ok()) {
            self.site.max_concurrent_fetches = n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn partial_toml_keeps_defaults() {
        let settings = Settings::from_toml("[site]\nsitemap_depth = 4\n\n[delivery]\nproject_id = \"abc\"\n").unwrap();
        assert_eq!(settings.site.sitemap_depth, 4);
        assert_eq!(settings.site.root_codename, "homepage");
        assert_eq!(settings.site.page_depth, 5);
        assert_eq!(settings.delivery.project_id.as_deref(), Some("abc"));
        assert_eq!(settings.delivery.base_url, "https://deliver.kontent.ai");
    }

    #[test]
    fn env_overrides_file_values() {
        let mut settings = Settings::from_toml("[delivery]\nproject_id = \"from-file\"\n").unwrap();
        let env: HashMap<&str, &str> = [
            ("KONTENT_PROJECT_ID", "from-env"),
            ("KONTENT_PREVIEW_API_KEY", "  "),
            ("TRELLIS_MAX_CONCURRENT_FETCHES", "2"),
        ].into_iter().collect();
        settings.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(settings.delivery.project_id.as_deref(), Some("from-env"));
        assert_eq!(settings.delivery.preview_api_key, None);
        assert_eq!(settings.site.max_concurrent_fetches, 2);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[site]\nroot_codename = \"start\"").unwrap();
        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.site.root_codename, "start");
    }

    #[test]
    fn unknown_file_is_an_error() {
        assert!(Settings::load(Some(Path::new("/nonexistent/trellis.toml"))).is_err());
    }
}
