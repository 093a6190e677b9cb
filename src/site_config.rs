use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::settings::SiteSettings;
use crate::source::{ContentSource, ItemQuery};
use crate::types::{ItemResponse, Mode};

/// Global configuration: the root item as fetched, with its linked items.
pub type SiteConfig = ItemResponse;

/// Elements every page needs from the root item. `subpages` is left out so the
/// configuration read does not drag in the whole page tree.
pub const CONFIG_ELEMENTS: &[&str] = &[
    "title", "base_font", "favicon", "palette", "label", "header_logo",
    "main_menu", "actions", "slug", "content", "icon", "icon_position", "role",
    "options", "footer_sections", "image", "fields", "name",
    "type", "value", "navigation_item", "url",
    "submit_label", "form_id", "form_action", "default_value", "configuration",
    "font", "copyright",
];

pub struct ConfigLoader {
    source: Arc<dyn ContentSource>,
    settings: SiteSettings,
}

impl ConfigLoader {
    pub fn new(source: Arc<dyn ContentSource>, settings: SiteSettings) -> Self {
        Self { source, settings }
    }

    pub async fn load(&self, mode: Mode) -> Result<SiteConfig> {
        let codename = &self.settings.root_codename;
        let query = ItemQuery::new(self.settings.config_depth, mode).elements(CONFIG_ELEMENTS);
        let config = self.source.fetch_item(codename, &query).await
            .with_context(|| format!("loading site configuration from `{codename}`"))?;
        debug!(linked = config.linked_items.len(), ?mode, "site configuration loaded");
        Ok(config)
    }
}
