use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::blocks::RenderMode;
use crate::settings::SiteSettings;
use crate::site_config::{ConfigLoader, SiteConfig};
use crate::sitemap::{Sitemap, SitemapResolver};
use crate::source::{ContentSource, ItemQuery, ListQuery};
use crate::types::{ContentItem, ItemResponse, LinkedItems, Mode};

/// Everything one page render needs, as plain data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPage {
    pub page: ContentItem,
    /// Linked items of the page and of every related item.
    pub linked_items: LinkedItems,
    pub config: SiteConfig,
    pub mappings: Sitemap,
    /// Listing results keyed by the codename of the section or listing block that asked for them.
    pub related: BTreeMap<String, Vec<ContentItem>>,
    pub render_mode: RenderMode,
    pub mode: Mode,
}

pub struct PageAssembler {
    source: Arc<dyn ContentSource>,
    settings: SiteSettings,
    sitemap: SitemapResolver,
    config: ConfigLoader,
}

impl PageAssembler {
    pub fn new(source: Arc<dyn ContentSource>, settings: SiteSettings) -> Self {
        Self {
            sitemap: SitemapResolver::new(source.clone(), settings.clone()),
            config: ConfigLoader::new(source.clone(), settings.clone()),
            source,
            settings,
        }
    }

    pub fn sitemap(&self) -> &SitemapResolver { &self.sitemap }
    pub fn config(&self) -> &ConfigLoader { &self.config }

    /// Assemble the page at `path`. `Ok(None)` when no page maps to it.
    pub async fn assemble<S: AsRef<str> + Sync>(&self, path: &[S], mode: Mode) -> Result<Option<ResolvedPage>> {
        let (config, located) = tokio::try_join!(self.config.load(mode), self.locate(path, mode))?;

        let Some((mappings, response)) = located else {
            debug!(path = %display_path(path), ?mode, "no page mapped to path");
            return Ok(None);
        };

        let render_mode = RenderMode::classify(&response);
        let ItemResponse { item: page, mut linked_items } = response;
        let related = self.fetch_related(&page, &render_mode, mode, &mut linked_items).await?;

        info!(path = %display_path(path), page = %page.codename(), related = related.len(), ?mode, "page assembled");
        Ok(Some(ResolvedPage { page, linked_items, config, mappings, related, render_mode, mode }))
    }

    /// Resolve the sitemap and fetch the page mapped to `path`, if any.
    async fn locate<S: AsRef<str> + Sync>(&self, path: &[S], mode: Mode) -> Result<Option<(Sitemap, ItemResponse)>> {
        let sitemap = self.sitemap.resolve(mode).await?;
        let Some(target) = sitemap.lookup(path).map(|m| m.info.codename.clone()) else {
            return Ok(None);
        };
        let query = ItemQuery::new(self.settings.page_depth, mode);
        let response = self.source.fetch_item(&target, &query).await
            .with_context(|| format!("fetching page `{target}`"))?;
        Ok(Some((sitemap, response)))
    }

    async fn fetch_related(&self, page: &ContentItem, render_mode: &RenderMode, mode: Mode, linked_items: &mut LinkedItems) -> Result<BTreeMap<String, Vec<ContentItem>>> {
        let queries: Vec<(&str, &str, ListQuery)> = match render_mode {
            RenderMode::Landing { sections, .. } => sections.iter()
                .map(|s| (s.codename.as_str(), s.spec.content_type.as_str(), s.spec.query(mode)))
                .collect(),
            RenderMode::Listing { block, content_type } => {
                vec![(block.as_str(), content_type.as_str(), ListQuery::new(mode))]
            }
            RenderMode::Plain => Vec::new(),
            // Listing leaves carry no content slot at all; only broken blocks are worth a warning.
            RenderMode::Unrecognized { reason } if page.element("content").is_none() => {
                debug!(page = %page.codename(), %reason, "page has no content block");
                Vec::new()
            }
            RenderMode::Unrecognized { reason } => {
                warn!(page = %page.codename(), %reason, "unrecognized render mode; skipping related content");
                Vec::new()
            }
        };

        let listings = try_join_all(queries.into_iter().map(|(key, content_type, query)| async move {
            let listing = self.source.fetch_items_by_type(content_type, &query).await
                .with_context(|| format!("fetching `{content_type}` items for `{key}`"))?;
            Ok::<_, anyhow::Error>((key, listing))
        })).await?;

        let mut related = BTreeMap::new();
        for (key, listing) in listings {
            for (codename, item) in listing.linked_items {
                linked_items.entry(codename).or_insert(item);
            }
            related.insert(key.to_string(), listing.items);
        }
        Ok(related)
    }
}

fn display_path<S: AsRef<str>>(path: &[S]) -> String {
    let segments: Vec<&str> = path.iter().map(|s| s.as_ref()).collect();
    format!("/{}", segments.join("/"))
}
