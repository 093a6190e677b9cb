pub mod assembler;
pub mod blocks;
pub mod delivery;
pub mod memory;
pub mod settings;
pub mod site_config;
pub mod sitemap;
pub mod source;
pub mod types;

#[cfg(test)]
mod testing;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::assembler::ResolvedPage;
    pub use crate::blocks::{ListingSection, ListingSpec, RenderMode};
    pub use crate::settings::{DeliverySettings, Settings, SiteSettings};
    pub use crate::site_config::SiteConfig;
    pub use crate::sitemap::{Sitemap, UrlMapping};
    pub use crate::source::{ContentSource, Direction, ItemQuery, ListQuery, OrderBy};
    pub use crate::types::{ContentItem, ItemListing, ItemResponse, Mode};
    pub use crate::Site;
}

use std::sync::Arc;

use anyhow::Result;

use crate::assembler::{PageAssembler, ResolvedPage};
use crate::delivery::DeliveryClient;
use crate::settings::{Settings, SiteSettings};
use crate::site_config::SiteConfig;
use crate::sitemap::UrlMapping;
use crate::source::ContentSource;
use crate::types::Mode;

/// Library entry point used by the rendering layer. Holds no state between calls:
/// every call reads configuration and the page tree fresh from the content source.
pub struct Site {
    assembler: PageAssembler,
}

impl Site {
    pub fn new(source: Arc<dyn ContentSource>, settings: SiteSettings) -> Self {
        Self { assembler: PageAssembler::new(source, settings) }
    }

    /// Connect to the delivery API described by `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = DeliveryClient::new(&settings.delivery)?;
        Ok(Self::new(Arc::new(client), settings.site.clone()))
    }

    /// Every routable path and the item behind it, depth-first in authored order.
    pub async fn get_sitemap_paths(&self, preview: bool) -> Result<Vec<UrlMapping>> {
        let sitemap = self.assembler.sitemap().resolve(Mode::from_preview(preview)).await?;
        Ok(sitemap.into_mappings())
    }

    /// Everything needed to render `path`, or `None` when nothing is mapped there.
    pub async fn get_page_data<S: AsRef<str> + Sync>(&self, path: &[S], preview: bool) -> Result<Option<ResolvedPage>> {
        self.assembler.assemble(path, Mode::from_preview(preview)).await
    }

    pub async fn load_config(&self, preview: bool) -> Result<SiteConfig> {
        self.assembler.config().load(Mode::from_preview(preview)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySource;
    use crate::testing::{article, listing_block, page};
    use pretty_assertions::assert_eq;

    fn site() -> Site {
        let mut source = MemorySource::new();
        source
            .insert(page("homepage", "", &["blog"], &[]))
            .insert(page("blog", "blog", &["post_1"], &["blog_listing"]))
            .insert(listing_block("blog_listing", "article"))
            .insert(page("post_1", "post-1", &[], &[]))
            .insert(article("a", "a", "2024-01-01"))
            .insert(article("b", "b", "2024-01-02"));
        Site::new(Arc::new(source), SiteSettings::default())
    }

    #[tokio::test]
    async fn blog_example_paths() {
        let paths: Vec<Vec<String>> = site().get_sitemap_paths(false).await.unwrap()
            .into_iter().map(|m| m.slug).collect();
        let expected: Vec<Vec<String>> = [vec![], vec!["blog"], vec!["blog", "a"], vec!["blog", "b"]]
            .into_iter()
            .map(|p| p.into_iter().map(String::from).collect())
            .collect();
        assert_eq!(paths, expected);
    }

    #[tokio::test]
    async fn page_data_for_listing_leaf() {
        let site = site();
        let page = site.get_page_data(&["blog", "a"], false).await.unwrap().unwrap();
        assert_eq!(page.page.codename(), "a");
        assert_eq!(page.mappings.len(), 4);
        assert!(site.get_page_data(&["blog", "post-1"], false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn config_is_the_root_item() {
        let config = site().load_config(true).await.unwrap();
        assert_eq!(config.item.codename(), "homepage");
    }

    #[tokio::test]
    async fn bundled_fixture_resolves() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site.json");
        let site = Site::new(Arc::new(MemorySource::from_file(&path).unwrap()), SiteSettings::default());

        let hrefs: Vec<String> = site.get_sitemap_paths(false).await.unwrap().iter().map(UrlMapping::href).collect();
        assert_eq!(hrefs, vec!["/", "/blog", "/blog/hello-world", "/blog/second-post", "/about"]);

        let empty: [&str; 0] = [];
        let home = site.get_page_data(&empty, true).await.unwrap().unwrap();
        let latest: Vec<&str> = home.related["latest_articles"].iter().map(|i| i.codename()).collect();
        assert_eq!(latest, vec!["second_post", "hello_world"]);
        assert_eq!(home.mappings.href_for("second_post").as_deref(), Some("/blog/second-post"));
    }

    #[test]
    fn from_settings_requires_a_project() {
        assert!(Site::from_settings(&Settings::default()).is_err());
    }
}
