//! Enumerates the site's URL space by walking the authored page tree.
//!
//! The walk starts at the root item and follows `subpages` in authored order. Each
//! page's path is its parent's path plus its own slug. A page whose content block is
//! a listing page does not expose its authored subpages; instead every item of the
//! listed content type becomes a leaf directly below it.
//!
//! Fetches are depth-bounded, so pages below the inlined closure are fetched again as
//! continuation jobs. Jobs queued in one round are dispatched concurrently, and the
//! final order is depth-first preorder regardless of completion order.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::blocks::PageBlock;
use crate::settings::SiteSettings;
use crate::source::{ContentSource, ItemQuery, ListQuery};
use crate::types::{ContentItem, ItemResponse, Mode, SystemInfo};

/// Elements needed to walk the tree and to recognise listing pages.
pub const SITEMAP_ELEMENTS: &[&str] = &["subpages", "slug", "content", "content_type"];
const LEAF_ELEMENTS: &[&str] = &["slug"];

/// One routable URL and the item that renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlMapping {
    pub slug: Vec<String>,
    pub info: SystemInfo,
}

impl UrlMapping {
    pub fn href(&self) -> String {
        format!("/{}", self.slug.join("/"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sitemap {
    mappings: Vec<UrlMapping>,
}

impl Sitemap {
    pub fn new(mappings: Vec<UrlMapping>) -> Self { Self { mappings } }

    /// Mapping whose path equals `path` segment by segment.
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<&UrlMapping> {
        self.mappings.iter().find(|m| {
            m.slug.len() == path.len() && m.slug.iter().zip(path).all(|(a, b)| a == b.as_ref())
        })
    }

    /// URL of the first page rendered by `codename`, for resolving navigation links.
    pub fn href_for(&self, codename: &str) -> Option<String> {
        self.mappings.iter().find(|m| m.info.codename == codename).map(UrlMapping::href)
    }

    pub fn mappings(&self) -> &[UrlMapping] { &self.mappings }
    pub fn len(&self) -> usize { self.mappings.len() }
    pub fn is_empty(&self) -> bool { self.mappings.is_empty() }
    pub fn into_mappings(self) -> Vec<UrlMapping> { self.mappings }
}

/// Where a page lands: the parent's path (`None` for the root) and its preorder position.
struct Placement {
    parent: Option<Vec<String>>,
    key: Vec<usize>,
}

enum Job {
    Expand { codename: String, placement: Placement },
    List { content_type: String, path: Vec<String>, key: Vec<usize> },
}

enum Outcome {
    Expanded { response: ItemResponse, placement: Placement },
    Listed { items: Vec<ContentItem>, path: Vec<String>, key: Vec<usize> },
}

type Found = Vec<(Vec<usize>, UrlMapping)>;

pub struct SitemapResolver {
    source: Arc<dyn ContentSource>,
    settings: SiteSettings,
}

impl SitemapResolver {
    pub fn new(source: Arc<dyn ContentSource>, settings: SiteSettings) -> Self {
        Self { source, settings }
    }

    pub async fn resolve(&self, mode: Mode) -> Result<Sitemap> {
        let mut found: Found = Vec::new();
        let mut jobs = vec![Job::Expand {
            codename: self.settings.root_codename.clone(),
            placement: Placement { parent: None, key: Vec::new() },
        }];
        let fan_out = self.settings.max_concurrent_fetches.max(1);
        let mut round = 0usize;

        while !jobs.is_empty() {
            round += 1;
            debug!(round, jobs = jobs.len(), ?mode, "dispatching sitemap jobs");
            let outcomes: Vec<Outcome> = stream::iter(std::mem::take(&mut jobs))
                .map(|job| self.run(job, mode))
                .buffer_unordered(fan_out)
                .try_collect()
                .await?;

            for outcome in outcomes {
                match outcome {
                    Outcome::Expanded { response, placement } => {
                        walk(response, placement, &mut found, &mut jobs)?;
                    }
                    Outcome::Listed { items, path, key } => {
                        for (i, item) in items.into_iter().enumerate() {
                            let slug = child_path(&path, &item)?;
                            found.push((extend(&key, i), UrlMapping { slug, info: item.system }));
                        }
                    }
                }
            }
        }

        found.sort_by(|a, b| a.0.cmp(&b.0));
        let sitemap = Sitemap::new(found.into_iter().map(|(_, m)| m).collect());
        let mut seen = HashSet::new();
        for m in sitemap.mappings() {
            if !seen.insert(&m.slug) {
                warn!(path = %m.href(), codename = %m.info.codename, "duplicate sitemap path");
            }
        }
        info!(pages = sitemap.len(), rounds = round, ?mode, "sitemap resolved");
        Ok(sitemap)
    }

    async fn run(&self, job: Job, mode: Mode) -> Result<Outcome> {
        match job {
            Job::Expand { codename, placement } => {
                // A page's content block sits one level below it; shallower fetches never see it.
                let query = ItemQuery::new(self.settings.sitemap_depth.max(1), mode).elements(SITEMAP_ELEMENTS);
                let response = self.source.fetch_item(&codename, &query).await
                    .with_context(|| format!("fetching page `{codename}` for the sitemap"))?;
                Ok(Outcome::Expanded { response, placement })
            }
            Job::List { content_type, path, key } => {
                let query = ListQuery::new(mode).elements(LEAF_ELEMENTS);
                let listing = self.source.fetch_items_by_type(&content_type, &query).await
                    .with_context(|| format!("listing `{content_type}` items for the sitemap"))?;
                Ok(Outcome::Listed { items: listing.items, path, key })
            }
        }
    }
}

/// Map a fetched page and every descendant already inside its closure; queue the rest.
fn walk(response: ItemResponse, placement: Placement, found: &mut Found, jobs: &mut Vec<Job>) -> Result<()> {
    let closure = response.linked_items;
    let mut stack: Vec<(&ContentItem, Placement)> = vec![(&response.item, placement)];

    while let Some((node, placement)) = stack.pop() {
        let path = match &placement.parent {
            None => Vec::new(),
            Some(parent) => child_path(parent, node)?,
        };
        found.push((placement.key.clone(), UrlMapping { slug: path.clone(), info: node.system.clone() }));

        match PageBlock::of(node, &closure) {
            PageBlock::Listing(Some(content_type)) => {
                jobs.push(Job::List { content_type: content_type.to_string(), path, key: placement.key });
            }
            PageBlock::Listing(None) => {
                warn!(page = %node.codename(), "listing page has no content_type; no leaves emitted");
            }
            PageBlock::Other | PageBlock::Unresolved => {
                for (i, child) in node.linked("subpages").iter().enumerate() {
                    let child_placement = Placement { parent: Some(path.clone()), key: extend(&placement.key, i) };
                    match closure.get(child) {
                        Some(item) if PageBlock::of(item, &closure) != PageBlock::Unresolved => {
                            stack.push((item, child_placement));
                        }
                        _ => jobs.push(Job::Expand { codename: child.clone(), placement: child_placement }),
                    }
                }
            }
        }
    }
    Ok(())
}

fn child_path(parent: &[String], item: &ContentItem) -> Result<Vec<String>> {
    let slug = item.text("slug")
        .ok_or_else(|| anyhow!("`{}` has no slug", item.codename()))?;
    let mut path = parent.to_vec();
    path.push(slug.to_string());
    Ok(path)
}

fn extend(key: &[usize], index: usize) -> Vec<usize> {
    let mut key = key.to_vec();
    key.push(index);
    key
}
