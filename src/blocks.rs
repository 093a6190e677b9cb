//! Typed view of the authored content blocks that decide how a page renders.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::source::{ListQuery, OrderBy};
use crate::types::{ContentItem, ElementValue, ItemResponse, LinkedItems, Mode};

pub const POST_TYPE: &str = "post";
pub const LANDING_PAGE_TYPE: &str = "landing_page";
pub const LISTING_PAGE_TYPE: &str = "listing_page";
pub const LISTING_SECTION_TYPE: &str = "listing_section";

/// Query that fills a listing section or listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingSpec {
    pub content_type: String,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl ListingSpec {
    pub fn from_item(block: &ContentItem) -> Result<Self, String> {
        let content_type = content_type_of(block)
            .ok_or_else(|| format!("`{}` has no content_type", block.codename()))?
            .to_string();
        let order_by = block.text("order_by").and_then(OrderBy::parse);
        let limit = block.number("number_of_items")
            .filter(|n| *n >= 0.0)
            .map(|n| n as usize);
        Ok(Self { content_type, order_by, limit })
    }

    pub fn query(&self, mode: Mode) -> ListQuery {
        ListQuery::new(mode).order_by(self.order_by.clone()).limit(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingSection {
    pub codename: String,
    pub spec: ListingSpec,
}

/// How the assembled page renders, decided once from the page's single content block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RenderMode {
    Landing { block: String, sections: Vec<ListingSection> },
    Listing { block: String, content_type: String },
    Plain,
    /// Authoring does not match the page schema; the renderer decides what to show.
    Unrecognized { reason: String },
}

impl RenderMode {
    pub fn classify(response: &ItemResponse) -> Self {
        let page = &response.item;
        if page.content_type() == POST_TYPE {
            return RenderMode::Plain;
        }
        match page.element("content") {
            Some(ElementValue::ModularContent { .. }) => {}
            Some(_) => return unrecognized(format!("`content` of `{}` is not a linked-items element", page.codename())),
            None => return unrecognized(format!("`{}` has no content element", page.codename())),
        }
        let [codename] = page.linked("content") else {
            return RenderMode::Plain;
        };
        let Some(block) = response.linked_items.get(codename) else {
            return unrecognized(format!("content block `{codename}` of `{}` was not returned", page.codename()));
        };

        match block.content_type() {
            LANDING_PAGE_TYPE => {
                let sections = response.resolve(block, "sections")
                    .into_iter()
                    .filter(|s| s.content_type() == LISTING_SECTION_TYPE)
                    .filter_map(|s| match ListingSpec::from_item(s) {
                        Ok(spec) => Some(ListingSection { codename: s.codename().to_string(), spec }),
                        Err(reason) => {
                            warn!(page = %page.codename(), %reason, "skipping listing section");
                            None
                        }
                    })
                    .collect();
                RenderMode::Landing { block: codename.clone(), sections }
            }
            LISTING_PAGE_TYPE => match content_type_of(block) {
                Some(content_type) => RenderMode::Listing { block: codename.clone(), content_type: content_type.to_string() },
                None => unrecognized(format!("listing block `{codename}` has no content_type")),
            },
            _ => RenderMode::Plain,
        }
    }
}

fn unrecognized(reason: String) -> RenderMode {
    RenderMode::Unrecognized { reason }
}

fn content_type_of(block: &ContentItem) -> Option<&str> {
    block.text("content_type").or_else(|| block.choices("content_type").into_iter().next())
}

/// What the sitemap walk needs to know about a page's first content block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PageBlock<'a> {
    /// Listing page; its leaves come from items of this type.
    Listing(Option<&'a str>),
    Other,
    /// The block lies outside the fetched closure.
    Unresolved,
}

impl<'a> PageBlock<'a> {
    pub(crate) fn of(page: &ContentItem, closure: &'a LinkedItems) -> Self {
        let Some(first) = page.linked("content").first() else {
            return PageBlock::Other;
        };
        match closure.get(first) {
            Some(block) if block.content_type() == LISTING_PAGE_TYPE => PageBlock::Listing(content_type_of(block)),
            Some(_) => PageBlock::Other,
            None => PageBlock::Unresolved,
        }
    }
}
