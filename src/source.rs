use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{ItemListing, ItemResponse, Mode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

/// Sort key for list queries. `field` is an element name unless it starts with `system.`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    /// Parse an authored ordering such as `date`, `date desc` or `title asc`.
    /// Without a direction the ordering is descending.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split_whitespace();
        let field = parts.next()?.to_string();
        let direction = match parts.next().map(|d| d.to_ascii_lowercase()) {
            Some(d) if d == "asc" || d == "ascending" => Direction::Asc,
            _ => Direction::Desc,
        };
        Some(Self { field, direction })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    pub depth: u32,
    /// Element allow-list; `None` returns every element.
    pub elements: Option<Vec<String>>,
    pub mode: Mode,
}

impl ItemQuery {
    pub fn new(depth: u32, mode: Mode) -> Self { Self { depth, elements: None, mode } }

    pub fn elements(mut self, names: &[&str]) -> Self {
        self.elements = Some(names.iter().map(|s| s.to_string()).collect());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListQuery {
    pub elements: Option<Vec<String>>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
    /// Linked-item depth; `None` leaves it to the source.
    pub depth: Option<u32>,
    pub mode: Mode,
}

impl ListQuery {
    pub fn new(mode: Mode) -> Self { Self { mode, ..Default::default() } }

    pub fn elements(mut self, names: &[&str]) -> Self {
        self.elements = Some(names.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn order_by(mut self, order: Option<OrderBy>) -> Self { self.order_by = order; self }
    pub fn limit(mut self, limit: Option<usize>) -> Self { self.limit = limit; self }
}

/// Read access to the headless CMS. Implementations bind their credentials at construction.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch one item by codename with linked items expanded up to `query.depth` levels.
    async fn fetch_item(&self, codename: &str, query: &ItemQuery) -> Result<ItemResponse>;

    /// Fetch all items of one content type, sorted and truncated as requested.
    async fn fetch_items_by_type(&self, content_type: &str, query: &ListQuery) -> Result<ItemListing>;
}
