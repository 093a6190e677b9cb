use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::source::{ContentSource, Direction, ItemQuery, ListQuery, OrderBy};
use crate::types::{ContentItem, ElementValue, ItemListing, ItemResponse, LinkedItems, Mode};

/// Linked-item depth the delivery API applies to list queries when none is given.
const DEFAULT_LIST_DEPTH: u32 = 1;

/// One call observed by a [`MemorySource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Item { codename: String, depth: u32, mode: Mode },
    List { content_type: String, mode: Mode },
}

impl Request {
    pub fn mode(&self) -> Mode {
        match self { Request::Item { mode, .. } | Request::List { mode, .. } => *mode }
    }
}

#[derive(Deserialize)]
struct Fixture {
    #[serde(default)]
    published: Vec<ContentItem>,
    /// Falls back to the published set when absent.
    #[serde(default)]
    preview: Option<Vec<ContentItem>>,
}

/// Content source backed by in-process item sets, one per mode.
///
/// Applies depth, projection, type filter, ordering and limit the way the delivery API
/// does and records every request. Used for offline rendering from a fixture file.
#[derive(Default)]
pub struct MemorySource {
    published: BTreeMap<String, ContentItem>,
    preview: BTreeMap<String, ContentItem>,
    requests: Mutex<Vec<Request>>,
}

impl MemorySource {
    pub fn new() -> Self { Self::default() }

    /// Add an item to both the published and the preview set.
    pub fn insert(&mut self, item: ContentItem) -> &mut Self {
        self.preview.insert(item.system.codename.clone(), item.clone());
        self.published.insert(item.system.codename.clone(), item);
        self
    }

    pub fn insert_for(&mut self, mode: Mode, item: ContentItem) -> &mut Self {
        let store = match mode { Mode::Published => &mut self.published, Mode::Preview => &mut self.preview };
        store.insert(item.system.codename.clone(), item);
        self
    }

    /// Build from JSON of the form `{ "published": [items], "preview": [items] }`.
    pub fn from_json(json: &str) -> Result<Self> {
        let fixture: Fixture = serde_json::from_str(json).context("parsing content fixture")?;
        let mut source = Self::new();
        let preview = fixture.preview.unwrap_or_else(|| fixture.published.clone());
        for item in fixture.published { source.insert_for(Mode::Published, item); }
        for item in preview { source.insert_for(Mode::Preview, item); }
        Ok(source)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading content fixture {}", path.display()))?;
        Self::from_json(&json)
    }

    /// Requests served so far, in arrival order.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, request: Request) {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).push(request);
    }

    fn store(&self, mode: Mode) -> &BTreeMap<String, ContentItem> {
        match mode { Mode::Published => &self.published, Mode::Preview => &self.preview }
    }

    /// Breadth-first expansion of references, `depth` levels deep.
    fn closure(store: &BTreeMap<String, ContentItem>, roots: &[ContentItem], depth: u32, elements: Option<&[String]>) -> LinkedItems {
        let mut out = LinkedItems::new();
        let mut frontier: Vec<ContentItem> = roots.to_vec();
        for _ in 0..depth {
            let mut next = Vec::new();
            for item in &frontier {
                for codename in item.references() {
                    if out.contains_key(codename) { continue; }
                    if let Some(linked) = store.get(codename) {
                        let linked = project(linked, elements);
                        out.insert(codename.clone(), linked.clone());
                        next.push(linked);
                    }
                }
            }
            if next.is_empty() { break; }
            frontier = next;
        }
        out
    }
}

fn project(item: &ContentItem, elements: Option<&[String]>) -> ContentItem {
    match elements {
        Some(names) => item.project(names),
        None => item.clone(),
    }
}

enum SortValue<'a> {
    Number(f64),
    Text(&'a str),
}

fn sort_value<'a>(item: &'a ContentItem, field: &str) -> Option<SortValue<'a>> {
    if let Some(sys) = field.strip_prefix("system.") {
        return match sys {
            "name" => Some(SortValue::Text(&item.system.name)),
            "codename" => Some(SortValue::Text(&item.system.codename)),
            "last_modified" => item.system.last_modified.as_deref().map(SortValue::Text),
            _ => None,
        };
    }
    let name = field.strip_prefix("elements.").unwrap_or(field);
    match item.element(name)? {
        ElementValue::Number { value } => value.map(SortValue::Number),
        _ => item.text(name).map(SortValue::Text),
    }
}

fn compare(a: &ContentItem, b: &ContentItem, order: &OrderBy) -> Ordering {
    let ord = match (sort_value(a, &order.field), sort_value(b, &order.field)) {
        (Some(SortValue::Number(x)), Some(SortValue::Number(y))) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(SortValue::Text(x)), Some(SortValue::Text(y))) => x.cmp(y),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    };
    match order.direction { Direction::Asc => ord, Direction::Desc => ord.reverse() }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn fetch_item(&self, codename: &str, query: &ItemQuery) -> Result<ItemResponse> {
        self.record(Request::Item { codename: codename.to_string(), depth: query.depth, mode: query.mode });
        let store = self.store(query.mode);
        let item = store.get(codename)
            .ok_or_else(|| anyhow!("item `{}` not found ({:?})", codename, query.mode))?;
        let item = project(item, query.elements.as_deref());
        let linked_items = Self::closure(store, std::slice::from_ref(&item), query.depth, query.elements.as_deref());
        Ok(ItemResponse { item, linked_items })
    }

    async fn fetch_items_by_type(&self, content_type: &str, query: &ListQuery) -> Result<ItemListing> {
        self.record(Request::List { content_type: content_type.to_string(), mode: query.mode });
        let store = self.store(query.mode);
        let mut items: Vec<&ContentItem> = store.values().filter(|i| i.content_type() == content_type).collect();
        if let Some(order) = &query.order_by {
            items.sort_by(|a, b| compare(a, b, order));
        }
        if let Some(limit) = query.limit {
            items.truncate(limit);
        }
        let items: Vec<ContentItem> = items.into_iter().map(|i| project(i, query.elements.as_deref())).collect();
        let depth = query.depth.unwrap_or(DEFAULT_LIST_DEPTH);
        let linked_items = Self::closure(store, &items, depth, query.elements.as_deref());
        Ok(ItemListing { items, linked_items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{item, linked, number, text};
    use pretty_assertions::assert_eq;

    fn sample() -> MemorySource {
        let mut source = MemorySource::new();
        source
            .insert(item("a", "page", vec![linked("children", &["b"]), text("title", "A")]))
            .insert(item("b", "page", vec![linked("children", &["c"])]))
            .insert(item("c", "page", vec![]))
            .insert(item("x1", "article", vec![number("rank", 2.0)]))
            .insert(item("x2", "article", vec![number("rank", 9.0)]))
            .insert(item("x3", "article", vec![number("rank", 5.0)]));
        source
    }

    #[tokio::test]
    async fn depth_bounds_the_closure() {
        let source = sample();
        let one = source.fetch_item("a", &ItemQuery::new(1, Mode::Published)).await.unwrap();
        assert_eq!(one.linked_items.keys().collect::<Vec<_>>(), vec!["b"]);
        let two = source.fetch_item("a", &ItemQuery::new(2, Mode::Published)).await.unwrap();
        assert_eq!(two.linked_items.keys().collect::<Vec<_>>(), vec!["b", "c"]);
        let none = source.fetch_item("a", &ItemQuery::new(0, Mode::Published)).await.unwrap();
        assert!(none.linked_items.is_empty());
    }

    #[tokio::test]
    async fn projection_prunes_expansion() {
        let source = sample();
        let res = source.fetch_item("a", &ItemQuery::new(3, Mode::Published).elements(&["title"])).await.unwrap();
        assert_eq!(res.item.elements.keys().collect::<Vec<_>>(), vec!["title"]);
        assert!(res.linked_items.is_empty());
    }

    #[tokio::test]
    async fn list_orders_and_limits() {
        let source = sample();
        let query = ListQuery::new(Mode::Published).order_by(OrderBy::parse("rank")).limit(Some(2));
        let listing = source.fetch_items_by_type("article", &query).await.unwrap();
        let codenames: Vec<_> = listing.items.iter().map(|i| i.codename()).collect();
        assert_eq!(codenames, vec!["x2", "x3"]);
    }

    #[tokio::test]
    async fn modes_are_separate() {
        let mut source = MemorySource::new();
        source.insert_for(Mode::Preview, item("draft", "page", vec![]));
        assert!(source.fetch_item("draft", &ItemQuery::new(0, Mode::Published)).await.is_err());
        assert!(source.fetch_item("draft", &ItemQuery::new(0, Mode::Preview)).await.is_ok());
        let modes: Vec<_> = source.requests().iter().map(Request::mode).collect();
        assert_eq!(modes, vec![Mode::Published, Mode::Preview]);
    }

    #[test]
    fn fixture_preview_defaults_to_published() {
        let json = r#"{ "published": [ { "system": { "codename": "homepage", "type": "homepage" }, "elements": {} } ] }"#;
        let source = MemorySource::from_json(json).unwrap();
        assert!(source.store(Mode::Preview).contains_key("homepage"));
        assert!(source.store(Mode::Published).contains_key("homepage"));
    }
}
