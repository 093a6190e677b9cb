//! Item builders shared by the unit tests.

use std::collections::BTreeMap;

use crate::types::{ContentItem, Element, ElementValue, SystemInfo};

pub(crate) fn item(codename: &str, content_type: &str, elements: Vec<(String, Element)>) -> ContentItem {
    ContentItem {
        system: SystemInfo {
            id: format!("id-{codename}"),
            name: codename.to_string(),
            codename: codename.to_string(),
            content_type: content_type.to_string(),
            ..Default::default()
        },
        elements: elements.into_iter().collect::<BTreeMap<_, _>>(),
    }
}

pub(crate) fn text(name: &str, value: &str) -> (String, Element) {
    (name.to_string(), Element::new(ElementValue::Text { value: Some(value.to_string()) }))
}

pub(crate) fn number(name: &str, value: f64) -> (String, Element) {
    (name.to_string(), Element::new(ElementValue::Number { value: Some(value) }))
}

pub(crate) fn linked(name: &str, codenames: &[&str]) -> (String, Element) {
    let value = codenames.iter().map(|c| c.to_string()).collect();
    (name.to_string(), Element::new(ElementValue::ModularContent { value }))
}

/// A page node with a slug, subpages and content block references.
pub(crate) fn page(codename: &str, slug: &str, subpages: &[&str], content: &[&str]) -> ContentItem {
    item(codename, "page", vec![
        text("slug", slug),
        linked("subpages", subpages),
        linked("content", content),
    ])
}

pub(crate) fn listing_block(codename: &str, content_type: &str) -> ContentItem {
    item(codename, "listing_page", vec![text("content_type", content_type)])
}

pub(crate) fn article(codename: &str, slug: &str, date: &str) -> ContentItem {
    item(codename, "article", vec![
        text("slug", slug),
        (
            "date".to_string(),
            Element::new(ElementValue::DateTime { value: Some(date.to_string()) }),
        ),
        text("title", codename),
    ])
}
