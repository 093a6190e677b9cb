use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Codename-keyed set of items resolved inline alongside a fetch.
pub type LinkedItems = BTreeMap<String, ContentItem>;

/// Published or preview content. Every request of one resolution pass uses the same mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Published,
    Preview,
}

impl Mode {
    pub fn from_preview(preview: bool) -> Self {
        if preview { Mode::Preview } else { Mode::Published }
    }

    pub fn is_preview(self) -> bool { matches!(self, Mode::Preview) }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SystemInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub codename: String,
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    pub url: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub codename: String,
    #[serde(default)]
    pub name: String,
}

/// Typed value of one element, discriminated by the `type` tag of the delivery payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementValue {
    Text { value: Option<String> },
    RichText {
        #[serde(default)]
        value: String,
        #[serde(default)]
        modular_content: Vec<String>,
    },
    Number { value: Option<f64> },
    MultipleChoice {
        #[serde(default)]
        value: Vec<Choice>,
    },
    DateTime { value: Option<String> },
    Asset {
        #[serde(default)]
        value: Vec<Asset>,
    },
    ModularContent {
        #[serde(default)]
        value: Vec<String>,
    },
    Taxonomy {
        #[serde(default)]
        value: Vec<Choice>,
    },
    /// Web Spotlight page tree link; holds codenames like `modular_content`.
    Subpages {
        #[serde(default)]
        value: Vec<String>,
    },
    UrlSlug { value: Option<String> },
    Custom { value: Option<String> },
    /// Any other element type, kept verbatim.
    #[serde(untagged)]
    Unknown {
        #[serde(rename = "type", default)]
        kind: String,
        #[serde(default)]
        value: serde_json::Value,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub value: ElementValue,
}

impl Element {
    pub fn new(value: ElementValue) -> Self { Self { name: String::new(), value } }
}

/// One structured record from the content source. Links to other items are codenames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub system: SystemInfo,
    #[serde(default)]
    pub elements: BTreeMap<String, Element>,
}

impl ContentItem {
    pub fn codename(&self) -> &str { &self.system.codename }
    pub fn content_type(&self) -> &str { &self.system.content_type }

    pub fn element(&self, name: &str) -> Option<&ElementValue> {
        self.elements.get(name).map(|e| &e.value)
    }

    /// Text of a text-like element (text, url slug, custom, date). Empty strings count as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        let value = match self.element(name)? {
            ElementValue::Text { value }
            | ElementValue::UrlSlug { value }
            | ElementValue::Custom { value }
            | ElementValue::DateTime { value } => value.as_deref(),
            _ => None,
        };
        value.filter(|s| !s.is_empty())
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.element(name)? {
            ElementValue::Number { value } => *value,
            _ => None,
        }
    }

    /// Codenames of linked items, in authored order.
    pub fn linked(&self, name: &str) -> &[String] {
        match self.element(name) {
            Some(ElementValue::ModularContent { value }) | Some(ElementValue::Subpages { value }) => value,
            Some(ElementValue::RichText { modular_content, .. }) => modular_content,
            _ => &[],
        }
    }

    pub fn choices(&self, name: &str) -> Vec<&str> {
        match self.element(name) {
            Some(ElementValue::MultipleChoice { value }) | Some(ElementValue::Taxonomy { value }) => {
                value.iter().map(|c| c.codename.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Copy restricted to the given element names (projection as the delivery API applies it).
    pub fn project(&self, names: &[String]) -> ContentItem {
        let elements = self.elements.iter()
            .filter(|(k, _)| names.iter().any(|n| n == *k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        ContentItem { system: self.system.clone(), elements }
    }

    /// Every codename referenced by this item's elements.
    pub(crate) fn references(&self) -> impl Iterator<Item = &String> {
        self.elements.values().flat_map(|e| match &e.value {
            ElementValue::ModularContent { value } | ElementValue::Subpages { value } => value.as_slice(),
            ElementValue::RichText { modular_content, .. } => modular_content.as_slice(),
            _ => &[],
        })
    }
}

/// A single item plus the linked items inlined with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResponse {
    pub item: ContentItem,
    #[serde(default)]
    pub linked_items: LinkedItems,
}

impl ItemResponse {
    /// Resolve `name` on `item` against this response's closure. References beyond the depth bound are skipped.
    pub fn resolve<'a>(&'a self, item: &'a ContentItem, name: &str) -> Vec<&'a ContentItem> {
        resolve_in(&self.linked_items, item, name)
    }
}

/// A list query result plus the linked items of all returned items.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemListing {
    pub items: Vec<ContentItem>,
    #[serde(default)]
    pub linked_items: LinkedItems,
}

pub(crate) fn resolve_in<'a>(closure: &'a LinkedItems, item: &'a ContentItem, name: &str) -> Vec<&'a ContentItem> {
    item.linked(name).iter().filter_map(|c| closure.get(c)).collect()
}
