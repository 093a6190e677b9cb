//! [`ContentSource`] over the Kontent.ai Delivery REST API.
//!
//! Published reads go to the delivery host, preview reads to the preview host with the
//! preview key as a bearer token. List queries without a limit are paged through until
//! the API reports no next page.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::settings::DeliverySettings;
use crate::source::{ContentSource, Direction, ItemQuery, ListQuery, OrderBy};
use crate::types::{ContentItem, ItemListing, ItemResponse, LinkedItems, Mode};

/// Items requested per page when a list query asks for everything.
const PAGE_SIZE: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Network, TLS or body decoding failure.
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("invalid delivery URL")]
    Url(#[from] url::ParseError),

    #[error("base URL cannot carry a path: {0}")]
    BaseUrl(String),

    #[error("no project id configured (set KONTENT_PROJECT_ID)")]
    MissingProjectId,

    #[error("preview requested but no preview API key is configured (set KONTENT_PREVIEW_API_KEY)")]
    MissingPreviewKey,
}

#[derive(Deserialize)]
struct ItemPayload {
    item: ContentItem,
    #[serde(default)]
    modular_content: LinkedItems,
}

#[derive(Deserialize)]
struct ListingPayload {
    items: Vec<ContentItem>,
    #[serde(default)]
    modular_content: LinkedItems,
    #[serde(default)]
    pagination: Pagination,
}

#[derive(Deserialize, Default)]
struct Pagination {
    #[serde(default)]
    next_page: String,
}

pub struct DeliveryClient {
    http: reqwest::Client,
    project_id: String,
    preview_api_key: Option<String>,
    base_url: Url,
    preview_base_url: Url,
}

impl DeliveryClient {
    pub fn new(settings: &DeliverySettings) -> Result<Self, DeliveryError> {
        let project_id = settings.project_id.clone()
            .filter(|p| !p.trim().is_empty())
            .ok_or(DeliveryError::MissingProjectId)?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("trellis/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            project_id,
            preview_api_key: settings.preview_api_key.clone(),
            base_url: Url::parse(&settings.base_url)?,
            preview_base_url: Url::parse(&settings.preview_base_url)?,
        })
    }

    fn endpoint(&self, mode: Mode, codename: Option<&str>) -> Result<Url, DeliveryError> {
        let base = match mode { Mode::Published => &self.base_url, Mode::Preview => &self.preview_base_url };
        let mut url = base.clone();
        {
            let mut segments = url.path_segments_mut()
                .map_err(|_| DeliveryError::BaseUrl(base.to_string()))?;
            segments.pop_if_empty().push(&self.project_id).push("items");
            if let Some(codename) = codename { segments.push(codename); }
        }
        Ok(url)
    }

    fn item_url(&self, codename: &str, query: &ItemQuery) -> Result<Url, DeliveryError> {
        let mut url = self.endpoint(query.mode, Some(codename))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("depth", &query.depth.to_string());
            if let Some(elements) = &query.elements { pairs.append_pair("elements", &elements.join(",")); }
        }
        Ok(url)
    }

    fn list_url(&self, content_type: &str, query: &ListQuery, limit: Option<usize>, skip: usize) -> Result<Url, DeliveryError> {
        let mut url = self.endpoint(query.mode, None)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("system.type", content_type);
            if let Some(elements) = &query.elements { pairs.append_pair("elements", &elements.join(",")); }
            if let Some(order) = &query.order_by { pairs.append_pair("order", &order_param(order)); }
            if let Some(depth) = query.depth { pairs.append_pair("depth", &depth.to_string()); }
            if let Some(limit) = limit { pairs.append_pair("limit", &limit.to_string()); }
            if skip > 0 { pairs.append_pair("skip", &skip.to_string()); }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, mode: Mode) -> Result<T, DeliveryError> {
        let mut request = self.http.get(url.clone()).header(ACCEPT, "application/json");
        if mode.is_preview() {
            let key = self.preview_api_key.as_deref().ok_or(DeliveryError::MissingPreviewKey)?;
            request = request.bearer_auth(key);
        }
        debug!(%url, ?mode, "delivery request");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await
                .unwrap_or_else(|_| "(unable to read error body)".to_owned());
            return Err(DeliveryError::Status { status: status.as_u16(), body });
        }
        Ok(response.json::<T>().await?)
    }
}

fn order_param(order: &OrderBy) -> String {
    let field = if order.field.starts_with("system.") || order.field.starts_with("elements.") {
        order.field.clone()
    } else {
        format!("elements.{}", order.field)
    };
    let direction = match order.direction { Direction::Asc => "asc", Direction::Desc => "desc" };
    format!("{field}[{direction}]")
}

#[async_trait]
impl ContentSource for DeliveryClient {
    async fn fetch_item(&self, codename: &str, query: &ItemQuery) -> Result<ItemResponse> {
        let url = self.item_url(codename, query)?;
        let payload: ItemPayload = self.get_json(url, query.mode).await?;
        Ok(ItemResponse { item: payload.item, linked_items: payload.modular_content })
    }

    async fn fetch_items_by_type(&self, content_type: &str, query: &ListQuery) -> Result<ItemListing> {
        if let Some(limit) = query.limit {
            let url = self.list_url(content_type, query, Some(limit), 0)?;
            let payload: ListingPayload = self.get_json(url, query.mode).await?;
            return Ok(ItemListing { items: payload.items, linked_items: payload.modular_content });
        }

        let mut listing = ItemListing::default();
        loop {
            let url = self.list_url(content_type, query, Some(PAGE_SIZE), listing.items.len())?;
            let payload: ListingPayload = self.get_json(url, query.mode).await?;
            let page_len = payload.items.len();
            listing.items.extend(payload.items);
            for (codename, item) in payload.modular_content {
                listing.linked_items.entry(codename).or_insert(item);
            }
            if payload.pagination.next_page.is_empty() || page_len == 0 {
                break;
            }
        }
        debug!(content_type, items = listing.items.len(), "listing fetched");
        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn client() -> DeliveryClient {
        let settings = DeliverySettings {
            project_id: Some("p-123".into()),
            preview_api_key: Some("secret".into()),
            ..Default::default()
        };
        DeliveryClient::new(&settings).unwrap()
    }

    #[test]
    fn item_urls_carry_depth_and_projection() {
        let query = ItemQuery::new(3, Mode::Published).elements(&["subpages", "slug"]);
        let url = client().item_url("homepage", &query).unwrap();
        assert_eq!(url.as_str(), "https://deliver.kontent.ai/p-123/items/homepage?depth=3&elements=subpages%2Cslug");
    }

    #[test]
    fn preview_uses_preview_host() {
        let url = client().item_url("homepage", &ItemQuery::new(5, Mode::Preview)).unwrap();
        assert_eq!(url.host_str(), Some("preview-deliver.kontent.ai"));
        assert_eq!(url.path(), "/p-123/items/homepage");
    }

    #[test]
    fn list_urls_encode_order_limit_and_paging() {
        let query = ListQuery::new(Mode::Published)
            .order_by(OrderBy::parse("date desc"))
            .limit(Some(3));
        let url = client().list_url("article", &query, query.limit, 0).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![
            ("system.type".to_string(), "article".to_string()),
            ("order".to_string(), "elements.date[desc]".to_string()),
            ("limit".to_string(), "3".to_string()),
        ]);

        let paged = client().list_url("article", &ListQuery::new(Mode::Published), Some(PAGE_SIZE), 2000).unwrap();
        assert!(paged.query().unwrap().ends_with("limit=1000&skip=2000"));
    }

    #[test]
    fn system_fields_are_not_prefixed() {
        let order = OrderBy { field: "system.last_modified".into(), direction: Direction::Asc };
        assert_eq!(order_param(&order), "system.last_modified[asc]");
    }

    #[test]
    fn project_id_is_required() {
        let err = DeliveryClient::new(&DeliverySettings::default()).err().unwrap();
        assert!(matches!(err, DeliveryError::MissingProjectId));
    }

    #[tokio::test]
    async fn preview_without_key_fails_before_sending() {
        let settings = DeliverySettings { project_id: Some("p".into()), ..Default::default() };
        let client = DeliveryClient::new(&settings).unwrap();
        let err = client.fetch_item("homepage", &ItemQuery::new(1, Mode::Preview)).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<DeliveryError>(), Some(DeliveryError::MissingPreviewKey)));
    }

    #[test]
    fn decodes_listing_payload() {
        let json = r#"{
            "items": [ { "system": { "codename": "a", "type": "article" }, "elements": { "slug": { "type": "text", "name": "Slug", "value": "a" } } } ],
            "modular_content": {},
            "pagination": { "skip": 0, "limit": 1000, "count": 1, "next_page": "" }
        }"#;
        let payload: ListingPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.items[0].text("slug"), Some("a"));
        assert!(payload.pagination.next_page.is_empty());
    }
}
