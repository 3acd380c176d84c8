//! Candidate search client for products and Robotoff questions.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, instrument, warn};

use hunger_core::{
    CandidateItem, Error, ItemKind, ItemPayload, Page, PageRequest, PageSource, Result,
};

use crate::config::RemoteConfig;
use crate::error::fetch_error;
use crate::query::{QueryBuilder, QueryDescriptor, ResponseShape};

const SLOW_FETCH_MS: u64 = 5000;

/// HTTP implementation of [`PageSource`].
#[derive(Clone)]
pub struct SearchClient {
    client: Client,
    queries: QueryBuilder,
}

impl SearchClient {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = config.build_client()?;
        Ok(Self {
            client,
            queries: QueryBuilder::new(&config),
        })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(RemoteConfig::from_env())
    }

    pub fn queries(&self) -> &QueryBuilder {
        &self.queries
    }

    async fn get(&self, descriptor: &QueryDescriptor) -> Result<JsonValue> {
        let url = descriptor.to_url()?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::FetchFailed(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(fetch_error(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| Error::FetchFailed(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl PageSource for SearchClient {
    #[instrument(skip(self, request), fields(subsystem = "remote", component = "search", op = "fetch_page", source = request.filter.source.as_str(), page = request.page))]
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page> {
        let start = Instant::now();
        let descriptor = self
            .queries
            .build(&request.filter, request.page, request.page_size);

        let body = self.get(&descriptor).await?;
        let page = parse_page(descriptor.shape, body, request.page_size)?;

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            item_count = page.items.len(),
            total_count = page.total_count,
            duration_ms = elapsed,
            "Page fetched"
        );
        if elapsed > SLOW_FETCH_MS {
            warn!(duration_ms = elapsed, slow = true, "Slow page fetch");
        }
        Ok(page)
    }
}

// =============================================================================
// RESPONSE PARSING
// =============================================================================

#[derive(Debug, Deserialize)]
struct QuestionsResponse {
    #[serde(default)]
    questions: Vec<Question>,
    #[serde(default, deserialize_with = "lenient_u64")]
    count: u64,
}

#[derive(Debug, Deserialize)]
struct Question {
    insight_id: String,
    #[serde(default)]
    insight_type: Option<String>,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    value_tag: Option<String>,
    #[serde(default)]
    source_image_url: Option<String>,
    #[serde(default)]
    barcode: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProductSearchResponse {
    #[serde(default)]
    products: Vec<Map<String, JsonValue>>,
    #[serde(default, deserialize_with = "lenient_u64")]
    count: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    page_size: u64,
}

#[derive(Debug, Deserialize)]
struct SingleProductResponse {
    #[serde(default)]
    product: Option<Map<String, JsonValue>>,
}

/// Turn a raw response body into a [`Page`].
pub(crate) fn parse_page(shape: ResponseShape, body: JsonValue, page_size: u32) -> Result<Page> {
    let invalid = |e: serde_json::Error| Error::FetchFailed(format!("Unexpected response shape: {}", e));

    match shape {
        ResponseShape::Questions => {
            let response: QuestionsResponse = serde_json::from_value(body).map_err(invalid)?;
            Ok(Page {
                items: response.questions.into_iter().map(question_item).collect(),
                total_count: response.count,
                page_size,
            })
        }
        ResponseShape::ProductSearch => {
            let response: ProductSearchResponse = serde_json::from_value(body).map_err(invalid)?;
            let reported = u32::try_from(response.page_size).unwrap_or(0);
            Ok(Page {
                items: response.products.into_iter().filter_map(product_item).collect(),
                total_count: response.count,
                page_size: if reported > 0 { reported } else { page_size },
            })
        }
        ResponseShape::SingleProduct => {
            let response: SingleProductResponse = serde_json::from_value(body).map_err(invalid)?;
            let items: Vec<CandidateItem> =
                response.product.into_iter().filter_map(product_item).collect();
            Ok(Page {
                total_count: items.len() as u64,
                items,
                page_size,
            })
        }
    }
}

fn question_item(question: Question) -> CandidateItem {
    CandidateItem::new(question.insight_id, ItemKind::Insight).with_payload(ItemPayload {
        image_url: question.source_image_url,
        text: question.question,
        value: question.value,
        value_tag: question.value_tag,
        insight_type: question.insight_type,
        barcode: question.barcode,
        extra: JsonValue::Null,
    })
}

/// Products without a usable code are dropped.
fn product_item(mut product: Map<String, JsonValue>) -> Option<CandidateItem> {
    let code = match product.remove("code")? {
        JsonValue::String(s) if !s.trim().is_empty() => s,
        JsonValue::Number(n) => n.to_string(),
        _ => return None,
    };
    let image_url = take_string(&mut product, "image_packaging_url");
    let text = take_string(&mut product, "product_name");

    Some(
        CandidateItem::new(code.clone(), ItemKind::Product).with_payload(ItemPayload {
            image_url,
            text,
            barcode: Some(code),
            extra: JsonValue::Object(product),
            ..Default::default()
        }),
    )
}

fn take_string(map: &mut Map<String, JsonValue>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(JsonValue::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Accepts numbers, numeric strings and null.
fn lenient_u64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = JsonValue::deserialize(deserializer)?;
    Ok(match value {
        JsonValue::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        JsonValue::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_questions() {
        let body = json!({
            "status": "found",
            "count": 1234,
            "questions": [{
                "insight_id": "a1b2",
                "insight_type": "label",
                "question": "Does the product have this label?",
                "value": "Organic",
                "value_tag": "en:organic",
                "source_image_url": "https://images.test/1/1.400.jpg",
                "barcode": "3017620422003"
            }]
        });
        let page = parse_page(ResponseShape::Questions, body, 10).unwrap();
        assert_eq!(page.total_count, 1234);
        assert_eq!(page.items.len(), 1);
        let item = &page.items[0];
        assert_eq!(item.id.as_str(), "a1b2");
        assert_eq!(item.kind, ItemKind::Insight);
        assert_eq!(item.payload.value_tag.as_deref(), Some("en:organic"));
        assert_eq!(item.payload.barcode.as_deref(), Some("3017620422003"));
    }

    #[test]
    fn test_parse_no_questions() {
        let page = parse_page(ResponseShape::Questions, json!({"status": "no_questions", "count": 0}), 10)
            .unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total_count, 0);
    }

    #[test]
    fn test_parse_product_search_with_string_counts() {
        let body = json!({
            "count": "120",
            "page_size": "50",
            "products": [
                {"code": "123", "product_name": "Biscuits", "image_packaging_url": "https://img/1.jpg", "creator": "kiliweb"},
                {"code": 456, "product_name": ""},
                {"product_name": "no code"}
            ]
        });
        let page = parse_page(ResponseShape::ProductSearch, body, 50).unwrap();
        assert_eq!(page.total_count, 120);
        assert_eq!(page.page_size, 50);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].payload.text.as_deref(), Some("Biscuits"));
        assert_eq!(page.items[0].payload.extra["creator"], "kiliweb");
        assert_eq!(page.items[1].id.as_str(), "456");
        assert_eq!(page.items[1].payload.text, None);
    }

    #[test]
    fn test_parse_product_search_missing_page_size_uses_request() {
        let body = json!({"count": 3, "products": []});
        let page = parse_page(ResponseShape::ProductSearch, body, 24).unwrap();
        assert_eq!(page.page_size, 24);
    }

    #[test]
    fn test_parse_single_product() {
        let body = json!({"product": {"code": "3017620422003", "product_name": "Spread"}});
        let page = parse_page(ResponseShape::SingleProduct, body, 50).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].kind, ItemKind::Product);
    }

    #[test]
    fn test_parse_single_product_missing() {
        let page = parse_page(ResponseShape::SingleProduct, json!({"status": "failure"}), 50).unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        let result = parse_page(ResponseShape::Questions, json!({"questions": "nope"}), 10);
        assert!(matches!(result, Err(Error::FetchFailed(_))));
    }
}
