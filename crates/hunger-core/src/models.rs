//! Core data models for the annotation work queue.
//!
//! These types are shared by the remote clients, the buffer controller and
//! the front-ends, and represent the domain entities of a session.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Stable identifier of a candidate item (insight id, logo id, or barcode).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Filter generation: incremented on every effective filter change.
///
/// Every fetch is tagged with the generation it was issued under; a response
/// is only applied while its tag is still the live generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// The generation that follows this one.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// FILTER CONFIGURATION
// =============================================================================

/// Where candidates come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Robotoff insight questions (yes / no / skip on a predicted value).
    #[default]
    Questions,
    /// Products whose packaging still needs to be completed.
    Products,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateSource::Questions => "questions",
            CandidateSource::Products => "products",
        }
    }
}

/// Immutable filter configuration. Equality is structural.
///
/// Empty strings are treated the same as absent values, see [`FilterConfig::normalized`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterConfig {
    pub source: CandidateSource,
    /// Insight / question type (e.g. `label`, `brand`, `category`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insight_type: Option<String>,
    /// Target value tag (e.g. `en:nutriscore-grade-a`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    /// Exact product code. When set, pagination is bypassed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub sort_by_popularity: bool,
}

impl FilterConfig {
    /// Filter over Robotoff questions.
    pub fn questions() -> Self {
        Self {
            source: CandidateSource::Questions,
            ..Default::default()
        }
    }

    /// Filter over products to complete.
    pub fn products() -> Self {
        Self {
            source: CandidateSource::Products,
            ..Default::default()
        }
    }

    pub fn with_insight_type(mut self, insight_type: impl Into<String>) -> Self {
        self.insight_type = Some(insight_type.into());
        self
    }

    pub fn with_value_tag(mut self, value_tag: impl Into<String>) -> Self {
        self.value_tag = Some(value_tag.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_sort_by_popularity(mut self, popular: bool) -> Self {
        self.sort_by_popularity = popular;
        self
    }

    /// Returns a copy where empty or whitespace-only strings become `None`.
    pub fn normalized(&self) -> Self {
        fn clean(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        }

        Self {
            source: self.source,
            insight_type: clean(&self.insight_type),
            value_tag: clean(&self.value_tag),
            country: clean(&self.country),
            creator: clean(&self.creator),
            brand: clean(&self.brand),
            code: clean(&self.code),
            sort_by_popularity: self.sort_by_popularity,
        }
    }

    /// Whether this filter targets a single item by exact code.
    pub fn is_by_code(&self) -> bool {
        self.code.as_deref().is_some_and(|c| !c.trim().is_empty())
    }
}

// =============================================================================
// CANDIDATE ITEMS
// =============================================================================

/// Kind of remote object a candidate represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Insight,
    Logo,
    Product,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Insight => "insight",
            ItemKind::Logo => "logo",
            ItemKind::Product => "product",
        }
    }
}

/// Display payload of a candidate. Only what the renderer needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Question text, or product name for products.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insight_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    /// Remaining source fields (packagings, images, states, ...).
    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub extra: JsonValue,
}

/// One unit of work awaiting an annotation decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    pub id: ItemId,
    pub kind: ItemKind,
    pub payload: ItemPayload,
    /// Transient batch-mode flag. Set on read from the selection set.
    #[serde(default)]
    pub selected: bool,
}

impl CandidateItem {
    pub fn new(id: impl Into<ItemId>, kind: ItemKind) -> Self {
        Self {
            id: id.into(),
            kind,
            payload: ItemPayload::default(),
            selected: false,
        }
    }

    pub fn with_payload(mut self, payload: ItemPayload) -> Self {
        self.payload = payload;
        self
    }
}

// =============================================================================
// PAGINATION
// =============================================================================

/// Page cursor for a filter generation.
///
/// `max_page` is a hint derived from the last reported total count; the
/// remote total moves while other users annotate, so it is never exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageCursor {
    pub page_number: u32,
    pub page_size: u32,
    pub max_page: u32,
}

impl PageCursor {
    pub fn new(page_number: u32, page_size: u32, max_page: u32) -> Self {
        Self {
            page_number: page_number.max(1),
            page_size: page_size.max(1),
            max_page: max_page.max(1),
        }
    }

    /// `ceil(total / page_size)`, never below 1.
    pub fn max_page_for(total_count: u64, page_size: u32) -> u32 {
        let page_size = u64::from(page_size.max(1));
        let pages = total_count.div_ceil(page_size).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }
}

/// Request handed to a [`crate::PageSource`].
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub filter: FilterConfig,
    pub page: u32,
    pub page_size: u32,
}

/// One page of candidates plus pagination metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<CandidateItem>,
    pub total_count: u64,
    pub page_size: u32,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// ANNOTATION
// =============================================================================

/// Tri-state judgment. Serialized as the integer the annotation API expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum AnnotationValue {
    /// "No" / wrong prediction.
    Negative,
    /// "Skip" / don't know.
    Unknown,
    /// "Yes" / correct prediction.
    Affirmative,
}

impl AnnotationValue {
    pub fn as_i8(&self) -> i8 {
        match self {
            AnnotationValue::Negative => 0,
            AnnotationValue::Unknown => -1,
            AnnotationValue::Affirmative => 1,
        }
    }
}

impl From<AnnotationValue> for i8 {
    fn from(value: AnnotationValue) -> Self {
        value.as_i8()
    }
}

impl TryFrom<i8> for AnnotationValue {
    type Error = String;

    fn try_from(value: i8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(AnnotationValue::Negative),
            -1 => Ok(AnnotationValue::Unknown),
            1 => Ok(AnnotationValue::Affirmative),
            other => Err(format!("invalid annotation value: {other}")),
        }
    }
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i8())
    }
}

/// A user decision on one item. Ephemeral.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationDecision {
    pub item_id: ItemId,
    pub value: AnnotationValue,
    /// Delay before the item leaves the buffer (visual undo window).
    pub pending_delay_ms: Option<u64>,
    /// Classification type override. Defaults to the item's insight type.
    pub annotation_type: Option<String>,
    /// Label override (logo annotations). Defaults to the item's value tag.
    pub label: Option<String>,
}

impl AnnotationDecision {
    pub fn new(item_id: impl Into<ItemId>, value: AnnotationValue) -> Self {
        Self {
            item_id: item_id.into(),
            value,
            pending_delay_ms: None,
            annotation_type: None,
            label: None,
        }
    }

    pub fn with_pending_delay(mut self, ms: u64) -> Self {
        self.pending_delay_ms = Some(ms);
        self
    }

    pub fn with_annotation_type(mut self, annotation_type: impl Into<String>) -> Self {
        self.annotation_type = Some(annotation_type.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Build the wire record for `item`, applying this decision's overrides.
    pub fn to_record(&self, item: &CandidateItem) -> AnnotationRecord {
        AnnotationRecord {
            item_id: item.id.clone(),
            kind: item.kind,
            value: self.value,
            annotation_type: self
                .annotation_type
                .clone()
                .or_else(|| item.payload.insight_type.clone()),
            label: self.label.clone().or_else(|| item.payload.value_tag.clone()),
        }
    }
}

/// Wire-level annotation record sent to an [`crate::AnnotationSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationRecord {
    pub item_id: ItemId,
    pub kind: ItemKind,
    pub value: AnnotationValue,
    /// Classification type (insight type, or logo type).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation_type: Option<String>,
    /// Label value for logo annotations (e.g. `en:organic`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_structural_equality() {
        let a = FilterConfig::questions()
            .with_insight_type("label")
            .with_value_tag("en:nutriscore-grade-a");
        let b = FilterConfig::questions()
            .with_insight_type("label")
            .with_value_tag("en:nutriscore-grade-a");
        assert_eq!(a, b);
        assert_ne!(a, b.clone().with_country("en:france"));
    }

    #[test]
    fn test_filter_normalized_drops_empty_strings() {
        let filter = FilterConfig::products()
            .with_country("")
            .with_creator("  ")
            .with_brand("lu");
        let normalized = filter.normalized();
        assert_eq!(normalized.country, None);
        assert_eq!(normalized.creator, None);
        assert_eq!(normalized.brand.as_deref(), Some("lu"));
        assert_eq!(normalized, FilterConfig::products().with_brand("lu"));
    }

    #[test]
    fn test_filter_is_by_code() {
        assert!(!FilterConfig::products().is_by_code());
        assert!(!FilterConfig::products().with_code("").is_by_code());
        assert!(FilterConfig::products().with_code("3017620422003").is_by_code());
    }

    #[test]
    fn test_generation_next() {
        let g = Generation::default();
        assert_eq!(g.value(), 0);
        assert_eq!(g.next().value(), 1);
        assert!(g.next() > g);
    }

    #[test]
    fn test_max_page_rounds_up() {
        assert_eq!(PageCursor::max_page_for(0, 50), 1);
        assert_eq!(PageCursor::max_page_for(50, 50), 1);
        assert_eq!(PageCursor::max_page_for(51, 50), 2);
        assert_eq!(PageCursor::max_page_for(149, 50), 3);
    }

    #[test]
    fn test_page_cursor_clamps_inputs() {
        let cursor = PageCursor::new(0, 0, 0);
        assert_eq!(cursor.page_number, 1);
        assert_eq!(cursor.page_size, 1);
        assert_eq!(cursor.max_page, 1);
    }

    #[test]
    fn test_annotation_value_wire_format() {
        assert_eq!(serde_json::to_string(&AnnotationValue::Negative).unwrap(), "0");
        assert_eq!(serde_json::to_string(&AnnotationValue::Unknown).unwrap(), "-1");
        assert_eq!(serde_json::to_string(&AnnotationValue::Affirmative).unwrap(), "1");
        let parsed: AnnotationValue = serde_json::from_str("-1").unwrap();
        assert_eq!(parsed, AnnotationValue::Unknown);
        assert!(serde_json::from_str::<AnnotationValue>("2").is_err());
    }

    #[test]
    fn test_decision_to_record_defaults_from_item() {
        let item = CandidateItem::new("insight-1", ItemKind::Insight).with_payload(ItemPayload {
            insight_type: Some("label".into()),
            value_tag: Some("en:organic".into()),
            ..Default::default()
        });
        let record = AnnotationDecision::new("insight-1", AnnotationValue::Affirmative).to_record(&item);
        assert_eq!(record.annotation_type.as_deref(), Some("label"));
        assert_eq!(record.label.as_deref(), Some("en:organic"));
        assert_eq!(record.kind, ItemKind::Insight);
    }

    #[test]
    fn test_decision_overrides_take_precedence() {
        let item = CandidateItem::new("logo-9", ItemKind::Logo).with_payload(ItemPayload {
            insight_type: Some("label".into()),
            ..Default::default()
        });
        let record = AnnotationDecision::new("logo-9", AnnotationValue::Affirmative)
            .with_annotation_type("brand")
            .with_label("ferrero")
            .to_record(&item);
        assert_eq!(record.annotation_type.as_deref(), Some("brand"));
        assert_eq!(record.label.as_deref(), Some("ferrero"));
    }

    #[test]
    fn test_candidate_item_serializes_kind_snake_case() {
        let item = CandidateItem::new("abc", ItemKind::Insight);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["kind"], "insight");
        assert_eq!(json["id"], "abc");
        assert_eq!(json["selected"], false);
    }
}
