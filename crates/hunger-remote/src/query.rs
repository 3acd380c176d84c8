//! Query builder: maps a filter configuration and a page number to a
//! deterministic remote query descriptor.
//!
//! This is a pure mapping. The product search uses positionally indexed tag
//! filters: indices 0 and 1 are the fixed eligibility tags, the country takes
//! the next index when present, then the creator, then the brand. The index
//! layout is part of the wire contract and must not be reordered.

use reqwest::Url;

use hunger_core::{defaults, CandidateSource, Error, FilterConfig, Result};

use crate::config::RemoteConfig;

/// Fields requested from the product search (renderer needs only these).
pub const PRODUCT_SEARCH_FIELDS: &str =
    "code,states,lang,image_packaging_url,packagings,product_name,images,creator,countries";

/// Fields requested from the by-identifier product endpoint.
pub const PRODUCT_FIELDS: &str =
    "code,lang,image_packaging_url,product_name,packagings,images,creator,countries";

/// State tags a product must carry to be eligible for packaging annotation.
pub const PRODUCT_ELIGIBILITY_TAGS: [&str; 2] =
    ["packaging-to-be-completed", "packaging-photo-selected"];

/// Shape of the response a descriptor will produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `{ questions: [...], count }`
    Questions,
    /// `{ products: [...], count, page_size }`
    ProductSearch,
    /// `{ product: {...} }`, wrapped into a one-item page.
    SingleProduct,
}

/// A fully resolved GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDescriptor {
    pub url: String,
    pub params: Vec<(String, String)>,
    pub shape: ResponseShape,
    /// Page requested, `None` when pagination is bypassed.
    pub page: Option<u32>,
}

impl QueryDescriptor {
    /// Look up a query parameter by name.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether this descriptor bypasses pagination.
    pub fn is_by_identifier(&self) -> bool {
        self.page.is_none()
    }

    /// Render the full URL with encoded parameters.
    pub fn to_url(&self) -> Result<Url> {
        Url::parse_with_params(&self.url, &self.params)
            .map_err(|e| Error::InvalidInput(format!("Invalid query URL {}: {}", self.url, e)))
    }
}

/// Builds [`QueryDescriptor`]s against configured endpoints.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    search_url: String,
    product_url: String,
    robotoff_url: String,
    lang: String,
}

impl QueryBuilder {
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            search_url: config.off_search_url.clone(),
            product_url: config.off_product_url.trim_end_matches('/').to_string(),
            robotoff_url: config.robotoff_url.trim_end_matches('/').to_string(),
            lang: config.lang.clone(),
        }
    }

    /// Map `(filter, page)` to a descriptor.
    pub fn build(&self, filter: &FilterConfig, page: u32, page_size: u32) -> QueryDescriptor {
        let filter = filter.normalized();
        match (filter.source, filter.code.as_deref()) {
            (CandidateSource::Products, Some(code)) => self.product_by_code(code),
            (CandidateSource::Products, None) => self.product_search(&filter, page, page_size),
            (CandidateSource::Questions, Some(code)) => self.questions_by_code(code, page_size),
            (CandidateSource::Questions, None) => self.questions(&filter, page, page_size),
        }
    }

    fn product_by_code(&self, code: &str) -> QueryDescriptor {
        QueryDescriptor {
            url: format!("{}/{}.json", self.product_url, code),
            params: vec![param("fields", PRODUCT_FIELDS)],
            shape: ResponseShape::SingleProduct,
            page: None,
        }
    }

    fn product_search(&self, filter: &FilterConfig, page: u32, page_size: u32) -> QueryDescriptor {
        let page = page.max(1);
        let mut params = vec![
            param("json", "true"),
            param("page", page.to_string()),
            param("page_size", page_size.to_string()),
            param("fields", PRODUCT_SEARCH_FIELDS),
            param("action", "process"),
            param("sort_by", "unique_scans_n"),
        ];

        let mut index = 0;
        for tag in PRODUCT_ELIGIBILITY_TAGS {
            push_tag(&mut params, index, "states", tag);
            index += 1;
        }

        let country = filter
            .country
            .as_deref()
            .unwrap_or(defaults::PRODUCT_COUNTRY);
        if country != defaults::WORLD_COUNTRY {
            push_tag(&mut params, index, "countries", country);
            index += 1;
        }
        if let Some(creator) = filter.creator.as_deref() {
            push_tag(&mut params, index, "creator", creator);
            index += 1;
        }
        if let Some(brand) = filter.brand.as_deref() {
            push_tag(&mut params, index, "brands", brand);
        }

        QueryDescriptor {
            url: self.search_url.clone(),
            params,
            shape: ResponseShape::ProductSearch,
            page: Some(page),
        }
    }

    fn questions_by_code(&self, code: &str, page_size: u32) -> QueryDescriptor {
        QueryDescriptor {
            url: format!("{}/questions/{}", self.robotoff_url, code),
            params: vec![
                param("count", page_size.to_string()),
                param("lang", self.lang.clone()),
            ],
            shape: ResponseShape::Questions,
            page: None,
        }
    }

    fn questions(&self, filter: &FilterConfig, page: u32, page_size: u32) -> QueryDescriptor {
        let page = page.max(1);
        let order = if filter.sort_by_popularity {
            "popular"
        } else {
            "random"
        };

        let mut params = vec![
            param("count", page_size.to_string()),
            param("page", page.to_string()),
            param("lang", self.lang.clone()),
        ];
        if let Some(insight_type) = filter.insight_type.as_deref() {
            params.push(param("insight_types", insight_type));
        }
        if let Some(value_tag) = filter.value_tag.as_deref() {
            params.push(param("value_tag", value_tag));
        }
        if let Some(country) = filter.country.as_deref() {
            if country != defaults::WORLD_COUNTRY {
                params.push(param("country", country));
            }
        }
        if let Some(brand) = filter.brand.as_deref() {
            params.push(param("brands", brand));
        }

        QueryDescriptor {
            url: format!("{}/questions/{}", self.robotoff_url, order),
            params,
            shape: ResponseShape::Questions,
            page: Some(page),
        }
    }
}

fn param(key: &str, value: impl Into<String>) -> (String, String) {
    (key.to_string(), value.into())
}

fn push_tag(params: &mut Vec<(String, String)>, index: usize, tag_type: &str, value: &str) {
    params.push((format!("tagtype_{index}"), tag_type.to_string()));
    params.push((format!("tag_contains_{index}"), "contains".to_string()));
    params.push((format!("tag_{index}"), value.to_string()));
}
