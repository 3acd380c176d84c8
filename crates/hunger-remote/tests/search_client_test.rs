//! Integration tests for the search client against a mock HTTP server.
//!
//! Covers:
//! - Product search with positional tag parameters
//! - Product lookup by code (one-item page)
//! - Question search ordering and optional filters
//! - Non-success statuses mapped to fetch failures

use hunger_core::{Error, FilterConfig, ItemKind, PageRequest, PageSource};
use hunger_remote::{RemoteConfig, SearchClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> SearchClient {
    SearchClient::new(RemoteConfig::default().with_base_url(&server.uri()))
        .expect("Failed to create client")
}

fn request(filter: FilterConfig, page: u32, page_size: u32) -> PageRequest {
    PageRequest {
        filter,
        page,
        page_size,
    }
}

#[tokio::test]
async fn test_product_search_sends_positional_tags() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cgi/search.pl"))
        .and(query_param("json", "true"))
        .and(query_param("page", "4"))
        .and(query_param("sort_by", "unique_scans_n"))
        .and(query_param("tag_0", "packaging-to-be-completed"))
        .and(query_param("tag_1", "packaging-photo-selected"))
        .and(query_param("tagtype_2", "countries"))
        .and(query_param("tag_2", "en:france"))
        .and(query_param("tagtype_3", "creator"))
        .and(query_param("tag_3", "kiliweb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 230,
            "page_size": "50",
            "products": [
                {"code": "3017620422003", "product_name": "Spread", "packagings": []},
                {"code": "5449000000996", "product_name": "Soda"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let filter = FilterConfig::products().with_creator("kiliweb");
    let page = client(&server)
        .fetch_page(&request(filter, 4, 50))
        .await
        .expect("fetch should succeed");

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total_count, 230);
    assert_eq!(page.page_size, 50);
    assert_eq!(page.items[0].kind, ItemKind::Product);
    assert_eq!(page.items[0].id.as_str(), "3017620422003");
}

#[tokio::test]
async fn test_product_by_code_returns_single_item_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v3/product/3017620422003.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "product": {"code": "3017620422003", "product_name": "Spread"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let filter = FilterConfig::products().with_code("3017620422003");
    let page = client(&server)
        .fetch_page(&request(filter, 17, 50))
        .await
        .expect("fetch should succeed");

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.total_count, 1);
    assert_eq!(page.items[0].payload.text.as_deref(), Some("Spread"));
}

#[tokio::test]
async fn test_questions_random_with_filters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/questions/random"))
        .and(query_param("count", "10"))
        .and(query_param("page", "2"))
        .and(query_param("lang", "en"))
        .and(query_param("insight_types", "label"))
        .and(query_param("value_tag", "en:organic"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "found",
            "count": 42,
            "questions": [{
                "insight_id": "f0e1",
                "insight_type": "label",
                "question": "Does the product have this label?",
                "value": "Organic",
                "value_tag": "en:organic",
                "source_image_url": "https://images.test/1.400.jpg",
                "barcode": "123"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let filter = FilterConfig::questions()
        .with_insight_type("label")
        .with_value_tag("en:organic");
    let page = client(&server)
        .fetch_page(&request(filter, 2, 10))
        .await
        .expect("fetch should succeed");

    assert_eq!(page.total_count, 42);
    assert_eq!(page.items[0].id.as_str(), "f0e1");
    assert_eq!(page.items[0].kind, ItemKind::Insight);
}

#[tokio::test]
async fn test_questions_popular_order() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/questions/popular"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"status": "no_questions", "count": 0})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let filter = FilterConfig::questions().with_sort_by_popularity(true);
    let page = client(&server)
        .fetch_page(&request(filter, 1, 10))
        .await
        .expect("fetch should succeed");
    assert!(page.is_empty());
}

#[tokio::test]
async fn test_server_error_maps_to_fetch_failed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/questions/random"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let result = client(&server)
        .fetch_page(&request(FilterConfig::questions(), 1, 10))
        .await;

    match result {
        Err(Error::FetchFailed(msg)) => {
            assert!(msg.contains("503"), "unexpected message: {msg}");
            assert!(msg.contains("maintenance"));
        }
        other => panic!("expected FetchFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body_maps_to_fetch_failed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cgi/search.pl"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = client(&server)
        .fetch_page(&request(FilterConfig::products(), 1, 50))
        .await;
    assert!(matches!(result, Err(Error::FetchFailed(_))));
}
