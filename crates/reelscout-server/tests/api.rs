//! Router tests: every endpoint driven through `tower::ServiceExt::oneshot`
//! with upstream sites, webhook and download service mocked.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use reelscout_core::ListingSite;
use reelscout_server::{AppState, ServerConfig, router};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MOVIE_PAGE: &str = r#"
<html><body>
  <a href="https://drive.google.com/file/d/LEO1080/view">Google Drive 1080p</a>
  <a href="/files/leo.720p.mkv">Mirror</a>
</body></html>
"#;

fn app(upstream: &MockServer) -> Router {
    let mut config = ServerConfig::defaults().expect("Defaults should parse");
    config.fetcher.timeout_secs = 5;
    config.fetcher.min_delay_ms = 0;
    config.fetcher.max_delay_ms = 0;
    config.fetcher.seed = Some(3);
    config.upstream.webhook_url = format!("{}/webhook", upstream.uri());
    config.upstream.webhook_timeout_secs = 5;
    config.upstream.download_service_url = format!("{}/download", upstream.uri());
    config.upstream.download_timeout_secs = 5;

    let state = AppState::from_config(&config)
        .expect("State should build")
        .with_listing_sites(
            ListingSite::moviezwap().with_base_url(upstream.uri()),
            ListingSite::movierulz().with_base_url(upstream.uri()),
        );
    router(state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("Request should build")
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("Request should build")
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.oneshot(request).await.expect("Router should answer");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Body should be readable");
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    let value = serde_json::from_str(&body).expect("Body should be JSON");
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let upstream = MockServer::start().await;
    let (status, body) = send_json(app(&upstream), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_options_is_empty_ok() {
    let upstream = MockServer::start().await;
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/search")
        .body(Body::empty())
        .expect("Request should build");
    let (status, body) = send(app(&upstream), request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_unsupported_method() {
    let upstream = MockServer::start().await;
    let request = Request::builder()
        .method("DELETE")
        .uri("/api/download-enhanced?url=https://x.example/m")
        .body(Body::empty())
        .expect("Request should build");
    let (status, body) = send_json(app(&upstream), request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, json!({ "error": "Method not allowed" }));

    let (status, _) = send_json(app(&upstream), get("/api/playwright-scrape")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_cors_header() {
    let upstream = MockServer::start().await;
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://front.example")
        .body(Body::empty())
        .expect("Request should build");
    let response = app(&upstream).oneshot(request).await.expect("Router should answer");
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_missing_url_is_bad_request() {
    let upstream = MockServer::start().await;
    for route in ["/api/download-enhanced", "/api/download-all?method=basic", "/api/playwright-download?url="] {
        let (status, body) = send_json(app(&upstream), get(route)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "route {}", route);
        assert_eq!(body["error"], "URL parameter is required");
    }
}

#[tokio::test]
async fn test_download_enhanced() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/leo.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MOVIE_PAGE))
        .mount(&upstream)
        .await;

    let page = format!("{}/movie/leo.html", upstream.uri());
    let (status, body) = send_json(
        app(&upstream),
        get(&format!("/api/download-enhanced?url={}", page)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], page.as_str());
    assert_eq!(body["method"], "enhanced");
    assert_eq!(body["total"], 2);
    assert_eq!(body["message"], "Enhanced extraction found 2 download links");
    assert_eq!(body["downloadLinks"][0]["service"], "Google Drive");
    assert_eq!(body["downloadLinks"][0]["type"], "cloud");
    assert_eq!(body["downloadLinks"][0]["quality"], "1080p");
}

#[tokio::test]
async fn test_download_all_echoes_requested_method() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MOVIE_PAGE))
        .mount(&upstream)
        .await;

    let page = format!("{}/movie/leo.html", upstream.uri());
    let (status, body) = send_json(
        app(&upstream),
        get(&format!("/api/download-all?url={}&method=selenium", page)),
    )
    .await;

    // unknown methods run basic extraction but report the requested name
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["method"], "selenium");
    assert_eq!(body["message"], "selenium extraction found 2 download links");
    assert_eq!(body["total"], 2);

    let (status, body) = send_json(app(&upstream), get(&format!("/api/download-all?url={}", page))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["method"], "enhanced");
    assert_eq!(body["message"], "enhanced extraction found 2 download links");
}

#[tokio::test]
async fn test_extraction_failure_is_server_error() {
    let upstream = MockServer::start().await;
    let (status, body) = send_json(
        app(&upstream),
        get("/api/download-all?url=not-a-url&method=playwright"),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to extract download links (playwright)");
    assert_eq!(body["message"], "Invalid URL: not-a-url");
}

#[tokio::test]
async fn test_moviezwap_get_and_post() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search.php"))
        .and(query_param("q", "leo"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<div class="mylist"><a href="/movie/Leo-(2023)-Tamil.html">Leo (2023) Tamil</a></div>"#,
        ))
        .mount(&upstream)
        .await;

    let (status, body) = send_json(app(&upstream), get("/api/moviezwap-scraper?q=leo")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["source"], "moviezwap.care");
    assert_eq!(body["total"], 1);
    assert_eq!(body["results"][0]["title"], "Leo (2023) Tamil");
    assert_eq!(body["results"][0]["moviePageUrl"], format!("{}/movie/Leo-(2023)-Tamil.html", upstream.uri()));
    assert_eq!(body["message"], "Found 1 movies from moviezwap.care");

    let (status, body) = send_json(
        app(&upstream),
        post_json("/api/moviezwap-scraper", json!({ "query": "leo" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "leo");

    let (status, body) = send_json(app(&upstream), get("/api/moviezwap-scraper")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Query parameter is required");
}

#[tokio::test]
async fn test_moviezwap_failure_names_source() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&upstream)
        .await;

    let (status, body) = send_json(app(&upstream), get("/api/moviezwap-scraper?query=leo")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Failed to scrape moviezwap.care");
    assert_eq!(body["source"], "moviezwap.care");
}

#[tokio::test]
async fn test_playwright_scrape() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search_movies"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<article class="post"><h2><a href="/leo-2023/movie-watch-online-free-9.html">Leo (2023) Tamil</a></h2></article>"#,
        ))
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/leo-2023/movie-watch-online-free-9.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<iframe src="https://vcdnlare.com/v/leo9"></iframe>"#,
        ))
        .mount(&upstream)
        .await;

    let (status, body) = send_json(
        app(&upstream),
        post_json("/api/playwright-scrape", json!({ "query": "leo" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "5movierulz.villas");
    assert_eq!(body["method"], "playwright-simulation");
    assert_eq!(body["results"][0]["url"], "https://vcdnlare.com/v/leo9");
    assert_eq!(body["results"][0]["streamingUrls"][0]["type"], "stream");
}

#[tokio::test]
async fn test_search_results_and_workflow_incomplete() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "title": "Leo (2023)", "originalUrl": "https://s.example/leo" }
        ])))
        .mount(&upstream)
        .await;

    let (status, body) = send_json(app(&upstream), get("/api/search?query=leo")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["total"], 1);
    assert_eq!(body["results"][0]["moviePageUrl"], "https://s.example/leo");

    let started = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "Workflow was started" })))
        .mount(&started)
        .await;

    let (status, body) = send_json(app(&started), get("/api/search?query=leo")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Workflow incomplete");
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_proxy_treats_started_workflow_as_empty_success() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "message": "Workflow was started" }])))
        .mount(&upstream)
        .await;

    let (status, body) = send_json(app(&upstream), get("/api/n8n-proxy?query=leo")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["results"], json!([]));
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_search_and_proxy_failure_policies() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&upstream)
        .await;

    let (status, body) = send_json(app(&upstream), get("/api/search?query=leo")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to fetch movies");

    let (status, body) = send_json(app(&upstream), get("/api/n8n-proxy?query=leo")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["results"], json!([]));
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_python_download_streams_ndjson() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "{\"status\":\"progress\",\"message\":\"25%\"}\n{\"status\":\"completed\",\"message\":\"done\"}\n",
        ))
        .mount(&upstream)
        .await;

    let response = app(&upstream)
        .oneshot(post_json(
            "/api/python-download",
            json!({ "movieUrl": "https://s.example/leo", "title": "Leo" }),
        ))
        .await
        .expect("Router should answer");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/x-ndjson");

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Body should be readable");
    let events: Vec<Value> = String::from_utf8_lossy(&bytes)
        .lines()
        .map(|line| serde_json::from_str(line).expect("Each line should be JSON"))
        .collect();

    assert_eq!(events.first().map(|e| e["status"].clone()), Some(json!("started")));
    assert_eq!(events.last().map(|e| e["status"].clone()), Some(json!("completed")));
    assert!(events.iter().all(|e| e["timestamp"].is_string()));
}

#[tokio::test]
async fn test_python_download_requires_movie_url() {
    let upstream = MockServer::start().await;
    let (status, body) = send_json(
        app(&upstream),
        post_json("/api/python-download", json!({ "title": "Leo" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Movie URL is required");
}
