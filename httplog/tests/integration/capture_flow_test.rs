//! キャプチャパイプラインのエンドツーエンドテスト
//!
//! 実ポートで起動したアプリにreqwestでアクセスし、記録内容を参照APIで確認する。

use httplog::config::{CancelledCapturePolicy, CaptureConfig};
use reqwest::{multipart, Client, StatusCode};
use serde_json::{json, Value};

use crate::support::app::{spawn_test_app, TestApp};

async fn captured(app: &TestApp, path: &str) -> Value {
    app.flush().await;
    Client::new()
        .get(app.server.url(path))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn captures_request_and_response_of_registered_route() {
    let app = spawn_test_app(CaptureConfig::default()).await;

    let res = Client::new()
        .get(app.server.url("/orders/7?expand=items"))
        .header("user-agent", "capture-test/1.0")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"id": 7, "status": "shipped"}));

    let page = captured(&app, "/api/capture-logs").await;
    assert_eq!(page["pagination"]["totalItems"], 1);

    let record = &page["data"][0];
    assert_eq!(record["httpMethod"], "GET");
    assert_eq!(record["requestPath"], "/orders/7");
    assert_eq!(record["queryString"], "expand=items");
    assert_eq!(record["statusCode"], 200);
    assert_eq!(record["controllerAction"], "Orders@show");
    assert_eq!(record["clientIp"], "127.0.0.1");
    assert_eq!(record["userAgent"], "capture-test/1.0");
    assert_eq!(record["hostname"], app.server.addr().to_string());
    assert_eq!(record["timeAgo"], "just now");
    assert!(record["elapsedSecs"].as_f64().unwrap() >= 0.0);
    assert!(record["exceptionDetails"].is_null());

    let response_body: Value =
        serde_json::from_str(record["responseBody"].as_str().unwrap()).unwrap();
    assert_eq!(response_body, body);

    let response_headers: Value =
        serde_json::from_str(record["responseHeaders"].as_str().unwrap()).unwrap();
    assert_eq!(response_headers["content-type"], "application/json");

    app.server.stop().await;
}

#[tokio::test]
async fn captures_json_request_body_and_filter_type() {
    let app = spawn_test_app(CaptureConfig {
        filter_type: Some("billing".to_string()),
        ..Default::default()
    })
    .await;

    let res = Client::new()
        .post(app.server.url("/orders"))
        .json(&json!({"sku": "A-1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["sku"], "A-1");

    let page = captured(&app, "/api/capture-logs").await;
    let record = &page["data"][0];
    assert_eq!(record["httpMethod"], "POST");
    assert_eq!(record["statusCode"], 201);
    assert_eq!(record["controllerAction"], "Orders@create");
    assert_eq!(record["filterType"], "billing");
    assert_eq!(record["requestBody"], r#"{"sku":"A-1"}"#);

    app.server.stop().await;
}

#[tokio::test]
async fn captures_multipart_upload_as_structured_description() {
    let app = spawn_test_app(CaptureConfig::default()).await;

    let form = multipart::Form::new()
        .text("customer", "acme")
        .part(
            "invoice",
            multipart::Part::bytes(b"%PDF-".to_vec())
                .file_name("march.pdf")
                .mime_str("application/pdf")
                .unwrap(),
        );
    let res = Client::new()
        .post(app.server.url("/orders/invoice"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    // ハンドラーは2パートとも読めている
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["parts"], 2);

    let page = captured(&app, "/api/capture-logs").await;
    let record = &page["data"][0];
    let description: Value =
        serde_json::from_str(record["requestBody"].as_str().unwrap()).unwrap();
    assert_eq!(description["fields"]["customer"], "acme");
    let files = description["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["name"], "invoice");
    assert_eq!(files[0]["file_name"], "march.pdf");
    assert_eq!(files[0]["length"], 5);
    assert_eq!(files[0]["content_type"], "application/pdf");

    app.server.stop().await;
}

#[tokio::test]
async fn large_multipart_upload_on_raised_limit_route_is_described() {
    let app = spawn_test_app(CaptureConfig::default()).await;
    let file_len = 3 * 1024 * 1024;

    let form = multipart::Form::new().text("customer", "acme").part(
        "invoice",
        multipart::Part::bytes(vec![b'%'; file_len])
            .file_name("scan.pdf")
            .mime_str("application/pdf")
            .unwrap(),
    );
    let res = Client::new()
        .post(app.server.url("/orders/invoice"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["parts"], 2);
    assert_eq!(body["bytes"], file_len + "acme".len());

    let page = captured(&app, "/api/capture-logs").await;
    let record = &page["data"][0];
    let description: Value =
        serde_json::from_str(record["requestBody"].as_str().unwrap()).unwrap();
    assert_eq!(description["fields"]["customer"], "acme");
    let files = description["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["file_name"], "scan.pdf");
    assert_eq!(files[0]["length"], file_len);

    app.server.stop().await;
}

#[tokio::test]
async fn body_over_capture_limit_is_forwarded_but_not_recorded() {
    let app = spawn_test_app(CaptureConfig {
        max_body_bytes: 1024,
        ..Default::default()
    })
    .await;
    let sku = "S".repeat(4096);

    let res = Client::new()
        .post(app.server.url("/orders"))
        .json(&json!({"sku": sku}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["sku"], sku);

    let page = captured(&app, "/api/capture-logs").await;
    let record = &page["data"][0];
    assert_eq!(
        record["requestBody"],
        "[body not captured: exceeds 1024 bytes]"
    );
    assert_eq!(
        record["responseBody"],
        "[body not captured: exceeds 1024 bytes]"
    );

    app.server.stop().await;
}

#[tokio::test]
async fn streamed_response_reaches_caller_unchanged() {
    let app = spawn_test_app(CaptureConfig::default()).await;

    let res = Client::new()
        .get(app.server.url("/orders/report"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "text/plain");
    assert_eq!(res.text().await.unwrap(), "line-1\nline-2\nline-3\n");

    let page = captured(&app, "/api/capture-logs").await;
    assert_eq!(page["data"][0]["responseBody"], "line-1\nline-2\nline-3\n");

    app.server.stop().await;
}

#[tokio::test]
async fn non_loggable_and_query_routes_are_not_captured() {
    let app = spawn_test_app(CaptureConfig::default()).await;
    let client = Client::new();

    let res = client.get(app.server.url("/health")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "ok");

    let res = client
        .get(app.server.url("/no/such/route"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let page = captured(&app, "/api/capture-logs").await;
    assert_eq!(page["pagination"]["totalItems"], 0);

    app.server.stop().await;
}

#[tokio::test]
async fn forwarded_for_header_wins_over_socket_address() {
    let app = spawn_test_app(CaptureConfig::default()).await;

    Client::new()
        .get(app.server.url("/orders/3"))
        .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
        .send()
        .await
        .unwrap();

    let page = captured(&app, "/api/capture-logs").await;
    assert_eq!(page["data"][0]["clientIp"], "203.0.113.9");

    app.server.stop().await;
}

#[tokio::test]
async fn handler_panic_is_recorded_and_surfaces_as_500() {
    let app = spawn_test_app(CaptureConfig {
        cancelled_policy: CancelledCapturePolicy::Discard,
        ..Default::default()
    })
    .await;
    let client = Client::new();

    let res = client
        .get(app.server.url("/orders/explode"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    client.get(app.server.url("/orders/1")).send().await.unwrap();

    let page = captured(&app, "/api/capture-logs/exceptions").await;
    assert_eq!(page["pagination"]["totalItems"], 1);
    let record = &page["data"][0];
    assert_eq!(record["requestPath"], "/orders/explode");
    assert_eq!(record["statusCode"], 500);
    assert_eq!(record["controllerAction"], "Orders@explode");
    assert_eq!(
        record["exceptionDetails"],
        "handler panicked: payment gateway unreachable"
    );

    let all = captured(&app, "/api/capture-logs").await;
    assert_eq!(all["pagination"]["totalItems"], 2);

    app.server.stop().await;
}
