use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use service::customer::repo::InMemoryCustomerRepository;
use tower::ServiceExt;

use server::startup::build_app;

fn app() -> Router {
    build_app(Arc::new(InMemoryCustomerRepository::new()))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> anyhow::Result<(StatusCode, Value)> {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder.header("content-type", "application/json").body(Body::from(b.to_string()))?,
        None => builder.body(Body::empty())?,
    };
    let res = app.clone().oneshot(req).await?;
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
    Ok((status, value))
}

fn customer_body(phone: &str) -> Value {
    json!({
        "firstName": "A",
        "lastName": "B",
        "phoneNumber": phone,
        "addresses": [{"addressLine": "X", "city": "Y", "state": "Z", "pinCode": "123456"}]
    })
}

async fn create(app: &Router, phone: &str) -> anyhow::Result<i64> {
    let (status, body) = call(app, "POST", "/api/customers", Some(customer_body(phone))).await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    Ok(body["customerId"].as_i64().expect("customerId"))
}

#[tokio::test]
async fn create_then_get_marks_single_address_primary() -> anyhow::Result<()> {
    let app = app();
    let (status, body) = call(&app, "POST", "/api/customers", Some(customer_body("1111111111"))).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["message"].is_string());
    let id = body["customerId"].as_i64().expect("customerId");

    let (status, body) = call(&app, "GET", &format!("/api/customers/{id}"), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["firstName"], "A");
    assert_eq!(body["lastName"], "B");
    assert_eq!(body["phoneNumber"], "1111111111");
    assert!(body["createdAt"].is_string());
    let addrs = body["addresses"].as_array().expect("addresses");
    assert_eq!(addrs.len(), 1);
    assert_eq!(addrs[0]["addressLine"], "X");
    assert_eq!(addrs[0]["pinCode"], "123456");
    assert_eq!(addrs[0]["isPrimary"], true);
    Ok(())
}

#[tokio::test]
async fn validation_errors_list_fields() -> anyhow::Result<()> {
    let app = app();
    let bad = json!({
        "firstName": "",
        "lastName": "B",
        "phoneNumber": "12ab",
        "addresses": [{"addressLine": "X", "city": "Y", "state": "Z", "pinCode": "1"}]
    });
    let (status, body) = call(&app, "POST", "/api/customers", Some(bad)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["details"].as_array().expect("details").iter().filter_map(|d| d["field"].as_str()).collect();
    assert_eq!(fields, ["firstName", "phoneNumber", "addresses[0].pinCode"]);

    let (status, _) = call(&app, "POST", "/api/customers", Some(json!({"firstName": "A"}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn malformed_json_is_bad_request() -> anyhow::Result<()> {
    let app = app();
    let req = Request::builder()
        .method("POST")
        .uri("/api/customers")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))?;
    let res = app.oneshot(req).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn duplicate_phone_is_bad_request() -> anyhow::Result<()> {
    let app = app();
    create(&app, "1111111111").await?;
    let (status, body) = call(&app, "POST", "/api/customers", Some(customer_body("1111111111"))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Conflict");
    Ok(())
}

#[tokio::test]
async fn missing_and_malformed_ids() -> anyhow::Result<()> {
    let app = app();
    assert_eq!(call(&app, "GET", "/api/customers/42", None).await?.0, StatusCode::NOT_FOUND);
    assert_eq!(call(&app, "DELETE", "/api/customers/42", None).await?.0, StatusCode::NOT_FOUND);
    assert_eq!(call(&app, "DELETE", "/api/addresses/42", None).await?.0, StatusCode::NOT_FOUND);
    assert_eq!(call(&app, "GET", "/api/customers/abc", None).await?.0, StatusCode::BAD_REQUEST);
    let put = call(&app, "PUT", "/api/customers/42", Some(json!({"firstName": "Z"}))).await?;
    assert_eq!(put.0, StatusCode::NOT_FOUND);
    let add = call(&app, "POST", "/api/customers/42/addresses", Some(json!({"addressLine": "X", "city": "Y", "state": "Z", "pinCode": "123456"}))).await?;
    assert_eq!(add.0, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn address_lifecycle_over_http() -> anyhow::Result<()> {
    let app = app();
    let id = create(&app, "1111111111").await?;

    let (status, body) = call(&app, "GET", &format!("/api/customers/{id}/isSingleAddress"), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasOnlyOneAddress"], true);

    let (_, addrs) = call(&app, "GET", &format!("/api/customers/{id}/addresses"), None).await?;
    let first_id = addrs[0]["id"].as_i64().expect("address id");
    let (status, body) = call(&app, "DELETE", &format!("/api/addresses/{first_id}"), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let new_addr = json!({"addressLine": "1 Elm", "city": "Boston", "state": "MA", "pinCode": "021080", "isPrimary": true});
    let (status, body) = call(&app, "POST", &format!("/api/customers/{id}/addresses"), Some(new_addr)).await?;
    assert_eq!(status, StatusCode::CREATED);
    let second_id = body["addressId"].as_i64().expect("addressId");

    let (_, addrs) = call(&app, "GET", &format!("/api/customers/{id}/addresses"), None).await?;
    let primary: Vec<i64> = addrs.as_array().expect("array").iter().filter(|a| a["isPrimary"] == true).filter_map(|a| a["id"].as_i64()).collect();
    assert_eq!(primary, [second_id]);

    let (status, _) = call(&app, "PUT", &format!("/api/addresses/{first_id}"), Some(json!({"isPrimary": true}))).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, "PUT", &format!("/api/addresses/{first_id}"), Some(json!({"pinCode": "12"}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, "DELETE", &format!("/api/addresses/{first_id}"), None).await?;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call(&app, "GET", &format!("/api/customers/{id}/isSingleAddress"), None).await?;
    assert_eq!(body["hasOnlyOneAddress"], true);
    let (_, addrs) = call(&app, "GET", &format!("/api/customers/{id}/addresses"), None).await?;
    assert_eq!(addrs[0]["isPrimary"], true);

    let (status, _) = call(&app, "DELETE", &format!("/api/customers/{id}"), None).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = call(&app, "GET", &format!("/api/customers/{id}/addresses"), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
    Ok(())
}

#[tokio::test]
async fn update_customer_over_http() -> anyhow::Result<()> {
    let app = app();
    let a = create(&app, "1111111111").await?;
    create(&app, "2222222222").await?;

    let (status, _) = call(&app, "PUT", &format!("/api/customers/{a}"), Some(json!({"lastName": "Hopper"}))).await?;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call(&app, "GET", &format!("/api/customers/{a}"), None).await?;
    assert_eq!(body["lastName"], "Hopper");

    let (status, body) = call(&app, "PUT", &format!("/api/customers/{a}"), Some(json!({"phoneNumber": "2222222222"}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Conflict");
    let (status, _) = call(&app, "PUT", &format!("/api/customers/{a}"), Some(json!({}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn list_paginates_and_rejects_bad_query() -> anyhow::Result<()> {
    let app = app();
    for n in 0..5 {
        create(&app, &format!("100000000{n}")).await?;
    }
    let (status, body) = call(&app, "GET", "/api/customers?page=1&limit=2&sortBy=createdAt&sortOrder=desc", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["customers"].as_array().expect("customers").len(), 2);
    assert_eq!(body["customers"][0]["phoneNumber"], "1000000004");
    assert_eq!(body["pagination"], json!({"page": 1, "limit": 2, "total": 5, "totalPages": 3}));

    let (status, body) = call(&app, "GET", "/api/customers?page=9", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["customers"], json!([]));

    let (status, body) = call(&app, "GET", "/api/customers?page=abc", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "page");
    let (status, _) = call(&app, "GET", "/api/customers?sortBy=age", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app, "GET", "/api/customers?city=y", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 5);
    let (_, body) = call(&app, "GET", "/api/customers?city=boston", None).await?;
    assert_eq!(body["pagination"]["total"], 0);
    Ok(())
}

#[tokio::test]
async fn health_metrics_and_docs() -> anyhow::Result<()> {
    let app = app();
    let (status, body) = call(&app, "GET", "/health", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["storageStatus"], "up");

    create(&app, "1111111111").await?;
    let res = app.clone().oneshot(Request::builder().uri("/metrics").body(Body::empty())?).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let text = String::from_utf8(to_bytes(res.into_body(), usize::MAX).await?.to_vec())?;
    assert!(text.contains("customer_api_operations_total"));

    let (status, doc) = call(&app, "GET", "/api-docs/openapi.json", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/customers"].is_object());
    Ok(())
}
