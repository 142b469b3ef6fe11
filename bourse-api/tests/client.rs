//! Wire-contract tests for `BourseApi` against an in-process fake backend.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use bourse_api::{
    BourseApi, Error, LoginRequest, NewStock, PageRequest, PageSize, PriceUpdate, SessionToken,
};
use serde_json::{Value, json};

#[derive(Default)]
struct Recorded {
    cookies: Vec<String>,
    queries: Vec<String>,
    bodies: Vec<Value>,
}

type Shared = Arc<Mutex<Recorded>>;

fn record(state: &Shared, headers: &HeaderMap) {
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    state.lock().unwrap().cookies.push(cookie);
}

async fn list_stocks(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<std::collections::HashMap<String, String>>,
) -> Response {
    record(&state, &headers);
    let mut pairs: Vec<_> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
    pairs.sort();
    state.lock().unwrap().queries.push(pairs.join("&"));

    if !headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|c| c.contains("jwt=good-token"))
    {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    Json(json!({
        "status": "OK",
        "message": "All Available Stocks",
        "data": {
            "content": [
                {"stockId": 1, "name": "Apple", "description": "Phones", "currentPrice": 191.5},
                {"stockId": 2, "name": "Microsoft", "description": "Software", "currentPrice": 402.0}
            ],
            "totalElements": 7,
            "totalPages": 4,
            "size": 2,
            "number": 1
        }
    }))
    .into_response()
}

async fn create_stock(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    state.lock().unwrap().bodies.push(body.clone());
    if body["name"].as_str().unwrap_or("").is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "message": "Validation failed",
                "errors": [{"field": "name", "message": "Name is mandatory"}]
            })),
        )
            .into_response();
    }
    Json(json!({
        "status": "OK",
        "message": "Stock created successfully",
        "data": {"stockId": 9, "name": body["name"], "description": body["description"], "currentPrice": body["currentPrice"]}
    }))
    .into_response()
}

async fn update_price(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    state.lock().unwrap().bodies.push(json!({"id": id, "body": body}));
    Json(json!({"status": "OK", "message": "Stock Price updated successfully", "data": null})).into_response()
}

async fn get_stock(Path(id): Path<i64>) -> Response {
    if id == 404 {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"message": "Stock not found with id: 404"})),
        )
            .into_response();
    }
    (StatusCode::INTERNAL_SERVER_ERROR, "database down").into_response()
}

async fn stock_exchanges(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    Query(query): Query<std::collections::HashMap<String, String>>,
) -> Response {
    let mut pairs: Vec<_> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
    pairs.sort();
    state.lock().unwrap().queries.push(format!("{id}:{}", pairs.join("&")));
    Json(json!({
        "status": "OK",
        "message": "Page Stocks In This StockExchange",
        "data": {
            "content": [
                {"stockExchangeId": 3, "name": "NYSE", "description": "New York", "liveInMarket": true},
                {"stockExchangeId": 4, "name": "LSE", "description": "London", "liveInMarket": false}
            ],
            "totalElements": 2,
            "totalPages": 1,
            "size": 5,
            "number": 0
        }
    }))
    .into_response()
}

async fn remove_stocks(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> StatusCode {
    state.lock().unwrap().bodies.push(json!({"exchange": id, "body": body}));
    StatusCode::NO_CONTENT
}

async fn login(Json(body): Json<Value>) -> Response {
    match body["email"].as_str() {
        Some("cookie@example.com") => (
            [(header::SET_COOKIE, "jwt=good-token; Path=/; HttpOnly; SameSite=Lax")],
            Json(json!({"status": "OK", "message": "login successfully", "data": {"token": "ignored"}})),
        )
            .into_response(),
        Some("body@example.com") => {
            Json(json!({"status": "OK", "message": "login successfully", "data": {"token": "body-token"}}))
                .into_response()
        }
        Some("empty@example.com") => {
            Json(json!({"status": "OK", "message": "login successfully", "data": null})).into_response()
        }
        _ => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn spawn_backend() -> (SocketAddr, Shared) {
    let state: Shared = Arc::default();
    let app = Router::new()
        .route("/api/v1/stock", get(list_stocks).post(create_stock))
        .route("/api/v1/stock/{id}", get(get_stock))
        .route("/api/v1/stock/{id}/price", put(update_price))
        .route("/api/v1/stock/{id}/stockExchanges", get(stock_exchanges))
        .route("/api/v1/stockExchange/{id}/stocks", delete(remove_stocks))
        .route("/api/v1/auth/login", post(login))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

fn client(addr: SocketAddr) -> BourseApi {
    BourseApi::new(format!("http://{addr}/api/v1"), "jwt", Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_list_stocks_sends_cookie_and_paging() {
    let (addr, state) = spawn_backend().await;
    let api = client(addr);
    let session = SessionToken::new("good-token");

    let page = api
        .list_stocks(&session, PageRequest::new(1, PageSize::Twenty))
        .await
        .unwrap();

    assert_eq!(page.content.len(), 2);
    assert_eq!(page.total_pages, 4);
    assert_eq!(page.total_elements, 7);

    let recorded = state.lock().unwrap();
    assert_eq!(recorded.cookies, vec!["jwt=good-token".to_string()]);
    assert_eq!(recorded.queries, vec!["page=1&size=20".to_string()]);
}

#[tokio::test]
async fn test_rejected_session_maps_to_unauthorized() {
    let (addr, _) = spawn_backend().await;
    let api = client(addr);

    let err = api
        .list_stocks(&SessionToken::new("expired"), PageRequest::default())
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_create_stock_surfaces_field_errors() {
    let (addr, state) = spawn_backend().await;
    let api = client(addr);
    let session = SessionToken::new("good-token");

    let err = api
        .create_stock(
            &session,
            &NewStock {
                name: String::new(),
                description: "Phones".into(),
                current_price: 10.0,
            },
        )
        .await
        .unwrap_err();

    match &err {
        Error::Validation(failure) => assert_eq!(failure.message, "Validation failed"),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(err.field_errors()["name"], "Name is mandatory");

    let created = api
        .create_stock(
            &session,
            &NewStock {
                name: "Nvidia".into(),
                description: "Chips".into(),
                current_price: 880.0,
            },
        )
        .await
        .unwrap();
    assert_eq!(created.stock_id, 9);
    assert_eq!(state.lock().unwrap().bodies[1]["currentPrice"], 880.0);
}

#[tokio::test]
async fn test_update_price_uses_price_path() {
    let (addr, state) = spawn_backend().await;
    let api = client(addr);

    api.update_stock_price(&SessionToken::new("good-token"), 4, &PriceUpdate { current_price: 12.5 })
        .await
        .unwrap();

    let recorded = state.lock().unwrap();
    assert_eq!(recorded.bodies[0]["id"], 4);
    assert_eq!(recorded.bodies[0]["body"]["currentPrice"], 12.5);
}

#[tokio::test]
async fn test_exchanges_for_stock() {
    let (addr, state) = spawn_backend().await;
    let api = client(addr);
    let session = SessionToken::new("good-token");

    let page = api
        .list_exchanges_for_stock(&session, 7, PageRequest::new(0, PageSize::Five))
        .await
        .unwrap();

    let names: Vec<_> = page.content.iter().map(|e| e.name.as_deref()).collect();
    assert_eq!(names, [Some("NYSE"), Some("LSE")]);
    assert!(!page.content[1].live_in_market);
    assert_eq!(state.lock().unwrap().queries, vec!["7:page=0&size=5".to_string()]);
}

#[tokio::test]
async fn test_not_found_and_server_errors() {
    let (addr, _) = spawn_backend().await;
    let api = client(addr);
    let session = SessionToken::new("good-token");

    match api.get_stock(&session, 404).await.unwrap_err() {
        Error::NotFound(message) => assert_eq!(message, "Stock not found with id: 404"),
        other => panic!("expected not found, got {other:?}"),
    }

    let err = api.get_stock(&session, 1).await.unwrap_err();
    assert!(err.is_transient());
    assert!(matches!(err, Error::Http { status, .. } if status == 500));
}

#[tokio::test]
async fn test_remove_stocks_is_one_call_with_all_ids() {
    let (addr, state) = spawn_backend().await;
    let api = client(addr);

    api.remove_stocks_from_exchange(&SessionToken::new("good-token"), 3, &[11, 12])
        .await
        .unwrap();

    let recorded = state.lock().unwrap();
    assert_eq!(recorded.bodies.len(), 1);
    assert_eq!(recorded.bodies[0]["exchange"], 3);
    assert_eq!(recorded.bodies[0]["body"]["stockIds"], json!([11, 12]));
}

#[tokio::test]
async fn test_login_reads_cookie_then_body() {
    let (addr, _) = spawn_backend().await;
    let api = client(addr);

    let login = |email: &str| LoginRequest {
        email: email.to_string(),
        password: "secret".to_string(),
    };

    let token = api.login(&login("cookie@example.com")).await.unwrap();
    assert_eq!(token.as_str(), "good-token");

    let token = api.login(&login("body@example.com")).await.unwrap();
    assert_eq!(token.as_str(), "body-token");

    assert!(matches!(
        api.login(&login("empty@example.com")).await,
        Err(Error::MissingSession)
    ));
    assert!(api.login(&login("nobody@example.com")).await.unwrap_err().is_unauthorized());
}

#[tokio::test]
async fn test_unreachable_backend_is_transient() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = client(addr);
    let err = api
        .list_stocks(&SessionToken::new("good-token"), PageRequest::default())
        .await
        .unwrap_err();
    assert!(err.is_transient());
    assert_eq!(err.user_message(), "The backend could not be reached");
}
