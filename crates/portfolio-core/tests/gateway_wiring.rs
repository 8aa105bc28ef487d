//! End-to-end checks of token propagation: the real `ApiClient` and
//! `SessionStore` against an in-process stub of the portfolio service.

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use portfolio_core::auth::{AuthState, MemoryTokenStore, TokenStore};
use portfolio_core::models::{Credentials, RegisterRequest, TradeOrder};
use portfolio_core::{ApiClient, AppContext, Navigation, RequestError, Route};

const VALID_TOKEN: &str = "T1";

#[derive(Clone, Default)]
struct Seen {
    auth: Arc<Mutex<Vec<Option<String>>>>,
    content_type: Arc<Mutex<Vec<Option<String>>>>,
}

impl Seen {
    fn record(&self, headers: &HeaderMap) -> Option<String> {
        let read = |name| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        let auth = read(header::AUTHORIZATION);
        self.auth.lock().unwrap().push(auth.clone());
        self.content_type.lock().unwrap().push(read(header::CONTENT_TYPE));
        auth
    }

    fn last_auth(&self) -> Option<String> {
        self.auth.lock().unwrap().last().cloned().flatten()
    }
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["email"] == "a@b.com" && body["password"] == "x" {
        (StatusCode::OK, Json(json!({ "access_token": VALID_TOKEN })))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "msg": "Invalid credentials" })))
    }
}

async fn register(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["email"] == "taken@b.com" {
        (StatusCode::CONFLICT, Json(json!({ "error": "Email already exists" })))
    } else if body["email"] == "down@b.com" {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "msg": "Service in maintenance" })),
        )
    } else {
        (StatusCode::CREATED, Json(json!({ "message": "User created successfully" })))
    }
}

fn authorized(seen: &Seen, headers: &HeaderMap) -> bool {
    seen.record(headers).as_deref() == Some("Bearer T1")
}

async fn portfolio(State(seen): State<Seen>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&seen, &headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "msg": "Token has expired" })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "cash_balance": "9250.00",
            "total_portfolio_value": 10000.0,
            "holdings": [
                { "ticker_symbol": "AAPL", "quantity": 5, "current_market_value": 750.0 }
            ]
        })),
    )
}

async fn quote(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Path(ticker): Path<String>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&seen, &headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "msg": "Missing token" })));
    }
    (
        StatusCode::OK,
        Json(json!({ "symbol": ticker, "price": 150.0, "name": "Test Asset" })),
    )
}

async fn buy(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&seen, &headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "msg": "Missing token" })));
    }
    if body["quantity"].as_u64().unwrap_or(0) > 100 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "msg": "Insufficient funds" })),
        );
    }
    (StatusCode::OK, Json(json!({ "msg": format!("Bought {}", body["ticker"]) })))
}

async fn spawn_stub() -> (String, Seen) {
    let seen = Seen::default();
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/portfolio", get(portfolio))
        .route("/api/portfolio/buy", post(buy))
        .route("/api/market/quote/{ticker}", get(quote))
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/api", addr), seen)
}

fn context(url: &str, tokens: &Arc<MemoryTokenStore>) -> AppContext {
    AppContext::with_token_store(url, tokens.clone()).unwrap()
}

#[tokio::test]
async fn login_propagates_token_to_requests() {
    let (url, seen) = spawn_stub().await;
    let tokens = Arc::new(MemoryTokenStore::new());
    let ctx = context(&url, &tokens);
    ctx.session.hydrate();

    let nav = ctx.session.login(&Credentials::new("a@b.com", "x")).await;

    assert_eq!(nav, Some(Navigation::push(Route::Dashboard)));
    assert_eq!(tokens.read().as_deref(), Some(VALID_TOKEN));
    assert_eq!(ctx.api.auth_token().as_deref(), Some(VALID_TOKEN));

    let portfolio = ctx.session.portfolio().await.unwrap();
    assert_eq!(portfolio.cash_balance, 9250.0);
    assert_eq!(portfolio.holdings[0].ticker_symbol, "AAPL");
    assert_eq!(seen.last_auth().as_deref(), Some("Bearer T1"));

    // Every request carries the default content type, GETs included
    assert!(seen
        .content_type
        .lock()
        .unwrap()
        .iter()
        .all(|ct| ct.as_deref() == Some("application/json")));
}

#[tokio::test]
async fn restart_restores_session() {
    let (url, seen) = spawn_stub().await;
    let tokens = Arc::new(MemoryTokenStore::new());

    let first = context(&url, &tokens);
    first.session.hydrate();
    first.session.login(&Credentials::new("a@b.com", "x")).await;
    drop(first);

    let second = context(&url, &tokens);
    assert_eq!(second.session.hydrate(), AuthState::Authenticated);
    assert_eq!(second.session.snapshot().token(), Some(VALID_TOKEN));
    second.session.portfolio().await.unwrap();
    assert_eq!(seen.last_auth().as_deref(), Some("Bearer T1"));
}

#[tokio::test]
async fn stored_token_is_sent_before_hydration() {
    let (url, seen) = spawn_stub().await;
    let tokens = Arc::new(MemoryTokenStore::with_token(VALID_TOKEN));
    let api = ApiClient::new(&url).unwrap().with_token_store(tokens.clone());

    assert_eq!(api.auth_token(), None);
    api.get_portfolio().await.unwrap();
    assert_eq!(seen.last_auth().as_deref(), Some("Bearer T1"));
}

#[tokio::test]
async fn no_token_means_no_auth_header() {
    let (url, seen) = spawn_stub().await;
    let tokens = Arc::new(MemoryTokenStore::new());
    let ctx = context(&url, &tokens);
    ctx.session.hydrate();

    let err = ctx.session.portfolio().await.unwrap_err();

    assert!(matches!(err, RequestError::SessionExpired { .. }));
    assert_eq!(seen.last_auth(), None);
}

#[tokio::test]
async fn invalid_credentials_set_error() {
    let (url, _seen) = spawn_stub().await;
    let tokens = Arc::new(MemoryTokenStore::new());
    let ctx = context(&url, &tokens);
    ctx.session.hydrate();

    let nav = ctx.session.login(&Credentials::new("a@b.com", "wrong")).await;

    assert_eq!(nav, None);
    let snapshot = ctx.session.snapshot();
    assert_eq!(snapshot.state(), AuthState::Unauthenticated);
    assert_eq!(snapshot.error(), Some("Invalid credentials"));
    assert_eq!(tokens.read(), None);
}

#[tokio::test]
async fn expired_token_logs_out() {
    let (url, _seen) = spawn_stub().await;
    let tokens = Arc::new(MemoryTokenStore::with_token("STALE"));
    let ctx = context(&url, &tokens);
    assert_eq!(ctx.session.hydrate(), AuthState::Authenticated);

    let err = ctx.session.portfolio().await.unwrap_err();

    assert_eq!(err.redirect(), Some(Navigation::replace(Route::Login)));
    assert_eq!(ctx.session.snapshot().state(), AuthState::Unauthenticated);
    assert_eq!(tokens.read(), None);
    assert_eq!(ctx.api.auth_token(), None);
}

#[tokio::test]
async fn register_reports_conflict_and_success() {
    let (url, _seen) = spawn_stub().await;
    let tokens = Arc::new(MemoryTokenStore::new());
    let ctx = context(&url, &tokens);
    ctx.session.hydrate();

    let nav = ctx
        .session
        .register(&RegisterRequest::new("u", "taken@b.com", "p"))
        .await;
    assert_eq!(nav, None);
    assert_eq!(ctx.session.snapshot().error(), Some("Email already exists"));

    let nav = ctx
        .session
        .register(&RegisterRequest::new("u", "down@b.com", "p"))
        .await;
    assert_eq!(nav, None);
    assert_eq!(ctx.session.snapshot().error(), Some("Service in maintenance"));

    let nav = ctx
        .session
        .register(&RegisterRequest::new("u", "e@b.com", "p"))
        .await;
    assert_eq!(nav, Some(Navigation::push(Route::Login)));
    assert_eq!(ctx.session.snapshot().token(), None);
    assert!(ctx.session.take_notice().is_some());
}

#[tokio::test]
async fn market_and_trade_calls_are_authenticated() {
    let (url, seen) = spawn_stub().await;
    let tokens = Arc::new(MemoryTokenStore::new());
    let ctx = context(&url, &tokens);
    ctx.session.hydrate();
    ctx.session.login(&Credentials::new("a@b.com", "x")).await;

    let quote = ctx.session.guarded(ctx.api.get_quote("aapl")).await.unwrap();
    assert_eq!(quote.symbol, "AAPL");
    assert_eq!(seen.last_auth().as_deref(), Some("Bearer T1"));

    let order = TradeOrder::new("aapl", 2).unwrap();
    let receipt = ctx.session.guarded(ctx.api.buy(&order)).await.unwrap();
    assert!(receipt.msg.contains("AAPL"));

    let too_many = TradeOrder::new("aapl", 500).unwrap();
    let err = ctx.session.guarded(ctx.api.buy(&too_many)).await.unwrap_err();
    assert_eq!(err.to_string(), "Insufficient funds");
    assert!(ctx.session.snapshot().is_authenticated());
}
