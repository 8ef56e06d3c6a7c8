//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tower::util::ServiceExt;

use wallet_ledger::api::{self, AppState};
use wallet_ledger::auth::{AuthorizationGate, Claims, TokenVerifier};
use wallet_ledger::store::InMemoryLedgerStore;

pub const SECRET: &[u8] = b"integration-test-secret";

pub const ALICE: &str = "910815450350";
pub const BOB: &str = "850101300123";
pub const ADMIN: &str = "000000000000";

/// Full router over an empty in-memory store
pub fn in_memory_app() -> (Router, Arc<InMemoryLedgerStore>) {
    let store = Arc::new(InMemoryLedgerStore::new());
    let gate = AuthorizationGate::new(TokenVerifier::new(SECRET));
    let app = api::build_router(AppState::new(store.clone(), gate));
    (app, store)
}

/// Token valid for ten minutes
pub fn token(iin: &str, admin: bool) -> String {
    TokenVerifier::new(SECRET)
        .issue(&Claims::new(iin, admin, Utc::now(), Duration::minutes(10)))
        .unwrap()
}

/// Token that expired an hour ago
pub fn expired_token(iin: &str) -> String {
    TokenVerifier::new(SECRET)
        .issue(&Claims::new(
            iin,
            false,
            Utc::now() - Duration::hours(2),
            Duration::hours(1),
        ))
        .unwrap()
}

pub fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("token", token)
        .body(Body::empty())
        .unwrap()
}

pub fn post(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("token", token)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Send one request and decode the JSON body
pub async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response: Response<Body> = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Setup test database - apply the schema and truncate tables
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    pool.execute(include_str!("../../migrations/0001_init.sql"))
        .await
        .expect("Failed to apply schema");

    sqlx::query("TRUNCATE TABLE wallets, transactions RESTART IDENTITY")
        .execute(&pool)
        .await
        .expect("Failed to clean up DB");

    pool
}
