//! End-to-end tests over the HTTP router, backed by the in-memory store.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Duration;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use book_wallet_api::{
    app, config::Config, store::MemoryStore, utils::auth_token::issue_token, AppState,
};

const SECRET: &str = "test-secret";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct TestApp {
    router: Router,
    admin: String,
}

impl TestApp {
    fn new() -> Self {
        let state = AppState::new(Arc::new(MemoryStore::new()), Config::for_memory(SECRET));
        Self {
            router: app(state),
            admin: token_for(Uuid::new_v4(), "admin"),
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.send_with(method, uri, token, body, &[]).await
    }

    async fn send_with(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn wallet(&self, token: &str) -> Value {
        let (status, body) = self.send(Method::GET, "/api/wallet", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        body["wallet"].clone()
    }

    /// Credits `owner_earnings` to the user through a lending fee capture.
    async fn earn(&self, user_id: Uuid, lending_fee: f64) {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/wallet/admin/lending-fees",
                Some(&self.admin),
                Some(json!({
                    "borrowRequestId": Uuid::new_v4().to_string(),
                    "ownerId": user_id,
                    "lendingFee": lending_fee,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    async fn withdraw(&self, token: &str, amount: f64) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/wallet/withdraw",
            Some(token),
            Some(withdrawal_body(amount)),
        )
        .await
    }

    async fn process(&self, id: &str, action: &str, notes: &str) -> (StatusCode, Value) {
        self.send(
            Method::PUT,
            &format!("/api/wallet/admin/withdrawal-requests/{id}"),
            Some(&self.admin),
            Some(json!({ "action": action, "adminNotes": notes })),
        )
        .await
    }

    async fn summary(&self) -> Value {
        let (status, body) = self
            .send(
                Method::GET,
                "/api/wallet/admin/platform-summary",
                Some(&self.admin),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["summary"].clone()
    }
}

fn token_for(user_id: Uuid, role: &str) -> String {
    issue_token(SECRET, user_id, "reader@example.in", role, Duration::hours(1)).unwrap()
}

fn new_user() -> (Uuid, String) {
    let id = Uuid::new_v4();
    (id, token_for(id, "user"))
}

fn withdrawal_body(amount: f64) -> Value {
    json!({
        "amount": amount,
        "bankDetails": {
            "accountHolderName": "Meera Iyer",
            "accountNumber": "50100123456789",
            "ifscCode": "HDFC0000123",
            "bankName": "HDFC Bank"
        }
    })
}

fn num(value: &Value) -> f64 {
    value
        .as_f64()
        .unwrap_or_else(|| panic!("expected a number, got {value}"))
}

fn assert_consistent(wallet: &Value) {
    let balance = num(&wallet["balance"]);
    let total = num(&wallet["totalEarnings"]);
    let withdrawn = num(&wallet["withdrawnAmount"]);
    let pending = num(&wallet["pendingEarnings"]);
    assert!((balance - (total - withdrawn)).abs() < 1e-9, "{wallet}");
    assert!(pending <= balance + 1e-9, "{wallet}");
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_is_public() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn wallet_requires_a_token() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/api/wallet", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "NOT_AUTHORIZED");
    assert_eq!(body["success"], false);

    let (status, body) = app
        .send(Method::GET, "/api/wallet", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_TOKEN");

    let expired = issue_token(
        SECRET,
        Uuid::new_v4(),
        "old@example.in",
        "user",
        Duration::hours(-3),
    )
    .unwrap();
    let (status, body) = app
        .send(Method::GET, "/api/wallet", Some(&expired), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TOKEN_EXPIRED");
}

#[tokio::test]
async fn admin_routes_reject_regular_users() {
    let app = TestApp::new();
    let (_, token) = new_user();

    let (status, body) = app
        .send(
            Method::GET,
            "/api/wallet/admin/platform-summary",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

// ---------------------------------------------------------------------------
// Wallet queries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_wallet_starts_empty_with_trailing_slash_too() {
    let app = TestApp::new();
    let (user_id, token) = new_user();

    let (status, body) = app
        .send(Method::GET, "/api/wallet/", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let wallet = &body["wallet"];
    assert_eq!(wallet["userId"], user_id.to_string());
    assert_eq!(num(&wallet["balance"]), 0.0);
    assert_eq!(wallet["canWithdraw"], false);
    assert_eq!(num(&wallet["minimumWithdrawal"]), 100.0);

    let (status, body) = app
        .send(Method::GET, "/api/wallet/transactions", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transactions"], json!([]));
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn can_withdraw_flips_at_one_hundred_rupees() {
    let app = TestApp::new();
    let (user_id, token) = new_user();

    for (amount, expected) in [(99.99, false), (0.01, true)] {
        let (status, body) = app
            .send(
                Method::POST,
                "/api/wallet/admin/adjust",
                Some(&app.admin),
                Some(json!({
                    "userId": user_id,
                    "type": "credit",
                    "amount": amount,
                    "reason": "Goodwill credit",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");

        let wallet = app.wallet(&token).await;
        assert_eq!(wallet["canWithdraw"], expected, "{wallet}");
    }
}

#[tokio::test]
async fn transaction_history_is_paginated_newest_first() {
    let app = TestApp::new();
    let (user_id, token) = new_user();
    app.earn(user_id, 100.0).await;
    app.earn(user_id, 200.0).await;
    app.earn(user_id, 300.0).await;

    let (status, body) = app
        .send(
            Method::GET,
            "/api/wallet/transactions?limit=2",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 3);
    let items = body["transactions"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(num(&items[0]["amount"]), 240.0);
    assert_eq!(items[0]["source"], "lending_fee");
    assert_eq!(items[0]["type"], "credit");
    assert_eq!(num(&items[0]["balanceAfter"]), 480.0);
}

// ---------------------------------------------------------------------------
// Withdrawal requests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_withdrawals_write_nothing() {
    let app = TestApp::new();
    let (user_id, token) = new_user();
    app.earn(user_id, 1000.0).await;

    let (status, body) = app.withdraw(&token, 99.0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "AMOUNT_BELOW_MINIMUM");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/wallet/withdraw",
            Some(&token),
            Some(json!({ "amount": 150 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let mut bad_ifsc = withdrawal_body(150.0);
    bad_ifsc["bankDetails"]["ifscCode"] = json!("HDFC123");
    let (status, body) = app
        .send(Method::POST, "/api/wallet/withdraw", Some(&token), Some(bad_ifsc))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid IFSC code");

    let (status, body) = app.withdraw(&token, 900.0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INSUFFICIENT_PENDING_EARNINGS");

    let (_, body) = app
        .send(Method::GET, "/api/wallet/withdrawals", Some(&token), None)
        .await;
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn approval_flow_updates_wallet_summary_and_notifications() {
    let app = TestApp::new();
    let (user_id, token) = new_user();

    // 312.50 less 20% commission leaves 250 for the owner.
    app.earn(user_id, 312.5).await;
    let wallet = app.wallet(&token).await;
    assert_eq!(num(&wallet["pendingEarnings"]), 250.0);
    assert_eq!(wallet["canWithdraw"], true);

    let before = app.summary().await;

    let (status, body) = app.withdraw(&token, 150.0).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let request = &body["withdrawal"];
    assert_eq!(request["metadata"]["status"], "pending");
    assert_eq!(request["source"], "withdrawal");
    let id = request["id"].as_str().unwrap().to_string();

    // Nothing moves until the admin approves.
    let wallet = app.wallet(&token).await;
    assert_eq!(num(&wallet["balance"]), 250.0);
    assert_eq!(num(&wallet["reservedForWithdrawal"]), 150.0);

    let (status, body) = app
        .send(
            Method::GET,
            "/api/wallet/admin/withdrawal-requests",
            Some(&app.admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let pending = body["withdrawalRequests"].as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["id"], id);

    let (status, body) = app.process(&id, "approve", "Verified via penny drop").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["withdrawal"]["metadata"]["status"], "approved");
    assert_eq!(
        body["withdrawal"]["metadata"]["adminNotes"],
        "Verified via penny drop"
    );
    assert!(body["withdrawal"]["metadata"]["approvedBy"].is_string());

    let wallet = app.wallet(&token).await;
    assert_eq!(num(&wallet["balance"]), 100.0);
    assert_eq!(num(&wallet["pendingEarnings"]), 100.0);
    assert_eq!(num(&wallet["withdrawnAmount"]), 150.0);
    assert_consistent(&wallet);

    let after = app.summary().await;
    assert_eq!(
        num(&after["approvedWithdrawalAmount"]) - num(&before["approvedWithdrawalAmount"]),
        150.0
    );
    assert_eq!(
        num(&after["totalWithdrawn"]) - num(&before["totalWithdrawn"]),
        150.0
    );
    assert_eq!(after["pendingWithdrawalCount"], 0);
    assert_eq!(num(&after["totalPlatformCommission"]), 62.5);

    let (status, body) = app
        .send(Method::GET, "/api/notifications", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let latest = &body["notifications"][0];
    assert_eq!(latest["kind"], "withdrawal_approved");
    assert_eq!(latest["transactionId"], id);
    assert_eq!(latest["read"], false);
}

#[tokio::test]
async fn second_approval_conflicts_and_changes_nothing() {
    let app = TestApp::new();
    let (user_id, token) = new_user();
    app.earn(user_id, 500.0).await;

    let (_, body) = app.withdraw(&token, 200.0).await;
    let id = body["withdrawal"]["id"].as_str().unwrap().to_string();

    let (status, _) = app.process(&id, "approve", "ok").await;
    assert_eq!(status, StatusCode::OK);
    let wallet_after_first = app.wallet(&token).await;

    let (status, body) = app.process(&id, "approve", "again").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "WITHDRAWAL_ALREADY_PROCESSED");
    assert_eq!(body["message"], "Withdrawal request has already been approved");

    let (status, body) = app.process(&id, "reject", "too late").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "WITHDRAWAL_ALREADY_PROCESSED");

    assert_eq!(app.wallet(&token).await, wallet_after_first);
}

#[tokio::test]
async fn rejection_never_touches_the_wallet() {
    let app = TestApp::new();
    let (user_id, token) = new_user();
    app.earn(user_id, 400.0).await;
    let before = app.wallet(&token).await;

    let (_, body) = app.withdraw(&token, 300.0).await;
    let id = body["withdrawal"]["id"].as_str().unwrap().to_string();

    let (status, body) = app.process(&id, "reject", "Account name mismatch").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["withdrawal"]["metadata"]["status"], "rejected");
    assert!(body["withdrawal"]["metadata"]["rejectedBy"].is_string());

    let after = app.wallet(&token).await;
    assert_eq!(after["balance"], before["balance"]);
    assert_eq!(after["pendingEarnings"], before["pendingEarnings"]);
    assert_eq!(after["withdrawnAmount"], before["withdrawnAmount"]);
    assert_eq!(num(&after["reservedForWithdrawal"]), 0.0);

    let (_, body) = app
        .send(
            Method::GET,
            "/api/notifications?unreadOnly=true",
            Some(&token),
            None,
        )
        .await;
    let latest = &body["notifications"][0];
    assert_eq!(latest["kind"], "withdrawal_rejected");
    assert!(latest["message"]
        .as_str()
        .unwrap()
        .contains("Account name mismatch"));
}

#[tokio::test]
async fn unknown_or_malformed_request_ids_are_not_found() {
    let app = TestApp::new();

    let (status, body) = app
        .process(&Uuid::new_v4().to_string(), "approve", "")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "WITHDRAWAL_NOT_FOUND");

    let (status, body) = app.process("not-an-id", "approve", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "WITHDRAWAL_NOT_FOUND");
}

#[tokio::test]
async fn repeated_submission_with_same_key_is_deduplicated() {
    let app = TestApp::new();
    let (user_id, token) = new_user();
    app.earn(user_id, 1000.0).await;

    let headers = [("Idempotency-Key", "withdraw-42")];
    let (first_status, first) = app
        .send_with(
            Method::POST,
            "/api/wallet/withdraw",
            Some(&token),
            Some(withdrawal_body(150.0)),
            &headers,
        )
        .await;
    let (second_status, second) = app
        .send_with(
            Method::POST,
            "/api/wallet/withdraw",
            Some(&token),
            Some(withdrawal_body(150.0)),
            &headers,
        )
        .await;

    assert_eq!(first_status, StatusCode::CREATED);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first["withdrawal"]["id"], second["withdrawal"]["id"]);

    let (_, body) = app
        .send(Method::GET, "/api/wallet/withdrawals", Some(&token), None)
        .await;
    assert_eq!(body["pagination"]["total"], 1);
}

// ---------------------------------------------------------------------------
// Admin adjustments and fees
// ---------------------------------------------------------------------------

#[tokio::test]
async fn debit_adjustment_is_checked_server_side() {
    let app = TestApp::new();
    let (user_id, token) = new_user();
    app.earn(user_id, 100.0).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/wallet/admin/adjust",
            Some(&app.admin),
            Some(json!({
                "userId": user_id,
                "type": "debit",
                "amount": 80.01,
                "reason": "Lost book penalty",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INSUFFICIENT_BALANCE");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/wallet/admin/adjust",
            Some(&app.admin),
            Some(json!({
                "userId": user_id,
                "type": "debit",
                "amount": 30,
                "reason": "Lost book penalty",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["transaction"]["source"], "penalty");
    assert_eq!(body["transaction"]["metadata"]["reason"], "Lost book penalty");

    let wallet = app.wallet(&token).await;
    assert_eq!(num(&wallet["balance"]), 50.0);
    assert_consistent(&wallet);
}

#[tokio::test]
async fn lending_fee_capture_is_one_shot() {
    let app = TestApp::new();
    let owner = Uuid::new_v4();
    let body = json!({
        "borrowRequestId": "borrow-991",
        "ownerId": owner,
        "lendingFee": 60,
    });

    let (status, first) = app
        .send(
            Method::POST,
            "/api/wallet/admin/lending-fees",
            Some(&app.admin),
            Some(body.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(num(&first["capture"]["platformFee"]), 12.0);
    assert_eq!(num(&first["capture"]["ownerEarnings"]), 48.0);

    let (status, again) = app
        .send(
            Method::POST,
            "/api/wallet/admin/lending-fees",
            Some(&app.admin),
            Some(body),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(again["code"], "LENDING_FEE_ALREADY_CAPTURED");

    let (_, listing) = app
        .send(
            Method::GET,
            &format!("/api/wallet/admin/transactions?userId={owner}&source=lending_fee"),
            Some(&app.admin),
            None,
        )
        .await;
    assert_eq!(listing["pagination"]["total"], 1);
}

#[tokio::test]
async fn notifications_can_be_marked_read_by_their_owner_only() {
    let app = TestApp::new();
    let (user_id, token) = new_user();
    let (_, other_token) = new_user();
    app.earn(user_id, 100.0).await;

    let (_, body) = app
        .send(Method::GET, "/api/notifications", Some(&token), None)
        .await;
    let id = body["notifications"][0]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/notifications/{id}/read");

    let (status, body) = app.send(Method::PUT, &uri, Some(&other_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOTIFICATION_NOT_FOUND");

    let (status, _) = app.send(Method::PUT, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .send(
            Method::GET,
            "/api/notifications?unreadOnly=true",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn oversized_amounts_are_rejected_before_touching_a_wallet() {
    let app = TestApp::new();
    let (user_id, token) = new_user();

    for _ in 0..2 {
        let (status, body) = app
            .send(
                Method::POST,
                "/api/wallet/admin/adjust",
                Some(&app.admin),
                Some(json!({
                    "userId": user_id,
                    "type": "credit",
                    "amount": 5e28,
                    "reason": "Bulk correction",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    let (status, body) = app
        .send(
            Method::POST,
            "/api/wallet/admin/lending-fees",
            Some(&app.admin),
            Some(json!({
                "borrowRequestId": "borrow-huge",
                "ownerId": user_id,
                "lendingFee": 1_000_000_000_000_u64,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let wallet = app.wallet(&token).await;
    assert_eq!(num(&wallet["balance"]), 0.0);
    assert_eq!(app.summary().await["transactionCount"], 0);
}

#[tokio::test]
async fn credits_stop_at_the_wallet_limit() {
    let app = TestApp::new();
    let (user_id, token) = new_user();
    let credit = |amount: f64| {
        json!({
            "userId": user_id,
            "type": "credit",
            "amount": amount,
            "reason": "Opening balance",
        })
    };

    let (status, body) = app
        .send(
            Method::POST,
            "/api/wallet/admin/adjust",
            Some(&app.admin),
            Some(credit(999_999_999_999.99)),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let before = app.wallet(&token).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/wallet/admin/adjust",
            Some(&app.admin),
            Some(credit(0.01)),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(app.wallet(&token).await, before);
}

#[tokio::test]
async fn admin_text_fields_are_limited_to_500_characters() {
    let app = TestApp::new();
    let (user_id, token) = new_user();
    app.earn(user_id, 500.0).await;

    let (_, body) = app.withdraw(&token, 150.0).await;
    let id = body["withdrawal"]["id"].as_str().unwrap().to_string();

    let (status, body) = app.process(&id, "approve", &"n".repeat(501)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(num(&app.wallet(&token).await["reservedForWithdrawal"]), 150.0);

    let (status, body) = app.process(&id, "approve", &"n".repeat(500)).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let before = app.wallet(&token).await;
    let (status, body) = app
        .send(
            Method::POST,
            "/api/wallet/admin/adjust",
            Some(&app.admin),
            Some(json!({
                "userId": user_id,
                "type": "debit",
                "amount": 10,
                "reason": "r".repeat(501),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(app.wallet(&token).await, before);
}

async fn queue(app: &TestApp, query: &str) -> (StatusCode, Value) {
    app.send(
        Method::GET,
        &format!("/api/wallet/admin/withdrawal-requests{query}"),
        Some(&app.admin),
        None,
    )
    .await
}

#[tokio::test]
async fn withdrawal_queue_filters_by_status() {
    let app = TestApp::new();
    let (user_id, token) = new_user();
    app.earn(user_id, 1000.0).await;

    let mut ids = Vec::new();
    for _ in 0..3 {
        let (status, body) = app.withdraw(&token, 150.0).await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(body["withdrawal"]["id"].as_str().unwrap().to_string());
    }
    app.process(&ids[0], "approve", "").await;
    app.process(&ids[1], "reject", "").await;

    let ids_of = |body: &Value| -> Vec<String> {
        body["withdrawalRequests"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect()
    };

    let (_, body) = queue(&app, "").await;
    assert_eq!(ids_of(&body), vec![ids[2].clone()]);

    let (_, body) = queue(&app, "?status=approved").await;
    assert_eq!(ids_of(&body), vec![ids[0].clone()]);

    let (_, body) = queue(&app, "?status=rejected").await;
    assert_eq!(ids_of(&body), vec![ids[1].clone()]);

    let (_, body) = queue(&app, "?status=all").await;
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(ids_of(&body), vec![ids[2].clone(), ids[1].clone(), ids[0].clone()]);

    let (_, body) = queue(&app, "?status=all&limit=1&offset=1").await;
    assert_eq!(ids_of(&body), vec![ids[1].clone()]);
    assert_eq!(body["pagination"]["offset"], 1);

    let (status, body) = queue(&app, "?status=cancelled").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn offset_pages_through_history() {
    let app = TestApp::new();
    let (user_id, token) = new_user();
    for fee in [100.0, 200.0, 300.0, 400.0, 500.0] {
        app.earn(user_id, fee).await;
    }

    let amounts = |body: &Value| -> Vec<f64> {
        body["transactions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|tx| num(&tx["amount"]))
            .collect()
    };

    let (status, body) = app
        .send(
            Method::GET,
            "/api/wallet/transactions?limit=2&offset=2",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amounts(&body), vec![240.0, 160.0]);
    assert_eq!(body["pagination"], json!({ "total": 5, "limit": 2, "offset": 2 }));

    let (_, body) = app
        .send(
            Method::GET,
            "/api/wallet/transactions?limit=2&offset=4",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(amounts(&body), vec![80.0]);

    let (_, body) = app
        .send(
            Method::GET,
            "/api/notifications?limit=3&offset=3",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(body["pagination"]["total"], 5);
    assert_eq!(body["notifications"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn malformed_notification_id_is_not_found() {
    let app = TestApp::new();
    let (_, token) = new_user();

    let (status, body) = app
        .send(
            Method::PUT,
            "/api/notifications/not-an-id/read",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOTIFICATION_NOT_FOUND");
}
