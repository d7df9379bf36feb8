//! End-to-end tests of the HTTP surface over an in-memory database.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::AUTHORIZATION},
};
use http_body_util::BodyExt;
use potluck_api::{AppState, create_router};
use potluck_core::notify::NoopNotifier;
use potluck_db::migration::{Migrator, MigratorTrait};
use potluck_shared::{JwtConfig, JwtService};
use sea_orm::{ConnectOptions, Database};
use serde_json::{Value, json};
use tower::ServiceExt;

const PASSWORD: &str = "correct horse battery";

async fn app() -> Router {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let jwt = JwtService::new(JwtConfig {
        secret: "test-secret".to_string(),
        access_ttl_secs: 900,
        refresh_ttl_secs: 7 * 86_400,
    });
    create_router(AppState::new(db, jwt, Arc::new(NoopNotifier)))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            request = request.header("Content-Type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// A registered and logged-in user.
struct Member {
    id: String,
    token: String,
}

async fn sign_up(app: &Router, username: &str) -> Member {
    let (status, user) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": username, "name": username, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{user}");

    let (status, login) = send(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": username, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{login}");

    Member {
        id: user["id"].as_str().unwrap().to_string(),
        token: login["access_token"].as_str().unwrap().to_string(),
    }
}

/// Creates a group owned by `owner` and votes every other member in.
async fn group_of(app: &Router, owner: &Member, others: &[&Member]) -> String {
    let (status, group) = send(
        app,
        "POST",
        "/groups",
        Some(&owner.token),
        Some(json!({ "name": "Flat 4B" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let group_id = group["id"].as_str().unwrap().to_string();

    for (joined, member) in others.iter().enumerate() {
        let (status, action) = send(
            app,
            "POST",
            &format!("/groups/{group_id}/add_member/{}", member.id),
            Some(&owner.token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED, "{action}");
        let action_id = action["id"].as_str().unwrap().to_string();

        let mut voters = others[..joined].iter();
        let mut current = action;
        while current["status"] == "PENDING" {
            let voter = voters.next().unwrap();
            let (status, body) = send(
                app,
                "POST",
                &format!("/actions/{action_id}/vote"),
                Some(&voter.token),
                Some(json!({ "voter_id": voter.id, "approve": true })),
            )
            .await;
            assert_eq!(status, StatusCode::OK, "{body}");
            current = body;
        }
        assert_eq!(current["status"], "CONFIRMED");
    }
    group_id
}

#[tokio::test]
async fn test_health_is_public() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = app().await;

    let (status, body) = send(&app, "GET", "/expenses", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_token");

    let (status, body) = send(&app, "GET", "/expenses", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_register_and_login_rules() {
    let app = app().await;

    let (status, first) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": "Alice", "name": "Alice", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["username"], "alice");
    assert_eq!(first["role"], "ADMIN");

    let (status, second) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": "bob", "name": "Bob", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(second["role"], "USER");

    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": "ALICE", "name": "Other", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");

    let (status, _) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": "carol", "name": "Carol", "password": "short" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "bob", "password": "wrong password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_credentials");

    let (status, tokens) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "bob", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tokens["token_type"], "bearer");
    assert_eq!(tokens["user"]["username"], "bob");

    let (status, refreshed) = send(
        &app,
        "POST",
        "/auth/refresh",
        None,
        Some(json!({ "refresh_token": tokens["refresh_token"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(refreshed["access_token"].is_string());

    // A refresh token does not authenticate API calls.
    let refresh_token = tokens["refresh_token"].as_str().unwrap();
    let (status, body) = send(&app, "GET", "/users", Some(refresh_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_expense_vote_flow() {
    let app = app().await;
    let alice = sign_up(&app, "alice").await;
    let bob = sign_up(&app, "bob").await;
    let carol = sign_up(&app, "carol").await;
    let group_id = group_of(&app, &alice, &[&bob, &carol]).await;

    let (status, action) = send(
        &app,
        "POST",
        "/expenses",
        Some(&alice.token),
        Some(json!({
            "description": "Groceries",
            "total_amount": 30.0,
            "group_id": group_id,
            "participant_ids": [alice.id, bob.id, carol.id],
            "category_name": "food",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED, "{action}");
    assert_eq!(action["status"], "PENDING");
    assert_eq!(action["action_type"], "EXPENSE");
    assert_eq!(action["details"]["paid_by_user_id"], json!(alice.id));
    assert_eq!(action["votes_for"], 1);
    assert_eq!(action["required_votes"], 2);
    let action_id = action["id"].as_str().unwrap().to_string();

    // Bob's inbox holds the proposal.
    let (status, inbox) = send(&app, "GET", "/actions/pending", Some(&bob.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inbox.as_array().unwrap().len(), 1);
    assert_eq!(inbox[0]["id"], json!(action_id));

    // Nobody reads someone else's inbox.
    let (status, _) = send(
        &app,
        "GET",
        &format!("/actions/pending?user_id={}", alice.id),
        Some(&bob.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The initiator's approval is already counted.
    let (status, body) = send(
        &app,
        "POST",
        &format!("/actions/{action_id}/vote"),
        Some(&alice.token),
        Some(json!({ "voter_id": alice.id, "approve": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "DUPLICATE_VOTE");

    // Voting as someone else is refused.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/actions/{action_id}/vote"),
        Some(&bob.token),
        Some(json!({ "voter_id": carol.id, "approve": true })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/actions/{}/vote", uuid::Uuid::now_v7()),
        Some(&bob.token),
        Some(json!({ "voter_id": bob.id, "approve": true })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");

    let (status, confirmed) = send(
        &app,
        "POST",
        &format!("/actions/{action_id}/vote"),
        Some(&bob.token),
        Some(json!({ "voter_id": bob.id, "approve": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["status"], "CONFIRMED");
    assert!(confirmed["resolved_at"].is_string());

    let (status, expenses) = send(&app, "GET", "/expenses", Some(&carol.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(expenses.as_array().unwrap().len(), 1);
    assert_eq!(expenses[0]["category"]["name"], "Food");
    assert_eq!(expenses[0]["total_amount"], json!(30.0));

    let (status, debts) = send(
        &app,
        "GET",
        &format!("/debts/history?group_id={group_id}"),
        Some(&carol.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let debts = debts.as_array().unwrap();
    assert_eq!(debts.len(), 2);
    for debt in debts {
        assert_eq!(debt["creditor"]["id"], json!(alice.id));
        assert_eq!(debt["remaining_amount"], json!(10.0));
        assert_eq!(debt["payments"], json!([]));
    }

    let (status, summary) =
        send(&app, "GET", "/balance-summary", Some(&bob.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary.as_array().unwrap().len(), 2);

    // Carol's inbox is empty once the action resolved.
    let (_, inbox) = send(&app, "GET", "/actions/pending", Some(&carol.token), None).await;
    assert_eq!(inbox, json!([]));
}

#[tokio::test]
async fn test_expense_rejects_sub_cent_amounts_and_outsiders() {
    let app = app().await;
    let alice = sign_up(&app, "alice").await;
    let bob = sign_up(&app, "bob").await;
    let mallory = sign_up(&app, "mallory").await;
    let group_id = group_of(&app, &alice, &[&bob]).await;

    let (status, _) = send(
        &app,
        "POST",
        "/expenses",
        Some(&alice.token),
        Some(json!({
            "description": "Coffee",
            "total_amount": 1.005,
            "group_id": group_id,
            "participant_ids": [alice.id, bob.id],
            "category_name": "Food",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/expenses",
        Some(&mallory.token),
        Some(json!({
            "description": "Coffee",
            "total_amount": 4.0,
            "group_id": group_id,
            "participant_ids": [alice.id, bob.id],
            "category_name": "Food",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/groups/{group_id}"),
        Some(&mallory.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_wallet_deposit_withdraw_and_settle() {
    let app = app().await;
    let alice = sign_up(&app, "alice").await;
    let bob = sign_up(&app, "bob").await;
    let group_id = group_of(&app, &alice, &[&bob]).await;

    // Deposits are made for oneself only.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/groups/{group_id}/wallet/deposit"),
        Some(&bob.token),
        Some(json!({ "user_id": alice.id, "amount": 50.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, action) = send(
        &app,
        "POST",
        &format!("/groups/{group_id}/wallet/deposit"),
        Some(&bob.token),
        Some(json!({ "user_id": bob.id, "amount": 50.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(action["status"], "PENDING");
    let (status, _) = send(
        &app,
        "POST",
        &format!("/actions/{}/vote", action["id"].as_str().unwrap()),
        Some(&alice.token),
        Some(json!({ "voter_id": alice.id, "approve": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/groups/{group_id}/wallet/withdraw"),
        Some(&bob.token),
        Some(json!({ "user_id": bob.id, "amount": 5.0, "password": "wrong password" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/groups/{group_id}/wallet/withdraw"),
        Some(&bob.token),
        Some(json!({ "user_id": bob.id, "amount": 500.0, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "INSUFFICIENT_FUNDS");

    let (status, balance) = send(
        &app,
        "POST",
        &format!("/groups/{group_id}/wallet/withdraw"),
        Some(&bob.token),
        Some(json!({ "user_id": bob.id, "amount": 10.0, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance["total_wallet_balance"], json!(40.0));

    // Bob owes Alice 20 for a shared dinner.
    let (status, expense) = send(
        &app,
        "POST",
        "/expenses",
        Some(&alice.token),
        Some(json!({
            "description": "Dinner",
            "total_amount": 40.0,
            "group_id": group_id,
            "participant_ids": [alice.id, bob.id],
            "category_name": "Food",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let (status, _) = send(
        &app,
        "POST",
        &format!("/actions/{}/vote", expense["id"].as_str().unwrap()),
        Some(&bob.token),
        Some(json!({ "voter_id": bob.id, "approve": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, summary) = send(
        &app,
        "POST",
        &format!("/groups/{group_id}/wallet/settle-debts"),
        Some(&bob.token),
        Some(json!({ "user_id": bob.id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{summary}");
    assert_eq!(summary["total_settled"], json!(20.0));
    assert_eq!(summary["settlement_logs"][0]["status"], "Fully Settled");

    let (status, balance) = send(
        &app,
        "GET",
        &format!("/groups/{group_id}/wallet/balance"),
        Some(&alice.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance["total_wallet_balance"], json!(40.0));

    let (status, log) = send(
        &app,
        "GET",
        &format!("/groups/{group_id}/wallet/transactions"),
        Some(&alice.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // Deposit, withdrawal and the two settlement legs.
    assert_eq!(log.as_array().unwrap().len(), 4);

    let (status, plan) = send(
        &app,
        "GET",
        &format!("/groups/{group_id}/settlement-plan"),
        Some(&alice.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plan, json!([]));
}

#[tokio::test]
async fn test_admin_moderation() {
    let app = app().await;
    let admin = sign_up(&app, "admin").await;
    let bob = sign_up(&app, "bob").await;
    let carol = sign_up(&app, "carol").await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/admin/users/{}/ban", carol.id),
        Some(&bob.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, banned) = send(
        &app,
        "POST",
        &format!("/admin/users/{}/ban", carol.id),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(banned["is_banned"], true);

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "carol", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "account_disabled");

    let (status, unbanned) = send(
        &app,
        "POST",
        &format!("/admin/users/{}/unban", carol.id),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unbanned["is_banned"], false);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/admin/users/{}", carol.id),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, user) = send(
        &app,
        "GET",
        &format!("/users/{}", carol.id),
        Some(&bob.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["is_active"], false);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/users/{}/groups", admin.id),
        Some(&bob.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_categories_are_public() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/categories", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_array());
}
