//! Integration tests for the Warrantree backend.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::warranty::FixedClock;
use crate::{create_router, AppState};

/// Instant every test server derives warranty status at.
static NOW: Lazy<DateTime<Utc>> = Lazy::new(|| Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap());

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");

        // Create config
        let config = Config {
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            expiry_window_days: 30,
            session_ttl_hours: 24,
            seed_demo: false,
        };

        let state = AppState::new(Repository::new(pool), config, Arc::new(FixedClock(*NOW)));
        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> (StatusCode, Value) {
        let resp = request.send().await.unwrap();
        let status = resp.status();
        let body = resp.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.send(self.client.get(self.url(path)).bearer_auth(token))
            .await
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(self.client.post(self.url(path)).bearer_auth(token).json(&body))
            .await
    }

    async fn put(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(self.client.put(self.url(path)).bearer_auth(token).json(&body))
            .await
    }

    async fn delete(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.send(self.client.delete(self.url(path)).bearer_auth(token))
            .await
    }

    /// Register a user and return their session token.
    async fn register(&self, name: &str, email: &str) -> String {
        let (status, body) = self
            .send(self.client.post(self.url("/api/auth/register")).json(&json!({
                "name": name,
                "email": email,
                "password": "password123"
            })))
            .await;
        assert_eq!(status, 200, "register failed: {}", body);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    async fn create_vault(&self, token: &str, name: &str) -> String {
        let (status, body) = self
            .post("/api/vaults", token, json!({ "name": name }))
            .await;
        assert_eq!(status, 200, "create vault failed: {}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn create_item(&self, token: &str, item: Value) -> Value {
        let (status, body) = self.post("/api/items", token, item).await;
        assert_eq!(status, 200, "create item failed: {}", body);
        body["data"].clone()
    }

    async fn category_id(&self, name: &str) -> String {
        let (_, body) = self
            .send(self.client.get(self.url("/api/categories")))
            .await;
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["name"] == name)
            .and_then(|c| c["id"].as_str())
            .unwrap()
            .to_string()
    }
}

// ==================== HEALTH & AUTH ====================

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_register_login_and_me() {
    let fixture = TestFixture::new().await;
    let token = fixture.register("Ada", "Ada@Example.com").await;

    let (status, body) = fixture.get("/api/auth/me", &token).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], "ada@example.com");
    assert_eq!(body["data"]["role"], "USER");
    assert!(body["data"].get("passwordHash").is_none());

    let (status, body) = fixture
        .send(fixture.client.post(fixture.url("/api/auth/login")).json(&json!({
            "email": "ada@example.com",
            "password": "password123"
        })))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["expiresAt"], "2024-01-11T00:00:00Z");
    let second = body["data"]["token"].as_str().unwrap();
    assert_ne!(second, token);

    let (status, body) = fixture.get("/api/auth/validate", second).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["valid"], true);
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let fixture = TestFixture::new().await;
    fixture.register("Ada", "ada@example.com").await;

    let (status, body) = fixture
        .send(fixture.client.post(fixture.url("/api/auth/login")).json(&json!({
            "email": "ada@example.com",
            "password": "wrong-password"
        })))
        .await;
    assert_eq!(status, 401);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = fixture
        .send(fixture.client.post(fixture.url("/api/auth/login")).json(&json!({
            "email": "nobody@example.com",
            "password": "password123"
        })))
        .await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_register_validation_and_duplicates() {
    let fixture = TestFixture::new().await;
    fixture.register("Ada", "ada@example.com").await;

    let (status, body) = fixture
        .send(fixture.client.post(fixture.url("/api/auth/register")).json(&json!({
            "name": "Other Ada",
            "email": "ADA@example.com",
            "password": "password123"
        })))
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, body) = fixture
        .send(fixture.client.post(fixture.url("/api/auth/register")).json(&json!({
            "name": "Bob",
            "email": "bob@example.com",
            "password": "short"
        })))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = fixture
        .send(fixture.client.post(fixture.url("/api/auth/register")).json(&json!({
            "name": "Bob",
            "email": "not-an-email",
            "password": "password123"
        })))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let fixture = TestFixture::new().await;
    let token = fixture.register("Ada", "ada@example.com").await;

    let (status, body) = fixture
        .send(fixture.client.get(fixture.url("/api/vaults")))
        .await;
    assert_eq!(status, 401);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = fixture.get("/api/vaults", "garbage").await;
    assert_eq!(status, 401);

    // Right session id, wrong secret
    let (session_id, _) = token.split_once('.').unwrap();
    let forged = format!("{}.{}", session_id, "0".repeat(64));
    let (status, _) = fixture.get("/api/vaults", &forged).await;
    assert_eq!(status, 401);

    // Public routes stay open
    let (status, _) = fixture
        .send(fixture.client.get(fixture.url("/api/categories")))
        .await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let fixture = TestFixture::new().await;
    let token = fixture.register("Ada", "ada@example.com").await;

    let (status, _) = fixture.post("/api/auth/logout", &token, json!({})).await;
    assert_eq!(status, 200);

    let (status, body) = fixture.get("/api/auth/me", &token).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_change_password() {
    let fixture = TestFixture::new().await;
    let token = fixture.register("Ada", "ada@example.com").await;

    let (status, body) = fixture
        .put(
            "/api/auth/password",
            &token,
            json!({ "currentPassword": "wrong-one", "newPassword": "new-password" }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = fixture
        .put(
            "/api/auth/password",
            &token,
            json!({ "currentPassword": "password123", "newPassword": "new-password" }),
        )
        .await;
    assert_eq!(status, 200);

    // Current session survives, old password no longer works
    let (status, _) = fixture.get("/api/auth/me", &token).await;
    assert_eq!(status, 200);

    let (status, _) = fixture
        .send(fixture.client.post(fixture.url("/api/auth/login")).json(&json!({
            "email": "ada@example.com",
            "password": "password123"
        })))
        .await;
    assert_eq!(status, 401);

    let (status, _) = fixture
        .send(fixture.client.post(fixture.url("/api/auth/login")).json(&json!({
            "email": "ada@example.com",
            "password": "new-password"
        })))
        .await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_update_profile() {
    let fixture = TestFixture::new().await;
    let token = fixture.register("Ada", "ada@example.com").await;
    fixture.register("Bob", "bob@example.com").await;

    let (status, body) = fixture
        .put(
            "/api/auth/profile",
            &token,
            json!({ "name": "Ada Lovelace", "email": "ada.l@example.com" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["name"], "Ada Lovelace");
    assert_eq!(body["data"]["email"], "ada.l@example.com");

    let (status, body) = fixture
        .put(
            "/api/auth/profile",
            &token,
            json!({ "name": "Ada", "email": "bob@example.com" }),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

// ==================== VAULTS ====================

#[tokio::test]
async fn test_vault_crud() {
    let fixture = TestFixture::new().await;
    let token = fixture.register("Ada", "ada@example.com").await;

    let (status, body) = fixture
        .post(
            "/api/vaults",
            &token,
            json!({ "name": "Home", "description": "Household stuff" }),
        )
        .await;
    assert_eq!(status, 200);
    let vault = &body["data"];
    assert_eq!(vault["name"], "Home");
    assert_eq!(vault["role"], "OWNER");
    assert_eq!(vault["ownerEmail"], "ada@example.com");
    assert_eq!(vault["memberCount"], 1);
    assert_eq!(vault["itemCount"], 0);
    let id = vault["id"].as_str().unwrap().to_string();

    // Duplicate names per owner are rejected
    let (status, body) = fixture
        .post("/api/vaults", &token, json!({ "name": "Home" }))
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, body) = fixture
        .post("/api/vaults", &token, json!({ "name": "  " }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = fixture
        .put(
            &format!("/api/vaults/{}", id),
            &token,
            json!({ "name": "House" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["name"], "House");
    assert_eq!(body["data"]["description"], "Household stuff");

    let (status, body) = fixture.get(&format!("/api/vaults/{}", id), &token).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["members"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["stats"]["total"], 0);

    let (status, _) = fixture.delete(&format!("/api/vaults/{}", id), &token).await;
    assert_eq!(status, 200);

    let (status, body) = fixture.get(&format!("/api/vaults/{}", id), &token).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_vault_sharing_and_roles() {
    let fixture = TestFixture::new().await;
    let owner = fixture.register("Ada", "ada@example.com").await;
    let viewer = fixture.register("Bob", "bob@example.com").await;
    let outsider = fixture.register("Eve", "eve@example.com").await;
    let vault_id = fixture.create_vault(&owner, "Shared").await;

    // Outsiders cannot see the vault at all
    let (status, _) = fixture
        .get(&format!("/api/vaults/{}", vault_id), &outsider)
        .await;
    assert_eq!(status, 404);

    let (status, body) = fixture
        .post(
            &format!("/api/vaults/{}/members", vault_id),
            &owner,
            json!({ "email": "bob@example.com", "role": "VIEWER" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["role"], "VIEWER");
    let bob_id = body["data"]["userId"].as_str().unwrap().to_string();

    // Adding twice conflicts
    let (status, _) = fixture
        .post(
            &format!("/api/vaults/{}/members", vault_id),
            &owner,
            json!({ "email": "bob@example.com" }),
        )
        .await;
    assert_eq!(status, 409);

    let (status, body) = fixture.get("/api/vaults", &viewer).await;
    assert_eq!(status, 200);
    let vaults = body["data"].as_array().unwrap();
    assert_eq!(vaults.len(), 1);
    assert_eq!(vaults[0]["role"], "VIEWER");
    assert_eq!(vaults[0]["memberCount"], 2);

    // Viewers are read-only
    let (status, body) = fixture
        .post(
            "/api/items",
            &viewer,
            json!({ "vaultId": vault_id, "title": "TV", "purchaseDate": "2023-06-01" }),
        )
        .await;
    assert_eq!(status, 403);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, _) = fixture
        .put(
            &format!("/api/vaults/{}", vault_id),
            &viewer,
            json!({ "name": "Mine now" }),
        )
        .await;
    assert_eq!(status, 403);

    let (status, _) = fixture
        .delete(&format!("/api/vaults/{}", vault_id), &viewer)
        .await;
    assert_eq!(status, 403);

    let (status, _) = fixture
        .post(
            &format!("/api/vaults/{}/members", vault_id),
            &viewer,
            json!({ "email": "eve@example.com" }),
        )
        .await;
    assert_eq!(status, 403);

    // Owner revokes access
    let (status, _) = fixture
        .delete(
            &format!("/api/vaults/{}/members/{}", vault_id, bob_id),
            &owner,
        )
        .await;
    assert_eq!(status, 200);

    let (_, body) = fixture.get("/api/vaults", &viewer).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_editor_can_manage_items() {
    let fixture = TestFixture::new().await;
    let owner = fixture.register("Ada", "ada@example.com").await;
    let editor = fixture.register("Bob", "bob@example.com").await;
    let vault_id = fixture.create_vault(&owner, "Shared").await;

    let (status, _) = fixture
        .post(
            &format!("/api/vaults/{}/members", vault_id),
            &owner,
            json!({ "email": "bob@example.com", "role": "EDITOR" }),
        )
        .await;
    assert_eq!(status, 200);

    let item = fixture
        .create_item(
            &editor,
            json!({ "vaultId": vault_id, "title": "Kettle", "purchaseDate": "2023-06-01", "warrantyMonths": 24 }),
        )
        .await;
    let item_id = item["id"].as_str().unwrap();

    let (status, _) = fixture
        .delete(&format!("/api/items/{}", item_id), &editor)
        .await;
    assert_eq!(status, 200);

    // Editors still cannot delete the vault or add an owner
    let (status, _) = fixture
        .delete(&format!("/api/vaults/{}", vault_id), &editor)
        .await;
    assert_eq!(status, 403);

    let (status, body) = fixture
        .post(
            &format!("/api/vaults/{}/members", vault_id),
            &owner,
            json!({ "email": "bob@example.com", "role": "OWNER" }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

// ==================== ITEMS ====================

#[tokio::test]
async fn test_item_status_is_derived() {
    let fixture = TestFixture::new().await;
    let token = fixture.register("Ada", "ada@example.com").await;
    let vault_id = fixture.create_vault(&token, "Home").await;

    let soon = fixture
        .create_item(
            &token,
            json!({
                "vaultId": vault_id,
                "title": "Laptop",
                "purchaseDate": "2023-01-15",
                "warrantyMonths": 12,
                "price": 999.0
            }),
        )
        .await;
    assert_eq!(soon["expiryDate"], "2024-01-15");
    assert_eq!(soon["status"], "expiring-soon");
    assert_eq!(soon["daysUntilExpiry"], 5);
    assert_eq!(soon["isExpiringSoon"], true);
    assert_eq!(soon["isExpired"], false);
    assert_eq!(soon["vaultName"], "Home");
    assert_eq!(soon["state"], "ACTIVE");
    assert_eq!(soon["version"], 1);

    let expired = fixture
        .create_item(
            &token,
            json!({
                "vaultId": vault_id,
                "title": "Old phone",
                "purchaseDate": "2022-01-01",
                "warrantyMonths": 12
            }),
        )
        .await;
    assert_eq!(expired["status"], "expired");
    assert_eq!(expired["isExpired"], true);

    let unknown = fixture
        .create_item(
            &token,
            json!({ "vaultId": vault_id, "title": "Chair", "purchaseDate": "2023-01-15" }),
        )
        .await;
    assert_eq!(unknown["status"], "unknown");
    assert!(unknown["expiryDate"].is_null());
    assert!(unknown["daysUntilExpiry"].is_null());

    let active = fixture
        .create_item(
            &token,
            json!({
                "vaultId": vault_id,
                "title": "Fridge",
                "purchaseDate": "2023-06-30",
                "warrantyMonths": 24
            }),
        )
        .await;
    assert_eq!(active["status"], "active");

    let (status, body) = fixture.get("/api/items?status=expired", &token).await;
    assert_eq!(status, 200);
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Old phone");

    let (status, body) = fixture.get("/api/items?status=bogus", &token).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = fixture.get("/api/items/expiring?days=10", &token).await;
    assert_eq!(status, 200);
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Laptop");

    // Default lookahead is the configured window
    let (_, body) = fixture.get("/api/items/expiring", &token).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = fixture.get("/api/items/expiring?days=1000", &token).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_item_search_and_filters() {
    let fixture = TestFixture::new().await;
    let token = fixture.register("Ada", "ada@example.com").await;
    let home = fixture.create_vault(&token, "Home").await;
    let office = fixture.create_vault(&token, "Office").await;
    let electronics = fixture.category_id("Electronics").await;

    fixture
        .create_item(
            &token,
            json!({
                "vaultId": home,
                "title": "MacBook Pro",
                "brand": "Apple",
                "categoryId": electronics,
                "purchaseDate": "2023-05-01",
                "warrantyMonths": 12
            }),
        )
        .await;
    fixture
        .create_item(
            &token,
            json!({ "vaultId": office, "title": "Desk", "brand": "IKEA", "purchaseDate": "2023-05-01" }),
        )
        .await;

    let (_, body) = fixture.get("/api/items?search=apple", &token).await;
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "MacBook Pro");
    assert_eq!(items[0]["categoryName"], "Electronics");

    let (_, body) = fixture
        .get(&format!("/api/items?vaultId={}", office), &token)
        .await;
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Desk");

    let (_, body) = fixture
        .get(&format!("/api/items?categoryId={}", electronics), &token)
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = fixture.get("/api/items?search=nothing-matches", &token).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_item_update_with_version_check() {
    let fixture = TestFixture::new().await;
    let token = fixture.register("Ada", "ada@example.com").await;
    let vault_id = fixture.create_vault(&token, "Home").await;
    let item = fixture
        .create_item(
            &token,
            json!({ "vaultId": vault_id, "title": "TV", "purchaseDate": "2023-01-15" }),
        )
        .await;
    let path = format!("/api/items/{}", item["id"].as_str().unwrap());

    let (status, body) = fixture
        .put(
            &path,
            &token,
            json!({ "warrantyMonths": 12, "state": "CLAIMED", "expectedVersion": 1 }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["version"], 2);
    assert_eq!(body["data"]["title"], "TV");
    assert_eq!(body["data"]["state"], "CLAIMED");
    // Lifecycle state does not affect the derived status
    assert_eq!(body["data"]["status"], "expiring-soon");

    let (status, body) = fixture
        .put(&path, &token, json!({ "title": "Stale", "expectedVersion": 1 }))
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "VERSION_MISMATCH");
    assert_eq!(body["error"]["details"]["currentVersion"], 2);

    let (status, body) = fixture.get(&path, &token).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["title"], "TV");
}

#[tokio::test]
async fn test_item_validation() {
    let fixture = TestFixture::new().await;
    let token = fixture.register("Ada", "ada@example.com").await;
    let vault_id = fixture.create_vault(&token, "Home").await;

    let cases = [
        json!({ "vaultId": vault_id, "title": "", "purchaseDate": "2023-01-15" }),
        json!({ "vaultId": vault_id, "title": "x".repeat(201), "purchaseDate": "2023-01-15" }),
        json!({ "vaultId": vault_id, "title": "TV", "purchaseDate": "2023-01-15", "price": -5 }),
        json!({ "vaultId": vault_id, "title": "TV", "purchaseDate": "2023-01-15", "warrantyMonths": -1 }),
        json!({ "vaultId": vault_id, "title": "TV", "purchaseDate": "2023-01-15", "categoryId": "missing" }),
    ];
    for case in cases {
        let (status, body) = fixture.post("/api/items", &token, case.clone()).await;
        assert_eq!(status, 400, "expected rejection for {}", case);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    // Malformed dates never reach the handler
    let (status, body) = fixture
        .post(
            "/api/items",
            &token,
            json!({ "vaultId": vault_id, "title": "TV", "purchaseDate": "15/01/2023" }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, _) = fixture
        .post(
            "/api/items",
            &token,
            json!({ "vaultId": "no-such-vault", "title": "TV", "purchaseDate": "2023-01-15" }),
        )
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_attachments() {
    let fixture = TestFixture::new().await;
    let token = fixture.register("Ada", "ada@example.com").await;
    let vault_id = fixture.create_vault(&token, "Home").await;
    let item = fixture
        .create_item(
            &token,
            json!({ "vaultId": vault_id, "title": "TV", "purchaseDate": "2023-01-15" }),
        )
        .await;
    let item_id = item["id"].as_str().unwrap();

    let (status, body) = fixture
        .post(
            &format!("/api/items/{}/attachments", item_id),
            &token,
            json!({
                "fileUrl": "https://files.example.com/receipt.pdf",
                "fileName": "receipt.pdf",
                "fileSize": 2048,
                "type": "RECEIPT"
            }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["type"], "RECEIPT");
    let attachment_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = fixture.get(&format!("/api/items/{}", item_id), &token).await;
    assert_eq!(body["data"]["attachments"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["version"], 2);

    let (_, body) = fixture.get("/api/items", &token).await;
    assert_eq!(body["data"][0]["attachments"].as_array().unwrap().len(), 1);

    let (status, body) = fixture
        .post(
            &format!("/api/items/{}/attachments", item_id),
            &token,
            json!({ "fileUrl": "", "fileName": "x.pdf" }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = fixture
        .delete(
            &format!("/api/items/{}/attachments/{}", item_id, attachment_id),
            &token,
        )
        .await;
    assert_eq!(status, 200);

    let (status, _) = fixture
        .delete(
            &format!("/api/items/{}/attachments/{}", item_id, attachment_id),
            &token,
        )
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_deleting_vault_removes_items() {
    let fixture = TestFixture::new().await;
    let token = fixture.register("Ada", "ada@example.com").await;
    let vault_id = fixture.create_vault(&token, "Home").await;
    let item = fixture
        .create_item(
            &token,
            json!({ "vaultId": vault_id, "title": "TV", "purchaseDate": "2023-01-15" }),
        )
        .await;

    let (status, _) = fixture
        .delete(&format!("/api/vaults/{}", vault_id), &token)
        .await;
    assert_eq!(status, 200);

    let (status, _) = fixture
        .get(&format!("/api/items/{}", item["id"].as_str().unwrap()), &token)
        .await;
    assert_eq!(status, 404);
}

// ==================== CATEGORIES, STATS & DASHBOARD ====================

#[tokio::test]
async fn test_categories() {
    let fixture = TestFixture::new().await;
    let token = fixture.register("Ada", "ada@example.com").await;

    let (status, body) = fixture
        .send(fixture.client.get(fixture.url("/api/categories")))
        .await;
    assert_eq!(status, 200);
    let categories = body["data"].as_array().unwrap();
    assert_eq!(categories.len(), 8);
    let insurance = categories.iter().find(|c| c["name"] == "Insurance").unwrap();
    assert_eq!(insurance["reminderDaysDefault"], 90);

    let (_, body) = fixture.get("/api/categories/with-items", &token).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let vault_id = fixture.create_vault(&token, "Home").await;
    let appliances = fixture.category_id("Appliances").await;
    fixture
        .create_item(
            &token,
            json!({
                "vaultId": vault_id,
                "title": "Dishwasher",
                "categoryId": appliances,
                "purchaseDate": "2023-01-15"
            }),
        )
        .await;

    let (_, body) = fixture.get("/api/categories/with-items", &token).await;
    let used = body["data"].as_array().unwrap();
    assert_eq!(used.len(), 1);
    assert_eq!(used[0]["name"], "Appliances");
}

#[tokio::test]
async fn test_stats_and_vault_counters() {
    let fixture = TestFixture::new().await;
    let token = fixture.register("Ada", "ada@example.com").await;
    let home = fixture.create_vault(&token, "Home").await;
    let office = fixture.create_vault(&token, "Office").await;
    let electronics = fixture.category_id("Electronics").await;

    for item in [
        json!({ "vaultId": home, "title": "Laptop", "categoryId": electronics,
                "purchaseDate": "2023-01-15", "warrantyMonths": 12, "price": 1000.0 }),
        json!({ "vaultId": home, "title": "Phone", "categoryId": electronics,
                "purchaseDate": "2022-01-01", "warrantyMonths": 12, "price": 500.0 }),
        json!({ "vaultId": office, "title": "Chair", "purchaseDate": "2023-01-15" }),
    ] {
        fixture.create_item(&token, item).await;
    }

    let (status, body) = fixture.get("/api/stats", &token).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["groupBy"], "all");
    assert_eq!(body["data"]["windowDays"], 30);
    let all = &body["data"]["groups"]["all"];
    assert_eq!(all["total"], 3);
    assert_eq!(all["expiringSoon"], 1);
    assert_eq!(all["expired"], 1);
    assert_eq!(all["unknown"], 1);
    assert_eq!(all["meanPrice"], 750.0);

    let (_, body) = fixture.get("/api/stats?groupBy=category", &token).await;
    let groups = &body["data"]["groups"];
    assert_eq!(groups[&electronics]["total"], 2);
    assert_eq!(groups["uncategorized"]["total"], 1);
    assert!(groups["uncategorized"]["meanPrice"].is_null());

    let (_, body) = fixture.get("/api/stats?groupBy=vault", &token).await;
    assert_eq!(body["data"]["groups"][&home]["total"], 2);
    assert_eq!(body["data"]["groups"][&office]["total"], 1);

    let (status, body) = fixture.get("/api/stats?groupBy=brand", &token).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (_, body) = fixture.get("/api/vaults", &token).await;
    let vaults = body["data"].as_array().unwrap();
    let home_summary = vaults.iter().find(|v| v["id"] == home.as_str()).unwrap();
    assert_eq!(home_summary["itemCount"], 2);
    assert_eq!(home_summary["expiringSoonCount"], 1);
    assert_eq!(home_summary["expiredCount"], 1);
    let office_summary = vaults.iter().find(|v| v["id"] == office.as_str()).unwrap();
    assert_eq!(office_summary["itemCount"], 1);
    assert_eq!(office_summary["expiredCount"], 0);
}

#[tokio::test]
async fn test_dashboard() {
    let fixture = TestFixture::new().await;
    let token = fixture.register("Ada", "ada@example.com").await;

    let (status, body) = fixture.get("/api/dashboard", &token).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["totalVaults"], 0);
    assert_eq!(body["data"]["totalItems"], 0);
    assert_eq!(body["data"]["summary"]["total"], 0);
    assert!(body["data"]["recentItems"].as_array().unwrap().is_empty());

    let vault_id = fixture.create_vault(&token, "Home").await;
    for i in 0..6 {
        fixture
            .create_item(
                &token,
                json!({ "vaultId": vault_id, "title": format!("Item {}", i), "purchaseDate": "2023-06-01" }),
            )
            .await;
    }

    let (_, body) = fixture.get("/api/dashboard", &token).await;
    assert_eq!(body["data"]["totalVaults"], 1);
    assert_eq!(body["data"]["totalItems"], 6);
    assert_eq!(body["data"]["summary"]["unknown"], 6);
    let recent = body["data"]["recentItems"].as_array().unwrap();
    assert_eq!(recent.len(), 5);
    assert_eq!(recent[0]["title"], "Item 5");
}

#[tokio::test]
async fn test_revision_increments_on_write() {
    let fixture = TestFixture::new().await;
    let token = fixture.register("Ada", "ada@example.com").await;

    let (status, body) = fixture.get("/api/revision", &token).await;
    assert_eq!(status, 200);
    let initial = body["data"]["revisionId"].as_i64().unwrap();
    assert_eq!(body["revisionId"], initial);

    let (_, body) = fixture
        .post("/api/vaults", &token, json!({ "name": "Home" }))
        .await;
    assert!(body["revisionId"].as_i64().unwrap() > initial);

    // Reads do not change the revision
    let (_, first) = fixture.get("/api/revision", &token).await;
    let (_, second) = fixture.get("/api/vaults", &token).await;
    assert_eq!(first["data"]["revisionId"], second["revisionId"]);
}
