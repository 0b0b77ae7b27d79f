use std::sync::Arc;

use billflow_api::app::services::AppServices;
use billflow_infra::InMemoryDocumentStore;
use reqwest::StatusCode;
use serde_json::{Value, json};

const ADMIN_PASSWORD: &str = "test-secret";

struct TestServer {
    base_url: String,
    documents: Arc<InMemoryDocumentStore>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Build app (same router as prod) over an in-memory backend, bound to an
        // ephemeral port.
        let documents = Arc::new(InMemoryDocumentStore::new());
        let services = AppServices::connect(documents.clone(), "users", "billings")
            .await
            .expect("failed to build services");
        let app = billflow_api::app::build_app(Arc::new(services), ADMIN_PASSWORD);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            documents,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn create_user(&self, handle: &str) -> Value {
        let res = self
            .client
            .post(self.url("/user"))
            .json(&json!({ "telegram_username": handle }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        res.json().await.unwrap()
    }

    async fn create_billing(&self, user_id: &str) -> Value {
        let res = self
            .client
            .post(self.url("/billing"))
            .json(&json!({ "user_id": user_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        res.json().await.unwrap()
    }

    fn admin(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .basic_auth("ops", Some(ADMIN_PASSWORD))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn message(res: reqwest::Response) -> String {
    let body: Value = res.json().await.unwrap();
    body["message"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn ping_answers_ok() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/ping")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn user_registration_and_lookup() {
    let srv = TestServer::spawn().await;
    let created = srv.create_user("alice").await;
    assert_eq!(created["telegram_username"], "alice");

    let res = srv
        .client
        .get(srv.url("/user?telegram_username=alice"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let found: Value = res.json().await.unwrap();
    assert_eq!(found, created);

    // duplicate handle
    let res = srv
        .client
        .post(srv.url("/user"))
        .json(&json!({ "telegram_username": "alice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(message(res).await, "user is existing");

    // unknown handle
    let res = srv
        .client
        .get(srv.url("/user?telegram_username=bob"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(message(res).await, "user not found");
}

#[tokio::test]
async fn user_request_validation_messages() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/user")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(message(res).await, "telegram_username in query param not found");

    let res = srv
        .client
        .post(srv.url("/user"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(message(res).await, "telegram_username cannot be empty");

    let res = srv
        .client
        .post(srv.url("/user"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(message(res).await.starts_with("wrong structure body: "));
}

#[tokio::test]
async fn billing_lifecycle_through_public_and_admin_endpoints() {
    let srv = TestServer::spawn().await;
    let user = srv.create_user("alice").await;
    let user_id = user["id"].as_str().unwrap();

    let billing = srv.create_billing(user_id).await;
    assert_eq!(billing["state"], "pending");
    assert_eq!(billing["username"], "");
    assert_eq!(billing["user_id"], user_id);
    let id = billing["id"].as_str().unwrap().to_string();

    // brief info moves pending -> design
    let res = srv
        .client
        .patch(srv.url(&format!("/billing/{id}")))
        .json(&json!({ "username": "alice_design" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["state"], "design");
    assert_eq!(updated["username"], "alice_design");

    // a second submission is rejected
    let res = srv
        .client
        .patch(srv.url(&format!("/billing/{id}")))
        .json(&json!({ "username": "again" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(message(res).await, "brief info already existing");

    // admin walks it to completed and back
    for expected in ["layout", "completed"] {
        let res = srv
            .admin(reqwest::Method::PATCH, &format!("/admin/billing/state/next/{id}"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["state"], expected);
    }
    let res = srv
        .admin(reqwest::Method::PATCH, &format!("/admin/billing/state/next/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        message(res).await,
        "impossible to next the state from completed state"
    );

    let res = srv
        .admin(reqwest::Method::PATCH, &format!("/admin/billing/state/prev/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["state"], "layout");

    // owner listing reflects the current state
    let res = srv
        .client
        .get(srv.url(&format!("/billing?user_id={user_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let listed: Vec<Value> = res.json().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["state"], "layout");
}

#[tokio::test]
async fn brief_info_checks_run_before_the_body_is_read() {
    let srv = TestServer::spawn().await;

    // unknown billing wins over a malformed body
    let res = srv
        .client
        .patch(srv.url("/billing/0190f1a2-7c1e-7d4b-8a3e-1b2c3d4e5f60"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(message(res).await, "billing not found");

    let user = srv.create_user("alice").await;
    let billing = srv.create_billing(user["id"].as_str().unwrap()).await;
    let path = format!("/billing/{}", billing["id"].as_str().unwrap());
    let res = srv
        .client
        .patch(srv.url(&path))
        .json(&json!({ "username": "alice_design" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // existing brief info wins over an empty username
    let res = srv
        .client
        .patch(srv.url(&path))
        .json(&json!({ "username": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(message(res).await, "brief info already existing");
}

#[tokio::test]
async fn billing_request_validation_messages() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/billing")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(message(res).await, "user_id in query param not found");

    let res = srv
        .client
        .post(srv.url("/billing"))
        .json(&json!({ "user_id": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(message(res).await, "user_id cannot be empty");

    let unknown = "0190f1a2-7c1e-7d4b-8a3e-1b2c3d4e5f60";
    let res = srv
        .client
        .post(srv.url("/billing"))
        .json(&json!({ "user_id": unknown }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(message(res).await, "user not found");

    let res = srv
        .client
        .get(srv.url("/billing?user_id=not-a-uuid"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(message(res).await, "not-a-uuid is invalid user id");

    let res = srv
        .client
        .patch(srv.url(&format!("/billing/{unknown}")))
        .json(&json!({ "username": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(message(res).await, "billing not found");

    let user = srv.create_user("alice").await;
    let billing = srv.create_billing(user["id"].as_str().unwrap()).await;
    let res = srv
        .client
        .patch(srv.url(&format!("/billing/{}", billing["id"].as_str().unwrap())))
        .json(&json!({ "username": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(message(res).await, "username cannot be empty");
}

#[tokio::test]
async fn admin_endpoints_require_the_configured_password() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/admin/users")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        res.headers()["www-authenticate"],
        r#"Basic realm="Restricted""#
    );
    assert_eq!(message(res).await, "you are unauthorized");

    let res = srv
        .client
        .get(srv.url("/admin/billings"))
        .basic_auth("ops", Some("wrong"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // any username is accepted with the right password
    let res = srv
        .client
        .get(srv.url("/admin/users"))
        .basic_auth("anyone", Some(ADMIN_PASSWORD))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_listing_and_deletion() {
    let srv = TestServer::spawn().await;
    let alice = srv.create_user("alice").await;
    srv.create_user("bob").await;
    let billing = srv.create_billing(alice["id"].as_str().unwrap()).await;
    let billing_id = billing["id"].as_str().unwrap();

    let users: Vec<Value> = srv
        .admin(reqwest::Method::GET, "/admin/users")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(users.len(), 2);

    let res = srv
        .admin(reqwest::Method::DELETE, &format!("/admin/billing/{billing_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let billings: Vec<Value> = srv
        .admin(reqwest::Method::GET, "/admin/billings")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(billings.is_empty());

    let res = srv
        .admin(reqwest::Method::DELETE, &format!("/admin/billing/{billing_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(message(res).await, "billing not found");

    let res = srv
        .admin(
            reqwest::Method::DELETE,
            &format!("/admin/user/{}", alice["id"].as_str().unwrap()),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .client
        .get(srv.url("/user?telegram_username=alice"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn storage_outage_is_an_opaque_internal_error() {
    let srv = TestServer::spawn().await;
    srv.documents.set_offline(true);

    let res = srv
        .client
        .post(srv.url("/user"))
        .json(&json!({ "telegram_username": "alice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(message(res).await, "internal server error");

    // the failed write never reached the cache
    srv.documents.set_offline(false);
    let res = srv
        .client
        .get(srv.url("/user?telegram_username=alice"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
