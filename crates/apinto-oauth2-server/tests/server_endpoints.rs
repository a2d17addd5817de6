use std::sync::Arc;

use apinto_oauth2::{CacheRegistry, Client, MemoryTokenStore, SystemClock};
use apinto_oauth2_server::{AppConfig, AppState, build_app};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

fn test_config() -> AppConfig {
    let mut client = Client::new("abc", "s3cret");
    client.enable_client_credentials = true;

    let mut cfg = AppConfig::default();
    cfg.namespace.cluster_id = "it".into();
    cfg.clients = vec![client];
    cfg
}

async fn start_server() -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    let cfg = test_config();
    let caches = CacheRegistry::single("local", Arc::new(MemoryTokenStore::new()));
    let state = AppState::new(&cfg, caches, Arc::new(SystemClock));
    let app = build_app(state, cfg.server.body_limit_bytes);

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    (format!("http://{addr}"), tx, server)
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

#[tokio::test]
async fn client_credentials_issue_and_validate() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = reqwest::Client::new();

    // GET /healthz
    let resp = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    // POST /oauth2/token (form)
    let resp = client
        .post(format!("{base}/oauth2/token?client_id=abc"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("grant_type=client_credentials&client_secret=s3cret")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["cache-control"], "no-store");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["expires_in"], 7200);
    assert!(body.get("refresh_token").is_none());
    let access = body["access_token"].as_str().unwrap().to_string();
    assert_eq!(access.len(), 64);
    assert!(access.chars().all(|c| c.is_ascii_hexdigit()));

    // GET /oauth2/validate with the issued token
    let resp = client
        .get(format!("{base}/oauth2/validate"))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["client_id"], "abc");

    // Unknown token
    let resp = client
        .get(format!("{base}/oauth2/validate"))
        .bearer_auth("nope")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert!(resp.headers().contains_key("www-authenticate"));

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn token_endpoint_rejects_with_plain_text() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = reqwest::Client::new();

    // JSON body, wrong secret
    let resp = client
        .post(format!("{base}/oauth2/token"))
        .json(&json!({
            "client_id": "abc",
            "grant_type": "client_credentials",
            "client_secret": "wrong"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"));
    let text = resp.text().await.unwrap();
    assert!(text.contains("fail to match secret"));
    assert!(!text.contains("wrong"));

    // Grant type not enabled for the client
    let resp = client
        .post(format!("{base}/oauth2/token"))
        .form(&[
            ("client_id", "abc"),
            ("grant_type", "authorization_code"),
            ("client_secret", "s3cret"),
            ("code", "x"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    assert!(resp.text().await.unwrap().contains("unsupported grant type"));

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn admin_import_skips_expired_and_lists() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = reqwest::Client::new();
    let now = now_millis();

    let payload = json!({
        "total": 2,
        "data": [
            {
                "credential": {"id": "abc"},
                "access_token": "old-token",
                "created_at": now - 20_000,
                "expires_in": 10,
                "token_type": "bearer",
                "client_id": "abc"
            },
            {
                "authenticated_userid": 42,
                "credential": {"id": "abc"},
                "access_token": "live-token",
                "service": "svc",
                "created_at": now - 1000,
                "refresh_token": "",
                "scope": "read",
                "ttl": 3600,
                "token_type": "bearer",
                "expires_in": 3600,
                "client_id": "abc"
            }
        ]
    });

    let resp = client
        .post(format!("{base}/oauth_tokens/"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"code": 0}));

    let resp = client.get(format!("{base}/oauth_tokens/")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["access_token"], "live-token");
    assert_eq!(body["data"][0]["expires_in"], 3600);
    assert_eq!(body["data"][0]["credential"]["id"], "abc");

    // Imported tokens validate like issued ones
    let resp = client
        .get(format!("{base}/oauth2/validate?access_token=live-token"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Malformed payload is reported in-body
    let resp = client
        .post(format!("{base}/oauth_tokens/"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], -1);
    assert!(body["err"].as_str().is_some());

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}
