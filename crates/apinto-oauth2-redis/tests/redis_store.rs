//! Integration tests for the Redis token store.
//!
//! Tests use testcontainers to spin up a real Redis instance.

use std::sync::Arc;
use std::time::Duration;

use apinto_oauth2::{
    CacheRegistry, Client, GrantProcessor, KeyNamespace, OAuth2Error, SystemClock, TokenRequest,
    TokenStore, TokenValidator,
};
use apinto_oauth2_redis::{RedisStoreConfig, RedisTokenStore};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

// Shared Redis container for all tests
static SHARED_REDIS: OnceCell<(ContainerAsync<Redis>, String)> = OnceCell::const_new();

async fn get_redis_url() -> String {
    let (_, url) = SHARED_REDIS
        .get_or_init(|| async {
            let container = Redis::default()
                .start()
                .await
                .expect("start redis container");

            let host_port = container.get_host_port_ipv4(6379).await.expect("get port");
            let url = format!("redis://127.0.0.1:{}", host_port);

            (container, url)
        })
        .await;

    url.clone()
}

async fn store() -> RedisTokenStore {
    RedisTokenStore::connect(&RedisStoreConfig {
        url: get_redis_url().await,
        pool_size: 4,
        timeout_ms: 5000,
    })
    .await
    .expect("connect to redis")
}

async fn key_ttl(store: &RedisTokenStore, key: &str) -> i64 {
    let mut conn = store.pool().get().await.unwrap();
    redis::cmd("TTL").arg(key).query_async(&mut conn).await.unwrap()
}

#[tokio::test]
async fn test_fields_round_trip_in_order() {
    let store = store().await;
    let key = "apinto:oauth2_access_tokens:it-order:tok";

    store
        .set_fields(
            key,
            &[("a", "1".to_string()), ("b", "2".to_string())],
            Some(Duration::from_secs(60)),
        )
        .await
        .unwrap();

    let values = store.get_fields(key, &["b", "missing", "a"]).await.unwrap();
    assert_eq!(values, vec!["2".to_string(), String::new(), "1".to_string()]);

    let absent = store.get_fields("no-such-key", &["a"]).await.unwrap();
    assert_eq!(absent, vec![String::new()]);
}

#[tokio::test]
async fn test_patch_without_ttl_keeps_expiry() {
    let store = store().await;
    let key = "apinto:oauth2_refresh_tokens:it-ttl:rt";

    store
        .set_fields(key, &[("access_token", "old".to_string())], Some(Duration::from_secs(600)))
        .await
        .unwrap();
    store
        .set_fields(key, &[("access_token", "new".to_string())], None)
        .await
        .unwrap();

    let ttl = key_ttl(&store, key).await;
    assert!(ttl > 500 && ttl <= 600, "ttl was {ttl}");
    assert_eq!(store.get_fields(key, &["access_token"]).await.unwrap(), vec!["new"]);
}

#[tokio::test]
async fn test_delete_and_scan() {
    let store = store().await;
    let namespace = KeyNamespace::new("it-scan");
    for token in ["t1", "t2", "t3"] {
        store
            .set_fields(&namespace.access_key(token), &[("access_token", token.to_string())], None)
            .await
            .unwrap();
    }
    store
        .set_fields(&namespace.refresh_key("r1"), &[("refresh_token", "r1".to_string())], None)
        .await
        .unwrap();

    store.delete(&namespace.access_key("t2")).await.unwrap();
    store.delete(&namespace.access_key("never-existed")).await.unwrap();

    let keys = store
        .scan_keys(&namespace.pattern(apinto_oauth2::KeyCategory::AccessTokens))
        .await
        .unwrap();
    assert_eq!(keys, vec![namespace.access_key("t1"), namespace.access_key("t3")]);
}

#[tokio::test]
async fn test_grant_flow_against_redis() {
    let store = Arc::new(store().await);
    let namespace = KeyNamespace::new("it-grant");
    let caches = CacheRegistry::single("redis", store.clone());
    let clock = Arc::new(SystemClock);
    let processor = GrantProcessor::new(caches.clone(), namespace.clone(), clock.clone());
    let validator = TokenValidator::new(caches, namespace.clone(), clock);

    let mut client = Client::new("abc", "s3cret");
    client.enable_authorization_code = true;

    store
        .set_fields(
            &namespace.code_key("c0de"),
            &[("code", "c0de".to_string()), ("scope", "read".to_string())],
            Some(Duration::from_secs(60)),
        )
        .await
        .unwrap();

    let request = TokenRequest {
        grant_type: "authorization_code".to_string(),
        client_id: "abc".to_string(),
        client_secret: "s3cret".to_string(),
        code: "c0de".to_string(),
        ..TokenRequest::default()
    };
    let issued = processor.process(&client, &request).await.unwrap().token;
    assert_eq!(validator.validate(&issued.access_token).await.unwrap(), "abc");

    let replay = processor.process(&client, &request).await.unwrap_err();
    assert!(matches!(replay, OAuth2Error::NotFound { .. }));

    let refresh = TokenRequest {
        grant_type: "refresh_token".to_string(),
        client_id: "abc".to_string(),
        client_secret: "s3cret".to_string(),
        refresh_token: issued.refresh_token.clone(),
        ..TokenRequest::default()
    };
    let rotated = processor.process(&client, &refresh).await.unwrap().token;
    assert_eq!(rotated.scope, "read");
    assert_ne!(rotated.refresh_token, issued.refresh_token);
    assert!(validator.validate(&issued.access_token).await.is_err());
    assert_eq!(validator.validate(&rotated.access_token).await.unwrap(), "abc");
}
