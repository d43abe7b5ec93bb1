use std::sync::Arc;

use gosub_kv_cookies::kv::RedisKv;
use gosub_kv_cookies::{Cookie, CookieStore, KvCookieStore, StoreConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Point REDIS_URL at a scratch instance; this demo clears its own namespace.
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
    let client = Arc::new(RedisKv::connect(&url).await?);

    let config = StoreConfig::builder().store_id("demo").build()?;
    let store = KvCookieStore::with_config(client, config);

    for i in 0..5 {
        let cookie = Cookie::new(format!("test-key-{i}"), format!("test-value-{i}"), "example.com", "/")
            .with_http_only(true);
        store.put_cookie(&cookie).await?;
    }

    let found = store.find_cookies("www.example.com", "/account", true).await?;
    println!("found {} cookies (complete: {})", found.cookies.len(), found.is_complete());
    for cookie in &found.cookies {
        println!("  {}={} [{}{}]", cookie.name, cookie.value, cookie.domain, cookie.path);
    }

    let status = store.remove_all_cookies().await?;
    println!("cleared namespace: {status:?}");
    println!("remaining: {}", store.get_all_cookies().await?.cookies.len());

    Ok(())
}
