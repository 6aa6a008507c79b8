use std::time::Duration;

use emcsign_core::{Body, ErrorLayer, Pipeline, RetryConfig, RetryLayer};
use emcsign_http_send_reqwest::ReqwestHttpSend;
use reqwest::blocking::Client;

fn main() -> emcsign_core::Result<()> {
    env_logger::init();

    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(10)
        .user_agent("emcsign-example/1.0")
        .build()
        .map_err(|e| emcsign_core::Error::config_invalid("invalid client").with_source(e))?;

    let pipeline = Pipeline::new(ReqwestHttpSend::new(client))
        .layer(RetryLayer::new(
            RetryConfig::default().with_delay(Duration::from_millis(200)),
        ))
        .layer(ErrorLayer::default());

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://127.0.0.1:9022/rest/service".to_string());
    println!("GET {url}");

    let req = http::Request::get(&url)
        .header("X-Test-Header", "emcsign-example")
        .body(Body::Empty)?;

    match pipeline.send(req) {
        Ok(resp) => {
            println!("Response status: {}", resp.status());
            for (name, value) in resp.headers() {
                println!("  {name}: {value:?}");
            }
            let body = resp.into_body().collect()?;
            println!("\n{}", String::from_utf8_lossy(&body));
        }
        Err(err) => {
            println!("Request failed ({}): {err}", err.kind());
            if let Some(vendor) = err.vendor() {
                println!("  vendor: {vendor}");
            }
        }
    }

    Ok(())
}
