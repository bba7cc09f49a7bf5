use futures_lite::future;
use http_adapter::net::{AsyncHttpTransport, BlockingHttpTransport};
use http_adapter::{Adapter, AdapterConfig, RequestSpec};

fn main() {
    // init logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://example.com/".to_owned());
    let request = RequestSpec::builder("GET", url)
        .header("Accept", "text/html,application/json")
        .build()
        .expect("invalid request");
    let config = AdapterConfig::new().header("User-Agent", "http_adapter-demo/1.0");

    // Blocking mode: the calling thread waits for the response
    let blocking = Adapter::with_config(BlockingHttpTransport::new(), config.clone()).expect("invalid config");
    match blocking.send(&request) {
        Ok(response) => log::info!(
            "blocking: {} {} ({} bytes)",
            response.status_code(),
            response.url(),
            response.bytes().len()
        ),
        Err(err) => log::error!("blocking: {err} [{}]", err.kind()),
    }

    // Cooperative mode: the same request from inside an async task
    let cooperative = Adapter::with_config(AsyncHttpTransport::new(), config).expect("invalid config");
    future::block_on(async {
        match cooperative.send_async(&request).await {
            Ok(response) => {
                log::info!("cooperative: {}", response.status_code());
                if let Err(err) = response.raise_for_status() {
                    log::warn!("{err}");
                }
            }
            Err(err) => log::error!("cooperative: {err} [{}]", err.kind()),
        }
    });

    cooperative.transport().close();
}
