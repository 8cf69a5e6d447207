use steady_http::{ApiRequest, CallContext, ClientConfig, ServiceClient};
use tokio::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("steady_http=debug")),
        )
        .init();

    let config = ClientConfig::from_env()?;
    let api = ServiceClient::new(config)?;

    let path = std::env::args().nth(1).unwrap_or_default();
    let ctx = CallContext::new().with_timeout(Duration::from_secs(20));

    match api.send_with(ApiRequest::get(path), &ctx).await {
        Ok(response) => {
            println!("{}", response.status);
            println!("{}", String::from_utf8_lossy(&response.body));
        }
        Err(err) => eprintln!("request failed ({:?}): {err}", err.kind()),
    }

    api.close();
    Ok(())
}
