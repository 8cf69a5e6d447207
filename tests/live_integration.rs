use steady_http::{ApiRequest, CallContext, ClientConfig, ServiceClient};
use tokio::time::Duration;

fn load_live_config() -> Result<ClientConfig, String> {
    let config = ClientConfig::from_env().map_err(|err| err.to_string())?;
    if !config.enabled {
        return Err("SERVICE_ENABLED is not set".to_owned());
    }
    Ok(config)
}

#[tokio::test]
async fn live_roundtrip_against_configured_service() {
    let config = match load_live_config() {
        Ok(config) => config,
        Err(reason) => {
            eprintln!("skipping live test: {reason}");
            return;
        }
    };

    let path = std::env::var("SERVICE_LIVE_PATH").unwrap_or_default();
    let api = ServiceClient::new(config).expect("client must build from env config");

    let ctx = CallContext::new().with_timeout(Duration::from_secs(30));
    let response = api
        .send_with(ApiRequest::get(path), &ctx)
        .await
        .expect("live request must complete");
    eprintln!("live service answered {}", response.status);

    api.close();
    assert!(api.is_closed());
    assert_eq!(api.available_slots(), api.options().retry.max_concurrent_requests);
}
