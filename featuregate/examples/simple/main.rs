use featuregate::{Client, ClientConfig, FPUser};

pub fn main() -> featuregate::Result<()> {
    // Configure env_logger to see FeatureGate SDK logs.
    env_logger::Builder::from_env(env_logger::Env::new().default_filter_or("featuregate")).init();

    let remote_url = std::env::var("FEATUREGATE_REMOTE_URL")
        .unwrap_or_else(|_| "https://featuregate.example.com/".to_owned());
    let server_sdk_key = std::env::var("FEATUREGATE_SERVER_SDK_KEY")
        .expect("FEATUREGATE_SERVER_SDK_KEY env variable should contain the server SDK key");

    // Block (bounded by the refresh interval) waiting for the first snapshot. Until a snapshot
    // arrives, the client serves the caller-supplied defaults.
    let client = Client::new(ClientConfig::new(remote_url, server_sdk_key))?;

    let user = FPUser::new().with("city", "paris");

    let checkout = client.bool_detail("new_checkout", &user, false);
    println!("new_checkout: {} ({})", checkout.value, checkout.reason);

    client.close();

    Ok(())
}
