use std::sync::Arc;

use guichet::Guichet;
use guichet_provider_rest::{RestIdentityProvider, RestProviderConfig};
use guichet_storage_rest::{RestAttemptLogStore, RestStoreConfig};
use url::Url;

/// This example demonstrates wiring Guichet against a hosted backend:
/// - Sign in with email and password
/// - Print the resulting session cookie
/// - Run the auth-log analyzer over the recent attempt log
///
/// Configuration comes from the environment:
/// - GUICHET_BASE_URL: base URL of the hosted backend
/// - GUICHET_ANON_KEY: public API key
/// - GUICHET_SERVICE_KEY: optional service-level key for the elevated
///   attempt-log fallback
/// - GUICHET_EMAIL / GUICHET_PASSWORD: credentials to sign in with
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let base_url = Url::parse(&std::env::var("GUICHET_BASE_URL")?)?;
    let anon_key = std::env::var("GUICHET_ANON_KEY")?;
    let email = std::env::var("GUICHET_EMAIL")?;
    let password = std::env::var("GUICHET_PASSWORD")?;

    let store_config = RestStoreConfig::new(base_url.clone(), anon_key.clone());
    let store = Arc::new(RestAttemptLogStore::anonymous(store_config.clone()));
    let provider = Arc::new(RestIdentityProvider::new(RestProviderConfig::new(
        base_url, anon_key,
    )));

    let mut guichet = Guichet::new(store, provider).with_user_agent("guichet-example");
    if let Ok(service_key) = std::env::var("GUICHET_SERVICE_KEY") {
        let elevated = Arc::new(RestAttemptLogStore::elevated(store_config, service_key));
        guichet = guichet.with_elevated_store(elevated);
    }

    let session = guichet.sign_in(&email, &password).await?;
    println!("Signed in as {}", session.user.id);
    println!("Set-Cookie: {}", session.cookie("example.com"));

    let report = guichet.analyze_logs(None).await?;
    println!(
        "Last {} minutes: {} attempts, {} failed, {} alerts",
        (report.window.end - report.window.start).num_minutes(),
        report.stats.total_attempts,
        report.stats.failed_attempts,
        report.alerts.len()
    );
    for alert in &report.alerts {
        println!("[{:?}] {} (count {})", alert.severity, alert.message, alert.count);
    }

    Ok(())
}
