//! Message-broker wiring. Setup hook only; no producers or consumers are
//! registered yet.

use tracing::info;

pub fn setup() {
    match std::env::var("BROKER_URL") {
        Ok(url) if !url.is_empty() => {
            // Host only; the URL may carry credentials
            let host = url::Url::parse(&url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string));
            info!(
                host = host.as_deref().unwrap_or("?"),
                "broker configured, no handlers registered"
            );
        }
        _ => info!("BROKER_URL not set, broker integration disabled"),
    }
}
