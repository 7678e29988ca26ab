use serde_json::Value;
use tracing::info;

use hutch::{Messenger, load_config};

/// Operational tap: connects to the broker as the service named on the
/// command line and logs every delivery it sees. RPC requests are answered
/// with null so callers are not left hanging.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    hutch::utils::logging::init(&level);

    let settings = load_config()?;
    let service = std::env::args().nth(1).unwrap_or_else(|| "hutch".to_string());

    let messenger = Messenger::from_settings(&settings, &service);
    messenger.connect().await?;
    info!(%service, "listening");

    messenger
        .listen(|delivery| async move {
            info!(
                key = %delivery.key,
                origin = %delivery.origin,
                kind = ?delivery.kind,
                args = %delivery.args,
                "delivery"
            );
            Ok(Value::Null)
        })
        .await?;

    tokio::signal::ctrl_c().await?;
    messenger.close().await;
    Ok(())
}
