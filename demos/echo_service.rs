//! Echo responder: serves `demo.*` requests, echoing the arguments back.
//!
//! Run a broker locally, then:
//!     cargo run --example echo_service

use serde_json::json;

use hutch::{BrokerConfig, MessageKind, Messenger};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    hutch::utils::logging::init("info");

    let messenger = Messenger::new(BrokerConfig::default(), "demo");
    messenger.connect().await?;

    messenger
        .listen(|delivery| async move {
            println!(
                "{:?} {} from {}: {}",
                delivery.kind, delivery.key, delivery.origin, delivery.args
            );
            if delivery.kind == MessageKind::Request && delivery.key == "fail" {
                return Err(json!("refused"));
            }
            Ok(json!({ "echo": delivery.args }))
        })
        .await?;

    println!("echo service ready on `demo.*`, ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    messenger.close().await;
    Ok(())
}
