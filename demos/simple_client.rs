//! Exercises all four patterns against a local broker. Start
//! `echo_service` first, then:
//!     cargo run --example simple_client

use serde_json::json;

use hutch::{BrokerConfig, Messenger};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    hutch::utils::logging::init("info");

    let messenger = Messenger::new(BrokerConfig::default(), "demo");
    messenger.connect().await?;

    messenger
        .publish("demo.created", &json!({"id": 1}), None)
        .await?;
    println!("published demo.created");

    messenger.broadcast("demo.refresh", &json!({"why": "cache"})).await?;
    println!("broadcast demo.refresh");

    let reply = messenger.invoke("demo.ping", &json!({"n": 1}), None).await?;
    println!("demo.ping replied: {reply}");

    match messenger.invoke("demo.fail", &json!({}), None).await {
        Ok(reply) => println!("unexpected success: {reply}"),
        Err(err) => println!("demo.fail rejected as expected: {err}"),
    }

    messenger.close().await;
    Ok(())
}
