mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{
    BrokerConfig, BrokerSettings, ClientSettings, ConnectionParams, Settings,
};

#[cfg(test)]
mod tests;

/// Loads the configuration from the default file and environment variables
/// Merges the configuration with default values
/// Returns a `Settings` struct containing the broker and client configurations
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(Environment::default().separator("_"));

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    // Merge with defaults
    let default = Settings::default();

    Ok(Settings {
        broker: BrokerSettings {
            uri: partial.broker.as_ref().and_then(|b| b.uri.clone()),
            host: partial
                .broker
                .as_ref()
                .and_then(|b| b.host.clone())
                .unwrap_or(default.broker.host),
            port: partial
                .broker
                .as_ref()
                .and_then(|b| b.port)
                .unwrap_or(default.broker.port),
            user: partial
                .broker
                .as_ref()
                .and_then(|b| b.user.clone())
                .unwrap_or(default.broker.user),
            password: partial
                .broker
                .as_ref()
                .and_then(|b| b.password.clone())
                .unwrap_or(default.broker.password),
            exchange_type: partial
                .broker
                .as_ref()
                .and_then(|b| b.exchange_type.clone()),
        },
        client: ClientSettings {
            prefetch: partial
                .client
                .as_ref()
                .and_then(|c| c.prefetch)
                .unwrap_or(default.client.prefetch),
            invoke_timeout_secs: partial
                .client
                .as_ref()
                .and_then(|c| c.invoke_timeout_secs)
                .unwrap_or(default.client.invoke_timeout_secs),
        },
    })
}
