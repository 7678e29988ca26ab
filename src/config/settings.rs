use serde::Deserialize;

/// Top-level configuration settings for the messenger.
///
/// Includes settings for the broker connection and for client behaviour.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub broker: BrokerSettings,
    pub client: ClientSettings,
}

/// Configuration settings for the broker connection.
///
/// Either a complete AMQP URI, or individual fields merged over defaults.
/// When `uri` is present it wins and the individual fields are ignored.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub uri: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub exchange_type: Option<String>,
}

/// Configuration settings for client behaviour.
///
/// Controls the per-consumer unacknowledged-delivery limit and the default
/// invocation deadline.
#[derive(Debug, Deserialize, Clone)]
pub struct ClientSettings {
    pub prefetch: u16,
    pub invoke_timeout_secs: u64,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub broker: Option<PartialBrokerSettings>,
    pub client: Option<PartialClientSettings>,
}

/// Partial broker settings.
///
/// Used when loading broker configuration from external sources with optional values.
#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub uri: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub exchange_type: Option<String>,
}

/// Partial client settings.
#[derive(Debug, Deserialize)]
pub struct PartialClientSettings {
    pub prefetch: Option<u16>,
    pub invoke_timeout_secs: Option<u64>,
}

/// Provides default values for `Settings`.
///
/// Matches the broker's stock credentials so a local RabbitMQ works out of
/// the box.
impl Default for Settings {
    fn default() -> Self {
        Self {
            broker: BrokerSettings {
                uri: None,
                host: "localhost".to_string(),
                port: 5672,
                user: "guest".to_string(),
                password: "guest".to_string(),
                exchange_type: None,
            },
            client: ClientSettings {
                prefetch: 10,
                invoke_timeout_secs: 30,
            },
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Settings::default().client
    }
}

/// Immutable connection parameters handed to the messenger at construction.
///
/// Either a complete AMQP URI, or structured fields with defaults.
#[derive(Debug, Clone)]
pub enum BrokerConfig {
    Uri(String),
    Params(ConnectionParams),
}

/// Structured connection fields used when no URI is given.
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub exchange_type: Option<String>,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        let broker = Settings::default().broker;
        Self {
            user: broker.user,
            password: broker.password,
            host: broker.host,
            port: broker.port,
            exchange_type: None,
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        BrokerConfig::Params(ConnectionParams::default())
    }
}

impl BrokerConfig {
    /// The AMQP address the transport dials.
    pub fn address(&self) -> String {
        match self {
            BrokerConfig::Uri(uri) => uri.clone(),
            BrokerConfig::Params(p) => {
                format!("amqp://{}:{}@{}:{}", p.user, p.password, p.host, p.port)
            }
        }
    }

    /// Exchange-type override, if one was configured.
    pub fn exchange_type(&self) -> Option<&str> {
        match self {
            BrokerConfig::Uri(_) => None,
            BrokerConfig::Params(p) => p.exchange_type.as_deref(),
        }
    }
}

impl From<&BrokerSettings> for BrokerConfig {
    fn from(settings: &BrokerSettings) -> Self {
        match &settings.uri {
            Some(uri) => BrokerConfig::Uri(uri.clone()),
            None => BrokerConfig::Params(ConnectionParams {
                user: settings.user.clone(),
                password: settings.password.clone(),
                host: settings.host.clone(),
                port: settings.port,
                exchange_type: settings.exchange_type.clone(),
            }),
        }
    }
}
