use std::env;
use std::str::FromStr;

use chrono_tz::Tz;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub slack: SlackConfig,
    pub feed: FeedConfig,
    pub notifications: NotificationConfig,
    pub state: StateConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Legacy verification token Slack sends with every command and action.
    pub verification_token: String,
    /// When set, POSTs must also carry a valid `X-Slack-Signature`.
    pub signing_secret: Option<String>,
    /// Base of the Web API, e.g. `https://slack.com/api`.
    pub api_url: String,
    /// Where users are sent to grant reminder access.
    pub authorize_url: String,
    pub reminder_scope: String,
}

/// Which upstream launch feed schema the feed client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSchema {
    /// launchlibrary.net 1.4
    Legacy,
    /// ll.thespacedevs.com 2.0
    SpaceDevs,
}

impl FromStr for FeedSchema {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "legacy" | "1.4" => Ok(FeedSchema::Legacy),
            "spacedevs" | "2.0" => Ok(FeedSchema::SpaceDevs),
            _ => Err(ConfigError::InvalidValue("FEED_SCHEMA".to_string())),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub schema: FeedSchema,
    pub legacy_url: String,
    pub spacedevs_url: String,
    /// How many upcoming items to request per fetch.
    pub upcoming_limit: u32,
    pub user_agent: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    /// Timezone used for the human-readable fallback of timestamp tokens.
    pub timezone: Tz,
    /// Whether the in-process hourly tick worker runs.
    pub tick_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Allowed requests per second (per IP) for the Slack endpoint
    pub slack_per_second: u32,
    /// Burst size for the Slack endpoint
    pub slack_burst: u32,
}

fn parse_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => match v.to_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingEnv(name.to_string()))
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let timezone_name =
            env::var("TARGET_TIMEZONE").unwrap_or_else(|_| "America/New_York".to_string());
        let timezone: Tz = timezone_name
            .parse()
            .map_err(|_| ConfigError::InvalidValue("TARGET_TIMEZONE".to_string()))?;

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/launch_library.db".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            },
            slack: SlackConfig {
                client_id: required("SLACK_CLIENT_ID")?,
                client_secret: required("SLACK_CLIENT_SECRET")?,
                verification_token: required("SLACK_VERIFICATION_TOKEN")?,
                signing_secret: env::var("SLACK_SIGNING_SECRET")
                    .ok()
                    .filter(|s| !s.is_empty()),
                api_url: env::var("SLACK_API_URL")
                    .unwrap_or_else(|_| "https://slack.com/api".to_string()),
                authorize_url: env::var("SLACK_AUTHORIZE_URL")
                    .unwrap_or_else(|_| "https://slack.com/oauth/authorize".to_string()),
                reminder_scope: env::var("SLACK_REMINDER_SCOPE")
                    .unwrap_or_else(|_| "reminders:write".to_string()),
            },
            feed: FeedConfig {
                schema: env::var("FEED_SCHEMA")
                    .unwrap_or_else(|_| "spacedevs".to_string())
                    .parse()?,
                legacy_url: env::var("FEED_LEGACY_URL")
                    .unwrap_or_else(|_| "https://launchlibrary.net/1.4".to_string()),
                spacedevs_url: env::var("FEED_SPACEDEVS_URL")
                    .unwrap_or_else(|_| "https://ll.thespacedevs.com/2.0.0".to_string()),
                upcoming_limit: env::var("FEED_UPCOMING_LIMIT")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("FEED_UPCOMING_LIMIT".to_string()))?,
                user_agent: env::var("FEED_USER_AGENT")
                    .unwrap_or_else(|_| "launch-library-bot".to_string()),
                timeout_seconds: env::var("FEED_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30),
            },
            notifications: NotificationConfig {
                timezone,
                tick_enabled: parse_bool("TICK_ENABLED", true),
            },
            state: StateConfig {
                secret: required("STATE_SECRET")?,
                ttl_minutes: env::var("STATE_TTL_MINUTES")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30),
            },
            rate_limit: RateLimitConfig {
                slack_per_second: env::var("RATE_LIMIT_SLACK_PER_SECOND")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                slack_burst: env::var("RATE_LIMIT_SLACK_BURST")
                    .unwrap_or_else(|_| "50".to_string())
                    .parse()
                    .unwrap_or(50),
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "sqlite://data/launch_library.db".to_string(),
                max_connections: 5,
            },
            slack: SlackConfig {
                client_id: String::new(),
                client_secret: String::new(),
                verification_token: String::new(),
                signing_secret: None,
                api_url: "https://slack.com/api".to_string(),
                authorize_url: "https://slack.com/oauth/authorize".to_string(),
                reminder_scope: "reminders:write".to_string(),
            },
            feed: FeedConfig {
                schema: FeedSchema::SpaceDevs,
                legacy_url: "https://launchlibrary.net/1.4".to_string(),
                spacedevs_url: "https://ll.thespacedevs.com/2.0.0".to_string(),
                upcoming_limit: 20,
                user_agent: "launch-library-bot".to_string(),
                timeout_seconds: 30,
            },
            notifications: NotificationConfig {
                timezone: chrono_tz::America::New_York,
                tick_enabled: true,
            },
            state: StateConfig {
                secret: String::new(),
                ttl_minutes: 30,
            },
            rate_limit: RateLimitConfig {
                slack_per_second: 10,
                slack_burst: 50,
            },
        }
    }
}
