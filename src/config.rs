//! Runtime configuration, loaded from the environment.
//!
//! Every field has a default matching the public NTU portal, so a bare
//! `roomfinder crawl` works without any environment at all.

use figment::{Figment, providers::Env};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

pub const DEFAULT_MAIN_URL: &str = "https://wish.wis.ntu.edu.sg/webexe/owa/AUS_SCHEDULE.main";
pub const DEFAULT_COURSE_URL: &str =
    "https://wish.wis.ntu.edu.sg/webexe/owa/AUS_SCHEDULE.main_display1";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/60.0.3112.113 Safari/537.36";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Level for this crate's own log events; `RUST_LOG` takes precedence.
    pub log_level: String,
    pub portal_main_url: String,
    pub portal_course_url: String,
    pub user_agent: String,
    /// Minimum interval between two course queries.
    #[serde(deserialize_with = "deserialize_duration")]
    pub request_delay: Duration,
    /// How long the dispatcher waits for a dispatched query before sending it again.
    #[serde(deserialize_with = "deserialize_duration")]
    pub stall_timeout: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub request_timeout: Duration,
    pub workers: usize,
    /// Re-dispatches of a stalled query before it is reported as failed.
    pub max_redispatch: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            portal_main_url: DEFAULT_MAIN_URL.to_string(),
            portal_course_url: DEFAULT_COURSE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_delay: Duration::from_secs(5),
            stall_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(30),
            workers: 1,
            max_redispatch: 3,
        }
    }
}

impl Config {
    /// Reads the process environment (call `dotenvy::dotenv()` first to include `.env`).
    pub fn load() -> Result<Self, figment::Error> {
        let config: Config = Figment::new().merge(Env::raw()).extract()?;
        if config.workers == 0 {
            return Err(figment::Error::from("WORKERS must be at least 1".to_string()));
        }
        // A query must give up before the dispatcher declares it stalled.
        if config.request_timeout >= config.stall_timeout {
            return Err(figment::Error::from(format!(
                "REQUEST_TIMEOUT ({:?}) must be shorter than STALL_TIMEOUT ({:?})",
                config.request_timeout, config.stall_timeout
            )));
        }
        Ok(config)
    }
}

/// Accepts either a `fundu` duration string (`"500ms"`, `"5s"`, `"2m"`) or a
/// plain integer number of seconds.
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct DurationVisitor;

    impl Visitor<'_> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a duration string like \"5s\" or a number of seconds")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Duration, E> {
            Ok(Duration::from_secs(value))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Duration, E> {
            u64::try_from(value)
                .map(Duration::from_secs)
                .map_err(|_| E::custom(format!("duration cannot be negative: {value}")))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Duration, E> {
            fundu::parse_duration(value.trim())
                .map_err(|e| E::custom(format!("invalid duration {value:?}: {e}")))
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}
