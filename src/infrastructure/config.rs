use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const BASE_URL_KEYS: &[&str] = &["SMART_SCHEDULE_API_URL", "SCHEDULE_API_URL"];
const TIMEZONE_KEYS: &[&str] = &["SMART_SCHEDULE_TIMEZONE"];

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub base_url: Url,
    /// Zone defining "today" and "now"; `None` uses the system local zone.
    pub timezone: Option<Tz>,
}

pub fn load_service_config_from_env() -> Result<ServiceConfig, InfraError> {
    load_service_config_from_lookup(|key| std::env::var(key).ok())
}

pub fn load_service_config_from_lookup<F>(lookup: F) -> Result<ServiceConfig, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw_base_url =
        optional_lookup_value(&lookup, BASE_URL_KEYS).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let base_url = parse_base_url(&raw_base_url)?;

    let timezone = optional_lookup_value(&lookup, TIMEZONE_KEYS)
        .map(|raw| {
            raw.parse::<Tz>().map_err(|error| {
                InfraError::InvalidConfig(format!("invalid timezone '{raw}': {error}"))
            })
        })
        .transpose()?;

    Ok(ServiceConfig { base_url, timezone })
}

fn parse_base_url(raw: &str) -> Result<Url, InfraError> {
    let url = Url::parse(raw)
        .map_err(|error| InfraError::InvalidConfig(format!("invalid schedule service url '{raw}': {error}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(InfraError::InvalidConfig(format!(
            "schedule service url must be http or https, got '{}'",
            url.scheme()
        )));
    }
    Ok(url)
}

fn optional_lookup_value<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    for key in keys {
        if let Some(value) = lookup(key) {
            let normalized = value.trim();
            if !normalized.is_empty() {
                return Some(normalized.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_local_service() {
        let config = load_service_config_from_lookup(|_| None).expect("default config");
        assert_eq!(config.base_url.as_str(), "http://localhost:3000/");
        assert!(config.timezone.is_none());
    }

    #[test]
    fn primary_key_wins_over_fallback() {
        let config = load_service_config_from_lookup(|key| match key {
            "SMART_SCHEDULE_API_URL" => Some(" https://planner.example ".to_string()),
            "SCHEDULE_API_URL" => Some("http://ignored:1".to_string()),
            _ => None,
        })
        .expect("config");
        assert_eq!(config.base_url.host_str(), Some("planner.example"));
    }

    #[test]
    fn blank_primary_falls_back() {
        let config = load_service_config_from_lookup(|key| match key {
            "SMART_SCHEDULE_API_URL" => Some("   ".to_string()),
            "SCHEDULE_API_URL" => Some("http://fallback:4000".to_string()),
            _ => None,
        })
        .expect("config");
        assert_eq!(config.base_url.port(), Some(4000));
    }

    #[test]
    fn rejects_non_http_url() {
        let result = load_service_config_from_lookup(|key| match key {
            "SMART_SCHEDULE_API_URL" => Some("ftp://files.example".to_string()),
            _ => None,
        });
        match result {
            Err(InfraError::InvalidConfig(message)) => assert!(message.contains("http")),
            _ => panic!("expected invalid config error"),
        }
    }

    #[test]
    fn parses_timezone() {
        let config = load_service_config_from_lookup(|key| match key {
            "SMART_SCHEDULE_TIMEZONE" => Some("Asia/Kolkata".to_string()),
            _ => None,
        })
        .expect("config");
        assert_eq!(config.timezone, Some(chrono_tz::Asia::Kolkata));

        let invalid = load_service_config_from_lookup(|key| match key {
            "SMART_SCHEDULE_TIMEZONE" => Some("Mars/Olympus".to_string()),
            _ => None,
        });
        assert!(matches!(invalid, Err(InfraError::InvalidConfig(_))));
    }
}
