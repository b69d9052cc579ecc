use crate::core::selector::{ExclusionStrategy, SelectorOptions};
use crate::utils::error::{Result, SelectionError};
use crate::utils::validation::{
    validate_identifier, validate_non_empty_string, validate_range, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub store: StoreSettings,
    #[serde(default)]
    pub selection: SelectionSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    pub base_url: String,
    pub service_key: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub tables: TableNames,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub campaigns: String,
    pub delivery_logs: String,
    pub contacts: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            campaigns: "campaigns".to_string(),
            delivery_logs: "campaign_logs".to_string(),
            contacts: "contacts".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionSettings {
    pub exclusion: ExclusionStrategy,
    /// Database function used for server-side exclusion.
    pub audience_function: String,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            exclusion: ExclusionStrategy::Inline,
            audience_function: "select_campaign_audience".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Map failure kinds to distinct statuses instead of answering 400 for all.
    pub strict_status_codes: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            strict_status_codes: true,
        }
    }
}

fn default_timeout_seconds() -> u64 {
    10
}

impl Settings {
    /// Loads settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| SelectionError::Config {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SelectionError::Config {
            message: format!("TOML parsing error: {}", e),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| SelectionError::MissingConfig {
                field: key.to_string(),
            })
        };
        let tables = TableNames::default();
        let selection = SelectionSettings::default();
        let server = ServerSettings::default();

        let exclusion = match lookup("EXCLUSION_STRATEGY").as_deref().map(str::trim) {
            None | Some("") | Some("inline") => ExclusionStrategy::Inline,
            Some("server_side") => ExclusionStrategy::ServerSide,
            Some(other) => {
                return Err(SelectionError::InvalidConfigValue {
                    field: "EXCLUSION_STRATEGY".to_string(),
                    value: other.to_string(),
                    reason: "expected inline or server_side".to_string(),
                })
            }
        };

        Ok(Self {
            store: StoreSettings {
                base_url: required("SUPABASE_URL")?,
                service_key: required("SUPABASE_SERVICE_ROLE_KEY")?,
                timeout_seconds: match lookup("STORE_TIMEOUT_SECONDS") {
                    Some(raw) => parse_number("STORE_TIMEOUT_SECONDS", &raw)?,
                    None => default_timeout_seconds(),
                },
                tables: TableNames {
                    campaigns: lookup("CAMPAIGNS_TABLE").unwrap_or(tables.campaigns),
                    delivery_logs: lookup("DELIVERY_LOGS_TABLE").unwrap_or(tables.delivery_logs),
                    contacts: lookup("CONTACTS_TABLE").unwrap_or(tables.contacts),
                },
            },
            selection: SelectionSettings {
                exclusion,
                audience_function: lookup("AUDIENCE_FUNCTION")
                    .unwrap_or(selection.audience_function),
            },
            server: ServerSettings {
                host: lookup("HOST").unwrap_or(server.host),
                port: match lookup("PORT") {
                    Some(raw) => parse_number("PORT", &raw)?,
                    None => server.port,
                },
                strict_status_codes: lookup("STRICT_STATUS_CODES")
                    .map(|v| !matches!(v.trim(), "0" | "false" | "no"))
                    .unwrap_or(server.strict_status_codes),
            },
        })
    }

    pub fn selector_options(&self) -> SelectorOptions {
        SelectorOptions {
            exclusion: self.selection.exclusion,
            store_timeout: Duration::from_secs(self.store.timeout_seconds),
        }
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| SelectionError::InvalidConfigValue {
            field: key.to_string(),
            value: raw.to_string(),
            reason: "not a valid number".to_string(),
        })
}

/// Replaces `${VAR}` references with environment values; unknown names are left as is.
fn substitute_env_vars(content: &str) -> Result<String> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| SelectionError::Config {
        message: format!("invalid substitution pattern: {}", e),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.to_string())
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_url("store.base_url", &self.store.base_url)?;
        validate_non_empty_string("store.service_key", &self.store.service_key)?;
        validate_range("store.timeout_seconds", self.store.timeout_seconds, 1, 300)?;

        validate_identifier("store.tables.campaigns", &self.store.tables.campaigns)?;
        validate_identifier("store.tables.delivery_logs", &self.store.tables.delivery_logs)?;
        validate_identifier("store.tables.contacts", &self.store.tables.contacts)?;

        if self.selection.exclusion == ExclusionStrategy::ServerSide {
            validate_identifier("selection.audience_function", &self.selection.audience_function)?;
        }

        validate_range("server.port", self.server.port, 1, u16::MAX)?;

        tracing::debug!("configuration validation passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[store]
base_url = "https://project.supabase.co"
service_key = "service-role-key"
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let settings = Settings::from_toml_str(BASIC).unwrap();

        assert_eq!(settings.store.base_url, "https://project.supabase.co");
        assert_eq!(settings.store.timeout_seconds, 10);
        assert_eq!(settings.store.tables, TableNames::default());
        assert_eq!(settings.selection.exclusion, ExclusionStrategy::Inline);
        assert_eq!(settings.server.port, 8080);
        assert!(settings.server.strict_status_codes);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_full_toml_config() {
        let toml_content = r#"
[store]
base_url = "http://localhost:54321"
service_key = "key"
timeout_seconds = 3

[store.tables]
delivery_logs = "message_logs"

[selection]
exclusion = "server_side"
audience_function = "eligible_contacts"

[server]
port = 9000
strict_status_codes = false
"#;

        let settings = Settings::from_toml_str(toml_content).unwrap();

        assert_eq!(settings.store.tables.delivery_logs, "message_logs");
        assert_eq!(settings.store.tables.contacts, "contacts");
        assert_eq!(settings.selection.exclusion, ExclusionStrategy::ServerSide);
        assert_eq!(settings.selection.audience_function, "eligible_contacts");
        assert!(!settings.server.strict_status_codes);

        let options = settings.selector_options();
        assert_eq!(options.store_timeout, Duration::from_secs(3));
        assert_eq!(options.exclusion, ExclusionStrategy::ServerSide);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("AUDIENCE_TEST_STORE_URL", "https://test.supabase.co");

        let toml_content = r#"
[store]
base_url = "${AUDIENCE_TEST_STORE_URL}"
service_key = "${AUDIENCE_TEST_UNSET_KEY}"
"#;

        let settings = Settings::from_toml_str(toml_content).unwrap();
        assert_eq!(settings.store.base_url, "https://test.supabase.co");
        assert_eq!(settings.store.service_key, "${AUDIENCE_TEST_UNSET_KEY}");

        std::env::remove_var("AUDIENCE_TEST_STORE_URL");
    }

    #[test]
    fn test_config_validation() {
        let mut settings = Settings::from_toml_str(BASIC).unwrap();
        settings.store.base_url = "invalid-url".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::from_toml_str(BASIC).unwrap();
        settings.store.timeout_seconds = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::from_toml_str(BASIC).unwrap();
        settings.selection.exclusion = ExclusionStrategy::ServerSide;
        settings.selection.audience_function = String::new();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_example_file_parses() {
        let settings =
            Settings::from_toml_str(include_str!("../../audience-select.example.toml")).unwrap();
        assert_eq!(settings.store.tables, TableNames::default());
        assert_eq!(settings.selection.exclusion, ExclusionStrategy::Inline);
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let settings = Settings::from_file(temp_file.path()).unwrap();
        assert_eq!(settings.store.service_key, "service-role-key");
    }

    #[test]
    fn test_settings_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("SUPABASE_URL", "https://project.supabase.co"),
            ("SUPABASE_SERVICE_ROLE_KEY", "secret"),
            ("STORE_TIMEOUT_SECONDS", "5"),
            ("EXCLUSION_STRATEGY", "server_side"),
            ("PORT", "3000"),
            ("STRICT_STATUS_CODES", "false"),
        ]);

        let settings = Settings::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(settings.store.timeout_seconds, 5);
        assert_eq!(settings.selection.exclusion, ExclusionStrategy::ServerSide);
        assert_eq!(settings.server.port, 3000);
        assert!(!settings.server.strict_status_codes);
        assert_eq!(settings.store.tables.campaigns, "campaigns");
    }

    #[test]
    fn test_missing_and_invalid_env_values() {
        let err = Settings::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, SelectionError::MissingConfig { ref field } if field == "SUPABASE_URL"));

        let vars: HashMap<&str, &str> = HashMap::from([
            ("SUPABASE_URL", "https://project.supabase.co"),
            ("SUPABASE_SERVICE_ROLE_KEY", "secret"),
            ("STORE_TIMEOUT_SECONDS", "soon"),
        ]);
        let err = Settings::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap_err();
        assert!(matches!(err, SelectionError::InvalidConfigValue { .. }));

        let vars: HashMap<&str, &str> = HashMap::from([
            ("SUPABASE_URL", "https://project.supabase.co"),
            ("SUPABASE_SERVICE_ROLE_KEY", "secret"),
            ("EXCLUSION_STRATEGY", "lazy"),
        ]);
        assert!(Settings::from_lookup(|k| vars.get(k).map(|v| v.to_string())).is_err());
    }
}
