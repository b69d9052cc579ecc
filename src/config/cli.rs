use crate::config::settings::Settings;
use crate::utils::error::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Csv,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "audience-select")]
#[command(about = "Select the next contacts a campaign may message")]
pub struct CliConfig {
    #[arg(long)]
    pub campaign_id: String,

    #[arg(long, allow_hyphen_values = true, help = "Requested batch size")]
    pub limit: Option<i64>,

    #[arg(long, help = "TOML settings file (defaults to environment variables)")]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        conflicts_with = "config",
        help = "Select from a JSON snapshot instead of the backing store"
    )]
    pub fixture: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    pub fn settings(&self) -> Result<Settings> {
        match &self.config {
            Some(path) => Settings::from_file(path),
            None => Settings::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let config = CliConfig::parse_from([
            "audience-select",
            "--campaign-id",
            "c1",
            "--limit",
            "-5",
            "--fixture",
            "snapshot.json",
            "--format",
            "csv",
        ]);

        assert_eq!(config.campaign_id, "c1");
        assert_eq!(config.limit, Some(-5));
        assert_eq!(config.fixture, Some(PathBuf::from("snapshot.json")));
        assert_eq!(config.format, OutputFormat::Csv);
        assert!(!config.verbose);
    }

    #[test]
    fn test_fixture_conflicts_with_config() {
        let parsed = CliConfig::try_parse_from([
            "audience-select",
            "--campaign-id",
            "c1",
            "--config",
            "settings.toml",
            "--fixture",
            "snapshot.json",
        ]);
        assert!(parsed.is_err());
    }
}
