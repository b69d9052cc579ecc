use audience_select::config::OutputFormat;
use audience_select::utils::error::ErrorKind;
use audience_select::utils::export::contacts_to_csv;
use audience_select::utils::{logger, validation::Validate};
use audience_select::{
    AudienceSelector, CliConfig, InMemoryStore, RestStore, Result, SelectionError, SelectorOptions,
};
use clap::Parser;
use std::sync::Arc;

async fn run(config: &CliConfig) -> Result<String> {
    let selector = match &config.fixture {
        Some(path) => {
            tracing::info!("Using store snapshot {}", path.display());
            let store = InMemoryStore::from_json_file(path)?;
            AudienceSelector::new(Arc::new(store), SelectorOptions::default())
        }
        None => {
            let settings = config.settings()?;
            settings.validate()?;
            let store = RestStore::new(&settings)?;
            AudienceSelector::new(Arc::new(store), settings.selector_options())
        }
    };

    let contacts = selector.select(&config.campaign_id, config.limit).await?;

    match config.format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&contacts).map_err(|e| SelectionError::Unknown {
                message: format!("JSON export failed: {}", e),
            })
        }
        OutputFormat::Csv => contacts_to_csv(&contacts),
    }
}

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    logger::init_cli_logger(config.verbose);
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    match run(&config).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            tracing::error!(
                "❌ Selection failed: {} (label: {}, kind: {:?})",
                e,
                e.as_label(),
                e.kind()
            );
            eprintln!("❌ {}", e);

            let exit_code = match e.kind() {
                ErrorKind::Validation | ErrorKind::NotFound => 1,
                ErrorKind::UpstreamQuery | ErrorKind::Timeout => 2,
                ErrorKind::Configuration | ErrorKind::Unknown => 3,
            };
            std::process::exit(exit_code);
        }
    }
}
