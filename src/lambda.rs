use audience_select::core::request::SelectAudienceRequest;
use audience_select::utils::{logger, validation::Validate};
use audience_select::{AudienceSelector, Contact, RestStore, Settings};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use std::sync::Arc;

async fn function_handler(
    event: LambdaEvent<SelectAudienceRequest>,
    selector: Arc<AudienceSelector>,
) -> Result<Vec<Contact>, Error> {
    let request = event.payload;
    tracing::info!(campaign_id = %request.campaign_id(), "Selecting audience");

    let contacts = selector
        .select(&request.campaign_id(), request.requested_limit())
        .await
        .map_err(|e| {
            tracing::error!(error.label = e.as_label(), "Selection failed: {}", e);
            Box::new(e) as Error
        })?;

    Ok(contacts)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    let settings = Settings::from_env()?;
    settings.validate()?;

    let store = Arc::new(RestStore::new(&settings)?);
    let selector = Arc::new(AudienceSelector::new(store, settings.selector_options()));

    run(service_fn(move |event| function_handler(event, selector.clone()))).await
}
