//! Handler for the `score` command.

use std::sync::Arc;

use serde_json::json;

use super::command::ScoreArgs;
use super::output;
use crate::application::ForecastService;
use crate::domain::context::RequestContext;
use crate::domain::id::ForecastId;
use crate::error::{Error, Result};
use crate::infrastructure::bootstrap::open_store;
use crate::infrastructure::config::Config;
use crate::port::outbound::store::Store;

/// Execute `augur score`.
pub async fn execute(config: &Config, args: &ScoreArgs) -> Result<()> {
    let store: Arc<dyn Store> = Arc::new(open_store(&config.database)?);
    let admin = store
        .user_by_email(&args.admin_email.trim().to_lowercase())
        .await?
        .ok_or(Error::NotFound("user"))?;
    let ctx = RequestContext::new(admin.id, admin.organization_id, admin.role);

    let forecasts = ForecastService::new(Arc::clone(&store));
    let id = ForecastId::from(args.forecast.as_str());
    let forecast = forecasts.record_actual(&ctx, &id, &args.actual).await?;
    let scored = store.forecast_predictions(&id).await?.len();

    if output::is_json() {
        output::json_output(&json!({
            "forecast": forecast.id,
            "actualValue": forecast.actual_value,
            "scoredPredictions": scored,
        }));
        return Ok(());
    }
    output::success(&format!("Recorded actual value for {}", forecast.title));
    output::field("Actual", args.actual.trim());
    output::field("Scored", scored);
    Ok(())
}
