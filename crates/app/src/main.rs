mod bridge;
mod telemetry;

use tokio::io::BufReader;
use tracing::info;

use category_actions_core::CategoryActionFactory;
use category_actions_util::{load_env_file, AppConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let factory = CategoryActionFactory::with_strategy(config.id_strategy);
    let bridge = bridge::Bridge::new(factory);
    info!(stage = "app", env = %config.environment.as_str(), id_strategy = %config.id_strategy, "reading category intents from stdin");

    let reader = BufReader::new(tokio::io::stdin());
    let mut writer = tokio::io::stdout();
    let summary = bridge.run(reader, &mut writer).await?;
    info!(
        stage = "app",
        dispatched = summary.dispatched,
        rejected = summary.rejected,
        "input drained"
    );

    if let Some(path) = &config.metrics_path {
        telemetry::write_metrics_file(&metrics, path)?;
    }

    Ok(())
}
