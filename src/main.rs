use reddit_harvester::{HarvestConfig, HarvestPipeline, RedditAuth, SnapshotStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

const COMMUNITY: &str = "python";
const POST_LIMIT: usize = 10;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("reddit_harvester=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = HarvestConfig::from_env()?;
    config.log_summary();

    let pipeline = HarvestPipeline::new(
        RedditAuth::new(config.credentials.clone())?,
        SnapshotStore::new(&config.output_dir),
    )
    .with_concurrency(config.concurrency);

    let report = pipeline.harvest(COMMUNITY, POST_LIMIT).await?;
    info!(
        path = %report.path.display(),
        collected = report.collected,
        failed = report.failed,
        "Harvest finished"
    );

    Ok(())
}
