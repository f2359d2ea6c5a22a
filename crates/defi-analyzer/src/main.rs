mod bootstrap;

use anyhow::{Context, Result};
use defi_core::settings::Settings;
use defi_runtime::orchestrator::AnalysisOrchestrator;

fn main() {
    let settings = Settings::load();

    if let Err(e) = bootstrap::setup_logging(&settings.log_level) {
        eprintln!("failed to initialise logging: {e}");
    }

    if let Err(e) = run(&settings) {
        tracing::error!("An error occurred during analysis: {:#}", e);
        std::process::exit(1);
    }
}

fn run(settings: &Settings) -> Result<()> {
    tracing::info!("DeFi Analyzer v{} starting", env!("CARGO_PKG_VERSION"));

    let config = settings.to_run_config();
    tracing::debug!(?config, "resolved run configuration");

    let input = config.input.clone();
    let summary = AnalysisOrchestrator::new(config)
        .run()
        .with_context(|| format!("analysis of {} failed", input.display()))?;

    tracing::info!(
        "Processed {} protocols, found {} opportunities, wrote {} files in {:.2}s",
        summary.protocols,
        summary.opportunities,
        summary.artifacts.len(),
        summary.elapsed_seconds
    );
    Ok(())
}
