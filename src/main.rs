//! Fixture reconciliation pipeline.
//!
//! Reads the two scraped feeds, reconciles them and writes the merged
//! schedule:
//!
//! ```text
//! FEED_A_PATH (Arabic, system of record) ─┐
//!                                         ├─> Reconciler ─> OUTPUT_PATH
//! FEED_B_PATH (Latin, broadcasters)  ─────┘
//! ```

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, info_span, warn};

use fixture_reconcile::config::EngineConfig;
use fixture_reconcile::logging;
use fixture_reconcile::reconcile::{FeedDocument, OutputDocument, Reconciler};

fn main() -> Result<()> {
    // .env must be loaded before anything reads the environment
    dotenvy::dotenv().ok();

    let (_log_guard, run_id) = logging::init_logging();

    let config = EngineConfig::from_env();
    let root_span = info_span!(
        "fixture_reconcile",
        run_id = %run_id,
        whitelist_only = config.feed_b_whitelist_only,
        translator = config.translate.is_some(),
    );
    let _enter = root_span.enter();

    info!("Fixture reconciliation starting");
    info!(
        "   Threshold: {:.2} | tolerance: {}m | offsets: {:?}h",
        config.matching.threshold, config.matching.tolerance_minutes, config.matching.offsets_hours
    );

    let reconciler = Reconciler::from_config(&config).context("building reconciler")?;

    let feed_a = FeedDocument::load_from(&config.io.feed_a)?;
    let feed_b = load_secondary(&config.io.feed_b)?;

    let date = feed_a
        .date()
        .or_else(|| feed_b.date())
        .map(str::to_string)
        .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
    let source_url = feed_a.source_url().map(str::to_string);

    let primary = feed_a.into_fixtures("a");
    let secondary = feed_b.into_fixtures("b");
    info!(
        "Loaded {} primary and {} secondary fixtures for {}",
        primary.len(),
        secondary.len(),
        date
    );

    let report = reconciler.reconcile(&primary, &secondary, &date);

    let output = OutputDocument {
        date,
        source_url,
        matches: report.fixtures,
    };
    write_output(&config.io.output, &output)?;

    info!(
        "Wrote {} fixtures ({} with secondary match) to {}",
        report.stats.primary_fixtures,
        report.stats.matched,
        config.io.output.display()
    );
    Ok(())
}

/// The secondary feed only adds channels; a missing file degrades to an
/// empty pool instead of failing the run.
fn load_secondary(path: &Path) -> Result<FeedDocument> {
    if !path.exists() {
        warn!("Secondary feed {} not found, continuing without it", path.display());
        return Ok(FeedDocument::Bare(Vec::new()));
    }
    FeedDocument::load_from(path)
}

fn write_output(path: &Path, output: &OutputDocument) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(output).context("serializing output")?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}
