//! List configured mirrors

use std::path::Path;

use colored::Colorize;
use mirror_worker::{Provider, ProviderKind};
use serde::Serialize;

use super::{launcher, load};
use crate::error::Result;

/// One row of `list --json`
#[derive(Debug, Serialize)]
struct MirrorSummary {
    name: String,
    kind: ProviderKind,
    upstream: String,
    interval_minutes: u64,
    retry: usize,
    working_dir: String,
    log_file: String,
}

impl MirrorSummary {
    fn from_provider(provider: &dyn Provider) -> Self {
        Self {
            name: provider.name().to_string(),
            kind: provider.kind(),
            upstream: provider.upstream().to_string(),
            interval_minutes: provider.interval().as_secs() / 60,
            retry: provider.retry(),
            working_dir: provider.working_dir().display().to_string(),
            log_file: provider.log_file().display().to_string(),
        }
    }
}

/// Run the list command
pub fn run_list(config_path: &Path, json: bool) -> Result<()> {
    let config = load(config_path)?;
    let providers = config.providers(launcher())?;
    let summaries: Vec<MirrorSummary> = providers
        .iter()
        .map(|p| MirrorSummary::from_provider(p.as_ref()))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No mirrors configured in {}", config_path.display());
        return Ok(());
    }

    println!("{}", "Mirrors".bold());
    println!();
    for s in &summaries {
        println!(
            "  {:<16} {:<8} every {:>5}m  {}",
            s.name.green(),
            s.kind.to_string().cyan(),
            s.interval_minutes,
            s.upstream
        );
    }
    Ok(())
}
