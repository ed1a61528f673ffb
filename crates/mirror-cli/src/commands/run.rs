//! Run one sync in the foreground

use std::path::Path;

use colored::Colorize;
use mirror_worker::{Error, ProviderKind, describe_rsync_exit};

use super::{launcher, load};
use crate::error::{CliError, Result};

/// Run the run command
pub fn run_sync(config_path: &Path, name: &str) -> Result<()> {
    let provider = load(config_path)?.provider(name, launcher())?;

    println!(
        "{} {} from {}",
        "Syncing".bold(),
        provider.name().green(),
        provider.upstream()
    );

    match provider.run() {
        Ok(()) => {
            let size = provider.data_size();
            if size.is_empty() {
                println!("{} {} finished", "✓".green(), provider.name());
            } else {
                println!(
                    "{} {} finished, total size {}",
                    "✓".green(),
                    provider.name(),
                    size.cyan()
                );
            }
            Ok(())
        }
        Err(e) => Err(explain(provider.kind(), e)),
    }
}

/// Attach the documented meaning of rsync exit codes
fn explain(kind: ProviderKind, err: Error) -> CliError {
    match (kind, err.exit_code().and_then(describe_rsync_exit)) {
        (ProviderKind::Rsync, Some(meaning)) => CliError::user(format!("{} ({})", err, meaning)),
        _ => err.into(),
    }
}
