//! rsync argument list construction

use crate::config::SyncConfig;

/// Flags every rsync job starts with, in order.
pub const BASELINE_OPTIONS: &[&str] = &[
    "-aHvh",
    "--no-o",
    "--no-g",
    "--stats",
    "--exclude",
    ".~tmp~/",
    "--delete",
    "--delete-after",
    "--delay-updates",
    "--safe-links",
    "--timeout=120",
    "--contimeout=120",
];

/// Build the ordered rsync option list for a job.
///
/// Order: baseline flags, network family flag, `--exclude-from`, then the
/// user's extra options verbatim. rsync honours the last occurrence of a
/// flag, so extra options can override anything before them. Credentials
/// are never part of this list.
pub fn build_options(config: &SyncConfig) -> Vec<String> {
    let mut options: Vec<String> = BASELINE_OPTIONS.iter().map(|s| s.to_string()).collect();

    if let Some(flag) = config.network().flag() {
        options.push(flag.to_string());
    }

    if let Some(exclude_file) = config.exclude_file() {
        options.push("--exclude-from".to_string());
        options.push(exclude_file.display().to_string());
    }

    options.extend(config.extra_options().iter().cloned());
    options
}
