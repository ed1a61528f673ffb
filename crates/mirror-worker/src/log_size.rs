//! Transferred-size extraction from tool logs

use regex::Regex;
use std::sync::LazyLock;

/// Matches the summary line rsync prints with `--stats`
pub static RSYNC_TOTAL_SIZE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^Total file size: ([0-9\.]+[KMGTP]?) bytes").unwrap()
});

/// Extract the total file size from an rsync `--stats` log.
///
/// Returns the last reported size, or an empty string if the log holds none.
pub fn extract_rsync_size(log: &[u8]) -> String {
    extract_size(log, &RSYNC_TOTAL_SIZE_PATTERN)
}

/// Return the first capture group of the last match of `pattern` in `log`.
pub fn extract_size(log: &[u8], pattern: &Regex) -> String {
    let text = String::from_utf8_lossy(log);
    pattern
        .captures_iter(&text)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}
