//! Print the command line of a mirror

use std::path::Path;

use super::{launcher, load};
use crate::error::Result;

/// Run the command command
pub fn run_show_command(config_path: &Path, name: &str) -> Result<()> {
    let provider = load(config_path)?.provider(name, launcher())?;
    println!("{}", provider.command().join(" "));
    Ok(())
}
