//! CLI command implementations.

pub mod login;
pub mod sync;
pub mod vaults;

use anyhow::{Context, Result};
use std::io::Write;

/// Prompt on stdout and read one trimmed line from stdin.
pub fn prompt_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read input")?;
    Ok(line.trim().to_string())
}
