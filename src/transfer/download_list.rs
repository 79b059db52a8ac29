use std::path::Path;
use anyhow::{anyhow, bail};

use crate::error::{TransferError, TransferResult};

/// Reads the newline separated list of names to download. A list that is missing or contains no
///  names is a configuration error.
pub async fn load_download_list(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = tokio::fs::read_to_string(path).await
        .map_err(|e| anyhow!("cannot read download list {:?}: {}", path, e))?;

    let names = parse_download_list(&text);
    if names.is_empty() {
        bail!("download list {:?} contains no file names", path);
    }
    Ok(names)
}

/// one name per line, surrounding whitespace trimmed, blank lines skipped
pub fn parse_download_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Names travel as a single whitespace separated token and become a path below the output
///  directory, so they must be a single plain path component.
pub fn validate_name(name: &str) -> TransferResult<()> {
    let is_valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.chars().any(|c| c.is_whitespace() || c.is_control() || c == '/' || c == '\\');

    if is_valid {
        Ok(())
    }
    else {
        Err(TransferError::InvalidName(name.to_string()))
    }
}
