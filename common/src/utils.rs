use std::fs;

use anyhow::{Context, Result};
use bytes::Bytes;
use glob::glob;
use tracing::warn;

/// Interpret bytes as UTF-8.
pub fn string_from_bytes(bytes: Bytes) -> Result<String> {
    Ok(String::from_utf8(bytes.to_vec())?)
}

/// Parse a byte slice holding a decimal number.
pub fn parse_u64(bytes: &[u8]) -> Result<u64> {
    Ok(std::str::from_utf8(bytes)?.trim().parse::<u64>()?)
}

/// Expand every argument as a glob pattern, keeping argument order.
///
/// Only regular files are kept, and each one is made absolute so a worker
/// started in another directory still finds it.
pub fn expand_inputs(patterns: &[String]) -> Result<Vec<String>> {
    let mut inputs = Vec::new();
    for pattern in patterns {
        let before = inputs.len();
        for entry in glob(pattern).with_context(|| format!("invalid pattern `{pattern}`"))? {
            let path = entry?;
            if path.is_file() {
                let path = fs::canonicalize(&path)
                    .with_context(|| format!("cannot resolve {}", path.display()))?;
                inputs.push(path.to_string_lossy().to_string());
            }
        }
        if inputs.len() == before {
            warn!("`{}` matched no input files", pattern);
        }
    }
    Ok(inputs)
}
