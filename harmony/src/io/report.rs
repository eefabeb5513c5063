//! JSON report: summary plus the full result tree.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::result::RunResult;
use crate::core::summary::Summary;

#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub summary: &'a Summary,
    pub results: &'a [RunResult],
}

/// Serialize `report` to pretty-printed JSON with trailing newline.
pub fn write_report(path: &Path, report: &Report<'_>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let mut payload = serde_json::to_string_pretty(report).context("serialize report json")?;
    payload.push('\n');
    fs::write(path, payload).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
