pub mod parser;

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::types::DatabaseResourceConfig;

/// Parse every `ibm_database` resource from the .tf files in a directory,
/// or from a single .tf file.
pub fn parse_directory(path: &Path) -> Result<Vec<DatabaseResourceConfig>> {
    let mut tf_files: Vec<std::path::PathBuf> = if path.is_file() {
        vec![path.to_path_buf()]
    } else {
        std::fs::read_dir(path)
            .with_context(|| format!("Failed to read directory: {}", path.display()))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|e| e == "tf").unwrap_or(false))
            .collect()
    };
    tf_files.sort();

    if tf_files.is_empty() {
        anyhow::bail!("No .tf files found in directory: {}", path.display());
    }

    let mut resources = Vec::new();
    for file in &tf_files {
        tracing::debug!("Parsing HCL file: {}", file.display());
        let content = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        resources.extend(parser::parse_hcl(&content, file)?);
    }

    Ok(resources)
}
