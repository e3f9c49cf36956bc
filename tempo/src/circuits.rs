use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempo_core::{parse_definitions, CircuitDefinition};
use tracing::{info, warn};

/// Reads a JSON circuit file holding one definition or an array of them.
pub fn load_file(path: &Path) -> Result<Vec<CircuitDefinition>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read circuit file at {:?}", path))?;
    let definitions = parse_definitions(&json)
        .with_context(|| format!("Failed to parse circuit file at {:?}", path))?;
    info!(path = %path.display(), count = definitions.len(), "loaded circuits");
    Ok(definitions)
}

/// Config circuits first, then each file in order. Definitions that would
/// not build a program are dropped with a warning instead of failing startup.
pub fn collect(configured: &[CircuitDefinition], files: &[PathBuf]) -> Result<Vec<CircuitDefinition>> {
    let mut all = configured.to_vec();
    for path in files {
        all.extend(load_file(path)?);
    }
    all.retain(|definition| match definition.into_program() {
        Ok(_) => true,
        Err(err) => {
            warn!(name = ?definition.name, %err, "skipping invalid circuit");
            false
        }
    });
    Ok(all)
}
