use std::{fs, path::Path};

use color_eyre::{Result, eyre::WrapErr};
use serde::Deserialize;

use driftless_domain::{Catalog, CatalogEntry};

#[derive(Debug, Deserialize)]
struct CatalogFile {
	items: Vec<CatalogEntry>,
}

/// Reads a `{ "items": [...] }` catalog file.
pub fn load(path: &Path) -> Result<Catalog> {
	let raw = fs::read_to_string(path)
		.wrap_err_with(|| format!("Failed to read catalog at {}.", path.display()))?;

	parse(&raw).wrap_err_with(|| format!("Failed to parse catalog at {}.", path.display()))
}

pub fn parse(raw: &str) -> Result<Catalog> {
	let file: CatalogFile = serde_json::from_str(raw)?;

	Ok(Catalog::from_entries(file.items))
}
