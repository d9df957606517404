use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::{constraint::normalize_tag, score::ItemId};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
	pub popularity: f32,
	pub tags: BTreeSet<String>,
}

/// One catalog row as it appears on disk.
///
/// An explicit `popularity` wins. Otherwise popularity is `rating_count` divided by the largest
/// rating count in the catalog.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CatalogEntry {
	pub item_id: ItemId,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub popularity: Option<f32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rating_count: Option<u64>,
}

/// Read-only item metadata shared by every request.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
	items: HashMap<ItemId, ItemMetadata>,
}
impl Catalog {
	pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
		let max_count = entries.iter().filter_map(|entry| entry.rating_count).max().unwrap_or(0);
		let mut items = HashMap::with_capacity(entries.len());

		for entry in entries {
			let popularity = match (entry.popularity, entry.rating_count) {
				(Some(value), _) if value.is_finite() => value,
				(_, Some(count)) if max_count > 0 => count as f32 / max_count as f32,
				_ => 0.0,
			};
			let tags = entry.tags.iter().filter_map(|tag| normalize_tag(tag)).collect();

			items.entry(entry.item_id).or_insert(ItemMetadata { popularity, tags });
		}

		Self { items }
	}

	pub fn get(&self, item_id: &str) -> Option<&ItemMetadata> {
		self.items.get(item_id)
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}
}
