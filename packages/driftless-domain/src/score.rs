use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub type ItemId = String;

/// Per-item retrieval signals for one request.
///
/// `cf_score` and `semantic_score` are expected to already share a comparable range; the core
/// never renormalizes them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreVector {
	pub item_id: ItemId,
	pub cf_score: f32,
	pub semantic_score: f32,
	pub popularity: f32,
	#[serde(default)]
	pub tags: BTreeSet<String>,
}

/// Relative signal weights plus the advantage transform coefficients.
///
/// `cf_weight` and `semantic_weight` need not sum to one.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
	pub cf_weight: f32,
	pub semantic_weight: f32,
	pub novelty_lambda: f32,
	pub advantage_alpha: f32,
}
impl RankingWeights {
	/// Returns the first weight that is negative or non-finite, by field name.
	pub fn first_invalid(&self) -> Option<(&'static str, f32)> {
		[
			("cf_weight", self.cf_weight),
			("semantic_weight", self.semantic_weight),
			("novelty_lambda", self.novelty_lambda),
			("advantage_alpha", self.advantage_alpha),
		]
		.into_iter()
		.find(|(_, value)| !value.is_finite() || *value < 0.0)
	}
}

/// Length as a reported count, saturating at `u32::MAX`.
pub fn saturating_count(len: usize) -> u32 {
	u32::try_from(len).unwrap_or(u32::MAX)
}
