use serde::{Deserialize, Serialize};

use driftless_domain::{DriftReport, IntentConstraint, ItemId, RankedList, RankingWeights, Specificity};

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct InitialWeights {
	pub cf_weight: f32,
	pub semantic_weight: f32,
}

/// One recommendation request from the planner.
///
/// Every tuning field is optional and falls back to the process configuration. `strategy` and
/// `adjustment_target` stay strings here so a bad value is reported as an invalid request rather
/// than a decode failure.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RecommendRequest {
	pub query_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub query: Option<String>,
	#[serde(default)]
	pub candidate_universe: Vec<ItemId>,
	#[serde(default)]
	pub intent_constraint: IntentConstraint,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub initial_weights: Option<InitialWeights>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_iterations: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub top_k: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub min_primary_genre_ratio: Option<f32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub novelty_lambda: Option<f32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub advantage_alpha: Option<f32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cf_adjustment_fraction: Option<f32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub semantic_adjustment_fraction: Option<f32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub adjustment_target: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub final_k: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub strategy: Option<String>,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
	Converged,
	Exhausted,
	Cancelled,
	EmptyCandidateUniverse,
}
impl Termination {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Converged => "converged",
			Self::Exhausted => "exhausted",
			Self::Cancelled => "cancelled",
			Self::EmptyCandidateUniverse => "empty_candidate_universe",
		}
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TraceEntry {
	pub iteration: u32,
	pub weights_used: RankingWeights,
	pub drift_report: DriftReport,
	pub top_item: Option<ItemId>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct SourceReport {
	pub provider_id: String,
	/// The whole source failed; every candidate fell back to a zero score.
	pub failed: bool,
	pub missing_scores: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct RetrievalReport {
	pub candidates: u32,
	pub duplicates_dropped: u32,
	pub missing_metadata: u32,
	pub normalization: String,
	pub cf: SourceReport,
	pub semantic: SourceReport,
}
impl RetrievalReport {
	pub fn degraded(&self) -> bool {
		self.cf.failed
			|| self.semantic.failed
			|| self.cf.missing_scores > 0
			|| self.semantic.missing_scores > 0
			|| self.missing_metadata > 0
	}
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RecommendResponse {
	pub query_id: String,
	pub ranked_list: RankedList,
	/// Set whenever the list did not meet the constraint threshold. Callers branch on this flag.
	pub uncertain: bool,
	pub termination: Termination,
	pub selected_iteration: Option<u32>,
	pub specificity: Specificity,
	pub trace: Vec<TraceEntry>,
	pub retrieval: RetrievalReport,
	pub policy_hash: String,
}
