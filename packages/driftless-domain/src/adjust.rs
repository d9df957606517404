use serde::{Deserialize, Serialize};

use crate::{drift::DriftReport, score::RankingWeights};

/// The signal held responsible for drift. It is penalized and the other signal is boosted.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentTarget {
	#[default]
	Cf,
	Semantic,
}
impl AdjustmentTarget {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Cf => "cf",
			Self::Semantic => "semantic",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdjustmentPolicy {
	pub target: AdjustmentTarget,
	/// Fraction removed from the penalized weight on each correction.
	pub penalty_fraction: f32,
	/// Fraction of its current value added to the boosted weight on each correction.
	pub boost_fraction: f32,
}
impl AdjustmentPolicy {
	/// Maps per-signal fractions onto the penalty/boost roles implied by `target`.
	pub fn from_fractions(target: AdjustmentTarget, cf_fraction: f32, semantic_fraction: f32) -> Self {
		match target {
			AdjustmentTarget::Cf =>
				Self { target, penalty_fraction: cf_fraction, boost_fraction: semantic_fraction },
			AdjustmentTarget::Semantic =>
				Self { target, penalty_fraction: semantic_fraction, boost_fraction: cf_fraction },
		}
	}
}

/// Derives corrected weights from `weights`; the input is never modified.
///
/// Only the two signal weights move. `novelty_lambda` and `advantage_alpha` are carried over. A
/// report that is not drifted yields an unchanged copy.
pub fn adjust(
	weights: &RankingWeights,
	report: &DriftReport,
	policy: &AdjustmentPolicy,
) -> RankingWeights {
	if !report.drifted {
		return *weights;
	}

	let penalize = |value: f32| value * (1.0 - policy.penalty_fraction);
	let boost = |value: f32| value * (1.0 + policy.boost_fraction);
	let mut next = *weights;

	match policy.target {
		AdjustmentTarget::Cf => {
			next.cf_weight = penalize(weights.cf_weight);
			next.semantic_weight = boost(weights.semantic_weight);
		},
		AdjustmentTarget::Semantic => {
			next.semantic_weight = penalize(weights.semantic_weight);
			next.cf_weight = boost(weights.cf_weight);
		},
	}

	next
}
