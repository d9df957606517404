use serde_json::Value;

use crate::{Error, RecommendRequest, Result};
use driftless_config::{Config, MAX_ITERATIONS_LIMIT};
use driftless_domain::{
	AdjustmentPolicy, AdjustmentTarget, CriticSettings, RankingStrategy, RankingWeights,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Normalization {
	None,
	Max,
}
impl Normalization {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Max => "max",
		}
	}
}

/// Everything one request runs with, after overrides are merged over config defaults.
///
/// Built once at request entry and never modified afterwards.
#[derive(Clone, Debug)]
pub struct ResolvedLoopPolicy {
	pub initial_weights: RankingWeights,
	pub strategy: RankingStrategy,
	pub critic: CriticSettings,
	pub adjustment: AdjustmentPolicy,
	pub max_iterations: u32,
	pub final_k: u32,
	pub normalization: Normalization,
}

pub fn resolve_loop_policy(cfg: &Config, req: &RecommendRequest) -> Result<ResolvedLoopPolicy> {
	if req.query_id.trim().is_empty() {
		return Err(Error::InvalidRequest { message: "query_id must be non-empty.".to_string() });
	}

	let initial_weights = RankingWeights {
		cf_weight: req
			.initial_weights
			.map(|weights| weights.cf_weight)
			.unwrap_or(cfg.ranking.default_cf_weight),
		semantic_weight: req
			.initial_weights
			.map(|weights| weights.semantic_weight)
			.unwrap_or(cfg.ranking.default_semantic_weight),
		novelty_lambda: req.novelty_lambda.unwrap_or(cfg.ranking.novelty_lambda),
		advantage_alpha: req.advantage_alpha.unwrap_or(cfg.ranking.advantage_alpha),
	};

	if let Some((name, value)) = initial_weights.first_invalid() {
		return Err(Error::InvalidWeights {
			message: format!("{name} must be a finite number zero or greater. Got {value}."),
		});
	}

	let strategy =
		parse_strategy(req.strategy.as_deref().unwrap_or(cfg.ranking.strategy.as_str()), "strategy")?;
	let target = parse_adjustment_target(
		req.adjustment_target.as_deref().unwrap_or(cfg.adjustment.target.as_str()),
		"adjustment_target",
	)?;
	let normalization =
		parse_normalization(cfg.retrieval.normalization.as_str(), "retrieval.normalization")?;
	let top_k = req.top_k.unwrap_or(cfg.critic.top_k);
	let final_k = req.final_k.unwrap_or(cfg.ranking.final_k);
	let max_iterations = req.max_iterations.unwrap_or(cfg.rerank_loop.max_iterations);
	let min_primary_genre_ratio =
		req.min_primary_genre_ratio.unwrap_or(cfg.critic.min_primary_genre_ratio);
	let cf_fraction = req.cf_adjustment_fraction.unwrap_or(cfg.adjustment.cf_fraction);
	let semantic_fraction =
		req.semantic_adjustment_fraction.unwrap_or(cfg.adjustment.semantic_fraction);

	if top_k == 0 {
		return Err(Error::InvalidRequest {
			message: "top_k must be greater than zero.".to_string(),
		});
	}
	if final_k == 0 {
		return Err(Error::InvalidRequest {
			message: "final_k must be greater than zero.".to_string(),
		});
	}
	if max_iterations > MAX_ITERATIONS_LIMIT {
		return Err(Error::InvalidRequest {
			message: format!(
				"max_iterations must be at most {MAX_ITERATIONS_LIMIT}. Got {max_iterations}."
			),
		});
	}

	for (label, value) in [
		("min_primary_genre_ratio", min_primary_genre_ratio),
		("cf_adjustment_fraction", cf_fraction),
		("semantic_adjustment_fraction", semantic_fraction),
	] {
		validate_unit_interval(value, label)?;
	}

	Ok(ResolvedLoopPolicy {
		initial_weights,
		strategy,
		critic: CriticSettings {
			top_k,
			min_primary_genre_ratio,
			popularity_mean_threshold: Some(cfg.critic.popularity_mean_threshold),
			min_unique_tags: Some(cfg.critic.min_unique_tags),
		},
		adjustment: AdjustmentPolicy::from_fractions(target, cf_fraction, semantic_fraction),
		max_iterations,
		final_k,
		normalization,
	})
}

pub fn build_policy_snapshot(policy: &ResolvedLoopPolicy) -> Value {
	serde_json::json!({
		"ranking": {
			"strategy": policy.strategy.as_str(),
			"initial_weights": {
				"cf_weight": policy.initial_weights.cf_weight,
				"semantic_weight": policy.initial_weights.semantic_weight,
			},
			"novelty_lambda": policy.initial_weights.novelty_lambda,
			"advantage_alpha": policy.initial_weights.advantage_alpha,
			"final_k": policy.final_k,
		},
		"critic": {
			"top_k": policy.critic.top_k,
			"min_primary_genre_ratio": policy.critic.min_primary_genre_ratio,
			"popularity_mean_threshold": policy.critic.popularity_mean_threshold,
			"min_unique_tags": policy.critic.min_unique_tags,
		},
		"adjustment": {
			"target": policy.adjustment.target.as_str(),
			"penalty_fraction": policy.adjustment.penalty_fraction,
			"boost_fraction": policy.adjustment.boost_fraction,
		},
		"rerank_loop": {
			"max_iterations": policy.max_iterations,
		},
		"retrieval": {
			"normalization": policy.normalization.as_str(),
		},
	})
}

pub fn hash_policy_snapshot(payload: &Value) -> Result<String> {
	let raw = serde_json::to_vec(payload).map_err(|err| Error::Internal {
		message: format!("Failed to encode policy snapshot: {err}"),
	})?;

	Ok(blake3::hash(&raw).to_hex().to_string())
}

pub fn parse_strategy(value: &str, label: &str) -> Result<RankingStrategy> {
	match value.trim().to_ascii_lowercase().as_str() {
		"advantage" => Ok(RankingStrategy::Advantage),
		"baseline" => Ok(RankingStrategy::Baseline),
		other => Err(Error::InvalidRequest {
			message: format!("{label} must be one of: advantage, baseline. Got {other}."),
		}),
	}
}

pub fn parse_adjustment_target(value: &str, label: &str) -> Result<AdjustmentTarget> {
	match value.trim().to_ascii_lowercase().as_str() {
		"cf" => Ok(AdjustmentTarget::Cf),
		"semantic" => Ok(AdjustmentTarget::Semantic),
		other => Err(Error::InvalidRequest {
			message: format!("{label} must be one of: cf, semantic. Got {other}."),
		}),
	}
}

pub fn parse_normalization(value: &str, label: &str) -> Result<Normalization> {
	match value.trim().to_ascii_lowercase().as_str() {
		"none" => Ok(Normalization::None),
		"max" => Ok(Normalization::Max),
		other => Err(Error::InvalidRequest {
			message: format!("{label} must be one of: none, max. Got {other}."),
		}),
	}
}

fn validate_unit_interval(value: f32, label: &str) -> Result<()> {
	if !value.is_finite() {
		return Err(Error::InvalidRequest {
			message: format!("{label} must be a finite number."),
		});
	}
	if !(0.0..=1.0).contains(&value) {
		return Err(Error::InvalidRequest {
			message: format!("{label} must be in the range 0.0-1.0."),
		});
	}

	Ok(())
}
