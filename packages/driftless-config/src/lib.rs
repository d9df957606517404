mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Adjustment, CatalogSource, Config, Critic, MAX_ITERATIONS_LIMIT, ProviderConfig, Providers,
	Ranking, RerankLoop, Retrieval, Service,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.service.request_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "service.request_timeout_ms must be greater than zero.".to_string(),
		});
	}

	if let Some(providers) = cfg.providers.as_ref() {
		for (label, provider) in [("cf", &providers.cf), ("semantic", &providers.semantic)] {
			if provider.api_key.trim().is_empty() {
				return Err(Error::Validation {
					message: format!("Provider {label} api_key must be non-empty."),
				});
			}
			if provider.api_base.trim().is_empty() {
				return Err(Error::Validation {
					message: format!("Provider {label} api_base must be non-empty."),
				});
			}
			if provider.timeout_ms == 0 {
				return Err(Error::Validation {
					message: format!("Provider {label} timeout_ms must be greater than zero."),
				});
			}
		}
	}

	if !matches!(cfg.retrieval.normalization.as_str(), "none" | "max") {
		return Err(Error::Validation {
			message: "retrieval.normalization must be one of none or max.".to_string(),
		});
	}
	if !matches!(cfg.ranking.strategy.as_str(), "advantage" | "baseline") {
		return Err(Error::Validation {
			message: "ranking.strategy must be one of advantage or baseline.".to_string(),
		});
	}

	for (label, value) in [
		("ranking.novelty_lambda", cfg.ranking.novelty_lambda),
		("ranking.advantage_alpha", cfg.ranking.advantage_alpha),
		("ranking.default_cf_weight", cfg.ranking.default_cf_weight),
		("ranking.default_semantic_weight", cfg.ranking.default_semantic_weight),
	] {
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if value < 0.0 {
			return Err(Error::Validation { message: format!("{label} must be zero or greater.") });
		}
	}

	if cfg.ranking.final_k == 0 {
		return Err(Error::Validation {
			message: "ranking.final_k must be greater than zero.".to_string(),
		});
	}
	if cfg.critic.top_k == 0 {
		return Err(Error::Validation {
			message: "critic.top_k must be greater than zero.".to_string(),
		});
	}

	for (label, value) in [
		("critic.min_primary_genre_ratio", cfg.critic.min_primary_genre_ratio),
		("critic.popularity_mean_threshold", cfg.critic.popularity_mean_threshold),
		("adjustment.cf_fraction", cfg.adjustment.cf_fraction),
		("adjustment.semantic_fraction", cfg.adjustment.semantic_fraction),
	] {
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if !(0.0..=1.0).contains(&value) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}

	if !matches!(cfg.adjustment.target.as_str(), "cf" | "semantic") {
		return Err(Error::Validation {
			message: "adjustment.target must be one of cf or semantic.".to_string(),
		});
	}
	if cfg.rerank_loop.max_iterations > MAX_ITERATIONS_LIMIT {
		return Err(Error::Validation {
			message: format!("rerank_loop.max_iterations must be at most {MAX_ITERATIONS_LIMIT}."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.catalog.as_ref().map(|catalog| catalog.path.trim().is_empty()).unwrap_or(false) {
		cfg.catalog = None;
	}

	cfg.retrieval.normalization = cfg.retrieval.normalization.trim().to_ascii_lowercase();
	cfg.ranking.strategy = cfg.ranking.strategy.trim().to_ascii_lowercase();
	cfg.adjustment.target = cfg.adjustment.target.trim().to_ascii_lowercase();
}
