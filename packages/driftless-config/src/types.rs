use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub catalog: Option<CatalogSource>,
	pub providers: Option<Providers>,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub ranking: Ranking,
	#[serde(default)]
	pub critic: Critic,
	#[serde(default)]
	pub adjustment: Adjustment,
	#[serde(default)]
	pub rerank_loop: RerankLoop,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
	/// Upper bound for one recommendation request. The rerank loop observes it as a cancellation
	/// signal at the top of each iteration.
	#[serde(default = "default_request_timeout_ms")]
	pub request_timeout_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CatalogSource {
	/// JSON file with item tags and either explicit popularity or raw rating counts.
	pub path: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Providers {
	pub cf: ProviderConfig,
	pub semantic: ProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	/// One of `none` or `max`.
	pub normalization: String,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self { normalization: "none".to_string() }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Ranking {
	/// One of `advantage` or `baseline`.
	pub strategy: String,
	pub novelty_lambda: f32,
	pub advantage_alpha: f32,
	/// Used when a request carries no initial weights.
	pub default_cf_weight: f32,
	pub default_semantic_weight: f32,
	pub final_k: u32,
}
impl Default for Ranking {
	fn default() -> Self {
		Self {
			strategy: "advantage".to_string(),
			novelty_lambda: 0.2,
			advantage_alpha: 1.0,
			default_cf_weight: 0.4,
			default_semantic_weight: 0.6,
			final_k: 20,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Critic {
	pub top_k: u32,
	pub min_primary_genre_ratio: f32,
	/// Advisory only. Flags a top-k whose mean popularity exceeds this value.
	pub popularity_mean_threshold: f32,
	/// Advisory only. Flags a top-k with fewer distinct tags than this.
	pub min_unique_tags: u32,
}
impl Default for Critic {
	fn default() -> Self {
		Self {
			top_k: 10,
			min_primary_genre_ratio: 0.4,
			popularity_mean_threshold: 0.65,
			min_unique_tags: 4,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Adjustment {
	/// Signal penalized on drift. One of `cf` or `semantic`; the other signal is boosted.
	pub target: String,
	pub cf_fraction: f32,
	pub semantic_fraction: f32,
}
impl Default for Adjustment {
	fn default() -> Self {
		Self { target: "cf".to_string(), cf_fraction: 0.3, semantic_fraction: 0.3 }
	}
}

/// Upper bound on `max_iterations`, from config or a request override.
pub const MAX_ITERATIONS_LIMIT: u32 = 64;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RerankLoop {
	pub max_iterations: u32,
}
impl Default for RerankLoop {
	fn default() -> Self {
		Self { max_iterations: 3 }
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_request_timeout_ms() -> u64 {
	2_000
}
