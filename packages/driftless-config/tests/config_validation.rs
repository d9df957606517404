use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use driftless_config::{Config, Error};

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

fn sample_value() -> Value {
	toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.")
}

fn with_key(section: &str, key: &str, value: Value) -> String {
	let mut root = sample_value();
	let table = root
		.as_table_mut()
		.expect("Sample config must be a table.")
		.get_mut(section)
		.and_then(Value::as_table_mut)
		.unwrap_or_else(|| panic!("Sample config must include [{section}]."));

	table.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render sample config.")
}

fn without_section(section: &str) -> String {
	let mut root = sample_value();

	root.as_table_mut().expect("Sample config must be a table.").remove(section);

	toml::to_string(&root).expect("Failed to render sample config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("driftless_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_payload(payload: String) -> driftless_config::Result<Config> {
	let path = write_temp_config(payload);
	let result = driftless_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn expect_validation(payload: String, expected: &str) {
	let err = load_payload(payload).expect_err("Expected validation error.");
	let message = err.to_string();

	assert!(matches!(err, Error::Validation { .. }), "Unexpected error kind: {err:?}");
	assert!(message.contains(expected), "Unexpected error message: {message}");
}

#[test]
fn sample_config_loads() {
	let cfg = load_payload(SAMPLE_CONFIG_TOML.to_string()).expect("Sample config must load.");

	assert_eq!(cfg.service.request_timeout_ms, 2_000);
	assert_eq!(cfg.retrieval.normalization, "max");
	assert_eq!(cfg.critic.top_k, 10);
	assert_eq!(cfg.adjustment.target, "cf");
	assert!(cfg.providers.is_some());
	assert_eq!(cfg.catalog.as_ref().map(|catalog| catalog.path.as_str()), Some("data/catalog.json"));
}

#[test]
fn omitted_sections_fall_back_to_documented_defaults() {
	let mut root = sample_value();
	let table = root.as_table_mut().expect("Sample config must be a table.");

	for section in ["retrieval", "ranking", "critic", "adjustment", "rerank_loop"] {
		table.remove(section);
	}

	let payload = toml::to_string(&root).expect("Failed to render sample config.");
	let cfg = load_payload(payload).expect("Config without tuning sections must load.");

	assert_eq!(cfg.retrieval.normalization, "none");
	assert_eq!(cfg.ranking.strategy, "advantage");
	assert_eq!(cfg.ranking.novelty_lambda, 0.2);
	assert_eq!(cfg.ranking.advantage_alpha, 1.0);
	assert_eq!(cfg.ranking.final_k, 20);
	assert_eq!(cfg.critic.min_primary_genre_ratio, 0.4);
	assert_eq!(cfg.adjustment.cf_fraction, 0.3);
	assert_eq!(cfg.adjustment.semantic_fraction, 0.3);
	assert_eq!(cfg.rerank_loop.max_iterations, 3);
}

#[test]
fn providers_and_catalog_are_optional() {
	let payload = {
		let mut root: Value =
			toml::from_str(&without_section("providers")).expect("Failed to parse config.");

		root.as_table_mut().expect("Config must be a table.").remove("catalog");

		toml::to_string(&root).expect("Failed to render config.")
	};
	let cfg = load_payload(payload).expect("Config without providers must load.");

	assert!(cfg.providers.is_none());
	assert!(cfg.catalog.is_none());
}

#[test]
fn blank_catalog_path_is_dropped() {
	let payload = with_key("catalog", "path", Value::String("   ".to_string()));
	let cfg = load_payload(payload).expect("Config must load.");

	assert!(cfg.catalog.is_none());
}

#[test]
fn enum_like_keys_are_normalized_before_validation() {
	let payload = with_key("ranking", "strategy", Value::String(" Baseline ".to_string()));
	let cfg = load_payload(payload).expect("Config must load.");

	assert_eq!(cfg.ranking.strategy, "baseline");
}

#[test]
fn negative_novelty_lambda_is_rejected() {
	expect_validation(
		with_key("ranking", "novelty_lambda", Value::Float(-0.1)),
		"ranking.novelty_lambda must be zero or greater.",
	);
}

#[test]
fn negative_advantage_alpha_is_rejected() {
	expect_validation(
		with_key("ranking", "advantage_alpha", Value::Float(-1.0)),
		"ranking.advantage_alpha must be zero or greater.",
	);
}

#[test]
fn non_finite_default_weight_is_rejected() {
	expect_validation(
		with_key("ranking", "default_cf_weight", Value::Float(f64::NAN)),
		"ranking.default_cf_weight must be a finite number.",
	);
}

#[test]
fn zero_top_k_is_rejected() {
	expect_validation(
		with_key("critic", "top_k", Value::Integer(0)),
		"critic.top_k must be greater than zero.",
	);
}

#[test]
fn ratio_outside_unit_range_is_rejected() {
	expect_validation(
		with_key("critic", "min_primary_genre_ratio", Value::Float(1.5)),
		"critic.min_primary_genre_ratio must be in the range 0.0-1.0.",
	);
}

#[test]
fn adjustment_fraction_outside_unit_range_is_rejected() {
	expect_validation(
		with_key("adjustment", "cf_fraction", Value::Float(1.2)),
		"adjustment.cf_fraction must be in the range 0.0-1.0.",
	);
}

#[test]
fn unknown_adjustment_target_is_rejected() {
	expect_validation(
		with_key("adjustment", "target", Value::String("popularity".to_string())),
		"adjustment.target must be one of cf or semantic.",
	);
}

#[test]
fn unknown_normalization_is_rejected() {
	expect_validation(
		with_key("retrieval", "normalization", Value::String("zscore".to_string())),
		"retrieval.normalization must be one of none or max.",
	);
}

#[test]
fn oversized_iteration_budget_is_rejected() {
	expect_validation(
		with_key("rerank_loop", "max_iterations", Value::Integer(i64::from(u32::MAX))),
		"rerank_loop.max_iterations must be at most 64.",
	);
}

#[test]
fn iteration_budget_at_limit_loads() {
	let payload = with_key(
		"rerank_loop",
		"max_iterations",
		Value::Integer(i64::from(driftless_config::MAX_ITERATIONS_LIMIT)),
	);
	let cfg = load_payload(payload).expect("Budget at the limit must load.");

	assert_eq!(cfg.rerank_loop.max_iterations, driftless_config::MAX_ITERATIONS_LIMIT);
}

#[test]
fn zero_request_timeout_is_rejected() {
	expect_validation(
		with_key("service", "request_timeout_ms", Value::Integer(0)),
		"service.request_timeout_ms must be greater than zero.",
	);
}

#[test]
fn blank_provider_key_is_rejected() {
	let mut root = sample_value();
	let cf = root
		.get_mut("providers")
		.and_then(|providers| providers.get_mut("cf"))
		.and_then(Value::as_table_mut)
		.expect("Sample config must include [providers.cf].");

	cf.insert("api_key".to_string(), Value::String(" ".to_string()));

	expect_validation(
		toml::to_string(&root).expect("Failed to render config."),
		"Provider cf api_key must be non-empty.",
	);
}

#[test]
fn missing_file_reports_read_error() {
	let path = env::temp_dir().join("driftless_config_test_missing.toml");
	let err = driftless_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }));
}

#[test]
fn malformed_toml_reports_parse_error() {
	let err = load_payload("[service\n".to_string()).expect_err("Expected parse error.");

	assert!(matches!(err, Error::ParseConfig { .. }));
}
