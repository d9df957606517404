use std::{
	env, fs,
	time::{SystemTime, UNIX_EPOCH},
};

use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};

#[test]
fn builds_bearer_auth_header() {
	let headers = driftless_providers::auth_headers("secret", &Map::new())
		.expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn merges_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("x-tenant".to_string(), Value::String("films".to_string()));

	let headers =
		driftless_providers::auth_headers("secret", &defaults).expect("Failed to build headers.");

	assert_eq!(headers.get("x-tenant").expect("Missing tenant header."), "films");
}

#[test]
fn rejects_non_string_default_header() {
	let mut defaults = Map::new();

	defaults.insert("x-retries".to_string(), Value::from(3));

	assert!(driftless_providers::auth_headers("secret", &defaults).is_err());
}

#[test]
fn loads_catalog_from_file() {
	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be after the epoch.")
		.as_nanos();
	let path = env::temp_dir().join(format!("driftless_catalog_{nanos}.json"));
	let payload = serde_json::json!({
		"items": [
			{ "item_id": "m-1", "tags": ["Horror", "Sci-Fi"], "rating_count": 40 },
			{ "item_id": "m-2", "tags": ["comedy"], "rating_count": 160 },
			{ "item_id": "m-3", "popularity": 0.05 }
		]
	});

	fs::write(&path, payload.to_string()).expect("Failed to write catalog.");

	let catalog = driftless_providers::catalog::load(&path).expect("Failed to load catalog.");

	fs::remove_file(&path).expect("Failed to remove catalog.");

	let first = catalog.get("m-1").expect("Missing m-1.");

	assert_eq!(catalog.len(), 3);
	assert_eq!(first.popularity, 0.25);
	assert!(first.tags.contains("sci-fi"));
	assert_eq!(catalog.get("m-3").map(|meta| meta.popularity), Some(0.05));
}

#[test]
fn missing_catalog_reports_path() {
	let path = env::temp_dir().join("driftless_catalog_missing.json");
	let err = driftless_providers::catalog::load(&path).expect_err("Expected missing file error.");

	assert!(format!("{err}").contains("driftless_catalog_missing.json"));
}

#[tokio::test]
async fn unreachable_endpoint_is_an_error() {
	let cfg = driftless_config::ProviderConfig {
		provider_id: "cf".to_string(),
		api_base: "http://127.0.0.1:9".to_string(),
		api_key: "secret".to_string(),
		path: "/v1/scores".to_string(),
		timeout_ms: 200,
		default_headers: Map::new(),
	};
	let result = driftless_providers::scores::fetch_scores(
		&cfg,
		"q-1",
		Some("scary space movies"),
		&["m-1".to_string()],
	)
	.await;

	assert!(result.is_err());
}
