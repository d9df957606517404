use std::{collections::HashMap, time::Duration as StdDuration};

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

use driftless_config::ProviderConfig;
use driftless_domain::ItemId;

/// Asks one scoring endpoint for a score per candidate.
///
/// The request body is `{ query_id, query, item_ids }`. Items the endpoint leaves out, or scores
/// with a null or non-finite value, are absent from the returned map.
pub async fn fetch_scores(
	cfg: &ProviderConfig,
	query_id: &str,
	query: Option<&str>,
	item_ids: &[ItemId],
) -> Result<HashMap<ItemId, f32>> {
	let client = Client::builder().timeout(StdDuration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"query_id": query_id,
		"query": query,
		"item_ids": item_ids,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_scores_response(json)
}

pub fn parse_scores_response(json: Value) -> Result<HashMap<ItemId, f32>> {
	let results = json
		.get("results")
		.or_else(|| json.get("data"))
		.and_then(|v| v.as_array())
		.ok_or_else(|| eyre::eyre!("Score response is missing results array."))?;
	let mut scores = HashMap::with_capacity(results.len());

	for item in results {
		let item_id = item
			.get("item_id")
			.and_then(|v| v.as_str())
			.ok_or_else(|| eyre::eyre!("Score result missing item_id."))?;
		let Some(score) = item.get("score").and_then(|v| v.as_f64()).map(|v| v as f32) else {
			continue;
		};

		if score.is_finite() {
			scores.entry(item_id.to_string()).or_insert(score);
		}
	}

	Ok(scores)
}

#[cfg(test)]
mod tests {
	use crate::scores::parse_scores_response;

	#[test]
	fn keys_scores_by_item_id() {
		let json = serde_json::json!({
			"results": [
				{ "item_id": "m-2", "score": 0.2 },
				{ "item_id": "m-1", "score": 0.9 }
			]
		});
		let scores = parse_scores_response(json).expect("Failed to parse scores.");

		assert_eq!(scores.len(), 2);
		assert_eq!(scores.get("m-1"), Some(&0.9));
		assert_eq!(scores.get("m-2"), Some(&0.2));
	}

	#[test]
	fn accepts_data_key_and_skips_missing_scores() {
		let json = serde_json::json!({
			"data": [
				{ "item_id": "m-1", "score": null },
				{ "item_id": "m-2" },
				{ "item_id": "m-3", "score": 0.5 }
			]
		});
		let scores = parse_scores_response(json).expect("Failed to parse scores.");

		assert_eq!(scores.keys().collect::<Vec<_>>(), vec!["m-3"]);
	}

	#[test]
	fn rejects_result_without_item_id() {
		let json = serde_json::json!({ "results": [{ "score": 0.5 }] });

		assert!(parse_scores_response(json).is_err());
	}

	#[test]
	fn rejects_response_without_results() {
		assert!(parse_scores_response(serde_json::json!({ "scores": [] })).is_err());
	}
}
