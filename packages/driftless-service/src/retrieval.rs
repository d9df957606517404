use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::{
	Providers, ScoreQuery,
	policy::Normalization,
	request::{RetrievalReport, SourceReport},
};
use driftless_domain::{Catalog, ItemId, ScoreVector, saturating_count};

pub struct RetrievalInput<'a> {
	pub query_id: &'a str,
	pub query: Option<&'a str>,
	pub candidate_universe: &'a [ItemId],
	pub normalization: Normalization,
}

#[derive(Debug)]
pub struct Retrieved {
	/// One vector per distinct candidate, in first-seen universe order.
	pub scores: Vec<ScoreVector>,
	pub report: RetrievalReport,
}

/// Gathers both signals for the universe and joins them with catalog metadata.
///
/// The two sources are queried concurrently. Neither a failed source nor a missing score aborts
/// the request: the gap is filled with zero and recorded in the report.
pub async fn retrieve(
	providers: &Providers,
	catalog: &Catalog,
	input: RetrievalInput<'_>,
) -> Retrieved {
	let (item_ids, duplicates_dropped) = dedupe(input.candidate_universe);
	let query = ScoreQuery { query_id: input.query_id, query: input.query, item_ids: &item_ids };
	let (cf_result, semantic_result) =
		tokio::join!(providers.cf.scores(&query), providers.semantic.scores(&query));
	let (mut cf_scores, mut cf_report) = settle(providers.cf.provider_id(), cf_result, "cf");
	let (mut semantic_scores, mut semantic_report) =
		settle(providers.semantic.provider_id(), semantic_result, "semantic");

	if input.normalization == Normalization::Max {
		max_normalize(&mut cf_scores, &item_ids);
		max_normalize(&mut semantic_scores, &item_ids);
	}

	let mut missing_metadata = 0_u32;
	let mut scores = Vec::with_capacity(item_ids.len());

	for item_id in item_ids {
		let cf_score = take_score(&cf_scores, &item_id, &mut cf_report);
		let semantic_score = take_score(&semantic_scores, &item_id, &mut semantic_report);
		let (popularity, tags) = match catalog.get(&item_id) {
			Some(meta) => (meta.popularity, meta.tags.clone()),
			None => {
				missing_metadata = missing_metadata.saturating_add(1);

				(0.0, Default::default())
			},
		};

		scores.push(ScoreVector { item_id, cf_score, semantic_score, popularity, tags });
	}

	if missing_metadata > 0 {
		warn!(
			query_id = input.query_id,
			missing_metadata,
			"Candidates missing catalog metadata; using zero popularity and no tags."
		);
	}
	for source in [&cf_report, &semantic_report] {
		if !source.failed && source.missing_scores > 0 {
			warn!(
				query_id = input.query_id,
				provider_id = source.provider_id.as_str(),
				missing_scores = source.missing_scores,
				"Score source omitted candidates; using zero scores."
			);
		}
	}

	let report = RetrievalReport {
		candidates: saturating_count(scores.len()),
		duplicates_dropped,
		missing_metadata,
		normalization: input.normalization.as_str().to_string(),
		cf: cf_report,
		semantic: semantic_report,
	};

	Retrieved { scores, report }
}

fn dedupe(universe: &[ItemId]) -> (Vec<ItemId>, u32) {
	let mut seen = HashSet::with_capacity(universe.len());
	let mut out = Vec::with_capacity(universe.len());

	for item_id in universe {
		if seen.insert(item_id.as_str()) {
			out.push(item_id.clone());
		}
	}

	let dropped = saturating_count(universe.len() - out.len());

	(out, dropped)
}

fn settle(
	provider_id: &str,
	result: color_eyre::Result<HashMap<ItemId, f32>>,
	source: &'static str,
) -> (HashMap<ItemId, f32>, SourceReport) {
	match result {
		Ok(mut scores) => {
			scores.retain(|_, score| score.is_finite());

			(scores, SourceReport { provider_id: provider_id.to_string(), ..Default::default() })
		},
		Err(err) => {
			warn!(
				error = %err,
				source,
				provider_id,
				"Score source failed; falling back to zero scores."
			);

			(
				HashMap::new(),
				SourceReport {
					provider_id: provider_id.to_string(),
					failed: true,
					missing_scores: 0,
					error: Some(err.to_string()),
				},
			)
		},
	}
}

fn take_score(scores: &HashMap<ItemId, f32>, item_id: &str, report: &mut SourceReport) -> f32 {
	match scores.get(item_id) {
		Some(score) => *score,
		None => {
			report.missing_scores = report.missing_scores.saturating_add(1);

			0.0
		},
	}
}

fn max_normalize(scores: &mut HashMap<ItemId, f32>, item_ids: &[ItemId]) {
	let max = item_ids
		.iter()
		.filter_map(|item_id| scores.get(item_id))
		.copied()
		.fold(f32::NEG_INFINITY, f32::max);

	if max > 0.0 {
		for score in scores.values_mut() {
			*score /= max;
		}
	}
}
