use std::{
	collections::HashMap,
	fs,
	path::{Path, PathBuf},
	sync::Arc,
	time::Instant,
};

use clap::Parser;
use color_eyre::eyre::{self, WrapErr};
use serde::{Deserialize, Serialize};

use driftless_config::Config;
use driftless_domain::{Catalog, CatalogEntry, IntentConstraint, ItemId};
use driftless_service::{
	DriftlessService, InitialWeights, Providers, RecommendRequest, RecommendResponse,
	StaticScoreProvider, Termination,
};

#[derive(Debug, Parser)]
#[command(
	version = driftless_cli::VERSION,
	rename_all = "kebab",
	styles = driftless_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long, short = 'd', value_name = "FILE")]
	pub dataset: PathBuf,
	/// Overrides the ranking strategy for every query, e.g. `baseline` for an A/B run.
	#[arg(long, value_name = "NAME")]
	pub strategy: Option<String>,
	#[arg(long, value_name = "N")]
	pub max_iterations: Option<u32>,
	#[arg(long, value_name = "N")]
	pub top_k: Option<u32>,
}

/// Command-line overrides applied to every query.
#[derive(Clone, Debug, Default)]
pub struct EvalOverrides {
	pub strategy: Option<String>,
	pub max_iterations: Option<u32>,
	pub top_k: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct EvalDataset {
	pub name: Option<String>,
	/// Catalog rows. When absent, the catalog configured in `[catalog]` is used.
	#[serde(default)]
	pub items: Option<Vec<CatalogEntry>>,
	pub queries: Vec<EvalQuery>,
}

#[derive(Debug, Deserialize)]
pub struct EvalQuery {
	pub id: String,
	pub query: Option<String>,
	#[serde(default)]
	pub intent_constraint: IntentConstraint,
	pub initial_weights: Option<InitialWeights>,
	pub min_primary_genre_ratio: Option<f32>,
	pub candidates: Vec<EvalCandidate>,
}

/// One candidate with the scores each source would return. A missing score models a source that
/// omitted the item.
#[derive(Debug, Deserialize)]
pub struct EvalCandidate {
	pub item_id: ItemId,
	pub cf_score: Option<f32>,
	pub semantic_score: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct EvalOutput {
	pub dataset: EvalDatasetInfo,
	pub settings: EvalSettings,
	pub summary: EvalSummary,
	pub queries: Vec<QueryReport>,
}

#[derive(Debug, Serialize)]
pub struct EvalDatasetInfo {
	pub name: String,
	pub query_count: usize,
	pub catalog_items: usize,
}

#[derive(Debug, Serialize)]
pub struct EvalSettings {
	pub strategy: String,
	pub max_iterations: u32,
	pub top_k: u32,
	/// Threshold for queries that do not set their own; see `QueryReport::min_primary_genre_ratio`.
	pub default_min_primary_genre_ratio: f32,
}

#[derive(Debug, Default, Serialize)]
pub struct EvalSummary {
	pub converged: usize,
	pub exhausted: usize,
	pub cancelled: usize,
	pub empty: usize,
	pub mean_iterations: f64,
	/// Mean of final minus first primary-genre ratio.
	pub mean_ratio_lift: f64,
	/// Mean of first minus final top-k popularity.
	pub mean_popularity_reduction: f64,
	pub latency_ms_p50: f64,
	pub latency_ms_p95: f64,
}

#[derive(Debug, Serialize)]
pub struct QueryReport {
	pub id: String,
	pub termination: Termination,
	pub uncertain: bool,
	pub iterations: usize,
	pub selected_iteration: Option<u32>,
	/// Threshold the query actually ran with.
	pub min_primary_genre_ratio: f32,
	pub first_primary_ratio: Option<f32>,
	pub final_primary_ratio: Option<f32>,
	pub first_mean_popularity: Option<f32>,
	pub final_mean_popularity: Option<f32>,
	pub top_items: Vec<ItemId>,
	pub policy_hash: String,
	pub latency_ms: f64,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = driftless_config::load(&args.config)?;

	driftless_cli::init_tracing(&config.service.log_level);

	let dataset = load_dataset(&args.dataset)?;
	let overrides = EvalOverrides {
		strategy: args.strategy,
		max_iterations: args.max_iterations,
		top_k: args.top_k,
	};
	let output = evaluate(config, &dataset, &overrides).await?;
	let json = serde_json::to_string_pretty(&output)?;

	println!("{json}");

	Ok(())
}

pub fn load_dataset(path: &Path) -> color_eyre::Result<EvalDataset> {
	let raw = fs::read_to_string(path)
		.wrap_err_with(|| format!("Failed to read dataset at {}.", path.display()))?;
	let dataset: EvalDataset = serde_json::from_str(&raw)?;

	if dataset.queries.is_empty() {
		return Err(eyre::eyre!("Dataset must include at least one query."));
	}

	Ok(dataset)
}

pub async fn evaluate(
	config: Config,
	dataset: &EvalDataset,
	overrides: &EvalOverrides,
) -> color_eyre::Result<EvalOutput> {
	let catalog = match (&dataset.items, config.catalog.as_ref()) {
		(Some(items), _) => Catalog::from_entries(items.clone()),
		(None, Some(source)) => driftless_providers::catalog::load(Path::new(&source.path))?,
		(None, None) => {
			tracing::warn!("Dataset carries no items and no catalog is configured.");

			Catalog::default()
		},
	};
	let settings = EvalSettings {
		strategy: overrides.strategy.clone().unwrap_or_else(|| config.ranking.strategy.clone()),
		max_iterations: overrides.max_iterations.unwrap_or(config.rerank_loop.max_iterations),
		top_k: overrides.top_k.unwrap_or(config.critic.top_k),
		default_min_primary_genre_ratio: config.critic.min_primary_genre_ratio,
	};
	let info = EvalDatasetInfo {
		name: dataset.name.clone().unwrap_or_else(|| "unnamed".to_string()),
		query_count: dataset.queries.len(),
		catalog_items: catalog.len(),
	};
	let service = DriftlessService::new(config, catalog, static_providers(dataset));
	let mut reports = Vec::with_capacity(dataset.queries.len());
	let mut latencies_ms = Vec::with_capacity(dataset.queries.len());

	for query in &dataset.queries {
		let started = Instant::now();
		let response = service
			.recommend(build_request(query, overrides))
			.await
			.wrap_err_with(|| format!("Query {} was rejected.", query.id))?;
		let latency_ms = started.elapsed().as_secs_f64() * 1_000.0;

		let min_ratio =
			query.min_primary_genre_ratio.unwrap_or(settings.default_min_primary_genre_ratio);

		latencies_ms.push(latency_ms);
		reports.push(report_query(&query.id, &response, min_ratio, latency_ms));
	}

	let summary = summarize(&reports, &latencies_ms);

	Ok(EvalOutput { dataset: info, settings, summary, queries: reports })
}

fn static_providers(dataset: &EvalDataset) -> Providers {
	let mut cf = StaticScoreProvider::new("dataset_cf");
	let mut semantic = StaticScoreProvider::new("dataset_semantic");

	for query in &dataset.queries {
		let pick = |select: fn(&EvalCandidate) -> Option<f32>| -> HashMap<ItemId, f32> {
			query
				.candidates
				.iter()
				.filter_map(|candidate| {
					select(candidate).map(|score| (candidate.item_id.clone(), score))
				})
				.collect()
		};

		cf.insert(query.id.clone(), pick(|candidate| candidate.cf_score));
		semantic.insert(query.id.clone(), pick(|candidate| candidate.semantic_score));
	}

	Providers::new(Arc::new(cf), Arc::new(semantic))
}

fn build_request(query: &EvalQuery, overrides: &EvalOverrides) -> RecommendRequest {
	RecommendRequest {
		query_id: query.id.clone(),
		query: query.query.clone(),
		candidate_universe: query
			.candidates
			.iter()
			.map(|candidate| candidate.item_id.clone())
			.collect(),
		intent_constraint: query.intent_constraint.clone(),
		initial_weights: query.initial_weights,
		min_primary_genre_ratio: query.min_primary_genre_ratio,
		max_iterations: overrides.max_iterations,
		top_k: overrides.top_k,
		strategy: overrides.strategy.clone(),
		..Default::default()
	}
}

fn report_query(
	id: &str,
	response: &RecommendResponse,
	min_primary_genre_ratio: f32,
	latency_ms: f64,
) -> QueryReport {
	let first = response.trace.first().map(|entry| &entry.drift_report);
	let selected = response.selected_iteration.and_then(|iteration| {
		response
			.trace
			.iter()
			.find(|entry| entry.iteration == iteration)
			.map(|entry| &entry.drift_report)
	});

	QueryReport {
		id: id.to_string(),
		termination: response.termination,
		uncertain: response.uncertain,
		iterations: response.trace.len(),
		selected_iteration: response.selected_iteration,
		min_primary_genre_ratio,
		first_primary_ratio: first.map(|report| report.primary_genre_ratio),
		final_primary_ratio: selected.map(|report| report.primary_genre_ratio),
		first_mean_popularity: first.map(|report| report.mean_popularity),
		final_mean_popularity: selected.map(|report| report.mean_popularity),
		top_items: response.ranked_list.items.iter().map(|item| item.item_id.clone()).collect(),
		policy_hash: response.policy_hash.clone(),
		latency_ms,
	}
}

fn summarize(reports: &[QueryReport], latencies_ms: &[f64]) -> EvalSummary {
	let mut summary = EvalSummary::default();

	for report in reports {
		match report.termination {
			Termination::Converged => summary.converged += 1,
			Termination::Exhausted => summary.exhausted += 1,
			Termination::Cancelled => summary.cancelled += 1,
			Termination::EmptyCandidateUniverse => summary.empty += 1,
		}
	}

	let ranked: Vec<&QueryReport> = reports.iter().filter(|report| report.iterations > 0).collect();
	let count = ranked.len().max(1) as f64;

	summary.mean_iterations =
		ranked.iter().map(|report| report.iterations as f64).sum::<f64>() / count;
	summary.mean_ratio_lift = ranked
		.iter()
		.map(|report| delta(report.final_primary_ratio, report.first_primary_ratio))
		.sum::<f64>()
		/ count;
	summary.mean_popularity_reduction = ranked
		.iter()
		.map(|report| delta(report.first_mean_popularity, report.final_mean_popularity))
		.sum::<f64>()
		/ count;

	let mut sorted = latencies_ms.to_vec();

	sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

	summary.latency_ms_p50 = percentile(&sorted, 0.50);
	summary.latency_ms_p95 = percentile(&sorted, 0.95);

	summary
}

fn delta(minuend: Option<f32>, subtrahend: Option<f32>) -> f64 {
	match (minuend, subtrahend) {
		(Some(a), Some(b)) => (a - b) as f64,
		_ => 0.0,
	}
}

fn percentile(values: &[f64], percentile: f64) -> f64 {
	if values.is_empty() {
		return 0.0;
	}

	let clamped = percentile.clamp(0.0, 1.0);
	let pos = clamped * (values.len() as f64 - 1.0);
	let lower = pos.floor() as usize;
	let upper = pos.ceil() as usize;

	if lower == upper {
		values[lower]
	} else {
		let weight = pos - lower as f64;

		values[lower] * (1.0 - weight) + values[upper] * weight
	}
}
