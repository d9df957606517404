pub mod error;
pub mod policy;
pub mod request;
pub mod rerank_loop;
pub mod retrieval;

pub use error::{Error, Result};
pub use request::{
	InitialWeights, RecommendRequest, RecommendResponse, RetrievalReport, SourceReport,
	Termination, TraceEntry,
};

use std::{
	collections::HashMap,
	future::Future,
	pin::Pin,
	sync::{Arc, atomic::AtomicBool},
};

use tracing::{info, warn};

use crate::{rerank_loop::LoopInput, retrieval::RetrievalInput};
use driftless_config::{Config, ProviderConfig};
use driftless_domain::{Catalog, ConstraintJudge, ItemId, RankedList, TagSetJudge};
use driftless_providers::scores;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a score source is asked for.
#[derive(Clone, Copy, Debug)]
pub struct ScoreQuery<'a> {
	pub query_id: &'a str,
	pub query: Option<&'a str>,
	pub item_ids: &'a [ItemId],
}

/// One retrieval signal. Scores are expected in a shared, already normalized range.
pub trait ScoreProvider
where
	Self: Send + Sync,
{
	fn provider_id(&self) -> &str;

	fn scores<'a>(
		&'a self,
		query: &'a ScoreQuery<'a>,
	) -> BoxFuture<'a, color_eyre::Result<HashMap<ItemId, f32>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub cf: Arc<dyn ScoreProvider>,
	pub semantic: Arc<dyn ScoreProvider>,
}
impl Providers {
	pub fn new(cf: Arc<dyn ScoreProvider>, semantic: Arc<dyn ScoreProvider>) -> Self {
		Self { cf, semantic }
	}

	pub fn http(cfg: &driftless_config::Providers) -> Self {
		Self {
			cf: Arc::new(HttpScoreProvider::new(cfg.cf.clone())),
			semantic: Arc::new(HttpScoreProvider::new(cfg.semantic.clone())),
		}
	}
}

pub struct HttpScoreProvider {
	cfg: ProviderConfig,
}
impl HttpScoreProvider {
	pub fn new(cfg: ProviderConfig) -> Self {
		Self { cfg }
	}
}
impl ScoreProvider for HttpScoreProvider {
	fn provider_id(&self) -> &str {
		&self.cfg.provider_id
	}

	fn scores<'a>(
		&'a self,
		query: &'a ScoreQuery<'a>,
	) -> BoxFuture<'a, color_eyre::Result<HashMap<ItemId, f32>>> {
		Box::pin(scores::fetch_scores(&self.cfg, query.query_id, query.query, query.item_ids))
	}
}

/// Serves precomputed scores keyed by query id. Used for offline evaluation and tests.
#[derive(Clone, Debug, Default)]
pub struct StaticScoreProvider {
	provider_id: String,
	by_query: HashMap<String, HashMap<ItemId, f32>>,
}
impl StaticScoreProvider {
	pub fn new(provider_id: impl Into<String>) -> Self {
		Self { provider_id: provider_id.into(), by_query: HashMap::new() }
	}

	pub fn with_query(mut self, query_id: impl Into<String>, scores: HashMap<ItemId, f32>) -> Self {
		self.insert(query_id, scores);

		self
	}

	pub fn insert(&mut self, query_id: impl Into<String>, scores: HashMap<ItemId, f32>) {
		self.by_query.insert(query_id.into(), scores);
	}
}
impl ScoreProvider for StaticScoreProvider {
	fn provider_id(&self) -> &str {
		&self.provider_id
	}

	fn scores<'a>(
		&'a self,
		query: &'a ScoreQuery<'a>,
	) -> BoxFuture<'a, color_eyre::Result<HashMap<ItemId, f32>>> {
		let known = self.by_query.get(query.query_id);
		let scores: HashMap<ItemId, f32> = query
			.item_ids
			.iter()
			.filter_map(|item_id| {
				known
					.and_then(|scores| scores.get(item_id))
					.map(|score| (item_id.clone(), *score))
			})
			.collect();

		Box::pin(async move { Ok(scores) })
	}
}

pub struct DriftlessService {
	pub cfg: Config,
	pub catalog: Arc<Catalog>,
	pub providers: Providers,
	pub judge: Arc<dyn ConstraintJudge>,
}
impl DriftlessService {
	pub fn new(cfg: Config, catalog: Catalog, providers: Providers) -> Self {
		Self { cfg, catalog: Arc::new(catalog), providers, judge: Arc::new(TagSetJudge) }
	}

	pub fn with_judge(mut self, judge: Arc<dyn ConstraintJudge>) -> Self {
		self.judge = judge;

		self
	}

	pub async fn recommend(&self, req: RecommendRequest) -> Result<RecommendResponse> {
		self.recommend_with_cancel(req, None).await
	}

	/// Validates the request, gathers scores, and runs the rerank loop.
	///
	/// Only invalid input is an error. Exhaustion, cancellation, degraded retrieval, and an empty
	/// universe all produce a response; `uncertain` tells the caller whether to trust it.
	pub async fn recommend_with_cancel(
		&self,
		req: RecommendRequest,
		cancel: Option<&AtomicBool>,
	) -> Result<RecommendResponse> {
		let policy = policy::resolve_loop_policy(&self.cfg, &req)?;
		let policy_hash = policy::hash_policy_snapshot(&policy::build_policy_snapshot(&policy))?;
		let constraint = req.intent_constraint.normalized();
		let contradictions = constraint.contradictions();

		if !contradictions.is_empty() {
			warn!(
				query_id = req.query_id.as_str(),
				tags = ?contradictions,
				"Intent constraint both requires and forbids tags; no candidate can satisfy it."
			);
		}

		if req.candidate_universe.is_empty() {
			info!(query_id = req.query_id.as_str(), "Empty candidate universe.");

			return Ok(RecommendResponse {
				query_id: req.query_id,
				ranked_list: RankedList::default(),
				uncertain: true,
				termination: Termination::EmptyCandidateUniverse,
				selected_iteration: None,
				specificity: constraint.specificity,
				trace: Vec::new(),
				retrieval: RetrievalReport {
					normalization: policy.normalization.as_str().to_string(),
					cf: SourceReport {
						provider_id: self.providers.cf.provider_id().to_string(),
						..Default::default()
					},
					semantic: SourceReport {
						provider_id: self.providers.semantic.provider_id().to_string(),
						..Default::default()
					},
					..Default::default()
				},
				policy_hash,
			});
		}

		let retrieved = retrieval::retrieve(
			&self.providers,
			&self.catalog,
			RetrievalInput {
				query_id: &req.query_id,
				query: req.query.as_deref(),
				candidate_universe: &req.candidate_universe,
				normalization: policy.normalization,
			},
		)
		.await;
		let outcome = rerank_loop::run(
			&LoopInput {
				query_id: &req.query_id,
				scores: &retrieved.scores,
				constraint: &constraint,
				policy: &policy,
				judge: self.judge.as_ref(),
			},
			cancel,
		);

		info!(
			query_id = req.query_id.as_str(),
			candidates = retrieved.report.candidates,
			degraded = retrieved.report.degraded(),
			termination = outcome.termination.as_str(),
			policy_hash = policy_hash.as_str(),
			"Recommendation served."
		);

		Ok(RecommendResponse {
			query_id: req.query_id,
			ranked_list: outcome.ranked_list.truncated(policy.final_k as usize),
			uncertain: outcome.uncertain,
			termination: outcome.termination,
			selected_iteration: outcome.selected_iteration,
			specificity: constraint.specificity,
			trace: outcome.trace,
			retrieval: retrieved.report,
			policy_hash,
		})
	}
}
