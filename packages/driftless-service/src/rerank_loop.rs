use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::{
	policy::ResolvedLoopPolicy,
	request::{Termination, TraceEntry},
};
use driftless_domain::{
	ConstraintJudge, DriftReport, IntentConstraint, RankedList, RankingWeights, ScoreVector, adjust,
	critique, rank,
};

pub struct LoopInput<'a> {
	pub query_id: &'a str,
	pub scores: &'a [ScoreVector],
	pub constraint: &'a IntentConstraint,
	pub policy: &'a ResolvedLoopPolicy,
	pub judge: &'a dyn ConstraintJudge,
}

#[derive(Clone, Debug)]
pub struct LoopOutcome {
	pub ranked_list: RankedList,
	pub uncertain: bool,
	pub termination: Termination,
	pub selected_iteration: Option<u32>,
	pub trace: Vec<TraceEntry>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Phase {
	Ranking,
	Critiquing,
	Adjusting,
	Converged,
	Exhausted,
	Cancelled,
}
impl Phase {
	fn as_str(self) -> &'static str {
		match self {
			Self::Ranking => "ranking",
			Self::Critiquing => "critiquing",
			Self::Adjusting => "adjusting",
			Self::Converged => "converged",
			Self::Exhausted => "exhausted",
			Self::Cancelled => "cancelled",
		}
	}
}

struct Attempt {
	iteration: u32,
	weights: RankingWeights,
	list: RankedList,
	report: DriftReport,
}

struct LoopState {
	iteration: u32,
	weights: RankingWeights,
	pending: Option<RankedList>,
	history: Vec<Attempt>,
}

/// Ranks, critiques, and corrects weights until the constraint holds or the budget runs out.
///
/// At most `max_iterations + 1` rankings run. `cancel` is checked before each ranking; once
/// raised, the loop stops and selects from what it already has.
pub fn run(input: &LoopInput<'_>, cancel: Option<&AtomicBool>) -> LoopOutcome {
	let policy = input.policy;
	let mut state = LoopState {
		iteration: 0,
		weights: policy.initial_weights,
		pending: None,
		history: Vec::new(),
	};
	let mut phase = Phase::Ranking;

	loop {
		let next = match phase {
			Phase::Ranking =>
				if is_cancelled(cancel) {
					Phase::Cancelled
				} else {
					state.pending = Some(rank(input.scores, &state.weights, policy.strategy));

					Phase::Critiquing
				},
			Phase::Critiquing => {
				let list = state.pending.take().unwrap_or_default();
				let report =
					critique(&list, input.scores, input.constraint, &policy.critic, input.judge);
				let drifted = report.drifted;

				state.history.push(Attempt {
					iteration: state.iteration,
					weights: state.weights,
					list,
					report,
				});

				if !drifted {
					Phase::Converged
				} else if state.iteration >= policy.max_iterations {
					Phase::Exhausted
				} else {
					Phase::Adjusting
				}
			},
			Phase::Adjusting => {
				if let Some(last) = state.history.last() {
					state.weights = adjust(&state.weights, &last.report, &policy.adjustment);
				}

				state.iteration += 1;

				Phase::Ranking
			},
			Phase::Converged | Phase::Exhausted | Phase::Cancelled => break,
		};

		debug!(
			query_id = input.query_id,
			iteration = state.iteration,
			from = phase.as_str(),
			to = next.as_str(),
			cf_weight = state.weights.cf_weight,
			semantic_weight = state.weights.semantic_weight,
			"Rerank loop transition."
		);

		phase = next;
	}

	let outcome = finish(phase, state.history);

	info!(
		query_id = input.query_id,
		termination = outcome.termination.as_str(),
		iterations = outcome.trace.len(),
		selected_iteration = outcome.selected_iteration,
		uncertain = outcome.uncertain,
		"Rerank loop finished."
	);

	outcome
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
	cancel.map(|flag| flag.load(Ordering::Relaxed)).unwrap_or(false)
}

fn finish(phase: Phase, history: Vec<Attempt>) -> LoopOutcome {
	let (termination, selected) = match phase {
		Phase::Converged => (Termination::Converged, history.len().checked_sub(1)),
		Phase::Cancelled => (Termination::Cancelled, least_deficit(&history)),
		_ => (Termination::Exhausted, least_deficit(&history)),
	};
	let uncertain = termination != Termination::Converged;
	let selected_iteration = selected.map(|idx| history[idx].iteration);
	let ranked_list = selected.map(|idx| history[idx].list.clone()).unwrap_or_default();
	let trace = history
		.into_iter()
		.map(|attempt| TraceEntry {
			iteration: attempt.iteration,
			weights_used: attempt.weights,
			top_item: attempt.list.first().map(|item| item.item_id.clone()),
			drift_report: attempt.report,
		})
		.collect();

	LoopOutcome { ranked_list, uncertain, termination, selected_iteration, trace }
}

/// Index of the attempt closest to the threshold; the earliest wins a tie.
fn least_deficit(history: &[Attempt]) -> Option<usize> {
	let mut best: Option<(usize, f32)> = None;

	for (idx, attempt) in history.iter().enumerate() {
		let deficit = attempt.report.deficit();

		match best {
			Some((_, best_deficit)) if deficit >= best_deficit => {},
			_ => best = Some((idx, deficit)),
		}
	}

	best.map(|(idx, _)| idx)
}
