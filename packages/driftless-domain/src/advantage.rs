use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::score::{ItemId, RankingWeights, ScoreVector, saturating_count};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingStrategy {
	/// `advantage_alpha * relevance - novelty_lambda * popularity`.
	#[default]
	Advantage,
	/// Plain linear fusion of the two signals, with no popularity penalty.
	Baseline,
}
impl RankingStrategy {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Advantage => "advantage",
			Self::Baseline => "baseline",
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
	pub item_id: ItemId,
	pub advantage_score: f32,
	pub rank: u32,
	pub relevance: f32,
	pub popularity_penalty: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankedList {
	pub items: Vec<RankedItem>,
}
impl RankedList {
	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn top(&self, k: usize) -> &[RankedItem] {
		&self.items[..k.min(self.items.len())]
	}

	pub fn first(&self) -> Option<&RankedItem> {
		self.items.first()
	}

	pub fn item_ids(&self) -> Vec<&str> {
		self.items.iter().map(|item| item.item_id.as_str()).collect()
	}

	pub fn truncated(&self, k: usize) -> Self {
		Self { items: self.top(k).to_vec() }
	}
}

pub fn relevance(score: &ScoreVector, weights: &RankingWeights) -> f32 {
	weights.cf_weight * score.cf_score + weights.semantic_weight * score.semantic_score
}

/// Scores every item and orders them by descending advantage, ties by ascending item id.
///
/// Weights are taken as given. Negative or otherwise odd weights are not rejected here.
pub fn rank(
	scores: &[ScoreVector],
	weights: &RankingWeights,
	strategy: RankingStrategy,
) -> RankedList {
	let mut items: Vec<RankedItem> =
		scores.iter().map(|score| score_item(score, weights, strategy)).collect();

	items.sort_by(|left, right| {
		cmp_f32_desc(left.advantage_score, right.advantage_score)
			.then_with(|| left.item_id.cmp(&right.item_id))
	});

	for (idx, item) in items.iter_mut().enumerate() {
		item.rank = saturating_count(idx + 1);
	}

	RankedList { items }
}

/// Descending order with NaN sorted last.
pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

fn score_item(score: &ScoreVector, weights: &RankingWeights, strategy: RankingStrategy) -> RankedItem {
	let relevance = relevance(score, weights);
	let (advantage_score, popularity_penalty) = match strategy {
		RankingStrategy::Advantage => {
			let penalty = weights.novelty_lambda * score.popularity;

			(weights.advantage_alpha * relevance - penalty, penalty)
		},
		RankingStrategy::Baseline => (relevance, 0.0),
	};

	RankedItem {
		item_id: score.item_id.clone(),
		advantage_score,
		rank: 0,
		relevance,
		popularity_penalty,
	}
}

#[cfg(test)]
mod tests {
	use std::cmp::Ordering;

	use crate::{
		advantage::{RankingStrategy, cmp_f32_desc, rank},
		score::{RankingWeights, ScoreVector},
	};

	fn item(id: &str, cf: f32, sem: f32, pop: f32) -> ScoreVector {
		ScoreVector {
			item_id: id.to_string(),
			cf_score: cf,
			semantic_score: sem,
			popularity: pop,
			tags: Default::default(),
		}
	}

	fn weights(cf: f32, sem: f32, lambda: f32, alpha: f32) -> RankingWeights {
		RankingWeights {
			cf_weight: cf,
			semantic_weight: sem,
			novelty_lambda: lambda,
			advantage_alpha: alpha,
		}
	}

	#[test]
	fn empty_input_yields_empty_list() {
		let list = rank(&[], &weights(0.5, 0.5, 0.2, 1.0), RankingStrategy::Advantage);

		assert!(list.is_empty());
	}

	#[test]
	fn popularity_penalty_lifts_niche_item() {
		let scores = [item("a", 0.9, 0.1, 0.95), item("b", 0.2, 0.8, 0.1)];
		let list = rank(&scores, &weights(0.7, 0.3, 0.5, 1.0), RankingStrategy::Advantage);

		assert_eq!(list.item_ids(), vec!["b", "a"]);
		assert!((list.items[0].advantage_score - 0.33).abs() < 1e-5);
		assert!((list.items[1].advantage_score - 0.185).abs() < 1e-5);
		assert!((list.items[1].popularity_penalty - 0.475).abs() < 1e-5);
	}

	#[test]
	fn baseline_ignores_popularity() {
		let scores = [item("a", 0.9, 0.1, 0.95), item("b", 0.2, 0.8, 0.1)];
		let list = rank(&scores, &weights(0.7, 0.3, 0.5, 1.0), RankingStrategy::Baseline);

		assert_eq!(list.item_ids(), vec!["a", "b"]);
		assert_eq!(list.items[0].popularity_penalty, 0.0);
		assert_eq!(list.items[0].advantage_score, list.items[0].relevance);
	}

	#[test]
	fn negative_advantage_is_kept() {
		let scores = [item("a", 0.0, 0.0, 1.0)];
		let list = rank(&scores, &weights(0.5, 0.5, 0.3, 1.0), RankingStrategy::Advantage);

		assert_eq!(list.len(), 1);
		assert!(list.items[0].advantage_score < 0.0);
	}

	#[test]
	fn ranks_are_one_based_and_contiguous() {
		let scores = [item("c", 0.1, 0.1, 0.0), item("a", 0.9, 0.9, 0.0), item("b", 0.5, 0.5, 0.0)];
		let list = rank(&scores, &weights(0.5, 0.5, 0.0, 1.0), RankingStrategy::Advantage);
		let ranks: Vec<u32> = list.items.iter().map(|item| item.rank).collect();

		assert_eq!(ranks, vec![1, 2, 3]);
		assert_eq!(list.item_ids(), vec!["a", "b", "c"]);
	}

	#[test]
	fn nan_sorts_last() {
		assert_eq!(cmp_f32_desc(f32::NAN, 0.1), Ordering::Greater);
		assert_eq!(cmp_f32_desc(0.1, f32::NAN), Ordering::Less);
		assert_eq!(cmp_f32_desc(0.2, 0.1), Ordering::Less);
	}

	#[test]
	fn truncation_keeps_prefix() {
		let scores = [item("a", 0.9, 0.9, 0.0), item("b", 0.5, 0.5, 0.0), item("c", 0.1, 0.1, 0.0)];
		let list = rank(&scores, &weights(0.5, 0.5, 0.0, 1.0), RankingStrategy::Advantage);

		assert_eq!(list.truncated(2).item_ids(), vec!["a", "b"]);
		assert_eq!(list.truncated(10).len(), 3);
	}
}
