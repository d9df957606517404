use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::{
	advantage::RankedList,
	constraint::{ConstraintJudge, IntentConstraint},
	score::{ItemId, ScoreVector, saturating_count},
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CriticSettings {
	pub top_k: u32,
	pub min_primary_genre_ratio: f32,
	pub popularity_mean_threshold: Option<f32>,
	pub min_unique_tags: Option<u32>,
}

/// Observations about the top-k that never change `drifted`. They are surfaced for explanation
/// only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriftAdvisory {
	PopularityTooHigh { mean_popularity: f32, threshold: f32 },
	TagDiversityTooLow { unique_tags: u32, min_unique_tags: u32 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
	pub primary_genre_ratio: f32,
	/// Non-satisfying items within the evaluated prefix, in rank order.
	pub violating_items: Vec<ItemId>,
	pub drifted: bool,
	/// Size of the evaluated prefix: `min(top_k, list length)`.
	pub evaluated: u32,
	pub min_primary_genre_ratio: f32,
	pub mean_popularity: f32,
	pub unique_tag_count: u32,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub advisories: Vec<DriftAdvisory>,
}
impl DriftReport {
	/// How far the ratio falls short of the threshold; zero once satisfied.
	pub fn deficit(&self) -> f32 {
		(self.min_primary_genre_ratio - self.primary_genre_ratio).max(0.0)
	}
}

pub fn critique(
	list: &RankedList,
	scores: &[ScoreVector],
	constraint: &IntentConstraint,
	settings: &CriticSettings,
	judge: &dyn ConstraintJudge,
) -> DriftReport {
	let by_id: HashMap<&str, &ScoreVector> =
		scores.iter().map(|score| (score.item_id.as_str(), score)).collect();
	let top = list.top(settings.top_k as usize);
	let empty_tags = BTreeSet::new();
	let mut satisfying = 0_u32;
	let mut violating_items = Vec::new();
	let mut popularity_sum = 0.0_f32;
	let mut unique_tags: BTreeSet<&str> = BTreeSet::new();

	for item in top {
		let score = by_id.get(item.item_id.as_str()).copied();
		let tags = score.map(|score| &score.tags).unwrap_or(&empty_tags);

		if judge.satisfies(tags, constraint) {
			satisfying = satisfying.saturating_add(1);
		} else {
			violating_items.push(item.item_id.clone());
		}

		popularity_sum += score.map(|score| score.popularity).unwrap_or(0.0);
		unique_tags.extend(tags.iter().map(String::as_str));
	}

	let evaluated = saturating_count(top.len());
	let (primary_genre_ratio, mean_popularity) = if evaluated == 0 {
		(1.0, 0.0)
	} else {
		(satisfying as f32 / evaluated as f32, popularity_sum / evaluated as f32)
	};
	let unique_tag_count = saturating_count(unique_tags.len());
	let advisories =
		build_advisories(settings, evaluated, mean_popularity, unique_tag_count);

	DriftReport {
		primary_genre_ratio,
		violating_items,
		drifted: primary_genre_ratio < settings.min_primary_genre_ratio,
		evaluated,
		min_primary_genre_ratio: settings.min_primary_genre_ratio,
		mean_popularity,
		unique_tag_count,
		advisories,
	}
}

fn build_advisories(
	settings: &CriticSettings,
	evaluated: u32,
	mean_popularity: f32,
	unique_tag_count: u32,
) -> Vec<DriftAdvisory> {
	let mut advisories = Vec::new();

	if evaluated == 0 {
		return advisories;
	}

	if let Some(threshold) = settings.popularity_mean_threshold
		&& mean_popularity > threshold
	{
		advisories.push(DriftAdvisory::PopularityTooHigh { mean_popularity, threshold });
	}
	if let Some(min_unique_tags) = settings.min_unique_tags
		&& unique_tag_count < min_unique_tags
	{
		advisories.push(DriftAdvisory::TagDiversityTooLow {
			unique_tags: unique_tag_count,
			min_unique_tags,
		});
	}

	advisories
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeSet;

	use crate::{
		advantage::{RankedItem, RankedList},
		constraint::{IntentConstraint, TagSetJudge},
		drift::{CriticSettings, DriftAdvisory, critique},
		score::ScoreVector,
	};

	fn tags(values: &[&str]) -> BTreeSet<String> {
		values.iter().map(|value| value.to_string()).collect()
	}

	fn score(id: &str, pop: f32, item_tags: &[&str]) -> ScoreVector {
		ScoreVector {
			item_id: id.to_string(),
			cf_score: 0.0,
			semantic_score: 0.0,
			popularity: pop,
			tags: tags(item_tags),
		}
	}

	fn list(ids: &[&str]) -> RankedList {
		RankedList {
			items: ids
				.iter()
				.enumerate()
				.map(|(idx, id)| RankedItem {
					item_id: id.to_string(),
					advantage_score: 1.0 - idx as f32 * 0.1,
					rank: idx as u32 + 1,
					relevance: 0.0,
					popularity_penalty: 0.0,
				})
				.collect(),
		}
	}

	fn settings(top_k: u32, min_ratio: f32) -> CriticSettings {
		CriticSettings {
			top_k,
			min_primary_genre_ratio: min_ratio,
			popularity_mean_threshold: None,
			min_unique_tags: None,
		}
	}

	fn scary() -> IntentConstraint {
		IntentConstraint { required_tags: tags(&["scary"]), ..Default::default() }
	}

	#[test]
	fn ratio_counts_only_top_k() {
		let scores = [score("a", 0.9, &["action"]), score("b", 0.1, &["scary"]), score("c", 0.1, &["scary"])];
		let report = critique(&list(&["a", "b", "c"]), &scores, &scary(), &settings(2, 0.6), &TagSetJudge);

		assert_eq!(report.evaluated, 2);
		assert_eq!(report.primary_genre_ratio, 0.5);
		assert!(report.drifted);
		assert_eq!(report.violating_items, vec!["a".to_string()]);
	}

	#[test]
	fn short_list_uses_its_length_as_denominator() {
		let scores = [score("a", 0.1, &["scary"]), score("b", 0.1, &["drama"])];
		let report = critique(&list(&["a", "b"]), &scores, &scary(), &settings(10, 0.4), &TagSetJudge);

		assert_eq!(report.evaluated, 2);
		assert_eq!(report.primary_genre_ratio, 0.5);
		assert!(!report.drifted);
	}

	#[test]
	fn violating_items_preserve_rank_order() {
		let scores = [
			score("z", 0.1, &["drama"]),
			score("m", 0.1, &["scary"]),
			score("a", 0.1, &["comedy"]),
		];
		let report = critique(&list(&["z", "m", "a"]), &scores, &scary(), &settings(3, 1.0), &TagSetJudge);

		assert_eq!(report.violating_items, vec!["z".to_string(), "a".to_string()]);
	}

	#[test]
	fn empty_list_is_not_drifted() {
		let report = critique(&RankedList::default(), &[], &scary(), &settings(5, 0.4), &TagSetJudge);

		assert_eq!(report.primary_genre_ratio, 1.0);
		assert!(!report.drifted);
		assert_eq!(report.deficit(), 0.0);
	}

	#[test]
	fn deficit_measures_shortfall() {
		let scores = [score("a", 0.5, &["action"])];
		let report = critique(&list(&["a"]), &scores, &scary(), &settings(1, 0.4), &TagSetJudge);

		assert!((report.deficit() - 0.4).abs() < 1e-6);
	}

	#[test]
	fn advisories_flag_popular_and_narrow_top_k() {
		let scores = [score("a", 0.9, &["action"]), score("b", 0.8, &["action"])];
		let settings = CriticSettings {
			top_k: 2,
			min_primary_genre_ratio: 0.0,
			popularity_mean_threshold: Some(0.65),
			min_unique_tags: Some(4),
		};
		let report = critique(&list(&["a", "b"]), &scores, &IntentConstraint::default(), &settings, &TagSetJudge);

		assert!(!report.drifted);
		assert_eq!(report.unique_tag_count, 1);
		assert!((report.mean_popularity - 0.85).abs() < 1e-6);
		assert!(matches!(report.advisories[0], DriftAdvisory::PopularityTooHigh { .. }));
		assert_eq!(
			report.advisories[1],
			DriftAdvisory::TagDiversityTooLow { unique_tags: 1, min_unique_tags: 4 }
		);
	}
}
