use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Specificity {
	#[default]
	Broad,
	Narrow,
}
impl Specificity {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Broad => "broad",
			Self::Narrow => "narrow",
		}
	}
}

/// Tone requirement: the item must (or must not) carry `tone` among its tags.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Polarity {
	pub tone: String,
	pub must_match: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct IntentConstraint {
	#[serde(default)]
	pub required_tags: BTreeSet<String>,
	#[serde(default)]
	pub forbidden_tags: BTreeSet<String>,
	#[serde(default)]
	pub specificity: Specificity,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub polarity: Option<Polarity>,
}
impl IntentConstraint {
	/// Trims and lower-cases every tag, dropping the ones left empty.
	pub fn normalized(&self) -> Self {
		Self {
			required_tags: self.required_tags.iter().filter_map(|tag| normalize_tag(tag)).collect(),
			forbidden_tags: self.forbidden_tags.iter().filter_map(|tag| normalize_tag(tag)).collect(),
			specificity: self.specificity,
			polarity: self.polarity.as_ref().and_then(|polarity| {
				normalize_tag(&polarity.tone)
					.map(|tone| Polarity { tone, must_match: polarity.must_match })
			}),
		}
	}

	/// Tags named both as required and forbidden; no item can ever satisfy these.
	pub fn contradictions(&self) -> Vec<&str> {
		self.required_tags.intersection(&self.forbidden_tags).map(String::as_str).collect()
	}

	pub fn is_satisfied_by(&self, tags: &BTreeSet<String>) -> bool {
		if !self.required_tags.is_subset(tags) {
			return false;
		}
		if !self.forbidden_tags.is_disjoint(tags) {
			return false;
		}
		if let Some(polarity) = self.polarity.as_ref()
			&& tags.contains(&polarity.tone) != polarity.must_match
		{
			return false;
		}

		true
	}
}

/// Decides whether one item's tags fit the declared constraint.
///
/// The critic only sees this boolean, so a fuzzy or learned judge can replace exact matching
/// without touching the rerank loop.
pub trait ConstraintJudge
where
	Self: Send + Sync,
{
	fn satisfies(&self, tags: &BTreeSet<String>, constraint: &IntentConstraint) -> bool;
}

/// Exact tag-set matching.
#[derive(Clone, Copy, Debug, Default)]
pub struct TagSetJudge;
impl ConstraintJudge for TagSetJudge {
	fn satisfies(&self, tags: &BTreeSet<String>, constraint: &IntentConstraint) -> bool {
		constraint.is_satisfied_by(tags)
	}
}

pub fn normalize_tag(raw: &str) -> Option<String> {
	let tag = raw.trim().to_lowercase();

	if tag.is_empty() { None } else { Some(tag) }
}
