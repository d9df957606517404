//! Pure ranking core: scoring, constraint critique, and weight correction.
//!
//! Nothing in this crate performs I/O or suspends. Every function takes its inputs by reference
//! and returns fresh values, so callers can keep immutable snapshots of each step.

pub mod adjust;
pub mod advantage;
pub mod catalog;
pub mod constraint;
pub mod drift;
pub mod score;

pub use adjust::{AdjustmentPolicy, AdjustmentTarget, adjust};
pub use advantage::{RankedItem, RankedList, RankingStrategy, cmp_f32_desc, rank};
pub use catalog::{Catalog, CatalogEntry, ItemMetadata};
pub use constraint::{
	ConstraintJudge, IntentConstraint, Polarity, Specificity, TagSetJudge, normalize_tag,
};
pub use drift::{CriticSettings, DriftAdvisory, DriftReport, critique};
pub use score::{ItemId, RankingWeights, ScoreVector, saturating_count};
