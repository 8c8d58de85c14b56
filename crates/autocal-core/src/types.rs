//! Collection aliases shared across the toolbox.
//!
//! All keyed collections are `BTreeMap`s: iteration order is stable and
//! sorted by view index, which keeps every downstream computation
//! deterministic for a given input set.

use std::collections::BTreeMap;

use crate::features::{Features, Match};
use crate::math::{Mat3, Real};
use crate::models::Motion;

/// Index of a view (image) in a capture session.
pub type ViewId = usize;

/// Inter-view homographies of the projective plane, keyed by view pair.
pub type HomographiesP2 = BTreeMap<(ViewId, ViewId), Mat3>;

/// Per-view detected features.
pub type FeaturesCollection = BTreeMap<ViewId, Features>;

/// Filtered matches keyed by the ordered (from, to) view pair.
pub type MatchesCollection = BTreeMap<(ViewId, ViewId), Vec<Match>>;

/// Pairwise match confidences, keyed by the directed view pair.
pub type RelativeConfidences = BTreeMap<(ViewId, ViewId), Real>;

/// Pairwise relative rotations. Only one direction needs to be stored;
/// the transpose relation holds for the other.
pub type RelativeRotations = BTreeMap<(ViewId, ViewId), Mat3>;

/// Absolute per-view rotations, identity at the reference view.
pub type AbsoluteRotations = BTreeMap<ViewId, Mat3>;

/// Absolute per-view rigid motions, identity at the reference view.
pub type AbsoluteMotions = BTreeMap<ViewId, Motion>;
