//! Resolution of matched view pairs against the features collection.

use anyhow::Result;
use autocal_core::{FeaturesCollection, Mat3, Match, MatchesCollection, Pt2, Vec3, ViewId};
use nalgebra::Rotation3;

/// One matched view pair with its resolved keypoint slices.
pub(crate) struct PairBlock<'a> {
    pub from: ViewId,
    pub to: ViewId,
    pub kps_from: &'a [Pt2],
    pub kps_to: &'a [Pt2],
    pub matches: &'a [Match],
}

/// Resolve every matched pair, validating that the referenced views and
/// keypoints exist. Returns the blocks and the total match count.
pub(crate) fn collect_pair_blocks<'a>(
    features: &'a FeaturesCollection,
    matches: &'a MatchesCollection,
) -> Result<(Vec<PairBlock<'a>>, usize)> {
    let mut pairs = Vec::with_capacity(matches.len());
    let mut num_matches = 0;
    for (&(from, to), mlist) in matches {
        let f_from = features
            .get(&from)
            .ok_or_else(|| anyhow::anyhow!("no features for view {from}"))?;
        let f_to = features
            .get(&to)
            .ok_or_else(|| anyhow::anyhow!("no features for view {to}"))?;
        for m in mlist {
            if m.query_idx >= f_from.keypoints.len() || m.train_idx >= f_to.keypoints.len() {
                anyhow::bail!("match ({from}, {to}) references a keypoint out of range");
            }
        }
        num_matches += mlist.len();
        pairs.push(PairBlock {
            from,
            to,
            kps_from: &f_from.keypoints,
            kps_to: &f_to.keypoints,
            matches: mlist,
        });
    }
    Ok((pairs, num_matches))
}

/// Axis-angle vector to rotation matrix.
pub(crate) fn rodrigues(v: Vec3) -> Mat3 {
    Rotation3::from_scaled_axis(v).into_inner()
}
