//! Keypoints, descriptors, and match filtering.
//!
//! Feature detection and description are external concerns; this module
//! only defines the data the calibrators consume and the two filters that
//! sit between a raw descriptor matcher and the refinement stage: the
//! symmetric ratio test and the three-way match intersection.

use nalgebra::DMatrix;
use thiserror::Error;

use crate::math::{Pt2, Real};

/// Detected keypoints of one view plus one descriptor row per keypoint.
#[derive(Debug, Clone, Default)]
pub struct Features {
    /// Subpixel keypoint locations.
    pub keypoints: Vec<Pt2>,
    /// Descriptor matrix, row `i` describing `keypoints[i]`.
    pub descriptors: DMatrix<Real>,
}

/// A descriptor match between two views.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    /// Keypoint index in the "from" (query) view.
    pub query_idx: usize,
    /// Keypoint index in the "to" (train) view.
    pub train_idx: usize,
    /// Descriptor distance.
    pub distance: Real,
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("descriptor width mismatch: {0} vs {1}")]
    DescriptorWidthMismatch(usize, usize),
    #[error("descriptor count ({descriptors}) does not cover keypoints ({keypoints})")]
    DescriptorCountMismatch { descriptors: usize, keypoints: usize },
    #[error("match confidence must lie in [0, 1), got {0}")]
    BadConfidence(Real),
}

/// Best and second-best L2 neighbour of every `query` row among the
/// `train` rows. Rows with fewer than two candidates yield `None`.
fn knn2(query: &DMatrix<Real>, train: &DMatrix<Real>) -> Vec<Option<(usize, Real, Real)>> {
    let mut out = Vec::with_capacity(query.nrows());
    for qi in 0..query.nrows() {
        if train.nrows() < 2 {
            out.push(None);
            continue;
        }
        let mut best = (usize::MAX, Real::INFINITY);
        let mut second = Real::INFINITY;
        for ti in 0..train.nrows() {
            let mut sq = 0.0;
            for c in 0..query.ncols() {
                let d = query[(qi, c)] - train[(ti, c)];
                sq += d * d;
            }
            let dist = sq.sqrt();
            if dist < best.1 {
                second = best.1;
                best = (ti, dist);
            } else if dist < second {
                second = dist;
            }
        }
        out.push(Some((best.0, best.1, second)));
    }
    out
}

fn check_features(f: &Features) -> Result<(), MatchError> {
    if f.descriptors.nrows() != f.keypoints.len() {
        return Err(MatchError::DescriptorCountMismatch {
            descriptors: f.descriptors.nrows(),
            keypoints: f.keypoints.len(),
        });
    }
    Ok(())
}

/// Two-way ratio-test matcher.
///
/// Runs 2-NN matching in both directions and keeps a pair only when it
/// passes the Lowe ratio test `d1 < (1 - conf) * d2` both ways and the two
/// directions agree. Returned matches are oriented `f1 -> f2`.
pub fn match_two_way(f1: &Features, f2: &Features, conf: Real) -> Result<Vec<Match>, MatchError> {
    if !(0.0..1.0).contains(&conf) {
        return Err(MatchError::BadConfidence(conf));
    }
    check_features(f1)?;
    check_features(f2)?;
    if f1.descriptors.nrows() > 0
        && f2.descriptors.nrows() > 0
        && f1.descriptors.ncols() != f2.descriptors.ncols()
    {
        return Err(MatchError::DescriptorWidthMismatch(
            f1.descriptors.ncols(),
            f2.descriptors.ncols(),
        ));
    }

    let ratio = 1.0 - conf;

    let mut forward = std::collections::BTreeSet::new();
    for (qi, nn) in knn2(&f1.descriptors, &f2.descriptors).into_iter().enumerate() {
        if let Some((ti, d1, d2)) = nn {
            if d1 < ratio * d2 {
                forward.insert((qi, ti));
            }
        }
    }

    let mut matches = Vec::new();
    for (qi, nn) in knn2(&f2.descriptors, &f1.descriptors).into_iter().enumerate() {
        if let Some((ti, d1, d2)) = nn {
            if d1 < ratio * d2 && forward.contains(&(ti, qi)) {
                matches.push(Match {
                    query_idx: ti,
                    train_idx: qi,
                    distance: d1,
                });
            }
        }
    }

    Ok(matches)
}

/// Three-way correspondence indices for trifocal use.
///
/// Given matches `L1 <-> R1`, `L2 <-> R2` and `L1 <-> L2`, returns pairs of
/// indices `(i1, i2)` into the first two lists such that both endpoints of
/// an `L1 <-> L2` match also appear on the respective left sides.
pub fn intersect_matches(
    matches_lr1: &[Match],
    matches_lr2: &[Match],
    matches_ll: &[Match],
) -> Vec<(usize, usize)> {
    let l1_to_idx: std::collections::BTreeMap<usize, usize> = matches_lr1
        .iter()
        .enumerate()
        .map(|(i, m)| (m.query_idx, i))
        .collect();
    let l2_to_idx: std::collections::BTreeMap<usize, usize> = matches_lr2
        .iter()
        .enumerate()
        .map(|(i, m)| (m.query_idx, i))
        .collect();

    let mut indices = Vec::new();
    for m in matches_ll {
        if let (Some(&i1), Some(&i2)) = (l1_to_idx.get(&m.query_idx), l2_to_idx.get(&m.train_idx))
        {
            indices.push((i1, i2));
        }
    }
    indices
}

/// Collect the matched keypoint coordinates of both views, in match order.
pub fn extract_matched_keypoints(
    f1: &Features,
    f2: &Features,
    matches: &[Match],
) -> (Vec<Pt2>, Vec<Pt2>) {
    let mut xy1 = Vec::with_capacity(matches.len());
    let mut xy2 = Vec::with_capacity(matches.len());
    for m in matches {
        xy1.push(f1.keypoints[m.query_idx]);
        xy2.push(f2.keypoints[m.train_idx]);
    }
    (xy1, xy2)
}
