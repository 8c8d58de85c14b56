//! Joint refinement of intrinsics and per-view rotations for a purely
//! rotating camera.

use std::collections::BTreeMap;

use anyhow::Result;
use autocal_core::{
    AbsoluteRotations, FeaturesCollection, Mat3, MatchesCollection, Real, Vec3, ViewId,
};
use log::debug;
use nalgebra::{DVector, Rotation3};

use crate::backend_lm::minimize_lev_marq;
use crate::pairs::{collect_pair_blocks, rodrigues, PairBlock};
use crate::residual::{RefineMask, ResidualModel};

/// Reprojection residual of matched points for fixed-center cameras:
/// parameters are the five intrinsics plus one rotation vector per
/// non-reference view.
struct ReprojErrorFixedKOnlyR<'a> {
    pairs: Vec<PairBlock<'a>>,
    slot_of_view: BTreeMap<ViewId, usize>,
    num_matches: usize,
}

impl<'a> ReprojErrorFixedKOnlyR<'a> {
    fn new(
        features: &'a FeaturesCollection,
        matches: &'a MatchesCollection,
        rotations: &AbsoluteRotations,
    ) -> Result<Self> {
        let slot_of_view: BTreeMap<ViewId, usize> = rotations
            .keys()
            .enumerate()
            .map(|(slot, &view)| (view, slot))
            .collect();

        let (pairs, num_matches) = collect_pair_blocks(features, matches)?;
        for block in &pairs {
            for view in [block.from, block.to] {
                if !slot_of_view.contains_key(&view) {
                    anyhow::bail!("no absolute rotation for view {view}");
                }
            }
        }

        Ok(Self {
            pairs,
            slot_of_view,
            num_matches,
        })
    }

    fn num_matches(&self) -> usize {
        self.num_matches
    }

    fn rotation_at(&self, arg: &DVector<Real>, view: ViewId) -> Mat3 {
        let slot = self.slot_of_view[&view];
        if slot == 0 {
            // The reference view is pinned to the identity and has no slot.
            Mat3::identity()
        } else {
            let off = 5 + 3 * (slot - 1);
            rodrigues(Vec3::new(arg[off], arg[off + 1], arg[off + 2]))
        }
    }
}

impl ResidualModel for ReprojErrorFixedKOnlyR<'_> {
    fn dimension(&self) -> usize {
        2 * self.num_matches
    }

    fn eval(&self, arg: &DVector<Real>, err: &mut DVector<Real>) {
        let k = Mat3::new(arg[0], arg[1], arg[2], 0.0, arg[3], arg[4], 0.0, 0.0, 1.0);
        let Some(k_inv) = k.try_inverse() else {
            // A singular K mid-step: report a huge but finite residual so
            // the driver backs off.
            err.fill(1e12);
            return;
        };

        let mut pos = 0;
        for block in &self.pairs {
            let r_from = self.rotation_at(arg, block.from);
            let r_to = self.rotation_at(arg, block.to);
            let m = k * r_from * r_to.transpose() * k_inv;

            for mt in block.matches {
                let p1 = block.kps_from[mt.query_idx];
                let p2 = block.kps_to[mt.train_idx];
                let x = m[(0, 0)] * p2.x + m[(0, 1)] * p2.y + m[(0, 2)];
                let y = m[(1, 0)] * p2.x + m[(1, 1)] * p2.y + m[(1, 2)];
                let z = m[(2, 0)] * p2.x + m[(2, 1)] * p2.y + m[(2, 2)];
                err[2 * pos] = p1.x - x / z;
                err[2 * pos + 1] = p1.y - y / z;
                pos += 1;
            }
        }
    }
}

/// Refine intrinsics and absolute rotations against matched keypoints.
///
/// Rotations are first rebased so that the first view in the map carries
/// the identity; that view's rotation is excluded from the parameter
/// vector. `params_to_refine` gates the intrinsic parameters (rotations
/// are always refined). Both `k` and `rotations` are updated in place;
/// the return value is the final RMS reprojection error in pixels.
pub fn refine_rotational_camera(
    k: &mut Mat3,
    rotations: &mut AbsoluteRotations,
    features: &FeaturesCollection,
    matches: &MatchesCollection,
    params_to_refine: RefineMask,
) -> Result<Real> {
    if rotations.is_empty() {
        anyhow::bail!("need at least one absolute rotation");
    }

    // Rebase every rotation on the reference (first) view. The right
    // factor R_refᵀ cancels inside every pairwise map R_f R_tᵀ, so the
    // rebasing leaves the residual unchanged.
    let r_ref = *rotations.values().next().expect("checked non-empty");
    for r in rotations.values_mut() {
        *r = *r * r_ref.transpose();
    }

    let func = ReprojErrorFixedKOnlyR::new(features, matches, rotations)?;
    if func.num_matches() == 0 {
        anyhow::bail!("need at least one match");
    }

    let num_params = 5 + 3 * (rotations.len() - 1);
    let mut arg = DVector::<Real>::zeros(num_params);
    arg[0] = k[(0, 0)];
    arg[1] = k[(0, 1)];
    arg[2] = k[(0, 2)];
    arg[3] = k[(1, 1)];
    arg[4] = k[(1, 2)];
    for (slot, r) in rotations.values().enumerate().skip(1) {
        let rvec = Rotation3::from_matrix(r).scaled_axis();
        let off = 5 + 3 * (slot - 1);
        arg[off] = rvec.x;
        arg[off + 1] = rvec.y;
        arg[off + 2] = rvec.z;
    }

    let mut active = vec![true; num_params];
    active[..5].copy_from_slice(&params_to_refine.flags());

    let arg_opt = minimize_lev_marq(&func, arg, &active);

    k[(0, 0)] = arg_opt[0];
    k[(0, 1)] = arg_opt[1];
    k[(0, 2)] = arg_opt[2];
    k[(1, 1)] = arg_opt[3];
    k[(1, 2)] = arg_opt[4];
    for (slot, r) in rotations.values_mut().enumerate().skip(1) {
        let off = 5 + 3 * (slot - 1);
        *r = rodrigues(Vec3::new(arg_opt[off], arg_opt[off + 1], arg_opt[off + 2]));
    }

    let mut err = DVector::zeros(func.dimension());
    func.eval(&arg_opt, &mut err);
    let rms = (err.dot(&err) / func.num_matches() as Real).sqrt();
    debug!("rotational refinement: rms = {rms:.6}");
    Ok(rms)
}
