//! Joint refinement of a stereo rig: shared intrinsics, the left-to-right
//! rig pose, and the per-pair motions of the left camera.
//!
//! View indexing convention: view `2p` is the left image of stereo pair
//! `p` and view `2p + 1` its right image. Motions are keyed by the pair
//! index and map world coordinates into the left camera of that pair; the
//! rig pose maps left-camera coordinates into the right camera.

use std::collections::BTreeMap;

use anyhow::Result;
use autocal_core::{
    cross_product_mat, AbsoluteMotions, FeaturesCollection, Mat3, MatchesCollection, Motion, Real,
    RigidCamera, Vec3, ViewId,
};
use log::debug;
use nalgebra::{DVector, Rotation3, Vector3};

use crate::backend_lm::minimize_lev_marq;
use crate::pairs::{collect_pair_blocks, rodrigues, PairBlock};
use crate::residual::ResidualModel;

/// Symmetric epipolar residual of matched points across the rig.
///
/// Parameter layout: five intrinsics, the rig rotation vector and
/// translation, then one (rotation vector, translation) block per
/// non-reference motion.
struct EpipErrorStereoCam<'a> {
    pairs: Vec<PairBlock<'a>>,
    slot_of_motion: BTreeMap<ViewId, usize>,
    num_matches: usize,
}

impl<'a> EpipErrorStereoCam<'a> {
    fn new(
        features: &'a FeaturesCollection,
        matches: &'a MatchesCollection,
        motions: &AbsoluteMotions,
    ) -> Result<Self> {
        let slot_of_motion: BTreeMap<ViewId, usize> = motions
            .keys()
            .enumerate()
            .map(|(slot, &pair)| (pair, slot))
            .collect();

        let (pairs, num_matches) = collect_pair_blocks(features, matches)?;
        for block in &pairs {
            for view in [block.from, block.to] {
                if !slot_of_motion.contains_key(&(view / 2)) {
                    anyhow::bail!("no motion for stereo pair {} (view {view})", view / 2);
                }
            }
        }

        Ok(Self {
            pairs,
            slot_of_motion,
            num_matches,
        })
    }

    fn num_matches(&self) -> usize {
        self.num_matches
    }

    fn motion_at(&self, arg: &DVector<Real>, pair: ViewId) -> (Mat3, Vec3) {
        let slot = self.slot_of_motion[&pair];
        if slot == 0 {
            (Mat3::identity(), Vec3::zeros())
        } else {
            let off = 11 + 6 * (slot - 1);
            (
                rodrigues(Vec3::new(arg[off], arg[off + 1], arg[off + 2])),
                Vec3::new(arg[off + 3], arg[off + 4], arg[off + 5]),
            )
        }
    }

    /// World-to-camera pose of a view under the current parameters.
    fn camera_pose(
        &self,
        arg: &DVector<Real>,
        view: ViewId,
        r_rig: &Mat3,
        t_rig: &Vec3,
    ) -> (Mat3, Vec3) {
        let (r_l, t_l) = self.motion_at(arg, view / 2);
        if view % 2 == 0 {
            (r_l, t_l)
        } else {
            (r_rig * r_l, r_rig * t_l + t_rig)
        }
    }
}

impl ResidualModel for EpipErrorStereoCam<'_> {
    fn dimension(&self) -> usize {
        self.num_matches
    }

    fn eval(&self, arg: &DVector<Real>, err: &mut DVector<Real>) {
        let k = Mat3::new(arg[0], arg[1], arg[2], 0.0, arg[3], arg[4], 0.0, 0.0, 1.0);
        let Some(k_inv) = k.try_inverse() else {
            err.fill(1e12);
            return;
        };

        let r_rig = rodrigues(Vec3::new(arg[5], arg[6], arg[7]));
        let t_rig = Vec3::new(arg[8], arg[9], arg[10]);

        let mut pos = 0;
        for block in &self.pairs {
            let (r_a, t_a) = self.camera_pose(arg, block.from, &r_rig, &t_rig);
            let (r_b, t_b) = self.camera_pose(arg, block.to, &r_rig, &t_rig);
            let r_rel = r_b * r_a.transpose();
            let t_rel = t_b - r_rel * t_a;

            let f = k_inv.transpose() * cross_product_mat(&t_rel) * r_rel * k_inv;
            let ft = f.transpose();

            for mt in block.matches {
                let p1 = block.kps_from[mt.query_idx];
                let p2 = block.kps_to[mt.train_idx];
                let x1 = Vector3::new(p1.x, p1.y, 1.0);
                let x2 = Vector3::new(p2.x, p2.y, 1.0);

                let fx1 = f * x1;
                let ftx2 = ft * x2;
                let denom =
                    (fx1.x * fx1.x + fx1.y * fx1.y + ftx2.x * ftx2.x + ftx2.y * ftx2.y).max(1e-12);
                err[pos] = x2.dot(&fx1) / denom.sqrt();
                pos += 1;
            }
        }
    }
}

/// Refine the rig camera and per-pair motions against matched keypoints.
///
/// Motions are first rebased on the first entry of the map (its rotation
/// becomes the identity and its translation zero); that entry is excluded
/// from the parameter vector. All parameters are refined. Returns the
/// final RMS of the symmetric epipolar distances.
pub fn refine_stereo_camera(
    cam: &mut RigidCamera,
    motions: &mut AbsoluteMotions,
    features: &FeaturesCollection,
    matches: &MatchesCollection,
) -> Result<Real> {
    if motions.is_empty() {
        anyhow::bail!("need at least one motion");
    }

    // Rebase every motion on the reference (first) entry.
    let first = *motions.values().next().expect("checked non-empty");
    for m in motions.values_mut() {
        m.r = first.r.transpose() * m.r;
        m.t -= first.t;
    }

    let func = EpipErrorStereoCam::new(features, matches, motions)?;
    if func.num_matches() == 0 {
        anyhow::bail!("need at least one match");
    }

    let num_params = 11 + 6 * (motions.len() - 1);
    let mut arg = DVector::<Real>::zeros(num_params);
    arg[0] = cam.k[(0, 0)];
    arg[1] = cam.k[(0, 1)];
    arg[2] = cam.k[(0, 2)];
    arg[3] = cam.k[(1, 1)];
    arg[4] = cam.k[(1, 2)];

    let rig_rvec = Rotation3::from_matrix(&cam.r).scaled_axis();
    arg[5] = rig_rvec.x;
    arg[6] = rig_rvec.y;
    arg[7] = rig_rvec.z;
    arg[8] = cam.t.x;
    arg[9] = cam.t.y;
    arg[10] = cam.t.z;

    for (slot, m) in motions.values().enumerate().skip(1) {
        let rvec = Rotation3::from_matrix(&m.r).scaled_axis();
        let off = 11 + 6 * (slot - 1);
        arg[off] = rvec.x;
        arg[off + 1] = rvec.y;
        arg[off + 2] = rvec.z;
        arg[off + 3] = m.t.x;
        arg[off + 4] = m.t.y;
        arg[off + 5] = m.t.z;
    }

    let active = vec![true; num_params];
    let arg_opt = minimize_lev_marq(&func, arg, &active);

    cam.k[(0, 0)] = arg_opt[0];
    cam.k[(0, 1)] = arg_opt[1];
    cam.k[(0, 2)] = arg_opt[2];
    cam.k[(1, 1)] = arg_opt[3];
    cam.k[(1, 2)] = arg_opt[4];
    cam.r = rodrigues(Vec3::new(arg_opt[5], arg_opt[6], arg_opt[7]));
    cam.t = Vec3::new(arg_opt[8], arg_opt[9], arg_opt[10]);

    for (slot, m) in motions.values_mut().enumerate().skip(1) {
        let off = 11 + 6 * (slot - 1);
        *m = Motion::new(
            rodrigues(Vec3::new(arg_opt[off], arg_opt[off + 1], arg_opt[off + 2])),
            Vec3::new(arg_opt[off + 3], arg_opt[off + 4], arg_opt[off + 5]),
        );
    }

    let mut err = DVector::zeros(func.dimension());
    func.eval(&arg_opt, &mut err);
    let rms = (err.dot(&err) / func.num_matches() as Real).sqrt();
    debug!("stereo refinement: rms = {rms:.6}");
    Ok(rms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use autocal_core::{Features, Match, Pt2, Pt3};
    use nalgebra::DMatrix;

    fn project(k: &Mat3, r: &Mat3, t: &Vec3, pw: &Pt3) -> Pt2 {
        let pc = r * pw.coords + t;
        let v = k * pc;
        Pt2::new(v.x / v.z, v.y / v.z)
    }

    fn world_points() -> Vec<Pt3> {
        let mut pts = Vec::new();
        for z in 0..2 {
            for y in 0..3 {
                for x in 0..3 {
                    pts.push(Pt3::new(
                        -0.5 + 0.5 * x as Real,
                        -0.4 + 0.4 * y as Real,
                        2.5 + 0.6 * z as Real,
                    ));
                }
            }
        }
        pts
    }

    fn identity_matches(n: usize) -> Vec<Match> {
        (0..n)
            .map(|i| Match {
                query_idx: i,
                train_idx: i,
                distance: 0.0,
            })
            .collect()
    }

    /// Two stereo pairs observing the same rigid point cloud.
    fn rig_setup() -> (
        RigidCamera,
        AbsoluteMotions,
        FeaturesCollection,
        MatchesCollection,
    ) {
        let k = Mat3::new(700.0, 0.0, 320.0, 0.0, 680.0, 240.0, 0.0, 0.0, 1.0);
        let r_rig = rodrigues(Vec3::new(0.0, 0.02, 0.0));
        let t_rig = Vec3::new(-0.25, 0.0, 0.01);

        let mut motions = AbsoluteMotions::new();
        motions.insert(0, Motion::identity());
        motions.insert(
            1,
            Motion::new(rodrigues(Vec3::new(0.03, -0.05, 0.01)), Vec3::new(0.1, 0.05, -0.08)),
        );

        let pts = world_points();
        let mut features = FeaturesCollection::new();
        for (&pair, motion) in &motions {
            let (r_l, t_l) = (motion.r, motion.t);
            let (r_r, t_r) = (r_rig * r_l, r_rig * t_l + t_rig);
            let left: Vec<Pt2> = pts.iter().map(|p| project(&k, &r_l, &t_l, p)).collect();
            let right: Vec<Pt2> = pts.iter().map(|p| project(&k, &r_r, &t_r, p)).collect();
            features.insert(
                2 * pair,
                Features {
                    keypoints: left,
                    descriptors: DMatrix::zeros(0, 0),
                },
            );
            features.insert(
                2 * pair + 1,
                Features {
                    keypoints: right,
                    descriptors: DMatrix::zeros(0, 0),
                },
            );
        }

        let mut matches = MatchesCollection::new();
        // Left-right matches of each pair, plus a cross-pair link.
        matches.insert((0, 1), identity_matches(pts.len()));
        matches.insert((2, 3), identity_matches(pts.len()));
        matches.insert((0, 2), identity_matches(pts.len()));

        let cam = RigidCamera::new(k, r_rig, t_rig);
        (cam, motions, features, matches)
    }

    #[test]
    fn consistent_rig_has_zero_residual() {
        let (mut cam, mut motions, features, matches) = rig_setup();

        let rms = refine_stereo_camera(&mut cam, &mut motions, &features, &matches).unwrap();
        assert!(rms < 1e-9, "rms should vanish on exact input: {rms}");
    }

    #[test]
    fn refinement_reduces_perturbed_rig_rms() {
        let (cam_gt, motions_gt, features, matches) = rig_setup();

        let mut cam = cam_gt;
        cam.k[(0, 0)] += 4.0;
        cam.t.x += 0.01;
        let mut motions = motions_gt.clone();
        if let Some(m) = motions.get_mut(&1) {
            m.t.y += 0.01;
        }

        let rms = refine_stereo_camera(&mut cam, &mut motions, &features, &matches).unwrap();
        assert!(rms < 1e-7, "stereo refinement did not converge: {rms}");
    }

    #[test]
    fn missing_motion_is_rejected() {
        let (mut cam, mut motions, features, matches) = rig_setup();
        motions.remove(&1);

        assert!(refine_stereo_camera(&mut cam, &mut motions, &features, &matches).is_err());
    }
}
