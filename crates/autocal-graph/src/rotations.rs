//! Absolute rotation composition along the effective spanning tree.

use anyhow::Result;
use autocal_core::{AbsoluteRotations, Mat3, RelativeRotations, ViewId};

use crate::graph::ViewGraph;

/// Accumulate absolute rotations by breadth-first traversal from the
/// reference view.
///
/// The reference view gets the identity; every discovered edge
/// `(from, to)` assigns `R_abs[to] = R_{from→to} * R_abs[from]`, using the
/// transposed reverse rotation when only the `(to, from)` direction is
/// stored. Fails if a tree edge has no relative rotation in either
/// direction.
pub fn calc_absolute_rotations(
    rel_rmats: &RelativeRotations,
    eff_corresp: &ViewGraph,
    ref_view: ViewId,
) -> Result<AbsoluteRotations> {
    let mut abs_rmats = AbsoluteRotations::new();
    abs_rmats.insert(ref_view, Mat3::identity());

    let mut missing: Option<(ViewId, ViewId)> = None;
    eff_corresp.walk_breadth_first(ref_view, |from, to| {
        let rel = match rel_rmats.get(&(from, to)) {
            Some(r) => *r,
            None => match rel_rmats.get(&(to, from)) {
                Some(r) => r.transpose(),
                None => {
                    missing.get_or_insert((from, to));
                    return;
                }
            },
        };
        // `from` may itself be unassigned when an ancestor edge failed.
        if let Some(base) = abs_rmats.get(&from).copied() {
            abs_rmats.insert(to, rel * base);
        }
    });

    if let Some((from, to)) = missing {
        anyhow::bail!("no relative rotation for tree edge ({from}, {to})");
    }
    Ok(abs_rmats)
}
