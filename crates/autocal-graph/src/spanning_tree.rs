//! Maximum-confidence spanning tree and center selection.

use std::collections::BTreeMap;

use anyhow::Result;
use autocal_core::{RelativeConfidences, ViewId};
use log::debug;

use crate::graph::{GraphEdge, ViewGraph};
use crate::union_find::DisjointSets;

/// Result of [`extract_efficient_correspondences`]: the tree center, the
/// effective bidirectional correspondence graph, and the confidences of
/// the surviving edges (both directions per kept edge).
#[derive(Debug, Clone)]
pub struct EffectiveCorrespondences {
    pub center: ViewId,
    pub graph: ViewGraph,
    pub confidences: RelativeConfidences,
}

/// Reduce a confidence-weighted view graph to its effective core.
///
/// 1. Selects the largest connected component (ties broken by the
///    first-seen component).
/// 2. Builds a maximum spanning tree of that component with Kruskal on
///    descending confidences, adding both directions of every kept edge.
/// 3. Picks the tree center: the component vertex of minimum BFS
///    eccentricity (first encountered wins on ties).
pub fn extract_efficient_correspondences(
    num_views: usize,
    rel_confs: &RelativeConfidences,
) -> Result<EffectiveCorrespondences> {
    if num_views == 0 {
        anyhow::bail!("need at least one view");
    }
    for &(from, to) in rel_confs.keys() {
        if from >= num_views || to >= num_views {
            anyhow::bail!("edge ({from}, {to}) references a view >= {num_views}");
        }
    }

    // Connected components.
    let mut components = DisjointSets::new(num_views);
    for &(from, to) in rel_confs.keys() {
        components.union(from, to);
    }

    // The biggest one; strict comparison keeps the first-seen root on ties.
    let mut best_root = 0;
    let mut best_size = 0;
    for v in 0..num_views {
        let root = components.find(v);
        if root == v {
            let size = components.size_of(v);
            if size > best_size {
                best_size = size;
                best_root = v;
            }
        }
    }
    let in_comp: Vec<bool> = (0..num_views)
        .map(|v| components.find(v) == best_root)
        .collect();
    debug!("largest component: {best_size} of {num_views} views");

    // Restrict to the component and sort by descending confidence.
    let mut edges: Vec<GraphEdge> = rel_confs
        .iter()
        .filter(|((from, to), _)| in_comp[*from] && in_comp[*to])
        .map(|(&(from, to), &conf)| GraphEdge {
            from,
            to,
            weight: conf,
        })
        .collect();
    edges.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Kruskal: keep every edge joining two fragments, bidirectionally.
    let mut tree = ViewGraph::new(num_views);
    let mut confidences = RelativeConfidences::new();
    let mut fragments = DisjointSets::new(num_views);
    for edge in &edges {
        if fragments.union(edge.from, edge.to) {
            tree.add_edge(edge.from, edge.to, edge.weight);
            tree.add_edge(edge.to, edge.from, edge.weight);
            confidences.insert((edge.from, edge.to), edge.weight);
            confidences.insert((edge.to, edge.from), edge.weight);
        }
    }

    // Tree center: minimum eccentricity over the component, by BFS from
    // every candidate vertex.
    let mut center = best_root;
    let mut radius = usize::MAX;
    for v in (0..num_views).filter(|&v| in_comp[v]) {
        let mut distances: BTreeMap<ViewId, usize> = BTreeMap::new();
        distances.insert(v, 0);
        tree.walk_breadth_first(v, |from, to| {
            let d = distances[&from] + 1;
            distances.insert(to, d);
        });

        let eccentricity = distances.values().copied().max().unwrap_or(0);
        if eccentricity < radius {
            radius = eccentricity;
            center = v;
        }
    }
    debug!("spanning tree center = {center}, radius = {radius}");

    Ok(EffectiveCorrespondences {
        center,
        graph: tree,
        confidences,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confs(edges: &[(ViewId, ViewId, f64)]) -> RelativeConfidences {
        edges.iter().map(|&(a, b, c)| ((a, b), c)).collect()
    }

    #[test]
    fn chain_tree_drops_weak_edge_and_centers() {
        let rel = confs(&[
            (0, 1, 0.9),
            (1, 2, 0.8),
            (2, 3, 0.7),
            (1, 3, 0.3),
            (3, 4, 0.6),
        ]);

        let eff = extract_efficient_correspondences(5, &rel).unwrap();

        // The weak (1, 3) edge closes a cycle and must be dropped.
        assert!(!eff.confidences.contains_key(&(1, 3)));
        assert!(!eff.confidences.contains_key(&(3, 1)));
        for (a, b) in [(0, 1), (1, 2), (2, 3), (3, 4)] {
            assert!(eff.confidences.contains_key(&(a, b)));
            assert!(eff.confidences.contains_key(&(b, a)));
        }

        // Chain 0-1-2-3-4: leaves have degree 1, the center is view 2.
        assert_eq!(eff.graph.degree(0), 1);
        assert_eq!(eff.graph.degree(4), 1);
        assert_eq!(eff.graph.degree(2), 2);
        assert_eq!(eff.center, 2);
    }

    #[test]
    fn largest_component_wins() {
        // Component {0, 1} vs component {2, 3, 4}.
        let rel = confs(&[(0, 1, 0.9), (2, 3, 0.5), (3, 4, 0.4)]);

        let eff = extract_efficient_correspondences(5, &rel).unwrap();

        assert!(eff.confidences.contains_key(&(2, 3)));
        assert!(!eff.confidences.contains_key(&(0, 1)));
        assert_eq!(eff.center, 3);
    }

    #[test]
    fn bfs_from_center_reaches_whole_component_once() {
        let rel = confs(&[
            (0, 1, 0.9),
            (1, 2, 0.8),
            (2, 3, 0.7),
            (1, 3, 0.3),
            (3, 4, 0.6),
        ]);
        let eff = extract_efficient_correspondences(5, &rel).unwrap();

        let mut discovered = vec![eff.center];
        eff.graph
            .walk_breadth_first(eff.center, |_, to| discovered.push(to));
        discovered.sort_unstable();
        assert_eq!(discovered, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn isolated_views_form_singleton_components() {
        let eff = extract_efficient_correspondences(3, &RelativeConfidences::new()).unwrap();
        assert_eq!(eff.center, 0);
        assert!(eff.confidences.is_empty());
    }

    #[test]
    fn out_of_range_edges_are_rejected() {
        let rel = confs(&[(0, 7, 0.5)]);
        assert!(extract_efficient_correspondences(3, &rel).is_err());
    }
}
