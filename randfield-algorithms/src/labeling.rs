//! Connected-component extraction of supra-threshold voxels.
//!
//! 26-connected labeling via a single-pass union-find over the volume.
//! Find uses iterative path compression so deep parent chains on large
//! clusters never grow the stack. Cancellation is polled only at
//! whole-slice boundaries; an abort leaves no partial output.

use std::collections::HashMap;

use randfield_core::{Cluster, Error, ProgressSink, Result, StatMap};

/// Union-Find over voxel linear indices.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    /// Iterative find with full path compression.
    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    fn union(&mut self, x: usize, y: usize) {
        let px = self.find(x);
        let py = self.find(y);

        if px == py {
            return;
        }

        match self.rank[px].cmp(&self.rank[py]) {
            std::cmp::Ordering::Less => self.parent[px] = py,
            std::cmp::Ordering::Greater => self.parent[py] = px,
            std::cmp::Ordering::Equal => {
                self.parent[py] = px;
                self.rank[px] += 1;
            }
        }
    }
}

/// The 13 neighbor offsets preceding a voxel in scan order; together
/// with their mirrors they form the 26-neighborhood.
const HALF_NEIGHBORHOOD: [(i64, i64, i64); 13] = [
    (-1, -1, -1),
    (0, -1, -1),
    (1, -1, -1),
    (-1, 0, -1),
    (0, 0, -1),
    (1, 0, -1),
    (-1, 1, -1),
    (0, 1, -1),
    (1, 1, -1),
    (-1, -1, 0),
    (0, -1, 0),
    (1, -1, 0),
    (-1, 0, 0),
];

#[allow(clippy::cast_precision_loss)]
fn slice_fraction(done: usize, total: usize) -> f32 {
    (done as f32) / (total.max(1) as f32)
}

/// Extracts 26-connected clusters from a binary supra-threshold volume.
///
/// Components smaller than `min_extent` voxels are discarded. Each
/// cluster reports its member voxels, extent, and peak (maximal
/// statistic, ties broken by lowest linear index). Clusters are returned
/// in discovery order. Zero supra-threshold voxels yield an empty vector,
/// not an error.
///
/// # Errors
/// Returns [`Error::GridMismatch`] if the binary volume does not match
/// the map's grid and [`Error::Cancelled`] if the progress sink requests
/// cancellation.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn extract_clusters(
    map: &StatMap<'_>,
    supra: &[bool],
    min_extent: usize,
    progress: &dyn ProgressSink,
) -> Result<Vec<Cluster>> {
    let dims = map.dims();
    if supra.len() != dims.len() {
        return Err(Error::GridMismatch {
            context: "supra-threshold volume",
            expected: dims,
            actual: randfield_core::GridDims::new(supra.len(), 1, 1),
        });
    }

    let mut uf = UnionFind::new(dims.len());

    // Pass 1: union each supra voxel with its preceding 26-neighbors.
    for z in 0..dims.nz {
        if progress.is_cancelled() {
            return Err(Error::Cancelled);
        }
        for y in 0..dims.ny {
            for x in 0..dims.nx {
                let idx = dims.index(x, y, z);
                if !supra[idx] {
                    continue;
                }
                for (dx, dy, dz) in HALF_NEIGHBORHOOD {
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    let nz = z as i64 + dz;
                    if nx < 0
                        || ny < 0
                        || nz < 0
                        || nx >= dims.nx as i64
                        || ny >= dims.ny as i64
                        || nz >= dims.nz as i64
                    {
                        continue;
                    }
                    let nidx = dims.index(nx as usize, ny as usize, nz as usize);
                    if supra[nidx] {
                        uf.union(idx, nidx);
                    }
                }
            }
        }
        progress.report(0.5 * slice_fraction(z + 1, dims.nz));
    }

    // Pass 2: gather members per root, in discovery order.
    let mut root_to_slot: HashMap<usize, usize> = HashMap::new();
    let mut members: Vec<Vec<usize>> = Vec::new();
    for z in 0..dims.nz {
        if progress.is_cancelled() {
            return Err(Error::Cancelled);
        }
        for y in 0..dims.ny {
            for x in 0..dims.nx {
                let idx = dims.index(x, y, z);
                if !supra[idx] {
                    continue;
                }
                let root = uf.find(idx);
                let slot = *root_to_slot.entry(root).or_insert_with(|| {
                    members.push(Vec::new());
                    members.len() - 1
                });
                members[slot].push(idx);
            }
        }
        progress.report(0.5 + 0.5 * slice_fraction(z + 1, dims.nz));
    }

    let clusters = members
        .into_iter()
        .filter(|voxels| voxels.len() >= min_extent.max(1))
        .map(|voxels| {
            // Members are in ascending linear order, so a strict
            // comparison keeps the lowest index on ties.
            let mut peak_index = voxels[0];
            let mut peak_value = map.value(peak_index);
            for &idx in &voxels[1..] {
                if map.value(idx) > peak_value {
                    peak_value = map.value(idx);
                    peak_index = idx;
                }
            }
            let (px, py, pz) = dims.coords(peak_index);
            Cluster {
                peak_index,
                peak_voxel: (px, py, pz),
                peak_world: map.world(px, py, pz),
                peak_value: f64::from(peak_value),
                extent: voxels.len(),
                voxels,
                compositions: Vec::new(),
            }
        })
        .collect();

    Ok(clusters)
}
