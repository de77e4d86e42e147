//! Deterministic square-grid neighbourhood builder.
//!
//! Given the known member identities, seat the first `N*N` of them (in
//! sorted order, `N = floor(sqrt(M))`) on an `N`-by-`N` grid in row-major
//! order and give each cell its Moore neighbourhood: up to eight
//! grid-adjacent cells, fewer at edges, no wraparound. Members beyond the
//! largest perfect square are seated nowhere -- that is the truncation
//! rule, not an error.
//!
//! The result is a pure function of the sorted member list: two
//! coordinators observing the same member set publish byte-identical
//! topologies, which is what lets any of them take over mid-round.

use std::collections::BTreeMap;

use lockstep_types::{Topology, UnitId};

/// Build the neighbour topology for the given members.
///
/// The input need not be sorted; seating always happens in sorted
/// identity order. Neighbour lists come out sorted, and the relation is
/// symmetric by construction.
pub fn build_topology(members: &[UnitId]) -> Topology {
    let mut cells: Vec<UnitId> = members.to_vec();
    cells.sort();
    cells.dedup();

    let n = cells.len().isqrt();
    let seated = n.saturating_mul(n);
    cells.truncate(seated);

    let mut map: BTreeMap<UnitId, Vec<UnitId>> = BTreeMap::new();
    for (index, cell) in cells.iter().enumerate() {
        let mut neighbours: Vec<UnitId> = grid_neighbours(index, n)
            .filter_map(|i| cells.get(i).cloned())
            .collect();
        neighbours.sort();
        map.insert(cell.clone(), neighbours);
    }
    Topology::from_map(map)
}

/// The eight Moore-neighbourhood offsets, row-major.
const OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Row-major indices of the Moore neighbourhood of `index` on an
/// `n`-by-`n` grid, excluding out-of-bound offsets and the cell itself.
fn grid_neighbours(index: usize, n: usize) -> impl Iterator<Item = usize> {
    let row = index.checked_div(n).unwrap_or(0);
    let col = index.checked_rem(n).unwrap_or(0);

    OFFSETS.into_iter().filter_map(move |(dr, dc)| {
        let r = row.checked_add_signed(dr)?;
        let c = col.checked_add_signed(dc)?;
        if r >= n || c >= n {
            return None;
        }
        Some(r.saturating_mul(n).saturating_add(c))
    })
}
