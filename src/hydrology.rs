use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rayon::prelude::*;

use crate::cancel::CancelToken;
use crate::config::Params;
use crate::error::WorldgenError;
use crate::grid::{Grid, MOORE_DIST, MOORE_OFFSETS, clamp_xy};

/// How many heap pops between cancellation checks in `priority_flood`.
const CANCEL_CHECK_INTERVAL: u32 = 1024;

/// Minimum elevation gain a priority-flood fill enforces between a cell and
/// its upstream neighbor, so every filled cell has a strictly lower
/// neighbor to drain toward. Without this, flat-filled plateaus produce
/// flow-direction ties that resolve to no-flow everywhere (spec §4.8).
const EPSILON: f32 = 1e-4;

/// Output of the hydrology stage.
pub struct Hydrology {
    /// Elevation after depression filling (>= `height` everywhere).
    pub hydro_elevation: Grid<f32>,
    /// D8 downstream direction, indexing into `MOORE_OFFSETS`, or 255 for
    /// no outflow (ocean cells and unresolved sinks).
    pub flow_dir: Grid<u8>,
    pub flow_accum: Grid<f32>,
    pub river_flag: Grid<bool>,
    /// True where the fill raised a cell above its original elevation --
    /// i.e. a depression that never reached the threshold to show as open
    /// water, but holds standing water underneath the fill.
    pub lake_flag: Grid<bool>,
}

/// Entry for priority flood min-heap (inverted for BinaryHeap max behavior).
#[derive(Clone, Copy)]
struct FloodEntry {
    elev: f32,
    idx: u32,
}

impl PartialEq for FloodEntry {
    fn eq(&self, other: &Self) -> bool {
        self.idx == other.idx
    }
}
impl Eq for FloodEntry {}

impl PartialOrd for FloodEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for FloodEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: reverse ordering so lowest elevation is popped first.
        // Ties break on index so the fill order is deterministic.
        other
            .elev
            .partial_cmp(&self.elev)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.idx.cmp(&self.idx))
    }
}

/// Barnes et al. priority-flood depression filling (in-place). Seeds from
/// ocean cells and the grid edges (flat, non-toroidal: the top/bottom/left/
/// right borders are the only other guaranteed outlets) so every land cell
/// drains toward the nearest one.
fn priority_flood(elev: &mut Grid<f32>, ocean: &Grid<bool>, cancel: &CancelToken) -> Result<(), WorldgenError> {
    let w = elev.w;
    let h = elev.h;
    let n = w * h;
    let mut visited = vec![false; n];
    let mut heap = BinaryHeap::new();

    for i in 0..n {
        if ocean.data[i] {
            visited[i] = true;
            heap.push(FloodEntry { elev: elev.data[i], idx: i as u32 });
        }
    }

    // Edge cells are sinks in a flat domain even when not classified ocean
    // (e.g. a high plateau cut off at the map edge has nowhere else to drain).
    for x in 0..w {
        for &y in &[0usize, h - 1] {
            let i = y * w + x;
            if !visited[i] {
                visited[i] = true;
                heap.push(FloodEntry { elev: elev.data[i], idx: i as u32 });
            }
        }
    }
    for y in 0..h {
        for &x in &[0usize, w - 1] {
            let i = y * w + x;
            if !visited[i] {
                visited[i] = true;
                heap.push(FloodEntry { elev: elev.data[i], idx: i as u32 });
            }
        }
    }

    let mut pops: u32 = 0;
    while let Some(cell) = heap.pop() {
        pops += 1;
        if pops % CANCEL_CHECK_INTERVAL == 0 {
            cancel.check()?;
        }

        let ci = cell.idx as usize;
        let cx = ci % w;
        let cy = ci / w;

        for (_d, nx, ny) in crate::grid::neighbors8_indexed(cx, cy, w, h) {
            let ni = ny * w + nx;
            if visited[ni] {
                continue;
            }
            visited[ni] = true;

            if elev.data[ni] <= cell.elev {
                elev.data[ni] = cell.elev + EPSILON;
            }
            heap.push(FloodEntry { elev: elev.data[ni], idx: ni as u32 });
        }
    }
    Ok(())
}

/// D8 flow direction for each cell (steepest descent). Ties between
/// candidate neighbors resolve to the first in `MOORE_OFFSETS` order, so
/// results don't depend on iteration order (spec §5, §8).
fn compute_flow_direction(elev: &Grid<f32>) -> Grid<u8> {
    let w = elev.w;
    let h = elev.h;
    let mut flow_dir = Grid::new(w, h);

    flow_dir.data.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let e = elev.get(x, y);
            let mut best_dir: u8 = 255;
            let mut best_slope = 0.0f32;

            for (d, &(dx, dy)) in MOORE_OFFSETS.iter().enumerate() {
                let Some((nx, ny)) = clamp_xy(x as i64 + dx, y as i64 + dy, w, h) else {
                    continue;
                };
                let ne = elev.get(nx, ny);
                let slope = (e - ne) / MOORE_DIST[d];
                if slope > best_slope {
                    best_slope = slope;
                    best_dir = d as u8;
                }
            }

            row[x] = best_dir;
        }
    });

    flow_dir
}

/// Argsort indices by elevation (descending -- highest first).
fn argsort_descending(elev: &Grid<f32>) -> Vec<u32> {
    let n = elev.data.len();
    let mut indices: Vec<u32> = (0..n as u32).collect();
    indices.par_sort_unstable_by(|&a, &b| {
        elev.data[b as usize]
            .partial_cmp(&elev.data[a as usize])
            .unwrap_or(Ordering::Equal)
    });
    indices
}

/// Flow accumulation: traverse cells highest-to-lowest, each cell adding
/// its precipitation plus upstream flow to its D8 downstream neighbor.
fn flow_accumulation(flow_dir: &Grid<u8>, precip: &Grid<f32>, sorted: &[u32]) -> Vec<f32> {
    let w = flow_dir.w;
    let h = flow_dir.h;
    let n = w * h;

    let mut flow = vec![0.0f32; n];
    flow.copy_from_slice(&precip.data);

    for &idx in sorted {
        let i = idx as usize;
        let dir = flow_dir.data[i];
        if dir >= 8 {
            continue;
        }

        let x = i % w;
        let y = i / w;
        let (dx, dy) = MOORE_OFFSETS[dir as usize];
        let Some((nx, ny)) = clamp_xy(x as i64 + dx, y as i64 + dy, w, h) else {
            continue;
        };
        let ni = ny * w + nx;
        flow[ni] += flow[i];
    }

    flow
}

/// Main hydrology pipeline: depression filling, D8 flow routing, flow
/// accumulation, and river/lake thresholding.
pub fn compute_hydrology(
    height: &Grid<f32>,
    precipitation: &Grid<f32>,
    ocean: &Grid<bool>,
    params: &Params,
    cancel: &CancelToken,
) -> Result<Hydrology, WorldgenError> {
    let w = height.w;
    let h = height.h;

    let mut hydro_elevation = height.clone();
    priority_flood(&mut hydro_elevation, ocean, cancel)?;

    let flow_dir = compute_flow_direction(&hydro_elevation);
    let sorted = argsort_descending(&hydro_elevation);
    let flow = flow_accumulation(&flow_dir, precipitation, &sorted);

    let mut flow_accum = Grid::<f32>::new(w, h);
    flow_accum.data.copy_from_slice(&flow);
    for i in 0..w * h {
        if ocean.data[i] {
            flow_accum.data[i] = 0.0;
        }
    }

    // river_percentile is a fraction in [0, 1): only the top
    // (1 - river_percentile) share of land cells by flow count as rivers.
    let mut land_flows: Vec<f32> = (0..w * h)
        .filter(|&i| !ocean.data[i])
        .map(|i| flow_accum.data[i])
        .collect();
    let threshold = if land_flows.len() > 100 {
        land_flows.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap());
        let idx = (params.river_percentile as f64 * land_flows.len() as f64) as usize;
        let idx = idx.min(land_flows.len() - 1);
        land_flows[idx]
    } else {
        f32::MAX
    };

    let mut river_flag = Grid::<bool>::new(w, h);
    let mut lake_flag = Grid::<bool>::new(w, h);
    for i in 0..w * h {
        river_flag.data[i] = !ocean.data[i] && flow_accum.data[i] >= threshold;
        lake_flag.data[i] = !ocean.data[i] && hydro_elevation.data[i] > height.data[i] + EPSILON;
    }

    Ok(Hydrology {
        hydro_elevation,
        flow_dir,
        flow_accum,
        river_flag,
        lake_flag,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crater(w: usize, h: usize) -> Grid<f32> {
        let mut g = Grid::<f32>::filled(w, h, 500.0);
        for y in h / 2 - 3..h / 2 + 3 {
            for x in w / 2 - 3..w / 2 + 3 {
                g.set(x, y, -100.0);
            }
        }
        g
    }

    #[test]
    fn filled_elevation_never_drops_below_original() {
        let height = crater(32, 32);
        let ocean = Grid::<bool>::new(32, 32);
        let params = Params::default();
        let cancel = CancelToken::new();
        let hydro = compute_hydrology(&height, &Grid::<f32>::filled(32, 32, 100.0), &ocean, &params, &cancel).unwrap();
        for i in 0..32 * 32 {
            assert!(hydro.hydro_elevation.data[i] >= height.data[i]);
        }
    }

    #[test]
    fn enclosed_depression_is_flagged_as_lake() {
        let height = crater(32, 32);
        let ocean = Grid::<bool>::new(32, 32);
        let params = Params::default();
        let cancel = CancelToken::new();
        let hydro = compute_hydrology(&height, &Grid::<f32>::filled(32, 32, 100.0), &ocean, &params, &cancel).unwrap();
        assert!(hydro.lake_flag.get(16, 16));
    }

    #[test]
    fn ocean_cells_never_carry_river_flag() {
        let w = 24;
        let h = 24;
        let height = Grid::<f32>::filled(w, h, -50.0);
        let mut ocean = Grid::<bool>::new(w, h);
        for v in ocean.data.iter_mut() {
            *v = true;
        }
        let params = Params::default();
        let cancel = CancelToken::new();
        let hydro = compute_hydrology(&height, &Grid::<f32>::filled(w, h, 5000.0), &ocean, &params, &cancel).unwrap();
        assert!(hydro.river_flag.data.iter().all(|&v| !v));
    }

    #[test]
    fn cancelled_token_aborts_the_flood_fill() {
        let height = crater(64, 64);
        let ocean = Grid::<bool>::new(64, 64);
        let params = Params::default();
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = compute_hydrology(&height, &Grid::<f32>::filled(64, 64, 100.0), &ocean, &params, &cancel);
        assert!(matches!(result, Err(crate::error::WorldgenError::Cancelled)));
    }
}
