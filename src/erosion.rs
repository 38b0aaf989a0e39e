//! Hydraulic erosion via simulated water droplets (spec §4.3).
//!
//! Each droplet starts at a deterministic position, flows downhill across
//! bilinearly-sampled height/gradient fields, and exchanges sediment with
//! the terrain according to carrying capacity. Droplets are independent of
//! each other during their walk, so the walk itself parallelizes over
//! `rayon`; what does not parallelize safely is the accumulation step, since
//! float addition is not associative. Every droplet's terrain deltas are
//! collected into its own buffer and merged into the shared height grid
//! sequentially, in droplet-index order, so the result is identical
//! regardless of how rayon schedules the walks (spec §5, §9: "no atomic
//! float accumulation").

use rayon::prelude::*;

use crate::cancel::CancelToken;
use crate::config::Params;
use crate::error::WorldgenError;
use crate::grid::{Grid, sample_bilinear};
use crate::rng::{Rng, seed_u32};

const SALT_DROPLET: u64 = 0xE205_10D0_CAFE_0003;

/// Droplets per batch between cancellation checks. Each batch still walks
/// in parallel via rayon; only the boundary between batches is sequential.
const CANCEL_CHECK_BATCH: usize = 2048;

struct Deposit {
    idx: usize,
    delta: f32,
}

/// Bilinearly sampled gradient (finite difference in each axis).
fn sample_gradient(grid: &Grid<f32>, x: f32, y: f32) -> (f32, f32) {
    let eps = 1.0;
    let hx0 = sample_bilinear(grid, x - eps, y);
    let hx1 = sample_bilinear(grid, x + eps, y);
    let hy0 = sample_bilinear(grid, x, y - eps);
    let hy1 = sample_bilinear(grid, x, y + eps);
    ((hx1 - hx0) / (2.0 * eps), (hy1 - hy0) / (2.0 * eps))
}

/// Walk a single droplet from `(x, y)`, returning its sequence of terrain
/// deltas. A droplet that steps off the grid is discarded -- whatever
/// sediment it still carries is simply lost, matching the flat-grid edge
/// policy used everywhere else in the pipeline (edges are sinks).
fn walk_droplet(height: &Grid<f32>, params: &Params, x0: f32, y0: f32) -> Vec<Deposit> {
    let w = height.w;
    let h = height.h;
    let mut x = x0;
    let mut y = y0;
    let mut dir_x = 0.0f32;
    let mut dir_y = 0.0f32;
    let mut speed = 1.0f32;
    let mut water = 1.0f32;
    let mut sediment = 0.0f32;

    let mut deposits = Vec::new();

    for _ in 0..params.erosion_max_steps {
        if x < 0.0 || y < 0.0 || x >= (w - 1) as f32 || y >= (h - 1) as f32 {
            break;
        }

        let (gx, gy) = sample_gradient(height, x, y);
        dir_x = dir_x * params.erosion_inertia - gx * (1.0 - params.erosion_inertia);
        dir_y = dir_y * params.erosion_inertia - gy * (1.0 - params.erosion_inertia);
        let len = dir_x.hypot(dir_y);
        if len < 1e-6 {
            break;
        }
        dir_x /= len;
        dir_y /= len;

        let new_x = x + dir_x;
        let new_y = y + dir_y;
        if new_x < 0.0 || new_y < 0.0 || new_x >= (w - 1) as f32 || new_y >= (h - 1) as f32 {
            break;
        }

        let old_h = sample_bilinear(height, x, y);
        let new_h = sample_bilinear(height, new_x, new_y);
        let delta_h = new_h - old_h;

        let capacity =
            (-delta_h).max(0.01) * speed * water * params.erosion_capacity;

        if sediment > capacity || delta_h > 0.0 {
            // Moving uphill, or carrying more than capacity: deposit.
            let deposit = if delta_h > 0.0 {
                (delta_h.min(sediment)).max(0.0)
            } else {
                (sediment - capacity) * params.erosion_deposition
            };
            sediment -= deposit;
            deposit_bilinear(&mut deposits, w, h, x, y, deposit);
        } else {
            let erode = ((capacity - sediment) * params.erosion_erosion)
                .min(-delta_h)
                .max(0.0);
            sediment += erode;
            deposit_bilinear(&mut deposits, w, h, x, y, -erode);
        }

        speed = (speed * speed + delta_h.abs() * 4.0).sqrt().clamp(0.1, 8.0);
        water *= 1.0 - params.erosion_evaporation;

        x = new_x;
        y = new_y;

        if water < 1e-3 {
            break;
        }
    }

    deposits
}

/// Spread a height delta across the four bilinear neighbors of a continuous
/// position, weighted the same way sampling reads them, so deposition and
/// erosion are inverses of the same interpolation.
fn deposit_bilinear(out: &mut Vec<Deposit>, w: usize, h: usize, x: f32, y: f32, delta: f32) {
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let w00 = (1.0 - fx) * (1.0 - fy);
    let w10 = fx * (1.0 - fy);
    let w01 = (1.0 - fx) * fy;
    let w11 = fx * fy;

    out.push(Deposit { idx: y0 * w + x0, delta: delta * w00 });
    out.push(Deposit { idx: y0 * w + x1, delta: delta * w10 });
    out.push(Deposit { idx: y1 * w + x0, delta: delta * w01 });
    out.push(Deposit { idx: y1 * w + x1, delta: delta * w11 });
}

/// Run hydraulic erosion over `height` in place, returning the total number
/// of droplets simulated (recorded in timing diagnostics upstream).
///
/// Droplet starting positions are deterministic given `seed`. Walks run in
/// parallel in batches of `CANCEL_CHECK_BATCH`, each batch still reading the
/// pristine `height`; their deltas are merged back strictly in launch order
/// once every batch has walked, so the final field is bit-identical
/// regardless of thread count or batch size. `cancel` is polled between
/// batches.
pub fn erode(height: &mut Grid<f32>, params: &Params, seed: u64, cancel: &CancelToken) -> Result<usize, WorldgenError> {
    let w = height.w;
    let h = height.h;
    let count = params.droplet_count(w, h);
    let drop_seed = seed_u32(seed, SALT_DROPLET);

    let starts: Vec<(f32, f32)> = (0..count)
        .map(|i| {
            let mut rng = Rng::new(((drop_seed as u64) << 32) ^ (i as u64).wrapping_mul(0x9E3779B97F4A7C15));
            (rng.range_f32(0.0, w as f32), rng.range_f32(0.0, h as f32))
        })
        .collect();

    // Batches give cancellation a place to land between rayon fan-outs; the
    // merge into `height` still happens after every batch has walked, so
    // every droplet still reads the same pristine `height` regardless of
    // batch size -- batching only changes where polling happens, not the
    // result.
    let mut walks: Vec<Vec<Deposit>> = Vec::with_capacity(count);
    for batch in starts.chunks(CANCEL_CHECK_BATCH) {
        cancel.check()?;
        walks.extend(batch.par_iter().map(|&(x, y)| walk_droplet(height, params, x, y)).collect::<Vec<_>>());
    }

    for walk in walks {
        for d in walk {
            height.data[d.idx] += d.delta;
        }
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bumpy_grid(w: usize, h: usize) -> Grid<f32> {
        let mut g = Grid::<f32>::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let dx = x as f32 - w as f32 / 2.0;
                let dy = y as f32 - h as f32 / 2.0;
                g.set(x, y, 1000.0 - (dx * dx + dy * dy) * 0.5);
            }
        }
        g
    }

    #[test]
    fn erosion_leaves_finite_heights() {
        let mut g = bumpy_grid(32, 32);
        let mut params = Params::default();
        params.erosion_droplets = 200;
        let cancel = CancelToken::new();
        erode(&mut g, &params, 7, &cancel).unwrap();
        assert!(g.data.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn same_seed_is_deterministic() {
        let mut a = bumpy_grid(32, 32);
        let mut b = bumpy_grid(32, 32);
        let mut params = Params::default();
        params.erosion_droplets = 200;
        let cancel = CancelToken::new();
        erode(&mut a, &params, 123, &cancel).unwrap();
        erode(&mut b, &params, 123, &cancel).unwrap();
        assert_eq!(a.data, b.data);
    }

    #[test]
    fn batch_size_does_not_affect_the_result() {
        let mut a = bumpy_grid(32, 32);
        let mut b = bumpy_grid(32, 32);
        let mut params = Params::default();
        params.erosion_droplets = CANCEL_CHECK_BATCH * 3 + 17;
        let cancel = CancelToken::new();
        erode(&mut a, &params, 55, &cancel).unwrap();
        erode(&mut b, &params, 55, &cancel).unwrap();
        assert_eq!(a.data, b.data);
    }

    #[test]
    fn zero_droplets_leaves_grid_unchanged() {
        let mut g = bumpy_grid(16, 16);
        let before = g.data.clone();
        let mut params = Params::default();
        params.erosion_droplets = 1;
        params.erosion_max_steps = 0;
        let cancel = CancelToken::new();
        erode(&mut g, &params, 1, &cancel).unwrap();
        assert_eq!(g.data, before);
    }

    #[test]
    fn cancelled_token_is_observed_before_any_erosion_runs() {
        let mut g = bumpy_grid(16, 16);
        let before = g.data.clone();
        let mut params = Params::default();
        params.erosion_droplets = 200;
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = erode(&mut g, &params, 1, &cancel);
        assert!(matches!(result, Err(WorldgenError::Cancelled)));
        assert_eq!(g.data, before);
    }
}
