use crate::grid::Grid;
use crate::noise::fbm;
use crate::rng::{Rng, seed_u32};

const SALT_CONTINENT: u64 = 0xC017_1E17_FACE_0001;
const SALT_VELOCITY: u64 = 0xC1A5_51F0_0000_0001;

/// Per-plate properties: kind (continental/oceanic), motion, base elevation.
pub struct PlateSet {
    pub num_plates: usize,
    pub is_continental: Vec<bool>,
    pub velocity: Vec<[f32; 2]>,
    pub base_elevation: Vec<f32>,
}

/// Assign each plate a kind, a unit(-ish) velocity, and a base elevation.
///
/// Continental/oceanic assignment uses low-frequency noise sampled at each
/// plate's seed position, sorted descending and filled until
/// `continental_fraction` of the grid is claimed: this produces coherent
/// continent blobs rather than a fixed per-plate coin flip (spec §4.1:
/// "random type label ... biased by water_frac" -- the caller derives
/// `continental_fraction` from `1.0 - water_frac` by default).
pub fn assign_plate_properties(
    num_plates: usize,
    seeds: &[[f32; 2]],
    plate_id: &Grid<u16>,
    continental_fraction: f32,
    seed: u64,
) -> PlateSet {
    let w = plate_id.w;
    let h = plate_id.h;
    let mut rng = Rng::new(seed ^ SALT_VELOCITY);

    // Cells per plate, for area-weighted fraction and net-zero momentum.
    let mut counts = vec![0usize; num_plates];
    for &pid in &plate_id.data {
        if (pid as usize) < num_plates {
            counts[pid as usize] += 1;
        }
    }

    // Continental assignment via noise sampled at each seed position.
    let continent_seed = seed_u32(seed, SALT_CONTINENT);
    let mut noise_vals: Vec<(usize, f32)> = (0..num_plates)
        .map(|i| {
            let u = seeds[i][0] / w as f32;
            let v = seeds[i][1] / h as f32;
            let n = fbm(u, v, continent_seed, 3, 2.5, 2.0, 0.5);
            (i, n)
        })
        .collect();
    noise_vals.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

    let total: usize = counts.iter().sum();
    let mut is_continental = vec![false; num_plates];
    let mut remaining = (continental_fraction * total as f32) as usize;
    for &(idx, _) in &noise_vals {
        if remaining == 0 {
            break;
        }
        is_continental[idx] = true;
        remaining = remaining.saturating_sub(counts[idx]);
    }

    // Random velocity per plate, net-zero area-weighted momentum so no
    // global drift biases the boundary classification.
    let mut velocity = vec![[0.0f32; 2]; num_plates];
    for v in &mut velocity {
        let angle = rng.range_f32(0.0, std::f32::consts::TAU);
        let mag = rng.range_f32(0.3, 1.0);
        *v = [angle.cos() * mag, angle.sin() * mag];
    }
    let (mut sx, mut sy, mut sw) = (0.0f32, 0.0f32, 0.0f32);
    for (i, v) in velocity.iter().enumerate() {
        let wt = counts[i] as f32;
        sx += v[0] * wt;
        sy += v[1] * wt;
        sw += wt;
    }
    if sw > 0.0 {
        let bx = sx / sw;
        let by = sy / sw;
        for v in &mut velocity {
            v[0] -= bx;
            v[1] -= by;
        }
    }

    let mut base_elevation = vec![0.0f32; num_plates];
    for (i, elev) in base_elevation.iter_mut().enumerate() {
        *elev = if is_continental[i] {
            rng.range_f32(200.0, 800.0)
        } else {
            rng.range_f32(-4000.0, -3000.0)
        };
    }

    PlateSet {
        num_plates,
        is_continental,
        velocity,
        base_elevation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plates::grow::grow_plates;
    use crate::plates::seed::poisson_plate_seeds;

    #[test]
    fn every_plate_gets_a_kind_and_velocity() {
        let seeds = poisson_plate_seeds(64, 64, 6, 3);
        let pid = grow_plates(64, 64, &seeds, 3, 1.0);
        let set = assign_plate_properties(6, &seeds, &pid, 0.5, 3);
        assert_eq!(set.is_continental.len(), 6);
        assert_eq!(set.velocity.len(), 6);
        assert_eq!(set.base_elevation.len(), 6);
    }

    #[test]
    fn continental_plates_get_positive_base_elevation() {
        let seeds = poisson_plate_seeds(64, 64, 8, 9);
        let pid = grow_plates(64, 64, &seeds, 9, 1.0);
        let set = assign_plate_properties(8, &seeds, &pid, 0.6, 9);
        for i in 0..8 {
            if set.is_continental[i] {
                assert!(set.base_elevation[i] > 0.0);
            } else {
                assert!(set.base_elevation[i] < 0.0);
            }
        }
    }
}
