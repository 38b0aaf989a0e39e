use rayon::prelude::*;

use crate::config::Params;
use crate::grid::Grid;
use crate::noise::fbm;
use crate::rng::seed_u32;

const SALT_TEMP: u64 = 0xC11_CAFE_0001;

/// Compute temperature grid (Celsius) from elevation.
/// - Latitude gradient: `t_equator` at the equator, falling off as lat^1.5
///   toward the poles (`k_lat` sets the pole-to-equator spread).
/// - Lapse rate: `-k_elev` per 1000m of elevation above sea level.
/// - Small FBM noise for local variation.
pub fn compute_temperature(height: &Grid<f32>, sea_level: f32, seed: u64, params: &Params) -> Grid<f32> {
    let w = height.w;
    let h = height.h;
    let mut temp = Grid::new(w, h);
    let noise_seed = seed_u32(seed, SALT_TEMP);

    temp.data.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        let lat = ((y as f32 / h as f32) - 0.5).abs() * 2.0; // 0 at equator, 1 at poles
        let base_temp = params.t_equator - params.k_lat * lat.powf(1.5);
        for x in 0..w {
            let elev = height.get(x, y);
            let above_sea = (elev - sea_level).max(0.0);
            let mut t = base_temp - params.k_elev * above_sea / 1000.0;
            let nx = x as f32 / w as f32 * 8.0;
            let ny = y as f32 / h as f32 * 8.0;
            t += fbm(nx, ny, noise_seed, 4, 1.0, 2.0, 0.5) * 2.0;
            row[x] = t;
        }
    });

    temp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equator_is_warmer_than_poles() {
        let height = Grid::<f32>::new(16, 64);
        let params = Params::default();
        let temp = compute_temperature(&height, 0.0, 1, &params);
        let equator = temp.get(0, 32);
        let pole = temp.get(0, 0);
        assert!(equator > pole);
    }

    #[test]
    fn higher_elevation_is_colder_at_same_latitude() {
        let mut height = Grid::<f32>::new(16, 16);
        height.set(1, 8, 3000.0);
        let params = Params::default();
        let temp = compute_temperature(&height, 0.0, 1, &params);
        assert!(temp.get(1, 8) < temp.get(0, 8));
    }

    #[test]
    fn lapse_rate_is_measured_above_sea_level_not_zero() {
        // A submerged plain (elevation 500, sea_level 1000) should be no
        // colder than bare sea level -- the old `elev > 0.0` gate would
        // have applied a lapse penalty here even though it's underwater.
        let height = Grid::<f32>::filled(4, 4, 500.0);
        let params = Params::default();
        let at_sea_level = compute_temperature(&height, 1000.0, 1, &params);
        let flat = Grid::<f32>::filled(4, 4, 1000.0);
        let baseline = compute_temperature(&flat, 1000.0, 1, &params);
        assert_eq!(at_sea_level.get(2, 2), baseline.get(2, 2));
    }
}
