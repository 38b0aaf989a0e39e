pub mod biome;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod elevation;
pub mod erosion;
pub mod error;
pub mod grid;
pub mod hydrology;
pub mod ir;
pub mod log;
pub mod noise;
pub mod plates;
pub mod precipitation;
pub mod render;
pub mod rng;
pub mod sea;
pub mod temperature;
pub mod wind;

use std::time::Instant;

use cancel::CancelToken;
use config::Params;
use error::WorldgenError;
use grid::Grid;

/// All fields produced by the pipeline (spec §3). Stages append fields and
/// never revisit one owned by an earlier stage; `elevation` is the
/// post-erosion field S4 onward reads, while `hydro_elevation` only shadows
/// it for drainage routing from S8 onward, it never overwrites `elevation`.
pub struct World {
    pub w: usize,
    pub h: usize,

    pub plate_id: Grid<u16>,
    pub num_plates: usize,
    pub plate_vel: Vec<[f32; 2]>,
    pub is_continental: Vec<bool>,
    pub boundary_type: Grid<u8>,
    pub boundary_dist: Grid<f32>,

    pub base_elevation: Grid<f32>,
    pub elevation: Grid<f32>,

    pub sea_level: f32,
    pub is_ocean: Grid<bool>,

    pub temperature: Grid<f32>,
    pub wind_vec: Grid<[f32; 2]>,
    pub rainfall: Grid<f32>,

    pub hydro_elevation: Grid<f32>,
    pub flow_dir: Grid<u8>,
    pub flow_accum: Grid<f32>,
    pub river_flag: Grid<bool>,
    pub lake_flag: Grid<bool>,

    pub biome: Grid<u8>,
}

pub struct Timing {
    pub name: &'static str,
    pub ms: f64,
}

/// Sigma for the light post-erosion smoothing pass (spec §4.3): just enough
/// to knock down single-cell noise without softening real erosion features.
const POST_EROSION_BLUR_SIGMA: f32 = 0.6;

struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    fn start() -> Self {
        Self { start: Instant::now() }
    }

    fn stop(self, name: &'static str, timings: &mut Vec<Timing>) {
        timings.push(Timing {
            name,
            ms: self.start.elapsed().as_secs_f64() * 1000.0,
        });
    }
}

/// Run the full pipeline, stage by stage, polling `cancel` at every stage
/// boundary (spec §5). Returns as soon as any stage fails; the `World`
/// under construction is simply dropped, discarding partial state.
pub fn generate(
    seed: u64,
    w: usize,
    h: usize,
    params: &Params,
    cancel: &CancelToken,
) -> Result<(World, Vec<Timing>), WorldgenError> {
    params.validate(w, h)?;

    let mut timings = Vec::new();

    // S1: plate synthesis
    cancel.check()?;
    let sw = Stopwatch::start();
    let seeds = plates::seed::poisson_plate_seeds(w, h, params.num_plates, seed);
    let plate_id = plates::grow::grow_plates(w, h, &seeds, seed, params.boundary_noise);
    let plate_set = plates::properties::assign_plate_properties(
        params.num_plates,
        &seeds,
        &plate_id,
        params.continental_fraction,
        seed,
    );
    sw.stop("plate_synthesis", &mut timings);

    // S2: tectonic uplift (boundary classification + distance field + base elevation)
    cancel.check()?;
    let sw = Stopwatch::start();
    let (btype_grid, pa_grid, pb_grid) =
        plates::boundary::extract_boundaries(&plate_id, &plate_set, params.boundary_threshold);
    let (dist_grid, near_bx, near_by) = plates::distance::boundary_distance_field(&btype_grid);
    let base_elevation = elevation::build_elevation(
        &plate_id, &plate_set, &btype_grid, &dist_grid, &near_bx, &near_by, &pa_grid, &pb_grid, seed, params,
    );
    sw.stop("tectonic_uplift", &mut timings);

    // S3: hydraulic erosion, then a light blur to remove single-cell noise
    cancel.check()?;
    let sw = Stopwatch::start();
    let mut elevation_grid = base_elevation.clone();
    erosion::erode(&mut elevation_grid, params, seed, cancel)?;
    elevation::blur_grid(&mut elevation_grid.data, w, h, POST_EROSION_BLUR_SIGMA);
    if elevation_grid.data.iter().any(|v| !v.is_finite()) {
        return Err(WorldgenError::Invariant("elevation contains non-finite values after erosion".into()));
    }
    sw.stop("erosion", &mut timings);

    // S4: sea level & ocean mask
    cancel.check()?;
    let sw = Stopwatch::start();
    let sea_level = sea::find_sea_level(&elevation_grid, params.water_frac);
    let is_ocean = sea::ocean_mask(&elevation_grid, sea_level);
    sw.stop("sea_level", &mut timings);

    // S5: temperature
    cancel.check()?;
    let sw = Stopwatch::start();
    let temperature = temperature::compute_temperature(&elevation_grid, sea_level, seed, params);
    sw.stop("temperature", &mut timings);

    // S6: prevailing winds
    cancel.check()?;
    let sw = Stopwatch::start();
    let wind_vec = wind::compute_wind(w, h);
    sw.stop("wind", &mut timings);

    // S7: orographic precipitation
    cancel.check()?;
    let sw = Stopwatch::start();
    let rainfall = precipitation::compute_precipitation(&elevation_grid, &temperature, &is_ocean, &wind_vec, params);
    if rainfall.data.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(WorldgenError::Invariant("rainfall contains negative or non-finite values".into()));
    }
    sw.stop("precipitation", &mut timings);

    // S8: hydrology
    cancel.check()?;
    let sw = Stopwatch::start();
    let hydro = hydrology::compute_hydrology(&elevation_grid, &rainfall, &is_ocean, params, cancel)?;
    sw.stop("hydrology", &mut timings);

    // S9: biome assignment
    cancel.check()?;
    let sw = Stopwatch::start();
    let biome = biome::classify_biomes(&elevation_grid, &temperature, &rainfall, &is_ocean, sea_level, params);
    sw.stop("biome", &mut timings);

    let total_ms: f64 = timings.iter().map(|t| t.ms).sum();
    timings.push(Timing { name: "TOTAL", ms: total_ms });

    let world = World {
        w,
        h,
        plate_id,
        num_plates: plate_set.num_plates,
        plate_vel: plate_set.velocity,
        is_continental: plate_set.is_continental,
        boundary_type: btype_grid,
        boundary_dist: dist_grid,
        base_elevation,
        elevation: elevation_grid,
        sea_level,
        is_ocean,
        temperature,
        wind_vec,
        rainfall,
        hydro_elevation: hydro.hydro_elevation,
        flow_dir: hydro.flow_dir,
        flow_accum: hydro.flow_accum,
        river_flag: hydro.river_flag,
        lake_flag: hydro.lake_flag,
        biome,
    };

    Ok((world, timings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_finite_fields_at_small_size() {
        let params = Params::default();
        let cancel = CancelToken::new();
        let (world, _timings) = generate(1, 64, 64, &params, &cancel).expect("generation should succeed");
        assert!(world.elevation.data.iter().all(|v| v.is_finite()));
        assert!(world.rainfall.data.iter().all(|v| v.is_finite() && *v >= 0.0));
        assert_eq!(world.biome.data.len(), 64 * 64);
    }

    #[test]
    fn generate_is_deterministic_for_same_seed() {
        let params = Params::default();
        let cancel = CancelToken::new();
        let (a, _) = generate(42, 48, 48, &params, &cancel).unwrap();
        let (b, _) = generate(42, 48, 48, &params, &cancel).unwrap();
        assert_eq!(a.elevation.data, b.elevation.data);
        assert_eq!(a.rainfall.data, b.rainfall.data);
        assert_eq!(a.biome.data, b.biome.data);
    }

    #[test]
    fn generate_rejects_invalid_params() {
        let mut params = Params::default();
        params.water_frac = 5.0;
        let cancel = CancelToken::new();
        assert!(generate(1, 32, 32, &params, &cancel).is_err());
    }

    #[test]
    fn generate_observes_cancellation() {
        let params = Params::default();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(generate(1, 32, 32, &params, &cancel), Err(WorldgenError::Cancelled)));
    }

    #[test]
    fn ocean_cells_never_carry_river_flag_end_to_end() {
        let params = Params::default();
        let cancel = CancelToken::new();
        let (world, _) = generate(3, 48, 48, &params, &cancel).unwrap();
        for i in 0..world.w * world.h {
            if world.is_ocean.data[i] {
                assert!(!world.river_flag.data[i]);
            }
        }
    }
}
