//! All tunable parameters for the generation pipeline.
use crate::error::WorldgenError;

/// Tunable knobs for every stage. CLI flags set a subset directly
/// (`--water`, `--plates`, `--scale`, `--rain-intensity`,
/// `--river-percentile`); the rest keep their defaults but stay
/// programmatically reachable for embedders.
#[derive(Clone, Debug)]
pub struct Params {
    // Plate tectonics (S1)
    pub num_plates: usize,
    pub continental_fraction: f32,
    pub boundary_noise: f32,

    // Tectonic uplift (S2)
    pub boundary_threshold: f32,
    pub blur_sigma: f32,
    pub mountain_scale: f32,
    pub trench_scale: f32,
    pub mountain_width: f32,
    pub ridge_height: f32,
    pub rift_depth: f32,
    pub shelf_width: f32,

    // Noise / texture (S3)
    pub coast_amp: f32,
    pub interior_amp: f32,
    pub detail_amp: f32,

    // Hydraulic erosion (S3)
    pub erosion_droplets: usize,
    pub erosion_inertia: f32,
    pub erosion_capacity: f32,
    pub erosion_deposition: f32,
    pub erosion_erosion: f32,
    pub erosion_evaporation: f32,
    pub erosion_max_steps: usize,

    // Sea level (S4)
    pub water_frac: f32,

    // Temperature (S5)
    pub t_equator: f32,
    pub k_lat: f32,
    pub k_elev: f32,

    // Precipitation (S6/S7)
    pub rain_intensity: f32,
    pub evap_base: f32,
    pub leak_factor: f32,
    pub orographic_gain: f32,
    pub base_rate: f32,

    // Hydrology (S8)
    pub river_percentile: f32,

    // Biome (S9)
    pub alpine_altitude: f32,

    // Global
    pub scale: f32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            num_plates: 12,
            continental_fraction: 0.4,
            boundary_noise: 2.0,

            boundary_threshold: 0.1,
            blur_sigma: 3.0,
            mountain_scale: 0.6,
            trench_scale: 1.0,
            mountain_width: 5.0,
            ridge_height: 1500.0,
            rift_depth: 600.0,
            shelf_width: 50.0,

            coast_amp: 1.0,
            interior_amp: 1.0,
            detail_amp: 50.0,

            erosion_droplets: 0, // derived from grid area at generation time
            erosion_inertia: 0.05,
            erosion_capacity: 8.0,
            erosion_deposition: 0.3,
            erosion_erosion: 0.3,
            erosion_evaporation: 0.02,
            erosion_max_steps: 64,

            water_frac: 0.6,

            t_equator: 30.0,
            k_lat: 60.0,
            k_elev: 6.5,

            rain_intensity: 1.0,
            evap_base: 1.0,
            leak_factor: 0.92,
            orographic_gain: 2.0,
            base_rate: 0.05,

            river_percentile: 0.98,

            alpine_altitude: 2800.0,

            scale: 1.0,
        }
    }
}

impl Params {
    /// Validate CLI-reachable ranges (spec §6, §7 ConfigError). Called
    /// before any simulation work begins.
    pub fn validate(&self, width: usize, height: usize) -> Result<(), WorldgenError> {
        if width == 0 || height == 0 {
            return Err(WorldgenError::Config(format!(
                "width and height must be positive, got {width}x{height}"
            )));
        }
        if !(0.05..=0.95).contains(&self.water_frac) {
            return Err(WorldgenError::Config(format!(
                "water fraction must be in [0.05, 0.95], got {}",
                self.water_frac
            )));
        }
        if !(4..=40).contains(&self.num_plates) {
            return Err(WorldgenError::Config(format!(
                "plate count must be in [4, 40], got {}",
                self.num_plates
            )));
        }
        if self.scale <= 0.0 {
            return Err(WorldgenError::Config(format!(
                "scale must be positive, got {}",
                self.scale
            )));
        }
        if !(0.0..1.0).contains(&self.river_percentile) {
            return Err(WorldgenError::Config(format!(
                "river percentile must be in [0, 1), got {}",
                self.river_percentile
            )));
        }
        Ok(())
    }

    /// Number of erosion droplets, scaled to grid area unless overridden.
    pub fn droplet_count(&self, width: usize, height: usize) -> usize {
        if self.erosion_droplets > 0 {
            self.erosion_droplets
        } else {
            ((width * height) / 50).clamp(2_000, 400_000)
        }
    }
}
