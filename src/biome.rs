//! Biome classification (spec §4.9): a Whittaker-style temperature x
//! rainfall lookup, overridden by elevation for alpine/snow caps and split
//! into shallow/deep bands over water.

use crate::config::Params;
use crate::grid::Grid;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Biome {
    OceanDeep = 0,
    OceanShallow = 1,
    Ice = 2,
    Tundra = 3,
    Taiga = 4,
    Grassland = 5,
    Forest = 6,
    Rainforest = 7,
    Desert = 8,
    Savanna = 9,
    Alpine = 10,
}

impl Biome {
    pub fn name(self) -> &'static str {
        match self {
            Biome::OceanDeep => "ocean_deep",
            Biome::OceanShallow => "ocean_shallow",
            Biome::Ice => "ice",
            Biome::Tundra => "tundra",
            Biome::Taiga => "taiga",
            Biome::Grassland => "grassland",
            Biome::Forest => "forest",
            Biome::Rainforest => "rainforest",
            Biome::Desert => "desert",
            Biome::Savanna => "savanna",
            Biome::Alpine => "alpine",
        }
    }
}

/// Shelf depth (relative to sea level) dividing shallow from deep ocean.
const SHALLOW_DEPTH: f32 = 200.0;

/// Whittaker-style lookup: given land temperature (C) and annual rainfall
/// (mm/yr), return the dominant biome. Boundaries are approximate standard
/// Whittaker diagram breakpoints.
fn whittaker(temp_c: f32, rain_mm: f32) -> Biome {
    if temp_c < -5.0 {
        return Biome::Ice;
    }
    if temp_c < 5.0 {
        return if rain_mm < 400.0 { Biome::Tundra } else { Biome::Taiga };
    }
    if temp_c < 15.0 {
        if rain_mm < 300.0 {
            Biome::Grassland
        } else if rain_mm < 1500.0 {
            Biome::Forest
        } else {
            Biome::Taiga
        }
    } else if rain_mm < 300.0 {
        Biome::Desert
    } else if rain_mm < 1000.0 {
        Biome::Savanna
    } else if rain_mm < 2000.0 {
        Biome::Forest
    } else {
        Biome::Rainforest
    }
}

/// Classify every cell into a biome from temperature, rainfall, elevation
/// and the ocean mask. Elevation overrides the temperature/rainfall lookup
/// above `alpine_altitude` (bare rock and permanent snow regardless of
/// what the climate fields alone would suggest), and ocean cells skip the
/// land lookup entirely in favor of a depth split.
pub fn classify_biomes(
    height: &Grid<f32>,
    temperature: &Grid<f32>,
    rainfall: &Grid<f32>,
    ocean: &Grid<bool>,
    sea_level: f32,
    params: &Params,
) -> Grid<u8> {
    let w = height.w;
    let h = height.h;
    let mut out = Grid::<u8>::new(w, h);

    for i in 0..w * h {
        let biome = if ocean.data[i] {
            if sea_level - height.data[i] > SHALLOW_DEPTH {
                Biome::OceanDeep
            } else {
                Biome::OceanShallow
            }
        } else if height.data[i] - sea_level > params.alpine_altitude {
            Biome::Alpine
        } else {
            whittaker(temperature.data[i], rainfall.data[i])
        };
        out.data[i] = biome as u8;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hot_wet_land_is_rainforest() {
        assert_eq!(whittaker(28.0, 2500.0), Biome::Rainforest);
    }

    #[test]
    fn cold_dry_land_is_tundra() {
        assert_eq!(whittaker(0.0, 200.0), Biome::Tundra);
    }

    #[test]
    fn high_elevation_overrides_climate_lookup() {
        let w = 4;
        let h = 4;
        let mut height = Grid::<f32>::filled(w, h, 100.0);
        height.set(0, 0, 5000.0);
        let temp = Grid::<f32>::filled(w, h, 28.0);
        let rain = Grid::<f32>::filled(w, h, 2500.0);
        let ocean = Grid::<bool>::new(w, h);
        let params = Params::default();
        let biomes = classify_biomes(&height, &temp, &rain, &ocean, 0.0, &params);
        assert_eq!(biomes.get(0, 0), Biome::Alpine as u8);
        assert_eq!(biomes.get(1, 1), Biome::Rainforest as u8);
    }

    #[test]
    fn deep_ocean_is_distinct_from_shallow() {
        let w = 4;
        let h = 4;
        let mut height = Grid::<f32>::filled(w, h, -5000.0);
        height.set(0, 0, -50.0);
        let temp = Grid::<f32>::filled(w, h, 15.0);
        let rain = Grid::<f32>::filled(w, h, 1000.0);
        let mut ocean = Grid::<bool>::new(w, h);
        for v in ocean.data.iter_mut() {
            *v = true;
        }
        let params = Params::default();
        let biomes = classify_biomes(&height, &temp, &rain, &ocean, 0.0, &params);
        assert_eq!(biomes.get(0, 0), Biome::OceanShallow as u8);
        assert_eq!(biomes.get(1, 1), Biome::OceanDeep as u8);
    }
}
