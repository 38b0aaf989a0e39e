use rayon::prelude::*;

use crate::biome::Biome;
use crate::grid::Grid;
use crate::plates::boundary::{CONVERGENT, DIVERGENT, TRANSFORM};
use crate::rng::splitmix32;

// Color palette (adapted from mapper, tuned for meter-scale elevation)
const WATER_DEEP: [u8; 4] = [18, 36, 70, 255];
const WATER_MID: [u8; 4] = [32, 55, 92, 255];
const WATER_SHALLOW: [u8; 4] = [38, 78, 120, 255];
const COAST_SHALLOW: [u8; 4] = [52, 100, 145, 255];
const LAND_LOW: [u8; 4] = [70, 130, 62, 255];
const LAND_MID: [u8; 4] = [140, 180, 100, 255];
const LAND_HIGH: [u8; 4] = [190, 170, 120, 255];
const MOUNTAIN_LOW: [u8; 4] = [140, 120, 100, 255];
const MOUNTAIN_HIGH: [u8; 4] = [220, 220, 215, 255];
const SNOW: [u8; 4] = [245, 248, 250, 255];
const BEACH_SAND: [u8; 4] = [210, 200, 160, 255];

#[inline]
fn lerp_color(a: [u8; 4], b: [u8; 4], t: f32) -> [u8; 4] {
    let t = t.clamp(0.0, 1.0);
    [
        (a[0] as f32 + (b[0] as f32 - a[0] as f32) * t).round() as u8,
        (a[1] as f32 + (b[1] as f32 - a[1] as f32) * t).round() as u8,
        (a[2] as f32 + (b[2] as f32 - a[2] as f32) * t).round() as u8,
        255,
    ]
}

#[inline]
fn shade_color(c: [u8; 4], factor: f32) -> [u8; 4] {
    [
        (c[0] as f32 * factor).clamp(0.0, 255.0) as u8,
        (c[1] as f32 * factor).clamp(0.0, 255.0) as u8,
        (c[2] as f32 * factor).clamp(0.0, 255.0) as u8,
        255,
    ]
}

/// Directional hillshade from a fixed northwest light, scaled to [0.7, 1.3]
/// so shading adds relief without washing out the elevation palette.
fn hillshade(height: &Grid<f32>, x: usize, y: usize) -> f32 {
    let w = height.w;
    let h = height.h;
    let x0 = x.saturating_sub(1);
    let x1 = (x + 1).min(w - 1);
    let y0 = y.saturating_sub(1);
    let y1 = (y + 1).min(h - 1);
    let dzdx = (height.get(x1, y) - height.get(x0, y)) / ((x1 - x0).max(1) as f32);
    let dzdy = (height.get(x, y1) - height.get(x, y0)) / ((y1 - y0).max(1) as f32);
    let light = [-0.5f32, -0.5, 0.7];
    let normal = {
        let n = [-dzdx, -dzdy, 1.0];
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        [n[0] / len, n[1] / len, n[2] / len]
    };
    let light_len = (light[0] * light[0] + light[1] * light[1] + light[2] * light[2]).sqrt();
    let cos = (normal[0] * light[0] + normal[1] * light[1] + normal[2] * light[2]) / light_len;
    1.0 + cos.clamp(-1.0, 1.0) * 0.3
}

/// Render the final color map. `sea_level` (not a fixed 0.0) is what
/// separates water from land, since sea level is computed per-world from
/// `water_frac` rather than assumed to sit at elevation zero.
pub fn render_map(height: &Grid<f32>, sea_level: f32) -> Vec<u8> {
    let w = height.w;
    let h = height.h;
    let mut rgba = vec![0u8; w * h * 4];

    rgba.par_chunks_mut(w * 4)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..w {
                let elev = height.get(x, y) - sea_level;
                let color = if elev <= 0.0 {
                    let depth = (-elev).min(5000.0) / 5000.0;
                    if depth < 0.15 {
                        lerp_color(COAST_SHALLOW, WATER_SHALLOW, depth / 0.15)
                    } else if depth < 0.5 {
                        lerp_color(WATER_SHALLOW, WATER_MID, (depth - 0.15) / 0.35)
                    } else {
                        lerp_color(WATER_MID, WATER_DEEP, (depth - 0.5) / 0.5)
                    }
                } else {
                    let eh = elev.min(6000.0);
                    let base = if eh < 5.0 {
                        BEACH_SAND
                    } else if eh < 500.0 {
                        let t = (eh - 5.0) / 495.0;
                        lerp_color(LAND_LOW, LAND_MID, t)
                    } else if eh < 1500.0 {
                        let t = (eh - 500.0) / 1000.0;
                        lerp_color(LAND_MID, LAND_HIGH, t)
                    } else if eh < 3000.0 {
                        let t = (eh - 1500.0) / 1500.0;
                        lerp_color(MOUNTAIN_LOW, MOUNTAIN_HIGH, t)
                    } else {
                        let t = ((eh - 3000.0) / 3000.0).min(1.0);
                        lerp_color(MOUNTAIN_HIGH, SNOW, t)
                    };
                    shade_color(base, hillshade(height, x, y))
                };

                let out = &mut row[x * 4..x * 4 + 4];
                out.copy_from_slice(&color);
            }
        });

    rgba
}

// Biome palette, one swatch per `Biome` variant.
const BIOME_OCEAN_DEEP: [u8; 4] = [18, 36, 70, 255];
const BIOME_OCEAN_SHALLOW: [u8; 4] = [38, 78, 120, 255];
const BIOME_ICE: [u8; 4] = [235, 240, 245, 255];
const BIOME_TUNDRA: [u8; 4] = [165, 170, 150, 255];
const BIOME_TAIGA: [u8; 4] = [70, 110, 80, 255];
const BIOME_GRASSLAND: [u8; 4] = [150, 180, 90, 255];
const BIOME_FOREST: [u8; 4] = [50, 120, 55, 255];
const BIOME_RAINFOREST: [u8; 4] = [20, 90, 40, 255];
const BIOME_DESERT: [u8; 4] = [215, 190, 110, 255];
const BIOME_SAVANNA: [u8; 4] = [195, 175, 90, 255];
const BIOME_ALPINE: [u8; 4] = [150, 140, 135, 255];

fn biome_color(biome: u8) -> [u8; 4] {
    match biome {
        x if x == Biome::OceanDeep as u8 => BIOME_OCEAN_DEEP,
        x if x == Biome::OceanShallow as u8 => BIOME_OCEAN_SHALLOW,
        x if x == Biome::Ice as u8 => BIOME_ICE,
        x if x == Biome::Tundra as u8 => BIOME_TUNDRA,
        x if x == Biome::Taiga as u8 => BIOME_TAIGA,
        x if x == Biome::Grassland as u8 => BIOME_GRASSLAND,
        x if x == Biome::Forest as u8 => BIOME_FOREST,
        x if x == Biome::Rainforest as u8 => BIOME_RAINFOREST,
        x if x == Biome::Desert as u8 => BIOME_DESERT,
        x if x == Biome::Savanna as u8 => BIOME_SAVANNA,
        x if x == Biome::Alpine as u8 => BIOME_ALPINE,
        _ => [128, 128, 128, 255],
    }
}

/// Render the production map: per-cell color from the biome palette, with
/// rivers overlaid in blue where `river_flag` is set (spec §4.10). This is
/// the PNG the binary writes, distinct from the elevation-banded diagnostic
/// in `render_map`.
pub fn render_biome_map(biome: &Grid<u8>, river_flag: &Grid<bool>) -> Vec<u8> {
    let w = biome.w;
    let h = biome.h;
    let mut rgba = vec![0u8; w * h * 4];

    rgba.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let color = if river_flag.get(x, y) { RIVER_BLUE } else { biome_color(biome.get(x, y)) };
            row[x * 4..x * 4 + 4].copy_from_slice(&color);
        }
    });

    rgba
}

/// Diagnostic: render plates by a distinct color per plate id, with
/// boundary cells painted by boundary type.
pub fn render_plates(plate_id: &Grid<u16>, btype: &Grid<u8>, num_plates: usize) -> Vec<u8> {
    let w = plate_id.w;
    let h = plate_id.h;

    let colors: Vec<[u8; 4]> = (0..num_plates)
        .map(|i| {
            let hv = splitmix32(i as u32 * 7 + 123);
            [
                (hv & 0xFF) as u8 | 60,
                ((hv >> 8) & 0xFF) as u8 | 60,
                ((hv >> 16) & 0xFF) as u8 | 60,
                255,
            ]
        })
        .collect();

    let mut rgba = vec![0u8; w * h * 4];
    for i in 0..w * h {
        let color = if btype.data[i] != 0 {
            [255, 255, 255, 255]
        } else {
            let pid = plate_id.data[i] as usize;
            colors.get(pid).copied().unwrap_or([128, 128, 128, 255])
        };
        rgba[i * 4..i * 4 + 4].copy_from_slice(&color);
    }
    rgba
}

/// Diagnostic: boundary types as colors.
pub fn render_boundaries(btype: &Grid<u8>) -> Vec<u8> {
    let w = btype.w;
    let h = btype.h;
    let mut rgba = vec![0u8; w * h * 4];
    for i in 0..w * h {
        let color = match btype.data[i] {
            CONVERGENT => [220, 50, 50, 255],
            DIVERGENT => [50, 80, 220, 255],
            TRANSFORM => [50, 200, 80, 255],
            _ => [20, 20, 20, 255],
        };
        rgba[i * 4..i * 4 + 4].copy_from_slice(&color);
    }
    rgba
}

/// Diagnostic: grayscale distance field.
pub fn render_distance(dist: &Grid<f32>) -> Vec<u8> {
    let max_d = dist.data.iter().cloned().filter(|d| d.is_finite()).fold(0.0f32, f32::max);
    let max_d = max_d.max(1.0);
    let w = dist.w;
    let h = dist.h;
    let mut rgba = vec![0u8; w * h * 4];
    for i in 0..w * h {
        let d = dist.data[i].min(max_d);
        let v = ((d / max_d) * 255.0) as u8;
        rgba[i * 4..i * 4 + 4].copy_from_slice(&[v, v, v, 255]);
    }
    rgba
}

/// Diagnostic: grayscale heightmap.
pub fn render_heightmap(height: &Grid<f32>) -> Vec<u8> {
    let min_h = height.data.iter().cloned().fold(f32::INFINITY, f32::min);
    let max_h = height.data.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let range = (max_h - min_h).max(1.0);
    let w = height.w;
    let h = height.h;
    let mut rgba = vec![0u8; w * h * 4];
    for i in 0..w * h {
        let t = (height.data[i] - min_h) / range;
        let v = (t * 255.0).clamp(0.0, 255.0) as u8;
        rgba[i * 4..i * 4 + 4].copy_from_slice(&[v, v, v, 255]);
    }
    rgba
}

// Temperature color stops
const TEMP_COLD: [u8; 4] = [220, 230, 255, 255];
const TEMP_FREEZE: [u8; 4] = [80, 180, 220, 255];
const TEMP_COOL: [u8; 4] = [60, 160, 80, 255];
const TEMP_WARM: [u8; 4] = [220, 200, 60, 255];
const TEMP_HOT: [u8; 4] = [200, 50, 30, 255];

/// Render temperature map (Celsius).
pub fn render_temperature(temp: &Grid<f32>) -> Vec<u8> {
    let w = temp.w;
    let h = temp.h;
    let mut rgba = vec![0u8; w * h * 4];

    rgba.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let t = temp.get(x, y);
            let color = if t < -30.0 {
                TEMP_COLD
            } else if t < 0.0 {
                lerp_color(TEMP_COLD, TEMP_FREEZE, (t + 30.0) / 30.0)
            } else if t < 15.0 {
                lerp_color(TEMP_FREEZE, TEMP_COOL, t / 15.0)
            } else if t < 25.0 {
                lerp_color(TEMP_COOL, TEMP_WARM, (t - 15.0) / 10.0)
            } else if t < 35.0 {
                lerp_color(TEMP_WARM, TEMP_HOT, (t - 25.0) / 10.0)
            } else {
                TEMP_HOT
            };
            row[x * 4..x * 4 + 4].copy_from_slice(&color);
        }
    });

    rgba
}

// Precipitation color stops
const PRECIP_DRY: [u8; 4] = [200, 180, 130, 255];
const PRECIP_LOW: [u8; 4] = [210, 200, 80, 255];
const PRECIP_MED: [u8; 4] = [60, 160, 70, 255];
const PRECIP_HIGH: [u8; 4] = [50, 100, 200, 255];
const PRECIP_VERY_HIGH: [u8; 4] = [20, 40, 120, 255];

/// Render precipitation map (mm/year).
pub fn render_precipitation(precip: &Grid<f32>) -> Vec<u8> {
    let w = precip.w;
    let h = precip.h;
    let mut rgba = vec![0u8; w * h * 4];

    rgba.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let p = precip.get(x, y);
            let color = if p < 250.0 {
                lerp_color(PRECIP_DRY, PRECIP_LOW, p / 250.0)
            } else if p < 1000.0 {
                lerp_color(PRECIP_LOW, PRECIP_MED, (p - 250.0) / 750.0)
            } else if p < 2500.0 {
                lerp_color(PRECIP_MED, PRECIP_HIGH, (p - 1000.0) / 1500.0)
            } else if p < 4000.0 {
                lerp_color(PRECIP_HIGH, PRECIP_VERY_HIGH, (p - 2500.0) / 1500.0)
            } else {
                PRECIP_VERY_HIGH
            };
            row[x * 4..x * 4 + 4].copy_from_slice(&color);
        }
    });

    rgba
}

// Muted terrain colors for river base map
const RIVER_WATER: [u8; 4] = [30, 45, 65, 255];
const RIVER_LAND_LOW: [u8; 4] = [160, 170, 140, 255];
const RIVER_LAND_HIGH: [u8; 4] = [190, 180, 155, 255];
const RIVER_MTN: [u8; 4] = [210, 205, 195, 255];
const RIVER_BLUE: [u8; 4] = [15, 40, 140, 255];

/// Render rivers overlaid on muted terrain. `river_flag` is the boolean
/// threshold mask from hydrology, not the raw flow field -- the overlay is
/// binary (river or not) rather than intensity-graded.
pub fn render_rivers(height: &Grid<f32>, sea_level: f32, river_flag: &Grid<bool>) -> Vec<u8> {
    let w = height.w;
    let h = height.h;
    let mut rgba = vec![0u8; w * h * 4];

    rgba.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let elev = height.get(x, y) - sea_level;

            let base = if elev <= 0.0 {
                RIVER_WATER
            } else {
                let eh = elev.min(5000.0);
                if eh < 500.0 {
                    lerp_color(RIVER_LAND_LOW, RIVER_LAND_HIGH, eh / 500.0)
                } else {
                    lerp_color(RIVER_LAND_HIGH, RIVER_MTN, ((eh - 500.0) / 4500.0).min(1.0))
                }
            };

            let color = if river_flag.get(x, y) { RIVER_BLUE } else { base };
            row[x * 4..x * 4 + 4].copy_from_slice(&color);
        }
    });

    rgba
}
