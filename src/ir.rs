//! Structured intermediate-representation dump (spec §6): a self-describing
//! JSON document mirroring the final `World`, alongside the PNG. Array
//! order is row-major, top-left origin, matching every `Grid<T>` in this
//! crate.

use serde::Serialize;

use crate::config::Params;
use crate::World;

const IR_VERSION: u32 = 1;

#[derive(Serialize)]
pub struct PlateEntry {
    pub id: u16,
    pub vel_x: f32,
    pub vel_y: f32,
    pub kind: &'static str,
}

#[derive(Serialize)]
pub struct ParamsIr {
    pub num_plates: usize,
    pub water_frac: f32,
    pub scale: f32,
    pub rain_intensity: f32,
    pub river_percentile: f32,
}

impl From<&Params> for ParamsIr {
    fn from(p: &Params) -> Self {
        Self {
            num_plates: p.num_plates,
            water_frac: p.water_frac,
            scale: p.scale,
            rain_intensity: p.rain_intensity,
            river_percentile: p.river_percentile,
        }
    }
}

#[derive(Serialize)]
pub struct Cells {
    pub elevation: Vec<f32>,
    pub temperature: Vec<f32>,
    pub rainfall: Vec<f32>,
    pub plate_id: Vec<u16>,
    pub biome: Vec<u8>,
    pub flow_accum: Vec<f32>,
    pub river: Vec<bool>,
}

#[derive(Serialize)]
pub struct WorldIr {
    pub version: u32,
    pub width: usize,
    pub height: usize,
    pub params: ParamsIr,
    pub plates: Vec<PlateEntry>,
    pub sea_level: f32,
    pub cells: Cells,
}

/// Build the IR document from a finished `World`. Pure data transformation;
/// writing it to disk is the caller's job (spec: I/O happens only after the
/// core finishes).
pub fn build_ir(world: &World, params: &Params) -> WorldIr {
    let plates = (0..world.num_plates)
        .map(|i| PlateEntry {
            id: i as u16,
            vel_x: world.plate_vel[i][0],
            vel_y: world.plate_vel[i][1],
            kind: if world.is_continental[i] { "continental" } else { "oceanic" },
        })
        .collect();

    let cells = Cells {
        elevation: world.elevation.data.clone(),
        temperature: world.temperature.data.clone(),
        rainfall: world.rainfall.data.clone(),
        plate_id: world.plate_id.data.clone(),
        biome: world.biome.data.clone(),
        flow_accum: world.flow_accum.data.clone(),
        river: world.river_flag.data.clone(),
    };

    WorldIr {
        version: IR_VERSION,
        width: world.w,
        height: world.h,
        params: params.into(),
        plates,
        sea_level: world.sea_level,
        cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;

    #[test]
    fn ir_cell_arrays_match_grid_size() {
        let params = Params::default();
        let cancel = CancelToken::new();
        let (world, _) = crate::generate(1, 32, 32, &params, &cancel).unwrap();
        let doc = build_ir(&world, &params);
        assert_eq!(doc.cells.elevation.len(), 32 * 32);
        assert_eq!(doc.cells.river.len(), 32 * 32);
        assert_eq!(doc.plates.len(), world.num_plates);
    }

    #[test]
    fn ir_serializes_to_valid_json() {
        let params = Params::default();
        let cancel = CancelToken::new();
        let (world, _) = crate::generate(2, 16, 16, &params, &cancel).unwrap();
        let doc = build_ir(&world, &params);
        let json = serde_json::to_string(&doc).expect("ir should serialize");
        assert!(json.contains("\"version\":1"));
    }
}
