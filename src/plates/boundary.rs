use rayon::prelude::*;

use crate::grid::{Grid, clamp_xy};

use super::properties::PlateSet;

/// Boundary type codes.
pub const INTERIOR: u8 = 0;
pub const CONVERGENT: u8 = 1;
pub const DIVERGENT: u8 = 2;
pub const TRANSFORM: u8 = 3;

/// Extract and classify boundaries.
/// Returns (boundary_type grid, plate_a grid, plate_b grid).
/// plate_a/plate_b store the two plates on each side of the boundary,
/// allowing stable lookups from the distance field without fragile neighbor searches.
///
/// Classification compares relative plate velocity against the boundary
/// normal: `|dot| > |cross|` picks convergent/divergent by sign, otherwise
/// transform. `tau` (spec: `boundary_threshold`) is the minimum relative
/// speed for a cell to count as a boundary at all, rather than noise
/// between two plates that happen to move almost identically.
pub fn extract_boundaries(
    plate_id: &Grid<u16>,
    plates: &PlateSet,
    tau: f32,
) -> (Grid<u8>, Grid<u16>, Grid<u16>) {
    let w = plate_id.w;
    let h = plate_id.h;
    let mut btype_grid = Grid::<u8>::new(w, h);
    let mut pa_grid = Grid::<u16>::new(w, h);
    let mut pb_grid = Grid::<u16>::new(w, h);

    // First pass: identify boundary cells and classify (parallel by row)
    let rows: Vec<(usize, Vec<(usize, u8, u16, u16)>)> = (0..h)
        .into_par_iter()
        .map(|y| {
            let mut row_boundaries = Vec::new();
            for x in 0..w {
                let pid = plate_id.get(x, y) as usize;
                let mut best_type = INTERIOR;
                let mut best_rate = 0.0f32;
                let mut best_other = pid as u16;

                // Check 4-neighbors for plate boundary. Cells at the grid
                // edge simply have fewer candidate neighbors; there is no
                // wraparound in a flat domain.
                let neighbors: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
                for (dx, dy) in neighbors {
                    let nx = x as i32 + dx;
                    let ny = y as i32 + dy;
                    let Some((cx, cy)) = clamp_xy(nx, ny, w, h) else {
                        continue;
                    };
                    let npid = plate_id.get(cx, cy) as usize;
                    if npid == pid {
                        continue;
                    }

                    // Boundary normal: direction from this cell toward neighbor
                    let nl = (dx as f32).hypot(dy as f32);
                    let normal = [dx as f32 / nl, dy as f32 / nl];

                    // Relative velocity of plates
                    let va = plates.velocity[pid];
                    let vb = plates.velocity[npid];
                    let vrel = [va[0] - vb[0], va[1] - vb[1]];

                    let dot = vrel[0] * normal[0] + vrel[1] * normal[1];
                    let cross = (vrel[0] * normal[1] - vrel[1] * normal[0]).abs();
                    let speed = dot.hypot(cross);
                    if speed < tau {
                        continue;
                    }

                    let (bt, rate) = if dot.abs() > cross {
                        if dot > 0.0 {
                            (CONVERGENT, dot)
                        } else {
                            (DIVERGENT, -dot)
                        }
                    } else {
                        (TRANSFORM, cross)
                    };

                    if rate > best_rate {
                        best_rate = rate;
                        best_type = bt;
                        best_other = npid as u16;
                    }
                }

                if best_type != INTERIOR {
                    row_boundaries.push((x, best_type, pid as u16, best_other));
                }
            }
            (y, row_boundaries)
        })
        .collect();

    // Collect into grids
    for (y, row_data) in rows {
        for (x, bt, pa, pb) in row_data {
            btype_grid.set(x, y, bt);
            pa_grid.set(x, y, pa);
            pb_grid.set(x, y, pb);
        }
    }

    (btype_grid, pa_grid, pb_grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plates::grow::grow_plates;
    use crate::plates::properties::assign_plate_properties;
    use crate::plates::seed::poisson_plate_seeds;

    #[test]
    fn boundary_cells_are_a_subset_of_adjacent_plates() {
        let seeds = poisson_plate_seeds(48, 48, 6, 4);
        let pid = grow_plates(48, 48, &seeds, 4, 1.0);
        let plates = assign_plate_properties(6, &seeds, &pid, 0.5, 4);
        let (btype, pa, pb) = extract_boundaries(&pid, &plates, 0.0);

        for y in 0..48 {
            for x in 0..48 {
                if btype.get(x, y) == INTERIOR {
                    continue;
                }
                assert_ne!(pa.get(x, y), pb.get(x, y));
                assert_eq!(pa.get(x, y), pid.get(x, y));
            }
        }
    }

    #[test]
    fn raising_tau_never_creates_new_boundary_cells() {
        let seeds = poisson_plate_seeds(48, 48, 6, 5);
        let pid = grow_plates(48, 48, &seeds, 5, 1.0);
        let plates = assign_plate_properties(6, &seeds, &pid, 0.5, 5);
        let (low, _, _) = extract_boundaries(&pid, &plates, 0.0);
        let (high, _, _) = extract_boundaries(&pid, &plates, 10.0);

        for i in 0..low.data.len() {
            if high.data[i] != INTERIOR {
                assert_ne!(low.data[i], INTERIOR);
            }
        }
    }
}
