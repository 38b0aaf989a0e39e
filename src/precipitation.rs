use rayon::prelude::*;

use crate::config::Params;
use crate::grid::{Grid, sample_bilinear};

/// Smoothstep: 0 at edge0, 1 at edge1.
#[inline]
fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Moisture capacity for a given air temperature. Real Clausius-Clapeyron
/// doubles roughly every 10C (a ~40:1 equator-to-pole ratio, too extreme for
/// a playable rainfall range); this doubles every 20C for a gentler ~6:1
/// ratio, with a floor so polar air still carries some moisture.
fn capacity_for_temp(temp_c: f32) -> f32 {
    let base_cap = 50.0;
    let cc = base_cap * (2.0_f32).powf(temp_c / 20.0);
    cc.clamp(15.0, 200.0)
}

/// Compute precipitation (mm/year) by advecting moisture along wind
/// streamlines.
///
/// Each row launches one streamline from whichever edge is upwind for that
/// row's dominant (zonal) wind direction. The streamline steps one cell at
/// a time along its major axis and accumulates a fractional drift on the
/// minor axis from the local wind vector -- a Bresenham-style walk that
/// lets a streamline curve gradually across rows instead of being locked
/// to one row, the way a real air parcel drifts as it crosses latitude
/// bands. A streamline that drifts off the top or bottom edge stops there;
/// the flat grid has no wraparound to catch it.
pub fn compute_precipitation(
    height: &Grid<f32>,
    temperature: &Grid<f32>,
    ocean: &Grid<bool>,
    wind: &Grid<[f32; 2]>,
    params: &Params,
) -> Grid<f32> {
    let w = height.w;
    let h = height.h;
    let warmup = (w / 4).max(1);
    let total_steps = warmup + w;

    let rows: Vec<Vec<f32>> = (0..h)
        .into_par_iter()
        .map(|y0| {
            let mut recorded = vec![0.0f32; w];
            let wv = wind.get(0, y0);
            let dx_dir: f32 = if wv[0] >= 0.0 { 1.0 } else { -1.0 };
            let drift_per_x = if wv[0].abs() > 1e-4 { wv[1] / wv[0].abs() } else { 0.0 };

            let mut x_cont: f32 = if dx_dir > 0.0 { -(warmup as f32) } else { (w - 1) as f32 + warmup as f32 };
            let mut y_cont = y0 as f32;

            // Entering air starts dry off a non-ocean edge, but carries
            // moisture proportional to edge SST when it picks up over open
            // water first (spec §4.7).
            let entry_x = if dx_dir > 0.0 { 0usize } else { w - 1 };
            let mut moisture: f32 = if ocean.get(entry_x, y0) {
                capacity_for_temp(temperature.get(entry_x, y0))
            } else {
                0.0
            };

            for s in 0..total_steps {
                if y_cont < 0.0 || y_cont > (h - 1) as f32 {
                    break;
                }
                let x = x_cont.round();
                if x < 0.0 || x > (w - 1) as f32 {
                    x_cont += dx_dir;
                    y_cont += drift_per_x * dx_dir;
                    continue;
                }

                let elev = sample_bilinear(height, x, y_cont);
                let temp_c = sample_bilinear(temperature, x, y_cont);
                let cap = capacity_for_temp(temp_c);
                let is_ocean = ocean.get(x as usize, y_cont.round().clamp(0.0, (h - 1) as f32) as usize);

                if is_ocean {
                    let recharge_rate = 0.05 * params.evap_base;
                    moisture += (cap - moisture) * recharge_rate;
                } else {
                    let prev_x = (x - dx_dir).clamp(0.0, (w - 1) as f32);
                    let prev_y = (y_cont - drift_per_x * dx_dir).clamp(0.0, (h - 1) as f32);
                    let elev_prev = sample_bilinear(height, prev_x, prev_y);
                    let slope = (elev - elev_prev).max(0.0);
                    let orographic = 0.0005 * slope * params.orographic_gain;

                    let base_depletion = params.base_rate;
                    let depletion = (base_depletion + orographic).min(0.5);
                    let rain = moisture * depletion;
                    moisture -= rain;

                    // Evapotranspiration recycles part of the rain back into
                    // the air; warmer land recycles more (this is what keeps
                    // continental interiors from drying out completely).
                    let evap_frac = params.leak_factor * smoothstep(-10.0, 30.0, temp_c) * 0.5;
                    moisture += rain * evap_frac;

                    let convective = 0.3 * smoothstep(5.0, 30.0, temp_c);
                    moisture += convective;

                    if s >= warmup {
                        recorded[x as usize] += rain;
                    }
                }

                moisture = moisture.clamp(0.0, cap * 1.5);
                x_cont += dx_dir;
                y_cont += drift_per_x * dx_dir;
            }

            recorded
        })
        .collect();

    let mut precip = Grid::<f32>::new(w, h);
    for (y, row) in rows.into_iter().enumerate() {
        for (x, v) in row.into_iter().enumerate() {
            precip.set(x, y, v);
        }
    }

    // Latitude modulation: ITCZ boost + subtropical suppression + mid-latitude cyclonic lift.
    for y in 0..h {
        let lat_frac = (y as f32 / h as f32 - 0.5).abs() * 2.0;
        let lat_deg = lat_frac * 90.0;

        let itcz = 1.0 + 0.3 * (-lat_deg * lat_deg / (2.0 * 8.0 * 8.0)).exp();
        let sub_dist = lat_deg - 28.0;
        let subtropical = 1.0 - 0.3 * (-sub_dist * sub_dist / (2.0 * 8.0 * 8.0)).exp();
        let mid_dist = lat_deg - 50.0;
        let midlat = 1.0 + 0.4 * (-mid_dist * mid_dist / (2.0 * 12.0 * 12.0)).exp();

        for x in 0..w {
            let i = y * w + x;
            precip.data[i] *= itcz * subtropical * midlat;
        }
    }

    // Light N-S blur (sigma ~4 rows), clamped at the poles.
    let sigma: f32 = 4.0;
    let radius = (sigma * 3.0).ceil() as i32;
    let kernel: Vec<f32> = (-radius..=radius)
        .map(|d| (-((d as f32).powi(2)) / (2.0 * sigma * sigma)).exp())
        .collect();
    let ksum: f32 = kernel.iter().sum();
    let kernel: Vec<f32> = kernel.iter().map(|k| k / ksum).collect();

    let mut blurred = Grid::<f32>::new(w, h);
    blurred
        .data
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, out)| {
            let x = i % w;
            let y = i / w;
            let mut sum = 0.0f32;
            for (ki, dy) in (-radius..=radius).enumerate() {
                let sy = (y as i32 + dy).clamp(0, h as i32 - 1) as usize;
                sum += precip.get(x, sy) * kernel[ki];
            }
            *out = sum;
        });

    // Normalize so global land mean matches a plausible 800mm/yr baseline,
    // then apply the caller's rain intensity multiplier.
    let mut land_sum = 0.0f64;
    let mut land_count = 0u64;
    for i in 0..w * h {
        if !ocean.data[i] {
            land_sum += blurred.data[i] as f64;
            land_count += 1;
        }
    }
    let land_mean = if land_count > 0 { land_sum / land_count as f64 } else { 1.0 };
    let norm = if land_mean > 1e-10 { 800.0 / land_mean } else { 1.0 };
    let scale = norm as f32 * params.rain_intensity;

    for v in blurred.data.iter_mut() {
        *v = (*v * scale).max(0.0);
    }

    blurred
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wind::compute_wind;

    #[test]
    fn precipitation_is_non_negative_and_finite() {
        let w = 48;
        let h = 48;
        let mut height = Grid::<f32>::filled(w, h, -500.0);
        for y in 0..h {
            for x in 24..40 {
                height.set(x, y, 400.0);
            }
        }
        let temp = Grid::<f32>::filled(w, h, 20.0);
        let ocean = Grid::<bool> {
            data: height.data.iter().map(|&e| e <= 0.0).collect(),
            w,
            h,
        };
        let wind = compute_wind(w, h);
        let params = Params::default();
        let rain = compute_precipitation(&height, &temp, &ocean, &wind, &params);
        assert!(rain.data.iter().all(|v| v.is_finite() && *v >= 0.0));
    }

    #[test]
    fn pure_ocean_world_still_produces_finite_grid() {
        let w = 32;
        let h = 32;
        let height = Grid::<f32>::filled(w, h, -200.0);
        let temp = Grid::<f32>::filled(w, h, 25.0);
        let ocean = Grid::<bool>::filled(w, h, true);
        let wind = compute_wind(w, h);
        let params = Params::default();
        let rain = compute_precipitation(&height, &temp, &ocean, &wind, &params);
        assert!(rain.data.iter().all(|v| v.is_finite()));
    }
}
