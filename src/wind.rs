use crate::grid::Grid;

/// Smoothstep: 0 at edge0, 1 at edge1.
#[inline]
fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Prevailing wind direction per row from a six-band Hadley/Ferrel/polar
/// cell model, as a (dx, dy) unit vector constant across each row.
///
/// Zonal component: trade winds (0-30 deg, easterly), westerlies (30-60
/// deg, westerly), polar easterlies (60-90 deg, easterly), each hemisphere
/// mirrored about the equator, band transitions smoothed rather than
/// stepped so precipitation streamlines don't show latitude seams.
///
/// Meridional component: surface wind converges at the ITCZ (equator) and
/// at the subpolar low (~60 deg), and diverges at the horse latitudes
/// (~30 deg) -- trade winds and polar easterlies drift equatorward, the
/// westerlies drift poleward. This is a small correction against the
/// dominant zonal flow, not a second independent field.
pub fn compute_wind(w: usize, h: usize) -> Grid<[f32; 2]> {
    let mut wind = Grid::<[f32; 2]>::new(w, h);

    for y in 0..h {
        let signed_lat = (y as f32 / (h.max(1) - 1).max(1) as f32) - 0.5; // -0.5 (one pole) .. 0.5 (other)
        let lat_frac = signed_lat.abs() * 2.0; // 0 at equator, 1 at poles
        let lat_deg = lat_frac * 90.0;

        let trade_to_west = smoothstep(25.0, 35.0, lat_deg);
        let west_to_polar = smoothstep(55.0, 65.0, lat_deg);
        let trade = -1.0;
        let westerly = 1.0;
        let polar = -1.0;
        let band_sign = {
            let tw = trade * (1.0 - trade_to_west) + westerly * trade_to_west;
            tw * (1.0 - west_to_polar) + polar * west_to_polar
        };

        let equatorward_unit = if signed_lat < 0.0 { 1.0 } else { -1.0 };
        let merid_magnitude = 0.35;
        let dy = merid_magnitude * -band_sign * equatorward_unit;
        let dx = band_sign;

        let len = dx.hypot(dy).max(1e-6);
        let v = [dx / len, dy / len];
        for x in 0..w {
            wind.set(x, y, v);
        }
    }

    wind
}
