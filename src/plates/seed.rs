use crate::rng::Rng;

/// Poisson disk sampling for plate centers (uniform density).
/// Attempts to place `count` points with minimum separation.
/// Relaxes the distance constraint if stuck, then falls back to
/// unconstrained placement so `count` seeds are always returned.
pub fn poisson_plate_seeds(w: usize, h: usize, count: usize, seed: u64) -> Vec<[f32; 2]> {
    let mut rng = Rng::new(seed ^ 0xA1B2C3D4E5F60789);
    let mut min_dist = ((w * h) as f32 / count as f32).sqrt() * 0.6;
    let mut seeds: Vec<[f32; 2]> = Vec::with_capacity(count);
    let mut attempts = 0usize;
    let relax_interval = count * 200;

    while seeds.len() < count && attempts < count * 2000 {
        let x = rng.range_f32(0.0, w as f32);
        let y = rng.range_f32(0.0, h as f32);

        let ok = seeds.iter().all(|s| {
            let dx = s[0] - x;
            let dy = s[1] - y;
            (dx * dx + dy * dy).sqrt() >= min_dist
        });

        if ok {
            seeds.push([x, y]);
        }
        attempts += 1;
        if attempts % relax_interval == 0 {
            min_dist *= 0.85;
        }
    }

    // Fallback: fill remaining randomly
    while seeds.len() < count {
        seeds.push([rng.range_f32(0.0, w as f32), rng.range_f32(0.0, h as f32)]);
    }

    seeds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_requested_count() {
        let seeds = poisson_plate_seeds(256, 256, 12, 7);
        assert_eq!(seeds.len(), 12);
    }

    #[test]
    fn seeds_stay_in_bounds() {
        let seeds = poisson_plate_seeds(256, 128, 12, 1);
        for s in seeds {
            assert!(s[0] >= 0.0 && s[0] <= 256.0);
            assert!(s[1] >= 0.0 && s[1] <= 128.0);
        }
    }

    #[test]
    fn deterministic_for_same_seed() {
        let a = poisson_plate_seeds(128, 128, 8, 42);
        let b = poisson_plate_seeds(128, 128, 8, 42);
        assert_eq!(a, b);
    }
}
