//! Time-of-day multiplier.
//!
//! The curve has a fixed shape: anchors at set hours, linear in between. Amplitudes come from
//! the calibration snapshot so recalibrating moves the curve without code changes.

use crate::calibration::AlphaMap;

/// `(hour, amplitude)` anchors covering `[0, 24]`.
pub fn alpha_anchors(map: &AlphaMap) -> [(f64, f64); 17] {
    [
        (0.0, map.night),
        (4.0, map.early),
        (6.0, (map.early + map.midday) / 2.0),
        (7.0, (map.midday + map.morning_rush) / 2.0),
        (8.0, map.morning_rush),
        (9.0, (map.morning_rush + map.midday) / 2.0),
        (10.0, map.midday),
        (12.0, map.midday),
        (14.0, map.midday),
        (17.0, (map.midday + map.evening_rush) / 2.0),
        (18.0, map.evening_rush),
        // evening peak sits about 4% above the rush amplitude
        (19.0, map.evening_rush * 1.04),
        (20.0, (map.evening_rush + map.evening) / 2.0),
        (21.0, map.evening),
        (22.0, (map.evening + map.night) / 2.0),
        (23.0, map.night),
        (24.0, map.night),
    ]
}

/// α(h) for any hour; hours wrap modulo 24.
pub fn time_of_day_multiplier(hour: u32, map: &AlphaMap) -> f64 {
    interpolate(f64::from(hour % 24), &alpha_anchors(map)).unwrap_or(map.midday)
}

fn interpolate(hour: f64, anchors: &[(f64, f64)]) -> Option<f64> {
    anchors.windows(2).find_map(|pair| {
        let (h1, a1) = pair[0];
        let (h2, a2) = pair[1];
        (h1 <= hour && hour < h2).then(|| {
            let ratio = (hour - h1) / (h2 - h1);
            a1 + ratio * (a2 - a1)
        })
    })
}
