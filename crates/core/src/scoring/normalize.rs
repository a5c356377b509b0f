use crate::domain::TOTAL_CARS;

pub const SCORE_FLOOR: f64 = 5.0;
pub const SCORE_CEILING: f64 = 95.0;
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Half-width of the band used when raw scores tie.
pub const TIE_BAND: f64 = 2.5;

/// Logistic steepness for a raw spread in minutes: gentler for small spreads, steeper for
/// large ones.
pub fn steepness_for_spread(raw_spread: f64) -> f64 {
    if raw_spread < 1.0 {
        3.0
    } else if raw_spread > 5.0 {
        5.0
    } else {
        4.0
    }
}

/// Maps raw utilities onto the 5..95 display scale.
///
/// Identical raw scores fall back to the load factors: less loaded cars land slightly above
/// 50 (within 47.5..52.5) and fully identical cars all score exactly 50.
pub fn normalize_scores(
    raw: &[f64; TOTAL_CARS],
    load_factors: &[f64; TOTAL_CARS],
) -> [f64; TOTAL_CARS] {
    let (min, max) = bounds(raw);
    if max > min {
        let spread = max - min;
        let k = steepness_for_spread(spread);
        return raw.map(|value| {
            let x = (value - min) / spread;
            let stretched = 1.0 / (1.0 + (-k * (x - 0.5)).exp());
            (SCORE_FLOOR + stretched * (SCORE_CEILING - SCORE_FLOOR))
                .clamp(SCORE_FLOOR, SCORE_CEILING)
        });
    }

    let (lf_min, lf_max) = bounds(load_factors);
    let lf_spread = lf_max - lf_min;
    if lf_spread > 1e-9 {
        load_factors
            .map(|lf| NEUTRAL_SCORE + TIE_BAND - (lf - lf_min) / lf_spread * 2.0 * TIE_BAND)
    } else {
        [NEUTRAL_SCORE; TOTAL_CARS]
    }
}

fn bounds(values: &[f64; TOTAL_CARS]) -> (f64, f64) {
    values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), value| {
        (min.min(*value), max.max(*value))
    })
}

/// Car indices ordered best first. The sort is stable, so equal scores keep car order.
pub fn rank_order(scores: &[f64; TOTAL_CARS]) -> [usize; TOTAL_CARS] {
    let mut order: [usize; TOTAL_CARS] = std::array::from_fn(|index| index);
    order.sort_by(|a, b| scores[*b].total_cmp(&scores[*a]));
    order
}
