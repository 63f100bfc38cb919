use std::cmp::Ordering;

/// Percentile of `values` by linear interpolation, with `q` in `[0, 1]`.
/// Returns `None` if there are no values.
///
/// The sorted values are indexed at the virtual position `q * (n - 1)`. Between
/// the two neighbouring values `a` and `b` at fraction `t`, the result is
/// `a + (b - a) * t` when `t < 0.5` and `b - (b - a) * (1 - t)` otherwise, the
/// arithmetic of the "linear" method in the common numerical libraries.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let last = sorted.len() - 1;
    let virtual_index = q * last as f64;
    let lower = (virtual_index.floor() as usize).min(last);
    let upper = (lower + 1).min(last);
    let t = virtual_index - lower as f64;

    let (a, b) = (sorted[lower], sorted[upper]);
    let diff = b - a;
    Some(if t >= 0.5 { b - diff * (1.0 - t) } else { a + diff * t })
}

/// `numerator / denominator * 100`, or zero when the denominator is zero.
pub fn percentage(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64 * 100.0
    }
}

/// Rounds to one decimal place, resolving ties to even on the scaled value.
/// Values that round to zero come out as positive zero.
pub fn round_one_decimal(value: f64) -> f64 {
    let rounded = (value * 10.0).round_ties_even() / 10.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
