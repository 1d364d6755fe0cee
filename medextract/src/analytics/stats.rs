//! Statistical helpers shared by the metrics and comparison engines.

/// Nearest-rank percentile over an ascending-sorted slice.
///
/// Picks the element at zero-based index `floor(p / 100 * n)`, clamped to `n - 1`.
/// This is deliberately not the linear-interpolation estimator: for `[100, 200, 300]`
/// it returns 200 for p50 and 300 for both p95 and p99.
///
/// Returns `None` for an empty slice.
pub fn nearest_rank<T: Copy>(sorted: &[T], p: f64) -> Option<T> {
    if sorted.is_empty() {
        return None;
    }
    let n = sorted.len();
    let idx = ((p / 100.0) * n as f64).floor() as usize;
    Some(sorted[idx.min(n - 1)])
}

/// Arithmetic mean, or 0 for an empty input.
pub fn mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values.into_iter().fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Two-sided p-value of a pooled two-proportion z-test.
///
/// Returns `None` when either sample is empty or the pooled proportion is 0 or 1
/// (the standard error vanishes and the test is undefined).
pub fn two_proportion_p_value(successes_a: u64, n_a: u64, successes_b: u64, n_b: u64) -> Option<f64> {
    if n_a == 0 || n_b == 0 {
        return None;
    }
    let (n_a, n_b) = (n_a as f64, n_b as f64);
    let p_a = successes_a as f64 / n_a;
    let p_b = successes_b as f64 / n_b;
    let pooled = (successes_a + successes_b) as f64 / (n_a + n_b);
    let se = (pooled * (1.0 - pooled) * (1.0 / n_a + 1.0 / n_b)).sqrt();
    if se == 0.0 || !se.is_finite() {
        return None;
    }
    let z = (p_b - p_a) / se;
    Some((2.0 * (1.0 - standard_normal_cdf(z.abs()))).clamp(0.0, 1.0))
}

/// Standard normal CDF via the Abramowitz & Stegun 7.1.26 erf approximation (|error| < 1.5e-7).
pub fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    sign * (1.0 - poly * (-x * x).exp())
}
