//! Numeric helpers behind the ladder spacing and the indicator smoothing.

/// The nth Fibonacci number, `fib(1) = fib(2) = 1`.
///
/// Iterative integer form. A closed-form float power drifts off the true
/// sequence as n grows, which is unacceptable for price offsets.
#[must_use]
pub fn fib(n: u32) -> u64 {
    let (mut prev, mut next) = (0u64, 1u64);
    for _ in 0..n {
        let sum = prev + next;
        prev = next;
        next = sum;
    }
    prev
}

/// Last two points of the span-weighted exponential moving average of
/// `values`, oldest first.
///
/// This is the adjusted form: weights are renormalized over the observed
/// history instead of seeding the recursion with the first value, so early
/// points are not over-weighted. Returns `(previous, last)`; with fewer than
/// two values the missing points are NaN.
#[must_use]
pub fn ema_last_two(values: &[f64], span: usize) -> (f64, f64) {
    let alpha = 2.0 / (span as f64 + 1.0);
    let decay = 1.0 - alpha;

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    let mut previous = f64::NAN;
    let mut last = f64::NAN;
    for &value in values {
        weighted_sum = value + decay * weighted_sum;
        weight_total = 1.0 + decay * weight_total;
        previous = last;
        last = weighted_sum / weight_total;
    }
    (previous, last)
}
