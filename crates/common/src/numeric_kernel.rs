/// Sample mean of the per-history contributions.
///
/// # Arguments
/// * `first_moment` - Sum of the committed contributions.
/// * `num_histories` - Number of simulated histories, must be greater than zero.
pub fn calculate_mean(first_moment: f64, num_histories: u64) -> f64 {
    debug_assert!(num_histories > 0);

    first_moment / num_histories as f64
}

/// Relative error of the sample mean: `sqrt(m2/m1^2 - 1/N)`.
///
/// Returns 0 when the first moment is zero. Nearly deterministic tallies can push the
/// radicand slightly below zero through round-off, so it is clamped at zero.
pub fn calculate_relative_error(first_moment: f64, second_moment: f64, num_histories: u64) -> f64 {
    debug_assert!(num_histories > 0);

    if first_moment == 0.0 {
        return 0.0;
    }

    let radicand =
        second_moment / (first_moment * first_moment) - 1.0 / num_histories as f64;

    radicand.max(0.0).sqrt()
}

/// Relative variance of the variance of the sample mean, computed from the four raw moments.
///
/// Returns 0 when the variance term in the denominator vanishes. The result is clamped at zero.
pub fn calculate_relative_vov(
    first_moment: f64,
    second_moment: f64,
    third_moment: f64,
    fourth_moment: f64,
    num_histories: u64,
) -> f64 {
    debug_assert!(num_histories > 0);

    let n = num_histories as f64;
    let m1_sqr = first_moment * first_moment;

    let numerator = fourth_moment - 4.0 * first_moment * third_moment / n
        + 6.0 * m1_sqr * second_moment / (n * n)
        - 3.0 * m1_sqr * m1_sqr / (n * n * n);

    let variance_term = second_moment - m1_sqr / n;
    let denominator = variance_term * variance_term;

    if denominator == 0.0 {
        return 0.0;
    }

    (numerator / denominator - 1.0 / n).max(0.0)
}

/// Figure of merit `1/(re^2 * t)`, zero when the relative error is zero.
pub fn calculate_figure_of_merit(relative_error: f64, elapsed_time: f64) -> f64 {
    debug_assert!(elapsed_time > 0.0);

    if relative_error > 0.0 {
        1.0 / (relative_error * relative_error * elapsed_time)
    } else {
        0.0
    }
}

#[cfg(test)]
mod numerical_kernel_tests {
    use super::*;

    const TOL: f64 = 1e-12;

    // Relative comparison, the moments span many orders of magnitude.
    fn assert_approx_eq(a: f64, b: f64) {
        let scale = a.abs().max(b.abs()).max(1.0);
        assert!(
            (a - b).abs() < TOL * scale,
            "{} is not approximately equal to {}",
            a,
            b
        );
    }

    #[test]
    fn test_mean() {
        assert_approx_eq(calculate_mean(10.0, 100), 0.1);
        assert_approx_eq(calculate_mean(0.0, 1), 0.0);
    }

    /// A zero first moment has no relative error by definition.
    #[test]
    fn test_relative_error_zero_first_moment() {
        assert_eq!(calculate_relative_error(0.0, 0.0, 10), 0.0);
    }

    #[test]
    fn test_relative_error_reference_value() {
        // m2/m1^2 = 1, 1/N = 0.01
        let re = calculate_relative_error(10.0, 100.0, 100);
        assert_approx_eq(re, 0.99_f64.sqrt());
    }

    /// Identical contributions have no spread, the estimator gives exactly zero.
    #[test]
    fn test_relative_error_constant_contributions() {
        let c: f64 = 1.0;
        let n = 2;
        let re = calculate_relative_error(c * n as f64, c * c * n as f64, n);
        assert_approx_eq(re, 0.0);
    }

    /// Round-off can make the radicand negative, which must not produce NaN.
    #[test]
    fn test_relative_error_clamped() {
        let re = calculate_relative_error(3.0, 3.0 - 1e-14, 3);
        assert_eq!(re, 0.0);
    }

    #[test]
    fn test_vov_reference_value() {
        let vov = calculate_relative_vov(10.0, 100.0, 1000.0, 10000.0, 100);
        assert_approx_eq(vov, 0.97010101010101002);
    }

    #[test]
    fn test_vov_zero_denominator() {
        // m2 - m1^2/N == 0 for a single history
        let vov = calculate_relative_vov(2.0, 4.0, 8.0, 16.0, 1);
        assert_eq!(vov, 0.0);
    }

    #[test]
    fn test_figure_of_merit() {
        assert_approx_eq(calculate_figure_of_merit(2.0, 1e3), 2.5e-4);
        assert_eq!(calculate_figure_of_merit(0.0, 1e3), 0.0);
    }
}
