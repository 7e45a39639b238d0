use nalgebra as na;
use num_traits::Float;

#[inline]
pub fn distance(p1: &na::Point2<f32>, p2: &na::Point2<f32>) -> f32 {
    na::distance(p1, p2)
}

/// Vector from `p1` to `p2`, per-frame velocity when the points are consecutive
#[inline]
pub fn displacement(p1: &na::Point2<f32>, p2: &na::Point2<f32>) -> na::Vector2<f32> {
    p2 - p1
}

/// 4πA/P², 1.0 for a perfect circle
pub fn circularity(area: f64, perimeter: f64) -> f64 {
    if perimeter == 0.0 {
        return 0.0;
    }

    (4.0 * std::f64::consts::PI * area) / (perimeter * perimeter)
}

/// Least squares polynomial fit of `y = p(x)`.
///
/// Returns the coefficients ordered from the highest power down to the
/// constant term, or `None` when the system is underdetermined, rank
/// deficient (fewer than `degree + 1` distinct x values) or the solution is
/// not finite.
pub fn polynomial_ls<T: na::RealField + Float>(
    x: &na::DVector<T>,
    y: &na::DVector<T>,
    degree: usize,
) -> Option<na::DVector<T>> {
    let n = x.len();
    if n != y.len() || n <= degree {
        return None;
    }

    let a = na::DMatrix::from_fn(n, degree + 1, |r, c| {
        Float::powi(x[r], (degree - c) as i32)
    });

    let qr_result = a.qr();
    let r = qr_result.r();

    // a near-zero pivot relative to the largest one means a rank deficient system
    let max_pivot = (0..=degree).fold(Float::abs(r[(0, 0)]), |acc, i| {
        Float::max(acc, Float::abs(r[(i, i)]))
    });
    let tol = <T as Float>::epsilon() * <T as num_traits::NumCast>::from(n)? * max_pivot;
    if (0..=degree).any(|i| Float::abs(r[(i, i)]) <= tol) {
        return None;
    }

    let qty = qr_result.q().transpose() * y;
    let beta_hat = r.solve_upper_triangular(&qty)?;

    if beta_hat.iter().all(|v| Float::is_finite(*v)) {
        Some(beta_hat)
    } else {
        None
    }
}
