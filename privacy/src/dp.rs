use rand::Rng;

/// Laplace-perturbs an aggregate count with scale `1/epsilon` (sensitivity 1)
/// and floors the result at zero.
pub fn apply_differential_privacy(count: f64, epsilon: f64) -> f64 {
    (count + sample_laplace(1.0 / epsilon)).max(0.0)
}

/// Inverse-CDF Laplace sample with the given scale
fn sample_laplace(scale: f64) -> f64 {
    let u: f64 = rand::thread_rng().gen_range(-0.5..0.5);
    -scale * u.signum() * (1.0 - 2.0 * u.abs()).ln()
}
