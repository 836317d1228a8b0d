/// Proximal operator of the L1 norm: shrinks every parameter towards zero by `strength`.
pub fn soft_threshold(params: &mut [f32], strength: f32) {
    for p in params {
        *p = p.signum() * (p.abs() - strength).max(0.);
    }
}

/// Proximal operator of the trace norm for a single weight vector.
///
/// Seen as a `1 x D` matrix the vector has one singular value, its euclidean norm, so
/// thresholding the spectrum reduces to scaling the vector by `max(0, 1 - strength / ||w||)`.
pub fn shrink_norm(params: &mut [f32], strength: f32) {
    let norm = params.iter().map(|p| p * p).sum::<f32>().sqrt();
    if norm == 0. {
        return;
    }

    let scale = (1. - strength / norm).max(0.);
    for p in params {
        *p *= scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_threshold_clips_small_values() {
        let mut params = [3., -0.5, 0.2, -2.];
        soft_threshold(&mut params, 1.);
        assert_eq!(params, [2., 0., 0., -1.]);
    }

    #[test]
    fn shrink_norm_scales_the_vector() {
        let mut params = [3., 4.];
        shrink_norm(&mut params, 2.5);
        assert_eq!(params, [1.5, 2.]);
    }

    #[test]
    fn shrink_norm_zeroes_small_vectors() {
        let mut params = [0.3, 0.4];
        shrink_norm(&mut params, 1.);
        assert_eq!(params, [0., 0.]);

        let mut zero = [0., 0.];
        shrink_norm(&mut zero, 1.);
        assert_eq!(zero, [0., 0.]);
    }
}
