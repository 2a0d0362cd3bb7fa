/// Compute the squared Euclidean distance between two vectors.
///
/// Uses f64 accumulation so that long (512-d) vectors do not drift.
/// Returns `f32::INFINITY` on dimension mismatch so a malformed vector can
/// never rank as a close match.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }

    let mut sum: f64 = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let d = *x as f64 - *y as f64;
        sum += d * d;
    }
    sum as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical() {
        assert_eq!(squared_l2(&[0.3, -1.0, 2.5], &[0.3, -1.0, 2.5]), 0.0);
    }

    #[test]
    fn test_unit_axes() {
        let d = squared_l2(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert!((d - 2.0).abs() < 1e-6, "orthogonal unit: got {d}");
    }

    #[test]
    fn test_not_square_rooted() {
        let d = squared_l2(&[0.0, 0.0], &[3.0, 4.0]);
        assert!((d - 25.0).abs() < 1e-6, "3-4-5: got {d}");
    }

    #[test]
    fn test_dimension_mismatch() {
        assert_eq!(squared_l2(&[1.0, 0.0], &[1.0, 0.0, 0.0]), f32::INFINITY);
    }
}
