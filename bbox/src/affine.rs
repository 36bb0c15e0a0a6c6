use super::TLBR;
use crate::{common::*, rect::RectNum};

/// A 2x3 affine map in `(x, y)` pixel coordinates.
///
/// The augmentation constructors only build similarity maps (rotation,
/// uniform scale and translation); there is no shear constructor.
/// `scale_translate` additionally allows anisotropic scaling, which is
/// needed to express coordinate-frame changes such as the conversion
/// to normalized sampling grids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Affine<T> {
    m: [[T; 3]; 2],
}

impl<T> Affine<T>
where
    T: Float,
{
    pub fn identity() -> Self {
        let zero = T::zero();
        let one = T::one();
        Self {
            m: [[one, zero, zero], [zero, one, zero]],
        }
    }

    /// Rotation by `radians` and uniform scaling by `scale` about the
    /// pivot `(cx, cy)`. The pivot is a fixed point of the map.
    pub fn rotation_about(cx: T, cy: T, radians: T, scale: T) -> Self {
        let one = T::one();
        let alpha = scale * radians.cos();
        let beta = scale * radians.sin();

        Self {
            m: [
                [alpha, beta, (one - alpha) * cx - beta * cy],
                [-beta, alpha, beta * cx + (one - alpha) * cy],
            ],
        }
    }

    /// Per-axis scaling followed by translation.
    pub fn scale_translate(sx: T, sy: T, tx: T, ty: T) -> Self {
        let zero = T::zero();
        Self {
            m: [[sx, zero, tx], [zero, sy, ty]],
        }
    }

    pub fn matrix(&self) -> [[T; 3]; 2] {
        self.m
    }

    pub fn apply(&self, point: [T; 2]) -> [T; 2] {
        let [x, y] = point;
        let [[m00, m01, m02], [m10, m11, m12]] = self.m;
        [m00 * x + m01 * y + m02, m10 * x + m11 * y + m12]
    }

    /// `self` applied after `other`.
    pub fn compose(&self, other: &Self) -> Self {
        let [[a00, a01, a02], [a10, a11, a12]] = self.m;
        let [[b00, b01, b02], [b10, b11, b12]] = other.m;

        Self {
            m: [
                [
                    a00 * b00 + a01 * b10,
                    a00 * b01 + a01 * b11,
                    a00 * b02 + a01 * b12 + a02,
                ],
                [
                    a10 * b00 + a11 * b10,
                    a10 * b01 + a11 * b11,
                    a10 * b02 + a11 * b12 + a12,
                ],
            ],
        }
    }

    pub fn inverse(&self) -> Self {
        let [[m00, m01, m02], [m10, m11, m12]] = self.m;
        let det = m00 * m11 - m01 * m10;
        let i00 = m11 / det;
        let i01 = -m01 / det;
        let i10 = -m10 / det;
        let i11 = m00 / det;

        Self {
            m: [
                [i00, i01, -(i00 * m02 + i01 * m12)],
                [i10, i11, -(i10 * m02 + i11 * m12)],
            ],
        }
    }

    /// Axis-aligned envelope of a warped rectangle, computed as the
    /// min/max over all four transformed corners. Warping only the two
    /// diagonal corners would under-cover any rotated rectangle.
    ///
    /// The fold is seeded from the first corner rather than infinities
    /// so that checked float types forbidding non-finite values work.
    pub fn envelope(&self, rect: &TLBR<T>) -> TLBR<T> {
        let [t, l, b, r] = rect.tlbr();
        let corners = [[l, t], [r, t], [l, b], [r, b]];

        let [first_x, first_y] = self.apply(corners[0]);
        let mut min_x = first_x;
        let mut min_y = first_y;
        let mut max_x = first_x;
        let mut max_y = first_y;

        for corner in &corners[1..] {
            let [x, y] = self.apply(*corner);
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        TLBR::from_tlbr([min_y, min_x, max_y, max_x])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rect::Rect;
    use approx::assert_abs_diff_eq;

    #[test]
    fn affine_identity() {
        let transform = Affine::identity();
        assert_eq!(transform.apply([3.0, -2.0]), [3.0, -2.0]);
    }

    #[test]
    fn affine_pivot_is_fixed_point() {
        let transform = Affine::rotation_about(208.0, 208.0, 0.7, 1.3);
        let [x, y] = transform.apply([208.0, 208.0]);
        assert_abs_diff_eq!(x, 208.0, epsilon = 1e-9);
        assert_abs_diff_eq!(y, 208.0, epsilon = 1e-9);
    }

    #[test]
    fn affine_envelope_quarter_turn() {
        // a square rotated about its own center by 90 degrees maps to itself
        let transform =
            Affine::rotation_about(5.0, 5.0, std::f64::consts::FRAC_PI_2, 1.0);
        let rect = TLBR::from_tlbr([0.0, 0.0, 10.0, 10.0]);
        let [t, l, b, r] = transform.envelope(&rect).tlbr();
        assert_abs_diff_eq!(t, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(l, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(b, 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(r, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn affine_envelope_eighth_turn() {
        // a 45-degree turn inflates the envelope side to sqrt(2) times
        let transform =
            Affine::rotation_about(5.0, 5.0, std::f64::consts::FRAC_PI_4, 1.0);
        let rect = TLBR::from_tlbr([0.0, 0.0, 10.0, 10.0]);
        let envelope = transform.envelope(&rect);
        let side = 10.0 * 2f64.sqrt();
        assert_abs_diff_eq!(envelope.h(), side, epsilon = 1e-9);
        assert_abs_diff_eq!(envelope.w(), side, epsilon = 1e-9);
        assert_abs_diff_eq!(envelope.cy(), 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(envelope.cx(), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn affine_envelope_with_checked_floats() {
        use noisy_float::prelude::*;

        // R64 rejects non-finite intermediates, so the envelope must
        // stay finite throughout
        let transform = Affine::rotation_about(r64(208.0), r64(208.0), r64(0.0), r64(1.0));
        let rect = TLBR::from_tlbr([r64(100.0), r64(100.0), r64(200.0), r64(200.0)]);
        let [t, l, b, r] = transform.envelope(&rect).tlbr();
        assert_abs_diff_eq!(t.raw(), 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(l.raw(), 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(b.raw(), 200.0, epsilon = 1e-9);
        assert_abs_diff_eq!(r.raw(), 200.0, epsilon = 1e-9);

        let eighth = Affine::rotation_about(
            r64(150.0),
            r64(150.0),
            r64(std::f64::consts::FRAC_PI_4),
            r64(1.0),
        );
        let envelope = eighth.envelope(&rect);
        assert_abs_diff_eq!(envelope.h().raw(), 100.0 * 2f64.sqrt(), epsilon = 1e-9);
        assert_abs_diff_eq!(envelope.w().raw(), 100.0 * 2f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn affine_inverse_round_trip() {
        let transform = Affine::rotation_about(100.0, 50.0, -0.3, 0.95);
        let point = [17.0, 213.0];
        let [x, y] = transform.inverse().apply(transform.apply(point));
        assert_abs_diff_eq!(x, point[0], epsilon = 1e-9);
        assert_abs_diff_eq!(y, point[1], epsilon = 1e-9);
    }

    #[test]
    fn affine_compose_matches_sequential_apply() {
        let first = Affine::rotation_about(5.0, 5.0, 0.4, 1.1);
        let second = Affine::scale_translate(2.0, 3.0, -1.0, 1.0);
        let point = [7.0, -2.0];
        let [x, y] = second.compose(&first).apply(point);
        let [ex, ey] = second.apply(first.apply(point));
        assert_abs_diff_eq!(x, ex, epsilon = 1e-9);
        assert_abs_diff_eq!(y, ey, epsilon = 1e-9);
    }
}
