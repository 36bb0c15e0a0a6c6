//! Joint random affine augmentation of raster and boxes.

use crate::common::*;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RandomAffineInit {
    /// Rotation range in degrees.
    pub rotate_degrees: (R64, R64),
    /// Per-axis pivot perturbation as `(frac_x, frac_y)` fractions of
    /// each axis' extent; sampled from `-frac..=frac`.
    pub translate_frac: (R64, R64),
    /// Uniform scale range.
    pub scale: (R64, R64),
}

impl RandomAffineInit {
    pub fn build(self) -> Result<RandomAffine> {
        let Self {
            rotate_degrees,
            translate_frac,
            scale,
        } = self;

        ensure!(
            rotate_degrees.0 <= rotate_degrees.1,
            "rotation min must not exceed rotation max"
        );
        ensure!(
            translate_frac.0 >= 0.0 && translate_frac.1 >= 0.0,
            "translation fractions must be non-negative"
        );
        ensure!(scale.0 > 0.0, "scale min must be positive");
        ensure!(scale.0 <= scale.1, "scale min must not exceed scale max");

        Ok(RandomAffine {
            rotate_radians: (
                rotate_degrees.0.raw().to_radians(),
                rotate_degrees.1.raw().to_radians(),
            ),
            translate_frac: (translate_frac.0.raw(), translate_frac.1.raw()),
            scale: (scale.0.raw(), scale.1.raw()),
        })
    }
}

impl Default for RandomAffineInit {
    fn default() -> Self {
        Self {
            rotate_degrees: (r64(-5.0), r64(5.0)),
            translate_frac: (r64(0.05), r64(0.05)),
            scale: (r64(0.95), r64(1.05)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RandomAffine {
    rotate_radians: (f64, f64),
    translate_frac: (f64, f64),
    scale: (f64, f64),
}

impl RandomAffine {
    /// Warp the raster and its boxes through one sampled similarity
    /// transform. Boxes whose envelope leaves the frame are dropped;
    /// surviving boxes keep their class and input order.
    pub fn forward(
        &self,
        orig_image: &Tensor,
        orig_labels: &[PixelLabel],
    ) -> Result<(Tensor, Vec<PixelLabel>)> {
        tch::no_grad(|| {
            let (_channels, height, width) = orig_image.size3()?;

            let mut rng = StdRng::from_entropy();
            let transform = self.sample_transform(&mut rng, height as f64, width as f64);

            let new_image = warp_image(orig_image, &transform)?;
            let new_labels = warp_labels(&transform, orig_labels, height as f64, width as f64);

            Ok((new_image, new_labels))
        })
    }

    /// One similarity matrix couples rotation, scale and translation:
    /// the pivot itself is randomized, which imparts the translation.
    fn sample_transform(&self, rng: &mut impl Rng, height: f64, width: f64) -> Affine<R64> {
        let (min_radians, max_radians) = self.rotate_radians;
        let (frac_x, frac_y) = self.translate_frac;
        let (min_scale, max_scale) = self.scale;

        let angle = rng.gen_range(min_radians..=max_radians);
        let scale = rng.gen_range(min_scale..=max_scale);
        let cx = width * (0.5 + rng.gen_range(-frac_x..=frac_x));
        let cy = height * (0.5 + rng.gen_range(-frac_y..=frac_y));

        Affine::rotation_about(r64(cx), r64(cy), r64(angle), r64(scale))
    }
}

/// Warp the raster through the pixel-space transform into a same-size
/// canvas, bicubic interpolation, zeros outside the source frame.
fn warp_image(image: &Tensor, transform: &Affine<R64>) -> Result<Tensor> {
    let (channels, height, width) = image.size3()?;
    let h = height as f64;
    let w = width as f64;

    // The sampling grid maps output coordinates back to input
    // coordinates in the normalized [-1, 1] frame, so conjugate the
    // inverse pixel-space map with the pixel-to-normalized transform.
    let norm = Affine::scale_translate(
        r64(2.0 / w),
        r64(2.0 / h),
        r64(1.0 / w - 1.0),
        r64(1.0 / h - 1.0),
    );
    let theta = norm.compose(&transform.inverse()).compose(&norm.inverse());

    let [[m00, m01, m02], [m10, m11, m12]] = theta.matrix();
    let theta = Tensor::of_slice(
        &[
            [m00.raw() as f32, m01.raw() as f32, m02.raw() as f32],
            [m10.raw() as f32, m11.raw() as f32, m12.raw() as f32],
        ]
        .flat(),
    )
    .view([1, 2, 3]);

    let grid = Tensor::affine_grid_generator(&theta, &[1, channels, height, width], false);
    let new_image = image
        .view([1, channels, height, width])
        .grid_sampler(
            &grid,
            // See https://github.com/pytorch/pytorch/blob/f597ac6efc70431e66d945c16fa12b767989b032/aten/src/ATen/native/GridSampler.h#L10-L11
            2,
            0,
            false,
        )
        .view([channels, height, width]);

    Ok(new_image)
}

/// Transform all four corners of each box through the same matrix used
/// for the raster, rebuild the axis-aligned envelope, and reject boxes
/// that leave the frame. Rejection never clamps.
fn warp_labels(
    transform: &Affine<R64>,
    labels: &[PixelLabel],
    height: f64,
    width: f64,
) -> Vec<PixelLabel> {
    labels
        .iter()
        .filter_map(|label| {
            let new_label = transform * label;
            let [t, l, b, r] = new_label.rect.tlbr();
            let inside = t > 0.0 && l > 0.0 && b < height && r < width;
            inside.then(|| new_label)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn label(t: f64, l: f64, b: f64, r: f64, class: i64) -> PixelLabel {
        PixelLabel {
            rect: TLBR::from_tlbr([r64(t), r64(l), r64(b), r64(r)]),
            class,
        }
    }

    #[test]
    fn identity_transform_keeps_boxes() {
        // zero rotation, unit scale about the frame center
        let transform = Affine::rotation_about(r64(208.0), r64(208.0), r64(0.0), r64(1.0));
        let labels = vec![label(100.0, 100.0, 200.0, 200.0, 17)];
        let warped = warp_labels(&transform, &labels, 416.0, 416.0);

        assert_eq!(warped.len(), 1);
        let [t, l, b, r] = warped[0].rect.tlbr();
        assert_abs_diff_eq!(t.raw(), 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(l.raw(), 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(b.raw(), 200.0, epsilon = 1e-9);
        assert_abs_diff_eq!(r.raw(), 200.0, epsilon = 1e-9);
        assert_eq!(warped[0].class, 17);
    }

    #[test]
    fn out_of_frame_boxes_are_dropped() {
        let transform = Affine::rotation_about(
            r64(208.0),
            r64(208.0),
            r64(std::f64::consts::FRAC_PI_4),
            r64(1.0),
        );
        // the corner box rotates out of the frame, the center box stays
        let labels = vec![
            label(1.0, 1.0, 50.0, 50.0, 11),
            label(190.0, 190.0, 230.0, 230.0, 12),
        ];
        let warped = warp_labels(&transform, &labels, 416.0, 416.0);

        assert_eq!(warped.len(), 1);
        assert_eq!(warped[0].class, 12);
    }

    #[test]
    fn surviving_boxes_stay_inside_the_frame() {
        let augmentor = RandomAffineInit {
            rotate_degrees: (r64(-180.0), r64(180.0)),
            translate_frac: (r64(0.2), r64(0.2)),
            scale: (r64(0.5), r64(1.5)),
        }
        .build()
        .unwrap();
        let labels: Vec<_> = (0..20)
            .map(|index| {
                let offset = index as f64 * 20.0;
                label(offset, offset, offset + 15.0, offset + 15.0, index)
            })
            .collect();

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let transform = augmentor.sample_transform(&mut rng, 416.0, 416.0);
            for warped in warp_labels(&transform, &labels, 416.0, 416.0) {
                let [t, l, b, r] = warped.rect.tlbr();
                assert!(t > 0.0 && l > 0.0 && b < 416.0 && r < 416.0);
            }
        }
    }

    #[test]
    fn empty_label_list_passes_through() {
        let transform = Affine::rotation_about(r64(100.0), r64(100.0), r64(0.3), r64(1.1));
        assert!(warp_labels(&transform, &[], 416.0, 416.0).is_empty());
    }

    #[test]
    fn degenerate_ranges_reproduce_the_input() {
        let augmentor = RandomAffineInit {
            rotate_degrees: (r64(0.0), r64(0.0)),
            translate_frac: (r64(0.0), r64(0.0)),
            scale: (r64(1.0), r64(1.0)),
        }
        .build()
        .unwrap();
        let image = Tensor::rand(&[3, 64, 64], (Kind::Float, Device::Cpu));
        let labels = vec![label(10.0, 10.0, 30.0, 40.0, 11)];

        let (warped_image, warped_labels) = augmentor.forward(&image, &labels).unwrap();

        let max_diff = f64::from((&warped_image - &image).abs().max());
        assert!(max_diff < 1e-3, "max pixel difference {}", max_diff);
        assert_eq!(warped_labels.len(), 1);
        let [t, l, b, r] = warped_labels[0].rect.tlbr();
        assert_abs_diff_eq!(t.raw(), 10.0, epsilon = 1e-6);
        assert_abs_diff_eq!(l.raw(), 10.0, epsilon = 1e-6);
        assert_abs_diff_eq!(b.raw(), 30.0, epsilon = 1e-6);
        assert_abs_diff_eq!(r.raw(), 40.0, epsilon = 1e-6);
    }

    #[test]
    fn init_rejects_bad_ranges() {
        let result = RandomAffineInit {
            scale: (r64(0.0), r64(1.0)),
            ..Default::default()
        }
        .build();
        assert!(result.is_err());

        let result = RandomAffineInit {
            rotate_degrees: (r64(5.0), r64(-5.0)),
            ..Default::default()
        }
        .build();
        assert!(result.is_err());
    }
}
