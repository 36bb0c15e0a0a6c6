//! Aspect-preserving resize to a padded square canvas.

use crate::common::*;
use image::{imageops::FilterType, DynamicImage, GenericImageView};

/// Letterbox resizer: scales a rectangular raster onto a fixed square
/// canvas preserving aspect ratio, padding the shorter axis with zeros.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Letterbox {
    image_size: usize,
}

impl Letterbox {
    pub fn new(image_size: usize) -> Result<Self> {
        ensure!(image_size > 0, "image_size must be positive");
        Ok(Self { image_size })
    }

    /// Resize onto the square canvas. Returns the padded raster as a
    /// `(channel, size, size)` float tensor in 0-255 scale, plus the
    /// coordinate transform for remapping labels into the new frame.
    pub fn forward(&self, image: &DynamicImage) -> Result<(Tensor, LetterboxTransform)> {
        let (orig_w, orig_h) = image.dimensions();
        let transform = LetterboxTransform::new(orig_h as usize, orig_w as usize, self.image_size)?;
        let [new_h, new_w] = transform.scaled_hw();

        let samples = image
            .resize_exact(new_w as u32, new_h as u32, FilterType::CatmullRom)
            .to_rgb8()
            .into_flat_samples();
        debug_assert_eq!(samples.samples.len(), (new_h * new_w * 3) as usize);

        let [top, bottom, left, right] = transform.padding();
        let tensor = tch::no_grad(|| {
            Tensor::of_slice(&samples.samples)
                .to_kind(Kind::Float)
                .view([new_h, new_w, 3])
                .permute(&[2, 0, 1])
                .unsqueeze(0)
                .zero_pad2d(left, right, top, bottom)
                .view([3, self.image_size as i64, self.image_size as i64])
                .set_requires_grad(false)
        });

        Ok((tensor, transform))
    }
}

/// The scale and pre-scale padding offsets of one letterbox step.
///
/// Label remap follows `coord' = (coord + pad_axis) * ratio`, where at
/// most one of `pad_x`/`pad_y` is non-zero (the shorter axis).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LetterboxTransform {
    ratio: R64,
    pad_x: R64,
    pad_y: R64,
    orig_h: usize,
    orig_w: usize,
    image_size: usize,
}

impl LetterboxTransform {
    pub fn new(orig_h: usize, orig_w: usize, image_size: usize) -> Result<Self> {
        let max_dim = orig_h.max(orig_w);
        ensure!(max_dim > 0, "image height and width must not both be zero");
        ensure!(image_size > 0, "image_size must be positive");

        let ratio = r64(image_size as f64 / max_dim as f64);
        let pad = r64((max_dim - orig_h.min(orig_w)) as f64 / 2.0);
        let (pad_x, pad_y) = if orig_h > orig_w {
            (pad, r64(0.0))
        } else if orig_h < orig_w {
            (r64(0.0), pad)
        } else {
            (r64(0.0), r64(0.0))
        };

        Ok(Self {
            ratio,
            pad_x,
            pad_y,
            orig_h,
            orig_w,
            image_size,
        })
    }

    pub fn ratio(&self) -> R64 {
        self.ratio
    }

    pub fn pad_x(&self) -> R64 {
        self.pad_x
    }

    pub fn pad_y(&self) -> R64 {
        self.pad_y
    }

    /// The post-scale raster size before padding, `[height, width]`.
    pub fn scaled_hw(&self) -> [i64; 2] {
        let new_h = (self.orig_h as f64 * self.ratio.raw()).round() as i64;
        let new_w = (self.orig_w as f64 * self.ratio.raw()).round() as i64;
        [new_h, new_w]
    }

    /// Pixel padding `[top, bottom, left, right]` with floor/ceil split.
    pub fn padding(&self) -> [i64; 4] {
        let [new_h, new_w] = self.scaled_hw();
        let dh = self.image_size as i64 - new_h;
        let dw = self.image_size as i64 - new_w;
        let top = dh / 2;
        let bottom = dh - top;
        let left = dw / 2;
        let right = dw - left;
        [top, bottom, left, right]
    }

    /// The label coordinate remap into the padded square frame.
    pub fn to_transform(&self) -> Transform<R64> {
        Transform {
            sy: self.ratio,
            sx: self.ratio,
            ty: self.ratio * self.pad_y,
            tx: self.ratio * self.pad_x,
        }
    }

    pub fn transform_label(&self, label: &PixelLabel) -> PixelLabel {
        &self.to_transform() * label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn letterbox_transform_landscape() {
        // 800x600 chip onto a 416 canvas: pad the height axis, 52/52
        let transform = LetterboxTransform::new(600, 800, 416).unwrap();
        assert_abs_diff_eq!(transform.ratio().raw(), 0.52, epsilon = 1e-9);
        assert_eq!(transform.pad_x(), 0.0);
        assert_eq!(transform.pad_y(), 100.0);
        assert_eq!(transform.scaled_hw(), [312, 416]);
        assert_eq!(transform.padding(), [52, 52, 0, 0]);
    }

    #[test]
    fn letterbox_transform_odd_padding_split() {
        let transform = LetterboxTransform::new(75, 250, 416).unwrap();
        let [top, bottom, left, right] = transform.padding();
        assert_eq!(top + bottom + transform.scaled_hw()[0], 416);
        assert_eq!(bottom - top, 1);
        assert_eq!([left, right], [0, 0]);
    }

    #[test]
    fn letterbox_full_frame_box_is_centered() {
        let transform = LetterboxTransform::new(600, 800, 416).unwrap();
        let label = PixelLabel {
            rect: TLBR::from_tlbr([r64(0.0), r64(0.0), r64(600.0), r64(800.0)]),
            class: 11,
        };
        let remapped = transform.transform_label(&label);
        let [t, l, b, r] = remapped.rect.tlbr();

        // touches the boundary on the longer axis, centered on the other
        assert_abs_diff_eq!(l.raw(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(r.raw(), 416.0, epsilon = 1e-9);
        assert_abs_diff_eq!(t.raw(), 52.0, epsilon = 1e-9);
        assert_abs_diff_eq!(b.raw(), 416.0 - 52.0, epsilon = 1e-9);
        assert_eq!(remapped.class, 11);
    }

    #[test]
    fn letterbox_square_input_needs_no_padding() {
        let transform = LetterboxTransform::new(500, 500, 416).unwrap();
        assert_eq!(transform.pad_x(), 0.0);
        assert_eq!(transform.pad_y(), 0.0);
        assert_eq!(transform.padding(), [0, 0, 0, 0]);
    }

    #[test]
    fn letterbox_pads_raster_to_square() {
        let letterbox = Letterbox::new(416).unwrap();
        let image = DynamicImage::new_rgb8(800, 600);
        let (tensor, transform) = letterbox.forward(&image).unwrap();
        assert_eq!(tensor.size(), &[3, 416, 416]);
        assert_eq!(transform.padding(), [52, 52, 0, 0]);
    }
}
