//! Image decoding and coarse fixed-resolution sampling.

#[derive(Debug, thiserror::Error)]
#[error("Image decode failed: {0}")]
pub struct DecodeError(pub String);

/// Owned RGB pixel grid, immutable once decoded.
#[derive(Debug)]
pub struct PixelImage {
    rgb: image::RgbImage,
}

impl PixelImage {
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let decoded =
            image::load_from_memory(bytes).map_err(|err| DecodeError(err.to_string()))?;
        Ok(Self {
            rgb: decoded.to_rgb8(),
        })
    }

    pub fn from_rgb(rgb: image::RgbImage) -> Self {
        Self { rgb }
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.rgb.get_pixel(x, y).0
    }
}

/// N x N luminance samples taken from a [`PixelImage`] by nearest sampling.
pub struct LumaGrid {
    n: usize,
    cells: Vec<f32>,
}

impl LumaGrid {
    pub fn size(&self) -> usize {
        self.n
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.cells[y * self.n + x]
    }
}

fn source_coord(out: usize, n: usize, source_dim: u32) -> u32 {
    // floor(out / n * source_dim), kept in integer arithmetic
    let coord = (out as u64 * source_dim as u64) / n as u64;
    (coord as u32).min(source_dim.saturating_sub(1))
}

fn luma(rgb: [u8; 3]) -> f32 {
    0.2126 * rgb[0] as f32 + 0.7152 * rgb[1] as f32 + 0.0722 * rgb[2] as f32
}

/// Nearest-sample the image down to an N x N luminance grid. No
/// interpolation; the grid is coarse enough that it would not help.
pub fn sample_luma_grid(image: &PixelImage, n: usize) -> LumaGrid {
    let mut cells = Vec::with_capacity(n * n);
    for y in 0..n {
        let sy = source_coord(y, n, image.height());
        for x in 0..n {
            let sx = source_coord(x, n, image.width());
            cells.push(luma(image.pixel(sx, sy)));
        }
    }
    LumaGrid { n, cells }
}

/// Same sampling as [`sample_luma_grid`] but keeping the RGB channels,
/// used by the change-intensity scorer.
pub fn sample_rgb_grid(image: &PixelImage, n: usize) -> Vec<[f32; 3]> {
    let mut cells = Vec::with_capacity(n * n);
    for y in 0..n {
        let sy = source_coord(y, n, image.height());
        for x in 0..n {
            let sx = source_coord(x, n, image.width());
            let [r, g, b] = image.pixel(sx, sy);
            cells.push([r as f32, g as f32, b as f32]);
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_image(width: u32, height: u32, rgb: [u8; 3]) -> PixelImage {
        PixelImage::from_rgb(image::RgbImage::from_pixel(width, height, image::Rgb(rgb)))
    }

    #[test]
    fn rejects_non_image_bytes() {
        let err = PixelImage::decode(b"definitely not a raster").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn luma_weighting_matches_perceptual_weights() {
        let grid = sample_luma_grid(&solid_image(10, 10, [255, 0, 0]), 4);
        assert!((grid.get(0, 0) - 0.2126 * 255.0).abs() < 1e-3);
        let grid = sample_luma_grid(&solid_image(10, 10, [0, 255, 0]), 4);
        assert!((grid.get(3, 3) - 0.7152 * 255.0).abs() < 1e-3);
    }

    #[test]
    fn sampling_covers_full_source_range() {
        // Left half black, right half white; the sampled grid must see both.
        let mut rgb = image::RgbImage::new(100, 60);
        for y in 0..60 {
            for x in 0..100 {
                let value = if x < 50 { 0 } else { 255 };
                rgb.put_pixel(x, y, image::Rgb([value, value, value]));
            }
        }
        let grid = sample_luma_grid(&PixelImage::from_rgb(rgb), 8);
        assert!(grid.get(0, 0) < 1.0);
        assert!(grid.get(7, 7) > 254.0);
    }
}
