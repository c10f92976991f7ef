// THEORY:
// The `RasterSurface` is the decoded, resampled working image the preprocessor
// hands to the confidence scorer. Like `Pixel`, it is a "dumb" data container:
// it owns a flat RGBA buffer plus its dimensions and knows how to present that
// buffer as a sequence of typed `Pixel`s in scan order (row-major, left to
// right, top to bottom). It does not score itself.
//
// Layout invariants:
// - `data.len() == width * height * CHANNELS`, enforced at construction.
// - Pixel `i` starts at byte `i * CHANNELS`; its successor starts `CHANNELS`
//   bytes later.
//
// A surface with zero width or height is constructible (it is an honest
// description of an empty buffer) but it is rejected by the scorer, whose
// densities are undefined over zero area.

pub mod surface {
    use crate::core_modules::pixel::pixel::{CHANNELS, Pixel};
    use crate::error::{AnalysisError, Result};
    use image::RgbaImage;

    /// A decoded pixel buffer with explicit dimensions and interleaved RGBA layout.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RasterSurface {
        width: u32,
        height: u32,
        data: Vec<u8>,
    }

    impl RasterSurface {
        /// Wraps a raw RGBA buffer, checking that it holds exactly `width * height` pixels.
        pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
            let expected = (width as usize)
                .checked_mul(height as usize)
                .and_then(|area| area.checked_mul(CHANNELS));
            if expected != Some(data.len()) {
                return Err(AnalysisError::InvalidSurface {
                    width,
                    height,
                    len: data.len(),
                });
            }
            Ok(Self {
                width,
                height,
                data,
            })
        }

        pub fn width(&self) -> u32 {
            self.width
        }

        pub fn height(&self) -> u32 {
            self.height
        }

        /// Number of pixels on the surface.
        pub fn area(&self) -> usize {
            self.width as usize * self.height as usize
        }

        pub fn as_bytes(&self) -> &[u8] {
            &self.data
        }

        /// Pixels in scan order.
        pub fn pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
            self.data
                .chunks_exact(CHANNELS)
                .map(|rgba| Pixel::new(rgba[0], rgba[1], rgba[2], rgba[3]))
        }

        pub fn pixel_at(&self, x: u32, y: u32) -> Option<Pixel> {
            if x >= self.width || y >= self.height {
                return None;
            }
            let start = (y as usize * self.width as usize + x as usize) * CHANNELS;
            let rgba = &self.data[start..start + CHANNELS];
            Some(Pixel::new(rgba[0], rgba[1], rgba[2], rgba[3]))
        }

        pub fn into_rgba_image(self) -> Option<RgbaImage> {
            RgbaImage::from_raw(self.width, self.height, self.data)
        }
    }

    impl From<RgbaImage> for RasterSurface {
        fn from(image: RgbaImage) -> Self {
            let (width, height) = image.dimensions();
            Self {
                width,
                height,
                data: image.into_raw(),
            }
        }
    }

}
