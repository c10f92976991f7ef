// THEORY (1D Pixel Heuristics):
// The `Pixel` module is the most fundamental unit of the diagnostic pipeline. It
// is a "dumb" data container for a single RGBA pixel plus the 1-dimensional
// heuristics the confidence scorer needs: facts about this pixel alone, with no
// knowledge of its neighbors. Anything that compares two pixels (the edge
// heuristic) belongs in `SmartPixel`.
//
// Channel order and stride:
// - Raster buffers are channel-interleaved R,G,B,A, one byte per channel.
// - A pixel therefore occupies `CHANNELS = 4` consecutive bytes; the "next pixel"
//   in scan order starts exactly `CHANNELS` bytes after the current one.
//
// Heuristics:
// - Ink: a pixel whose red channel is exactly 0. In a binarized or high-contrast
//   scan of a nameplate or gauge, these are the printed-text pixels.

pub mod pixel {
    pub type Byte = u8;
    pub type Bytes = Vec<Byte>;
    pub type Channel = Byte;

    /// Number of interleaved channels per pixel (R, G, B, A).
    pub const CHANNELS: usize = 4;

    /// Red-channel value that marks a pixel as ink.
    pub const INK_RED: Channel = 0;

    /// A "dumb" data container representing a single RGBA pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
        /// The alpha (transparency) channel value (0-255).
        pub alpha: Channel,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
            Pixel {
                red,
                green,
                blue,
                alpha,
            }
        }

        /// Ink pixel: red channel is exactly zero.
        #[inline]
        pub fn is_ink(&self) -> bool {
            self.red == INK_RED
        }
    }

    impl From<[Byte; CHANNELS]> for Pixel {
        fn from(bytes: [Byte; CHANNELS]) -> Self {
            Pixel::new(bytes[0], bytes[1], bytes[2], bytes[3])
        }
    }

    impl From<Pixel> for Bytes {
        fn from(pixel: Pixel) -> Self {
            vec![pixel.red, pixel.green, pixel.blue, pixel.alpha]
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn ink_is_decided_by_red_only() {
            assert!(Pixel::new(0, 255, 255, 255).is_ink());
            assert!(!Pixel::new(1, 0, 0, 255).is_ink());
        }

        #[test]
        fn byte_order_is_rgba() {
            let pixel = Pixel::from([10, 20, 30, 40]);
            assert_eq!(pixel.red, 10);
            assert_eq!(pixel.alpha, 40);
            assert_eq!(Bytes::from(pixel), vec![10, 20, 30, 40]);
        }
    }
}
