// THEORY:
// `SmartPixel` is the comparative wrapper around a "dumb" `Pixel`. A single
// pixel cannot tell us whether it sits on an edge; only the relationship with
// its successor in scan order can. The confidence scorer uses exactly one such
// relationship: the absolute red-channel difference between a pixel and the
// *same channel of the next pixel*. A difference above `EDGE_THRESHOLD` counts
// as one edge.
//
// The comparison runs along the flat scan order, so the last pixel of a row is
// compared with the first pixel of the following row, and the final pixel of
// the buffer has no successor and never counts. This stride is part of the
// observable scoring contract; do not swap it for a luma-weighted or 2D
// neighborhood gradient.

pub mod smart_pixel {
    use crate::core_modules::pixel::pixel::*;

    pub type RedDelta = u8;

    /// Red-channel difference that must be exceeded to register an edge.
    pub const EDGE_THRESHOLD: RedDelta = 100;

    /// An analytical tool that wraps a `Pixel` to provide pairwise comparisons.
    #[derive(Debug, Clone, Copy)]
    pub struct SmartPixel {
        /// The raw `Pixel` data this `SmartPixel` is analyzing.
        pub pixel: Pixel,
    }

    impl SmartPixel {
        pub fn new(pixel: Pixel) -> Self {
            Self { pixel }
        }

        pub fn delta_red(&self, next: &SmartPixel) -> RedDelta {
            self.pixel.red.abs_diff(next.pixel.red)
        }

        /// First-difference edge proxy against the next pixel in scan order.
        pub fn is_edge_against(&self, next: &SmartPixel) -> bool {
            self.delta_red(next) > EDGE_THRESHOLD
        }
    }

}
