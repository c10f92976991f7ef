// Debug helpers for looking at what the scorer actually sees.

pub mod image_helper {
    use crate::core_modules::surface::surface::RasterSurface;
    use image::ImageEncoder;
    use std::path::Path;

    /// Writes the working surface as an RGBA PNG.
    pub fn save_surface(
        path: impl AsRef<Path>,
        surface: &RasterSurface,
    ) -> Result<(), image::error::ImageError> {
        let output = std::io::BufWriter::new(std::fs::File::create(path)?);
        let encoder = image::codecs::png::PngEncoder::new(output);

        encoder.write_image(
            surface.as_bytes(),
            surface.width(),
            surface.height(),
            image::ExtendedColorType::Rgba8,
        )?;

        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn saved_surface_round_trips_dimensions() {
            let dir = tempfile::tempdir().expect("tempdir");
            let path = dir.path().join("surface.png");
            let width = 40u32;
            let height = 25u32;
            let mut buffer = vec![255u8; (width * height * 4) as usize];
            let mut intensity = 0u8;
            for pixel in buffer.chunks_mut(4) {
                pixel[0] = intensity;
                intensity = intensity.wrapping_add(1);
            }
            let surface = RasterSurface::new(width, height, buffer).expect("surface");

            save_surface(&path, &surface).expect("Error Saving File.");

            let reloaded = image::open(&path).expect("reload").to_rgba8();
            assert_eq!(reloaded.dimensions(), (width, height));
            assert_eq!(reloaded.into_raw(), surface.as_bytes());
        }
    }
}
