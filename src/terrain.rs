//! Height sources for terrain generation.
//!
//! A height source yields one 0–255 intensity per surface tile. Heightmaps are
//! greyscale images, so only the red channel is read.

use crate::config::MapConfig;
use image::RgbImage;
use noise::{NoiseFn, Perlin};
use std::path::Path;

/// Per-tile intensity samples consumed by `TileMap::generate_terrain`.
pub trait HeightSource {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Intensity at `(x, y)`; callers stay inside `width() x height()`.
    fn intensity(&self, x: u32, y: u32) -> u8;
}

/// In-memory sample grid, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightGrid {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

impl HeightGrid {
    /// Returns `None` when `samples` does not hold exactly `width * height` values.
    pub fn new(width: u32, height: u32, samples: Vec<u8>) -> Option<Self> {
        (samples.len() == (width as usize) * (height as usize)).then_some(Self {
            width,
            height,
            samples,
        })
    }

    pub fn filled(width: u32, height: u32, intensity: u8) -> Self {
        Self {
            width,
            height,
            samples: vec![intensity; (width as usize) * (height as usize)],
        }
    }

    pub fn set(&mut self, x: u32, y: u32, intensity: u8) {
        let index = (y * self.width + x) as usize;
        self.samples[index] = intensity;
    }
}

impl HeightSource for HeightGrid {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn intensity(&self, x: u32, y: u32) -> u8 {
        self.samples[(y * self.width + x) as usize]
    }
}

/// Heightmap image on disk.
pub struct ImageHeightSource {
    image: RgbImage,
}

impl ImageHeightSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, image::ImageError> {
        let image = image::open(path)?.to_rgb8();
        Ok(Self { image })
    }

    pub fn from_image(image: RgbImage) -> Self {
        Self { image }
    }
}

impl HeightSource for ImageHeightSource {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn intensity(&self, x: u32, y: u32) -> u8 {
        self.image.get_pixel(x, y)[0]
    }
}

/// Procedural heights from Perlin noise, for sites without a heightmap.
pub struct NoiseHeightSource {
    perlin: Perlin,
    width: u32,
    height: u32,
    frequency: f64,
}

impl NoiseHeightSource {
    pub fn new(seed: u32, width: u32, height: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            width,
            height,
            frequency: 4.0,
        }
    }

    /// Noise covering the whole of `map`, seeded from the 64-bit site seed.
    pub fn for_site(map: &MapConfig, seed: u64) -> Self {
        Self::new(seed as u32, map.width.max(0) as u32, map.height.max(0) as u32)
    }

    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }
}

impl HeightSource for NoiseHeightSource {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn intensity(&self, x: u32, y: u32) -> u8 {
        let nx = x as f64 / self.width as f64;
        let ny = y as f64 / self.height as f64;
        let value = self.perlin.get([nx * self.frequency, ny * self.frequency]);
        // Perlin output sits in [-1, 1]; map it onto the full intensity range.
        (((value + 1.0) * 0.5).clamp(0.0, 1.0) * 255.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn grid_rejects_wrong_sample_count() {
        assert!(HeightGrid::new(2, 2, vec![0; 3]).is_none());
        assert!(HeightGrid::new(2, 2, vec![0; 4]).is_some());
    }

    #[test]
    fn image_reads_red_channel() {
        let mut image = RgbImage::new(2, 1);
        image.put_pixel(1, 0, Rgb([120, 7, 7]));
        let source = ImageHeightSource::from_image(image);
        assert_eq!(source.intensity(0, 0), 0);
        assert_eq!(source.intensity(1, 0), 120);
    }

    #[test]
    fn noise_is_deterministic_per_seed() {
        let a = NoiseHeightSource::new(7, 16, 16);
        let b = NoiseHeightSource::new(7, 16, 16);
        for y in 0..16 {
            for x in 0..16 {
                assert_eq!(a.intensity(x, y), b.intensity(x, y));
            }
        }
    }

    #[test]
    fn site_noise_covers_the_map() {
        let map = MapConfig {
            width: 40,
            height: 24,
            ..MapConfig::default()
        };
        let source = NoiseHeightSource::for_site(&map, 7);
        assert_eq!((source.width(), source.height()), (40, 24));
        let plain = NoiseHeightSource::new(7, 40, 24);
        assert_eq!(source.intensity(13, 9), plain.intensity(13, 9));
    }
}
