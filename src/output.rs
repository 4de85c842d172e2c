use std::path::Path;

use anyhow::Context;
use image::{ImageFormat, RgbaImage};

/// Tightly packed RGBA8 pixels, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> anyhow::Result<Self> {
        let expected = width as usize * height as usize * 4;
        anyhow::ensure!(
            data.len() == expected,
            "pixel data is {} bytes, expected {expected} for {width}x{height}",
            data.len()
        );
        Ok(PixelBuffer {
            width,
            height,
            data,
        })
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    pub fn pixels(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.data
            .chunks_exact(4)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }
}

pub trait ImageWriter {
    fn write(&self, pixels: &PixelBuffer, path: &Path) -> anyhow::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PngImageWriter;

impl ImageWriter for PngImageWriter {
    fn write(&self, pixels: &PixelBuffer, path: &Path) -> anyhow::Result<()> {
        let image = RgbaImage::from_raw(pixels.width, pixels.height, pixels.data.clone())
            .context("pixel buffer does not match its dimensions")?;
        image
            .save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("writing {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_data() {
        assert!(PixelBuffer::new(2, 2, vec![0; 15]).is_err());
    }

    #[test]
    fn pixel_indexing_is_row_major() {
        let mut data = vec![0; 3 * 2 * 4];
        data[(1 * 3 + 2) * 4..(1 * 3 + 2) * 4 + 4].copy_from_slice(&[9, 8, 7, 6]);
        let buffer = PixelBuffer::new(3, 2, data).unwrap();
        assert_eq!(buffer.pixel(2, 1), Some([9, 8, 7, 6]));
        assert_eq!(buffer.pixel(3, 0), None);
        assert_eq!(buffer.pixels().count(), 6);
    }

    #[test]
    fn png_round_trips_through_disk() {
        let path = std::env::temp_dir().join(format!("lumen-output-{}.png", std::process::id()));
        let buffer = PixelBuffer::new(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 255]).unwrap();
        PngImageWriter.write(&buffer, &path).unwrap();

        let read = image::open(&path).unwrap().to_rgba8();
        assert_eq!(read.dimensions(), (2, 1));
        assert_eq!(read.get_pixel(1, 0).0, [0, 0, 255, 255]);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn unwritable_path_fails() {
        let buffer = PixelBuffer::new(1, 1, vec![0; 4]).unwrap();
        assert!(PngImageWriter
            .write(&buffer, Path::new("/no/such/dir/out.png"))
            .is_err());
    }
}
