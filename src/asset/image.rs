// asset/image.rs
use std::path::Path;

use crate::error::LoadError;

/// Options forwarded from a load request to the decode step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Flip rows so the first row is the bottom of the image.
    pub flip_vertically: bool,
    /// Treat color data as sRGB-encoded.
    pub srgb: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            flip_vertically: false,
            srgb: true,
        }
    }
}

/// CPU-side RGBA8 pixels, the intermediate between decode and GPU upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub srgb: bool,
}

impl ImageData {
    /// 1x1 image of a single color.
    pub fn solid(color: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: color.to_vec(),
            srgb: true,
        }
    }

    /// Square checkerboard alternating two colors every `checker_size` pixels.
    pub fn checkerboard(size: u32, checker_size: u32, color1: [u8; 4], color2: [u8; 4]) -> Self {
        let checker_size = checker_size.max(1);
        let side = size as usize;
        let mut pixels = vec![0u8; rgba_len(size, size)];

        for y in 0..size {
            for x in 0..size {
                let checker_x = (x / checker_size) % 2;
                let checker_y = (y / checker_size) % 2;
                let color = if (checker_x + checker_y) % 2 == 0 { color1 } else { color2 };
                let idx = (y as usize * side + x as usize) * 4;
                pixels[idx..idx + 4].copy_from_slice(&color);
            }
        }

        Self {
            width: size,
            height: size,
            pixels,
            srgb: true,
        }
    }

    pub fn decode(path: &Path, bytes: &[u8], options: &LoadOptions) -> Result<Self, LoadError> {
        let decoded = image::load_from_memory(bytes).map_err(|source| LoadError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let decoded = if options.flip_vertically {
            decoded.flipv()
        } else {
            decoded
        };

        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(LoadError::EmptyImage {
                path: path.to_path_buf(),
            });
        }

        Ok(Self {
            width,
            height,
            pixels: rgba.into_raw(),
            srgb: options.srgb,
        })
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

/// Bytes of RGBA8 storage for a `width` x `height` image.
fn rgba_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}
