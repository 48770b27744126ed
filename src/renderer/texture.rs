// renderer/texture.rs

use super::{GraphicsDevice, TextureId};
use crate::asset::ImageData;
use crate::error::LoadError;

pub const PLACEHOLDER_COLOR: [u8; 4] = [255, 255, 255, 255];

/// A texture living on the device. Pixel data is not kept on the CPU side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    pub id: TextureId,
    pub width: u32,
    pub height: u32,
    pub label: String,
}

impl Texture {
    pub fn from_image(device: &mut dyn GraphicsDevice, image: &ImageData, label: &str) -> Result<Self, LoadError> {
        let id = device.create_texture(image, label)?;
        Ok(Self {
            id,
            width: image.width,
            height: image.height,
            label: label.to_string(),
        })
    }

    /// 1x1 white texture. Sampling it leaves the vertex color unchanged.
    pub fn placeholder(device: &mut dyn GraphicsDevice) -> Result<Self, LoadError> {
        Self::from_image(device, &ImageData::solid(PLACEHOLDER_COLOR), "placeholder")
    }

    pub fn bind(&self, device: &mut dyn GraphicsDevice, unit: u32) {
        device.bind_texture(unit, self.id);
    }

    pub fn destroy(&self, device: &mut dyn GraphicsDevice) {
        log::debug!("Destroying texture '{}'", self.label);
        device.destroy_texture(self.id);
    }
}
