pub mod handle;
pub mod image;
pub mod loader;
pub mod registry;

pub use handle::{HandleStatus, ResourceHandle, ResourceState};
pub use image::{ImageData, LoadOptions};
pub use loader::{AssetLoader, LoadMode, LoadTicket};
pub use registry::ResourceRegistry;

use std::path::Path;
use std::time::Duration;

use crate::error::{ErrorQueue, LoadError};
use crate::renderer::{GraphicsDevice, Texture};

pub type TextureRegistry = ResourceRegistry<Texture>;

/// Texture registry plus the loader that fills it.
pub struct Assets {
    pub textures: TextureRegistry,
    loader: AssetLoader,
    options: LoadOptions,
}

impl Assets {
    pub fn new(device: &mut dyn GraphicsDevice, errors: ErrorQueue) -> Result<Self, LoadError> {
        Ok(Self {
            textures: TextureRegistry::new(Texture::placeholder(device)?),
            loader: AssetLoader::new(errors),
            options: LoadOptions::default(),
        })
    }

    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the handle for `name` right away and starts loading `path` into
    /// it unless a load is already running or finished. If reading, decoding or
    /// creating the GPU texture fails, the handle drops back to the placeholder
    /// and the error lands in the error queue.
    pub fn request_texture(
        &mut self,
        device: &mut dyn GraphicsDevice,
        name: &str,
        path: impl AsRef<Path>,
        mode: LoadMode,
    ) -> ResourceHandle<Texture> {
        let handle = self.textures.get_or_create(name);
        if !handle.mark_pending() {
            log::debug!("Texture '{}' already {:?}", name, handle.status());
            return handle;
        }

        let target = handle.clone();
        let label = name.to_string();
        self.loader.load(
            device,
            path.as_ref(),
            ImageData::decode,
            move |decoded, device| {
                let uploaded = decoded.and_then(|image| {
                    let texture = Texture::from_image(device, &image, &label)?;
                    log::debug!(
                        "Uploaded '{}' ({}x{}), releasing {} bytes of pixels",
                        label,
                        image.width,
                        image.height,
                        image.byte_len()
                    );
                    Ok(texture)
                });
                match uploaded {
                    Ok(texture) => {
                        target.publish(texture);
                        Ok(())
                    }
                    Err(err) => {
                        target.revert_to_placeholder();
                        Err(err)
                    }
                }
            },
            self.options,
            mode,
        );
        handle
    }

    /// Publish finished loads. Call once per frame on the main thread.
    pub fn poll(&mut self, device: &mut dyn GraphicsDevice) -> usize {
        self.loader.poll(device)
    }

    pub fn wait_idle(&mut self, device: &mut dyn GraphicsDevice, timeout: Duration) -> bool {
        self.loader.wait_idle(device, timeout)
    }

    pub fn in_flight(&self) -> usize {
        self.loader.in_flight()
    }

    pub fn errors(&self) -> &ErrorQueue {
        self.loader.errors()
    }

    /// Release every texture, including the placeholder.
    pub fn shutdown(&mut self, device: &mut dyn GraphicsDevice) {
        let loaded = self.textures.drain_loaded();
        log::info!("Releasing {} textures", loaded.len());
        for texture in loaded {
            texture.destroy(device);
        }
        self.textures.placeholder().destroy(device);
    }
}
