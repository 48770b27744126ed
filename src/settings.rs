use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::renderer::BatchConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub culling: CullingSettings,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default)]
    pub present_mode: PresentModeSetting,
    /// Decode textures on worker threads. When false every load blocks.
    #[serde(default = "EngineSettings::default_async_textures")]
    pub async_textures: bool,
    #[serde(default = "EngineSettings::default_clear_color")]
    pub clear_color: [f32; 4],
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            batch: BatchConfig::default(),
            culling: CullingSettings::default(),
            resolution: Resolution::default(),
            present_mode: PresentModeSetting::default(),
            async_textures: Self::default_async_textures(),
            clear_color: Self::default_clear_color(),
        }
    }
}

impl EngineSettings {
    pub fn load() -> Self {
        Self::load_from_path("settings.json")
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Self {
        use std::fs;

        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<EngineSettings>(&contents) {
                Ok(settings) => {
                    info!("Loaded engine settings from {:?}", path);
                    settings.validate()
                }
                Err(err) => {
                    warn!(
                        "Failed to parse {:?} ({}). Falling back to default engine settings.",
                        path, err
                    );
                    EngineSettings::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "Engine settings file {:?} not found. Using default settings.",
                    path
                );
                EngineSettings::default()
            }
            Err(err) => {
                warn!(
                    "Failed to read {:?} ({}). Falling back to default engine settings.",
                    path, err
                );
                EngineSettings::default()
            }
        }
    }

    pub fn validate(mut self) -> Self {
        self.batch = self.batch.validate();
        self.culling = self.culling.validate();

        if self.resolution.width == 0 || self.resolution.height == 0 {
            warn!("Resolution must be greater than zero. Using default resolution.");
            self.resolution = Resolution::default();
        }

        if self.clear_color.iter().any(|c| !c.is_finite()) {
            warn!("Clear color has non-finite components. Using default.");
            self.clear_color = Self::default_clear_color();
        }

        self
    }

    pub fn present_mode(&self, available: &[wgpu::PresentMode]) -> wgpu::PresentMode {
        let desired = self.present_mode.to_wgpu();
        if available.contains(&desired) {
            return desired;
        }

        warn!(
            "Requested present mode {:?} is not supported. Falling back to FIFO.",
            desired
        );

        if available.contains(&wgpu::PresentMode::Fifo) {
            wgpu::PresentMode::Fifo
        } else {
            available
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo)
        }
    }

    const fn default_async_textures() -> bool {
        true
    }

    const fn default_clear_color() -> [f32; 4] {
        [0.05, 0.05, 0.08, 1.0]
    }
}

/// Which culling tests passes start with and the distance range they use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CullingSettings {
    #[serde(default = "CullingSettings::default_enabled")]
    pub frustum: bool,
    #[serde(default)]
    pub distance: bool,
    #[serde(default)]
    pub near: f32,
    #[serde(default = "CullingSettings::default_far")]
    pub far: f32,
}

impl Default for CullingSettings {
    fn default() -> Self {
        Self {
            frustum: Self::default_enabled(),
            distance: false,
            near: 0.0,
            far: Self::default_far(),
        }
    }
}

impl CullingSettings {
    fn validate(mut self) -> Self {
        if !(self.near >= 0.0) || !(self.far >= self.near) {
            warn!(
                "Culling range [{}, {}] is invalid. Using default range.",
                self.near, self.far
            );
            self.near = 0.0;
            self.far = Self::default_far();
        }
        self
    }

    const fn default_enabled() -> bool {
        true
    }

    const fn default_far() -> f32 {
        1000.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentModeSetting {
    Fifo,
    FifoRelaxed,
    Immediate,
    Mailbox,
    AutoVsync,
    AutoNoVsync,
}

impl PresentModeSetting {
    fn to_wgpu(&self) -> wgpu::PresentMode {
        match self {
            PresentModeSetting::Fifo => wgpu::PresentMode::Fifo,
            PresentModeSetting::FifoRelaxed => wgpu::PresentMode::FifoRelaxed,
            PresentModeSetting::Immediate => wgpu::PresentMode::Immediate,
            PresentModeSetting::Mailbox => wgpu::PresentMode::Mailbox,
            PresentModeSetting::AutoVsync => wgpu::PresentMode::AutoVsync,
            PresentModeSetting::AutoNoVsync => wgpu::PresentMode::AutoNoVsync,
        }
    }
}

impl Default for PresentModeSetting {
    fn default() -> Self {
        PresentModeSetting::Fifo
    }
}
