// renderer/material.rs
// Named texture slots bound through resource handles.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use glam::Vec4;
use serde::{Deserialize, Serialize};

use super::shader::{ShaderLibrary, BATCH_SHADER};
use super::{GraphicsDevice, Texture};
use crate::asset::{Assets, LoadMode, ResourceHandle, TextureRegistry};
use crate::error::EngineError;

pub const COLOR: &str = "u_Color";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureSlotType {
    Albedo,
    Normal,
    Metallic,
    Roughness,
    AmbientOcclusion,
}

impl TextureSlotType {
    pub const ALL: [Self; 5] = [
        Self::Albedo,
        Self::Normal,
        Self::Metallic,
        Self::Roughness,
        Self::AmbientOcclusion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Albedo => "albedo",
            Self::Normal => "normal",
            Self::Metallic => "metallic",
            Self::Roughness => "roughness",
            Self::AmbientOcclusion => "ambient_occlusion",
        }
    }

    /// Int uniform set to 1 when the slot holds a loaded texture.
    pub fn presence_uniform(self) -> &'static str {
        match self {
            Self::Albedo => "u_HasAlbedo",
            Self::Normal => "u_HasNormal",
            Self::Metallic => "u_HasMetallic",
            Self::Roughness => "u_HasRoughness",
            Self::AmbientOcclusion => "u_HasAmbientOcclusion",
        }
    }
}

impl fmt::Display for TextureSlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextureSlotType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "albedo" => Ok(Self::Albedo),
            "normal" => Ok(Self::Normal),
            "metallic" => Ok(Self::Metallic),
            "roughness" => Ok(Self::Roughness),
            "ambient_occlusion" | "ao" => Ok(Self::AmbientOcclusion),
            other => Err(EngineError::UnknownTextureSlot(other.to_string())),
        }
    }
}

/// False for a missing handle and for one still showing the placeholder.
pub fn is_texture_valid(texture: Option<&ResourceHandle<Texture>>) -> bool {
    texture.is_some_and(ResourceHandle::is_ready)
}

#[derive(Debug, Clone, Default)]
pub struct MaterialTextures {
    pub albedo: Option<ResourceHandle<Texture>>,
    pub normal: Option<ResourceHandle<Texture>>,
    pub metallic: Option<ResourceHandle<Texture>>,
    pub roughness: Option<ResourceHandle<Texture>>,
    pub ambient_occlusion: Option<ResourceHandle<Texture>>,
}

impl MaterialTextures {
    pub fn get(&self, slot: TextureSlotType) -> Option<&ResourceHandle<Texture>> {
        match slot {
            TextureSlotType::Albedo => self.albedo.as_ref(),
            TextureSlotType::Normal => self.normal.as_ref(),
            TextureSlotType::Metallic => self.metallic.as_ref(),
            TextureSlotType::Roughness => self.roughness.as_ref(),
            TextureSlotType::AmbientOcclusion => self.ambient_occlusion.as_ref(),
        }
    }

    fn slot_mut(&mut self, slot: TextureSlotType) -> &mut Option<ResourceHandle<Texture>> {
        match slot {
            TextureSlotType::Albedo => &mut self.albedo,
            TextureSlotType::Normal => &mut self.normal,
            TextureSlotType::Metallic => &mut self.metallic,
            TextureSlotType::Roughness => &mut self.roughness,
            TextureSlotType::AmbientOcclusion => &mut self.ambient_occlusion,
        }
    }
}

/// Serialized material: shader name, base color and texture paths by slot name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDesc {
    pub name: String,
    #[serde(default = "MaterialDesc::default_shader")]
    pub shader: String,
    #[serde(default = "MaterialDesc::default_color")]
    pub color: [f32; 4],
    #[serde(default)]
    pub textures: BTreeMap<String, PathBuf>,
}

impl MaterialDesc {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    fn default_shader() -> String {
        BATCH_SHADER.to_string()
    }

    const fn default_color() -> [f32; 4] {
        [1.0, 1.0, 1.0, 1.0]
    }
}

#[derive(Debug, Clone)]
pub struct Material {
    name: String,
    shader: String,
    color: Vec4,
    textures: MaterialTextures,
}

impl Material {
    pub fn new(name: impl Into<String>, shader: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shader: shader.into(),
            color: Vec4::ONE,
            textures: MaterialTextures::default(),
        }
    }

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    /// Every slot name is checked before any load starts.
    pub fn from_desc(
        desc: &MaterialDesc,
        assets: &mut Assets,
        device: &mut dyn GraphicsDevice,
        mode: LoadMode,
    ) -> Result<Self, EngineError> {
        let slots = desc
            .textures
            .iter()
            .map(|(slot, path)| slot.parse::<TextureSlotType>().map(|slot| (slot, path)))
            .collect::<Result<Vec<_>, EngineError>>()?;

        let mut material = Self::new(&desc.name, &desc.shader).with_color(Vec4::from_array(desc.color));
        for (slot, path) in slots {
            let name = format!("{}/{}", desc.name, slot);
            material.set_texture(assets, device, &name, path, slot, mode);
        }
        Ok(material)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shader_name(&self) -> &str {
        &self.shader
    }

    pub fn color(&self) -> Vec4 {
        self.color
    }

    pub fn textures(&self) -> &MaterialTextures {
        &self.textures
    }

    pub fn texture(&self, slot: TextureSlotType) -> Option<&ResourceHandle<Texture>> {
        self.textures.get(slot)
    }

    /// Point `slot` at the texture registered as `name`, loading `path` if it
    /// is not loaded yet. Never blocks in async mode; load failures go to the
    /// asset error queue and the slot keeps showing the placeholder.
    pub fn set_texture(
        &mut self,
        assets: &mut Assets,
        device: &mut dyn GraphicsDevice,
        name: &str,
        path: impl AsRef<Path>,
        slot: TextureSlotType,
        mode: LoadMode,
    ) -> ResourceHandle<Texture> {
        let handle = assets.request_texture(device, name, path, mode);
        *self.textures.slot_mut(slot) = Some(handle.clone());
        handle
    }

    /// The slot falls back to the placeholder. A load still in flight for the
    /// old handle will publish into that handle, not into this slot.
    pub fn unset_texture(&mut self, slot: TextureSlotType) -> Option<ResourceHandle<Texture>> {
        self.textures.slot_mut(slot).take()
    }

    pub fn has_texture(&self, slot: TextureSlotType) -> bool {
        is_texture_valid(self.textures.get(slot))
    }

    pub fn has_albedo(&self) -> bool {
        self.has_texture(TextureSlotType::Albedo)
    }

    pub fn has_normal(&self) -> bool {
        self.has_texture(TextureSlotType::Normal)
    }

    pub fn has_metallic(&self) -> bool {
        self.has_texture(TextureSlotType::Metallic)
    }

    pub fn has_roughness(&self) -> bool {
        self.has_texture(TextureSlotType::Roughness)
    }

    pub fn has_ambient_occlusion(&self) -> bool {
        self.has_texture(TextureSlotType::AmbientOcclusion)
    }

    /// Bind each slot's texture, or the placeholder, to its unit.
    pub fn bind_all_texture(
        &self,
        device: &mut dyn GraphicsDevice,
        textures: &TextureRegistry,
        slots: &[(u32, TextureSlotType)],
    ) {
        for &(unit, slot) in slots {
            textures.resolve(self.textures.get(slot)).bind(device, unit);
        }
    }

    /// Like [`Material::bind_all_texture`] with slots given by name. Nothing is
    /// bound if any name is unknown.
    pub fn bind_all_texture_named(
        &self,
        device: &mut dyn GraphicsDevice,
        textures: &TextureRegistry,
        slots: &[(u32, &str)],
    ) -> Result<(), EngineError> {
        let parsed = slots
            .iter()
            .map(|(unit, name)| name.parse::<TextureSlotType>().map(|slot| (*unit, slot)))
            .collect::<Result<Vec<_>, EngineError>>()?;
        self.bind_all_texture(device, textures, &parsed);
        Ok(())
    }

    /// Upload color and slot presence to this material's shader and bind it.
    pub fn bind_shader(
        &self,
        device: &mut dyn GraphicsDevice,
        shaders: &mut ShaderLibrary,
    ) -> Result<(), EngineError> {
        let shader = shaders.get_mut(&self.shader)?;
        shader.set_float4(COLOR, self.color);
        for slot in TextureSlotType::ALL {
            shader.set_int(slot.presence_uniform(), self.has_texture(slot) as i32);
        }
        shader.bind(device);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorQueue;
    use crate::renderer::shader::Shader;
    use crate::renderer::RecordingDevice;

    #[test]
    fn slot_names_round_trip() {
        for slot in TextureSlotType::ALL {
            assert_eq!(slot.as_str().parse::<TextureSlotType>().unwrap(), slot);
        }
        assert_eq!("ao".parse::<TextureSlotType>().unwrap(), TextureSlotType::AmbientOcclusion);
        assert!(matches!(
            "emissive".parse::<TextureSlotType>(),
            Err(EngineError::UnknownTextureSlot(name)) if name == "emissive"
        ));
    }

    #[test]
    fn fresh_slots_are_invalid() {
        let material = Material::new("plain", BATCH_SHADER);
        assert!(!is_texture_valid(None));
        for slot in TextureSlotType::ALL {
            assert!(!material.has_texture(slot));
        }
    }

    #[test]
    fn unset_slots_bind_placeholder() {
        let mut device = RecordingDevice::new();
        let assets = Assets::new(&mut device, ErrorQueue::new()).unwrap();
        let material = Material::new("plain", BATCH_SHADER);

        material.bind_all_texture(
            &mut device,
            &assets.textures,
            &[(0, TextureSlotType::Albedo), (1, TextureSlotType::Normal)],
        );

        let placeholder = assets.textures.placeholder().id;
        assert_eq!(device.bound_texture(0), Some(placeholder));
        assert_eq!(device.bound_texture(1), Some(placeholder));
    }

    #[test]
    fn unknown_slot_name_binds_nothing() {
        let mut device = RecordingDevice::new();
        let assets = Assets::new(&mut device, ErrorQueue::new()).unwrap();
        let material = Material::new("plain", BATCH_SHADER);

        let result = material.bind_all_texture_named(
            &mut device,
            &assets.textures,
            &[(0, "albedo"), (1, "specular")],
        );

        assert!(matches!(result, Err(EngineError::UnknownTextureSlot(_))));
        assert_eq!(device.bound_texture(0), None);
    }

    #[test]
    fn bind_shader_requires_known_shader() {
        let mut device = RecordingDevice::new();
        let mut shaders = ShaderLibrary::new();
        let material = Material::new("lit", "pbr").with_color(Vec4::new(1.0, 0.0, 0.0, 1.0));

        assert!(matches!(
            material.bind_shader(&mut device, &mut shaders),
            Err(EngineError::UnknownShader(_))
        ));

        shaders.insert(Shader::new("pbr"));
        material.bind_shader(&mut device, &mut shaders).unwrap();
        let shader = shaders.get("pbr").unwrap();
        assert_eq!(shader.float4(COLOR), Some(Vec4::new(1.0, 0.0, 0.0, 1.0)));
        assert_eq!(shader.int("u_HasAlbedo"), Some(0));
    }

    #[test]
    fn desc_parses_with_defaults() {
        let desc = MaterialDesc::from_json(r#"{ "name": "crate", "textures": { "albedo": "crate.png" } }"#).unwrap();
        assert_eq!(desc.shader, BATCH_SHADER);
        assert_eq!(desc.color, [1.0; 4]);
        assert_eq!(desc.textures.get("albedo"), Some(&PathBuf::from("crate.png")));
    }
}
