// renderer/shader.rs
// Named uniform sets. The device reads them when a shader is bound.

use std::collections::HashMap;

use glam::{Mat4, Vec4};

use super::GraphicsDevice;
use crate::error::EngineError;

pub const BATCH_SHADER: &str = "batch2d";

pub const VIEW_PROJECTION: &str = "u_ViewProjection";
pub const TEXTURES: &str = "u_Textures";
pub const TINT: &str = "u_Tint";

#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Float4(Vec4),
    Mat4(Mat4),
    IntArray(Vec<i32>),
    FloatArray(Vec<f32>),
}

#[derive(Debug, Clone)]
pub struct Shader {
    name: String,
    uniforms: HashMap<String, UniformValue>,
}

impl Shader {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uniforms: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        self.set(name, UniformValue::Int(value));
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.set(name, UniformValue::Float(value));
    }

    pub fn set_float4(&mut self, name: &str, value: Vec4) {
        self.set(name, UniformValue::Float4(value));
    }

    pub fn set_mat4(&mut self, name: &str, value: Mat4) {
        self.set(name, UniformValue::Mat4(value));
    }

    pub fn set_int_array(&mut self, name: &str, values: &[i32]) {
        self.set(name, UniformValue::IntArray(values.to_vec()));
    }

    pub fn set_float_array(&mut self, name: &str, values: &[f32]) {
        self.set(name, UniformValue::FloatArray(values.to_vec()));
    }

    fn set(&mut self, name: &str, value: UniformValue) {
        self.uniforms.insert(name.to_string(), value);
    }

    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(name)
    }

    pub fn mat4(&self, name: &str) -> Option<Mat4> {
        match self.uniforms.get(name) {
            Some(UniformValue::Mat4(m)) => Some(*m),
            _ => None,
        }
    }

    pub fn float4(&self, name: &str) -> Option<Vec4> {
        match self.uniforms.get(name) {
            Some(UniformValue::Float4(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i32> {
        match self.uniforms.get(name) {
            Some(UniformValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn bind(&self, device: &mut dyn GraphicsDevice) {
        device.bind_shader(self);
    }

    pub fn unbind(&self, device: &mut dyn GraphicsDevice) {
        device.unbind_shader();
    }
}

/// Shaders by name. Passes look theirs up every frame.
#[derive(Debug, Default)]
pub struct ShaderLibrary {
    shaders: HashMap<String, Shader>,
}

impl ShaderLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, shader: Shader) {
        if self.shaders.insert(shader.name.clone(), shader).is_some() {
            log::debug!("Replaced shader in library");
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.shaders.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<&Shader, EngineError> {
        self.shaders
            .get(name)
            .ok_or_else(|| EngineError::UnknownShader(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Shader, EngineError> {
        self.shaders
            .get_mut(name)
            .ok_or_else(|| EngineError::UnknownShader(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters_ignore_mismatched_uniforms() {
        let mut shader = Shader::new("test");
        shader.set_int("u_Count", 3);
        shader.set_mat4(VIEW_PROJECTION, Mat4::IDENTITY);

        assert_eq!(shader.int("u_Count"), Some(3));
        assert_eq!(shader.mat4("u_Count"), None);
        assert_eq!(shader.mat4(VIEW_PROJECTION), Some(Mat4::IDENTITY));
    }

    #[test]
    fn missing_shader_is_an_error() {
        let mut library = ShaderLibrary::new();
        library.insert(Shader::new(BATCH_SHADER));

        assert!(library.get(BATCH_SHADER).is_ok());
        assert!(matches!(
            library.get("pbr"),
            Err(EngineError::UnknownShader(name)) if name == "pbr"
        ));
    }
}
