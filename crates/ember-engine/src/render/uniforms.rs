use std::collections::HashMap;

/// A named shader constant.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec4([f32; 4]),
    Mat4([[f32; 4]; 4]),
}

/// Supplies uniform values by name at draw time.
///
/// The core never interprets uniforms; it only passes the provider through
/// to the device.
pub trait UniformProvider {
    fn uniform(&self, name: &str) -> Option<UniformValue>;

    fn vec2(&self, name: &str) -> Option<[f32; 2]> {
        match self.uniform(name)? {
            UniformValue::Vec2(v) => Some(v),
            _ => None,
        }
    }

    fn vec4(&self, name: &str) -> Option<[f32; 4]> {
        match self.uniform(name)? {
            UniformValue::Vec4(v) => Some(v),
            _ => None,
        }
    }
}

/// Provider that knows no uniforms.
#[derive(Debug, Copy, Clone, Default)]
pub struct NoUniforms;

impl UniformProvider for NoUniforms {
    fn uniform(&self, _name: &str) -> Option<UniformValue> {
        None
    }
}

/// Hash-map backed provider.
#[derive(Debug, Clone, Default)]
pub struct UniformMap {
    values: HashMap<String, UniformValue>,
}

impl UniformMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: UniformValue) -> &mut Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn with(mut self, name: impl Into<String>, value: UniformValue) -> Self {
        self.set(name, value);
        self
    }
}

impl UniformProvider for UniformMap {
    fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.values.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_lookup_rejects_mismatched_kind() {
        let map = UniformMap::new()
            .with("camera", UniformValue::Vec2([1.0, 2.0]))
            .with("tint", UniformValue::Float(0.5));
        assert_eq!(map.vec2("camera"), Some([1.0, 2.0]));
        assert_eq!(map.vec4("tint"), None);
        assert_eq!(NoUniforms.vec2("camera"), None);
    }
}
