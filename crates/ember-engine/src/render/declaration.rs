/// Meaning of one vertex attribute.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VertexSemantic {
    Position,
    Texcoord,
    Color,
    /// Policy-specific attribute, numbered by the policy.
    Custom(u8),
}

/// Scalar layout of one vertex attribute.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VertexFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
    Uint32,
    Sint32,
}

impl VertexFormat {
    /// Size in bytes.
    #[inline]
    pub const fn size(self) -> u32 {
        match self {
            VertexFormat::Float32 | VertexFormat::Uint32 | VertexFormat::Sint32 => 4,
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
        }
    }

    #[inline]
    pub const fn to_wgpu(self) -> wgpu::VertexFormat {
        match self {
            VertexFormat::Float32 => wgpu::VertexFormat::Float32,
            VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
            VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
            VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
            VertexFormat::Uint32 => wgpu::VertexFormat::Uint32,
            VertexFormat::Sint32 => wgpu::VertexFormat::Sint32,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexDeclarationEntry {
    pub semantic: VertexSemantic,
    pub offset: u32,
    pub format: VertexFormat,
}

/// Byte layout of one vertex: ordered `(semantic, offset, format)` entries.
///
/// Supplied once per policy and immutable afterwards. Entry `i` is bound to
/// shader location `i`.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct VertexDeclaration {
    entries: Vec<VertexDeclarationEntry>,
    stride: u32,
}

impl VertexDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an attribute right after the previous one.
    pub fn with(mut self, semantic: VertexSemantic, format: VertexFormat) -> Self {
        let offset = self.stride;
        self.entries.push(VertexDeclarationEntry { semantic, offset, format });
        self.stride += format.size();
        self
    }

    /// Appends an attribute at an explicit offset (for padded vertex structs).
    pub fn with_offset(mut self, semantic: VertexSemantic, offset: u32, format: VertexFormat) -> Self {
        self.entries.push(VertexDeclarationEntry { semantic, offset, format });
        self.stride = self.stride.max(offset + format.size());
        self
    }

    /// Overrides the stride, e.g. to account for trailing padding.
    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride;
        self
    }

    #[inline]
    pub fn entries(&self) -> &[VertexDeclarationEntry] {
        &self.entries
    }

    #[inline]
    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn find(&self, semantic: VertexSemantic) -> Option<&VertexDeclarationEntry> {
        self.entries.iter().find(|e| e.semantic == semantic)
    }

    /// True when every attribute lies inside the stride.
    pub fn is_consistent(&self) -> bool {
        self.entries
            .iter()
            .all(|e| e.offset + e.format.size() <= self.stride)
    }

    /// Attribute list for a wgpu vertex buffer layout.
    pub fn wgpu_attributes(&self) -> Vec<wgpu::VertexAttribute> {
        self.entries
            .iter()
            .enumerate()
            .map(|(location, e)| wgpu::VertexAttribute {
                format: e.format.to_wgpu(),
                offset: e.offset as u64,
                shader_location: location as u32,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_offsets_and_stride() {
        let decl = VertexDeclaration::new()
            .with(VertexSemantic::Position, VertexFormat::Float32x2)
            .with(VertexSemantic::Texcoord, VertexFormat::Float32x3)
            .with(VertexSemantic::Color, VertexFormat::Float32x4);

        let offsets: Vec<u32> = decl.entries().iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![0, 8, 20]);
        assert_eq!(decl.stride(), 36);
        assert!(decl.is_consistent());
    }

    #[test]
    fn explicit_offset_extends_stride() {
        let decl = VertexDeclaration::new()
            .with_offset(VertexSemantic::Position, 0, VertexFormat::Float32x2)
            .with_offset(VertexSemantic::Color, 16, VertexFormat::Float32x4);
        assert_eq!(decl.stride(), 32);
    }

    #[test]
    fn shrunk_stride_is_inconsistent() {
        let decl = VertexDeclaration::new()
            .with(VertexSemantic::Color, VertexFormat::Float32x4)
            .with_stride(8);
        assert!(!decl.is_consistent());
    }

    #[test]
    fn wgpu_locations_follow_entry_order() {
        let decl = VertexDeclaration::new()
            .with(VertexSemantic::Position, VertexFormat::Float32x2)
            .with(VertexSemantic::Custom(0), VertexFormat::Uint32);
        let attrs = decl.wgpu_attributes();
        assert_eq!(attrs[1].shader_location, 1);
        assert_eq!(attrs[1].offset, 8);
    }
}
