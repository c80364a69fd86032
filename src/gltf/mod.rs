//! In-memory representation of a glTF 2.0 document, with every buffer and
//! image already resolved and decoded.
//!
//! Indices between the lists are kept as plain `usize`s like in the file
//! format. Nothing here validates them: consumers look things up with
//! `.get()` and fall back when a reference dangles.

use glam::{Mat4, Vec3, Vec4};
use std::collections::BTreeMap;

mod accessor;
mod loader;

pub use accessor::AccessorReader;
pub use loader::load;

pub const ATTR_POSITION: &str = "POSITION";
pub const ATTR_NORMAL: &str = "NORMAL";
pub const ATTR_TEXCOORD_0: &str = "TEXCOORD_0";
pub const ATTR_TANGENT: &str = "TANGENT";

/// The `bufferView.target` value for vertex data.
pub const TARGET_ARRAY_BUFFER: u32 = 34962;
/// The `bufferView.target` value for index data.
pub const TARGET_ELEMENT_ARRAY_BUFFER: u32 = 34963;

#[derive(Debug, Default)]
pub struct Document {
    pub scene: Option<usize>,
    pub scenes: Vec<Scene>,
    pub nodes: Vec<Node>,
    pub meshes: Vec<Mesh>,
    pub accessors: Vec<Accessor>,
    pub buffer_views: Vec<BufferView>,
    pub buffers: Vec<Buffer>,
    pub materials: Vec<Material>,
    pub textures: Vec<Texture>,
    pub images: Vec<Image>,
    pub samplers: Vec<Sampler>,
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub node_indices: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub mesh_index: Option<usize>,
    pub child_node_indices: Vec<usize>,
    pub transform: Mat4,
}

impl Default for Node {
    fn default() -> Self {
        Node {
            mesh_index: None,
            child_node_indices: Vec::new(),
            transform: Mat4::IDENTITY,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub primitives: Vec<Primitive>,
}

#[derive(Debug, Clone, Default)]
pub struct Primitive {
    pub mode: Mode,
    pub indices: Option<usize>,
    /// Attribute semantic to accessor index. Sorted, so "any one attribute"
    /// is always the same one.
    pub attributes: BTreeMap<String, usize>,
    pub material: Option<usize>,
}

impl Primitive {
    pub fn attribute(&self, semantic: &str) -> Option<usize> {
        self.attributes.get(semantic).copied()
    }
}

/// Primitive topology. The discriminants match the glTF `mode` values, which
/// in turn match the GL draw mode enums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    Points = 0,
    Lines = 1,
    LineLoop = 2,
    LineStrip = 3,
    #[default]
    Triangles = 4,
    TriangleStrip = 5,
    TriangleFan = 6,
}

impl Mode {
    pub fn from_u32(mode: u32) -> Option<Mode> {
        Some(match mode {
            0 => Mode::Points,
            1 => Mode::Lines,
            2 => Mode::LineLoop,
            3 => Mode::LineStrip,
            4 => Mode::Triangles,
            5 => Mode::TriangleStrip,
            6 => Mode::TriangleFan,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

impl ComponentType {
    pub fn from_u32(component_type: u32) -> Option<ComponentType> {
        Some(match component_type {
            5120 => ComponentType::I8,
            5121 => ComponentType::U8,
            5122 => ComponentType::I16,
            5123 => ComponentType::U16,
            5125 => ComponentType::U32,
            5126 => ComponentType::F32,
            _ => return None,
        })
    }

    /// The glTF `componentType` value, which is also the GL type enum.
    pub fn as_u32(self) -> u32 {
        match self {
            ComponentType::I8 => 5120,
            ComponentType::U8 => 5121,
            ComponentType::I16 => 5122,
            ComponentType::U16 => 5123,
            ComponentType::U32 => 5125,
            ComponentType::F32 => 5126,
        }
    }

    pub fn size(self) -> usize {
        match self {
            ComponentType::I8 | ComponentType::U8 => 1,
            ComponentType::I16 | ComponentType::U16 => 2,
            ComponentType::U32 | ComponentType::F32 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl ElementType {
    pub fn from_name(type_: &str) -> Option<ElementType> {
        Some(match type_ {
            "SCALAR" => ElementType::Scalar,
            "VEC2" => ElementType::Vec2,
            "VEC3" => ElementType::Vec3,
            "VEC4" => ElementType::Vec4,
            "MAT2" => ElementType::Mat2,
            "MAT3" => ElementType::Mat3,
            "MAT4" => ElementType::Mat4,
            _ => return None,
        })
    }

    pub fn component_count(self) -> usize {
        match self {
            ElementType::Scalar => 1,
            ElementType::Vec2 => 2,
            ElementType::Vec3 => 3,
            ElementType::Vec4 => 4,
            ElementType::Mat2 => 4,
            ElementType::Mat3 => 9,
            ElementType::Mat4 => 16,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Accessor {
    pub buffer_view: Option<usize>,
    pub byte_offset: usize,
    pub count: usize,
    pub component_type: ComponentType,
    pub element_type: ElementType,
    pub normalized: bool,
}

impl Accessor {
    /// Size in bytes of one tightly packed element.
    pub fn element_size(&self) -> usize {
        self.component_type.size() * self.element_type.component_count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BufferView {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
    pub target: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct Buffer {
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Material {
    pub base_color_factor: Vec4,
    pub base_color_texture: Option<usize>,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub metallic_roughness_texture: Option<usize>,
    pub emissive_factor: Vec3,
    pub emissive_texture: Option<usize>,
    pub occlusion_texture: Option<usize>,
    pub occlusion_strength: f32,
    pub normal_texture: Option<usize>,
    pub normal_scale: f32,
}

impl Default for Material {
    fn default() -> Self {
        Material {
            base_color_factor: Vec4::ONE,
            base_color_texture: None,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metallic_roughness_texture: None,
            emissive_factor: Vec3::ZERO,
            emissive_texture: None,
            occlusion_texture: None,
            occlusion_strength: 1.0,
            normal_texture: None,
            normal_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Texture {
    pub source: Option<usize>,
    pub sampler: Option<usize>,
}

/// Decoded image, always tightly packed RGBA8.
#[derive(Debug, Clone, Default)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sampler {
    pub mag_filter: Option<u32>,
    pub min_filter: Option<u32>,
    pub wrap_s: u32,
    pub wrap_t: u32,
}

/// `REPEAT`, the default wrap mode of glTF samplers.
pub const WRAP_REPEAT: u32 = 10497;

impl Default for Sampler {
    fn default() -> Self {
        Sampler {
            mag_filter: None,
            min_filter: None,
            wrap_s: WRAP_REPEAT,
            wrap_t: WRAP_REPEAT,
        }
    }
}

impl Document {
    /// Returns a reader over the accessor's elements, or None if the accessor
    /// doesn't exist, is sparse-only, or would read past its buffer.
    pub fn reader(&self, accessor_index: usize) -> Option<AccessorReader<'_>> {
        let accessor = self.accessors.get(accessor_index)?;
        let view = self.buffer_views.get(accessor.buffer_view?)?;
        let buffer = self.buffers.get(view.buffer)?;
        AccessorReader::new(accessor, view, &buffer.data)
    }

    pub fn primitive_count(&self) -> usize {
        self.meshes.iter().map(|mesh| mesh.primitives.len()).sum()
    }

    /// The image a texture samples from, if both exist.
    pub fn texture_source(&self, texture_index: usize) -> Option<usize> {
        let source = self.textures.get(texture_index)?.source?;
        (source < self.images.len()).then_some(source)
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    //! Builders for small in-memory documents.

    use super::*;

    /// Appends `bytes` as a new buffer + buffer view and returns the view index.
    pub fn push_view(document: &mut Document, bytes: &[u8], target: Option<u32>) -> usize {
        document.buffers.push(Buffer {
            data: bytes.to_vec(),
        });
        document.buffer_views.push(BufferView {
            buffer: document.buffers.len() - 1,
            byte_offset: 0,
            byte_length: bytes.len(),
            byte_stride: None,
            target,
        });
        document.buffer_views.len() - 1
    }

    pub fn push_accessor(
        document: &mut Document,
        bytes: &[u8],
        count: usize,
        component_type: ComponentType,
        element_type: ElementType,
        target: Option<u32>,
    ) -> usize {
        let view = push_view(document, bytes, target);
        document.accessors.push(Accessor {
            buffer_view: Some(view),
            byte_offset: 0,
            count,
            component_type,
            element_type,
            normalized: false,
        });
        document.accessors.len() - 1
    }

    pub fn push_vec3s(document: &mut Document, values: &[[f32; 3]]) -> usize {
        let bytes: &[u8] = bytemuck::cast_slice(values);
        push_accessor(
            document,
            bytes,
            values.len(),
            ComponentType::F32,
            ElementType::Vec3,
            Some(TARGET_ARRAY_BUFFER),
        )
    }

    pub fn push_vec2s(document: &mut Document, values: &[[f32; 2]]) -> usize {
        let bytes: &[u8] = bytemuck::cast_slice(values);
        push_accessor(
            document,
            bytes,
            values.len(),
            ComponentType::F32,
            ElementType::Vec2,
            Some(TARGET_ARRAY_BUFFER),
        )
    }

    pub fn push_u16_indices(document: &mut Document, values: &[u16]) -> usize {
        let bytes: &[u8] = bytemuck::cast_slice(values);
        push_accessor(
            document,
            bytes,
            values.len(),
            ComponentType::U16,
            ElementType::Scalar,
            Some(TARGET_ELEMENT_ARRAY_BUFFER),
        )
    }

    /// A primitive with only a POSITION attribute.
    pub fn position_primitive(position_accessor: usize) -> Primitive {
        let mut primitive = Primitive::default();
        primitive
            .attributes
            .insert(ATTR_POSITION.to_string(), position_accessor);
        primitive
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::*;
    use super::*;

    #[test]
    fn texture_source_requires_existing_image() {
        let mut document = Document::default();
        document.textures.push(Texture {
            source: Some(0),
            sampler: None,
        });
        document.textures.push(Texture::default());
        assert_eq!(None, document.texture_source(0));
        document.images.push(Image::default());
        assert_eq!(Some(0), document.texture_source(0));
        assert_eq!(None, document.texture_source(1));
        assert_eq!(None, document.texture_source(2));
    }

    #[test]
    fn primitive_count_sums_all_meshes() {
        let mut document = Document::default();
        let positions = push_vec3s(&mut document, &[[0.0; 3]; 3]);
        document.meshes.push(Mesh {
            primitives: vec![position_primitive(positions); 2],
        });
        document.meshes.push(Mesh::default());
        document.meshes.push(Mesh {
            primitives: vec![position_primitive(positions)],
        });
        assert_eq!(3, document.primitive_count());
    }

    #[test]
    fn component_type_round_trips_gl_enum() {
        for value in [5120, 5121, 5122, 5123, 5125, 5126] {
            assert_eq!(value, ComponentType::from_u32(value).unwrap().as_u32());
        }
        assert_eq!(None, ComponentType::from_u32(5124));
    }
}
