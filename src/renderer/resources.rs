//! GPU objects compiled from a [`Document`]: one buffer per glTF buffer, one
//! vertex array per primitive, one texture per glTF texture.
//!
//! Every handle is wrapped in an owning type that deletes it on drop, so the
//! whole set is released exactly once when [`CompiledScene`] goes away.

use std::ffi::c_void;

use crate::gltf::{
    ComponentType, Document, Primitive, ATTR_NORMAL, ATTR_POSITION, ATTR_TANGENT,
    ATTR_TEXCOORD_0, TARGET_ARRAY_BUFFER, TARGET_ELEMENT_ARRAY_BUFFER,
};
use crate::renderer::draw_calls::DrawCall;
use crate::renderer::gl;
use crate::renderer::program::{
    ATTR_LOC_NORMAL, ATTR_LOC_POSITION, ATTR_LOC_TANGENT, ATTR_LOC_TEXCOORD_0,
};
use crate::renderer::tangents;

/// The attributes bound to vertex arrays, and where.
const BOUND_ATTRIBUTES: [(&str, gl::types::GLuint); 4] = [
    (ATTR_POSITION, ATTR_LOC_POSITION),
    (ATTR_NORMAL, ATTR_LOC_NORMAL),
    (ATTR_TEXCOORD_0, ATTR_LOC_TEXCOORD_0),
    (ATTR_TANGENT, ATTR_LOC_TANGENT),
];

#[derive(Debug)]
pub struct GlBuffer(gl::types::GLuint);

impl GlBuffer {
    /// Creates a buffer holding `bytes`. The contents are never changed.
    fn with_data(bytes: &[u8]) -> GlBuffer {
        let mut buffer = 0;
        gl::call!(gl::GenBuffers(1, &mut buffer));
        gl::call!(gl::BindBuffer(gl::ARRAY_BUFFER, buffer));
        gl::buffer_data(gl::ARRAY_BUFFER, bytes, gl::STATIC_DRAW);
        GlBuffer(buffer)
    }

    pub fn id(&self) -> gl::types::GLuint {
        self.0
    }
}

impl Drop for GlBuffer {
    fn drop(&mut self) {
        gl::call!(gl::DeleteBuffers(1, &self.0));
    }
}

#[derive(Debug)]
pub struct GlVertexArray(gl::types::GLuint);

impl GlVertexArray {
    fn new() -> GlVertexArray {
        let mut vao = 0;
        gl::call!(gl::GenVertexArrays(1, &mut vao));
        GlVertexArray(vao)
    }

    pub fn bind(&self) {
        gl::call!(gl::BindVertexArray(self.0));
    }
}

impl Drop for GlVertexArray {
    fn drop(&mut self) {
        gl::call!(gl::DeleteVertexArrays(1, &self.0));
    }
}

#[derive(Debug)]
pub struct GlTexture(gl::types::GLuint);

impl GlTexture {
    pub fn id(&self) -> gl::types::GLuint {
        self.0
    }
}

impl Drop for GlTexture {
    fn drop(&mut self) {
        gl::call!(gl::DeleteTextures(1, &self.0));
    }
}

/// The vertex arrays of one mesh are `vertex_arrays[begin..begin + count]`,
/// in primitive order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshVaoRange {
    pub begin: usize,
    pub count: usize,
}

/// Where one vertex attribute's data lives, as passed to
/// `glVertexAttribPointer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeBinding {
    pub location: gl::types::GLuint,
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_stride: usize,
    pub component_type: ComponentType,
    pub components: usize,
    pub normalized: bool,
}

/// Contiguous, non-overlapping ranges of vertex arrays, one per mesh, in mesh
/// declaration order.
pub fn mesh_vao_ranges(document: &Document) -> Vec<MeshVaoRange> {
    let mut begin = 0;
    document
        .meshes
        .iter()
        .map(|mesh| {
            let range = MeshVaoRange {
                begin,
                count: mesh.primitives.len(),
            };
            begin += range.count;
            range
        })
        .collect()
}

/// The bindings of the primitive's POSITION, NORMAL, TEXCOORD_0 and TANGENT
/// attributes, straight into the glTF buffers. Attributes that are absent or
/// whose accessor doesn't resolve to a buffer are left out.
pub fn attribute_bindings(document: &Document, primitive: &Primitive) -> Vec<AttributeBinding> {
    let mut bindings = Vec::with_capacity(BOUND_ATTRIBUTES.len());
    for (semantic, location) in BOUND_ATTRIBUTES {
        let Some(accessor_index) = primitive.attribute(semantic) else {
            continue;
        };
        if document.reader(accessor_index).is_none() {
            tracing::warn!(semantic, accessor_index, "attribute accessor is unusable, not binding it");
            continue;
        }
        let accessor = &document.accessors[accessor_index];
        let Some(view) = accessor.buffer_view.and_then(|v| document.buffer_views.get(v)) else {
            continue;
        };
        if view.target.is_some_and(|target| target != TARGET_ARRAY_BUFFER) {
            tracing::debug!(semantic, "vertex attribute buffer view isn't marked as vertex data");
        }
        bindings.push(AttributeBinding {
            location,
            buffer: view.buffer,
            byte_offset: accessor.byte_offset + view.byte_offset,
            byte_stride: view.byte_stride.unwrap_or(0),
            component_type: accessor.component_type,
            components: accessor.element_type.component_count(),
            normalized: accessor.normalized,
        });
    }
    bindings
}

/// Uploads every glTF buffer as-is.
pub fn compile_buffers(document: &Document) -> Vec<GlBuffer> {
    let buffers = document
        .buffers
        .iter()
        .map(|buffer| GlBuffer::with_data(&buffer.data))
        .collect();
    gl::call!(gl::BindBuffer(gl::ARRAY_BUFFER, 0));
    buffers
}

pub struct CompiledMeshes {
    pub vertex_arrays: Vec<GlVertexArray>,
    /// Parallel to `vertex_arrays`. None for primitives that can't be drawn.
    pub draw_calls: Vec<Option<DrawCall>>,
    pub mesh_ranges: Vec<MeshVaoRange>,
    /// Synthesized tangents. Only held so they live as long as the vertex
    /// arrays reading them.
    _tangent_buffers: Vec<GlBuffer>,
}

/// Creates a vertex array for every primitive of every mesh, bound to
/// `buffers` (as returned by [`compile_buffers`]).
pub fn compile_vertex_arrays(document: &Document, buffers: &[GlBuffer]) -> CompiledMeshes {
    let mesh_ranges = mesh_vao_ranges(document);
    let mut vertex_arrays = Vec::with_capacity(document.primitive_count());
    let mut draw_calls = Vec::with_capacity(document.primitive_count());
    let mut tangent_buffers = Vec::new();

    for (mesh_index, mesh) in document.meshes.iter().enumerate() {
        debug_assert_eq!(vertex_arrays.len(), mesh_ranges[mesh_index].begin);
        for primitive in &mesh.primitives {
            let vao = GlVertexArray::new();
            vao.bind();

            for binding in attribute_bindings(document, primitive) {
                let Some(buffer) = buffers.get(binding.buffer) else {
                    continue;
                };
                gl::call!(gl::EnableVertexAttribArray(binding.location));
                gl::call!(gl::BindBuffer(gl::ARRAY_BUFFER, buffer.id()));
                gl::call!(gl::VertexAttribPointer(
                    binding.location,
                    binding.components as gl::types::GLint,
                    binding.component_type.as_u32(),
                    if binding.normalized { gl::TRUE } else { gl::FALSE },
                    binding.byte_stride as gl::types::GLsizei,
                    binding.byte_offset as *const c_void,
                ));
            }

            if primitive.attribute(ATTR_TANGENT).is_none() {
                match tangents::vertex_tangents(document, primitive) {
                    Some(tangents) => {
                        let buffer = GlBuffer::with_data(bytemuck::cast_slice(&tangents));
                        gl::call!(gl::EnableVertexAttribArray(ATTR_LOC_TANGENT));
                        gl::call!(gl::VertexAttribPointer(
                            ATTR_LOC_TANGENT,
                            3,
                            gl::FLOAT,
                            gl::FALSE,
                            std::mem::size_of::<glam::Vec3>() as gl::types::GLsizei,
                            std::ptr::null(),
                        ));
                        tangent_buffers.push(buffer);
                    }
                    None => tracing::debug!(mesh_index, "primitive has no tangents"),
                }
            }

            if let Some(indices) = primitive.indices {
                let view = document
                    .accessors
                    .get(indices)
                    .and_then(|accessor| accessor.buffer_view)
                    .and_then(|view| document.buffer_views.get(view));
                if let Some(view) = view {
                    debug_assert!(view
                        .target
                        .map_or(true, |target| target == TARGET_ELEMENT_ARRAY_BUFFER));
                    if let Some(buffer) = buffers.get(view.buffer) {
                        gl::call!(gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, buffer.id()));
                    }
                }
            }

            let draw_call = DrawCall::for_primitive(document, primitive);
            if draw_call.is_none() {
                tracing::warn!(mesh_index, "primitive has no usable accessors, it won't be drawn");
            }
            vertex_arrays.push(vao);
            draw_calls.push(draw_call);
        }
    }
    gl::call!(gl::BindVertexArray(0));
    gl::call!(gl::BindBuffer(gl::ARRAY_BUFFER, 0));

    tracing::debug!(
        vertex_arrays = vertex_arrays.len(),
        synthesized_tangents = tangent_buffers.len(),
        "compiled vertex arrays"
    );
    CompiledMeshes {
        vertex_arrays,
        draw_calls,
        mesh_ranges,
        _tangent_buffers: tangent_buffers,
    }
}

fn is_mipmap_filter(filter: gl::types::GLenum) -> bool {
    matches!(
        filter,
        gl::NEAREST_MIPMAP_NEAREST
            | gl::NEAREST_MIPMAP_LINEAR
            | gl::LINEAR_MIPMAP_NEAREST
            | gl::LINEAR_MIPMAP_LINEAR
    )
}

/// Creates one texture per glTF texture. Textures without a usable source
/// image get None, and the white texture is used in their place.
pub fn compile_textures(document: &Document) -> Vec<Option<GlTexture>> {
    gl::call!(gl::ActiveTexture(gl::TEXTURE0));
    let textures = document
        .textures
        .iter()
        .enumerate()
        .map(|(i, texture)| {
            let Some(image) = document.texture_source(i).map(|source| &document.images[source]) else {
                tracing::warn!(texture = i, "texture has no source image");
                return None;
            };
            let sampler = texture
                .sampler
                .and_then(|sampler| document.samplers.get(sampler))
                .copied()
                .unwrap_or_default();
            let min_filter = sampler.min_filter.unwrap_or(gl::LINEAR);
            let mag_filter = sampler.mag_filter.unwrap_or(gl::LINEAR);

            let mut id = 0;
            gl::call!(gl::GenTextures(1, &mut id));
            gl::call!(gl::BindTexture(gl::TEXTURE_2D, id));
            gl::call!(gl::TexImage2D(
                gl::TEXTURE_2D,
                0,
                gl::RGBA8 as gl::types::GLint,
                image.width as gl::types::GLsizei,
                image.height as gl::types::GLsizei,
                0,
                gl::RGBA,
                gl::UNSIGNED_BYTE,
                image.pixels.as_ptr() as *const c_void,
            ));
            set_sampler_parameters(min_filter, mag_filter, sampler.wrap_s, sampler.wrap_t);
            if is_mipmap_filter(min_filter) {
                gl::call!(gl::GenerateMipmap(gl::TEXTURE_2D));
            }
            Some(GlTexture(id))
        })
        .collect();
    gl::call!(gl::BindTexture(gl::TEXTURE_2D, 0));
    textures
}

fn set_sampler_parameters(
    min_filter: gl::types::GLenum,
    mag_filter: gl::types::GLenum,
    wrap_s: gl::types::GLenum,
    wrap_t: gl::types::GLenum,
) {
    let parameters = [
        (gl::TEXTURE_MIN_FILTER, min_filter),
        (gl::TEXTURE_MAG_FILTER, mag_filter),
        (gl::TEXTURE_WRAP_S, wrap_s),
        (gl::TEXTURE_WRAP_T, wrap_t),
        (gl::TEXTURE_WRAP_R, gl::REPEAT),
    ];
    for (parameter, value) in parameters {
        gl::call!(gl::TexParameteri(
            gl::TEXTURE_2D,
            parameter,
            value as gl::types::GLint
        ));
    }
}

/// A 1x1 opaque white texture, sampled by material channels without a texture.
pub fn create_white_texture() -> GlTexture {
    let white: [u8; 4] = [255; 4];
    let mut id = 0;
    gl::call!(gl::GenTextures(1, &mut id));
    gl::call!(gl::BindTexture(gl::TEXTURE_2D, id));
    gl::call!(gl::TexImage2D(
        gl::TEXTURE_2D,
        0,
        gl::RGBA8 as gl::types::GLint,
        1,
        1,
        0,
        gl::RGBA,
        gl::UNSIGNED_BYTE,
        white.as_ptr() as *const c_void,
    ));
    set_sampler_parameters(gl::LINEAR, gl::LINEAR, gl::REPEAT, gl::REPEAT);
    gl::call!(gl::BindTexture(gl::TEXTURE_2D, 0));
    GlTexture(id)
}

/// Everything drawn each frame, created once after loading.
pub struct CompiledScene {
    pub meshes: CompiledMeshes,
    /// Only held so the data outlives the vertex arrays bound to it.
    _buffers: Vec<GlBuffer>,
    _textures: Vec<Option<GlTexture>>,
    /// Names of `_textures`, parallel to the document's textures.
    pub texture_ids: Vec<Option<gl::types::GLuint>>,
    pub white_texture: GlTexture,
}

impl CompiledScene {
    pub fn compile(document: &Document) -> CompiledScene {
        let textures = compile_textures(document);
        let white_texture = create_white_texture();
        let buffers = compile_buffers(document);
        let meshes = compile_vertex_arrays(document, &buffers);
        let texture_ids = texture_ids(&textures);
        CompiledScene {
            meshes,
            _buffers: buffers,
            _textures: textures,
            texture_ids,
            white_texture,
        }
    }
}

/// Names of compiled textures, for the material binder.
fn texture_ids(textures: &[Option<GlTexture>]) -> Vec<Option<gl::types::GLuint>> {
    textures
        .iter()
        .map(|texture| texture.as_ref().map(GlTexture::id))
        .collect()
}
