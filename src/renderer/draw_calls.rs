use std::ffi::c_void;

use crate::gltf::{Document, Primitive};
use crate::renderer::gl;

/// The draw command of one primitive, resolved from its accessors once at
/// load time. The primitive's vertex array must be bound when executing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawCall {
    Elements {
        mode: gl::types::GLenum,
        index_type: gl::types::GLenum,
        index_byte_offset: usize,
        index_count: gl::types::GLsizei,
    },
    Arrays {
        mode: gl::types::GLenum,
        count: gl::types::GLsizei,
    },
}

impl DrawCall {
    /// Indexed if the primitive has indices, otherwise drawing as many
    /// vertices as its first attribute accessor has elements. None if the
    /// accessor it needs doesn't exist.
    pub fn for_primitive(document: &Document, primitive: &Primitive) -> Option<DrawCall> {
        let mode = primitive.mode as gl::types::GLenum;
        match primitive.indices {
            Some(indices) => {
                let accessor = document.accessors.get(indices)?;
                let view = document.buffer_views.get(accessor.buffer_view?)?;
                Some(DrawCall::Elements {
                    mode,
                    index_type: accessor.component_type.as_u32(),
                    index_byte_offset: accessor.byte_offset + view.byte_offset,
                    index_count: accessor.count as gl::types::GLsizei,
                })
            }
            None => {
                let (_, &accessor) = primitive.attributes.iter().next()?;
                let accessor = document.accessors.get(accessor)?;
                Some(DrawCall::Arrays {
                    mode,
                    count: accessor.count as gl::types::GLsizei,
                })
            }
        }
    }

    pub fn execute(&self) {
        match *self {
            DrawCall::Elements {
                mode,
                index_type,
                index_byte_offset,
                index_count,
            } => {
                gl::call!(gl::DrawElements(
                    mode,
                    index_count,
                    index_type,
                    index_byte_offset as *const c_void,
                ));
            }
            DrawCall::Arrays { mode, count } => {
                gl::call!(gl::DrawArrays(mode, 0, count));
            }
        }
    }
}
