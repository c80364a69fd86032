//! Per-vertex tangents for primitives that don't come with any.
//!
//! The reconstruction is flat: every vertex of a triangle gets the triangle's
//! tangent, unnormalized and not orthogonalized against the normal. The
//! shader takes care of both.

use glam::{Vec2, Vec3};

use crate::gltf::{Document, Mode, Primitive, ATTR_POSITION, ATTR_TANGENT, ATTR_TEXCOORD_0};

/// Computes one tangent per triangle vertex, in draw order: through the index
/// accessor if there is one, otherwise in vertex order.
///
/// Returns None when the primitive already has tangents, isn't a triangle
/// list, or lacks float POSITION / TEXCOORD_0 data to derive them from.
pub fn synthesize_tangents(document: &Document, primitive: &Primitive) -> Option<Vec<Vec3>> {
    if primitive.attribute(ATTR_TANGENT).is_some() {
        return None;
    }
    if primitive.mode != Mode::Triangles {
        tracing::debug!(mode = ?primitive.mode, "not synthesizing tangents for non-triangle primitive");
        return None;
    }
    let positions = document.reader(primitive.attribute(ATTR_POSITION)?)?;
    let uvs = document.reader(primitive.attribute(ATTR_TEXCOORD_0)?)?;

    let vertex = |index: usize| Some((positions.vec3(index)?, uvs.vec2(index)?));
    let vertices = match primitive.indices {
        Some(indices) => {
            let indices = document.reader(indices)?;
            (0..indices.len())
                .map(|i| vertex(indices.index(i)? as usize))
                .collect::<Option<Vec<_>>>()
        }
        None => (0..positions.len()).map(vertex).collect::<Option<Vec<_>>>(),
    };
    let Some(vertices) = vertices else {
        tracing::warn!("primitive has unreadable positions, texture coordinates or indices, skipping tangents");
        return None;
    };

    let mut tangents = Vec::with_capacity(vertices.len());
    for triangle in vertices.chunks_exact(3) {
        let tangent = triangle_tangent(
            [triangle[0].0, triangle[1].0, triangle[2].0],
            [triangle[0].1, triangle[1].1, triangle[2].1],
        );
        tangents.extend_from_slice(&[tangent; 3]);
    }
    // Vertices of a trailing incomplete triangle are never part of a face.
    tangents.resize(vertices.len(), Vec3::ZERO);
    Some(tangents)
}

/// Tangents laid out per vertex, ready to be bound next to the other vertex
/// attributes. For indexed primitives the draw-order tangents are summed into
/// the vertices they were computed for, so shared vertices get the sum of
/// their triangles' tangents.
pub fn vertex_tangents(document: &Document, primitive: &Primitive) -> Option<Vec<Vec3>> {
    let tangents = synthesize_tangents(document, primitive)?;
    let Some(indices) = primitive.indices else {
        return Some(tangents);
    };
    let indices = document.reader(indices)?;
    let vertex_count = document.reader(primitive.attribute(ATTR_POSITION)?)?.len();
    let mut per_vertex = vec![Vec3::ZERO; vertex_count];
    for (i, tangent) in tangents.iter().enumerate() {
        // synthesize_tangents already checked every index.
        let vertex = indices.index(i)? as usize;
        per_vertex[vertex] += *tangent;
    }
    Some(per_vertex)
}

/// The tangent of a triangle: the direction of increasing u, scaled by the
/// inverse of the UV area. Triangles with no UV area get a zero tangent.
pub fn triangle_tangent(positions: [Vec3; 3], uvs: [Vec2; 3]) -> Vec3 {
    let edge1 = positions[1] - positions[0];
    let edge2 = positions[2] - positions[0];
    let delta_uv1 = uvs[1] - uvs[0];
    let delta_uv2 = uvs[2] - uvs[0];

    let determinant = delta_uv1.x * delta_uv2.y - delta_uv2.x * delta_uv1.y;
    if determinant == 0.0 {
        return Vec3::ZERO;
    }
    let f = 1.0 / determinant;
    let tangent = f * (delta_uv2.y * edge1 - delta_uv1.y * edge2);
    if tangent.is_finite() {
        tangent
    } else {
        Vec3::ZERO
    }
}
