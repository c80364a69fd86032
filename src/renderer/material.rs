use glam::{Vec3, Vec4};

use crate::gltf::Document;
use crate::renderer::gl;
use crate::renderer::program::Uniforms;

pub const UNIT_BASE_COLOR: u32 = 0;
pub const UNIT_METALLIC_ROUGHNESS: u32 = 1;
pub const UNIT_EMISSIVE: u32 = 2;
pub const UNIT_OCCLUSION: u32 = 3;
pub const UNIT_NORMAL: u32 = 4;

/// The shader state of one primitive's material, with every texture already
/// resolved to a GL texture name. Indexed by the `UNIT_*` constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialState {
    pub base_color_factor: Vec4,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub emissive_factor: Vec3,
    pub occlusion_strength: f32,
    pub normal_scale: f32,
    pub textures: [gl::types::GLuint; 5],
}

impl MaterialState {
    /// Resolves the material at `material_index`. `texture_ids` is parallel to
    /// the document's textures, and `white` stands in for any texture that
    /// isn't there.
    pub fn resolve(
        document: &Document,
        material_index: Option<usize>,
        texture_ids: &[Option<gl::types::GLuint>],
        white: gl::types::GLuint,
    ) -> MaterialState {
        let Some(material) = material_index.and_then(|i| document.materials.get(i)) else {
            return MaterialState::unlit_default(white);
        };
        let texture = |texture_index: Option<usize>| {
            texture_index
                .filter(|&i| document.texture_source(i).is_some())
                .and_then(|i| texture_ids.get(i).copied().flatten())
                .unwrap_or(white)
        };
        MaterialState {
            base_color_factor: material.base_color_factor,
            metallic_factor: material.metallic_factor,
            roughness_factor: material.roughness_factor,
            emissive_factor: material.emissive_factor,
            occlusion_strength: material.occlusion_strength,
            normal_scale: material.normal_scale,
            textures: [
                texture(material.base_color_texture),
                texture(material.metallic_roughness_texture),
                texture(material.emissive_texture),
                texture(material.occlusion_texture),
                texture(material.normal_texture),
            ],
        }
    }

    /// Used for primitives without a material. Unlike a material with every
    /// property left at its default, this one has no ambient occlusion.
    fn unlit_default(white: gl::types::GLuint) -> MaterialState {
        MaterialState {
            base_color_factor: Vec4::ONE,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            emissive_factor: Vec3::ZERO,
            occlusion_strength: 0.0,
            normal_scale: 1.0,
            textures: [white; 5],
        }
    }

    /// Sets the material uniforms of the program in use.
    pub fn apply(&self, uniforms: &Uniforms) {
        gl::uniform_4f(uniforms.base_color_factor, self.base_color_factor);
        gl::uniform_1f(uniforms.metallic_factor, self.metallic_factor);
        gl::uniform_1f(uniforms.roughness_factor, self.roughness_factor);
        gl::uniform_3f(uniforms.emissive_factor, self.emissive_factor);
        gl::uniform_1f(uniforms.occlusion_strength, self.occlusion_strength);
        gl::uniform_1f(uniforms.normal_texture_scale, self.normal_scale);

        let samplers = [
            (uniforms.base_color_texture, UNIT_BASE_COLOR),
            (uniforms.metallic_roughness_texture, UNIT_METALLIC_ROUGHNESS),
            (uniforms.emissive_texture, UNIT_EMISSIVE),
            (uniforms.occlusion_texture, UNIT_OCCLUSION),
            (uniforms.normal_texture, UNIT_NORMAL),
        ];
        for (location, unit) in samplers {
            gl::bind_sampler(location, unit, self.textures[unit as usize]);
        }
    }
}
