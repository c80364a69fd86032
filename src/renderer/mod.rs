use glam::{Mat4, Vec3};
use sdl2::VideoSubsystem;

use crate::bounds::SceneBounds;
use crate::camera::Camera;
use crate::gltf::Document;
use crate::session::ViewerSession;

pub mod draw_calls;
pub mod gl;
pub mod headless;
pub mod material;
pub mod program;
pub mod resources;
pub mod scene;
pub mod tangents;

use material::MaterialState;
use program::{ProgramError, ShaderProgram, ShaderSources};
use resources::CompiledScene;

/// Loads the GL functions of the current context. Must be called once, after
/// the context is created and before anything else in this module.
pub fn init_gl(video: &VideoSubsystem, vsync: bool) {
    gl::load_with(|s| video.gl_get_proc_address(s) as *const core::ffi::c_void);
    if let Err(err) = video.gl_set_swap_interval(if vsync { 1 } else { 0 }) {
        tracing::warn!("could not set swap interval: {err}");
    }
}

/// Draws a glTF document. Owns everything uploaded to the GPU for it.
pub struct Renderer {
    // Dropped before the document, which the GPU data was created from.
    compiled: CompiledScene,
    program: ShaderProgram,
    document: Document,
    bounds: SceneBounds,
}

impl Renderer {
    pub fn new(
        document: Document,
        bounds: SceneBounds,
        shaders: &ShaderSources,
    ) -> Result<Renderer, ProgramError> {
        let program = program::create_program(shaders)?;
        let compiled = CompiledScene::compile(&document);
        gl::call!(gl::Enable(gl::DEPTH_TEST));
        tracing::info!(
            primitives = document.primitive_count(),
            textures = document.textures.len(),
            "uploaded scene to the GPU"
        );
        Ok(Renderer {
            compiled,
            program,
            document,
            bounds,
        })
    }

    /// Draws one frame of the default scene into the bound framebuffer.
    pub fn draw(&self, camera: &Camera, (width, height): (u32, u32), session: &ViewerSession) {
        gl::call!(gl::Viewport(0, 0, width as i32, height as i32));
        gl::call!(gl::ClearColor(0.0, 0.0, 0.0, 1.0));
        gl::call!(gl::Clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT));

        self.program.use_program();
        let uniforms = &self.program.uniforms;
        let view = camera.view_matrix();
        let projection = self.projection((width, height));

        let light_direction = if session.light_from_camera {
            Vec3::Z
        } else {
            view.transform_vector3(session.light_direction()).normalize_or_zero()
        };
        gl::uniform_3f(uniforms.light_direction, light_direction);
        gl::uniform_3f(uniforms.light_intensity, session.light_intensity());
        gl::uniform_1i(uniforms.occlusion_enabled, session.occlusion as i32);
        gl::uniform_1i(uniforms.normal_texture_enabled, session.normal_map as i32);
        gl::uniform_1i(uniforms.normal_tbn_enabled, session.tbn as i32);
        gl::uniform_1i(uniforms.view_normals, session.view_normals as i32);

        let texture_ids = &self.compiled.texture_ids;
        let white = self.compiled.white_texture.id();
        let meshes = &self.compiled.meshes;

        scene::traverse(&self.document, |_, node, world| {
            let Some(mesh_index) = node.mesh_index else {
                return;
            };
            let (Some(mesh), Some(range)) = (
                self.document.meshes.get(mesh_index),
                meshes.mesh_ranges.get(mesh_index),
            ) else {
                return;
            };
            let model_view = view * world;
            let model_view_proj = projection * model_view;
            let normal_matrix = model_view.inverse().transpose();
            gl::uniform_matrix_4f(uniforms.model_view_matrix, &model_view);
            gl::uniform_matrix_4f(uniforms.model_view_proj_matrix, &model_view_proj);
            gl::uniform_matrix_4f(uniforms.normal_matrix, &normal_matrix);

            for (i, primitive) in mesh.primitives.iter().enumerate() {
                let vao_index = range.begin + i;
                let Some(draw_call) = meshes.draw_calls[vao_index] else {
                    continue;
                };
                MaterialState::resolve(&self.document, primitive.material, texture_ids, white)
                    .apply(uniforms);
                meshes.vertex_arrays[vao_index].bind();
                draw_call.execute();
            }
        });
        gl::call!(gl::BindVertexArray(0));
    }

    fn projection(&self, (width, height): (u32, u32)) -> Mat4 {
        self.bounds.projection(width as f32 / height.max(1) as f32)
    }
}
