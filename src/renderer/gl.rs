#![allow(clippy::all, dead_code, non_upper_case_globals, unused_imports)]
include!(concat!(env!("OUT_DIR"), "/bindings.rs"));

use std::ffi::{c_void, CString};

use glam::{Mat4, Vec3, Vec4};

/// Calls the given GL function, and in debug builds, panics with the error
/// name and call site if the call raised a GL error.
macro_rules! call {
    ($expr:expr) => {{
        let result = unsafe { $expr };
        if cfg!(debug_assertions) {
            let error = unsafe { $crate::renderer::gl::GetError() };
            if error != $crate::renderer::gl::NO_ERROR {
                let error_number_stringified;
                let error_name = match error {
                    $crate::renderer::gl::INVALID_ENUM => "INVALID_ENUM",
                    $crate::renderer::gl::INVALID_VALUE => "INVALID_VALUE",
                    $crate::renderer::gl::INVALID_OPERATION => "INVALID_OPERATION",
                    $crate::renderer::gl::OUT_OF_MEMORY => "OUT_OF_MEMORY",
                    $crate::renderer::gl::INVALID_FRAMEBUFFER_OPERATION => {
                        "INVALID_FRAMEBUFFER_OPERATION"
                    }
                    _ => {
                        error_number_stringified = format!("{error}");
                        &error_number_stringified
                    }
                };
                panic!(
                    "OpenGL error {error_name} at {}:{}:{}",
                    file!(),
                    line!(),
                    column!(),
                );
            }
        }
        result
    }};
}

pub(crate) use call;

/// Uploads `bytes` into the buffer bound to `target`.
pub fn buffer_data(target: types::GLenum, bytes: &[u8], usage: types::GLenum) {
    call!(BufferData(
        target,
        bytes.len() as isize,
        bytes.as_ptr() as *const c_void,
        usage,
    ));
}

/// Compiles a shader, returning the info log as the error on failure.
pub fn create_shader(shader_type: types::GLenum, source: &str) -> Result<types::GLuint, String> {
    let shader = call!(CreateShader(shader_type));
    let sources = [source.as_bytes().as_ptr() as *const types::GLchar];
    let source_lens = [source.len() as types::GLint];
    call!(ShaderSource(shader, 1, sources.as_ptr(), source_lens.as_ptr()));
    call!(CompileShader(shader));
    let mut compile_status = 0;
    call!(GetShaderiv(shader, COMPILE_STATUS, &mut compile_status));
    if compile_status == FALSE as i32 {
        let mut info_log = [0u8; 4096];
        let mut length = 0;
        call!(GetShaderInfoLog(
            shader,
            info_log.len() as i32,
            &mut length,
            info_log.as_mut_ptr() as *mut types::GLchar,
        ));
        call!(DeleteShader(shader));
        return Err(String::from_utf8_lossy(&info_log[..length.max(0) as usize]).into_owned());
    }
    Ok(shader)
}

/// Links the shaders into a program, returning the info log as the error on
/// failure. The shaders are not deleted.
pub fn create_program(shaders: &[types::GLuint]) -> Result<types::GLuint, String> {
    let program = call!(CreateProgram());
    for &shader in shaders {
        call!(AttachShader(program, shader));
    }
    call!(LinkProgram(program));
    let mut link_status = 0;
    call!(GetProgramiv(program, LINK_STATUS, &mut link_status));
    if link_status == FALSE as i32 {
        let mut info_log = [0u8; 4096];
        let mut length = 0;
        call!(GetProgramInfoLog(
            program,
            info_log.len() as i32,
            &mut length,
            info_log.as_mut_ptr() as *mut types::GLchar,
        ));
        call!(DeleteProgram(program));
        return Err(String::from_utf8_lossy(&info_log[..length.max(0) as usize]).into_owned());
    }
    Ok(program)
}

/// Returns the location of the uniform, or None if the program doesn't have
/// an active uniform with that name.
pub fn get_uniform_location(program: types::GLuint, name: &str) -> Option<types::GLint> {
    let name = CString::new(name).ok()?;
    let location = call!(GetUniformLocation(program, name.as_ptr()));
    (location != -1).then_some(location)
}

pub fn uniform_1i(location: Option<types::GLint>, value: i32) {
    if let Some(location) = location {
        call!(Uniform1i(location, value));
    }
}

pub fn uniform_1f(location: Option<types::GLint>, value: f32) {
    if let Some(location) = location {
        call!(Uniform1f(location, value));
    }
}

pub fn uniform_3f(location: Option<types::GLint>, value: Vec3) {
    if let Some(location) = location {
        call!(Uniform3f(location, value.x, value.y, value.z));
    }
}

pub fn uniform_4f(location: Option<types::GLint>, value: Vec4) {
    if let Some(location) = location {
        call!(Uniform4f(location, value.x, value.y, value.z, value.w));
    }
}

pub fn uniform_matrix_4f(location: Option<types::GLint>, value: &Mat4) {
    if let Some(location) = location {
        let columns = value.to_cols_array();
        call!(UniformMatrix4fv(location, 1, FALSE, columns.as_ptr()));
    }
}

/// Binds `texture` to texture unit `unit` and points the sampler uniform at it.
pub fn bind_sampler(location: Option<types::GLint>, unit: u32, texture: types::GLuint) {
    if let Some(location) = location {
        call!(ActiveTexture(TEXTURE0 + unit));
        call!(BindTexture(TEXTURE_2D, texture));
        call!(Uniform1i(location, unit as i32));
    }
}
