use std::path::{Path, PathBuf};

use crate::renderer::gl;

/// The vertex attribute location of the POSITION attribute of glTF models.
pub const ATTR_LOC_POSITION: gl::types::GLuint = 0;
/// The vertex attribute location of the NORMAL attribute of glTF models.
pub const ATTR_LOC_NORMAL: gl::types::GLuint = 1;
/// The vertex attribute location of the TEXCOORD_0 attribute of glTF models.
pub const ATTR_LOC_TEXCOORD_0: gl::types::GLuint = 2;
/// The vertex attribute location of the TANGENT attribute of glTF models,
/// given or synthesized.
pub const ATTR_LOC_TANGENT: gl::types::GLuint = 3;

const VERTEX_SHADER: &str = r#"#version 300 es
layout(location = 0) in vec3 aPosition;
layout(location = 1) in vec3 aNormal;
layout(location = 2) in vec2 aTexCoords;
layout(location = 3) in vec3 aTangent;

out vec3 vViewSpacePosition;
out vec3 vViewSpaceNormal;
out vec3 vViewSpaceTangent;
out vec2 vTexCoords;

uniform mat4 uModelViewProjMatrix;
uniform mat4 uModelViewMatrix;
uniform mat4 uNormalMatrix;

void main() {
    vViewSpacePosition = vec3(uModelViewMatrix * vec4(aPosition, 1.0));
    vViewSpaceNormal = vec3(uNormalMatrix * vec4(aNormal, 0.0));
    vViewSpaceTangent = vec3(uModelViewMatrix * vec4(aTangent, 0.0));
    vTexCoords = aTexCoords;
    gl_Position = uModelViewProjMatrix * vec4(aPosition, 1.0);
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 300 es
precision highp float;

in vec3 vViewSpacePosition;
in vec3 vViewSpaceNormal;
in vec3 vViewSpaceTangent;
in vec2 vTexCoords;

out vec4 FRAG_COLOR;

uniform vec3 uLightDirection;
uniform vec3 uLightIntensity;

uniform vec4 uBaseColorFactor;
uniform sampler2D uBaseColorTexture;
uniform float uMetallicFactor;
uniform float uRoughnessFactor;
uniform sampler2D uMetallicRoughnessTexture;
uniform vec3 uEmissiveFactor;
uniform sampler2D uEmissiveTexture;
uniform float uOcclusionStrength;
uniform sampler2D uOcclusionTexture;
uniform float uNormalTextureScale;
uniform sampler2D uNormalTexture;

uniform int uOcclusionOnOff;
uniform int uNormalTextureOnOff;
uniform int uNormalTBNOnOff;
uniform int uViewNormalOnOff;

const float GAMMA = 2.2;
const float INV_GAMMA = 1.0 / GAMMA;
const float M_PI = 3.141592653589793;
const vec3 DIELECTRIC_SPECULAR = vec3(0.04);
const vec3 BLACK = vec3(0.0);

vec3 linear_to_srgb(vec3 color) {
    return pow(color, vec3(INV_GAMMA));
}

vec4 srgb_to_linear(vec4 srgb) {
    return vec4(pow(srgb.rgb, vec3(GAMMA)), srgb.a);
}

vec3 shading_normal() {
    vec3 N = normalize(vViewSpaceNormal);
    if (uNormalTextureOnOff == 0) {
        return N;
    }
    vec3 sampled = texture(uNormalTexture, vTexCoords).rgb * 2.0 - 1.0;
    sampled.xy *= uNormalTextureScale;
    float tangent_length = length(vViewSpaceTangent);
    if (uNormalTBNOnOff == 0 || tangent_length == 0.0 || isnan(tangent_length)) {
        return normalize(N + vec3(sampled.xy, 0.0));
    }
    vec3 T = normalize(vViewSpaceTangent - dot(vViewSpaceTangent, N) * N);
    vec3 B = cross(N, T);
    return normalize(mat3(T, B, N) * sampled);
}

void main() {
    vec3 N = shading_normal();
    if (uViewNormalOnOff != 0) {
        FRAG_COLOR = vec4(N * 0.5 + 0.5, 1.0);
        return;
    }
    vec3 L = uLightDirection;
    vec3 V = normalize(-vViewSpacePosition);
    vec3 H = normalize(L + V);

    vec4 base_color = uBaseColorFactor * srgb_to_linear(texture(uBaseColorTexture, vTexCoords));
    vec4 metallic_roughness = texture(uMetallicRoughnessTexture, vTexCoords);
    float metallic = uMetallicFactor * metallic_roughness.b;
    float roughness = uRoughnessFactor * metallic_roughness.g;

    vec3 c_diff = mix(base_color.rgb * (1.0 - DIELECTRIC_SPECULAR.r), BLACK, metallic);
    vec3 F_0 = mix(DIELECTRIC_SPECULAR, base_color.rgb, metallic);
    float alpha = roughness * roughness;

    float NdotL = clamp(dot(N, L), 0.0, 1.0);
    float NdotV = clamp(dot(N, V), 0.0, 1.0);
    float NdotH = clamp(dot(N, H), 0.0, 1.0);
    float VdotH = clamp(dot(V, H), 0.0, 1.0);

    float base_shlick_factor = 1.0 - VdotH;
    float shlick_factor = base_shlick_factor * base_shlick_factor;
    shlick_factor *= shlick_factor;
    shlick_factor *= base_shlick_factor;
    vec3 F = F_0 + (vec3(1.0) - F_0) * shlick_factor;

    float alpha_squared = alpha * alpha;
    float vis_denominator =
        NdotL * sqrt(NdotV * NdotV * (1.0 - alpha_squared) + alpha_squared) +
        NdotV * sqrt(NdotL * NdotL * (1.0 - alpha_squared) + alpha_squared);
    float Vis = vis_denominator > 0.0 ? 0.5 / vis_denominator : 0.0;

    float d = NdotH * NdotH * (alpha_squared - 1.0) + 1.0;
    float D = alpha_squared / (M_PI * d * d);

    vec3 f_diffuse = (1.0 - F) * (1.0 / M_PI) * c_diff;
    vec3 f_specular = F * Vis * D;

    vec3 emissive = srgb_to_linear(texture(uEmissiveTexture, vTexCoords)).rgb * uEmissiveFactor;
    vec3 color = (f_diffuse + f_specular) * uLightIntensity * NdotL;
    if (uOcclusionOnOff != 0) {
        float ao = texture(uOcclusionTexture, vTexCoords).r;
        color = mix(color, color * ao, uOcclusionStrength);
    }
    color += emissive;

    // The framebuffer is not SRGB, so we transform the linear color to close-enough-to-srgb.
    FRAG_COLOR = vec4(linear_to_srgb(color), 1.0);
}
"#;

#[derive(Debug, thiserror::Error)]
pub enum ProgramError {
    #[error("could not read shader {path:?}: {source}")]
    Source {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("compiling {stage} shader failed: {log}")]
    Compile { stage: &'static str, log: String },
    #[error("linking shader program failed: {log}")]
    Link { log: String },
}

/// Locations of every uniform the renderer may set. A uniform the program
/// doesn't use is None and is skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uniforms {
    pub model_view_proj_matrix: Option<gl::types::GLint>,
    pub model_view_matrix: Option<gl::types::GLint>,
    pub normal_matrix: Option<gl::types::GLint>,

    pub light_direction: Option<gl::types::GLint>,
    pub light_intensity: Option<gl::types::GLint>,

    pub base_color_factor: Option<gl::types::GLint>,
    pub base_color_texture: Option<gl::types::GLint>,
    pub metallic_factor: Option<gl::types::GLint>,
    pub roughness_factor: Option<gl::types::GLint>,
    pub metallic_roughness_texture: Option<gl::types::GLint>,
    pub emissive_factor: Option<gl::types::GLint>,
    pub emissive_texture: Option<gl::types::GLint>,
    pub occlusion_strength: Option<gl::types::GLint>,
    pub occlusion_texture: Option<gl::types::GLint>,
    pub normal_texture_scale: Option<gl::types::GLint>,
    pub normal_texture: Option<gl::types::GLint>,

    pub occlusion_enabled: Option<gl::types::GLint>,
    pub normal_texture_enabled: Option<gl::types::GLint>,
    pub normal_tbn_enabled: Option<gl::types::GLint>,
    pub view_normals: Option<gl::types::GLint>,
}

pub struct ShaderProgram {
    pub program: gl::types::GLuint,
    pub uniforms: Uniforms,
}

/// Where the GLSL sources of a program come from.
#[derive(Debug, Clone, Default)]
pub struct ShaderSources {
    pub vertex_shader: Option<PathBuf>,
    pub fragment_shader: Option<PathBuf>,
}

fn read_source(path: Option<&Path>, builtin: &'static str) -> Result<String, ProgramError> {
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "using shader from file");
            std::fs::read_to_string(path).map_err(|source| ProgramError::Source {
                path: path.to_path_buf(),
                source,
            })
        }
        None => Ok(builtin.to_string()),
    }
}

/// Compiles and returns the shader program used to render glTF models,
/// from the given files or the built-in PBR shaders.
pub fn create_program(sources: &ShaderSources) -> Result<ShaderProgram, ProgramError> {
    let vertex_source = read_source(sources.vertex_shader.as_deref(), VERTEX_SHADER)?;
    let fragment_source = read_source(sources.fragment_shader.as_deref(), FRAGMENT_SHADER)?;

    let vertex_shader = gl::create_shader(gl::VERTEX_SHADER, &vertex_source)
        .map_err(|log| ProgramError::Compile {
            stage: "vertex",
            log,
        })?;
    let fragment_shader = match gl::create_shader(gl::FRAGMENT_SHADER, &fragment_source) {
        Ok(shader) => shader,
        Err(log) => {
            gl::call!(gl::DeleteShader(vertex_shader));
            return Err(ProgramError::Compile {
                stage: "fragment",
                log,
            });
        }
    };
    let program = gl::create_program(&[vertex_shader, fragment_shader]);
    gl::call!(gl::DeleteShader(vertex_shader));
    gl::call!(gl::DeleteShader(fragment_shader));
    let program = program.map_err(|log| ProgramError::Link { log })?;

    let uniform = |name: &str| {
        let location = gl::get_uniform_location(program, name);
        if location.is_none() {
            tracing::debug!(name, "uniform not used by the shader program");
        }
        location
    };
    let uniforms = Uniforms {
        model_view_proj_matrix: uniform("uModelViewProjMatrix"),
        model_view_matrix: uniform("uModelViewMatrix"),
        normal_matrix: uniform("uNormalMatrix"),
        light_direction: uniform("uLightDirection"),
        light_intensity: uniform("uLightIntensity"),
        base_color_factor: uniform("uBaseColorFactor"),
        base_color_texture: uniform("uBaseColorTexture"),
        metallic_factor: uniform("uMetallicFactor"),
        roughness_factor: uniform("uRoughnessFactor"),
        metallic_roughness_texture: uniform("uMetallicRoughnessTexture"),
        emissive_factor: uniform("uEmissiveFactor"),
        emissive_texture: uniform("uEmissiveTexture"),
        occlusion_strength: uniform("uOcclusionStrength"),
        occlusion_texture: uniform("uOcclusionTexture"),
        normal_texture_scale: uniform("uNormalTextureScale"),
        normal_texture: uniform("uNormalTexture"),
        occlusion_enabled: uniform("uOcclusionOnOff"),
        normal_texture_enabled: uniform("uNormalTextureOnOff"),
        normal_tbn_enabled: uniform("uNormalTBNOnOff"),
        view_normals: uniform("uViewNormalOnOff"),
    };
    Ok(ShaderProgram { program, uniforms })
}

impl ShaderProgram {
    pub fn use_program(&self) {
        gl::call!(gl::UseProgram(self.program));
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        gl::call!(gl::DeleteProgram(self.program));
    }
}
