use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};

use glam::{Mat4, Quat, Vec3, Vec4};
use tinyjson::JsonValue;

use crate::gltf::{
    Accessor, Buffer, BufferView, ComponentType, Document, ElementType, Image, Material, Mesh,
    Mode, Node, Primitive, Sampler, Scene, Texture, WRAP_REPEAT,
};

const GLB_MAGIC: u32 = 0x4654_6C67;
const GLB_CHUNK_JSON: u32 = 0x4E4F_534A;
const GLB_CHUNK_BIN: u32 = 0x004E_4942;

type Object = HashMap<String, JsonValue>;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("could not read {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid JSON: {0}")]
    Json(#[from] tinyjson::JsonParseError),
    #[error("invalid GLB container: {0}")]
    Glb(&'static str),
    #[error("missing or malformed property \"{0}\"")]
    Property(String),
    #[error("unsupported URI \"{0}\", only relative file paths are supported")]
    UnsupportedUri(String),
    #[error("buffer {index} has {actual} bytes, expected {expected}")]
    BufferLength {
        index: usize,
        expected: usize,
        actual: usize,
    },
    #[error("could not decode image {index}: {source}")]
    Image {
        index: usize,
        source: image::ImageError,
    },
}

/// Loads a `.gltf` or `.glb` file. External resources are resolved relative
/// to the file's directory.
pub fn load(path: &Path) -> Result<Document, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document = load_from_slice(&bytes, path.parent())?;
    tracing::info!(
        path = %path.display(),
        nodes = document.nodes.len(),
        meshes = document.meshes.len(),
        primitives = document.primitive_count(),
        materials = document.materials.len(),
        textures = document.textures.len(),
        "loaded glTF document"
    );
    Ok(document)
}

/// Parses a glTF JSON document or a GLB container from memory. Without a
/// `base_dir`, documents referencing external files fail to load.
pub fn load_from_slice(bytes: &[u8], base_dir: Option<&Path>) -> Result<Document, LoadError> {
    let (json, bin_chunk) = if bytes.len() >= 4 && read_u32(bytes, 0) == Some(GLB_MAGIC) {
        split_glb(bytes)?
    } else {
        (bytes, None)
    };
    let json = std::str::from_utf8(json).map_err(|_| LoadError::Glb("JSON is not UTF-8"))?;
    let root: JsonValue = json.parse()?;
    let root = object(&root, "root")?;

    let asset = root
        .get("asset")
        .ok_or_else(|| LoadError::Property("asset".to_string()))?;
    if let Some(version) = object(asset, "asset")?.get("version").and_then(|v| v.get::<String>()) {
        if !version.starts_with('2') {
            tracing::warn!(version = %version, "document is not glTF 2.x, loading anyway");
        }
    }
    for extension in array(root, "extensionsRequired")? {
        if let Some(extension) = extension.get::<String>() {
            tracing::warn!(extension = %extension, "required extension is not supported, ignoring");
        }
    }

    let mut buffers = Vec::new();
    for (i, buffer) in array(root, "buffers")?.iter().enumerate() {
        let buffer = object(buffer, "buffers")?;
        let byte_length = req_usize(buffer, "byteLength")?;
        let data = match buffer.get("uri").and_then(|uri| uri.get::<String>()) {
            Some(uri) => read_uri(uri, base_dir)?,
            // The BIN chunk of GLBs
            None if i == 0 => bin_chunk
                .ok_or(LoadError::Glb("buffer without uri, but no BIN chunk"))?
                .to_vec(),
            None => return Err(LoadError::Property(format!("buffers[{i}].uri"))),
        };
        if data.len() < byte_length {
            return Err(LoadError::BufferLength {
                index: i,
                expected: byte_length,
                actual: data.len(),
            });
        }
        buffers.push(Buffer { data });
    }

    let mut buffer_views = Vec::new();
    for view in array(root, "bufferViews")? {
        let view = object(view, "bufferViews")?;
        buffer_views.push(BufferView {
            buffer: req_usize(view, "buffer")?,
            byte_offset: opt_usize(view, "byteOffset")?.unwrap_or(0),
            byte_length: req_usize(view, "byteLength")?,
            byte_stride: opt_usize(view, "byteStride")?,
            target: opt_usize(view, "target")?.map(|target| target as u32),
        });
    }

    let mut accessors = Vec::new();
    for accessor in array(root, "accessors")? {
        let accessor = object(accessor, "accessors")?;
        if accessor.contains_key("sparse") {
            tracing::warn!("sparse accessors are not supported, using the dense values only");
        }
        let component_type = req_usize(accessor, "componentType")? as u32;
        let element_type = accessor.get("type").and_then(|t| t.get::<String>());
        accessors.push(Accessor {
            buffer_view: opt_usize(accessor, "bufferView")?,
            byte_offset: opt_usize(accessor, "byteOffset")?.unwrap_or(0),
            count: req_usize(accessor, "count")?,
            component_type: ComponentType::from_u32(component_type)
                .ok_or_else(|| LoadError::Property("accessors.componentType".to_string()))?,
            element_type: element_type
                .and_then(|t| ElementType::from_name(t))
                .ok_or_else(|| LoadError::Property("accessors.type".to_string()))?,
            normalized: accessor
                .get("normalized")
                .and_then(|v| v.get::<bool>())
                .copied()
                .unwrap_or(false),
        });
    }

    let mut scenes = Vec::new();
    for scene in array(root, "scenes")? {
        let scene = object(scene, "scenes")?;
        scenes.push(Scene {
            node_indices: usize_array(scene, "nodes")?,
        });
    }
    let scene = opt_usize(root, "scene")?;

    let mut nodes = Vec::new();
    for node in array(root, "nodes")? {
        let node = object(node, "nodes")?;
        let transform = if let Some(matrix) = float_array::<16>(node, "matrix")? {
            Mat4::from_cols_array(&matrix)
        } else {
            let translation = float_array::<3>(node, "translation")?
                .map(Vec3::from_array)
                .unwrap_or(Vec3::ZERO);
            let scale = float_array::<3>(node, "scale")?
                .map(Vec3::from_array)
                .unwrap_or(Vec3::ONE);
            let rotation = float_array::<4>(node, "rotation")?
                .map(Quat::from_array)
                .unwrap_or(Quat::IDENTITY);
            Mat4::from_scale_rotation_translation(scale, rotation, translation)
        };
        nodes.push(Node {
            mesh_index: opt_usize(node, "mesh")?,
            child_node_indices: usize_array(node, "children")?,
            transform,
        });
    }

    let mut meshes = Vec::new();
    for mesh in array(root, "meshes")? {
        let mesh = object(mesh, "meshes")?;
        let mut primitives = Vec::new();
        for primitive in array(mesh, "primitives")? {
            let primitive = object(primitive, "primitives")?;
            let mut attributes = BTreeMap::new();
            if let Some(attribute_accessors) = primitive.get("attributes") {
                for (semantic, accessor) in object(attribute_accessors, "attributes")? {
                    attributes.insert(semantic.clone(), take_usize(accessor, semantic)?);
                }
            }
            let mode = opt_usize(primitive, "mode")?.unwrap_or(4) as u32;
            primitives.push(Primitive {
                mode: Mode::from_u32(mode)
                    .ok_or_else(|| LoadError::Property("primitives.mode".to_string()))?,
                indices: opt_usize(primitive, "indices")?,
                attributes,
                material: opt_usize(primitive, "material")?,
            });
        }
        meshes.push(Mesh { primitives });
    }

    let mut materials = Vec::new();
    for material in array(root, "materials")? {
        let material = object(material, "materials")?;
        let mut parsed = Material::default();
        if let Some(pbr) = material.get("pbrMetallicRoughness") {
            let pbr = object(pbr, "pbrMetallicRoughness")?;
            if let Some(factor) = float_array::<4>(pbr, "baseColorFactor")? {
                parsed.base_color_factor = Vec4::from_array(factor);
            }
            parsed.base_color_texture = texture_index(pbr, "baseColorTexture")?;
            parsed.metallic_factor = opt_f32(pbr, "metallicFactor")?.unwrap_or(1.0);
            parsed.roughness_factor = opt_f32(pbr, "roughnessFactor")?.unwrap_or(1.0);
            parsed.metallic_roughness_texture = texture_index(pbr, "metallicRoughnessTexture")?;
        }
        if let Some(factor) = float_array::<3>(material, "emissiveFactor")? {
            parsed.emissive_factor = Vec3::from_array(factor);
        }
        parsed.emissive_texture = texture_index(material, "emissiveTexture")?;
        parsed.occlusion_texture = texture_index(material, "occlusionTexture")?;
        if let Some(info) = material.get("occlusionTexture") {
            parsed.occlusion_strength = opt_f32(object(info, "occlusionTexture")?, "strength")?
                .unwrap_or(1.0);
        }
        parsed.normal_texture = texture_index(material, "normalTexture")?;
        if let Some(info) = material.get("normalTexture") {
            parsed.normal_scale = opt_f32(object(info, "normalTexture")?, "scale")?.unwrap_or(1.0);
        }
        materials.push(parsed);
    }

    let mut textures = Vec::new();
    for texture in array(root, "textures")? {
        let texture = object(texture, "textures")?;
        textures.push(Texture {
            source: opt_usize(texture, "source")?,
            sampler: opt_usize(texture, "sampler")?,
        });
    }

    let mut samplers = Vec::new();
    for sampler in array(root, "samplers")? {
        let sampler = object(sampler, "samplers")?;
        samplers.push(Sampler {
            mag_filter: opt_usize(sampler, "magFilter")?.map(|f| f as u32),
            min_filter: opt_usize(sampler, "minFilter")?.map(|f| f as u32),
            wrap_s: opt_usize(sampler, "wrapS")?.map_or(WRAP_REPEAT, |w| w as u32),
            wrap_t: opt_usize(sampler, "wrapT")?.map_or(WRAP_REPEAT, |w| w as u32),
        });
    }

    let mut images = Vec::new();
    for (i, image) in array(root, "images")?.iter().enumerate() {
        let image = object(image, "images")?;
        let encoded = if let Some(uri) = image.get("uri").and_then(|uri| uri.get::<String>()) {
            read_uri(uri, base_dir)?
        } else {
            let view_index = req_usize(image, "bufferView")?;
            let view = buffer_views
                .get(view_index)
                .ok_or_else(|| LoadError::Property(format!("images[{i}].bufferView")))?;
            let start = view.byte_offset;
            buffers
                .get(view.buffer)
                .and_then(|buffer| buffer.data.get(start..start + view.byte_length))
                .ok_or_else(|| LoadError::Property(format!("images[{i}].bufferView")))?
                .to_vec()
        };
        let decoded = image::load_from_memory(&encoded)
            .map_err(|source| LoadError::Image { index: i, source })?
            .to_rgba8();
        images.push(Image {
            width: decoded.width(),
            height: decoded.height(),
            pixels: decoded.into_raw(),
        });
    }

    Ok(Document {
        scene,
        scenes,
        nodes,
        meshes,
        accessors,
        buffer_views,
        buffers,
        materials,
        textures,
        images,
        samplers,
    })
}

/// Returns the JSON chunk and the optional BIN chunk of a GLB container.
fn split_glb(bytes: &[u8]) -> Result<(&[u8], Option<&[u8]>), LoadError> {
    let version = read_u32(bytes, 4).ok_or(LoadError::Glb("truncated header"))?;
    if version != 2 {
        return Err(LoadError::Glb("only version 2 containers are supported"));
    }
    let length = read_u32(bytes, 8).ok_or(LoadError::Glb("truncated header"))? as usize;
    let bytes = bytes
        .get(..length)
        .ok_or(LoadError::Glb("file is shorter than its header says"))?;

    let mut chunks = Vec::with_capacity(2);
    let mut offset = 12;
    while offset < bytes.len() {
        let chunk_length = read_u32(bytes, offset).ok_or(LoadError::Glb("truncated chunk"))?;
        let chunk_type = read_u32(bytes, offset + 4).ok_or(LoadError::Glb("truncated chunk"))?;
        let start = offset + 8;
        let data = bytes
            .get(start..start + chunk_length as usize)
            .ok_or(LoadError::Glb("truncated chunk"))?;
        chunks.push((chunk_type, data));
        offset = start + chunk_length as usize;
    }

    match chunks.as_slice() {
        [(GLB_CHUNK_JSON, json), rest @ ..] => {
            let bin = rest
                .iter()
                .find(|(chunk_type, _)| *chunk_type == GLB_CHUNK_BIN)
                .map(|(_, data)| *data);
            Ok((json, bin))
        }
        _ => Err(LoadError::Glb("first chunk is not JSON")),
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let bytes = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_uri(uri: &str, base_dir: Option<&Path>) -> Result<Vec<u8>, LoadError> {
    if uri.contains(':') {
        return Err(LoadError::UnsupportedUri(uri.to_string()));
    }
    let base_dir = base_dir.ok_or_else(|| LoadError::UnsupportedUri(uri.to_string()))?;
    let path = base_dir.join(uri.replace("%20", " "));
    tracing::debug!(path = %path.display(), "reading external resource");
    std::fs::read(&path).map_err(|source| LoadError::Io { path, source })
}

fn object<'a>(json_value: &'a JsonValue, name: &str) -> Result<&'a Object, LoadError> {
    json_value
        .get::<Object>()
        .ok_or_else(|| LoadError::Property(name.to_string()))
}

/// Returns the array under `key`, or an empty slice if there is none.
fn array<'a>(object: &'a Object, key: &str) -> Result<&'a [JsonValue], LoadError> {
    match object.get(key) {
        Some(value) => value
            .get::<Vec<JsonValue>>()
            .map(Vec::as_slice)
            .ok_or_else(|| LoadError::Property(key.to_string())),
        None => Ok(&[]),
    }
}

fn take_usize(json_value: &JsonValue, name: &str) -> Result<usize, LoadError> {
    match json_value.get::<f64>() {
        Some(&n) if n >= 0.0 && n.fract() == 0.0 => Ok(n as usize),
        _ => Err(LoadError::Property(name.to_string())),
    }
}

fn opt_usize(object: &Object, key: &str) -> Result<Option<usize>, LoadError> {
    object.get(key).map(|v| take_usize(v, key)).transpose()
}

fn req_usize(object: &Object, key: &str) -> Result<usize, LoadError> {
    opt_usize(object, key)?.ok_or_else(|| LoadError::Property(key.to_string()))
}

fn opt_f32(object: &Object, key: &str) -> Result<Option<f32>, LoadError> {
    object
        .get(key)
        .map(|v| {
            v.get::<f64>()
                .map(|&n| n as f32)
                .ok_or_else(|| LoadError::Property(key.to_string()))
        })
        .transpose()
}

fn usize_array(object: &Object, key: &str) -> Result<Vec<usize>, LoadError> {
    array(object, key)?
        .iter()
        .map(|v| take_usize(v, key))
        .collect()
}

fn float_array<const N: usize>(object: &Object, key: &str) -> Result<Option<[f32; N]>, LoadError> {
    let Some(values) = object.get(key) else {
        return Ok(None);
    };
    let values = values
        .get::<Vec<JsonValue>>()
        .filter(|values| values.len() == N)
        .ok_or_else(|| LoadError::Property(key.to_string()))?;
    let mut result = [0.0; N];
    for (i, value) in values.iter().enumerate() {
        result[i] = *value
            .get::<f64>()
            .ok_or_else(|| LoadError::Property(key.to_string()))? as f32;
    }
    Ok(Some(result))
}

/// The `index` of a textureInfo object under `key`.
fn texture_index(object: &Object, key: &str) -> Result<Option<usize>, LoadError> {
    match object.get(key) {
        Some(info) => opt_usize(self::object(info, key)?, "index"),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0, "translation": [1, 2, 3], "children": [1] }, { "matrix": [2,0,0,0, 0,2,0,0, 0,0,2,0, 0,0,0,1] }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "material": 0 }] }],
        "materials": [{
            "pbrMetallicRoughness": { "baseColorFactor": [1, 0, 0, 1], "metallicFactor": 0.25 },
            "occlusionTexture": { "index": 3, "strength": 0.5 }
        }],
        "accessors": [{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3" }],
        "bufferViews": [{ "buffer": 0, "byteLength": 36 }],
        "buffers": [{ "byteLength": 36 }]
    }"#;

    fn triangle_glb() -> Vec<u8> {
        let mut json = TRIANGLE.as_bytes().to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let bin: Vec<u8> = bytemuck::cast_slice(&[0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
            .to_vec();
        let length = 12 + 8 + json.len() + 8 + bin.len();
        let mut glb = Vec::with_capacity(length);
        for word in [GLB_MAGIC, 2, length as u32, json.len() as u32, GLB_CHUNK_JSON] {
            glb.extend_from_slice(&word.to_le_bytes());
        }
        glb.extend_from_slice(&json);
        for word in [bin.len() as u32, GLB_CHUNK_BIN] {
            glb.extend_from_slice(&word.to_le_bytes());
        }
        glb.extend_from_slice(&bin);
        glb
    }

    #[test]
    fn loads_glb_container() {
        let document = load_from_slice(&triangle_glb(), None).unwrap();
        assert_eq!(Some(0), document.scene);
        assert_eq!(36, document.buffers[0].data.len());
        let reader = document.reader(0).unwrap();
        assert_eq!(Some(Vec3::new(0.0, 1.0, 0.0)), reader.vec3(2));
        assert_eq!(Mode::Triangles, document.meshes[0].primitives[0].mode);
    }

    #[test]
    fn parses_node_transforms() {
        let document = load_from_slice(&triangle_glb(), None).unwrap();
        assert_eq!(
            Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            document.nodes[0].transform
        );
        assert_eq!(Mat4::from_scale(Vec3::splat(2.0)), document.nodes[1].transform);
        assert_eq!(vec![1], document.nodes[0].child_node_indices);
    }

    #[test]
    fn parses_material_with_defaults() {
        let document = load_from_slice(&triangle_glb(), None).unwrap();
        let material = &document.materials[0];
        assert_eq!(Vec4::new(1.0, 0.0, 0.0, 1.0), material.base_color_factor);
        assert_eq!(0.25, material.metallic_factor);
        assert_eq!(1.0, material.roughness_factor);
        assert_eq!(Some(3), material.occlusion_texture);
        assert_eq!(0.5, material.occlusion_strength);
        assert_eq!(None, material.normal_texture);
        assert_eq!(1.0, material.normal_scale);
    }

    #[test]
    fn external_buffer_without_base_dir_fails() {
        let json = TRIANGLE.replace(r#""byteLength": 36 }]"#, r#""byteLength": 36, "uri": "a.bin" }]"#);
        assert!(matches!(
            load_from_slice(json.as_bytes(), None),
            Err(LoadError::UnsupportedUri(_))
        ));
    }

    #[test]
    fn data_uris_are_unsupported() {
        let json = TRIANGLE.replace(
            r#""byteLength": 36 }]"#,
            r#""byteLength": 36, "uri": "data:application/octet-stream;base64,AAAA" }]"#,
        );
        assert!(matches!(
            load_from_slice(json.as_bytes(), Some(Path::new("."))),
            Err(LoadError::UnsupportedUri(_))
        ));
    }

    #[test]
    fn missing_scene_leaves_no_default() {
        let json = TRIANGLE
            .replace(r#""scene": 0,"#, "")
            .replace(r#""buffers": [{ "byteLength": 36 }]"#, r#""buffers": []"#);
        let document = load_from_slice(json.as_bytes(), None).unwrap();
        assert_eq!(None, document.scene);
        assert_eq!(1, document.scenes.len());
    }

    #[test]
    fn rejects_truncated_glb() {
        let mut glb = triangle_glb();
        glb.truncate(30);
        assert!(matches!(
            load_from_slice(&glb, None),
            Err(LoadError::Glb(_))
        ));
    }
}
