use glam::{Mat4, Vec3};

use crate::camera::Camera;
use crate::gltf::{Document, ATTR_POSITION};

/// Scene size used when the bounding box has no extent.
pub const FALLBACK_DISTANCE: f32 = 100.0;

/// Axis-aligned box around every vertex position of every mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl SceneBounds {
    /// Scans the POSITION accessor of every primitive of every mesh, whether
    /// or not a scene references it. Without any readable position the box
    /// collapses to the origin.
    pub fn compute(document: &Document) -> SceneBounds {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        let positions = document
            .meshes
            .iter()
            .flat_map(|mesh| &mesh.primitives)
            .filter_map(|primitive| primitive.attribute(ATTR_POSITION))
            .filter_map(|accessor| document.reader(accessor));
        for reader in positions {
            for position in reader.iter_vec3() {
                min = min.min(position);
                max = max.max(position);
            }
        }
        if min.cmpgt(max).any() {
            tracing::debug!("no vertex positions found, using an empty bounding box");
            return SceneBounds {
                min: Vec3::ZERO,
                max: Vec3::ZERO,
            };
        }
        SceneBounds { min, max }
    }

    pub fn diagonal(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.max + self.min) * 0.5
    }

    /// The diagonal length, used to scale the camera, near/far planes and
    /// controller speed.
    pub fn max_distance(&self) -> f32 {
        let length = self.diagonal().length();
        if length > 0.0 {
            length
        } else {
            FALLBACK_DISTANCE
        }
    }

    /// A camera looking at the center of the box from one of its corners.
    pub fn default_camera(&self) -> Camera {
        let up = Vec3::Y;
        let center = self.center();
        let diagonal = self.diagonal();
        let eye = if diagonal.z > 0.0 {
            center + diagonal
        } else {
            center + 2.0 * diagonal.cross(up)
        };
        if eye == center {
            // Flat or empty scenes along z.
            return Camera::new(center + Vec3::Z * self.max_distance(), center, up);
        }
        Camera::new(eye, center, up)
    }

    pub fn projection(&self, aspect_ratio: f32) -> Mat4 {
        let max_distance = self.max_distance();
        Mat4::perspective_rh_gl(
            70f32.to_radians(),
            aspect_ratio,
            0.001 * max_distance,
            1.5 * max_distance,
        )
    }

    pub fn controller_speed(&self) -> f32 {
        0.1 * self.max_distance()
    }
}
