use glam::{Mat4, Quat, Vec3};

mod controller;

pub use controller::{CameraController, ControllerKind, InputState, Key};

/// A look-at camera. `up` is kept orthogonal to the viewing direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    eye: Vec3,
    center: Vec3,
    up: Vec3,
}

impl Default for Camera {
    fn default() -> Self {
        Camera::new(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y)
    }
}

/// Rotates `v` by `angle` radians around `axis`.
pub(crate) fn rotate(v: Vec3, angle: f32, axis: Vec3) -> Vec3 {
    match axis.try_normalize() {
        Some(axis) => Quat::from_axis_angle(axis, angle) * v,
        None => v,
    }
}

impl Camera {
    /// Builds a camera, re-orthogonalizing `up` against the viewing direction.
    /// An `up` parallel to the viewing direction is kept as given.
    pub fn new(eye: Vec3, center: Vec3, up: Vec3) -> Camera {
        let front = center - eye;
        let left = up.cross(front);
        let up = front.cross(left).try_normalize().unwrap_or(up);
        Camera { eye, center, up }
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn front(&self) -> Vec3 {
        (self.center - self.eye).normalize_or_zero()
    }

    pub fn left(&self) -> Vec3 {
        self.up.cross(self.center - self.eye).normalize_or_zero()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.center, self.up)
    }

    /// Translates eye and center together along the camera's own axes.
    pub fn move_local(&mut self, truck_left: f32, pedestal_up: f32, dolly_in: f32) {
        let translation = truck_left * self.left() + pedestal_up * self.up + dolly_in * self.front();
        self.eye += translation;
        self.center += translation;
    }

    /// Rolls around the viewing direction, then tilts around the left axis,
    /// then pans around the (new) up axis. The eye stays in place.
    pub fn rotate_local(&mut self, roll_right: f32, tilt_down: f32, pan_left: f32) {
        let front = self.center - self.eye;
        self.up = rotate(self.up, roll_right, front);

        let left = self.up.cross(front);
        let front = rotate(front, tilt_down, left);
        self.up = rotate(self.up, tilt_down, left);

        let front = rotate(front, pan_left, self.up);
        self.center = self.eye + front;
    }

    /// Pans around a world-space axis. The eye stays in place.
    pub fn rotate_world(&mut self, pan_left: f32, axis: Vec3) {
        let front = self.center - self.eye;
        self.center = self.eye + rotate(front, pan_left, axis);
        self.up = rotate(self.up, pan_left, axis);
    }

    /// Formats the camera as the value of the `--lookat` command line option.
    pub fn to_lookat_arg(&self) -> String {
        let values = [self.eye, self.center, self.up]
            .iter()
            .flat_map(|v| v.to_array())
            .map(|f| f.to_string())
            .collect::<Vec<_>>();
        values.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(expected: Vec3, actual: Vec3) {
        assert!(
            expected.abs_diff_eq(actual, 1e-5),
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn new_orthogonalizes_up() {
        let camera = Camera::new(Vec3::ZERO, Vec3::new(0.0, -1.0, -1.0), Vec3::Y);
        assert!(camera.up().dot(camera.front()).abs() < 1e-6);
        assert_close(Vec3::new(0.0, 1.0, -1.0).normalize(), camera.up());
    }

    #[test]
    fn move_local_translates_eye_and_center() {
        let mut camera = Camera::default();
        camera.move_local(1.0, 2.0, 3.0);
        // Looking down -z with +y up, left is -x.
        assert_close(Vec3::new(-1.0, 2.0, -3.0), camera.eye());
        assert_close(Vec3::new(-1.0, 2.0, -4.0), camera.center());
    }

    #[test]
    fn rotate_world_pans_around_axis() {
        let mut camera = Camera::default();
        camera.rotate_world(std::f32::consts::FRAC_PI_2, Vec3::Y);
        assert_close(Vec3::ZERO, camera.eye());
        assert_close(Vec3::NEG_X, camera.center());
        assert_close(Vec3::Y, camera.up());
    }

    #[test]
    fn rotate_local_tilts_down() {
        let mut camera = Camera::default();
        camera.rotate_local(0.0, std::f32::consts::FRAC_PI_2, 0.0);
        assert_close(Vec3::NEG_Y, camera.center());
        assert_close(Vec3::NEG_Z, camera.up());
    }

    #[test]
    fn lookat_arg_lists_nine_numbers() {
        let camera = Camera::new(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, Vec3::Y);
        assert_eq!(9, camera.to_lookat_arg().split(',').count());
        assert!(camera.to_lookat_arg().starts_with("1,2,3,0,0,0,"));
    }
}
