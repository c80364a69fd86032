//! Mouse and keyboard camera controls.
//!
//! Controllers read an [`InputState`] snapshot once per frame. The only state
//! they keep between frames is the middle button latch, which remembers the
//! last cursor position while the button is held so a per-frame delta can be
//! computed.

use std::collections::HashSet;

use glam::{DVec2, Vec3};

use crate::camera::{rotate, Camera};

/// Keys the controllers react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Q,
    E,
    Up,
    Down,
    LeftShift,
    LeftCtrl,
    LeftAlt,
}

/// Input sampled at the start of a frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputState {
    pub cursor: DVec2,
    pub middle_button: bool,
    pub keys: HashSet<Key>,
}

impl InputState {
    pub fn is_down(&self, key: Key) -> bool {
        self.keys.contains(&key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ControllerKind {
    FirstPerson,
    Trackball,
}

const WORLD_UP: Vec3 = Vec3::Y;
const ROLL_SPEED: f32 = 0.001;
const CURSOR_ANGLE_SPEED: f32 = 0.01;
const CURSOR_MOVE_SPEED: f32 = 0.01;

#[derive(Debug, Clone)]
struct ControllerState {
    camera: Camera,
    speed: f32,
    /// Last cursor position, while the middle button is held.
    middle_latch: Option<DVec2>,
}

impl ControllerState {
    /// Updates the latch and returns the cursor movement since last frame.
    fn cursor_delta(&mut self, input: &InputState) -> DVec2 {
        if !input.middle_button {
            self.middle_latch = None;
            return DVec2::ZERO;
        }
        let last = self.middle_latch.replace(input.cursor).unwrap_or(input.cursor);
        input.cursor - last
    }
}

#[derive(Debug, Clone)]
pub struct FirstPersonController(ControllerState);

#[derive(Debug, Clone)]
pub struct TrackballController(ControllerState);

/// The active camera controller. Switching kind replaces the whole value and
/// carries the camera over, see [`CameraController::switch_to`].
#[derive(Debug, Clone)]
pub enum CameraController {
    FirstPerson(FirstPersonController),
    Trackball(TrackballController),
}

impl CameraController {
    pub fn new(kind: ControllerKind, speed: f32) -> CameraController {
        let state = ControllerState {
            camera: Camera::default(),
            speed,
            middle_latch: None,
        };
        match kind {
            ControllerKind::FirstPerson => CameraController::FirstPerson(FirstPersonController(state)),
            ControllerKind::Trackball => CameraController::Trackball(TrackballController(state)),
        }
    }

    fn state(&self) -> &ControllerState {
        match self {
            CameraController::FirstPerson(FirstPersonController(state))
            | CameraController::Trackball(TrackballController(state)) => state,
        }
    }

    fn state_mut(&mut self) -> &mut ControllerState {
        match self {
            CameraController::FirstPerson(FirstPersonController(state))
            | CameraController::Trackball(TrackballController(state)) => state,
        }
    }

    pub fn kind(&self) -> ControllerKind {
        match self {
            CameraController::FirstPerson(_) => ControllerKind::FirstPerson,
            CameraController::Trackball(_) => ControllerKind::Trackball,
        }
    }

    pub fn camera(&self) -> Camera {
        self.state().camera
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.state_mut().camera = camera;
    }

    /// Builds a fresh controller of `kind` showing the current camera.
    pub fn switch_to(&self, kind: ControllerKind) -> CameraController {
        let camera = self.camera();
        let mut controller = CameraController::new(kind, self.state().speed);
        controller.set_camera(camera);
        tracing::debug!(
            from = ?self.kind(),
            to = ?kind,
            eye = ?camera.eye(),
            center = ?camera.center(),
            up = ?camera.up(),
            "switched camera controller"
        );
        controller
    }

    /// Advances the camera by one frame. Returns whether it moved.
    pub fn update(&mut self, input: &InputState, elapsed_time: f32) -> bool {
        match self {
            CameraController::FirstPerson(controller) => controller.update(input, elapsed_time),
            CameraController::Trackball(controller) => controller.update(input),
        }
    }
}

impl FirstPersonController {
    fn update(&mut self, input: &InputState, elapsed_time: f32) -> bool {
        let state = &mut self.0;
        let cursor_delta = state.cursor_delta(input);
        let step = state.speed * elapsed_time;
        let axis = |positive: Key, negative: Key| -> f32 {
            let mut value = 0.0;
            if input.is_down(positive) {
                value += step;
            }
            if input.is_down(negative) {
                value -= step;
            }
            value
        };

        let dolly_in = axis(Key::W, Key::S);
        let truck_left = axis(Key::A, Key::D);
        let pedestal_up = axis(Key::Up, Key::Down);
        let mut roll_right = 0.0;
        if input.is_down(Key::Q) {
            roll_right -= ROLL_SPEED;
        }
        if input.is_down(Key::E) {
            roll_right += ROLL_SPEED;
        }
        // Cursor going right pans right, i.e. a negative pan-left angle.
        let pan_left = -CURSOR_ANGLE_SPEED * cursor_delta.x as f32;
        let tilt_down = CURSOR_ANGLE_SPEED * cursor_delta.y as f32;

        let has_moved = [dolly_in, truck_left, pedestal_up, roll_right, pan_left, tilt_down]
            .iter()
            .any(|&delta| delta != 0.0);
        if !has_moved {
            return false;
        }

        let camera = &mut state.camera;
        camera.move_local(truck_left, pedestal_up, dolly_in);
        camera.rotate_local(roll_right, tilt_down, 0.0);
        camera.rotate_world(pan_left, WORLD_UP);
        true
    }
}

impl TrackballController {
    fn update(&mut self, input: &InputState) -> bool {
        let state = &mut self.0;
        let cursor_delta = state.cursor_delta(input);
        if !input.middle_button {
            return false;
        }
        let camera = &mut state.camera;

        if input.is_down(Key::LeftShift) {
            let truck_left = CURSOR_MOVE_SPEED * cursor_delta.x as f32;
            let pedestal_up = CURSOR_MOVE_SPEED * cursor_delta.y as f32;
            if truck_left == 0.0 && pedestal_up == 0.0 {
                return false;
            }
            camera.move_local(truck_left, pedestal_up, 0.0);
            return true;
        }

        if input.is_down(Key::LeftCtrl) || input.is_down(Key::LeftAlt) {
            let zoom = -CURSOR_MOVE_SPEED * cursor_delta.y as f32;
            if zoom == 0.0 {
                return false;
            }
            let view = camera.center() - camera.eye();
            let eye = camera.eye() + view * zoom;
            if eye == camera.center() {
                // The orbit needs a distance to the pivot.
                return false;
            }
            *camera = Camera::new(eye, camera.center(), WORLD_UP);
            return true;
        }

        let latitude = CURSOR_ANGLE_SPEED * cursor_delta.y as f32;
        let longitude = -CURSOR_ANGLE_SPEED * cursor_delta.x as f32;
        if latitude == 0.0 && longitude == 0.0 {
            return false;
        }
        let center = camera.center();
        let depth = camera.eye() - center;
        let depth = rotate(depth, latitude, camera.left());
        let depth = rotate(depth, longitude, WORLD_UP);
        *camera = Camera::new(center + depth, center, WORLD_UP);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn input(cursor: (f64, f64), middle_button: bool, keys: &[Key]) -> InputState {
        InputState {
            cursor: DVec2::new(cursor.0, cursor.1),
            middle_button,
            keys: keys.iter().copied().collect(),
        }
    }

    fn controller(kind: ControllerKind) -> CameraController {
        let mut controller = CameraController::new(kind, 10.0);
        controller.set_camera(Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y));
        controller
    }

    #[quickcheck]
    fn switching_preserves_camera(eye: (f32, f32, f32), center: (f32, f32, f32), to_first_person: bool) -> bool {
        let camera = Camera::new(eye.into(), center.into(), Vec3::Y);
        let mut controller = CameraController::new(ControllerKind::Trackball, 1.0);
        controller.set_camera(camera);
        let before = controller.camera();
        let kind = if to_first_person {
            ControllerKind::FirstPerson
        } else {
            ControllerKind::Trackball
        };
        let switched = controller.switch_to(kind);
        // Compare bits so NaN cameras from degenerate inputs also count.
        let bits = |c: Camera| {
            [c.eye(), c.center(), c.up()].map(|v| v.to_array().map(f32::to_bits))
        };
        switched.kind() == kind && bits(switched.camera()) == bits(before)
    }

    #[test]
    fn orbit_without_cursor_delta_does_not_move() {
        let mut controller = controller(ControllerKind::Trackball);
        let before = controller.camera();
        assert!(!controller.update(&input((10.0, 10.0), true, &[]), 0.016));
        assert!(!controller.update(&input((10.0, 10.0), true, &[]), 0.016));
        assert_eq!(before, controller.camera());
    }

    #[test]
    fn trackball_ignores_cursor_without_middle_button() {
        let mut controller = controller(ControllerKind::Trackball);
        assert!(!controller.update(&input((0.0, 0.0), false, &[]), 0.016));
        assert!(!controller.update(&input((50.0, 50.0), false, &[Key::W]), 0.016));
    }

    #[test]
    fn orbit_keeps_distance_to_center() {
        let mut controller = controller(ControllerKind::Trackball);
        controller.update(&input((0.0, 0.0), true, &[]), 0.016);
        assert!(controller.update(&input((30.0, -20.0), true, &[]), 0.016));
        let camera = controller.camera();
        assert_eq!(Vec3::ZERO, camera.center());
        assert!((camera.eye().length() - 5.0).abs() < 1e-4);
        assert_ne!(Vec3::new(0.0, 0.0, 5.0), camera.eye());
    }

    #[test]
    fn horizontal_orbit_rotates_around_world_up() {
        let mut controller = controller(ControllerKind::Trackball);
        controller.update(&input((0.0, 0.0), true, &[]), 0.016);
        let quarter_turn = std::f64::consts::FRAC_PI_2 / CURSOR_ANGLE_SPEED as f64;
        controller.update(&input((-quarter_turn, 0.0), true, &[]), 0.016);
        let eye = controller.camera().eye();
        assert!(eye.abs_diff_eq(Vec3::new(5.0, 0.0, 0.0), 1e-3), "{eye:?}");
    }

    #[test]
    fn dolly_moves_eye_towards_fixed_center() {
        let mut controller = controller(ControllerKind::Trackball);
        controller.update(&input((0.0, 0.0), true, &[Key::LeftCtrl]), 0.016);
        assert!(controller.update(&input((0.0, -20.0), true, &[Key::LeftCtrl]), 0.016));
        let camera = controller.camera();
        assert_eq!(Vec3::ZERO, camera.center());
        assert!(camera.eye().abs_diff_eq(Vec3::new(0.0, 0.0, 4.0), 1e-5));
    }

    #[test]
    fn pan_moves_eye_and_center_together() {
        let mut controller = controller(ControllerKind::Trackball);
        controller.update(&input((0.0, 0.0), true, &[Key::LeftShift]), 0.016);
        assert!(controller.update(&input((100.0, 0.0), true, &[Key::LeftShift]), 0.016));
        let camera = controller.camera();
        assert!(camera.eye().abs_diff_eq(Vec3::new(-1.0, 0.0, 5.0), 1e-5));
        assert!(camera.center().abs_diff_eq(Vec3::new(-1.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn latch_resets_on_release() {
        let mut controller = controller(ControllerKind::Trackball);
        controller.update(&input((0.0, 0.0), true, &[]), 0.016);
        controller.update(&input((0.0, 0.0), false, &[]), 0.016);
        // Pressing again far away must not jump.
        let before = controller.camera();
        assert!(!controller.update(&input((500.0, 500.0), true, &[]), 0.016));
        assert_eq!(before, controller.camera());
    }

    #[test]
    fn first_person_dollies_with_speed_and_time() {
        let mut controller = controller(ControllerKind::FirstPerson);
        assert!(controller.update(&input((0.0, 0.0), false, &[Key::W]), 0.5));
        let camera = controller.camera();
        assert!(camera.eye().abs_diff_eq(Vec3::new(0.0, 0.0, 0.0), 1e-5));
        assert!(camera.center().abs_diff_eq(Vec3::new(0.0, 0.0, -5.0), 1e-5));
    }

    #[test]
    fn first_person_opposite_keys_cancel() {
        let mut controller = controller(ControllerKind::FirstPerson);
        let before = controller.camera();
        assert!(!controller.update(&input((0.0, 0.0), false, &[Key::A, Key::D]), 0.5));
        assert_eq!(before, controller.camera());
    }

    #[test]
    fn first_person_rolls_with_q_and_e() {
        let mut controller = controller(ControllerKind::FirstPerson);
        assert!(controller.update(&input((0.0, 0.0), false, &[Key::E]), 0.016));
        let camera = controller.camera();
        assert_eq!(Vec3::new(0.0, 0.0, 5.0), camera.eye());
        assert_ne!(Vec3::Y, camera.up());
    }

    #[test]
    fn first_person_ignores_cursor_without_middle_button() {
        let mut controller = controller(ControllerKind::FirstPerson);
        let before = controller.camera();
        assert!(!controller.update(&input((0.0, 0.0), false, &[]), 0.016));
        assert!(!controller.update(&input((50.0, 50.0), false, &[]), 0.016));
        assert_eq!(before, controller.camera());
    }

    #[test]
    fn first_person_cursor_right_pans_right() {
        let mut controller = controller(ControllerKind::FirstPerson);
        assert!(!controller.update(&input((0.0, 0.0), true, &[]), 0.016));
        assert!(controller.update(&input((10.0, 0.0), true, &[]), 0.016));
        let camera = controller.camera();
        let angle = 10.0 * CURSOR_ANGLE_SPEED;
        assert_eq!(Vec3::new(0.0, 0.0, 5.0), camera.eye());
        let expected = Vec3::new(5.0 * angle.sin(), 0.0, 5.0 - 5.0 * angle.cos());
        assert!(camera.center().abs_diff_eq(expected, 1e-4), "{:?}", camera.center());
        assert!(camera.up().abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn first_person_cursor_down_tilts_down() {
        let mut controller = controller(ControllerKind::FirstPerson);
        assert!(!controller.update(&input((0.0, 0.0), true, &[]), 0.016));
        assert!(controller.update(&input((0.0, 10.0), true, &[]), 0.016));
        let camera = controller.camera();
        let angle = 10.0 * CURSOR_ANGLE_SPEED;
        assert_eq!(Vec3::new(0.0, 0.0, 5.0), camera.eye());
        let expected = Vec3::new(0.0, -5.0 * angle.sin(), 5.0 - 5.0 * angle.cos());
        assert!(camera.center().abs_diff_eq(expected, 1e-4), "{:?}", camera.center());
        let up = Vec3::new(0.0, angle.cos(), -angle.sin());
        assert!(camera.up().abs_diff_eq(up, 1e-4), "{:?}", camera.up());
    }

    #[test]
    fn first_person_pedestals_along_up() {
        let mut controller = controller(ControllerKind::FirstPerson);
        assert!(controller.update(&input((0.0, 0.0), false, &[Key::Up]), 0.5));
        let camera = controller.camera();
        assert!(camera.eye().abs_diff_eq(Vec3::new(0.0, 5.0, 5.0), 1e-5));
        assert!(camera.center().abs_diff_eq(Vec3::new(0.0, 5.0, 0.0), 1e-5));

        assert!(controller.update(&input((0.0, 0.0), false, &[Key::Down]), 0.25));
        let camera = controller.camera();
        assert!(camera.eye().abs_diff_eq(Vec3::new(0.0, 2.5, 5.0), 1e-5));
        assert!(camera.center().abs_diff_eq(Vec3::new(0.0, 2.5, 0.0), 1e-5));
    }

    #[test]
    fn left_alt_dollies_like_left_ctrl() {
        let mut controller = controller(ControllerKind::Trackball);
        controller.update(&input((0.0, 0.0), true, &[Key::LeftAlt]), 0.016);
        assert!(controller.update(&input((0.0, -20.0), true, &[Key::LeftAlt]), 0.016));
        let camera = controller.camera();
        assert_eq!(Vec3::ZERO, camera.center());
        assert!(camera.eye().abs_diff_eq(Vec3::new(0.0, 0.0, 4.0), 1e-5));
    }
}
