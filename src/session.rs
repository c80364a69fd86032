//! Light and shading parameters of a viewing session, changed by key presses
//! and advanced once per frame.

use glam::Vec3;

/// Upper bound of the light's polar angle, theta.
const THETA_MAX: f32 = std::f32::consts::TAU;
/// Upper bound of the light's azimuth, phi.
const PHI_MAX: f32 = std::f32::consts::PI;
const INTENSITY_STEP: f32 = 0.5;
/// Radians the light turns per key press.
const ANGLE_STEP: f32 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerSession {
    pub theta: f32,
    pub phi: f32,
    /// Set from the angles once they first change.
    light_direction: Vec3,
    pub light_color: Vec3,
    pub intensity_factor: f32,

    pub light_from_camera: bool,
    pub occlusion: bool,
    pub normal_map: bool,
    pub tbn: bool,
    pub view_normals: bool,

    pub auto_rotate_light: bool,
    pub auto_evolve_color: bool,
    angle_deltas: [f32; 2],
    color_deltas: Vec3,
}

impl Default for ViewerSession {
    fn default() -> Self {
        ViewerSession {
            theta: 0.0,
            phi: 0.0,
            light_direction: Vec3::ONE,
            light_color: Vec3::ONE,
            intensity_factor: 5.0,
            light_from_camera: false,
            occlusion: true,
            normal_map: true,
            tbn: true,
            view_normals: false,
            auto_rotate_light: false,
            auto_evolve_color: false,
            angle_deltas: [0.001, 0.0015],
            color_deltas: Vec3::new(0.0005, 0.00075, 0.001),
        }
    }
}

/// Adds `delta` to `value`, reversing the delta when the value leaves
/// `0.0..=max`. The value itself is clamped back into range.
fn bounce(value: &mut f32, delta: &mut f32, max: f32) {
    *value += *delta;
    if *value >= max || *value <= 0.0 {
        *value = value.clamp(0.0, max);
        *delta = if *value <= 0.0 { delta.abs() } else { -delta.abs() };
    }
}

impl ViewerSession {
    /// Direction towards the light, in world space. Not necessarily
    /// normalized.
    pub fn light_direction(&self) -> Vec3 {
        self.light_direction
    }

    /// The light's color scaled by its intensity factor.
    pub fn light_intensity(&self) -> Vec3 {
        self.light_color * self.intensity_factor
    }

    /// Points the light along the given spherical angles.
    pub fn set_light_angles(&mut self, theta: f32, phi: f32) {
        self.theta = theta;
        self.phi = phi;
        self.light_direction = direction_from_angles(theta, phi);
    }

    /// Turns the light by whole key-press steps of theta and phi, stopping
    /// at the ends of their ranges.
    pub fn step_light_angles(&mut self, theta_steps: f32, phi_steps: f32) {
        let theta = (self.theta + theta_steps * ANGLE_STEP).clamp(0.0, THETA_MAX);
        let phi = (self.phi + phi_steps * ANGLE_STEP).clamp(0.0, PHI_MAX);
        self.set_light_angles(theta, phi);
    }

    /// Moves the animated light parameters one frame forward. Does nothing
    /// unless light rotation or color evolution is on.
    pub fn advance(&mut self) {
        if self.auto_rotate_light {
            let [theta_delta, phi_delta] = &mut self.angle_deltas;
            bounce(&mut self.theta, theta_delta, THETA_MAX);
            bounce(&mut self.phi, phi_delta, PHI_MAX);
            self.light_direction = direction_from_angles(self.theta, self.phi);
        }
        if self.auto_evolve_color {
            bounce(&mut self.light_color.x, &mut self.color_deltas.x, 1.0);
            bounce(&mut self.light_color.y, &mut self.color_deltas.y, 1.0);
            bounce(&mut self.light_color.z, &mut self.color_deltas.z, 1.0);
        }
    }

    pub fn toggle_light_from_camera(&mut self) {
        self.light_from_camera = !self.light_from_camera;
    }

    pub fn toggle_occlusion(&mut self) {
        self.occlusion = !self.occlusion;
    }

    /// Turning normal mapping off also turns the TBN basis off.
    pub fn toggle_normal_map(&mut self) {
        self.normal_map = !self.normal_map;
        if !self.normal_map {
            self.tbn = false;
        }
    }

    /// Turning the TBN basis on also turns normal mapping on.
    pub fn toggle_tbn(&mut self) {
        self.tbn = !self.tbn;
        if self.tbn {
            self.normal_map = true;
        }
    }

    pub fn toggle_view_normals(&mut self) {
        self.view_normals = !self.view_normals;
    }

    pub fn toggle_auto_rotate_light(&mut self) {
        self.auto_rotate_light = !self.auto_rotate_light;
    }

    pub fn toggle_auto_evolve_color(&mut self) {
        self.auto_evolve_color = !self.auto_evolve_color;
    }

    pub fn increase_intensity(&mut self) {
        self.intensity_factor += INTENSITY_STEP;
    }

    pub fn decrease_intensity(&mut self) {
        self.intensity_factor = (self.intensity_factor - INTENSITY_STEP).max(0.0);
    }
}

pub fn direction_from_angles(theta: f32, phi: f32) -> Vec3 {
    Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn defaults() {
        let session = ViewerSession::default();
        assert_eq!(Vec3::ONE, session.light_direction());
        assert_eq!(Vec3::splat(5.0), session.light_intensity());
        assert!(session.occlusion && session.normal_map && session.tbn);
        assert!(!session.view_normals && !session.light_from_camera);
    }

    #[quickcheck]
    fn advance_without_animation_is_identity(frames: u8) -> bool {
        let mut session = ViewerSession::default();
        session.set_light_angles(1.0, 0.5);
        let before = session.clone();
        for _ in 0..frames {
            session.advance();
        }
        session == before
    }

    #[test]
    fn stepping_angles_aims_the_light() {
        let mut session = ViewerSession::default();
        session.step_light_angles(1.0, 0.0);
        assert_eq!(ANGLE_STEP, session.theta);
        assert_eq!(direction_from_angles(ANGLE_STEP, 0.0), session.light_direction());
        assert!(session.light_direction().x > 0.0);

        session.step_light_angles(0.0, 2.0);
        assert_eq!(2.0 * ANGLE_STEP, session.phi);
        assert!(session.light_direction().z > 0.0);
    }

    #[test]
    fn stepping_angles_stops_at_range_ends() {
        let mut session = ViewerSession::default();
        session.step_light_angles(-1.0, -1.0);
        assert_eq!((0.0, 0.0), (session.theta, session.phi));
        assert_eq!(Vec3::Y, session.light_direction());

        session.step_light_angles(1000.0, 1000.0);
        assert_eq!((THETA_MAX, PHI_MAX), (session.theta, session.phi));
    }

    #[test]
    fn rotating_light_stays_in_range() {
        let mut session = ViewerSession::default();
        session.toggle_auto_rotate_light();
        for _ in 0..20_000 {
            session.advance();
            assert!((0.0..=THETA_MAX).contains(&session.theta));
            assert!((0.0..=PHI_MAX).contains(&session.phi));
        }
        assert_eq!(
            direction_from_angles(session.theta, session.phi),
            session.light_direction()
        );
    }

    #[test]
    fn evolving_color_bounces_off_one() {
        let mut session = ViewerSession::default();
        session.toggle_auto_evolve_color();
        session.advance();
        assert_eq!(Vec3::ONE, session.light_color);
        session.advance();
        assert!(session.light_color.cmplt(Vec3::ONE).all());
        for _ in 0..5000 {
            session.advance();
            assert!(session.light_color.cmpge(Vec3::ZERO).all());
            assert!(session.light_color.cmple(Vec3::ONE).all());
        }
    }

    #[test]
    fn sessions_advance_identically() {
        let mut a = ViewerSession::default();
        a.toggle_auto_rotate_light();
        a.toggle_auto_evolve_color();
        let mut b = a.clone();
        for _ in 0..100 {
            a.advance();
            b.advance();
        }
        assert_eq!(a, b);
    }

    #[test]
    fn normal_map_and_tbn_are_coupled() {
        let mut session = ViewerSession::default();
        session.toggle_normal_map();
        assert!(!session.normal_map);
        assert!(!session.tbn);
        session.toggle_tbn();
        assert!(session.normal_map);
        assert!(session.tbn);
        session.toggle_tbn();
        assert!(session.normal_map);
        assert!(!session.tbn);
    }

    #[test]
    fn intensity_never_goes_negative() {
        let mut session = ViewerSession::default();
        for _ in 0..20 {
            session.decrease_intensity();
        }
        assert_eq!(0.0, session.intensity_factor);
        session.increase_intensity();
        assert_eq!(0.5, session.intensity_factor);
    }

    #[test]
    fn light_points_up_at_zero_theta() {
        assert_eq!(Vec3::Y, direction_from_angles(0.0, 0.0));
    }
}
