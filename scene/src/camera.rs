use cgmath::{perspective, InnerSpace, Matrix3, Matrix4, Point3, Rad, Vector3, Vector4, Zero};

/// Smallest gap kept between the near and far planes.
pub const MIN_DEPTH_RANGE: f32 = 1e-4;

/// View and projection state. Matrices use the right-handed GL convention; the renderer applies
/// its own clip-space correction on top.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Point3<f32>,
    look: Vector3<f32>,
    up: Vector3<f32>,
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
    aspect: f32,
    near: f32,
    far: f32,
    fov_y: Rad<f32>,
}

impl Default for Camera {
    fn default() -> Self {
        let mut camera = Camera {
            position: Point3::new(0.0, 0.0, 0.0),
            look: -Vector3::unit_z(),
            up: Vector3::unit_y(),
            view: Matrix4::zero(),
            projection: Matrix4::zero(),
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
            fov_y: Rad(std::f32::consts::FRAC_PI_4),
        };
        camera.set_view_matrix(camera.position, camera.look, camera.up);
        camera.set_projection_matrix(camera.aspect, camera.near, camera.far, camera.fov_y);
        camera
    }
}

impl Camera {
    /// Builds the world-to-camera matrix by Gram-Schmidt. `look` and `up` must not be parallel.
    pub fn set_view_matrix(
        &mut self,
        position: Point3<f32>,
        look: Vector3<f32>,
        up: Vector3<f32>,
    ) {
        self.position = position;
        self.look = look;
        self.up = up;

        let w = -look.normalize();
        let u = up.cross(w).normalize();
        let v = w.cross(u);

        let p = Vector3::new(position.x, position.y, position.z);
        self.view = Matrix4::from_cols(
            Vector4::new(u.x, v.x, w.x, 0.0),
            Vector4::new(u.y, v.y, w.y, 0.0),
            Vector4::new(u.z, v.z, w.z, 0.0),
            Vector4::new(-u.dot(p), -v.dot(p), -w.dot(p), 1.0),
        );
    }

    pub fn set_projection_matrix(&mut self, aspect: f32, near: f32, far: f32, fov_y: Rad<f32>) {
        let far = if far <= near {
            near + MIN_DEPTH_RANGE
        } else {
            far
        };
        self.aspect = aspect;
        self.near = near;
        self.far = far;
        self.fov_y = fov_y;
        self.projection = perspective(fov_y, aspect, near, far);
    }

    pub fn translate(&mut self, delta: Vector3<f32>) {
        self.set_view_matrix(self.position + delta, self.look, self.up);
    }

    /// Turns the look direction about the camera's up axis.
    pub fn rotate_around_up(&mut self, angle: Rad<f32>) {
        let rotation = Matrix3::from_axis_angle(self.up.normalize(), angle);
        self.set_view_matrix(self.position, rotation * self.look, self.up);
    }

    /// Tilts look and up together about the camera's right axis.
    pub fn rotate_around_right(&mut self, angle: Rad<f32>) {
        let right = self.look.cross(self.up).normalize();
        let rotation = Matrix3::from_axis_angle(right, angle);
        self.set_view_matrix(self.position, rotation * self.look, rotation * self.up);
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn look(&self) -> Vector3<f32> {
        self.look
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        self.view
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection * self.view
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn fov_y(&self) -> Rad<f32> {
        self.fov_y
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, EuclideanSpace, Transform};

    use super::*;

    fn assert_matrix_close(a: Matrix4<f32>, b: Matrix4<f32>) {
        let a: &[f32; 16] = a.as_ref();
        let b: &[f32; 16] = b.as_ref();
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-5, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn view_matches_look_to_rh() {
        let mut camera = Camera::default();
        let eye = Point3::new(3.0, 2.0, 5.0);
        let look = Vector3::new(-1.0, -0.5, -2.0);
        let up = Vector3::unit_y();
        camera.set_view_matrix(eye, look, up);
        assert_matrix_close(camera.view_matrix(), Matrix4::look_to_rh(eye, look, up));
    }

    #[test]
    fn view_moves_eye_to_origin() {
        let mut camera = Camera::default();
        let eye = Point3::new(1.0, -4.0, 2.5);
        camera.set_view_matrix(eye, Vector3::new(0.0, 0.0, -1.0), Vector3::unit_y());
        let p = camera.view_matrix().transform_point(eye);
        assert!(p.to_vec().magnitude() < 1e-5);
    }

    #[test]
    fn projection_matches_cgmath_perspective() {
        let mut camera = Camera::default();
        camera.set_projection_matrix(1.5, 0.1, 50.0, Deg(60.0).into());
        assert_matrix_close(
            camera.projection_matrix(),
            perspective(Deg(60.0), 1.5, 0.1, 50.0),
        );
    }

    #[test]
    fn far_is_clamped_past_near() {
        let mut camera = Camera::default();
        camera.set_projection_matrix(1.0, 1.0, 0.5, Deg(45.0).into());
        assert_eq!(camera.far(), 1.0 + MIN_DEPTH_RANGE);
        let projection = camera.projection_matrix();
        let m: &[f32; 16] = projection.as_ref();
        assert!(m.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn view_projection_centers_the_look_target() {
        let mut camera = Camera::default();
        let eye = Point3::new(2.0, 1.0, 4.0);
        let target = Point3::new(0.0, 0.0, 0.0);
        camera.set_view_matrix(eye, target - eye, Vector3::unit_y());
        camera.set_projection_matrix(2.0, 0.5, 20.0, Deg(50.0).into());

        assert_eq!(camera.up(), Vector3::unit_y());
        assert_eq!(camera.near(), 0.5);
        assert_eq!(camera.fov_y(), Deg(50.0).into());
        assert_matrix_close(
            camera.view_projection(),
            camera.projection_matrix() * camera.view_matrix(),
        );

        let clip = camera.view_projection() * target.to_homogeneous();
        assert!(clip.x.abs() < 1e-5 && clip.y.abs() < 1e-5);
        let depth = clip.z / clip.w;
        assert!(depth > -1.0 && depth < 1.0, "target depth {depth}");
    }

    #[test]
    fn rotate_around_up_keeps_position() {
        let mut camera = Camera::default();
        camera.set_view_matrix(
            Point3::new(0.0, 1.0, 3.0),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::unit_y(),
        );
        camera.rotate_around_up(Deg(90.0).into());
        assert_eq!(camera.position(), Point3::new(0.0, 1.0, 3.0));
        assert!((camera.look() - Vector3::new(-1.0, 0.0, 0.0)).magnitude() < 1e-5);
    }

    #[test]
    fn translate_shifts_position_only() {
        let mut camera = Camera::default();
        let look = camera.look();
        camera.translate(Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(camera.position(), Point3::new(1.0, 2.0, 3.0));
        assert_eq!(camera.look(), look);
    }
}
