use glam::{Mat4, Vec3};

/// Camera matrices shared by every object in a scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneMatrices {
    projection: Mat4,
    view: Mat4,
    view_projection: Mat4,
}

impl Default for SceneMatrices {
    fn default() -> Self {
        Self {
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
        }
    }
}

impl SceneMatrices {
    /// Right-handed perspective projection; `fov_deg` is the vertical field of view.
    ///
    /// A zero height is treated as one pixel so minimized windows keep a finite aspect.
    pub fn calculate_projection_perspective(
        &mut self,
        width: u32,
        height: u32,
        near: f32,
        far: f32,
        fov_deg: f32,
    ) {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        self.projection = Mat4::perspective_rh(fov_deg.to_radians(), aspect, near, far);
        self.update();
    }

    pub fn set_camera(&mut self, position: Vec3, look_at: Vec3, up: Vec3) {
        self.view = Mat4::look_at_rh(position, look_at, up);
        self.update();
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn view_projection(&self) -> Mat4 {
        self.view_projection
    }

    fn update(&mut self) {
        self.view_projection = self.projection * self.view;
    }
}
