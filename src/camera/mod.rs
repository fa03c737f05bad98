/// Perspective camera and view frustum
/// Yaw/pitch orientation, OpenGL-style clip space (-w <= z <= w)
use glam::{Mat4, Quat, Vec3, Vec4};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub yaw: f32,   // Rotation around Y axis (radians)
    pub pitch: f32, // Rotation around X axis (radians)
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub aspect_ratio: f32,
}

impl Camera {
    pub fn new(position: Vec3, aspect_ratio: f32) -> Self {
        Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
            fov: 60.0f32.to_radians(),
            near: 0.1,
            far: 100.0,
            aspect_ratio,
        }
    }

    /// Turn the camera towards `target`.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let view_matrix = Mat4::look_at_rh(self.position, target, up);
        let rotation_quat = Quat::from_mat4(&view_matrix.inverse());
        let (yaw, pitch, _roll) = rotation_quat.to_euler(glam::EulerRot::YXZ);
        self.yaw = yaw;
        self.pitch = pitch;
    }

    /// Builder form of [`Camera::look_at`] with +Y up.
    pub fn looking_at(mut self, target: Vec3) -> Self {
        self.look_at(target, Vec3::Y);
        self
    }

    pub fn view_matrix(&self) -> Mat4 {
        let rotation = self.rotation_quat();
        let forward = rotation * Vec3::NEG_Z;
        let up = rotation * Vec3::Y;
        Mat4::look_at_rh(self.position, self.position + forward, up)
    }

    /// Projection into clip space with `-w <= z <= w`.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov, self.aspect_ratio, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation_quat() * Vec3::NEG_Z
    }

    pub fn right(&self) -> Vec3 {
        self.rotation_quat() * Vec3::X
    }

    pub fn up(&self) -> Vec3 {
        self.rotation_quat() * Vec3::Y
    }

    fn rotation_quat(&self) -> Quat {
        Quat::from_rotation_y(self.yaw) * Quat::from_rotation_x(self.pitch)
    }

    /// Euclidean distance from the camera to a world-space point. Orders
    /// transparent objects back to front.
    #[inline]
    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.position.distance(point)
    }

    /// Update aspect ratio (call when the target resizes)
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }

    /// Extract frustum planes from the view-projection matrix
    pub fn extract_frustum(&self) -> Frustum {
        Frustum::from_view_projection(&self.view_projection_matrix())
    }
}

/// Maps normalized device coordinates `[-1, 1]^3` to window coordinates:
/// `x` in `[0, width]`, `y` in `[0, height]` (origin bottom-left) and depth
/// in `[0, 1]`.
pub fn viewport_matrix(width: usize, height: usize) -> Mat4 {
    let half_w = width as f32 * 0.5;
    let half_h = height as f32 * 0.5;
    Mat4::from_cols(
        Vec4::new(half_w, 0.0, 0.0, 0.0),
        Vec4::new(0.0, half_h, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 0.5, 0.0),
        Vec4::new(half_w, half_h, 0.5, 1.0),
    )
}

/// View frustum represented as 6 planes for AABB culling
/// Planes are stored in Hessian normal form: ax + by + cz + d = 0
/// where (a,b,c) is the inward-facing normal
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    /// 6 planes: left, right, bottom, top, near, far
    pub planes: [Vec4; 6],
}

impl Frustum {
    /// Gribb-Hartmann extraction. Matches the `-w <= z <= w` clip volume, so
    /// the near plane is `row3 + row2`.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let row0 = vp.row(0);
        let row1 = vp.row(1);
        let row2 = vp.row(2);
        let row3 = vp.row(3);

        Self {
            planes: [
                Self::normalize_plane(row3 + row0),
                Self::normalize_plane(row3 - row0),
                Self::normalize_plane(row3 + row1),
                Self::normalize_plane(row3 - row1),
                Self::normalize_plane(row3 + row2),
                Self::normalize_plane(row3 - row2),
            ],
        }
    }

    #[inline]
    fn normalize_plane(plane: Vec4) -> Vec4 {
        let normal_length = plane.truncate().length();
        if normal_length > 0.0001 {
            plane / normal_length
        } else {
            plane
        }
    }

    /// Conservative test: true if the box is at least partially inside.
    pub fn intersects_aabb(&self, min: Vec3, max: Vec3) -> bool {
        self.planes.iter().all(|plane| {
            // Corner furthest along the plane normal
            let p_vertex = Vec3::new(
                if plane.x > 0.0 { max.x } else { min.x },
                if plane.y > 0.0 { max.y } else { min.y },
                if plane.z > 0.0 { max.z } else { min.z },
            );
            plane.truncate().dot(p_vertex) + plane.w >= 0.0
        })
    }

    /// Transform a model-space box by `model` and test the world-space box
    /// that encloses it.
    pub fn intersects_transformed_aabb(&self, min: Vec3, max: Vec3, model: &Mat4) -> bool {
        let (mut world_min, mut world_max) = (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY));
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { min.x } else { max.x },
                if i & 2 == 0 { min.y } else { max.y },
                if i & 4 == 0 { min.z } else { max.z },
            );
            let p = model.transform_point3(corner);
            world_min = world_min.min(p);
            world_max = world_max.max(p);
        }
        self.intersects_aabb(world_min, world_max)
    }
}
