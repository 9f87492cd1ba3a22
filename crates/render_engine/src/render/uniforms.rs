//! Per-frame uniform data
//!
//! The model/view/projection matrices are a pure function of elapsed time and
//! the current swapchain aspect ratio, written each frame into a persistently
//! mapped uniform buffer.

use bytemuck::{Pod, Zeroable};
use nalgebra::{Matrix4, Point3, Vector3};

/// Model/view/projection matrices in std140-compatible layout
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct UniformBufferObject {
    /// Model transform
    pub model: [[f32; 4]; 4],
    /// View transform
    pub view: [[f32; 4]; 4],
    /// Projection transform (Vulkan clip space, Y flipped)
    pub proj: [[f32; 4]; 4],
}

impl UniformBufferObject {
    /// Vertical field of view in degrees
    const FOV_Y_DEGREES: f32 = 45.0;
    /// Rotation speed in radians per second (a quarter turn per second)
    const ROTATION_RATE: f32 = std::f32::consts::FRAC_PI_2;

    /// Build the matrices for the given elapsed time and aspect ratio
    ///
    /// The model spins around the Z axis, the camera looks at the origin from
    /// a fixed diagonal, and the projection flips Y for Vulkan's clip space.
    pub fn for_elapsed(elapsed_secs: f32, aspect_ratio: f32) -> Self {
        let model = Matrix4::from_axis_angle(
            &Vector3::z_axis(),
            elapsed_secs * Self::ROTATION_RATE,
        );

        let view = Matrix4::look_at_rh(
            &Point3::new(2.0, 2.0, 2.0),
            &Point3::origin(),
            &Vector3::z_axis(),
        );

        let mut proj = Matrix4::new_perspective(
            aspect_ratio,
            Self::FOV_Y_DEGREES.to_radians(),
            0.1,
            10.0,
        );
        // GL-style projections point Y up; Vulkan clip space points Y down.
        proj[(1, 1)] *= -1.0;

        Self {
            model: model.into(),
            view: view.into(),
            proj: proj.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// At time zero the model transform is the identity.
    #[test]
    fn model_is_identity_at_time_zero() {
        let ubo = UniformBufferObject::for_elapsed(0.0, 1.0);
        let model = Matrix4::from(ubo.model);
        assert_relative_eq!(model, Matrix4::identity(), epsilon = 1e-6);
    }

    /// A full four seconds completes one revolution.
    #[test]
    fn rotation_wraps_after_full_turn() {
        let start = UniformBufferObject::for_elapsed(0.0, 1.0);
        let full_turn = UniformBufferObject::for_elapsed(4.0, 1.0);
        let a = Matrix4::from(start.model);
        let b = Matrix4::from(full_turn.model);
        assert_relative_eq!(a, b, epsilon = 1e-4);
    }

    /// The projection matrix flips Y for Vulkan clip space.
    #[test]
    fn projection_flips_y() {
        let ubo = UniformBufferObject::for_elapsed(0.0, 16.0 / 9.0);
        assert!(
            ubo.proj[1][1] < 0.0,
            "the positive GL Y scale must be negated for Vulkan"
        );
    }

    /// A wider aspect ratio shrinks the X scale of the projection.
    #[test]
    fn aspect_ratio_scales_projection_x() {
        let narrow = UniformBufferObject::for_elapsed(0.0, 1.0);
        let wide = UniformBufferObject::for_elapsed(0.0, 2.0);
        assert!(wide.proj[0][0] < narrow.proj[0][0]);
    }

    /// The uniform block has the size the shader expects.
    #[test]
    fn uniform_block_size_matches_shader_layout() {
        assert_eq!(std::mem::size_of::<UniformBufferObject>(), 3 * 64);
    }
}
