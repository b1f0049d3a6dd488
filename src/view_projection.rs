use bytemuck::{Pod, Zeroable};
use cgmath::*;
use constant_buffer_derive::ShaderConstants;

/// Constant buffer used to send the view-projection matrices to the shader pipeline, one per
/// eye for stereo rendering.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, ShaderConstants)]
pub struct ViewProjectionConstantBuffer {
    pub view_projection: [[[f32; 4]; 4]; 2],
}

impl Default for ViewProjectionConstantBuffer {
    fn default() -> Self {
        Self::mono(Matrix4::identity())
    }
}

impl ViewProjectionConstantBuffer {
    pub fn new(left: Matrix4<f32>, right: Matrix4<f32>) -> Self {
        Self {
            view_projection: [left.into(), right.into()],
        }
    }

    /// The same matrix for both eyes.
    pub fn mono(view_projection: Matrix4<f32>) -> Self {
        Self::new(view_projection, view_projection)
    }

    /// `projection * view` for each eye, left first.
    pub fn from_view_projection(views: [Matrix4<f32>; 2], projections: [Matrix4<f32>; 2]) -> Self {
        Self::new(projections[0] * views[0], projections[1] * views[1])
    }

    pub fn left(&self) -> Matrix4<f32> {
        self.view_projection[0].into()
    }

    pub fn right(&self) -> Matrix4<f32> {
        self.view_projection[1].into()
    }
}
