//! Flat 16-float serialization of per-camera transforms.

use crate::RigidTransform;
use serde::{Deserialize, Serialize};

/// Number of floats written per secondary camera.
pub const TRANSFORM_BLOCK_LEN: usize = 16;

/// How a [`RigidTransform`] is laid out in a 16-float block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformLayout {
    /// Row-major 4×4 `[R | t; 0 0 0 1]`.
    #[default]
    Homogeneous,
    /// `tx ty tz rx ry rz` (axis-angle), remaining slots zero.
    TranslationAxisAngle,
    /// Block consumed by existing compositor hosts:
    /// `tx ty tz rx R10 R20 R01 R11 R21 R02 R12 R22 0 0 0 0`.
    ///
    /// Slot 3 holds the x component of the axis-angle vector and `R00` is
    /// never written; the rotation entries follow column by column.
    Legacy,
}

impl TransformLayout {
    /// Serialize one transform.
    pub fn write_block(&self, t: &RigidTransform) -> [f32; TRANSFORM_BLOCK_LEN] {
        let r = &t.rotation;
        let tr = &t.translation;
        let mut out = [0.0_f32; TRANSFORM_BLOCK_LEN];
        match self {
            TransformLayout::Homogeneous => {
                let h = t.to_homogeneous();
                for row in 0..4 {
                    for col in 0..4 {
                        out[row * 4 + col] = h[(row, col)] as f32;
                    }
                }
            }
            TransformLayout::TranslationAxisAngle => {
                let rvec = t.axis_angle();
                out[..3].copy_from_slice(&[tr.x as f32, tr.y as f32, tr.z as f32]);
                out[3..6].copy_from_slice(&[rvec.x as f32, rvec.y as f32, rvec.z as f32]);
            }
            TransformLayout::Legacy => {
                let rvec = t.axis_angle();
                out[..3].copy_from_slice(&[tr.x as f32, tr.y as f32, tr.z as f32]);
                out[3] = rvec.x as f32;
                out[4] = r[(1, 0)] as f32;
                out[5] = r[(2, 0)] as f32;
                out[6] = r[(0, 1)] as f32;
                out[7] = r[(1, 1)] as f32;
                out[8] = r[(2, 1)] as f32;
                out[9] = r[(0, 2)] as f32;
                out[10] = r[(1, 2)] as f32;
                out[11] = r[(2, 2)] as f32;
            }
        }
        out
    }

    /// Serialize a list of transforms back to back.
    pub fn write_all(&self, transforms: &[RigidTransform]) -> Vec<f32> {
        transforms
            .iter()
            .flat_map(|t| self.write_block(t))
            .collect()
    }
}
