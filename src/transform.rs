//! Conversion between source map space and scene space.
//!
//! Covers the unit scale (legacy maps are in centimetre-ish units, 0.01 on
//! import), the up-axis swap for Y-up scenes, and the angle unit the file's
//! rotations are written in. `to_source_*` is the exact inverse of
//! `to_scene_*` for every configuration; the default configuration is the
//! identity.

use std::f32::consts::FRAC_PI_2;

use glam::{EulerRot, Quat, Vec3};
use serde::Deserialize;

/// Which axis is "up" in the destination scene. The source format is Z-up;
/// a Y-up destination needs the Y/Z swap and a rotation change of basis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpAxis {
    #[default]
    Z,
    Y,
}

/// Angle unit the map file's rotation values are written in. Scene-space
/// rotations are always radians.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleUnit {
    #[default]
    Radians,
    Degrees,
}

/// Pure, stateless converter between the two spaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateTransform {
    pub scale_factor: f32,
    pub up_axis: UpAxis,
    pub angle_unit: AngleUnit,
}

impl Default for CoordinateTransform {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            up_axis: UpAxis::Z,
            angle_unit: AngleUnit::Radians,
        }
    }
}

impl CoordinateTransform {
    pub fn is_identity(&self) -> bool {
        self.scale_factor == 1.0
            && self.up_axis == UpAxis::Z
            && self.angle_unit == AngleUnit::Radians
    }

    /// Change-of-basis rotation taking source axes to scene axes.
    fn basis_change(&self) -> Quat {
        match self.up_axis {
            UpAxis::Z => Quat::IDENTITY,
            UpAxis::Y => Quat::from_rotation_x(FRAC_PI_2),
        }
    }

    fn swap_axes(&self, v: Vec3) -> Vec3 {
        match self.up_axis {
            UpAxis::Z => v,
            UpAxis::Y => Vec3::new(v.x, v.z, v.y),
        }
    }

    pub fn to_scene_position(&self, v: Vec3) -> Vec3 {
        self.swap_axes(v * self.scale_factor)
    }

    pub fn to_source_position(&self, v: Vec3) -> Vec3 {
        self.swap_axes(v) / self.scale_factor
    }

    /// Source Euler triple (XYZ order, file angle unit) to scene Euler
    /// triple in radians.
    pub fn to_scene_rotation(&self, euler: Vec3) -> Vec3 {
        let rad = self.to_radians(euler);
        if self.up_axis == UpAxis::Z {
            // No basis change: unit conversion only, exact.
            return rad;
        }
        let rotation = Quat::from_euler(EulerRot::XYZ, rad.x, rad.y, rad.z);
        let basis = self.basis_change();
        let (x, y, z) = (basis * rotation * basis.inverse()).to_euler(EulerRot::XYZ);
        Vec3::new(x, y, z)
    }

    pub fn to_source_rotation(&self, euler: Vec3) -> Vec3 {
        if self.up_axis == UpAxis::Z {
            return self.from_radians(euler);
        }
        let rotation = Quat::from_euler(EulerRot::XYZ, euler.x, euler.y, euler.z);
        let basis = self.basis_change();
        let (x, y, z) = (basis.inverse() * rotation * basis).to_euler(EulerRot::XYZ);
        self.from_radians(Vec3::new(x, y, z))
    }

    pub fn to_scene_scale(&self, v: Vec3) -> Vec3 {
        v * self.scale_factor
    }

    pub fn to_source_scale(&self, v: Vec3) -> Vec3 {
        v / self.scale_factor
    }

    fn to_radians(&self, v: Vec3) -> Vec3 {
        match self.angle_unit {
            AngleUnit::Radians => v,
            AngleUnit::Degrees => Vec3::new(v.x.to_radians(), v.y.to_radians(), v.z.to_radians()),
        }
    }

    fn from_radians(&self, v: Vec3) -> Vec3 {
        match self.angle_unit {
            AngleUnit::Radians => v,
            AngleUnit::Degrees => Vec3::new(v.x.to_degrees(), v.y.to_degrees(), v.z.to_degrees()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn legacy_import() -> CoordinateTransform {
        // The defaults the original tooling shipped with: 0.01 unit scale,
        // rotations in radians, Z-up destination.
        CoordinateTransform {
            scale_factor: 0.01,
            up_axis: UpAxis::Z,
            angle_unit: AngleUnit::Radians,
        }
    }

    #[test]
    fn test_identity_is_noop() {
        let t = CoordinateTransform::default();
        assert!(t.is_identity());
        let v = Vec3::new(1.5, -2.5, 3.0);
        assert_eq!(t.to_scene_position(v), v);
        assert_eq!(t.to_scene_rotation(v), v);
        assert_eq!(t.to_scene_scale(v), v);
    }

    #[test]
    fn test_position_round_trip() {
        let configs = [
            CoordinateTransform::default(),
            legacy_import(),
            CoordinateTransform {
                scale_factor: 0.01,
                up_axis: UpAxis::Y,
                angle_unit: AngleUnit::Degrees,
            },
        ];
        let v = Vec3::new(1234.5, -678.9, 42.0);
        for t in configs {
            assert!(
                t.to_source_position(t.to_scene_position(v)).abs_diff_eq(v, EPS),
                "round trip failed for {t:?}"
            );
        }
    }

    #[test]
    fn test_rotation_round_trip() {
        let configs = [
            CoordinateTransform::default(),
            legacy_import(),
            CoordinateTransform {
                scale_factor: 1.0,
                up_axis: UpAxis::Y,
                angle_unit: AngleUnit::Radians,
            },
            CoordinateTransform {
                scale_factor: 0.01,
                up_axis: UpAxis::Y,
                angle_unit: AngleUnit::Degrees,
            },
        ];
        let rotations = [
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 0.5),
            Vec3::new(0.0, 0.0, -1.25),
            Vec3::new(0.1, -0.2, 0.3),
        ];
        for t in configs {
            for r in rotations {
                // Degree-unit configs interpret the triple as degrees;
                // values stay small enough to avoid Euler wrap-around.
                let back = t.to_source_rotation(t.to_scene_rotation(r));
                assert!(
                    back.abs_diff_eq(r, EPS),
                    "round trip failed for {t:?} rotation {r:?}: got {back:?}"
                );
            }
        }
    }

    #[test]
    fn test_scale_round_trip() {
        let t = legacy_import();
        let v = Vec3::new(1.0, 2.0, 0.5);
        assert!(t.to_source_scale(t.to_scene_scale(v)).abs_diff_eq(v, EPS));
        assert!(t.to_scene_scale(Vec3::ONE).abs_diff_eq(Vec3::splat(0.01), EPS));
    }

    #[test]
    fn test_y_up_swaps_height_axis() {
        let t = CoordinateTransform {
            scale_factor: 1.0,
            up_axis: UpAxis::Y,
            angle_unit: AngleUnit::Radians,
        };
        // Source is Z-up: a prop 5 units off the ground lands on the scene
        // Y axis.
        assert_eq!(
            t.to_scene_position(Vec3::new(1.0, 2.0, 5.0)),
            Vec3::new(1.0, 5.0, 2.0)
        );
    }

    #[test]
    fn test_z_spin_becomes_y_spin_in_y_up_scene() {
        let t = CoordinateTransform {
            scale_factor: 1.0,
            up_axis: UpAxis::Y,
            angle_unit: AngleUnit::Radians,
        };
        let scene = t.to_scene_rotation(Vec3::new(0.0, 0.0, 0.5));
        assert!(scene.x.abs() < EPS);
        assert!(scene.z.abs() < EPS);
        assert!((scene.y.abs() - 0.5).abs() < EPS);
    }

    #[test]
    fn test_degrees_are_converted() {
        let t = CoordinateTransform {
            scale_factor: 1.0,
            up_axis: UpAxis::Z,
            angle_unit: AngleUnit::Degrees,
        };
        let scene = t.to_scene_rotation(Vec3::new(0.0, 0.0, 90.0));
        assert!((scene.z - FRAC_PI_2).abs() < EPS);
        let source = t.to_source_rotation(scene);
        assert!((source.z - 90.0).abs() < 1e-3);
    }
}
