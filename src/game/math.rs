//! Vector helpers and world-cell coordinates

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Integer world-cell coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl CellPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn offset(self, [dx, dy, dz]: [i32; 3]) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Cell struck by an impact: horizontal axes round, vertical floors
    pub fn from_contact(point: Vec3) -> Self {
        Self::new(
            point.x.round() as i32,
            point.y.floor() as i32,
            point.z.round() as i32,
        )
    }

    /// Cell directly beneath an actor standing at `position`
    pub fn beneath(position: Vec3) -> Self {
        Self::new(
            position.x.floor() as i32,
            (position.y - 1.0).floor() as i32,
            position.z.floor() as i32,
        )
    }

    /// Cell containing a world point
    pub fn containing(point: Vec3) -> Self {
        Self::new(
            point.x.floor() as i32,
            point.y.floor() as i32,
            point.z.floor() as i32,
        )
    }
}

/// Horizontal facing direction for a yaw angle (radians, 0 looks down -Z)
pub fn facing_from_yaw(yaw: f32) -> Vec3 {
    Vec3::new(-yaw.sin(), 0.0, -yaw.cos())
}

/// Aim direction from facing yaw composed with camera pitch.
///
/// The horizontal facing is computed first, the vertical component is set from
/// the pitch, the horizontal components are scaled by `cos(pitch)`, and only
/// then is the result renormalized.
pub fn aim_direction(yaw: f32, pitch: f32) -> Vec3 {
    let facing = facing_from_yaw(yaw);
    let cos_p = pitch.cos();
    Vec3::new(facing.x * cos_p, pitch.sin(), facing.z * cos_p).normalize_or_zero()
}

/// Rotate a direction around the vertical axis
pub fn rotate_about_y(direction: Vec3, degrees: f32) -> Vec3 {
    let angle = degrees.to_radians();
    let (sin, cos) = angle.sin_cos();
    Vec3::new(
        direction.x * cos - direction.z * sin,
        direction.y,
        direction.x * sin + direction.z * cos,
    )
}

/// Spread a spawn point by up to `radius` on both horizontal axes
pub fn jitter_horizontal<R: rand::Rng + ?Sized>(rng: &mut R, anchor: Vec3, radius: f32) -> Vec3 {
    if radius <= 0.0 {
        return anchor;
    }
    Vec3::new(
        anchor.x + rng.gen_range(-radius..=radius),
        anchor.y,
        anchor.z + rng.gen_range(-radius..=radius),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn aim_direction_is_unit_length() {
        for (yaw, pitch) in [(0.0, 0.0), (1.2, 0.4), (-2.5, -0.9), (3.0, 1.2)] {
            let dir = aim_direction(yaw, pitch);
            assert!((dir.length() - 1.0).abs() < 1e-5, "yaw {yaw} pitch {pitch}");
        }
    }

    #[test]
    fn aim_direction_keeps_pitch_as_vertical_component() {
        let dir = aim_direction(0.0, 0.5);
        assert!((dir.y - 0.5_f32.sin()).abs() < 1e-5);
        assert!(dir.z < 0.0);
        assert!(dir.x.abs() < 1e-5);
    }

    #[test]
    fn contact_cell_rounds_horizontally_and_floors_vertically() {
        let cell = CellPos::from_contact(Vec3::new(2.6, 3.9, -1.4));
        assert_eq!(cell, CellPos::new(3, 3, -1));
    }

    #[test]
    fn rotation_preserves_vertical_and_length() {
        let dir = Vec3::new(0.0, 0.3, -1.0).normalize();
        let rotated = rotate_about_y(dir, 15.0);
        assert!((rotated.y - dir.y).abs() < 1e-6);
        assert!((rotated.length() - dir.length()).abs() < 1e-5);
        assert!(rotated.x != dir.x);
    }

    #[test]
    fn jitter_stays_within_one_unit() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let anchor = Vec3::new(10.0, 15.0, 10.0);
        for _ in 0..100 {
            let p = jitter_horizontal(&mut rng, anchor, 1.0);
            assert!((p.x - anchor.x).abs() <= 1.0);
            assert!((p.z - anchor.z).abs() <= 1.0);
            assert_eq!(p.y, anchor.y);
        }
    }
}
