//! Unit quaternion summarizing session-wide coherence/orientation.

use serde::{Deserialize, Serialize};

/// Tolerance used for normalization guards and approximate equality.
pub const EPSILON: f64 = 1e-9;

/// Unit quaternion representing an agent's aggregate orientation.
///
/// Always normalized after every learning update. The identity quaternion
/// (1, 0, 0, 0) is the fresh-engine orientation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl PartialEq for Quaternion {
    fn eq(&self, other: &Self) -> bool {
        (self.w - other.w).abs() < EPSILON
            && (self.x - other.x).abs() < EPSILON
            && (self.y - other.y).abs() < EPSILON
            && (self.z - other.z).abs() < EPSILON
    }
}

impl Quaternion {
    /// Create a new quaternion, automatically normalized.
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }.normalize()
    }

    /// Identity quaternion (1, 0, 0, 0).
    pub fn identity() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Normalize to unit length. Returns identity if near-zero magnitude.
    pub fn normalize(self) -> Self {
        let norm = self.norm();
        if norm < EPSILON {
            return Self::identity();
        }
        Self {
            w: self.w / norm,
            x: self.x / norm,
            y: self.y / norm,
            z: self.z / norm,
        }
    }

    /// Euclidean norm of the four components.
    pub fn norm(self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// 4D dot product.
    pub fn dot(self, other: Self) -> f64 {
        self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Alignment between two orientations in [0, 1].
    ///
    /// Uses abs(dot) so that q and -q count as fully aligned.
    pub fn alignment(self, other: Self) -> f64 {
        self.dot(other).abs().clamp(0.0, 1.0)
    }

    /// Component-wise addition of a delta followed by renormalization.
    pub fn nudged(self, dw: f64, dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            w: self.w + dw,
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
        .normalize()
    }

    /// Convert to [w, x, y, z] array for fingerprinting.
    pub fn to_array(self) -> [f64; 4] {
        [self.w, self.x, self.y, self.z]
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_unit(q: Quaternion) {
        assert!(
            (q.norm() - 1.0).abs() < 1e-10,
            "quaternion not unit: norm = {}",
            q.norm()
        );
    }

    #[test]
    fn test_new_normalizes() {
        let q = Quaternion::new(2.0, 0.0, 0.0, 0.0);
        assert_unit(q);
        assert!((q.w - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_zero_becomes_identity() {
        let q = Quaternion::new(0.0, 0.0, 0.0, 0.0);
        assert_eq!(q, Quaternion::identity());
    }

    #[test]
    fn test_nudged_stays_unit() {
        let mut q = Quaternion::identity();
        for i in 0..50 {
            q = q.nudged(0.01 * i as f64, -0.02, 0.005, 0.03);
            assert_unit(q);
        }
    }

    #[test]
    fn test_alignment_identity() {
        let q = Quaternion::identity();
        assert!((q.alignment(q) - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_alignment_antipodal() {
        let q = Quaternion::identity();
        let neg = Quaternion::new(-1.0, 0.0, 0.0, 0.0);
        assert!((q.alignment(neg) - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_alignment_orthogonal() {
        let a = Quaternion::new(1.0, 0.0, 0.0, 0.0);
        let b = Quaternion::new(0.0, 1.0, 0.0, 0.0);
        assert!(a.alignment(b) < EPSILON);
    }
}
