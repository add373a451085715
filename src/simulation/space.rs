//! Contact geometry between particles and walls.

use crate::simulation::states::{NVec2, Particle, Wall};

/// Returned by [`wall_superposition`] when the particle does not touch the segment
pub const NO_WALL_CONTACT: f64 = -1.0;

/// Normal and tangential unit vectors of a contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Versors {
    pub normal: NVec2,
    pub tangent: NVec2,
}

/// Unit vector along `v`, `None` for the zero vector
pub fn to_unit(v: NVec2) -> Option<NVec2> {
    let norm = v.norm();
    if norm == 0.0 {
        None
    } else {
        Some(v / norm)
    }
}

/// Centre distance minus both radii, negative when overlapping
pub fn distance_between(a: &Particle, b: &Particle) -> f64 {
    (a.position - b.position).norm() - a.radius - b.radius
}

pub fn superposition(a: &Particle, b: &Particle) -> f64 {
    -distance_between(a, b)
}

/// Normal pointing from `i` to `j` and the normal rotated by +90°
pub fn normal_and_tangential(i: NVec2, j: NVec2) -> Option<Versors> {
    let normal = to_unit(j - i)?;
    Some(Versors {
        normal,
        tangent: NVec2::new(-normal.y, normal.x),
    })
}

/// Picks the wall normal facing the particle and keeps the pair right-handed
pub fn wall_versors(p: &Particle, w: &Wall) -> Versors {
    let left = w.left_normal();
    if (p.position - w.from).dot(&left) < 0.0 {
        Versors {
            normal: left,
            tangent: -w.tangent(),
        }
    } else {
        Versors {
            normal: w.right_normal(),
            tangent: w.tangent(),
        }
    }
}

/// Overlap of a particle with a finite wall segment.
///
/// The particle has to project inside the segment; otherwise, and when the
/// perpendicular gap is positive, [`NO_WALL_CONTACT`] is returned.
pub fn wall_superposition(p: &Particle, w: &Wall) -> f64 {
    let versors = wall_versors(p, w);
    let c1p = p.position - w.from;

    let distance = c1p.dot(&versors.normal).abs() - p.radius;
    let along = c1p.dot(&w.tangent());

    if distance <= 0.0 && along > 0.0 && c1p.dot(&versors.tangent).abs() < w.length() {
        -distance
    } else {
        NO_WALL_CONTACT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::states::{ParticleId, ParticleKind};

    fn particle(x: f64, y: f64, r: f64) -> Particle {
        Particle::new(ParticleId(0), ParticleKind::Ordinary, NVec2::new(x, y), r, 1.0)
    }

    #[test]
    fn versors_are_orthonormal() {
        let v = normal_and_tangential(NVec2::new(1.0, 1.0), NVec2::new(4.0, 5.0)).unwrap();
        assert!((v.normal - NVec2::new(0.6, 0.8)).norm() < 1e-12);
        assert!(v.normal.dot(&v.tangent).abs() < 1e-12);
        assert!((v.tangent.norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn coincident_points_have_no_versors() {
        let p = NVec2::new(2.0, 3.0);
        assert!(normal_and_tangential(p, p).is_none());
    }

    #[test]
    fn superposition_is_negated_distance() {
        let a = particle(0.0, 0.0, 0.5);
        let b = particle(0.8, 0.0, 0.5);
        assert!((distance_between(&a, &b) + 0.2).abs() < 1e-12);
        assert!((superposition(&a, &b) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn wall_normal_faces_the_particle() {
        let floor = Wall::new(NVec2::new(0.0, 0.0), NVec2::new(10.0, 0.0)).unwrap();
        let above = particle(5.0, 1.0, 0.5);
        let below = particle(5.0, -1.0, 0.5);

        let up = wall_versors(&above, &floor);
        let down = wall_versors(&below, &floor);

        assert_eq!(up.normal, NVec2::new(0.0, -1.0));
        assert_eq!(down.normal, NVec2::new(0.0, 1.0));
        assert_eq!(up.tangent, NVec2::new(1.0, 0.0));
        assert_eq!(down.tangent, NVec2::new(-1.0, 0.0));
    }

    #[test]
    fn wall_overlap_inside_segment() {
        let floor = Wall::new(NVec2::new(0.0, 0.0), NVec2::new(10.0, 0.0)).unwrap();
        let p = particle(5.0, 0.4, 0.5);
        assert!((wall_superposition(&p, &floor) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn wall_overlap_outside_segment_is_sentinel() {
        let floor = Wall::new(NVec2::new(0.0, 0.0), NVec2::new(10.0, 0.0)).unwrap();
        assert_eq!(wall_superposition(&particle(-0.2, 0.1, 0.5), &floor), NO_WALL_CONTACT);
        assert_eq!(wall_superposition(&particle(10.2, 0.1, 0.5), &floor), NO_WALL_CONTACT);
        assert_eq!(wall_superposition(&particle(5.0, 2.0, 0.5), &floor), NO_WALL_CONTACT);
    }
}
