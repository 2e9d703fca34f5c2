use crate::math::Vec3;

/// Axis-aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb3 {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Aabb3 { min, max }
    }

    /// `None` for an empty point set.
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut out = Self::new(*first, *first);
        for p in rest {
            out.expand(*p);
        }
        Some(out)
    }

    pub fn expand(&mut self, p: Vec3) {
        self.min = Vec3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Vec3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    pub fn union(self, other: Self) -> Self {
        let mut out = self;
        out.expand(other.min);
        out.expand(other.max);
        out
    }

    pub fn translated(self, offset: Vec3) -> Self {
        Self::new(self.min + offset, self.max + offset)
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max).scale(0.5)
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f64,
}

impl BoundingSphere {
    /// Centred on the bounding box of `points`, radius reaching the farthest point.
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let center = Aabb3::from_points(points)?.center();
        let radius = points
            .iter()
            .map(|p| p.distance(center))
            .fold(0.0, f64::max);
        Some(Self { center, radius })
    }
}

#[cfg(test)]
mod tests {
    use super::{Aabb3, BoundingSphere};
    use crate::math::Vec3;

    #[test]
    fn box_covers_all_points() {
        let pts = [
            Vec3::new(1.0, -2.0, 0.0),
            Vec3::new(-1.0, 4.0, 3.0),
            Vec3::new(0.0, 0.0, -1.0),
        ];
        let bb = Aabb3::from_points(&pts).expect("non-empty");
        assert_eq!(bb.min, Vec3::new(-1.0, -2.0, -1.0));
        assert_eq!(bb.max, Vec3::new(1.0, 4.0, 3.0));
        assert!(pts.iter().all(|p| bb.contains(*p)));
        assert!(Aabb3::from_points(&[]).is_none());
    }

    #[test]
    fn sphere_reaches_farthest_corner() {
        let pts = [Vec3::new(-1.0, -1.0, 0.0), Vec3::new(1.0, 1.0, 0.0)];
        let s = BoundingSphere::from_points(&pts).expect("non-empty");
        assert_eq!(s.center, Vec3::ZERO);
        assert!((s.radius - 2f64.sqrt()).abs() < 1e-12);
    }
}
