/// Axis-aligned 2D box in screen pixels.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    pub fn from_origin_size(origin: [f64; 2], size: [f64; 2]) -> Self {
        Aabb2::new(origin, [origin[0] + size[0], origin[1] + size[1]])
    }

    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f64 {
        self.max[1] - self.min[1]
    }

    /// True when `other` lies entirely inside `self` (edges inclusive).
    pub fn contains_box(&self, other: &Aabb2) -> bool {
        other.min[0] >= self.min[0]
            && other.min[1] >= self.min[1]
            && other.max[0] <= self.max[0]
            && other.max[1] <= self.max[1]
    }
}

#[cfg(test)]
mod tests {
    use super::Aabb2;

    #[test]
    fn contains_box_is_edge_inclusive() {
        let outer = Aabb2::new([0.0, 0.0], [100.0, 50.0]);
        let inner = Aabb2::from_origin_size([10.0, 10.0], [90.0, 40.0]);
        assert!(outer.contains_box(&inner));
        let spill = Aabb2::from_origin_size([11.0, 10.0], [90.0, 40.0]);
        assert!(!outer.contains_box(&spill));
        assert_eq!(inner.width(), 90.0);
        assert_eq!(inner.height(), 40.0);
    }
}
