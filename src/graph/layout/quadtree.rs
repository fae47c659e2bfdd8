use eframe::egui::{Vec2, vec2};

const LEAF_CAPACITY: usize = 4;
const MAX_DEPTH: usize = 12;

#[derive(Clone, Copy, Debug)]
pub(super) struct QuadBounds {
    pub(super) center: Vec2,
    pub(super) half_extent: f32,
}

impl QuadBounds {
    fn enclosing(points: &[Vec2]) -> Option<Self> {
        let mut min = vec2(f32::INFINITY, f32::INFINITY);
        let mut max = vec2(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for point in points {
            min = min.min(*point);
            max = max.max(*point);
        }

        if !(min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite()) {
            return None;
        }

        let span = (max - min).max_elem().max(1.0);
        Some(Self {
            center: (min + max) * 0.5,
            half_extent: span * 0.5 + 1.0,
        })
    }

    pub(super) fn contains(self, point: Vec2) -> bool {
        (point.x - self.center.x).abs() <= self.half_extent
            && (point.y - self.center.y).abs() <= self.half_extent
    }

    pub(super) fn side_length(self) -> f32 {
        self.half_extent * 2.0
    }

    /// Squared gap between two boxes, zero when they overlap.
    pub(super) fn gap_sq(self, other: Self) -> f32 {
        let reach = self.half_extent + other.half_extent;
        let dx = ((self.center.x - other.center.x).abs() - reach).max(0.0);
        let dy = ((self.center.y - other.center.y).abs() - reach).max(0.0);
        dx * dx + dy * dy
    }

    fn quadrant(self, point: Vec2) -> usize {
        usize::from(point.x >= self.center.x) | (usize::from(point.y >= self.center.y) << 1)
    }

    fn child(self, quadrant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let sign_x = if quadrant & 1 == 0 { -1.0 } else { 1.0 };
        let sign_y = if quadrant & 2 == 0 { -1.0 } else { 1.0 };
        Self {
            center: self.center + vec2(sign_x * quarter, sign_y * quarter),
            half_extent: quarter,
        }
    }
}

pub(super) struct Cell {
    pub(super) bounds: QuadBounds,
    pub(super) center_of_mass: Vec2,
    pub(super) mass: f32,
    /// Point indices, only populated on leaves.
    pub(super) members: Vec<usize>,
    children: [Option<usize>; 4],
}

impl Cell {
    pub(super) fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }
}

/// Flat quadtree over a point set; cells live in one arena and refer to
/// their children by index.
pub(super) struct Quadtree {
    cells: Vec<Cell>,
}

impl Quadtree {
    pub(super) const ROOT: usize = 0;

    pub(super) fn build(points: &[Vec2]) -> Option<Self> {
        let bounds = QuadBounds::enclosing(points)?;
        let mut tree = Self {
            cells: Vec::with_capacity(points.len().max(1) * 2),
        };
        tree.insert_cell(bounds, (0..points.len()).collect(), points, 0);
        Some(tree)
    }

    fn insert_cell(
        &mut self,
        bounds: QuadBounds,
        members: Vec<usize>,
        points: &[Vec2],
        depth: usize,
    ) -> usize {
        let mass = members.len() as f32;
        let mut center_of_mass = Vec2::ZERO;
        for &index in &members {
            center_of_mass += points[index];
        }
        if mass > 0.0 {
            center_of_mass /= mass;
        }

        let slot = self.cells.len();
        self.cells.push(Cell {
            bounds,
            center_of_mass,
            mass,
            members: Vec::new(),
            children: [None; 4],
        });

        if depth >= MAX_DEPTH || members.len() <= LEAF_CAPACITY {
            self.cells[slot].members = members;
            return slot;
        }

        let mut buckets: [Vec<usize>; 4] = Default::default();
        for index in members.iter().copied() {
            buckets[bounds.quadrant(points[index])].push(index);
        }

        if buckets.iter().filter(|bucket| !bucket.is_empty()).count() <= 1 {
            self.cells[slot].members = members;
            return slot;
        }

        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }
            let child = self.insert_cell(bounds.child(quadrant), bucket, points, depth + 1);
            self.cells[slot].children[quadrant] = Some(child);
        }
        slot
    }

    pub(super) fn cell(&self, index: usize) -> &Cell {
        &self.cells[index]
    }

    pub(super) fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.cells[index].children.iter().flatten().copied()
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.cells.len()
    }
}
