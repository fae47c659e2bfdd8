use eframe::egui::{Vec2, vec2};

use super::quadtree::Quadtree;

/// Direction used when two points coincide exactly.
pub(super) fn jiggle(first: usize, second: usize) -> Vec2 {
    let angle = ((first as f32) * 0.618_034 + (second as f32) * 0.414_214 + 0.17)
        * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin()) * 1e-3
}

#[derive(Clone, Copy)]
pub(super) struct ChargeParams {
    /// Positive values repel.
    pub(super) strength: f32,
    pub(super) alpha: f32,
    pub(super) theta: f32,
    pub(super) min_distance_sq: f32,
}

/// Accumulates the many-body push on `index` from every other point,
/// approximating distant clusters by their center of mass.
pub(super) fn accumulate_charge(
    tree: &Quadtree,
    cell_index: usize,
    index: usize,
    positions: &[Vec2],
    params: ChargeParams,
    velocity: &mut Vec2,
) {
    let cell = tree.cell(cell_index);
    if cell.mass <= 0.0 {
        return;
    }

    let point = positions[index];
    if cell.is_leaf() {
        for &other in &cell.members {
            if other == index {
                continue;
            }
            let mut delta = point - positions[other];
            if delta.length_sq() == 0.0 {
                delta = jiggle(index, other);
            }
            let distance_sq = delta.length_sq().max(params.min_distance_sq);
            *velocity += delta * (params.strength * params.alpha / distance_sq);
        }
        return;
    }

    let delta = point - cell.center_of_mass;
    let distance_sq = delta.length_sq().max(params.min_distance_sq);
    let side = cell.bounds.side_length();
    let far_enough = !cell.bounds.contains(point) && side * side < params.theta.powi(2) * distance_sq;

    if far_enough {
        *velocity += delta * (params.strength * cell.mass * params.alpha / distance_sq);
        return;
    }

    for child in tree.children(cell_index) {
        accumulate_charge(tree, child, index, positions, params, velocity);
    }
}

#[derive(Clone, Copy)]
pub(super) struct CollisionParams {
    pub(super) strength: f32,
    pub(super) reach_sq: f32,
}

/// Resolves overlaps between every pair of circles whose cells are within
/// reach of each other. Larger circles move less.
pub(super) fn accumulate_collisions(
    tree: &Quadtree,
    first: usize,
    second: usize,
    positions: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    deltas: &mut [Vec2],
) {
    let cell_a = tree.cell(first);
    let cell_b = tree.cell(second);
    if cell_a.bounds.gap_sq(cell_b.bounds) > params.reach_sq {
        return;
    }

    if cell_a.is_leaf() && cell_b.is_leaf() {
        if first == second {
            let members = &cell_a.members;
            for (offset, &from) in members.iter().enumerate() {
                for &to in &members[offset + 1..] {
                    separate(from, to, positions, radii, params.strength, deltas);
                }
            }
        } else {
            for &from in &cell_a.members {
                for &to in &cell_b.members {
                    separate(from, to, positions, radii, params.strength, deltas);
                }
            }
        }
        return;
    }

    if first == second {
        let children = tree.children(first).collect::<Vec<_>>();
        for (offset, &child) in children.iter().enumerate() {
            accumulate_collisions(tree, child, child, positions, radii, params, deltas);
            for &other in &children[offset + 1..] {
                accumulate_collisions(tree, child, other, positions, radii, params, deltas);
            }
        }
        return;
    }

    let split_first = !cell_a.is_leaf()
        && (cell_b.is_leaf() || cell_a.bounds.half_extent >= cell_b.bounds.half_extent);
    if split_first {
        for child in tree.children(first) {
            accumulate_collisions(tree, child, second, positions, radii, params, deltas);
        }
    } else {
        for child in tree.children(second) {
            accumulate_collisions(tree, first, child, positions, radii, params, deltas);
        }
    }
}

fn separate(
    from: usize,
    to: usize,
    positions: &[Vec2],
    radii: &[f32],
    strength: f32,
    deltas: &mut [Vec2],
) {
    let reach = radii[from] + radii[to];
    let mut delta = positions[from] - positions[to];
    let mut distance_sq = delta.length_sq();
    if distance_sq >= reach * reach {
        return;
    }

    if distance_sq == 0.0 {
        delta = jiggle(from, to);
        distance_sq = delta.length_sq();
    }

    let distance = distance_sq.sqrt();
    let push = delta * ((reach - distance) / distance * strength);
    let from_sq = radii[from] * radii[from];
    let to_sq = radii[to] * radii[to];
    let share = if from_sq + to_sq > 0.0 {
        to_sq / (from_sq + to_sq)
    } else {
        0.5
    };

    deltas[from] += push * share;
    deltas[to] -= push * (1.0 - share);
}
