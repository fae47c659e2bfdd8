//! Force-directed layout.
//!
//! [`LayoutEngine`] is the seam between physics and rendering: the
//! orchestrator seeds it, steps it once per frame while it is unsettled,
//! pins dragged nodes and reads positions back. [`ForceLayout`] is the
//! built-in alpha-decay integrator.

mod forces;
mod quadtree;

use eframe::egui::{Vec2, vec2};
use rand::Rng;

use forces::{ChargeParams, CollisionParams, accumulate_charge, accumulate_collisions, jiggle};
use quadtree::Quadtree;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutConfig {
    pub link_base_distance: f32,
    pub link_distance_spread: f32,
    pub link_strength_scale: f32,
    /// Lowest link stiffness. Without it a near-zero-strength link runs out
    /// of energy long before it reaches its rest distance.
    pub link_strength_floor: f32,
    /// Magnitude of the pairwise push; larger spreads the graph out.
    pub charge_strength: f32,
    pub charge_theta: f32,
    pub collision_padding: f32,
    pub collision_strength: f32,
    pub axis_strength: f32,
    pub centering_strength: f32,
    pub velocity_decay: f32,
    pub alpha_decay: f32,
    pub alpha_min: f32,
    pub drag_alpha_target: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            link_base_distance: 70.0,
            link_distance_spread: 60.0,
            link_strength_scale: 0.6,
            link_strength_floor: 0.15,
            charge_strength: 200.0,
            charge_theta: 0.9,
            collision_padding: 10.0,
            collision_strength: 0.7,
            axis_strength: 0.04,
            centering_strength: 1.0,
            velocity_decay: 0.4,
            alpha_decay: 0.03,
            alpha_min: 0.001,
            drag_alpha_target: 0.3,
        }
    }
}

impl LayoutConfig {
    /// Stronger relationships sit closer together.
    pub fn link_distance(&self, strength: f32) -> f32 {
        self.link_base_distance + (1.0 - strength.clamp(0.0, 1.0)) * self.link_distance_spread
    }

    pub fn link_stiffness(&self, strength: f32) -> f32 {
        (strength.clamp(0.0, 1.0) * self.link_strength_scale).max(self.link_strength_floor)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutNode {
    pub position: Vec2,
    /// Rendered radius; collision padding is added by the engine.
    pub radius: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutLink {
    pub source: usize,
    pub target: usize,
    pub strength: f32,
}

pub trait LayoutEngine {
    /// Replaces the node and link set and restarts the solver at full energy.
    fn seed(&mut self, nodes: &[LayoutNode], links: &[LayoutLink]);
    /// Advances one tick. Returns `false` once the solver has come to rest.
    fn step(&mut self) -> bool;
    fn pin(&mut self, index: usize, position: Vec2);
    fn unpin(&mut self, index: usize);
    /// Raises the energy to the drag target and keeps it there (e.g. while a
    /// node is dragged) until [`Self::cool`].
    fn reheat(&mut self);
    fn cool(&mut self);
    /// Raises the energy to at least `alpha` and resumes stepping.
    fn restart(&mut self, alpha: f32);
    fn positions(&self) -> &[Vec2];
    /// Applies new tuning and wakes the solver if anything changed.
    fn set_config(&mut self, config: LayoutConfig);
}

/// Position for a node entering the layout: its last rendered coordinate if
/// known, otherwise a random spot near the canvas center.
pub fn seed_position(previous: Option<Vec2>, center: Vec2, rng: &mut impl Rng) -> Vec2 {
    previous.unwrap_or_else(|| {
        center + vec2(rng.gen_range(-100.0..100.0), rng.gen_range(-100.0..100.0))
    })
}

#[derive(Clone, Copy, Debug)]
struct LinkParams {
    source: usize,
    target: usize,
    distance: f32,
    stiffness: f32,
    bias: f32,
}

pub struct ForceLayout {
    config: LayoutConfig,
    center: Vec2,
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    pins: Vec<Option<Vec2>>,
    radii: Vec<f32>,
    links: Vec<LayoutLink>,
    link_params: Vec<LinkParams>,
    alpha: f32,
    alpha_target: f32,
    running: bool,
    predicted: Vec<Vec2>,
    collision_deltas: Vec<Vec2>,
}

impl ForceLayout {
    pub fn new(config: LayoutConfig, center: Vec2) -> Self {
        Self {
            config,
            center,
            positions: Vec::new(),
            velocities: Vec::new(),
            pins: Vec::new(),
            radii: Vec::new(),
            links: Vec::new(),
            link_params: Vec::new(),
            alpha: 0.0,
            alpha_target: 0.0,
            running: false,
            predicted: Vec::new(),
            collision_deltas: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    #[cfg(test)]
    pub fn is_pinned(&self, index: usize) -> bool {
        self.pins.get(index).is_some_and(Option::is_some)
    }

    #[cfg(test)]
    pub fn is_settled(&self) -> bool {
        !self.running
    }

    fn rebuild_link_params(&mut self) {
        let mut degree = vec![0usize; self.positions.len()];
        for link in &self.links {
            degree[link.source] += 1;
            degree[link.target] += 1;
        }

        self.link_params = self
            .links
            .iter()
            .map(|link| {
                let source_degree = degree[link.source] as f32;
                let target_degree = degree[link.target] as f32;
                LinkParams {
                    source: link.source,
                    target: link.target,
                    distance: self.config.link_distance(link.strength),
                    stiffness: self.config.link_stiffness(link.strength),
                    bias: source_degree / (source_degree + target_degree),
                }
            })
            .collect();
    }

    fn apply_centering(&mut self) {
        let count = self.positions.len() as f32;
        let centroid = self.positions.iter().fold(Vec2::ZERO, |sum, p| sum + *p) / count;
        let shift = (self.center - centroid) * self.config.centering_strength;
        if shift.length_sq() > 0.0 {
            for position in &mut self.positions {
                *position += shift;
            }
        }
    }

    fn apply_links(&mut self, alpha: f32) {
        for link in &self.link_params {
            let (source, target) = (link.source, link.target);
            let mut delta = (self.positions[target] + self.velocities[target])
                - (self.positions[source] + self.velocities[source]);
            if delta.length_sq() == 0.0 {
                delta = jiggle(source, target);
            }

            let distance = delta.length();
            let correction = delta * ((distance - link.distance) / distance * alpha * link.stiffness);
            self.velocities[target] -= correction * link.bias;
            self.velocities[source] += correction * (1.0 - link.bias);
        }
    }

    fn apply_charge(&mut self, alpha: f32) {
        if self.config.charge_strength == 0.0 {
            return;
        }
        let Some(tree) = Quadtree::build(&self.positions) else {
            return;
        };

        let params = ChargeParams {
            strength: self.config.charge_strength,
            alpha,
            theta: self.config.charge_theta,
            min_distance_sq: 1.0,
        };
        for (index, velocity) in self.velocities.iter_mut().enumerate() {
            accumulate_charge(&tree, Quadtree::ROOT, index, &self.positions, params, velocity);
        }
    }

    fn apply_collisions(&mut self) {
        self.predicted.clear();
        self.predicted.extend(
            self.positions
                .iter()
                .zip(&self.velocities)
                .map(|(position, velocity)| *position + *velocity),
        );
        let Some(tree) = Quadtree::build(&self.predicted) else {
            return;
        };

        let max_radius = self.radii.iter().copied().fold(0.0_f32, f32::max);
        let reach = max_radius * 2.0;
        self.collision_deltas.clear();
        self.collision_deltas.resize(self.positions.len(), Vec2::ZERO);

        accumulate_collisions(
            &tree,
            Quadtree::ROOT,
            Quadtree::ROOT,
            &self.predicted,
            &self.radii,
            CollisionParams {
                strength: self.config.collision_strength,
                reach_sq: reach * reach,
            },
            &mut self.collision_deltas,
        );

        for (velocity, delta) in self.velocities.iter_mut().zip(&self.collision_deltas) {
            *velocity += *delta;
        }
    }

    fn apply_axis_pull(&mut self, alpha: f32) {
        let pull = self.config.axis_strength * alpha;
        if pull == 0.0 {
            return;
        }
        for (position, velocity) in self.positions.iter().zip(self.velocities.iter_mut()) {
            velocity.x += (self.center.x - position.x) * pull;
            velocity.y += (self.center.y - position.y) * pull;
        }
    }

    fn integrate(&mut self) {
        let retain = 1.0 - self.config.velocity_decay;
        for ((position, velocity), pin) in self
            .positions
            .iter_mut()
            .zip(self.velocities.iter_mut())
            .zip(&self.pins)
        {
            if let Some(pinned) = pin {
                *position = *pinned;
                *velocity = Vec2::ZERO;
            } else {
                *velocity *= retain;
                *position += *velocity;
            }
        }
    }

    fn tick(&mut self) {
        self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
        let alpha = self.alpha;

        self.apply_centering();
        self.apply_links(alpha);
        self.apply_charge(alpha);
        self.apply_collisions();
        self.apply_axis_pull(alpha);
        self.integrate();
    }
}

impl LayoutEngine for ForceLayout {
    fn seed(&mut self, nodes: &[LayoutNode], links: &[LayoutLink]) {
        self.positions = nodes.iter().map(|node| node.position).collect();
        self.velocities = vec![Vec2::ZERO; nodes.len()];
        self.pins = vec![None; nodes.len()];
        self.radii = nodes
            .iter()
            .map(|node| node.radius + self.config.collision_padding)
            .collect();
        self.links = links
            .iter()
            .copied()
            .filter(|link| {
                link.source < nodes.len() && link.target < nodes.len() && link.source != link.target
            })
            .collect();
        self.rebuild_link_params();

        self.alpha = 1.0;
        self.alpha_target = 0.0;
        self.running = !nodes.is_empty();
    }

    fn step(&mut self) -> bool {
        if !self.running {
            return false;
        }

        self.tick();
        if self.alpha < self.config.alpha_min {
            self.running = false;
        }
        self.running
    }

    fn pin(&mut self, index: usize, position: Vec2) {
        if let Some(pin) = self.pins.get_mut(index) {
            *pin = Some(position);
            self.positions[index] = position;
            self.velocities[index] = Vec2::ZERO;
        }
    }

    fn unpin(&mut self, index: usize) {
        if let Some(pin) = self.pins.get_mut(index) {
            *pin = None;
        }
    }

    fn reheat(&mut self) {
        self.alpha_target = self.config.drag_alpha_target;
        self.restart(self.config.drag_alpha_target);
    }

    fn cool(&mut self) {
        self.alpha_target = 0.0;
    }

    fn restart(&mut self, alpha: f32) {
        self.alpha = self.alpha.max(alpha);
        self.running = !self.positions.is_empty();
    }

    fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    fn set_config(&mut self, config: LayoutConfig) {
        if self.config == config {
            return;
        }
        let padding_delta = config.collision_padding - self.config.collision_padding;
        for radius in &mut self.radii {
            *radius += padding_delta;
        }
        self.config = config;
        self.rebuild_link_params();
        self.restart(config.drag_alpha_target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const CENTER: Vec2 = vec2(400.0, 300.0);

    fn links_only() -> LayoutConfig {
        LayoutConfig {
            charge_strength: 0.0,
            axis_strength: 0.0,
            ..LayoutConfig::default()
        }
    }

    fn pair(strength: f32, config: LayoutConfig) -> ForceLayout {
        let mut layout = ForceLayout::new(config, CENTER);
        layout.seed(
            &[
                LayoutNode {
                    position: CENTER - vec2(20.0, 0.0),
                    radius: 7.0,
                },
                LayoutNode {
                    position: CENTER + vec2(20.0, 3.0),
                    radius: 7.0,
                },
            ],
            &[LayoutLink {
                source: 0,
                target: 1,
                strength,
            }],
        );
        layout
    }

    fn settle(layout: &mut ForceLayout) -> usize {
        let mut ticks = 0;
        while layout.step() {
            ticks += 1;
            assert!(ticks < 20_000, "layout never settled");
        }
        ticks
    }

    fn separation(layout: &ForceLayout) -> f32 {
        (layout.positions()[0] - layout.positions()[1]).length()
    }

    #[test]
    fn strong_link_settles_at_minimum_distance() {
        let config = links_only();
        let mut layout = pair(1.0, config);
        settle(&mut layout);
        assert!((separation(&layout) - config.link_base_distance).abs() < 0.5);
    }

    #[test]
    fn weak_link_settles_near_maximum_distance() {
        let config = links_only();
        let mut layout = pair(0.05, config);
        settle(&mut layout);

        let distance = separation(&layout);
        let maximum = config.link_base_distance + config.link_distance_spread;
        assert!((distance - config.link_distance(0.05)).abs() < 1.0);
        assert!(maximum - distance < 4.0);
    }

    #[test]
    fn centering_keeps_centroid_on_canvas_center() {
        let mut layout = pair(1.0, LayoutConfig::default());
        settle(&mut layout);
        let centroid = (layout.positions()[0] + layout.positions()[1]) * 0.5;
        assert!((centroid - CENTER).length() < 2.0);
    }

    #[test]
    fn energy_decays_until_settled() {
        let mut layout = pair(0.5, LayoutConfig::default());
        let mut last_alpha = layout.alpha();
        assert!(layout.step());
        assert!(layout.alpha() < last_alpha);
        last_alpha = layout.alpha();
        settle(&mut layout);
        assert!(layout.alpha() < last_alpha);
        assert!(layout.is_settled());
        assert!(!layout.step());
    }

    #[test]
    fn pinned_node_holds_exact_position_while_reheated() {
        let mut layout = pair(1.0, LayoutConfig::default());
        settle(&mut layout);

        let target = vec2(120.0, 80.0);
        layout.pin(0, target);
        layout.reheat();
        assert!(!layout.is_settled());
        for _ in 0..50 {
            layout.step();
            assert_eq!(layout.positions()[0], target);
        }
        assert!(layout.is_pinned(0));

        layout.unpin(0);
        layout.cool();
        settle(&mut layout);
        assert!(!layout.is_pinned(0));
        assert!(layout.is_settled());
    }

    #[test]
    fn collision_separates_unlinked_neighbours() {
        let config = LayoutConfig {
            charge_strength: 0.0,
            axis_strength: 0.0,
            ..LayoutConfig::default()
        };
        let mut layout = ForceLayout::new(config, CENTER);
        layout.seed(
            &[
                LayoutNode {
                    position: CENTER,
                    radius: 10.0,
                },
                LayoutNode {
                    position: CENTER + vec2(2.0, 1.0),
                    radius: 10.0,
                },
            ],
            &[],
        );
        settle(&mut layout);
        let minimum = 2.0 * (10.0 + config.collision_padding);
        assert!(separation(&layout) > minimum * 0.9);
    }

    #[test]
    fn repulsion_spreads_a_clump() {
        let mut rng = StdRng::seed_from_u64(7);
        let nodes = (0..30)
            .map(|_| LayoutNode {
                position: CENTER + vec2(rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0)),
                radius: 7.0,
            })
            .collect::<Vec<_>>();
        let mut layout = ForceLayout::new(LayoutConfig::default(), CENTER);
        layout.seed(&nodes, &[]);
        settle(&mut layout);

        let positions = layout.positions();
        let mut closest = f32::INFINITY;
        for (index, a) in positions.iter().enumerate() {
            for b in &positions[index + 1..] {
                closest = closest.min((*a - *b).length());
            }
            assert!(a.x.is_finite() && a.y.is_finite());
        }
        assert!(closest > 20.0);
    }

    #[test]
    fn invalid_links_are_ignored() {
        let mut layout = ForceLayout::new(LayoutConfig::default(), CENTER);
        layout.seed(
            &[LayoutNode {
                position: CENTER,
                radius: 7.0,
            }],
            &[
                LayoutLink {
                    source: 0,
                    target: 5,
                    strength: 1.0,
                },
                LayoutLink {
                    source: 0,
                    target: 0,
                    strength: 1.0,
                },
            ],
        );
        settle(&mut layout);
        assert!((layout.positions()[0] - CENTER).length() < 1e-3);
    }

    #[test]
    fn weak_links_keep_some_stiffness() {
        let config = LayoutConfig::default();
        assert_eq!(config.link_stiffness(1.0), config.link_strength_scale);
        assert_eq!(config.link_stiffness(0.0), config.link_strength_floor);
        assert!(config.link_stiffness(0.8) > config.link_stiffness(0.5));
    }

    #[test]
    fn reheat_restarts_a_settled_layout_at_drag_energy() {
        let config = LayoutConfig::default();
        let mut layout = pair(1.0, config);
        settle(&mut layout);
        assert!(layout.alpha() < config.alpha_min);

        layout.reheat();
        assert!(layout.alpha() >= config.drag_alpha_target);
        layout.step();
        assert!(layout.alpha() >= config.drag_alpha_target - 1e-6);
    }

    #[test]
    fn seed_position_prefers_previous_coordinate() {
        let mut rng = StdRng::seed_from_u64(1);
        let previous = vec2(12.0, 34.0);
        assert_eq!(seed_position(Some(previous), CENTER, &mut rng), previous);

        let fresh = seed_position(None, CENTER, &mut rng);
        assert!((fresh.x - CENTER.x).abs() <= 100.0);
        assert!((fresh.y - CENTER.y).abs() <= 100.0);
    }

    #[test]
    fn retuning_wakes_a_settled_layout() {
        let mut layout = pair(1.0, LayoutConfig::default());
        settle(&mut layout);
        layout.set_config(LayoutConfig {
            link_base_distance: 120.0,
            ..LayoutConfig::default()
        });
        assert!(!layout.is_settled());
        settle(&mut layout);
    }
}
