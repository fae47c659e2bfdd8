//! The knowledge-graph component: owns the simulation, drift field,
//! animations and pointer state for one canvas, and turns them into a
//! [`Scene`] once per frame.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use eframe::egui::{Color32, Pos2, Stroke, Vec2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::snapshot::{Edge, MasteryTier, Node, Snapshot};
use crate::util::short_label;

use super::comparison::{ComparisonClass, PartnerIndex};
use super::diff::{GraphDiff, diff};
use super::drift::{DriftConfig, DriftField};
use super::encoding::{
    SubjectColor, color_for_subject, edge_width, mastery_highlight_color, opacity_for_tier,
    radius_for_node,
};
use super::interaction::{InteractionController, Tooltip, ViewTransform, pick_node};
use super::layout::{
    ForceLayout, LayoutConfig, LayoutEngine, LayoutLink, LayoutNode, seed_position,
};
use super::scene::{Scene, SceneEdge, SceneNode, SceneTooltip, blend_color, lerp};
use super::scheduler::{FrameScheduler, TaskHandle, TaskKind};

pub const NODE_ENTER_SECS: f64 = 0.4;
pub const EDGE_ENTER_SECS: f64 = 0.3;
pub const TIER_TRANSITION_SECS: f64 = 0.5;
pub const PULSE_OFFSET: f32 = 8.0;
const REHEAT_ALPHA: f32 = 0.5;
const LABEL_MAX_CHARS: usize = 28;
const EDGE_COLOR: Color32 = Color32::from_rgba_premultiplied(19, 21, 24, 33);
const LABEL_COLOR: Color32 = Color32::from_rgb(0x64, 0x74, 0x8b);
const ROOT_LABEL_COLOR: Color32 = Color32::from_rgb(0xcb, 0xd5, 0xe1);

pub type NodeClickHandler = Box<dyn FnMut(&Node)>;

/// Everything the host hands to the component each frame.
#[derive(Clone, Debug)]
pub struct GraphProps {
    pub snapshot: Arc<Snapshot>,
    pub size: Vec2,
    pub interactive: bool,
    pub animate: bool,
    pub highlight_id: Option<String>,
    pub partner: Option<Arc<[Node]>>,
    pub subject_colors: Arc<HashMap<String, String>>,
}

impl Default for GraphProps {
    fn default() -> Self {
        Self {
            snapshot: Arc::default(),
            size: Vec2::ZERO,
            interactive: true,
            animate: true,
            highlight_id: None,
            partner: None,
            subject_colors: Arc::default(),
        }
    }
}

impl GraphProps {
    fn is_ready(&self) -> bool {
        self.size.x.is_finite() && self.size.y.is_finite() && self.size.x >= 1.0 && self.size.y >= 1.0
    }

    fn needs_rebuild(&self, next: &Self) -> bool {
        !same_snapshot(&self.snapshot, &next.snapshot)
            || self.size != next.size
            || self.interactive != next.interactive
    }

    fn needs_restyle(&self, next: &Self) -> bool {
        let same_partner = match (&self.partner, &next.partner) {
            (None, None) => true,
            (Some(current), Some(next)) => Arc::ptr_eq(current, next) || current == next,
            _ => false,
        };
        !same_partner
            || !(Arc::ptr_eq(&self.subject_colors, &next.subject_colors)
                || self.subject_colors == next.subject_colors)
    }
}

fn same_snapshot(current: &Arc<Snapshot>, next: &Arc<Snapshot>) -> bool {
    Arc::ptr_eq(current, next) || current == next
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewPhase {
    /// No canvas size yet, or disposed.
    Uninitialized,
    /// Simulation constructed; no frame has run.
    Built,
    Settling,
    /// Solver at rest; drift keeps running.
    Settled,
}

#[derive(Clone, Copy, Debug)]
struct Animation {
    start: Option<f64>,
    duration: f64,
}

impl Animation {
    fn new(duration: f64) -> Self {
        Self {
            start: None,
            duration,
        }
    }

    /// Starts the clock on first use.
    fn progress(&mut self, now: f64) -> f32 {
        let start = *self.start.get_or_insert(now);
        ((now - start) / self.duration).clamp(0.0, 1.0) as f32
    }

    fn is_finished(&self, now: f64) -> bool {
        self.start
            .is_some_and(|start| now - start >= self.duration)
    }
}

#[derive(Clone, Debug)]
struct TierTransition {
    from: MasteryTier,
    animation: Animation,
}

#[derive(Clone, Debug, Default)]
struct Animations {
    node_enter: HashMap<usize, Animation>,
    edge_enter: HashMap<usize, Animation>,
    tier: HashMap<usize, TierTransition>,
}

impl Animations {
    fn prune(&mut self, now: f64) {
        self.node_enter.retain(|_, animation| !animation.is_finished(now));
        self.edge_enter.retain(|_, animation| !animation.is_finished(now));
        self.tier
            .retain(|_, transition| !transition.animation.is_finished(now));
    }

    fn is_empty(&self) -> bool {
        self.node_enter.is_empty() && self.edge_enter.is_empty() && self.tier.is_empty()
    }
}

struct NodeStyle {
    radius: f32,
    color: SubjectColor,
    comparison: Option<ComparisonClass>,
    label: String,
}

struct GraphLink {
    source: usize,
    target: usize,
    strength: f32,
}

struct BuiltGraph {
    snapshot: Arc<Snapshot>,
    styles: Vec<NodeStyle>,
    index_by_id: HashMap<String, usize>,
    links: Vec<GraphLink>,
    draw_order: Vec<usize>,
    layout: Box<dyn LayoutEngine>,
    drift: DriftField,
    drift_epoch: Option<f64>,
    animations: Animations,
}

pub struct KnowledgeGraphView {
    props: Option<GraphProps>,
    phase: ViewPhase,
    graph: Option<BuiltGraph>,
    previous: Option<Arc<Snapshot>>,
    last_positions: HashMap<String, Vec2>,
    last_diff: GraphDiff,
    layout_config: LayoutConfig,
    drift_config: DriftConfig,
    scheduler: FrameScheduler,
    physics_task: Option<TaskHandle>,
    drift_task: Option<TaskHandle>,
    interaction: InteractionController,
    pointer: Option<Pos2>,
    scene: Scene,
    screen_positions: Vec<Pos2>,
    screen_radii: Vec<f32>,
    on_node_click: Option<NodeClickHandler>,
    rng: StdRng,
    rebuilds: u64,
}

impl KnowledgeGraphView {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            props: None,
            phase: ViewPhase::Uninitialized,
            graph: None,
            previous: None,
            last_positions: HashMap::new(),
            last_diff: GraphDiff::default(),
            layout_config: LayoutConfig::default(),
            drift_config: DriftConfig::default(),
            scheduler: FrameScheduler::new(),
            physics_task: None,
            drift_task: None,
            interaction: InteractionController::default(),
            pointer: None,
            scene: Scene::default(),
            screen_positions: Vec::new(),
            screen_radii: Vec::new(),
            on_node_click: None,
            rng,
            rebuilds: 0,
        }
    }

    pub fn set_on_node_click(&mut self, handler: impl FnMut(&Node) + 'static) {
        self.on_node_click = Some(Box::new(handler));
    }

    pub fn phase(&self) -> ViewPhase {
        self.phase
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn last_diff(&self) -> &GraphDiff {
        &self.last_diff
    }

    #[cfg(test)]
    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    pub fn layout_config(&self) -> LayoutConfig {
        self.layout_config
    }

    pub fn transform(&self) -> ViewTransform {
        self.interaction.transform()
    }

    pub fn is_interactive(&self) -> bool {
        self.props.as_ref().is_some_and(|props| props.interactive)
    }

    #[cfg(test)]
    pub fn is_animating(&self) -> bool {
        self.graph
            .as_ref()
            .is_some_and(|graph| !graph.animations.is_empty())
    }

    pub fn node_count(&self) -> usize {
        self.graph.as_ref().map_or(0, |graph| graph.styles.len())
    }

    pub fn link_count(&self) -> usize {
        self.graph.as_ref().map_or(0, |graph| graph.links.len())
    }

    /// Authoritative simulation coordinate, without drift or transform.
    pub fn node_position(&self, id: &str) -> Option<Vec2> {
        let graph = self.graph.as_ref()?;
        let index = *graph.index_by_id.get(id)?;
        graph.layout.positions().get(index).copied()
    }

    pub fn hovered_node(&self) -> Option<&Node> {
        let graph = self.graph.as_ref()?;
        graph.snapshot.nodes.get(self.interaction.hovered()?)
    }

    /// Applies new host input. Rebuilds the simulation when the node set,
    /// edge set, canvas size or interactivity changed.
    pub fn set_props(&mut self, props: GraphProps) {
        let (rebuild, restyle) = match &self.props {
            None => (true, false),
            Some(current) => (current.needs_rebuild(&props), current.needs_restyle(&props)),
        };

        self.props = Some(props);
        if rebuild {
            self.rebuild();
        } else if restyle {
            self.restyle();
        }
    }

    pub fn set_layout_config(&mut self, config: LayoutConfig) {
        if self.layout_config == config {
            return;
        }
        self.layout_config = config;
        if let Some(graph) = self.graph.as_mut() {
            graph.layout.set_config(config);
            self.ensure_physics();
        }
    }

    pub fn drift_config(&self) -> DriftConfig {
        self.drift_config
    }

    /// Rerolls every node's drift parameters from `config`.
    pub fn set_drift_config(&mut self, config: DriftConfig) {
        if self.drift_config == config {
            return;
        }
        self.drift_config = config;
        if let Some(graph) = self.graph.as_mut() {
            graph.drift = DriftField::new(graph.styles.len(), &config, &mut self.rng);
        }
    }

    /// Wakes the solver without changing its configuration.
    pub fn reheat(&mut self) {
        if let Some(graph) = self.graph.as_mut() {
            graph.layout.restart(REHEAT_ALPHA);
            self.ensure_physics();
        }
    }

    pub fn reset_view(&mut self) {
        self.interaction.reset_transform();
    }

    /// Stops every frame callback and releases the simulation. The view can
    /// be reused by calling [`Self::set_props`] again.
    pub fn dispose(&mut self) {
        self.teardown();
        self.props = None;
        self.previous = None;
        self.last_positions.clear();
        self.on_node_click = None;
        self.phase = ViewPhase::Uninitialized;
        debug!(
            frames = self.scheduler.frames_dispatched(),
            rebuilds = self.rebuilds,
            "disposed graph view"
        );
    }

    fn teardown(&mut self) {
        for handle in [self.physics_task.take(), self.drift_task.take()]
            .into_iter()
            .flatten()
        {
            self.scheduler.cancel(handle);
        }

        if let Some(graph) = self.graph.take() {
            self.last_positions = graph
                .snapshot
                .nodes
                .iter()
                .zip(graph.layout.positions())
                .map(|(node, position)| (node.id.clone(), *position))
                .collect();
        }

        self.interaction.clear_nodes();
        self.scene.clear();
        self.screen_positions.clear();
        self.screen_radii.clear();
    }

    fn rebuild(&mut self) {
        self.teardown();

        let Some(props) = self.props.as_ref() else {
            self.phase = ViewPhase::Uninitialized;
            return;
        };
        if !props.is_ready() {
            debug!(width = props.size.x, height = props.size.y, "canvas not ready, skipping build");
            self.phase = ViewPhase::Uninitialized;
            return;
        }
        if !props.interactive {
            self.interaction.reset_transform();
        }

        let snapshot = Arc::clone(&props.snapshot);
        let (prev_nodes, prev_edges): (&[Node], &[Edge]) = match self.previous.as_deref() {
            Some(prev) => (&prev.nodes, &prev.edges),
            None => (&[], &[]),
        };
        let graph_diff = diff(prev_nodes, &snapshot.nodes, prev_edges, &snapshot.edges);
        let previous_tiers = prev_nodes
            .iter()
            .map(|node| (node.id.as_str(), &node.mastery_tier))
            .collect::<HashMap<_, _>>();

        let styles = node_styles(&snapshot, props);
        let index_by_id = snapshot
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), index))
            .collect::<HashMap<_, _>>();

        let mut links = Vec::with_capacity(snapshot.edges.len());
        let mut link_ids = Vec::with_capacity(snapshot.edges.len());
        for edge in &snapshot.edges {
            let (Some(&source), Some(&target)) =
                (index_by_id.get(&edge.source), index_by_id.get(&edge.target))
            else {
                continue;
            };
            links.push(GraphLink {
                source,
                target,
                strength: edge.strength,
            });
            link_ids.push(edge.id.as_str());
        }
        let dropped = snapshot.edges.len() - links.len();
        if dropped > 0 {
            debug!(dropped, "dropped edges with a missing endpoint");
        }

        let center = props.size * 0.5;
        let layout_nodes = snapshot
            .nodes
            .iter()
            .zip(&styles)
            .map(|(node, style)| LayoutNode {
                position: seed_position(
                    self.last_positions.get(&node.id).copied(),
                    center,
                    &mut self.rng,
                ),
                radius: style.radius,
            })
            .collect::<Vec<_>>();
        let layout_links = links
            .iter()
            .map(|link| LayoutLink {
                source: link.source,
                target: link.target,
                strength: link.strength,
            })
            .collect::<Vec<_>>();

        let mut layout: Box<dyn LayoutEngine> =
            Box::new(ForceLayout::new(self.layout_config, center));
        layout.seed(&layout_nodes, &layout_links);

        let mut animations = Animations::default();
        if props.animate {
            for (index, node) in snapshot.nodes.iter().enumerate() {
                if graph_diff.new_node_ids.contains(&node.id) {
                    animations
                        .node_enter
                        .insert(index, Animation::new(NODE_ENTER_SECS));
                } else if graph_diff.updated_node_ids.contains(&node.id)
                    && let Some(from) = previous_tiers.get(node.id.as_str())
                {
                    animations.tier.insert(
                        index,
                        TierTransition {
                            from: (*from).clone(),
                            animation: Animation::new(TIER_TRANSITION_SECS),
                        },
                    );
                }
            }
            for (index, id) in link_ids.iter().enumerate() {
                if graph_diff.new_edge_ids.contains(*id) {
                    animations
                        .edge_enter
                        .insert(index, Animation::new(EDGE_ENTER_SECS));
                }
            }
        }

        let mut draw_order = (0..snapshot.nodes.len()).collect::<Vec<_>>();
        draw_order.sort_by_key(|&index| !snapshot.nodes[index].is_root());

        debug!(
            nodes = snapshot.nodes.len(),
            links = links.len(),
            new_nodes = graph_diff.new_node_ids.len(),
            updated_nodes = graph_diff.updated_node_ids.len(),
            new_edges = graph_diff.new_edge_ids.len(),
            removed_nodes = graph_diff.removed_node_ids.len(),
            removed_edges = graph_diff.removed_edge_ids.len(),
            "built graph view"
        );

        let drift = DriftField::new(snapshot.nodes.len(), &self.drift_config, &mut self.rng);
        let has_nodes = !snapshot.nodes.is_empty();
        self.graph = Some(BuiltGraph {
            snapshot: Arc::clone(&snapshot),
            styles,
            index_by_id,
            links,
            draw_order,
            layout,
            drift,
            drift_epoch: None,
            animations,
        });
        self.previous = Some(snapshot);
        self.last_diff = graph_diff;
        self.last_positions.clear();

        self.physics_task = Some(self.scheduler.schedule(TaskKind::Physics));
        if has_nodes {
            self.drift_task = Some(self.scheduler.schedule(TaskKind::Drift));
        }
        self.phase = ViewPhase::Built;
        self.rebuilds += 1;
    }

    fn restyle(&mut self) {
        let (Some(graph), Some(props)) = (self.graph.as_mut(), self.props.as_ref()) else {
            return;
        };
        graph.styles = node_styles(&graph.snapshot, props);
    }

    fn ensure_physics(&mut self) {
        if self.graph.is_none() {
            return;
        }
        if self.physics_task.is_none() {
            self.physics_task = Some(self.scheduler.schedule(TaskKind::Physics));
        }
        self.phase = ViewPhase::Settling;
    }

    /// Runs one frame: physics tick, then drift, then scene composition.
    /// Returns `false` when nothing is scheduled and no callback ran.
    pub fn frame(&mut self, now: f64) -> bool {
        let Some(tasks) = self.scheduler.begin_frame() else {
            return false;
        };
        let Some(graph) = self.graph.as_mut() else {
            return false;
        };

        if tasks.physics {
            if self.phase == ViewPhase::Built {
                self.phase = ViewPhase::Settling;
            }
            if !graph.layout.step() {
                if let Some(handle) = self.physics_task.take() {
                    self.scheduler.cancel(handle);
                }
                self.phase = ViewPhase::Settled;
                debug!("layout settled");
            }
        }

        if tasks.drift {
            let epoch = *graph.drift_epoch.get_or_insert(now);
            graph
                .drift
                .update((now - epoch) as f32, self.interaction.dragging());
        }

        self.compose(now);
        true
    }

    fn compose(&mut self, now: f64) {
        self.scene.clear();
        let (Some(graph), Some(props)) = (self.graph.as_mut(), self.props.as_ref()) else {
            return;
        };

        let transform = self.interaction.transform();
        self.scene.zoom = transform.k;
        self.screen_positions.clear();
        self.screen_radii.clear();
        for (index, position) in graph.layout.positions().iter().enumerate() {
            let rendered = *position + graph.drift.offset(index);
            self.screen_positions
                .push(transform.apply(Pos2::ZERO, rendered));
            self.screen_radii.push(graph.styles[index].radius * transform.k);
        }

        for (link_index, link) in graph.links.iter().enumerate() {
            let from = self.screen_positions[link.source];
            let target = self.screen_positions[link.target];
            let progress = graph
                .animations
                .edge_enter
                .get_mut(&link_index)
                .map_or(1.0, |animation| animation.progress(now));

            self.scene.edges.push(SceneEdge {
                from,
                to: from + (target - from) * progress,
                width: edge_width(link.strength) * transform.k,
                color: EDGE_COLOR,
            });
        }

        let hovered = self.interaction.hovered();
        let pulse_alpha = (115.0 * (0.65 + 0.35 * (now * 3.0).sin())) as u8;
        for &index in &graph.draw_order {
            let node = &graph.snapshot.nodes[index];
            let style = &graph.styles[index];

            let mut opacity = opacity_for_tier(&node.mastery_tier);
            let mut core = if node.is_root() {
                blend_color(style.color.fill, Color32::WHITE, 0.35)
            } else {
                mastery_highlight_color(&node.mastery_tier)
            };
            if let Some(transition) = graph.animations.tier.get_mut(&index) {
                let t = transition.animation.progress(now);
                core = blend_color(mastery_highlight_color(&transition.from), core, t);
                opacity = lerp(opacity_for_tier(&transition.from), opacity, t);
            }
            if let Some(enter) = graph.animations.node_enter.get_mut(&index) {
                opacity *= enter.progress(now);
            }

            let stroke = if hovered == Some(index) {
                Stroke::new(2.0, Color32::from_white_alpha(166))
            } else {
                Stroke::new(1.0, Color32::from_white_alpha(46))
            };
            let highlighted = props.highlight_id.as_deref() == Some(node.id.as_str());

            self.scene.nodes.push(SceneNode {
                index,
                center: self.screen_positions[index],
                radius: self.screen_radii[index],
                fill: style.color.fill,
                core,
                opacity,
                stroke,
                ring: style.comparison.map(ComparisonClass::ring_color),
                pulse: highlighted
                    .then(|| Color32::from_rgba_unmultiplied(34, 211, 238, pulse_alpha)),
                label: style.label.clone(),
                label_color: if node.is_root() {
                    ROOT_LABEL_COLOR
                } else {
                    LABEL_COLOR
                },
                is_root: node.is_root(),
            });
        }
        graph.animations.prune(now);

        if props.interactive
            && let (Some(index), Some(pointer)) = (hovered, self.pointer)
            && let Some(node) = graph.snapshot.nodes.get(index)
        {
            self.scene.tooltip = Some(SceneTooltip {
                tooltip: Tooltip::for_node(node, graph.styles[index].color.fill, Utc::now()),
                pointer,
            });
        }
    }

    fn pick(&self, pointer: Pos2) -> Option<usize> {
        pick_node(&self.screen_positions, &self.screen_radii, pointer)
    }

    /// Pointer position in canvas-local coordinates, `None` once it leaves.
    pub fn pointer_moved(&mut self, pointer: Option<Pos2>) {
        if !self.is_interactive() {
            self.pointer = None;
            self.interaction.set_hovered(None);
            return;
        }

        self.pointer = pointer;
        let hovered = match self.interaction.dragging() {
            Some(index) => Some(index),
            None => pointer.and_then(|pointer| self.pick(pointer)),
        };
        self.interaction.set_hovered(hovered);
    }

    /// Starts dragging the node under `pointer`. Returns `false` when the
    /// press landed on empty canvas, which the host treats as a pan.
    pub fn drag_started(&mut self, pointer: Pos2) -> bool {
        if !self.is_interactive() {
            return false;
        }
        let Some(index) = self.pick(pointer) else {
            return false;
        };
        let world = self.interaction.transform().invert(Pos2::ZERO, pointer);
        let Some(graph) = self.graph.as_mut() else {
            return false;
        };

        self.interaction
            .begin_drag(index, world, graph.layout.as_mut());
        self.interaction.set_hovered(Some(index));
        self.ensure_physics();
        true
    }

    pub fn dragged(&mut self, pointer: Pos2, delta: Vec2) {
        if !self.is_interactive() {
            return;
        }

        if self.interaction.dragging().is_some() {
            let world = self.interaction.transform().invert(Pos2::ZERO, pointer);
            if let Some(graph) = self.graph.as_mut() {
                self.interaction.drag_to(world, graph.layout.as_mut());
            }
        } else {
            self.interaction.pan(delta);
        }
    }

    pub fn drag_released(&mut self) {
        if let Some(graph) = self.graph.as_mut() {
            self.interaction.end_drag(graph.layout.as_mut());
        }
    }

    pub fn scrolled(&mut self, pointer: Pos2, scroll: f32) {
        if !self.is_interactive() || scroll.abs() <= f32::EPSILON {
            return;
        }
        let factor = (1.0 + scroll * 0.0018).clamp(0.85, 1.15);
        self.interaction.zoom(Pos2::ZERO, pointer, factor);
    }

    /// Hands the full node under `pointer` to the click handler.
    pub fn clicked(&mut self, pointer: Pos2) -> bool {
        if !self.is_interactive() {
            return false;
        }
        let Some(index) = self.pick(pointer) else {
            return false;
        };
        let Some(node) = self
            .graph
            .as_ref()
            .and_then(|graph| graph.snapshot.nodes.get(index))
        else {
            return false;
        };

        if let Some(handler) = self.on_node_click.as_mut() {
            handler(node);
        }
        true
    }
}

impl Drop for KnowledgeGraphView {
    fn drop(&mut self) {
        self.scheduler.cancel_all();
    }
}

fn node_styles(snapshot: &Snapshot, props: &GraphProps) -> Vec<NodeStyle> {
    let partner = props.partner.as_deref().map(PartnerIndex::from_nodes);
    snapshot
        .nodes
        .iter()
        .map(|node| NodeStyle {
            radius: radius_for_node(node),
            color: color_for_subject(
                &node.subject,
                props.subject_colors.get(&node.subject).map(String::as_str),
            ),
            comparison: partner.as_ref().and_then(|partner| partner.classify(node)),
            label: short_label(&node.concept_name, LABEL_MAX_CHARS),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::graph::encoding::MAX_NODE_RADIUS;
    use eframe::egui::vec2;

    const FRAME: f64 = 1.0 / 60.0;

    fn node(id: &str, tier: MasteryTier) -> Node {
        Node::new(id, format!("Concept {id}"), 0.5, tier, "Math")
    }

    fn snapshot_a() -> Snapshot {
        Snapshot::new(
            vec![
                node("n1", MasteryTier::Learning),
                node("n2", MasteryTier::Unexplored),
            ],
            vec![],
        )
    }

    fn snapshot_b() -> Snapshot {
        Snapshot::new(
            vec![
                node("n1", MasteryTier::Mastered),
                node("n2", MasteryTier::Unexplored),
                node("n3", MasteryTier::Learning),
            ],
            vec![Edge::new("n1-n3", "n1", "n3", 0.8)],
        )
    }

    fn props(snapshot: Snapshot) -> GraphProps {
        GraphProps {
            snapshot: Arc::new(snapshot),
            size: vec2(800.0, 600.0),
            ..GraphProps::default()
        }
    }

    fn settle(view: &mut KnowledgeGraphView, now: &mut f64) {
        let mut frames = 0;
        while view.phase() != ViewPhase::Settled {
            assert!(view.frame(*now));
            *now += FRAME;
            frames += 1;
            assert!(frames < 5_000, "view never settled");
        }
    }

    #[test]
    fn zero_size_is_not_ready() {
        let mut view = KnowledgeGraphView::new(Some(1));
        view.set_props(GraphProps {
            size: Vec2::ZERO,
            ..props(snapshot_a())
        });
        assert_eq!(view.phase(), ViewPhase::Uninitialized);
        assert_eq!(view.node_count(), 0);
        assert!(view.scheduler().is_idle());
        assert!(!view.frame(0.0));

        view.set_props(props(snapshot_a()));
        assert_eq!(view.phase(), ViewPhase::Built);
        assert_eq!(view.node_count(), 2);
    }

    #[test]
    fn lifecycle_reaches_settled_and_keeps_drifting() {
        let mut view = KnowledgeGraphView::new(Some(2));
        view.set_props(props(snapshot_b()));
        assert_eq!(view.phase(), ViewPhase::Built);

        let mut now = 0.0;
        assert!(view.frame(now));
        assert_eq!(view.phase(), ViewPhase::Settling);
        settle(&mut view, &mut now);

        assert!(!view.scheduler().is_scheduled(TaskKind::Physics));
        assert!(view.scheduler().is_scheduled(TaskKind::Drift));
        let before = view.scene().node(0).map(|node| node.center);
        now += 1.5;
        assert!(view.frame(now));
        assert_ne!(view.scene().node(0).map(|node| node.center), before);
    }

    #[test]
    fn drift_frames_leave_simulation_positions_alone() {
        let mut view = KnowledgeGraphView::new(Some(5));
        view.set_props(props(snapshot_b()));
        let mut now = 0.0;
        settle(&mut view, &mut now);

        let ids = ["n1", "n2", "n3"];
        let settled = ids.map(|id| view.node_position(id));
        let first_center = view.scene().node(0).map(|node| node.center);
        let mut center_moved = false;
        for _ in 0..240 {
            now += FRAME;
            assert!(view.frame(now));
            assert_eq!(view.phase(), ViewPhase::Settled);
            assert_eq!(ids.map(|id| view.node_position(id)), settled);
            center_moved |= view.scene().node(0).map(|node| node.center) != first_center;
        }
        assert!(center_moved);
    }

    #[test]
    fn rebuild_diffs_and_keeps_known_positions() {
        let mut view = KnowledgeGraphView::new(Some(3));
        view.set_props(props(snapshot_a()));
        let mut now = 0.0;
        settle(&mut view, &mut now);
        let n1 = view.node_position("n1");

        view.set_props(props(snapshot_b()));
        assert_eq!(view.rebuild_count(), 2);
        assert_eq!(view.phase(), ViewPhase::Built);
        assert_eq!(view.node_position("n1"), n1);
        assert_eq!(view.link_count(), 1);

        let diff = view.last_diff();
        assert!(diff.new_node_ids.contains("n3") && diff.new_node_ids.len() == 1);
        assert!(diff.updated_node_ids.contains("n1") && diff.updated_node_ids.len() == 1);
        assert!(diff.new_edge_ids.contains("n1-n3"));
    }

    #[test]
    fn enter_and_tier_animations_play_when_enabled() {
        let mut view = KnowledgeGraphView::new(Some(4));
        view.set_props(props(snapshot_a()));
        let mut now = 0.0;
        settle(&mut view, &mut now);

        view.set_props(props(snapshot_b()));
        assert!(view.is_animating());
        view.frame(now);
        let scene = view.scene();
        assert_eq!(scene.node(2).map(|node| node.opacity), Some(0.0));
        assert_eq!(
            scene.node(0).map(|node| node.core),
            Some(mastery_highlight_color(&MasteryTier::Learning))
        );
        assert_eq!(scene.edges[0].from, scene.edges[0].to);

        now += 1.0;
        view.frame(now);
        let scene = view.scene();
        assert_eq!(
            scene.node(2).map(|node| node.opacity),
            Some(opacity_for_tier(&MasteryTier::Learning))
        );
        assert_eq!(
            scene.node(0).map(|node| node.core),
            Some(mastery_highlight_color(&MasteryTier::Mastered))
        );
        assert!(!view.is_animating());
    }

    #[test]
    fn no_animations_without_animate_flag() {
        let mut view = KnowledgeGraphView::new(Some(5));
        let still = |snapshot| GraphProps {
            animate: false,
            ..props(snapshot)
        };
        view.set_props(still(snapshot_a()));
        view.set_props(still(snapshot_b()));
        assert!(!view.is_animating());

        view.frame(0.0);
        assert_eq!(
            view.scene().node(2).map(|node| node.opacity),
            Some(opacity_for_tier(&MasteryTier::Learning))
        );
    }

    #[test]
    fn highlight_and_partner_changes_restyle_without_rebuild() {
        let mut view = KnowledgeGraphView::new(Some(6));
        let base = props(snapshot_b());
        view.set_props(base.clone());
        view.frame(0.0);
        assert!(view.scene().nodes.iter().all(|node| node.pulse.is_none()));

        let partner: Arc<[Node]> = vec![Node::new(
            "p1",
            "Concept n1",
            0.95,
            MasteryTier::Mastered,
            "Math",
        )]
        .into();
        view.set_props(GraphProps {
            highlight_id: Some("n2".to_owned()),
            partner: Some(partner),
            ..base
        });
        view.frame(FRAME);

        assert_eq!(view.rebuild_count(), 1);
        let scene = view.scene();
        assert!(scene.node(1).is_some_and(|node| node.pulse.is_some()));
        assert!(scene.node(0).is_some_and(|node| node.pulse.is_none()));
        assert_eq!(scene.node(0).and_then(|node| node.ring), None);
    }

    #[test]
    fn comparison_ring_is_drawn_for_matching_names() {
        let mut view = KnowledgeGraphView::new(Some(6));
        let mut strong = node("n1", MasteryTier::Mastered);
        strong.mastery_score = 0.9;
        let partner: Arc<[Node]> = vec![Node::new(
            "other-id",
            "Concept n1",
            0.2,
            MasteryTier::Struggling,
            "Math",
        )]
        .into();
        view.set_props(GraphProps {
            partner: Some(partner),
            ..props(Snapshot::new(vec![strong, node("n2", MasteryTier::Learning)], vec![]))
        });
        view.frame(0.0);

        assert_eq!(
            view.scene().node(0).and_then(|node| node.ring),
            Some(ComparisonClass::SelfStrongPartnerWeak.ring_color())
        );
        assert_eq!(view.scene().node(1).and_then(|node| node.ring), None);
    }

    #[test]
    fn dispose_cancels_all_frame_callbacks() {
        let mut view = KnowledgeGraphView::new(Some(7));
        view.set_props(props(snapshot_b()));
        view.frame(0.0);
        view.frame(FRAME);
        let dispatched = view.scheduler().frames_dispatched();

        view.dispose();
        assert!(view.scheduler().is_idle());
        assert_eq!(view.phase(), ViewPhase::Uninitialized);
        for step in 0..10 {
            assert!(!view.frame(step as f64));
        }
        assert_eq!(view.scheduler().frames_dispatched(), dispatched);
    }

    #[test]
    fn size_or_mode_change_rebuilds() {
        let mut view = KnowledgeGraphView::new(Some(8));
        let base = props(snapshot_a());
        view.set_props(base.clone());
        view.set_props(base.clone());
        assert_eq!(view.rebuild_count(), 1);

        view.set_props(GraphProps {
            size: vec2(640.0, 480.0),
            ..base.clone()
        });
        assert_eq!(view.rebuild_count(), 2);

        view.set_props(GraphProps {
            size: vec2(640.0, 480.0),
            interactive: false,
            ..base
        });
        assert_eq!(view.rebuild_count(), 3);
        assert!(view.last_diff().is_empty());
    }

    #[test]
    fn dangling_edges_are_filtered() {
        let mut view = KnowledgeGraphView::new(Some(9));
        let snapshot = Snapshot::new(
            vec![node("a", MasteryTier::Learning), node("b", MasteryTier::Learning)],
            vec![
                Edge::new("ab", "a", "b", 0.5),
                Edge::new("ag", "a", "ghost", 0.5),
            ],
        );
        view.set_props(props(snapshot));
        assert_eq!(view.link_count(), 1);
        view.frame(0.0);
        assert_eq!(view.scene().edges.len(), 1);
    }

    #[test]
    fn click_dispatches_full_node() {
        let mut view = KnowledgeGraphView::new(Some(10));
        let mut studied = node("n1", MasteryTier::Learning);
        studied.times_studied = 4;
        view.set_props(props(Snapshot::new(
            vec![studied.clone(), node("n2", MasteryTier::Learning)],
            vec![],
        )));

        let clicked = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&clicked);
        view.set_on_node_click(move |node| sink.borrow_mut().push(node.clone()));

        let mut now = 0.0;
        settle(&mut view, &mut now);
        let center = view.scene().node(0).map(|node| node.center).expect("node 0 drawn");
        assert!(view.clicked(center));
        assert!(!view.clicked(Pos2::new(-500.0, -500.0)));
        assert_eq!(clicked.borrow().as_slice(), &[studied]);
    }

    #[test]
    fn static_mode_ignores_pointer_input() {
        let mut view = KnowledgeGraphView::new(Some(11));
        view.set_props(GraphProps {
            interactive: false,
            ..props(snapshot_a())
        });
        view.frame(0.0);
        let center = view.scene().node(0).map(|node| node.center).expect("node 0 drawn");

        assert!(!view.drag_started(center));
        assert!(!view.clicked(center));
        view.dragged(center, vec2(40.0, 0.0));
        view.scrolled(center, 120.0);
        view.pointer_moved(Some(center));
        assert_eq!(view.transform(), ViewTransform::default());
        assert!(view.hovered_node().is_none());
    }

    #[test]
    fn dragging_a_settled_graph_resumes_settling() {
        let mut view = KnowledgeGraphView::new(Some(12));
        view.set_props(props(snapshot_b()));
        let mut now = 0.0;
        settle(&mut view, &mut now);

        let center = view.scene().node(2).map(|node| node.center).expect("node 2 drawn");
        assert!(view.drag_started(center));
        assert_eq!(view.phase(), ViewPhase::Settling);
        assert!(view.scheduler().is_scheduled(TaskKind::Physics));

        let target = center + vec2(60.0, 25.0);
        view.dragged(target, vec2(60.0, 25.0));
        view.frame(now);
        let position = view.node_position("n3").expect("n3 simulated");
        assert!((position - target.to_vec2()).length() < MAX_NODE_RADIUS);

        view.pointer_moved(Some(target));
        assert_eq!(view.hovered_node().map(|node| node.id.as_str()), Some("n3"));
        view.frame(now + FRAME);
        assert!(view.scene().tooltip.is_some());

        view.drag_released();
        now += 2.0 * FRAME;
        settle(&mut view, &mut now);
        assert_eq!(view.rebuild_count(), 1);
    }

    #[test]
    fn scroll_zooms_about_pointer() {
        let mut view = KnowledgeGraphView::new(Some(13));
        view.set_props(props(snapshot_a()));
        view.scrolled(Pos2::new(400.0, 300.0), 100.0);
        assert!(view.transform().k > 1.0);
        view.reset_view();
        assert_eq!(view.transform(), ViewTransform::default());
    }

    #[test]
    fn retuning_wakes_a_settled_layout() {
        let mut view = KnowledgeGraphView::new(Some(14));
        view.set_props(props(snapshot_b()));
        let mut now = 0.0;
        settle(&mut view, &mut now);

        view.set_layout_config(LayoutConfig {
            charge_strength: 350.0,
            ..LayoutConfig::default()
        });
        assert_eq!(view.phase(), ViewPhase::Settling);
        settle(&mut view, &mut now);

        view.reheat();
        assert_eq!(view.phase(), ViewPhase::Settling);
    }

    #[test]
    fn drift_retune_applies_without_rebuild() {
        let mut view = KnowledgeGraphView::new(Some(15));
        view.set_props(props(snapshot_a()));
        let still = DriftConfig {
            amplitude_min: 0.0,
            amplitude_max: 0.0,
            ..DriftConfig::default()
        };
        view.set_drift_config(still);
        assert_eq!(view.drift_config(), still);

        let mut now = 0.0;
        settle(&mut view, &mut now);
        let before = view.scene().node(0).map(|node| node.center);
        view.frame(now + 2.0);
        assert_eq!(view.scene().node(0).map(|node| node.center), before);
        assert_eq!(view.rebuild_count(), 1);
    }
}
