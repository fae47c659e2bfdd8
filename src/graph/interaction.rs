use chrono::{DateTime, Utc};
use eframe::egui::{Color32, Pos2, Rect, Vec2, vec2};

use crate::snapshot::Node;
use crate::util::{format_relative_time, mastery_label};

use super::encoding::mastery_color;
use super::layout::LayoutEngine;

pub const MIN_ZOOM: f32 = 0.3;
pub const MAX_ZOOM: f32 = 3.0;
pub const TOOLTIP_OFFSET: Vec2 = vec2(14.0, -12.0);

/// Pan/zoom applied to the whole graph layer: `screen = origin + (x, y) + world * k`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub x: f32,
    pub y: f32,
    pub k: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            k: 1.0,
        }
    }
}

impl ViewTransform {
    pub fn apply(&self, origin: Pos2, world: Vec2) -> Pos2 {
        origin + vec2(self.x, self.y) + world * self.k
    }

    pub fn invert(&self, origin: Pos2, screen: Pos2) -> Vec2 {
        (screen - origin - vec2(self.x, self.y)) / self.k
    }

    /// Scales by `factor` while keeping the world point under `pointer` fixed.
    pub fn zoom_about(&mut self, origin: Pos2, pointer: Pos2, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }

        let anchor = self.invert(origin, pointer);
        self.k = (self.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let translate = pointer - origin - anchor * self.k;
        self.x = translate.x;
        self.y = translate.y;
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct DragState {
    index: usize,
    /// Node position minus pointer position at grab time, in world units.
    grab: Vec2,
}

/// Pointer state for one graph instance. The host only routes events here in
/// interactive mode.
#[derive(Clone, Debug, Default)]
pub struct InteractionController {
    transform: ViewTransform,
    drag: Option<DragState>,
    hovered: Option<usize>,
}

impl InteractionController {
    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn reset_transform(&mut self) {
        self.transform = ViewTransform::default();
    }

    pub fn zoom(&mut self, origin: Pos2, pointer: Pos2, factor: f32) {
        self.transform.zoom_about(origin, pointer, factor);
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.transform.pan_by(delta);
    }

    pub fn dragging(&self) -> Option<usize> {
        self.drag.map(|drag| drag.index)
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    /// Returns `true` if the hovered node changed.
    pub fn set_hovered(&mut self, index: Option<usize>) -> bool {
        let changed = self.hovered != index;
        self.hovered = index;
        changed
    }

    pub fn begin_drag(&mut self, index: usize, pointer: Vec2, layout: &mut dyn LayoutEngine) {
        let Some(position) = layout.positions().get(index).copied() else {
            return;
        };

        self.drag = Some(DragState {
            index,
            grab: position - pointer,
        });
        layout.pin(index, position);
        layout.reheat();
    }

    pub fn drag_to(&mut self, pointer: Vec2, layout: &mut dyn LayoutEngine) {
        if let Some(drag) = self.drag {
            layout.pin(drag.index, pointer + drag.grab);
        }
    }

    pub fn end_drag(&mut self, layout: &mut dyn LayoutEngine) {
        if let Some(drag) = self.drag.take() {
            layout.unpin(drag.index);
            layout.cool();
        }
    }

    /// Forgets per-node pointer state. Used when the node arena is rebuilt.
    pub fn clear_nodes(&mut self) {
        self.drag = None;
        self.hovered = None;
    }
}

/// Index of the node whose disc contains `pointer`, nearest center first.
pub fn pick_node(positions: &[Pos2], radii: &[f32], pointer: Pos2) -> Option<usize> {
    positions
        .iter()
        .zip(radii)
        .enumerate()
        .filter_map(|(index, (position, radius))| {
            let distance = position.distance(pointer);
            (distance <= *radius).then_some((index, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tooltip {
    pub title: String,
    pub subject: String,
    pub subject_color: Color32,
    pub mastery: String,
    pub mastery_color: Color32,
    pub last_studied: String,
}

impl Tooltip {
    pub fn for_node(node: &Node, subject_color: Color32, now: DateTime<Utc>) -> Self {
        Self {
            title: node.concept_name.clone(),
            subject: node.subject.clone(),
            subject_color,
            mastery: format!("{} mastery", mastery_label(node.mastery_score)),
            mastery_color: mastery_color(&node.mastery_tier),
            last_studied: format!(
                "Last studied: {}",
                format_relative_time(node.last_studied_at, now)
            ),
        }
    }
}

/// Top-left corner for a tooltip of `size` shown next to `pointer`, kept
/// inside `canvas`.
pub fn place_tooltip(pointer: Pos2, size: Vec2, canvas: Rect) -> Pos2 {
    let preferred = pointer + TOOLTIP_OFFSET;
    let max_x = (canvas.right() - size.x).max(canvas.left());
    let max_y = (canvas.bottom() - size.y).max(canvas.top());
    Pos2::new(
        preferred.x.clamp(canvas.left(), max_x),
        preferred.y.clamp(canvas.top(), max_y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::layout::{ForceLayout, LayoutConfig, LayoutNode};
    use crate::snapshot::MasteryTier;
    use chrono::TimeZone;

    const ORIGIN: Pos2 = Pos2::new(0.0, 0.0);

    #[test]
    fn zoom_is_clamped() {
        let mut transform = ViewTransform::default();
        for _ in 0..40 {
            transform.zoom_about(ORIGIN, Pos2::new(50.0, 50.0), 1.5);
        }
        assert_eq!(transform.k, MAX_ZOOM);
        for _ in 0..40 {
            transform.zoom_about(ORIGIN, Pos2::new(50.0, 50.0), 0.5);
        }
        assert_eq!(transform.k, MIN_ZOOM);
    }

    #[test]
    fn zoom_keeps_point_under_pointer() {
        let mut transform = ViewTransform {
            x: 30.0,
            y: -10.0,
            k: 1.2,
        };
        let origin = Pos2::new(100.0, 40.0);
        let pointer = Pos2::new(420.0, 260.0);
        let before = transform.invert(origin, pointer);
        transform.zoom_about(origin, pointer, 1.7);
        let after = transform.apply(origin, before);
        assert!((after - pointer).length() < 1e-3);
    }

    #[test]
    fn invalid_zoom_factor_is_ignored() {
        let mut transform = ViewTransform::default();
        transform.zoom_about(ORIGIN, Pos2::new(1.0, 1.0), f32::NAN);
        transform.zoom_about(ORIGIN, Pos2::new(1.0, 1.0), 0.0);
        assert_eq!(transform, ViewTransform::default());
    }

    #[test]
    fn pan_translates() {
        let mut controller = InteractionController::default();
        controller.pan(vec2(5.0, -3.0));
        assert_eq!(controller.transform().apply(ORIGIN, Vec2::ZERO), Pos2::new(5.0, -3.0));
        controller.reset_transform();
        assert_eq!(controller.transform(), ViewTransform::default());
    }

    #[test]
    fn drag_pins_reheats_and_releases() {
        let mut layout = ForceLayout::new(LayoutConfig::default(), vec2(200.0, 200.0));
        layout.seed(
            &[
                LayoutNode {
                    position: vec2(180.0, 200.0),
                    radius: 7.0,
                },
                LayoutNode {
                    position: vec2(240.0, 200.0),
                    radius: 7.0,
                },
            ],
            &[],
        );
        while layout.step() {}

        let mut controller = InteractionController::default();
        let grabbed_at = layout.positions()[0];
        controller.begin_drag(0, grabbed_at + vec2(2.0, 0.0), &mut layout);
        assert_eq!(controller.dragging(), Some(0));
        assert!(!layout.is_settled());
        assert!(layout.alpha() >= LayoutConfig::default().drag_alpha_target);

        controller.drag_to(vec2(62.0, 40.0), &mut layout);
        layout.step();
        assert_eq!(layout.positions()[0], vec2(60.0, 40.0));

        controller.end_drag(&mut layout);
        assert_eq!(controller.dragging(), None);
        assert!(!layout.is_pinned(0));
    }

    #[test]
    fn drag_on_missing_node_is_ignored() {
        let mut layout = ForceLayout::new(LayoutConfig::default(), Vec2::ZERO);
        let mut controller = InteractionController::default();
        controller.begin_drag(3, Vec2::ZERO, &mut layout);
        assert_eq!(controller.dragging(), None);
    }

    #[test]
    fn picks_nearest_containing_disc() {
        let positions = [Pos2::new(0.0, 0.0), Pos2::new(6.0, 0.0), Pos2::new(100.0, 0.0)];
        let radii = [10.0, 10.0, 10.0];
        assert_eq!(pick_node(&positions, &radii, Pos2::new(4.0, 0.0)), Some(1));
        assert_eq!(pick_node(&positions, &radii, Pos2::new(50.0, 0.0)), None);
    }

    #[test]
    fn hover_change_is_reported_once() {
        let mut controller = InteractionController::default();
        assert!(controller.set_hovered(Some(2)));
        assert!(!controller.set_hovered(Some(2)));
        assert!(controller.set_hovered(None));
    }

    #[test]
    fn tooltip_content() {
        let now = Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).single().expect("date");
        let mut node = Node::new("n1", "Binary search", 0.456, MasteryTier::Learning, "CS");
        node.last_studied_at = Some(now - chrono::Duration::hours(3));

        let tooltip = Tooltip::for_node(&node, Color32::RED, now);
        assert_eq!(tooltip.title, "Binary search");
        assert_eq!(tooltip.subject, "CS");
        assert_eq!(tooltip.subject_color, Color32::RED);
        assert_eq!(tooltip.mastery, "46% mastery");
        assert_eq!(tooltip.mastery_color, mastery_color(&MasteryTier::Learning));
        assert_eq!(tooltip.last_studied, "Last studied: 3h ago");
    }

    #[test]
    fn tooltip_is_offset_and_clamped() {
        let canvas = Rect::from_min_size(Pos2::new(0.0, 0.0), vec2(400.0, 300.0));
        let size = vec2(120.0, 60.0);

        assert_eq!(
            place_tooltip(Pos2::new(100.0, 100.0), size, canvas),
            Pos2::new(114.0, 88.0)
        );
        assert_eq!(
            place_tooltip(Pos2::new(390.0, 295.0), size, canvas),
            Pos2::new(280.0, 240.0)
        );
        assert_eq!(
            place_tooltip(Pos2::new(-20.0, 2.0), size, canvas),
            Pos2::new(0.0, 0.0)
        );
    }
}
