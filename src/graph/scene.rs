//! Draw list produced once per frame by the orchestrator. Coordinates are
//! canvas-local screen pixels with pan/zoom already applied.

use eframe::egui::{Color32, Pos2, Stroke};

use super::interaction::Tooltip;

#[derive(Clone, Debug, PartialEq)]
pub struct SceneEdge {
    pub from: Pos2,
    /// Equals the target position unless the edge is still drawing in.
    pub to: Pos2,
    pub width: f32,
    pub color: Color32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
    pub index: usize,
    pub center: Pos2,
    pub radius: f32,
    pub fill: Color32,
    pub core: Color32,
    pub opacity: f32,
    pub stroke: Stroke,
    pub ring: Option<Color32>,
    pub pulse: Option<Color32>,
    pub label: String,
    pub label_color: Color32,
    pub is_root: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneTooltip {
    pub tooltip: Tooltip,
    pub pointer: Pos2,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    pub edges: Vec<SceneEdge>,
    pub nodes: Vec<SceneNode>,
    pub tooltip: Option<SceneTooltip>,
    pub zoom: f32,
}

impl Scene {
    pub fn clear(&mut self) {
        self.edges.clear();
        self.nodes.clear();
        self.tooltip = None;
    }

    #[cfg(test)]
    pub fn node(&self, index: usize) -> Option<&SceneNode> {
        self.nodes.iter().find(|node| node.index == index)
    }
}

pub fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;
    let mix = |a: u8, b: u8| ((a as f32 * inverse) + (b as f32 * amount)).round() as u8;

    Color32::from_rgba_unmultiplied(
        mix(base.r(), overlay.r()),
        mix(base.g(), overlay.g()),
        mix(base.b(), overlay.b()),
        mix(base.a(), overlay.a()),
    )
}

/// Scales the color's alpha by `opacity`.
pub fn with_opacity(color: Color32, opacity: f32) -> Color32 {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    Color32::from_rgba_unmultiplied(r, g, b, (a as f32 * opacity.clamp(0.0, 1.0)).round() as u8)
}

pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t.clamp(0.0, 1.0)
}
