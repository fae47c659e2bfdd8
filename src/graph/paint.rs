use eframe::egui::{
    Align2, Color32, CursorIcon, FontId, Painter, PointerButton, Pos2, Rect, Response,
    Sense, Stroke, StrokeKind, Ui, Vec2, vec2,
};

use super::comparison::RING_OFFSET;
use super::interaction::{ViewTransform, place_tooltip};
use super::scene::{Scene, SceneTooltip, with_opacity};
use super::view::{GraphProps, KnowledgeGraphView, PULSE_OFFSET};

const BACKGROUND: Color32 = Color32::from_rgb(8, 13, 30);
const GRID_LINE: Color32 = Color32::from_rgba_premultiplied(14, 16, 20, 48);
const TOOLTIP_FILL: Color32 = Color32::from_rgba_premultiplied(7, 11, 26, 224);
const TOOLTIP_BORDER: Color32 = Color32::from_rgba_premultiplied(21, 23, 26, 36);
const TOOLTIP_PADDING: Vec2 = vec2(10.0, 8.0);

/// Allocates the remaining space as the graph canvas, feeds input to the
/// view, runs one frame and paints the result.
pub fn show_graph(ui: &mut Ui, view: &mut KnowledgeGraphView, mut props: GraphProps) -> Response {
    let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
    props.size = vec2(rect.width().floor(), rect.height().floor());
    view.set_props(props);

    handle_input(ui, rect, &response, view);

    let now = ui.input(|input| input.time);
    if view.frame(now) {
        ui.ctx().request_repaint();
    }

    let painter = ui.painter_at(rect);
    draw_background(&painter, rect, view.transform());
    paint_scene(&painter, rect, view.scene());

    if view.hovered_node().is_some() {
        ui.output_mut(|output| output.cursor_icon = CursorIcon::PointingHand);
    }

    response
}

fn handle_input(ui: &Ui, rect: Rect, response: &Response, view: &mut KnowledgeGraphView) {
    let local = |position: Pos2| position - rect.min.to_vec2();

    let hover = response.hover_pos().map(local);
    view.pointer_moved(hover);

    if response.drag_started_by(PointerButton::Primary) {
        let origin = ui
            .input(|input| input.pointer.press_origin())
            .or_else(|| response.interact_pointer_pos());
        if let Some(origin) = origin {
            view.drag_started(local(origin));
        }
    }

    if response.dragged()
        && let Some(pointer) = response.interact_pointer_pos()
    {
        view.dragged(local(pointer), response.drag_delta());
    }

    if response.drag_stopped() {
        view.drag_released();
    }

    if response.clicked_by(PointerButton::Primary)
        && let Some(pointer) = response.interact_pointer_pos()
    {
        view.clicked(local(pointer));
    }

    if response.hovered()
        && let Some(pointer) = hover
    {
        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        view.scrolled(pointer, scroll);
    }
}

fn draw_background(painter: &Painter, rect: Rect, transform: ViewTransform) {
    painter.rect_filled(rect, 0.0, BACKGROUND);

    let step = (56.0 * transform.k.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.min + vec2(transform.x, transform.y);
    let stroke = Stroke::new(1.0, GRID_LINE);

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

pub fn paint_scene(painter: &Painter, rect: Rect, scene: &Scene) {
    let offset = rect.min.to_vec2();
    let zoom = scene.zoom;

    for edge in &scene.edges {
        let (from, to) = (edge.from + offset, edge.to + offset);
        if !edge_visible(rect, from, to, edge.width) {
            continue;
        }
        painter.line_segment([from, to], Stroke::new(edge.width, edge.color));
    }

    let label_size = 11.0 * zoom.clamp(0.8, 1.6);
    for node in &scene.nodes {
        let center = node.center + offset;
        let reach = node.radius + (PULSE_OFFSET + 2.0) * zoom;
        if node.opacity <= 0.0 || !circle_visible(rect, center, reach) {
            continue;
        }

        painter.circle_filled(
            center,
            node.radius + 5.0 * zoom,
            with_opacity(node.core, 0.12 * node.opacity),
        );
        if let Some(ring) = node.ring {
            painter.circle_stroke(
                center,
                node.radius + RING_OFFSET * zoom,
                Stroke::new(2.0 * zoom, with_opacity(ring, node.opacity.max(0.6))),
            );
        }
        if let Some(pulse) = node.pulse {
            painter.circle_stroke(
                center,
                node.radius + PULSE_OFFSET * zoom,
                Stroke::new(1.5 * zoom, pulse),
            );
        }

        painter.circle_filled(center, node.radius, with_opacity(node.fill, node.opacity));
        painter.circle_filled(
            center - vec2(0.15, 0.2) * node.radius,
            node.radius * 0.55,
            with_opacity(node.core, node.opacity),
        );
        painter.circle_stroke(center, node.radius, node.stroke);

        if node.is_root || zoom >= 0.6 {
            painter.text(
                center + vec2(0.0, node.radius + 12.0 * zoom),
                Align2::CENTER_TOP,
                &node.label,
                FontId::proportional(label_size),
                with_opacity(node.label_color, node.opacity.max(0.35)),
            );
        }
    }

    if let Some(tooltip) = &scene.tooltip {
        paint_tooltip(painter, rect, tooltip);
    }
}

fn paint_tooltip(painter: &Painter, rect: Rect, scene_tooltip: &SceneTooltip) {
    let tooltip = &scene_tooltip.tooltip;
    let title = painter.layout_no_wrap(
        tooltip.title.clone(),
        FontId::proportional(13.0),
        Color32::from_rgb(0xf1, 0xf5, 0xf9),
    );
    let subject = painter.layout_no_wrap(
        tooltip.subject.clone(),
        FontId::proportional(11.0),
        Color32::from_rgb(0x94, 0xa3, 0xb8),
    );
    let mastery = painter.layout_no_wrap(
        tooltip.mastery.clone(),
        FontId::proportional(12.0),
        tooltip.mastery_color,
    );
    let last_studied = painter.layout_no_wrap(
        tooltip.last_studied.clone(),
        FontId::proportional(12.0),
        Color32::from_rgb(0x64, 0x74, 0x8b),
    );

    let swatch = 8.0;
    let line_gap = 3.0;
    let subject_width = subject.size().x + swatch + 6.0;
    let content = vec2(
        title
            .size()
            .x
            .max(subject_width)
            .max(mastery.size().x)
            .max(last_studied.size().x),
        title.size().y + subject.size().y + mastery.size().y + last_studied.size().y + line_gap * 3.0,
    );
    let size = content + TOOLTIP_PADDING * 2.0;

    let pointer = scene_tooltip.pointer + rect.min.to_vec2();
    let frame = Rect::from_min_size(place_tooltip(pointer, size, rect), size);
    painter.rect_filled(frame, 8.0, TOOLTIP_FILL);
    painter.rect_stroke(frame, 8.0, Stroke::new(1.0, TOOLTIP_BORDER), StrokeKind::Inside);

    let mut cursor = frame.min + TOOLTIP_PADDING;
    let title_height = title.size().y;
    painter.galley(cursor, title, Color32::WHITE);
    cursor.y += title_height + line_gap;

    let subject_height = subject.size().y;
    painter.circle_filled(
        cursor + vec2(swatch * 0.5, subject_height * 0.5),
        swatch * 0.5,
        tooltip.subject_color,
    );
    painter.galley(cursor + vec2(swatch + 6.0, 0.0), subject, Color32::WHITE);
    cursor.y += subject_height + line_gap;

    let mastery_height = mastery.size().y;
    painter.galley(cursor, mastery, Color32::WHITE);
    cursor.y += mastery_height + line_gap;

    painter.galley(cursor, last_studied, Color32::WHITE);
}

pub(crate) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

pub(crate) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let min_x = start.x.min(end.x) - padding;
    let max_x = start.x.max(end.x) + padding;
    let min_y = start.y.min(end.y) - padding;
    let max_y = start.y.max(end.y) + padding;

    if max_x < rect.left() || min_x > rect.right() || max_y < rect.top() || min_y > rect.bottom() {
        return false;
    }

    if rect.contains(start) || rect.contains(end) {
        return true;
    }

    let corners = [
        rect.left_top(),
        rect.right_top(),
        rect.right_bottom(),
        rect.left_bottom(),
    ];
    (0..4).any(|side| segments_intersect(start, end, corners[side], corners[(side + 1) % 4]))
}

fn segments_intersect(a1: Pos2, a2: Pos2, b1: Pos2, b2: Pos2) -> bool {
    fn cross(o: Pos2, a: Pos2, b: Pos2) -> f32 {
        let oa = a - o;
        let ob = b - o;
        (oa.x * ob.y) - (oa.y * ob.x)
    }

    let straddles = |c1: f32, c2: f32| (c1 <= 0.0 && c2 >= 0.0) || (c1 >= 0.0 && c2 <= 0.0);
    straddles(cross(a1, a2, b1), cross(a1, a2, b2))
        && straddles(cross(b1, b2, a1), cross(b1, b2, a2))
}
