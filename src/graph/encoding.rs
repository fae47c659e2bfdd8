//! Mapping from domain state (subject, mastery tier, mastery score) to
//! radius, color and opacity. Every function here is total: malformed input
//! falls back to a palette default instead of failing.

use eframe::egui::Color32;

use crate::snapshot::{MasteryTier, Node};

pub const MIN_NODE_RADIUS: f32 = 7.0;
pub const MAX_NODE_RADIUS: f32 = 14.0;
pub const SUBJECT_ROOT_RADIUS: f32 = 22.0;

pub const PRESET_SUBJECT_COLORS: [Color32; 10] = [
    Color32::from_rgb(0x25, 0x63, 0xeb),
    Color32::from_rgb(0x7c, 0x3a, 0xed),
    Color32::from_rgb(0xdb, 0x27, 0x77),
    Color32::from_rgb(0xea, 0x58, 0x0c),
    Color32::from_rgb(0x05, 0x96, 0x69),
    Color32::from_rgb(0x08, 0x91, 0xb2),
    Color32::from_rgb(0xca, 0x8a, 0x04),
    Color32::from_rgb(0x4f, 0x46, 0xe5),
    Color32::from_rgb(0xdc, 0x26, 0x26),
    Color32::from_rgb(0x65, 0xa3, 0x0d),
];

const BACKGROUND_TINT_ALPHA: u8 = 31;
const BORDER_TINT_ALPHA: u8 = 89;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubjectColor {
    pub fill: Color32,
    pub background: Color32,
    pub border: Color32,
    pub text: Color32,
}

impl SubjectColor {
    pub fn from_fill(fill: Color32) -> Self {
        let (r, g, b) = (fill.r(), fill.g(), fill.b());
        Self {
            fill,
            background: Color32::from_rgba_unmultiplied(r, g, b, BACKGROUND_TINT_ALPHA),
            border: Color32::from_rgba_unmultiplied(r, g, b, BORDER_TINT_ALPHA),
            text: contrasting_text(fill),
        }
    }
}

/// Accepts only the strict `#rrggbb` form.
pub fn parse_hex_color(raw: &str) -> Option<Color32> {
    let digits = raw.strip_prefix('#')?;
    if digits.len() != 6 || !digits.bytes().all(|byte| byte.is_ascii_hexdigit()) {
        return None;
    }

    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
    Some(Color32::from_rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

pub fn color_for_subject(subject: &str, override_hex: Option<&str>) -> SubjectColor {
    if let Some(fill) = override_hex.and_then(parse_hex_color) {
        return SubjectColor::from_fill(fill);
    }

    SubjectColor::from_fill(PRESET_SUBJECT_COLORS[subject_palette_index(subject)])
}

fn subject_palette_index(subject: &str) -> usize {
    let hash = subject.chars().fold(0_i32, |hash, ch| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(ch as i32)
    });
    hash.unsigned_abs() as usize % PRESET_SUBJECT_COLORS.len()
}

fn contrasting_text(fill: Color32) -> Color32 {
    let luminance =
        (0.299 * fill.r() as f32 + 0.587 * fill.g() as f32 + 0.114 * fill.b() as f32) / 255.0;
    let factor = if luminance > 0.6 { 0.35 } else { 0.6 };
    Color32::from_rgb(
        (fill.r() as f32 * factor) as u8,
        (fill.g() as f32 * factor) as u8,
        (fill.b() as f32 * factor) as u8,
    )
}

pub fn opacity_for_tier(tier: &MasteryTier) -> f32 {
    match tier {
        MasteryTier::Mastered | MasteryTier::SubjectRoot => 1.0,
        MasteryTier::Learning => 0.75,
        MasteryTier::Struggling => 0.55,
        MasteryTier::Unexplored => 0.28,
        MasteryTier::Other(_) => 0.65,
    }
}

pub fn radius_for_score(mastery_score: f32) -> f32 {
    let score = if mastery_score.is_finite() {
        mastery_score.clamp(0.0, 1.0)
    } else {
        0.0
    };
    MIN_NODE_RADIUS + score * (MAX_NODE_RADIUS - MIN_NODE_RADIUS)
}

pub fn radius_for_node(node: &Node) -> f32 {
    if node.is_root() {
        SUBJECT_ROOT_RADIUS
    } else {
        radius_for_score(node.mastery_score)
    }
}

pub fn mastery_color(tier: &MasteryTier) -> Color32 {
    match tier {
        MasteryTier::Mastered => Color32::from_rgb(0x16, 0xa3, 0x4a),
        MasteryTier::Learning => Color32::from_rgb(0xd9, 0x77, 0x06),
        MasteryTier::Struggling => Color32::from_rgb(0xdc, 0x26, 0x26),
        MasteryTier::Unexplored => Color32::from_rgb(0x6b, 0x72, 0x80),
        MasteryTier::SubjectRoot => Color32::from_rgb(0x7c, 0x3a, 0xed),
        MasteryTier::Other(_) => Color32::from_rgb(0x47, 0x55, 0x69),
    }
}

pub fn mastery_highlight_color(tier: &MasteryTier) -> Color32 {
    match tier {
        MasteryTier::Mastered => Color32::from_rgb(0x86, 0xef, 0xac),
        MasteryTier::Learning => Color32::from_rgb(0xfd, 0xe6, 0x8a),
        MasteryTier::Struggling => Color32::from_rgb(0xfc, 0xa5, 0xa5),
        MasteryTier::Unexplored => Color32::from_rgb(0xe2, 0xe8, 0xf0),
        MasteryTier::SubjectRoot => Color32::from_rgb(0xdd, 0xd6, 0xfe),
        MasteryTier::Other(_) => Color32::from_rgb(0x94, 0xa3, 0xb8),
    }
}

pub fn edge_width(strength: f32) -> f32 {
    0.5 + strength.clamp(0.0, 1.0) * 1.2
}
