use std::collections::HashMap;

use eframe::egui::Color32;

use crate::snapshot::Node;

pub const STRONG_THRESHOLD: f32 = 0.7;
pub const WEAK_THRESHOLD: f32 = 0.5;
/// Ring offset from the node's rendered radius.
pub const RING_OFFSET: f32 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComparisonClass {
    SelfStrongPartnerWeak,
    PartnerStrongSelfWeak,
    BothWeak,
    BothStrong,
}

impl ComparisonClass {
    /// First matching rule wins; mid-range pairs get no class.
    pub fn classify(own_score: f32, partner_score: f32) -> Option<Self> {
        let own_strong = own_score >= STRONG_THRESHOLD;
        let own_weak = own_score < WEAK_THRESHOLD;
        let partner_strong = partner_score >= STRONG_THRESHOLD;
        let partner_weak = partner_score < WEAK_THRESHOLD;

        if own_strong && partner_weak {
            Some(Self::SelfStrongPartnerWeak)
        } else if partner_strong && own_weak {
            Some(Self::PartnerStrongSelfWeak)
        } else if own_weak && partner_weak {
            Some(Self::BothWeak)
        } else if own_strong && partner_strong {
            Some(Self::BothStrong)
        } else {
            None
        }
    }

    pub fn ring_color(self) -> Color32 {
        match self {
            Self::SelfStrongPartnerWeak => Color32::from_rgb(0x38, 0xbd, 0xf8),
            Self::PartnerStrongSelfWeak => Color32::from_rgb(0xfb, 0x92, 0x3c),
            Self::BothWeak => Color32::from_rgb(0xf8, 0x71, 0x71),
            Self::BothStrong => Color32::from_rgb(0x34, 0xd3, 0x99),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::SelfStrongPartnerWeak => "You can teach",
            Self::PartnerStrongSelfWeak => "Partner can teach",
            Self::BothWeak => "Both weak",
            Self::BothStrong => "Both strong",
        }
    }
}

/// Partner mastery keyed by display name, since ids differ between users.
#[derive(Clone, Debug, Default)]
pub struct PartnerIndex {
    scores: HashMap<String, f32>,
}

impl PartnerIndex {
    pub fn from_nodes(partner_nodes: &[Node]) -> Self {
        let mut scores = HashMap::with_capacity(partner_nodes.len());
        for node in partner_nodes {
            scores
                .entry(node.concept_name.clone())
                .or_insert(node.mastery_score);
        }
        Self { scores }
    }

    pub fn partner_score(&self, concept_name: &str) -> Option<f32> {
        self.scores.get(concept_name).copied()
    }

    pub fn classify(&self, node: &Node) -> Option<ComparisonClass> {
        let partner = self.partner_score(&node.concept_name)?;
        ComparisonClass::classify(node.mastery_score, partner)
    }
}
