use std::ops::RangeInclusive;

use eframe::egui::{self, Align, Color32, Key, Layout, Response, RichText, Ui, vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::graph::comparison::ComparisonClass;
use crate::graph::encoding::mastery_color;
use crate::graph::{DriftConfig, LayoutConfig};
use crate::snapshot::{MasteryTier, Node};
use crate::util::{mastery_label, short_label};

use super::super::{SearchCache, ViewModel};

const SEARCH_RESULT_LIMIT: usize = 25;
const ARROW_BASE_RATE: f32 = 10.0;
const ARROW_ACCEL_PER_SEC: f32 = 9.0;
const ARROW_ACCEL_MAX: f32 = 40.0;

fn fuzzy_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

/// Indices of nodes whose concept name or subject matches `query`, best
/// first. Subject hits rank below name hits.
pub(in crate::app) fn rank_matches(nodes: &[Node], query: &str) -> Vec<usize> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }

    let matcher = SkimMatcherV2::default();
    let mut scored = nodes
        .iter()
        .enumerate()
        .filter_map(|(index, node)| {
            let by_name = fuzzy_score(&matcher, &node.concept_name, query);
            let by_subject = fuzzy_score(&matcher, &node.subject, query).map(|score| score / 2);
            by_name.max(by_subject).map(|score| (index, score))
        })
        .collect::<Vec<_>>();
    scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    scored.into_iter().map(|(index, _)| index).collect()
}

/// Speed multiplier for an arrow key held for `hold_secs`.
fn arrow_accel(hold_secs: f32) -> f32 {
    let ramp = hold_secs * ARROW_ACCEL_PER_SEC;
    (1.0 + ramp + ramp * ramp * 0.15).min(ARROW_ACCEL_MAX)
}

#[derive(Clone, Copy, Default)]
struct ArrowHold {
    up_secs: f32,
    down_secs: f32,
}

/// Lets a focused slider be nudged with held arrow keys, speeding up the
/// longer a key stays down.
fn nudge_with_arrows(ui: &Ui, response: &Response, value: &mut f32, range: &RangeInclusive<f32>) -> bool {
    let state_id = response.id.with("arrow_hold");
    if !response.has_focus() {
        ui.ctx().data_mut(|data| data.remove::<ArrowHold>(state_id));
        return false;
    }

    let mut hold = ui
        .ctx()
        .data(|data| data.get_temp::<ArrowHold>(state_id))
        .unwrap_or_default();
    let (dt, up, down) = ui.input(|input| {
        (
            input.stable_dt.min(0.1),
            input.key_down(Key::ArrowRight) || input.key_down(Key::ArrowUp),
            input.key_down(Key::ArrowLeft) || input.key_down(Key::ArrowDown),
        )
    });
    hold.up_secs = if up { hold.up_secs + dt } else { 0.0 };
    hold.down_secs = if down { hold.down_secs + dt } else { 0.0 };
    ui.ctx().data_mut(|data| data.insert_temp(state_id, hold));

    let (direction, held) = match (up, down) {
        (true, false) => (1.0, hold.up_secs),
        (false, true) => (-1.0, hold.down_secs),
        _ => return false,
    };
    ui.ctx().request_repaint();

    let step = ((range.end() - range.start()) / 200.0).max(0.0005);
    let before = *value;
    *value = (*value + direction * step * ARROW_BASE_RATE * arrow_accel(held) * dt)
        .clamp(*range.start(), *range.end());
    (*value - before).abs() > f32::EPSILON
}

fn tuning_slider(
    ui: &mut Ui,
    value: &mut f32,
    range: RangeInclusive<f32>,
    text: &str,
    hover: &str,
) -> bool {
    let response = ui
        .add(
            egui::Slider::new(value, range.clone())
                .text(text)
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text(hover);
    if response.hovered() {
        response.request_focus();
    }
    let dragged = response.changed();
    dragged | nudge_with_arrows(ui, &response, value, &range)
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Map Controls");
        ui.separator();
        ui.add_space(4.0);

        ui.label("Search concepts")
            .on_hover_text("Fuzzy-match concept names and subjects, then pick one to highlight it.");
        ui.text_edit_singleline(&mut self.search);
        self.draw_search_results(ui);

        if self.highlight_id.is_some() && ui.button("Clear highlight").clicked() {
            self.highlight_id = None;
        }

        ui.separator();

        ui.checkbox(&mut self.interactive, "Interactive")
            .on_hover_text("Pan, zoom, drag nodes and show tooltips. Toggling rebuilds the layout.");
        ui.checkbox(&mut self.animate, "Animate changes")
            .on_hover_text("Fade in new concepts and blend tier changes after a reload.");
        if ui
            .checkbox(&mut self.hide_cross_subject, "Hide cross-subject links")
            .on_hover_text("Keep only links within one subject, plus links to subject roots.")
            .changed()
        {
            self.refresh_displayed();
        }
        ui.add_enabled_ui(self.partner.is_some(), |ui| {
            ui.checkbox(&mut self.show_comparison, "Compare with partner")
                .on_hover_text("Ring concepts by how your mastery compares to the partner map.")
                .on_disabled_hover_text("Start with --partner <snapshot> to enable.");
        });
        ui.checkbox(&mut self.show_fps_bar, "FPS display");

        ui.collapsing("Physics tuning", |ui| self.draw_physics_tuning(ui));
        ui.collapsing("Drift", |ui| self.draw_drift_tuning(ui));
        ui.collapsing("Legend", draw_legend);
    }

    fn draw_search_results(&mut self, ui: &mut Ui) {
        let stale = self.search_cache.as_ref().is_none_or(|cache| {
            cache.query != self.search || cache.snapshot_revision != self.snapshot_revision
        });
        if stale {
            self.search_cache = Some(SearchCache {
                query: self.search.clone(),
                snapshot_revision: self.snapshot_revision,
                matches: rank_matches(&self.displayed.nodes, &self.search),
            });
        }
        let Some(cache) = self.search_cache.as_ref() else {
            return;
        };
        if self.search.trim().is_empty() {
            return;
        }
        if cache.matches.is_empty() {
            ui.weak("No matching concepts.");
            return;
        }

        let mut picked = None;
        egui::ScrollArea::vertical()
            .id_salt("search_results")
            .max_height(200.0)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                for &index in cache.matches.iter().take(SEARCH_RESULT_LIMIT) {
                    let Some(node) = self.displayed.nodes.get(index) else {
                        continue;
                    };
                    let is_highlighted = self.highlight_id.as_deref() == Some(node.id.as_str());

                    let clicked = ui
                        .horizontal(|ui| {
                            let clicked = ui
                                .selectable_label(is_highlighted, short_label(&node.concept_name, 32))
                                .on_hover_text(node.subject.as_str())
                                .clicked();
                            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                                ui.label(
                                    RichText::new(mastery_label(node.mastery_score))
                                        .color(mastery_color(&node.mastery_tier)),
                                );
                            });
                            clicked
                        })
                        .inner;
                    if clicked {
                        picked = Some(node.clone());
                    }
                }
            });

        if cache.matches.len() > SEARCH_RESULT_LIMIT {
            ui.weak(format!(
                "{} more matches, refine the query",
                cache.matches.len() - SEARCH_RESULT_LIMIT
            ));
        }
        if let Some(node) = picked {
            self.select(node);
        }
    }

    fn draw_physics_tuning(&mut self, ui: &mut Ui) {
        let mut config = self.view.layout_config();
        let mut changed = false;

        changed |= tuning_slider(
            ui,
            &mut config.link_base_distance,
            20.0..=200.0,
            "Link distance",
            "Rest length of the strongest links.",
        );
        changed |= tuning_slider(
            ui,
            &mut config.link_distance_spread,
            0.0..=150.0,
            "Weak link stretch",
            "Extra rest length added as link strength drops toward zero.",
        );
        changed |= tuning_slider(
            ui,
            &mut config.link_strength_scale,
            0.0..=1.5,
            "Link pull",
            "How hard links pull toward their rest length.",
        );
        changed |= tuning_slider(
            ui,
            &mut config.charge_strength,
            0.0..=600.0,
            "Repulsion",
            "How strongly every pair of nodes pushes apart.",
        );
        changed |= tuning_slider(
            ui,
            &mut config.charge_theta,
            0.3..=1.5,
            "Approximation",
            "Barnes-Hut threshold. Lower is more precise and slower.",
        );
        changed |= tuning_slider(
            ui,
            &mut config.collision_padding,
            0.0..=30.0,
            "Collision padding",
            "Space kept around each orb.",
        );
        changed |= tuning_slider(
            ui,
            &mut config.collision_strength,
            0.0..=1.0,
            "Collision strength",
            "How firmly overlapping orbs are separated each tick.",
        );
        changed |= tuning_slider(
            ui,
            &mut config.axis_strength,
            0.0..=0.2,
            "Axis pull",
            "Pull toward the canvas center on each axis.",
        );
        changed |= tuning_slider(
            ui,
            &mut config.velocity_decay,
            0.05..=0.9,
            "Friction",
            "Fraction of velocity lost every tick.",
        );
        changed |= tuning_slider(
            ui,
            &mut config.alpha_decay,
            0.005..=0.1,
            "Cooling",
            "How quickly the layout comes to rest.",
        );

        if changed {
            self.view.set_layout_config(config);
        }

        ui.horizontal(|ui| {
            if ui.button("Reheat").clicked() {
                self.view.reheat();
            }
            if ui.button("Defaults").clicked() {
                self.view.set_layout_config(LayoutConfig::default());
            }
        });
    }

    fn draw_drift_tuning(&mut self, ui: &mut Ui) {
        let mut config = self.view.drift_config();
        let mut changed = false;

        changed |= tuning_slider(
            ui,
            &mut config.amplitude_min,
            0.0..=10.0,
            "Min amplitude",
            "Smallest idle sway, in pixels.",
        );
        changed |= tuning_slider(
            ui,
            &mut config.amplitude_max,
            0.0..=10.0,
            "Max amplitude",
            "Largest idle sway, in pixels.",
        );
        changed |= tuning_slider(
            ui,
            &mut config.frequency_min,
            0.0..=2.0,
            "Min speed",
            "Slowest sway, in radians per second.",
        );
        changed |= tuning_slider(
            ui,
            &mut config.frequency_max,
            0.0..=2.0,
            "Max speed",
            "Fastest sway, in radians per second.",
        );

        if changed {
            config.amplitude_max = config.amplitude_max.max(config.amplitude_min);
            config.frequency_max = config.frequency_max.max(config.frequency_min);
            self.view.set_drift_config(config);
        }
        if ui.button("Defaults").clicked() {
            self.view.set_drift_config(DriftConfig::default());
        }
    }
}

fn draw_legend(ui: &mut Ui) {
    let swatch = |ui: &mut Ui, color: Color32, text: &str| {
        ui.horizontal(|ui| {
            let (rect, _) = ui.allocate_exact_size(vec2(10.0, 10.0), egui::Sense::hover());
            ui.painter().circle_filled(rect.center(), 5.0, color);
            ui.label(text);
        });
    };

    for tier in [
        MasteryTier::Mastered,
        MasteryTier::Learning,
        MasteryTier::Struggling,
        MasteryTier::Unexplored,
        MasteryTier::SubjectRoot,
    ] {
        swatch(ui, mastery_color(&tier), tier.label());
    }

    ui.add_space(4.0);
    for class in [
        ComparisonClass::SelfStrongPartnerWeak,
        ComparisonClass::PartnerStrongSelfWeak,
        ComparisonClass::BothWeak,
        ComparisonClass::BothStrong,
    ] {
        swatch(ui, class.ring_color(), class.label());
    }
}
