use chrono::Utc;
use eframe::egui::{self, Align, Layout, RichText, Ui, vec2};

use crate::graph::comparison::PartnerIndex;
use crate::graph::encoding::{color_for_subject, mastery_color};
use crate::snapshot::{Node, Snapshot};
use crate::util::{format_relative_time, mastery_label, short_label};

use super::super::ViewModel;

/// A concept linked to the selection, with the link's strength.
struct Neighbor<'a> {
    node: &'a Node,
    strength: f32,
}

/// Concepts sharing an edge with `id`, strongest link first.
fn neighbors<'a>(snapshot: &'a Snapshot, id: &str) -> Vec<Neighbor<'a>> {
    let mut found = snapshot
        .edges
        .iter()
        .filter_map(|edge| {
            let other = if edge.source == id {
                &edge.target
            } else if edge.target == id {
                &edge.source
            } else {
                return None;
            };
            snapshot.node(other).map(|node| Neighbor {
                node,
                strength: edge.strength,
            })
        })
        .collect::<Vec<_>>();
    found.sort_by(|a, b| b.strength.total_cmp(&a.strength));
    found
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Concept Details");
        ui.add_space(6.0);

        let Some(node) = self.selected.clone() else {
            ui.label("Click a concept on the map or pick one from the search results.");
            return;
        };

        let subject_color = color_for_subject(
            &node.subject,
            self.subject_colors.get(&node.subject).map(String::as_str),
        );

        ui.label(RichText::new(&node.concept_name).strong().size(16.0));
        ui.horizontal(|ui| {
            let (rect, _) = ui.allocate_exact_size(vec2(10.0, 10.0), egui::Sense::hover());
            ui.painter()
                .circle_filled(rect.center(), 5.0, subject_color.fill);
            ui.label(if node.subject.is_empty() {
                "No subject"
            } else {
                node.subject.as_str()
            });
        });
        ui.small(node.id.as_str());
        ui.add_space(6.0);

        ui.horizontal(|ui| {
            ui.label("Mastery:");
            ui.label(
                RichText::new(format!(
                    "{} ({})",
                    mastery_label(node.mastery_score),
                    node.mastery_tier.label()
                ))
                .color(mastery_color(&node.mastery_tier)),
            );
        });
        ui.label(format!("Times studied: {}", node.times_studied));
        ui.label(format!(
            "Last studied: {}",
            format_relative_time(node.last_studied_at, Utc::now())
        ));
        if let Some(position) = self.view.node_position(&node.id) {
            ui.weak(format!("Position: ({:.0}, {:.0})", position.x, position.y));
        } else {
            ui.colored_label(
                egui::Color32::from_rgb(0xfb, 0x92, 0x3c),
                "No longer in the current snapshot.",
            );
        }

        if self.show_comparison
            && let Some(partner) = self.partner.as_deref()
        {
            let index = PartnerIndex::from_nodes(partner);
            ui.separator();
            match index.partner_score(&node.concept_name) {
                Some(score) => {
                    ui.label(format!("Partner mastery: {}", mastery_label(score)));
                    if let Some(class) = index.classify(&node) {
                        ui.label(RichText::new(class.label()).color(class.ring_color()));
                    }
                }
                None => {
                    ui.weak("Partner has not studied this concept.");
                }
            }
        }

        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("Highlight").clicked() {
                self.highlight_id = Some(node.id.clone());
            }
            if ui.button("Clear selection").clicked() {
                self.selected = None;
            }
        });

        ui.add_space(6.0);
        ui.label(RichText::new("Linked concepts").strong());
        let linked = neighbors(&self.displayed, &node.id);
        if linked.is_empty() {
            ui.label("No links in the current view.");
            return;
        }

        let mut picked = None;
        egui::ScrollArea::vertical()
            .id_salt("linked_concepts")
            .auto_shrink([false, true])
            .show(ui, |ui| {
                for neighbor in &linked {
                    let clicked = ui
                        .horizontal(|ui| {
                            let clicked = ui
                                .selectable_label(false, short_label(&neighbor.node.concept_name, 30))
                                .clicked();
                            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                                ui.weak(format!("{:.2}", neighbor.strength));
                            });
                            clicked
                        })
                        .inner;
                    if clicked {
                        picked = Some(neighbor.node.clone());
                    }
                }
            });

        if let Some(next) = picked {
            self.select(next);
        }
    }
}
