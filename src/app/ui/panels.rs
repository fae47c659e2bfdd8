use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use chrono::Utc;
use eframe::egui::{self, Align, Color32, Context, Layout, RichText};
use tracing::{debug, info};

use crate::graph::{self, GraphProps, KnowledgeGraphView};
use crate::snapshot::{Node, Snapshot, TierStats, filter_cross_subject_edges};
use crate::util::format_relative_time;

use super::super::{LoadedData, Settings, ViewModel};

impl ViewModel {
    pub(in crate::app) fn new(data: LoadedData, settings: &Settings) -> Self {
        let mut view = KnowledgeGraphView::new(settings.seed);
        let clicked = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&clicked);
        view.set_on_node_click(move |node: &Node| {
            *sink.borrow_mut() = Some(node.clone());
        });

        let snapshot = Arc::new(data.snapshot);
        let stats = TierStats::from_nodes(&snapshot.nodes);
        info!(
            concepts = stats.total,
            subjects = stats.subjects,
            partner = data.partner.is_some(),
            "knowledge map ready"
        );

        Self {
            view,
            displayed: Arc::clone(&snapshot),
            snapshot,
            snapshot_revision: 0,
            show_comparison: data.partner.is_some(),
            partner: data.partner.map(Arc::from),
            subject_colors: Arc::new(data.subject_colors),
            stats,
            loaded_at: Utc::now(),
            reload_error: None,
            interactive: settings.interactive,
            animate: settings.animate,
            hide_cross_subject: false,
            search: String::new(),
            search_cache: None,
            highlight_id: settings.highlight.clone(),
            clicked,
            selected: None,
            show_fps_bar: true,
            fps_current: 0.0,
            fps_samples: VecDeque::new(),
        }
    }

    /// Feeds a freshly read snapshot into the existing view so only the
    /// delta animates.
    pub(in crate::app) fn apply(&mut self, data: LoadedData) {
        self.reload_error = None;
        self.loaded_at = Utc::now();
        self.subject_colors = Arc::new(data.subject_colors);
        if data.partner.is_none() {
            self.show_comparison = false;
        }
        self.partner = data.partner.map(Arc::from);

        if *self.snapshot == data.snapshot {
            debug!("reloaded snapshot is unchanged");
            return;
        }

        self.snapshot = Arc::new(data.snapshot);
        self.stats = TierStats::from_nodes(&self.snapshot.nodes);
        self.refresh_displayed();

        if let Some(selected) = self.selected.as_mut()
            && let Some(fresh) = self.snapshot.node(&selected.id)
        {
            *selected = fresh.clone();
        }
    }

    pub(in crate::app) fn refresh_displayed(&mut self) {
        self.displayed = if self.hide_cross_subject {
            let edges = filter_cross_subject_edges(&self.snapshot.nodes, &self.snapshot.edges);
            Arc::new(Snapshot::new(self.snapshot.nodes.clone(), edges))
        } else {
            Arc::clone(&self.snapshot)
        };
        self.snapshot_revision += 1;
        self.search_cache = None;
    }

    pub(in crate::app) fn graph_props(&self) -> GraphProps {
        GraphProps {
            snapshot: Arc::clone(&self.displayed),
            interactive: self.interactive,
            animate: self.animate,
            highlight_id: self.highlight_id.clone(),
            partner: self.partner.clone().filter(|_| self.show_comparison),
            subject_colors: Arc::clone(&self.subject_colors),
            ..GraphProps::default()
        }
    }

    pub(in crate::app) fn select(&mut self, node: Node) {
        self.highlight_id = Some(node.id.clone());
        self.selected = Some(node);
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        source: &str,
        reload_requested: &mut bool,
        is_reloading: bool,
    ) {
        self.update_fps_counter(ctx);

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("Sapling Map");
                    ui.separator();
                    ui.label(format!("snapshot: {source}"));
                    ui.label(format!("concepts: {}", self.stats.total));
                    ui.label(format!("subjects: {}", self.stats.subjects));
                    ui.label(format!(
                        "mastered {} / learning {} / struggling {} / unexplored {}",
                        self.stats.mastered,
                        self.stats.learning,
                        self.stats.struggling,
                        self.stats.unexplored
                    ));
                    ui.label(format!(
                        "loaded {}",
                        format_relative_time(Some(self.loaded_at), Utc::now()).to_lowercase()
                    ));

                    let reload_button = ui.add_enabled(!is_reloading, egui::Button::new("Reload"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    if ui.button("Reset view").clicked() {
                        self.view.reset_view();
                    }

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let Some(fps_text) = self.fps_display_text() {
                            ui.label(fps_text);
                        }
                        ui.label(self.graph_status_text());
                        if let Some(error) = &self.reload_error {
                            ui.label(RichText::new(error).color(Color32::from_rgb(0xf8, 0x71, 0x71)))
                                .on_hover_text("The last reload failed; the map shows the previous snapshot.");
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                if self.displayed.is_empty() {
                    ui.centered_and_justified(|ui| {
                        ui.label("This snapshot has no concepts yet.");
                    });
                    return;
                }
                let props = self.graph_props();
                graph::show_graph(ui, &mut self.view, props);
            });

        let clicked = self.clicked.borrow_mut().take();
        if let Some(node) = clicked {
            self.select(node);
        }
    }
}
