use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use eframe::egui::{self, Context};
use tracing::warn;

use crate::graph::KnowledgeGraphView;
use crate::snapshot::{Node, Snapshot, TierStats, load_snapshot, load_subject_colors};

mod ui;

/// Startup options resolved from the command line.
#[derive(Clone, Debug)]
pub struct Settings {
    pub snapshot_path: PathBuf,
    pub partner_path: Option<PathBuf>,
    pub subject_colors_path: Option<PathBuf>,
    pub interactive: bool,
    pub animate: bool,
    pub highlight: Option<String>,
    pub watch: Option<Duration>,
    pub seed: Option<u64>,
}

/// Everything one background read produces.
struct LoadedData {
    snapshot: Snapshot,
    partner: Option<Vec<Node>>,
    subject_colors: HashMap<String, String>,
}

type LoadResult = Result<LoadedData, String>;

pub struct SaplingMapApp {
    settings: Settings,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
    last_load: Instant,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    view: KnowledgeGraphView,
    snapshot: Arc<Snapshot>,
    displayed: Arc<Snapshot>,
    snapshot_revision: u64,
    partner: Option<Arc<[Node]>>,
    subject_colors: Arc<HashMap<String, String>>,
    stats: TierStats,
    loaded_at: DateTime<Utc>,
    reload_error: Option<String>,
    interactive: bool,
    animate: bool,
    hide_cross_subject: bool,
    show_comparison: bool,
    search: String,
    search_cache: Option<SearchCache>,
    highlight_id: Option<String>,
    clicked: Rc<RefCell<Option<Node>>>,
    selected: Option<Node>,
    show_fps_bar: bool,
    fps_current: f32,
    fps_samples: VecDeque<f32>,
}

struct SearchCache {
    query: String,
    snapshot_revision: u64,
    /// Node indices into `displayed`, best match first.
    matches: Vec<usize>,
}

impl SaplingMapApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, settings: Settings) -> Self {
        let state = Self::start_load(&settings);
        Self {
            settings,
            state,
            reload_rx: None,
            last_load: Instant::now(),
        }
    }

    fn spawn_load(settings: &Settings) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();
        let settings = settings.clone();

        thread::spawn(move || {
            let _ = tx.send(read_inputs(&settings));
        });

        rx
    }

    fn start_load(settings: &Settings) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(settings),
        }
    }

    /// Stops the graph's frame callbacks before the view goes away.
    fn release_view(&mut self) {
        if let AppState::Ready(model) = &mut self.state {
            model.view.dispose();
            *model.clicked.borrow_mut() = None;
        }
    }
}

fn read_inputs(settings: &Settings) -> LoadResult {
    let snapshot = load_snapshot(&settings.snapshot_path).map_err(|error| error.to_string())?;

    let partner = match &settings.partner_path {
        Some(path) => Some(
            load_snapshot(path)
                .map_err(|error| error.to_string())?
                .nodes,
        ),
        None => None,
    };

    let subject_colors = match &settings.subject_colors_path {
        Some(path) => load_subject_colors(path).unwrap_or_else(|error| {
            warn!(error = %format!("{error:#}"), "using preset subject colors");
            HashMap::new()
        }),
        None => HashMap::new(),
    };

    Ok(LoadedData {
        snapshot,
        partner,
        subject_colors,
    })
}

impl eframe::App for SaplingMapApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(result) => {
                        transition = Some(match result {
                            Ok(data) => {
                                AppState::Ready(Box::new(ViewModel::new(data, &self.settings)))
                            }
                            Err(error) => AppState::Error(error),
                        });
                    }
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(AppState::Error(
                            "Background load worker disconnected".to_owned(),
                        ));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading knowledge map...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load knowledge map");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(&self.settings));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                let source = self.settings.snapshot_path.display().to_string();
                model.show(ctx, &source, &mut reload_requested, is_reloading);

                let mut watch_due = false;
                if let Some(interval) = self.settings.watch {
                    ctx.request_repaint_after(interval);
                    watch_due = self.last_load.elapsed() >= interval;
                }
                if (reload_requested || watch_due) && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(&self.settings));
                    self.last_load = Instant::now();
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(Ok(data)) => model.apply(data),
                        Ok(Err(error)) => {
                            warn!(error = %error, "reload failed, keeping current map");
                            model.reload_error = Some(error);
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                        }
                        Err(TryRecvError::Disconnected) => {
                            model.reload_error =
                                Some("Background load worker disconnected".to_owned());
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.release_view();
            self.reload_rx = None;
            self.last_load = Instant::now();
            self.state = next_state;
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.release_view();
        self.reload_rx = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::App;
    use eframe::egui::vec2;

    use crate::graph::{GraphProps, ViewPhase};
    use crate::snapshot::{Edge, MasteryTier};

    fn settings() -> Settings {
        Settings {
            snapshot_path: PathBuf::from("snapshot.json"),
            partner_path: None,
            subject_colors_path: None,
            interactive: true,
            animate: true,
            highlight: None,
            watch: None,
            seed: Some(3),
        }
    }

    fn loaded() -> LoadedData {
        LoadedData {
            snapshot: Snapshot::new(
                vec![
                    Node::new("a", "Limits", 0.8, MasteryTier::Mastered, "Math"),
                    Node::new("b", "Derivatives", 0.3, MasteryTier::Struggling, "Math"),
                ],
                vec![Edge::new("ab", "a", "b", 0.6)],
            ),
            partner: None,
            subject_colors: HashMap::new(),
        }
    }

    #[test]
    fn exit_disposes_the_graph_view() {
        let settings = settings();
        let mut model = ViewModel::new(loaded(), &settings);
        let props = GraphProps {
            size: vec2(800.0, 600.0),
            ..model.graph_props()
        };
        model.view.set_props(props);
        assert!(model.view.frame(0.0));
        assert!(!model.view.scheduler().is_idle());

        let mut app = SaplingMapApp {
            settings,
            state: AppState::Ready(Box::new(model)),
            reload_rx: None,
            last_load: Instant::now(),
        };
        app.on_exit(None);

        let AppState::Ready(model) = &mut app.state else {
            panic!("state changed on exit");
        };
        assert!(model.view.scheduler().is_idle());
        assert_eq!(model.view.phase(), ViewPhase::Uninitialized);
        assert!(!model.view.frame(1.0));
    }
}
