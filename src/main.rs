mod app;
mod graph;
mod snapshot;
mod util;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Knowledge-map snapshot: a JSON object with `nodes` and `edges`.
    snapshot: PathBuf,

    /// Second learner's snapshot for the comparison overlay.
    #[arg(long)]
    partner: Option<PathBuf>,

    /// JSON object mapping subject names to `#rrggbb` colors.
    #[arg(long)]
    subject_colors: Option<PathBuf>,

    /// Render without pan, zoom, drag or tooltips.
    #[arg(long = "static")]
    static_view: bool,

    /// Skip enter and tier-change transitions.
    #[arg(long)]
    no_animate: bool,

    /// Node id to pulse on startup.
    #[arg(long)]
    highlight: Option<String>,

    /// Re-read the snapshot every N seconds.
    #[arg(long, value_name = "SECS")]
    watch_secs: Option<u64>,

    /// Seed for reproducible layouts and drift.
    #[arg(long)]
    seed: Option<u64>,
}

impl From<Args> for app::Settings {
    fn from(args: Args) -> Self {
        Self {
            snapshot_path: args.snapshot,
            partner_path: args.partner,
            subject_colors_path: args.subject_colors,
            interactive: !args.static_view,
            animate: !args.no_animate,
            highlight: args.highlight,
            watch: args
                .watch_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            seed: args.seed,
        }
    }
}

fn main() -> eframe::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = app::Settings::from(Args::parse());
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Sapling Map",
        options,
        Box::new(move |cc| Ok(Box::new(app::SaplingMapApp::new(cc, settings)))),
    )
}
