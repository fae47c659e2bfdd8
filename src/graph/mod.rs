pub mod comparison;
pub mod diff;
pub mod drift;
pub mod encoding;
pub mod interaction;
pub mod layout;
pub mod paint;
pub mod scene;
pub mod scheduler;
pub mod view;

pub use drift::DriftConfig;
pub use layout::LayoutConfig;
pub use paint::show_graph;
pub use view::{GraphProps, KnowledgeGraphView, ViewPhase};
