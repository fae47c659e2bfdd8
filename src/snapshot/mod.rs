mod filter;
mod load;
mod model;

pub use filter::{TierStats, filter_cross_subject_edges};
pub use load::{load_snapshot, load_subject_colors};
pub use model::{Edge, MasteryTier, Node, Snapshot};
