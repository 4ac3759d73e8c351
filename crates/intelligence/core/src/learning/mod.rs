//! Tabular Q-learning.
//!
//! Q-tables are owned per species by the runtime; this module only supplies
//! the table representation and the pure operations applied to it:
//!
//! ```text
//! Q(s, a) ← Q(s, a) + α · (r + γ · max_a' Q(s', a') − Q(s, a))
//! ```

mod bellman;
mod history;
mod policy;
mod q_table;

pub use bellman::{LearningParams, QUpdate, apply_bellman, apply_terminal};
pub use history::{LearningHistory, LearningHistoryEntry};
pub use policy::{EpsilonGreedy, Selection, confidence, greedy_action};
pub use q_table::{QTable, QTableStats, QValues};
