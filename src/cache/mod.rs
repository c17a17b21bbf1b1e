// Local chat cache module
// Author: kelexine (https://github.com/kelexine)

pub mod counters;
pub mod manager;
pub mod model_state;
pub mod models;
pub mod records;

pub use counters::CountersStore;
pub use manager::Cacher;
pub use model_state::{ModelState, ModelStateStore};
pub use models::{HistoryRead, Record, Role, SkippedLine, TokenCounters};
pub use records::{LineRecordStore, DEFAULT_DROP_COUNT};
