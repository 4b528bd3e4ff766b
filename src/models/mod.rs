pub mod hook;
pub mod state;

pub use hook::{CallObservation, HookJson, UsageSnapshot};
pub use state::{Counters, DailyState, HistoryEntry, SessionRecord};
