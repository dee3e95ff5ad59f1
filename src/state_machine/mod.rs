// State machine module for the task lifecycle
//
// One status enum, one event enum, and one authoritative transition table.
// All lifecycle mutations route through transitions::apply inside a store
// compare-and-set so legality checks and effects commit atomically.

pub mod events;
pub mod states;
pub mod transitions;

// Re-export main types for convenient access
pub use events::TaskEvent;
pub use states::TaskStatus;
pub use transitions::{apply, target_status};
