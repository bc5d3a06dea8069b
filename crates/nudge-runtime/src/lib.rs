//! Poll-driven runtime for the nudge reminder bridge: fetches labelled
//! issues, derives reminder commands from their threads, and dispatches
//! scheduling plus acknowledgement comments.

mod reminder_runtime;

pub use reminder_runtime::{PollCycleReport, ReminderBridgeConfig, ReminderBridgeRuntime};
