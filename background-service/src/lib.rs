//! Autonomous forum posting on a randomized schedule.

pub mod interval;
pub mod runtime;
pub mod scheduler;

pub use interval::{FixedInterval, IntervalSource, RandomInterval};
pub use runtime::AgentRuntime;
pub use scheduler::{ForumPostScheduler, DEFAULT_TOPICS};
