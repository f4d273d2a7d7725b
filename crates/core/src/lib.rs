//! Run an action once, at a random moment inside a bounded time window.
//!
//! ```no_run
//! use std::time::Duration;
//! use jitter_core::Executor;
//!
//! let ex = Executor::new("1.5s", Some(7))?;
//! let v = ex.execute(|| Ok::<_, std::io::Error>(42), Some(Duration::from_secs(3)))?;
//! assert_eq!(v, 42);
//!
//! let pending = ex.execute_async(|| Ok::<_, std::io::Error>("later"));
//! assert_eq!(pending.get(None)?, "later");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod duration;
pub mod error;
pub mod executor;
pub mod handle;
pub mod logger;
pub mod planner;
pub mod settings;
pub mod types;

pub use duration::{format_duration, parse_duration, IntoBudget};
pub use error::{ConfigError, ExecutionError};
pub use executor::Executor;
pub use handle::{Outcome, ResultHandle};
pub use planner::DelayPlanner;
pub use settings::Settings;
pub use types::{ErrorKind, Level};
