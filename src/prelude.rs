//! Convenient re-exports for common usage.
//!
//! ```rust
//! use tn3270wright::prelude::*;
//! ```

pub use crate::client::{Client, ClientBuilder, ClientConfig};
pub use crate::error::{Result, Tn3270Error};
pub use crate::input::Key;
pub use crate::screen::Screen;
pub use crate::session::SessionState;
pub use crate::wait::{WaitBuilder, WaitCondition};
pub use tokio_util::sync::CancellationToken;
