//! # tn3270wright
//!
//! Scriptable automation for IBM 3270 applications.
//!
//! tn3270wright drives an [s3270](https://x3270.miraheze.org/wiki/S3270) emulator
//! process over its stdin/stdout scripting protocol. The emulator owns the TN3270
//! connection and screen model; this crate frames commands, reads replies, and
//! adds validated key/cursor helpers and polling waits on top.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tn3270wright::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let tn = Client::new();
//!
//!     tn.connect("localhost", 2023, Some(30)).await?;
//!     tn.wait_for_field(None).await?;
//!     tn.wait_for_text("Userid", Some(Duration::from_secs(10))).await?;
//!
//!     tn.type_text("IBMUSER").await?;
//!     tn.tab().await?;
//!     tn.type_text("SYS1").await?;
//!     tn.send_command("", true).await?;
//!
//!     println!("{}", tn.print_screen().await?);
//!
//!     tn.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`client`]: the client, its builder and the command vocabulary
//! - [`session`]: emulator process lifecycle
//! - [`protocol`]: wire format of commands and replies
//! - [`wait`]: polling waits on screen content
//! - [`input`]: keys and argument validation
//! - [`screen`]: screen snapshots
//! - [`output`]: screenshot files
//! - [`steps`] / [`runner`]: YAML/JSON step scripts

pub mod client;
pub mod error;
pub mod input;
pub mod output;
pub mod protocol;
pub mod runner;
pub mod screen;
pub mod session;
pub mod steps;
pub mod wait;

pub mod prelude;

// Re-export main types at crate root
pub use client::{Client, ClientBuilder, ClientConfig};
pub use error::{Result, Tn3270Error};
pub use input::Key;
pub use screen::Screen;
