//! One-way UDP side channel for formrelay submissions.
//!
//! The [`DatagramNotifier`] fires a copy of each submission at a fixed port
//! and forgets about it. The [`DatagramListener`] sits on that port and logs
//! whatever arrives. Nothing is acknowledged and nothing is retried.

pub mod error;
pub mod listener;
pub mod notifier;

pub use error::{Error, Result};
pub use listener::{Datagram, DatagramListener};
pub use notifier::DatagramNotifier;
