//! # callwatch
//!
//! Call detection core for companion telephony apps: turns the platform's
//! call-state notifications into a single caller status and tells whether the
//! caller is in the device's contact book.
//!
//! ## Features
//!
//! - **Number matching**: separator-insensitive comparison of caller numbers against contacts
//! - **Call state machine**: `Incoming`/`Offhook`/`Disconnected`/`Missed` folded into one status record
//! - **Detection lifecycle**: exactly one listener registration, released on stop
//! - **Call UI integration**: native call-screen setup and action logging (`call-ui` feature)
//! - **Background execution**: detection kept alive in a background task (`background` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use callwatch::contacts::{Contact, ContactDirectory};
//! use callwatch::matcher::{on_event, CallEvent, CallStatus};
//!
//! let directory = ContactDirectory::new(vec![
//!     Contact::new("Alice").with_number("mobile", "(555) 123-4567"),
//! ]);
//!
//! let status = on_event(
//!     &CallEvent::Incoming("5551234567".to_string()),
//!     &directory,
//!     &CallStatus::idle(),
//! );
//! assert!(status.matches_contact);
//! ```

pub mod cli;
pub mod config;
pub mod contacts;
pub mod detection;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod number;
pub mod permissions;
pub mod session;
pub mod simulated;

#[cfg(feature = "background")]
pub mod background;

#[cfg(feature = "call-ui")]
pub mod call_ui;

// Re-export commonly used types
pub use contacts::{Contact, ContactDirectory, PhoneNumberEntry};
pub use detection::{CallDetectionProvider, CallMonitor, DetectionHandle};
pub use error::{Error, Result};
pub use matcher::{is_known_caller, on_event, CallEvent, CallStatus};
pub use number::{normalize, NormalizedNumber};
pub use session::CallSession;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
