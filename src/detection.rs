//! Call-detection registration and handle ownership.
//!
//! The platform listener is registered through a [`CallDetectionProvider`]
//! and hands back a [`DetectionHandle`]. [`CallMonitor`] owns at most one
//! handle at a time and releases it before registering again. Each event the
//! listener delivers runs through [`crate::matcher::on_event`] on the
//! listener's own thread, and the resulting [`CallStatus`] is published as a
//! whole on a `watch` channel.

use crate::contacts::ContactDirectory;
use crate::matcher::{self, CallEvent, CallStatus};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Callback invoked for every call state change
pub type EventCallback = Box<dyn FnMut(CallEvent) + Send + 'static>;

/// Callback invoked when the platform refuses phone-state access
pub type DenialCallback = Box<dyn FnOnce() + Send + 'static>;

/// Message shown when the platform asks the user for phone-state access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionPrompt {
    pub title: String,
    pub message: String,
}

impl Default for PermissionPrompt {
    fn default() -> Self {
        Self {
            title: "Phone State Permission".to_string(),
            message: "This app needs access to your phone state in order to react and/or to adapt to incoming calls."
                .to_string(),
        }
    }
}

/// Registration parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionOptions {
    /// Ask the listener to report phone numbers along with events
    pub capture_number: bool,
    pub prompt: PermissionPrompt,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            capture_number: true,
            prompt: PermissionPrompt::default(),
        }
    }
}

/// Platform call-state listener
#[async_trait]
pub trait CallDetectionProvider: Send + Sync {
    /// Register a listener; events flow to `on_event` until the handle is disposed
    async fn register(
        &self,
        on_event: EventCallback,
        capture_number: bool,
        on_denied: DenialCallback,
        prompt: &PermissionPrompt,
    ) -> Result<Box<dyn DetectionHandle>>;
}

/// An active listener registration
pub trait DetectionHandle: Send {
    /// Registration identifier, for logging
    fn id(&self) -> Uuid;

    /// Unregister the listener. Consumes the handle, so it runs at most once.
    fn dispose(self: Box<Self>);
}

/// Registration state owned by [`CallMonitor`]
pub enum DetectionState {
    Stopped,
    Running(Box<dyn DetectionHandle>),
}

impl fmt::Debug for DetectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionState::Stopped => write!(f, "Stopped"),
            DetectionState::Running(handle) => write!(f, "Running({})", handle.id()),
        }
    }
}

/// Owns the single detection registration and the published call status
pub struct CallMonitor {
    detector: Arc<dyn CallDetectionProvider>,
    options: DetectionOptions,
    directory: Arc<ContactDirectory>,
    status: Arc<watch::Sender<CallStatus>>,
    state: DetectionState,
}

impl CallMonitor {
    /// Create a stopped monitor with an empty directory
    pub fn new(detector: Arc<dyn CallDetectionProvider>, options: DetectionOptions) -> Self {
        let (status, _) = watch::channel(CallStatus::idle());
        Self {
            detector,
            options,
            directory: Arc::new(ContactDirectory::empty()),
            status: Arc::new(status),
            state: DetectionState::Stopped,
        }
    }

    pub fn with_directory(mut self, directory: ContactDirectory) -> Self {
        self.directory = Arc::new(directory);
        self
    }

    /// Swap in a freshly loaded directory
    ///
    /// A running registration keeps matching against the directory it started
    /// with; the new one is used from the next [`CallMonitor::start`].
    pub fn replace_directory(&mut self, directory: ContactDirectory) {
        if self.is_running() {
            debug!("Directory replaced while detection is running; applies after restart");
        }
        self.directory = Arc::new(directory);
    }

    pub fn directory(&self) -> &ContactDirectory {
        &self.directory
    }

    pub fn options(&self) -> &DetectionOptions {
        &self.options
    }

    /// Subscribe to status changes
    pub fn subscribe(&self) -> watch::Receiver<CallStatus> {
        self.status.subscribe()
    }

    /// Current status snapshot
    pub fn status(&self) -> CallStatus {
        self.status.borrow().clone()
    }

    pub fn state(&self) -> &DetectionState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, DetectionState::Running(_))
    }

    /// Register with the call-detection provider
    ///
    /// Any existing registration is disposed first and the status starts
    /// over from idle. On failure the monitor stays stopped.
    pub async fn start(&mut self) -> Result<()> {
        if let DetectionState::Running(handle) =
            std::mem::replace(&mut self.state, DetectionState::Stopped)
        {
            debug!("Releasing detection handle {} before re-registering", handle.id());
            handle.dispose();
        }
        self.status.send_replace(CallStatus::idle());

        let directory = Arc::clone(&self.directory);
        let status = Arc::clone(&self.status);
        let callback: EventCallback = Box::new(move |event: CallEvent| {
            status.send_modify(|current| {
                let next = matcher::on_event(&event, &directory, current);
                debug!(
                    "{} -> active={} caller={:?} known={}",
                    event, next.is_active, next.caller_number, next.matches_contact
                );
                *current = next;
            });
        });
        let on_denied: DenialCallback = Box::new(|| {
            warn!("Phone state access denied; no call events will be delivered");
        });

        let detector = Arc::clone(&self.detector);
        let prompt = self.options.prompt.clone();
        let registration = detector
            .register(callback, self.options.capture_number, on_denied, &prompt)
            .await;

        match registration {
            Ok(handle) => {
                info!(
                    "Call detection started (registration {}, {} contacts)",
                    handle.id(),
                    self.directory.len()
                );
                self.state = DetectionState::Running(handle);
                Ok(())
            }
            Err(e) => {
                warn!("Call detection registration failed: {}", e);
                Err(match e {
                    Error::DetectionRegistration { .. } => e,
                    other => Error::DetectionRegistration {
                        reason: other.to_string(),
                    },
                })
            }
        }
    }

    /// Release the registration and reset the status
    pub fn stop(&mut self) {
        match std::mem::replace(&mut self.state, DetectionState::Stopped) {
            DetectionState::Running(handle) => {
                let id = handle.id();
                handle.dispose();
                info!("Call detection stopped (registration {})", id);
            }
            DetectionState::Stopped => debug!("Call detection already stopped"),
        }
        self.status.send_replace(CallStatus::idle());
    }
}

impl Drop for CallMonitor {
    fn drop(&mut self) {
        if let DetectionState::Running(handle) =
            std::mem::replace(&mut self.state, DetectionState::Stopped)
        {
            debug!("Releasing detection handle {} on drop", handle.id());
            handle.dispose();
        }
    }
}

impl fmt::Debug for CallMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallMonitor")
            .field("options", &self.options)
            .field("contacts", &self.directory.len())
            .field("state", &self.state)
            .finish()
    }
}
