//! Application session: the startup sequence tying the providers together.
//!
//! Startup runs in a fixed order: request permissions, load the contact
//! directory, set up the call UI. Detection is started afterwards, so the
//! directory is complete before the first event can arrive.

#[cfg(feature = "background")]
use crate::background::{BackgroundExecutor, BackgroundService, BackgroundTaskOptions};
#[cfg(feature = "call-ui")]
use crate::call_ui::{self, CallUiConfig, CallUiProvider};
use crate::contacts::{self, ContactDirectory, ContactSource};
use crate::detection::{CallDetectionProvider, CallMonitor, DetectionOptions};
use crate::matcher::CallStatus;
use crate::permissions::{self, Capability, PermissionProvider, PermissionReport};
use crate::{Error, Result};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
#[cfg(feature = "call-ui")]
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// One app session with its providers and detection state
pub struct CallSession {
    permissions: Arc<dyn PermissionProvider>,
    contacts: Arc<dyn ContactSource>,
    monitor: Arc<Mutex<CallMonitor>>,
    status: watch::Receiver<CallStatus>,
    report: PermissionReport,
    #[cfg(feature = "call-ui")]
    call_ui: Option<(Arc<dyn CallUiProvider>, CallUiConfig)>,
    #[cfg(feature = "call-ui")]
    action_logger: Option<JoinHandle<usize>>,
    #[cfg(feature = "background")]
    background: Option<BackgroundService>,
}

impl CallSession {
    pub fn new(
        permissions: Arc<dyn PermissionProvider>,
        contacts: Arc<dyn ContactSource>,
        detector: Arc<dyn CallDetectionProvider>,
        options: DetectionOptions,
    ) -> Self {
        let monitor = CallMonitor::new(detector, options);
        let status = monitor.subscribe();
        Self {
            permissions,
            contacts,
            monitor: Arc::new(Mutex::new(monitor)),
            status,
            report: PermissionReport::new(),
            #[cfg(feature = "call-ui")]
            call_ui: None,
            #[cfg(feature = "call-ui")]
            action_logger: None,
            #[cfg(feature = "background")]
            background: None,
        }
    }

    /// Register the native call screen integration
    #[cfg(feature = "call-ui")]
    pub fn with_call_ui(mut self, provider: Arc<dyn CallUiProvider>, config: CallUiConfig) -> Self {
        self.call_ui = Some((provider, config));
        self
    }

    /// Run detection inside a background task instead of in the foreground
    #[cfg(feature = "background")]
    pub fn with_background(
        mut self,
        executor: Arc<dyn BackgroundExecutor>,
        options: BackgroundTaskOptions,
    ) -> Self {
        self.background = Some(BackgroundService::new(
            executor,
            Arc::clone(&self.monitor),
            options,
        ));
        self
    }

    /// Request permissions, load contacts and set up the call UI
    pub async fn initialize(&mut self) -> &PermissionReport {
        self.report =
            permissions::request_capabilities(self.permissions.as_ref(), &Capability::ALL).await;

        let contacts = self.refresh_directory().await;
        info!(
            "Session initialized: {} contacts, {} capabilities denied",
            contacts,
            self.report.denied().len()
        );

        #[cfg(feature = "call-ui")]
        if let Some((provider, config)) = &self.call_ui {
            if call_ui::setup_call_ui(provider.as_ref(), config).await {
                match provider.subscribe().await {
                    Ok(actions) => self.action_logger = Some(call_ui::spawn_action_logger(actions)),
                    Err(e) => warn!("Call UI actions unavailable: {}", e),
                }
            }
        }

        &self.report
    }

    /// Fetch the directory again and replace the current one
    ///
    /// Contact access is checked before every fetch; without it the
    /// directory is empty.
    pub async fn refresh_directory(&self) -> usize {
        let directory = match self.permissions.check(Capability::ReadContacts).await {
            Ok(outcome) if outcome.is_granted() => {
                contacts::load_directory(self.contacts.as_ref()).await
            }
            Ok(outcome) => {
                warn!(
                    "{} {}; caller matching disabled",
                    Capability::ReadContacts,
                    outcome
                );
                ContactDirectory::empty()
            }
            Err(e) => {
                warn!("{} check failed: {}", Capability::ReadContacts, e);
                ContactDirectory::empty()
            }
        };

        let count = directory.len();
        self.monitor.lock().await.replace_directory(directory);
        count
    }

    /// Start call detection, in the background when configured
    pub async fn start_detection(&self) -> Result<()> {
        if !self.report.is_granted(Capability::ReadPhoneState) {
            warn!("{} not granted; call detection stays off", Capability::ReadPhoneState);
            return Err(Error::PermissionDenied {
                capability: Capability::ReadPhoneState,
            });
        }

        #[cfg(feature = "background")]
        if let Some(background) = &self.background {
            info!("Starting call detection in background task {}", background.options().task_name);
            return background.start().await;
        }

        self.monitor.lock().await.start().await
    }

    /// Stop call detection and release the detection handle
    pub async fn stop_detection(&self) -> Result<()> {
        #[cfg(feature = "background")]
        if let Some(background) = &self.background {
            return background.stop().await;
        }

        self.monitor.lock().await.stop();
        Ok(())
    }

    /// Stop detection and tear down the call-UI listener
    ///
    /// The listener is torn down even when stopping detection fails.
    pub async fn shutdown(mut self) -> Result<()> {
        #[cfg(feature = "call-ui")]
        if let Some(logger) = self.action_logger.take() {
            logger.abort();
            let _ = logger.await;
        }

        self.stop_detection().await
    }

    pub fn permissions(&self) -> &PermissionReport {
        &self.report
    }

    /// Receiver notified on every status change
    pub fn status(&self) -> watch::Receiver<CallStatus> {
        self.status.clone()
    }

    pub fn current_status(&self) -> CallStatus {
        self.status.borrow().clone()
    }

    pub async fn is_detecting(&self) -> bool {
        self.monitor.lock().await.is_running()
    }

    pub async fn contact_count(&self) -> usize {
        self.monitor.lock().await.directory().len()
    }
}
