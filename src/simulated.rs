//! In-process providers for development and testing.
//!
//! These stand in for the native permission, contact, call-detection and
//! call-UI services so the whole boot sequence can be driven from the CLI or
//! from tests with scripted events.

use crate::contacts::{Contact, ContactSource};
use crate::detection::{
    CallDetectionProvider, DenialCallback, DetectionHandle, EventCallback, PermissionPrompt,
};
use crate::matcher::{CallEvent, RawCallEvent};
use crate::permissions::{Capability, PermissionOutcome, PermissionProvider, PermissionReport};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

/// Permission provider with fixed answers
#[derive(Debug, Clone, Default)]
pub struct StaticPermissions {
    denied: BTreeSet<Capability>,
    unavailable: bool,
}

impl StaticPermissions {
    /// Grant everything
    pub fn granting_all() -> Self {
        Self::default()
    }

    /// Grant everything except `capabilities`
    pub fn denying(capabilities: &[Capability]) -> Self {
        Self {
            denied: capabilities.iter().copied().collect(),
            unavailable: false,
        }
    }

    /// Fail every request, as a platform without a permission service would
    pub fn unavailable() -> Self {
        Self {
            denied: BTreeSet::new(),
            unavailable: true,
        }
    }

    fn outcome(&self, capability: Capability) -> PermissionOutcome {
        if self.denied.contains(&capability) {
            PermissionOutcome::Denied
        } else {
            PermissionOutcome::Granted
        }
    }
}

#[async_trait]
impl PermissionProvider for StaticPermissions {
    async fn request_multiple(&self, capabilities: &[Capability]) -> Result<PermissionReport> {
        if self.unavailable {
            return Err(Error::Configuration {
                reason: "permission service unavailable".to_string(),
            });
        }

        let mut report = PermissionReport::new();
        for capability in capabilities {
            report.record(*capability, self.outcome(*capability));
        }
        Ok(report)
    }

    async fn check(&self, capability: Capability) -> Result<PermissionOutcome> {
        if self.unavailable {
            return Err(Error::Configuration {
                reason: "permission service unavailable".to_string(),
            });
        }
        Ok(self.outcome(capability))
    }
}

/// Contact source returning a fixed list
#[derive(Debug, Clone, Default)]
pub struct StaticContactSource {
    contacts: Vec<Contact>,
}

impl StaticContactSource {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self { contacts }
    }
}

#[async_trait]
impl ContactSource for StaticContactSource {
    async fn fetch_all_without_photos(&self) -> Result<Vec<Contact>> {
        Ok(self.contacts.clone())
    }
}

/// Contact source whose fetch always fails
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingContactSource;

#[async_trait]
impl ContactSource for FailingContactSource {
    async fn fetch_all_without_photos(&self) -> Result<Vec<Contact>> {
        Err(Error::DirectoryLoad {
            reason: "contact provider unavailable".to_string(),
        })
    }
}

#[derive(Default)]
struct DetectorState {
    listener: Option<(Uuid, EventCallback)>,
    registrations: usize,
    disposals: usize,
    fail_registration: bool,
    deny: bool,
    capture_number: Option<bool>,
    prompt: Option<PermissionPrompt>,
}

/// Call-detection provider driven by explicit `emit` calls
///
/// Clones share the same listener, so a test can keep one clone and hand
/// another to the code under test.
#[derive(Clone, Default)]
pub struct ScriptedCallDetector {
    inner: Arc<Mutex<DetectorState>>,
}

impl ScriptedCallDetector {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, DetectorState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make subsequent registrations fail
    pub fn fail_registration(&self, fail: bool) {
        self.state().fail_registration = fail;
    }

    /// Invoke the denial callback on subsequent registrations
    pub fn deny_access(&self, deny: bool) {
        self.state().deny = deny;
    }

    /// Deliver an event to the registered listener
    ///
    /// Returns `false` when nobody is listening. Numbers are blanked when the
    /// listener registered without number capture.
    pub fn emit(&self, event: CallEvent) -> bool {
        let mut state = self.state();
        let capture_number = state.capture_number.unwrap_or(true);
        let event = if capture_number {
            event
        } else {
            match event {
                CallEvent::Incoming(_) => CallEvent::Incoming(String::new()),
                CallEvent::Offhook(_) => CallEvent::Offhook(String::new()),
                other => other,
            }
        };

        match state.listener.as_mut() {
            Some((id, callback)) => {
                debug!("Delivering {} to registration {}", event, id);
                callback(event);
                true
            }
            None => false,
        }
    }

    /// Parse and deliver a raw listener notification
    pub fn emit_raw(&self, raw: RawCallEvent) -> Result<bool> {
        let event = CallEvent::try_from(raw)?;
        Ok(self.emit(event))
    }

    pub fn registrations(&self) -> usize {
        self.state().registrations
    }

    pub fn disposals(&self) -> usize {
        self.state().disposals
    }

    pub fn active_registrations(&self) -> usize {
        let state = self.state();
        state.registrations - state.disposals
    }

    pub fn is_listening(&self) -> bool {
        self.state().listener.is_some()
    }

    pub fn last_prompt(&self) -> Option<PermissionPrompt> {
        self.state().prompt.clone()
    }

    pub fn last_capture_number(&self) -> Option<bool> {
        self.state().capture_number
    }
}

#[async_trait]
impl CallDetectionProvider for ScriptedCallDetector {
    async fn register(
        &self,
        on_event: EventCallback,
        capture_number: bool,
        on_denied: DenialCallback,
        prompt: &PermissionPrompt,
    ) -> Result<Box<dyn DetectionHandle>> {
        let (id, deny) = {
            let mut state = self.state();
            if state.fail_registration {
                return Err(Error::DetectionRegistration {
                    reason: "scripted registration failure".to_string(),
                });
            }

            let id = Uuid::new_v4();
            state.listener = Some((id, on_event));
            state.registrations += 1;
            state.capture_number = Some(capture_number);
            state.prompt = Some(prompt.clone());
            (id, state.deny)
        };

        if deny {
            on_denied();
        }

        Ok(Box::new(ScriptedHandle {
            id,
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct ScriptedHandle {
    id: Uuid,
    inner: Arc<Mutex<DetectorState>>,
}

impl DetectionHandle for ScriptedHandle {
    fn id(&self) -> Uuid {
        self.id
    }

    fn dispose(self: Box<Self>) {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(state.listener, Some((id, _)) if id == self.id) {
            state.listener = None;
        }
        state.disposals += 1;
    }
}

#[cfg(feature = "call-ui")]
pub use self::call_ui::LoggingCallUi;

#[cfg(feature = "call-ui")]
mod call_ui {
    use crate::call_ui::{CallAction, CallUiConfig, CallUiProvider};
    use crate::{Error, Result};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex, PoisonError};
    use tokio::sync::mpsc;
    use tracing::info;

    #[derive(Default)]
    struct CallUiState {
        configured: Option<CallUiConfig>,
        available: bool,
        subscribers: Vec<mpsc::Sender<CallAction>>,
        fail_setup: bool,
    }

    /// Call-UI integration that records calls and forwards scripted actions
    #[derive(Clone, Default)]
    pub struct LoggingCallUi {
        inner: Arc<Mutex<CallUiState>>,
    }

    impl LoggingCallUi {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make setup fail
        pub fn failing() -> Self {
            let ui = Self::default();
            ui.inner.lock().unwrap_or_else(PoisonError::into_inner).fail_setup = true;
            ui
        }

        pub fn is_available(&self) -> bool {
            self.inner.lock().unwrap_or_else(PoisonError::into_inner).available
        }

        pub fn configured(&self) -> Option<CallUiConfig> {
            self.inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .configured
                .clone()
        }

        /// Whether any subscriber is still receiving actions
        pub fn has_listeners(&self) -> bool {
            self.inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .subscribers
                .iter()
                .any(|subscriber| !subscriber.is_closed())
        }

        /// Deliver an action to every subscriber
        pub async fn trigger(&self, action: CallAction) {
            let subscribers = self
                .inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .subscribers
                .clone();
            for subscriber in subscribers {
                let _ = subscriber.send(action).await;
            }
        }
    }

    #[async_trait]
    impl CallUiProvider for LoggingCallUi {
        async fn setup(&self, config: &CallUiConfig) -> Result<()> {
            let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            if state.fail_setup {
                return Err(Error::Configuration {
                    reason: "call UI setup rejected".to_string(),
                });
            }
            info!("Call UI configured for {}", config.ios.app_name);
            state.configured = Some(config.clone());
            Ok(())
        }

        async fn set_available(&self, available: bool) -> Result<()> {
            self.inner.lock().unwrap_or_else(PoisonError::into_inner).available = available;
            Ok(())
        }

        async fn subscribe(&self) -> Result<mpsc::Receiver<CallAction>> {
            let (sender, receiver) = mpsc::channel(16);
            self.inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .subscribers
                .push(sender);
            Ok(receiver)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_permissions() {
        let provider = StaticPermissions::denying(&[Capability::ReadContacts]);

        assert_eq!(
            provider.check(Capability::ReadContacts).await.unwrap(),
            PermissionOutcome::Denied
        );
        assert_eq!(
            provider.check(Capability::ReadPhoneState).await.unwrap(),
            PermissionOutcome::Granted
        );
        assert!(StaticPermissions::unavailable()
            .check(Capability::ReadPhoneState)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_emit_without_listener() {
        let detector = ScriptedCallDetector::new();
        assert!(!detector.emit(CallEvent::Missed));
        assert!(!detector.is_listening());
    }

    #[tokio::test]
    async fn test_denied_registration_calls_denial_callback() {
        let detector = ScriptedCallDetector::new();
        detector.deny_access(true);

        let denied = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&denied);
        let handle = detector
            .register(
                Box::new(|_: CallEvent| {}),
                true,
                Box::new(move || *flag.lock().unwrap() = true),
                &PermissionPrompt::default(),
            )
            .await
            .unwrap();

        assert!(*denied.lock().unwrap());
        handle.dispose();
        assert_eq!(detector.active_registrations(), 0);
    }

    #[tokio::test]
    async fn test_numbers_blank_without_capture() {
        let detector = ScriptedCallDetector::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let _handle = detector
            .register(
                Box::new(move |event: CallEvent| sink.lock().unwrap().push(event)),
                false,
                Box::new(|| {}),
                &PermissionPrompt::default(),
            )
            .await
            .unwrap();

        detector.emit(CallEvent::Incoming("5551234567".to_string()));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![CallEvent::Incoming(String::new())]
        );
    }

    #[tokio::test]
    async fn test_emit_raw_rejects_unknown_kind() {
        let detector = ScriptedCallDetector::new();
        let result = detector.emit_raw(RawCallEvent::new("Ringing", None));
        assert!(matches!(result, Err(Error::UnknownEventKind { .. })));
    }
}
