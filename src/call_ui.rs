//! Call-management UI integration.
//!
//! Registers the app with the platform's native call screen (CallKit on iOS,
//! ConnectionService on Android) and reports the user's call actions. The
//! matcher does not depend on any of this; actions are only logged.

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// iOS display settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IosCallUiConfig {
    pub app_name: String,
}

/// Android phone-account prompt settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndroidCallUiConfig {
    pub alert_title: String,
    pub alert_description: String,
    pub cancel_button: String,
    pub ok_button: String,
    #[serde(default)]
    pub additional_permissions: Vec<String>,
}

/// Platform display configuration passed to setup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallUiConfig {
    pub ios: IosCallUiConfig,
    pub android: AndroidCallUiConfig,
}

impl Default for CallUiConfig {
    fn default() -> Self {
        Self {
            ios: IosCallUiConfig {
                app_name: "CallWatch".to_string(),
            },
            android: AndroidCallUiConfig {
                alert_title: "Permissions required".to_string(),
                alert_description: "This application needs to access your phone accounts".to_string(),
                cancel_button: "Cancel".to_string(),
                ok_button: "ok".to_string(),
                additional_permissions: Vec::new(),
            },
        }
    }
}

/// User action on the native call screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallAction {
    DidReceiveStartCallAction,
    AnswerCall,
    EndCall,
}

impl fmt::Display for CallAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CallAction::DidReceiveStartCallAction => "Incoming call",
            CallAction::AnswerCall => "Answered call",
            CallAction::EndCall => "Ended call",
        };
        f.write_str(label)
    }
}

/// Native call-management service
#[async_trait]
pub trait CallUiProvider: Send + Sync {
    async fn setup(&self, config: &CallUiConfig) -> Result<()>;

    /// Toggle whether the app can receive calls
    async fn set_available(&self, available: bool) -> Result<()>;

    async fn subscribe(&self) -> Result<mpsc::Receiver<CallAction>>;
}

/// Set up the call UI and mark the app available
///
/// Returns whether setup succeeded. Failures are logged and never propagated.
pub async fn setup_call_ui(provider: &dyn CallUiProvider, config: &CallUiConfig) -> bool {
    if let Err(e) = provider.setup(config).await {
        warn!("Call UI setup error: {}", e);
        return false;
    }

    match provider.set_available(true).await {
        Ok(()) => {
            info!("Call UI set up successfully");
            true
        }
        Err(e) => {
            warn!("Call UI availability could not be set: {}", e);
            false
        }
    }
}

/// Log every action received on `actions` until the sender side closes
pub fn spawn_action_logger(mut actions: mpsc::Receiver<CallAction>) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut count = 0;
        while let Some(action) = actions.recv().await {
            info!("{}", action);
            count += 1;
        }
        count
    })
}
