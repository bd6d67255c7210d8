//! Runtime permission gate.
//!
//! Capabilities are checked, never escalated: a denied capability switches the
//! dependent feature off and the rest of the session carries on.

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

/// Device capability needed by the call watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Capability {
    ReadCallLog,
    ProcessOutgoingCalls,
    ReadContacts,
    ReadPhoneState,
}

impl Capability {
    /// Every capability requested at startup, in request order
    pub const ALL: [Capability; 4] = [
        Capability::ReadCallLog,
        Capability::ProcessOutgoingCalls,
        Capability::ReadContacts,
        Capability::ReadPhoneState,
    ];

    /// Android permission identifier
    pub fn android_permission(&self) -> &'static str {
        match self {
            Capability::ReadCallLog => "android.permission.READ_CALL_LOG",
            Capability::ProcessOutgoingCalls => "android.permission.PROCESS_OUTGOING_CALLS",
            Capability::ReadContacts => "android.permission.READ_CONTACTS",
            Capability::ReadPhoneState => "android.permission.READ_PHONE_STATE",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.android_permission())
    }
}

/// Result of a permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionOutcome {
    Granted,
    Denied,
    NeverAskAgain,
}

impl PermissionOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionOutcome::Granted)
    }
}

impl fmt::Display for PermissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PermissionOutcome::Granted => "granted",
            PermissionOutcome::Denied => "denied",
            PermissionOutcome::NeverAskAgain => "never_ask_again",
        };
        f.write_str(label)
    }
}

/// Per-capability outcome of a batch request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionReport {
    outcomes: BTreeMap<Capability, PermissionOutcome>,
}

impl PermissionReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report in which every capability has the same outcome
    pub fn uniform(capabilities: &[Capability], outcome: PermissionOutcome) -> Self {
        let mut report = Self::new();
        for capability in capabilities {
            report.record(*capability, outcome);
        }
        report
    }

    pub fn record(&mut self, capability: Capability, outcome: PermissionOutcome) {
        self.outcomes.insert(capability, outcome);
    }

    /// Outcome for `capability`; capabilities never asked for count as denied
    pub fn outcome(&self, capability: Capability) -> PermissionOutcome {
        self.outcomes
            .get(&capability)
            .copied()
            .unwrap_or(PermissionOutcome::Denied)
    }

    pub fn is_granted(&self, capability: Capability) -> bool {
        self.outcome(capability).is_granted()
    }

    pub fn denied(&self) -> Vec<Capability> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| !outcome.is_granted())
            .map(|(capability, _)| *capability)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Capability, PermissionOutcome)> + '_ {
        self.outcomes.iter().map(|(c, o)| (*c, *o))
    }
}

/// Platform permission service
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Prompt for several capabilities at once
    async fn request_multiple(&self, capabilities: &[Capability]) -> Result<PermissionReport>;

    /// Check a capability without prompting
    async fn check(&self, capability: Capability) -> Result<PermissionOutcome>;
}

/// Request `capabilities`, logging each outcome
///
/// A failing provider is treated as having denied everything.
pub async fn request_capabilities(
    provider: &dyn PermissionProvider,
    capabilities: &[Capability],
) -> PermissionReport {
    match provider.request_multiple(capabilities).await {
        Ok(report) => {
            for capability in capabilities {
                info!("{}: {}", capability, report.outcome(*capability));
            }
            report
        }
        Err(e) => {
            warn!("Permission request failed: {}", e);
            PermissionReport::uniform(capabilities, PermissionOutcome::Denied)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::StaticPermissions;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_android_identifiers() {
        assert_eq!(
            Capability::ReadPhoneState.android_permission(),
            "android.permission.READ_PHONE_STATE"
        );
        assert_eq!(
            Capability::ProcessOutgoingCalls.to_string(),
            "android.permission.PROCESS_OUTGOING_CALLS"
        );
    }

    #[test]
    fn test_missing_capability_counts_as_denied() {
        let mut report = PermissionReport::new();
        report.record(Capability::ReadContacts, PermissionOutcome::Granted);

        assert!(report.is_granted(Capability::ReadContacts));
        assert!(!report.is_granted(Capability::ReadPhoneState));
        assert_eq!(report.outcome(Capability::ReadPhoneState), PermissionOutcome::Denied);
    }

    #[test]
    fn test_denied_lists_non_granted() {
        let mut report = PermissionReport::uniform(&Capability::ALL, PermissionOutcome::Granted);
        report.record(Capability::ReadCallLog, PermissionOutcome::NeverAskAgain);
        report.record(Capability::ReadContacts, PermissionOutcome::Denied);

        assert_eq!(
            report.denied(),
            vec![Capability::ReadCallLog, Capability::ReadContacts]
        );
    }

    #[tokio::test]
    async fn test_request_capabilities() {
        let provider = StaticPermissions::denying(&[Capability::ReadCallLog]);
        let report = request_capabilities(&provider, &Capability::ALL).await;

        assert!(!report.is_granted(Capability::ReadCallLog));
        assert!(report.is_granted(Capability::ReadContacts));
        assert!(report.is_granted(Capability::ReadPhoneState));
    }

    #[tokio::test]
    async fn test_failing_provider_denies_everything() {
        let provider = StaticPermissions::unavailable();
        let report = request_capabilities(&provider, &Capability::ALL).await;

        assert_eq!(report.denied().len(), Capability::ALL.len());
    }
}
