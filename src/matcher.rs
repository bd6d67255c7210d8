//! Call event state machine.
//!
//! Native call listeners report a loosely typed `(kind, number)` pair. It is
//! parsed once at the boundary into [`CallEvent`], and every transition after
//! that is the pure function [`on_event`].

use crate::contacts::ContactDirectory;
use crate::number::NormalizedNumber;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Call state change reported by the call-detection provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "number")]
pub enum CallEvent {
    /// Phone is ringing
    Incoming(String),
    /// Call was picked up or dialed out
    Offhook(String),
    /// Call ended
    Disconnected,
    /// Incoming call rang out without being answered
    Missed,
}

/// Untyped notification as delivered by a native listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCallEvent {
    pub kind: String,
    #[serde(default)]
    pub number: Option<String>,
}

impl RawCallEvent {
    pub fn new(kind: impl Into<String>, number: Option<&str>) -> Self {
        Self {
            kind: kind.into(),
            number: number.map(str::to_string),
        }
    }
}

impl TryFrom<RawCallEvent> for CallEvent {
    type Error = Error;

    fn try_from(raw: RawCallEvent) -> Result<Self> {
        let number = raw.number.unwrap_or_default();
        match raw.kind.as_str() {
            "Incoming" => Ok(CallEvent::Incoming(number)),
            "Offhook" => Ok(CallEvent::Offhook(number)),
            "Disconnected" => Ok(CallEvent::Disconnected),
            "Missed" => Ok(CallEvent::Missed),
            _ => Err(Error::UnknownEventKind { kind: raw.kind }),
        }
    }
}

impl fmt::Display for CallEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallEvent::Incoming(number) => write!(f, "Incoming({})", number),
            CallEvent::Offhook(number) => write!(f, "Offhook({})", number),
            CallEvent::Disconnected => write!(f, "Disconnected"),
            CallEvent::Missed => write!(f, "Missed"),
        }
    }
}

/// UI-facing projection of the current call
///
/// Always replaced as a whole; fields are never updated one at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStatus {
    pub is_active: bool,
    pub caller_number: Option<NormalizedNumber>,
    pub matches_contact: bool,
}

/// Coarse call phase derived from a [`CallStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallPhase {
    Idle,
    RingingKnown,
    RingingUnknown,
    Active,
}

impl CallStatus {
    /// The reset status: no call, no caller, no match
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::idle()
    }
}

impl fmt::Display for CallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CallPhase::Idle => "idle",
            CallPhase::RingingKnown => "ringing-known",
            CallPhase::RingingUnknown => "ringing-unknown",
            CallPhase::Active => "active",
        };
        f.write_str(label)
    }
}

/// Phase reached by applying `event`
///
/// The status record alone cannot tell ringing from answered, so the phase is
/// derived from the event that produced it.
pub fn phase_after(event: &CallEvent, status: &CallStatus) -> CallPhase {
    match event {
        CallEvent::Incoming(_) if status.matches_contact => CallPhase::RingingKnown,
        CallEvent::Incoming(_) => CallPhase::RingingUnknown,
        CallEvent::Offhook(_) => CallPhase::Active,
        CallEvent::Disconnected | CallEvent::Missed => CallPhase::Idle,
    }
}

/// Whether `number` belongs to any contact in `directory`
pub fn is_known_caller(number: &NormalizedNumber, directory: &ContactDirectory) -> bool {
    directory.find_caller(number).is_some()
}

/// Apply one call event to the current status
pub fn on_event(event: &CallEvent, directory: &ContactDirectory, current: &CallStatus) -> CallStatus {
    match event {
        CallEvent::Incoming(raw) => {
            let number = NormalizedNumber::normalize(raw);
            let matches_contact = is_known_caller(&number, directory);
            CallStatus {
                is_active: true,
                caller_number: Some(number),
                matches_contact,
            }
        }
        // Offhook keeps the match computed while ringing; the directory is not queried again.
        CallEvent::Offhook(raw) => CallStatus {
            is_active: true,
            caller_number: Some(NormalizedNumber::normalize(raw)),
            matches_contact: current.matches_contact,
        },
        CallEvent::Disconnected | CallEvent::Missed => CallStatus::idle(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::Contact;
    use crate::number::normalize;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn alice_directory() -> ContactDirectory {
        ContactDirectory::new(vec![
            Contact::new("Alice").with_number("mobile", "(555) 123-4567")
        ])
    }

    fn ringing(number: &str, matches_contact: bool) -> CallStatus {
        CallStatus {
            is_active: true,
            caller_number: Some(normalize(number)),
            matches_contact,
        }
    }

    #[test]
    fn test_incoming_known_caller() {
        let status = on_event(
            &CallEvent::Incoming("5551234567".to_string()),
            &alice_directory(),
            &CallStatus::idle(),
        );

        assert_eq!(status, ringing("5551234567", true));
    }

    #[test]
    fn test_incoming_unknown_caller() {
        let status = on_event(
            &CallEvent::Incoming("9999999999".to_string()),
            &alice_directory(),
            &CallStatus::idle(),
        );

        assert_eq!(status, ringing("9999999999", false));
    }

    #[test]
    fn test_incoming_number_is_normalized() {
        let status = on_event(
            &CallEvent::Incoming("(555) 123-4567".to_string()),
            &alice_directory(),
            &CallStatus::idle(),
        );

        assert_eq!(status.caller_number.unwrap(), "5551234567");
        assert!(status.matches_contact);
    }

    #[test]
    fn test_offhook_keeps_previous_match() {
        let directory = alice_directory();
        let ringing = on_event(
            &CallEvent::Incoming("5551234567".to_string()),
            &directory,
            &CallStatus::idle(),
        );

        let answered = on_event(&CallEvent::Offhook("555-123-4567".to_string()), &directory, &ringing);
        assert!(answered.is_active);
        assert!(answered.matches_contact);
        assert_eq!(answered.caller_number.unwrap(), "5551234567");
    }

    #[test]
    fn test_offhook_does_not_query_directory() {
        // Outgoing call to a known contact: no Incoming first, so no match.
        let status = on_event(
            &CallEvent::Offhook("5551234567".to_string()),
            &alice_directory(),
            &CallStatus::idle(),
        );

        assert_eq!(status, ringing("5551234567", false));

        // And an unknown number inherits a stale match.
        let status = on_event(
            &CallEvent::Offhook("9999999999".to_string()),
            &alice_directory(),
            &ringing("5551234567", true),
        );
        assert!(status.matches_contact);
    }

    #[rstest]
    #[case(CallEvent::Disconnected)]
    #[case(CallEvent::Missed)]
    fn test_end_events_reset_status(#[case] event: CallEvent) {
        let priors = [
            CallStatus::idle(),
            ringing("5551234567", true),
            ringing("9999999999", false),
            CallStatus {
                is_active: false,
                caller_number: Some(normalize("1")),
                matches_contact: true,
            },
        ];

        for directory in [ContactDirectory::empty(), alice_directory()] {
            for prior in &priors {
                let status = on_event(&event, &directory, prior);
                assert_eq!(status, CallStatus::idle());
                assert!(status.is_idle());
            }
        }
    }

    #[test]
    fn test_empty_directory_never_matches() {
        let directory = ContactDirectory::empty();
        assert!(!is_known_caller(&normalize("5551234567"), &directory));
        assert!(!is_known_caller(&normalize(""), &directory));
    }

    #[test]
    fn test_is_known_caller_requires_exact_match() {
        let directory = alice_directory();
        assert!(is_known_caller(&normalize("5551234567"), &directory));
        assert!(!is_known_caller(&normalize("555123456"), &directory));
        assert!(!is_known_caller(&normalize("55512345678"), &directory));
    }

    #[rstest]
    #[case("Incoming", Some("555 0100"), CallEvent::Incoming("555 0100".to_string()))]
    #[case("Offhook", Some("5550100"), CallEvent::Offhook("5550100".to_string()))]
    #[case("Offhook", None, CallEvent::Offhook(String::new()))]
    #[case("Disconnected", Some("5550100"), CallEvent::Disconnected)]
    #[case("Missed", None, CallEvent::Missed)]
    fn test_parse_raw_event(#[case] kind: &str, #[case] number: Option<&str>, #[case] expected: CallEvent) {
        let event = CallEvent::try_from(RawCallEvent::new(kind, number)).unwrap();
        assert_eq!(event, expected);
    }

    #[test]
    fn test_parse_unknown_kind() {
        let result = CallEvent::try_from(RawCallEvent::new("Dialing", Some("1")));
        match result {
            Err(Error::UnknownEventKind { kind }) => assert_eq!(kind, "Dialing"),
            other => panic!("Unexpected result: {:?}", other),
        }

        // Kinds are matched exactly as the listener emits them
        assert!(CallEvent::try_from(RawCallEvent::new("incoming", None)).is_err());
    }

    #[test]
    fn test_phase_projection() {
        let directory = alice_directory();
        let known = CallEvent::Incoming("5551234567".to_string());
        let unknown = CallEvent::Incoming("9999999999".to_string());
        let offhook = CallEvent::Offhook("5551234567".to_string());

        let status = on_event(&known, &directory, &CallStatus::idle());
        assert_eq!(phase_after(&known, &status), CallPhase::RingingKnown);

        let status = on_event(&unknown, &directory, &CallStatus::idle());
        assert_eq!(phase_after(&unknown, &status), CallPhase::RingingUnknown);

        let status = on_event(&offhook, &directory, &status);
        assert_eq!(phase_after(&offhook, &status), CallPhase::Active);

        let status = on_event(&CallEvent::Missed, &directory, &status);
        assert_eq!(phase_after(&CallEvent::Missed, &status), CallPhase::Idle);
        assert_eq!(CallPhase::RingingKnown.to_string(), "ringing-known");
    }
}
