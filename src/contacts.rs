//! Contact directory loaded from the device's contact provider.
//!
//! The directory is fetched once per session, after the contact permission
//! has been granted, and is never mutated afterwards. A refresh builds a new
//! directory and swaps it in as a whole.

use crate::number::NormalizedNumber;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A single contact as reported by the contact provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub display_name: String,
    #[serde(default)]
    pub phone_numbers: Vec<PhoneNumberEntry>,
}

/// Phone number as stored in the contact book, separators included
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumberEntry {
    #[serde(default)]
    pub label: String,
    pub number: String,
}

impl Contact {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            phone_numbers: Vec::new(),
        }
    }

    /// Add a phone number entry
    pub fn with_number(mut self, label: impl Into<String>, number: impl Into<String>) -> Self {
        self.phone_numbers.push(PhoneNumberEntry {
            label: label.into(),
            number: number.into(),
        });
        self
    }

    /// Whether any of this contact's numbers normalizes to `number`
    pub fn has_number(&self, number: &NormalizedNumber) -> bool {
        self.phone_numbers
            .iter()
            .any(|entry| NormalizedNumber::normalize(&entry.number) == *number)
    }
}

/// Immutable, ordered snapshot of the device contacts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactDirectory {
    contacts: Vec<Contact>,
}

impl ContactDirectory {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self { contacts }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Total number of phone entries across all contacts
    pub fn number_count(&self) -> usize {
        self.contacts.iter().map(|c| c.phone_numbers.len()).sum()
    }

    /// First contact owning `number`, scanning in directory order
    pub fn find_caller(&self, number: &NormalizedNumber) -> Option<&Contact> {
        self.contacts.iter().find(|contact| contact.has_number(number))
    }
}

impl From<Vec<Contact>> for ContactDirectory {
    fn from(contacts: Vec<Contact>) -> Self {
        Self::new(contacts)
    }
}

/// Source of device contacts
#[async_trait]
pub trait ContactSource: Send + Sync {
    /// Fetch every contact, without photos
    async fn fetch_all_without_photos(&self) -> Result<Vec<Contact>>;
}

/// Fetch the directory once; a failed fetch yields the empty directory
pub async fn load_directory(source: &dyn ContactSource) -> ContactDirectory {
    match source.fetch_all_without_photos().await {
        Ok(contacts) => {
            let directory = ContactDirectory::new(contacts);
            info!(
                "Loaded {} contacts ({} phone numbers)",
                directory.len(),
                directory.number_count()
            );
            directory
        }
        Err(e) => {
            warn!("Contact directory unavailable, continuing without contacts: {}", e);
            ContactDirectory::empty()
        }
    }
}

/// Contact source backed by a JSON export of the contact book
#[derive(Debug, Clone)]
pub struct JsonContactSource {
    path: PathBuf,
}

impl JsonContactSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

#[async_trait]
impl ContactSource for JsonContactSource {
    async fn fetch_all_without_photos(&self) -> Result<Vec<Contact>> {
        debug!("Reading contacts from {}", self.path.display());

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::DirectoryLoad {
                reason: format!("{}: {}", self.path.display(), e),
            })?;

        serde_json::from_str(&content).map_err(|e| Error::DirectoryLoad {
            reason: format!("{}: {}", self.path.display(), e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::number::normalize;
    use crate::simulated::{FailingContactSource, StaticContactSource};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample_directory() -> ContactDirectory {
        ContactDirectory::new(vec![
            Contact::new("Alice").with_number("mobile", "(555) 123-4567"),
            Contact::new("Bob")
                .with_number("home", "+39 06 1234 5678")
                .with_number("work", "555-000-1111"),
        ])
    }

    #[test]
    fn test_find_caller_matches_formatted_entries() {
        let directory = sample_directory();

        let alice = directory.find_caller(&normalize("5551234567")).unwrap();
        assert_eq!(alice.display_name, "Alice");

        let bob = directory.find_caller(&normalize("5550001111")).unwrap();
        assert_eq!(bob.display_name, "Bob");

        assert!(directory.find_caller(&normalize("9999999999")).is_none());
    }

    #[test]
    fn test_find_caller_has_no_partial_matches() {
        let directory = sample_directory();

        assert!(directory.find_caller(&normalize("1234567")).is_none());
        assert!(directory.find_caller(&normalize("+15551234567")).is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let directory = ContactDirectory::new(vec![
            Contact::new("First").with_number("mobile", "555 0100"),
            Contact::new("Second").with_number("mobile", "555-0100"),
        ]);

        let caller = directory.find_caller(&normalize("5550100")).unwrap();
        assert_eq!(caller.display_name, "First");
    }

    #[test]
    fn test_number_count() {
        assert_eq!(sample_directory().number_count(), 3);
        assert_eq!(ContactDirectory::empty().number_count(), 0);
    }

    #[test]
    fn test_contact_json_shape() {
        let json = r#"[
            {"displayName": "Alice", "phoneNumbers": [{"label": "mobile", "number": "(555) 123-4567"}]},
            {"displayName": "No Numbers"}
        ]"#;

        let contacts: Vec<Contact> = serde_json::from_str(json).unwrap();
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].phone_numbers[0].label, "mobile");
        assert!(contacts[1].phone_numbers.is_empty());
    }

    #[tokio::test]
    async fn test_load_directory_from_source() {
        let source = StaticContactSource::new(sample_directory().contacts().to_vec());
        let directory = load_directory(&source).await;

        assert_eq!(directory, sample_directory());
    }

    #[tokio::test]
    async fn test_load_failure_yields_empty_directory() {
        let directory = load_directory(&FailingContactSource).await;
        assert!(directory.is_empty());
    }

    #[tokio::test]
    async fn test_json_contact_source() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("contacts.json");
        let contacts = sample_directory().contacts().to_vec();
        tokio::fs::write(&path, serde_json::to_string(&contacts).unwrap())
            .await
            .unwrap();

        let source = JsonContactSource::new(&path);
        let loaded = source.fetch_all_without_photos().await.unwrap();
        assert_eq!(loaded, contacts);
    }

    #[tokio::test]
    async fn test_json_contact_source_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let source = JsonContactSource::new(&temp_dir.path().join("missing.json"));

        let result = source.fetch_all_without_photos().await;
        assert!(matches!(result, Err(Error::DirectoryLoad { .. })));
        assert!(load_directory(&source).await.is_empty());
    }
}
