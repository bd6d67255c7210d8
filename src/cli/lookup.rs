//! Lookup command implementation.

use crate::contacts::{ContactDirectory, ContactSource, JsonContactSource};
use crate::number::normalize;
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the lookup command
#[derive(Args)]
pub struct LookupArgs {
    /// Contacts export (JSON array of contacts)
    #[arg(long)]
    pub contacts: PathBuf,

    /// Caller number to look up
    pub number: String,
}

/// Run the lookup command
pub async fn run(args: LookupArgs) -> anyhow::Result<()> {
    let contacts = JsonContactSource::new(&args.contacts)
        .fetch_all_without_photos()
        .await
        .with_context(|| format!("Failed to read contacts from {}", args.contacts.display()))?;
    let directory = ContactDirectory::new(contacts);

    println!("{}", describe(&directory, &args.number));
    Ok(())
}

/// One-line description of who is calling from `raw`
pub fn describe(directory: &ContactDirectory, raw: &str) -> String {
    let number = normalize(raw);
    match directory.find_caller(&number) {
        Some(contact) => {
            let entry = contact
                .phone_numbers
                .iter()
                .find(|entry| normalize(&entry.number) == number);
            match entry {
                Some(entry) if !entry.label.is_empty() => {
                    format!("{} -> {} ({}: {})", number, contact.display_name, entry.label, entry.number)
                }
                _ => format!("{} -> {}", number, contact.display_name),
            }
        }
        None => format!("{} -> unknown caller", number),
    }
}
