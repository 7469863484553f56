//! Patient display-name resolution.
//!
//! Identity metadata from the provider is often incomplete, so a profile is
//! resolved by an ordered chain of [`NameResolver`] strategies. The first
//! strategy that produces a profile wins; the last one always succeeds.

use crate::constants::{MISSING_EMAIL, PLACEHOLDER_EMAIL_DOMAIN};
use crate::models::{Identity, PatientProfile};
use crate::types::UserId;

/// One step of the resolution chain.
pub trait NameResolver: Send + Sync {
    fn resolve(&self, identity: &Identity) -> Option<PatientProfile>;
}

/// Uses `first_name` and `last_name` metadata when both are present.
pub struct MetadataNames;

/// Splits the `full_name` metadata field.
pub struct FullName;

/// Derives a name from the email local part (`jane.doe@` -> `Jane Doe`).
pub struct EmailLocalPart;

/// Synthesizes `Patient <id-prefix>`. Never fails.
pub struct Placeholder;

impl NameResolver for MetadataNames {
    fn resolve(&self, identity: &Identity) -> Option<PatientProfile> {
        let first = identity.metadata_str("first_name")?;
        let last = identity.metadata_str("last_name")?;
        Some(PatientProfile {
            id: identity.id,
            email: email_or_missing(identity),
            first_name: first.to_string(),
            last_name: last.to_string(),
            full_name: format!("{first} {last}"),
        })
    }
}

impl NameResolver for FullName {
    fn resolve(&self, identity: &Identity) -> Option<PatientProfile> {
        let full = identity.metadata_str("full_name")?;
        let mut parts = full.split(' ');
        let first = parts
            .next()
            .filter(|part| !part.is_empty())
            .unwrap_or("User");
        let last = parts.collect::<Vec<_>>().join(" ");
        Some(PatientProfile {
            id: identity.id,
            email: email_or_missing(identity),
            first_name: first.to_string(),
            last_name: last,
            full_name: full.to_string(),
        })
    }
}

impl NameResolver for EmailLocalPart {
    fn resolve(&self, identity: &Identity) -> Option<PatientProfile> {
        let email = identity.email()?;
        let (local, _) = email.split_once('@')?;
        let parts: Vec<&str> = local
            .split(|c: char| matches!(c, '.' | '_' | '-'))
            .collect();

        let (first, last) = if parts.len() >= 2 {
            (capitalize(parts[0]), capitalize(parts[1]))
        } else {
            (capitalize(local), String::new())
        };
        let full_name = if last.is_empty() {
            first.clone()
        } else {
            format!("{first} {last}")
        };

        Some(PatientProfile {
            id: identity.id,
            email: email.to_string(),
            first_name: first,
            last_name: last,
            full_name,
        })
    }
}

impl NameResolver for Placeholder {
    fn resolve(&self, identity: &Identity) -> Option<PatientProfile> {
        Some(placeholder_profile(identity.id))
    }
}

/// Resolution order used across the crate.
pub const DEFAULT_CHAIN: &[&dyn NameResolver] =
    &[&MetadataNames, &FullName, &EmailLocalPart, &Placeholder];

/// Resolve a profile with [`DEFAULT_CHAIN`].
pub fn resolve_profile(identity: &Identity) -> PatientProfile {
    resolve_with(DEFAULT_CHAIN, identity)
}

/// Resolve a profile with a custom chain, falling back to the placeholder
/// when no strategy matches.
pub fn resolve_with(chain: &[&dyn NameResolver], identity: &Identity) -> PatientProfile {
    chain
        .iter()
        .find_map(|resolver| resolver.resolve(identity))
        .unwrap_or_else(|| placeholder_profile(identity.id))
}

/// `Patient <short>` profile for a user with no usable identity data.
pub fn placeholder_profile(id: UserId) -> PatientProfile {
    let short = id.short();
    PatientProfile {
        id,
        email: placeholder_email(id),
        first_name: "Patient".to_string(),
        last_name: short.clone(),
        full_name: format!("Patient {short}"),
    }
}

/// Identity substituted when a per-user lookup fails. Resolves to the same
/// profile as [`placeholder_profile`].
pub fn placeholder_identity(id: UserId) -> Identity {
    let short = id.short();
    Identity::new(id)
        .with_email(placeholder_email(id))
        .with_metadata("first_name", "Patient")
        .with_metadata("last_name", short.clone())
        .with_metadata("full_name", format!("Patient {short}"))
}

fn placeholder_email(id: UserId) -> String {
    format!("patient-{}@{PLACEHOLDER_EMAIL_DOMAIN}", id.short())
}

fn email_or_missing(identity: &Identity) -> String {
    identity.email().unwrap_or(MISSING_EMAIL).to_string()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user() -> UserId {
        UserId(Uuid::parse_str("0f1e2d3c-4b5a-4978-8695-a4b3c2d1e0f9").unwrap())
    }

    #[test]
    fn test_metadata_names_win() {
        let identity = Identity::new(user())
            .with_email("someone@example.com")
            .with_metadata("first_name", "Ada")
            .with_metadata("last_name", "Lovelace")
            .with_metadata("full_name", "Countess Ada");

        let profile = resolve_profile(&identity);
        assert_eq!(profile.full_name, "Ada Lovelace");
        assert_eq!(profile.email, "someone@example.com");
    }

    #[test]
    fn test_full_name_split() {
        let identity = Identity::new(user()).with_metadata("full_name", "Grace Brewster Hopper");

        let profile = resolve_profile(&identity);
        assert_eq!(profile.first_name, "Grace");
        assert_eq!(profile.last_name, "Brewster Hopper");
        assert_eq!(profile.full_name, "Grace Brewster Hopper");
        assert_eq!(profile.email, MISSING_EMAIL);
    }

    #[test]
    fn test_first_name_alone_falls_through() {
        let identity = Identity::new(user())
            .with_email("alan_turing@example.com")
            .with_metadata("first_name", "Alan");

        let profile = resolve_profile(&identity);
        assert_eq!(profile.full_name, "Alan Turing");
    }

    #[test]
    fn test_email_local_part() {
        let single = Identity::new(user()).with_email("margaret@example.com");
        let profile = resolve_profile(&single);
        assert_eq!(profile.first_name, "Margaret");
        assert_eq!(profile.last_name, "");
        assert_eq!(profile.full_name, "Margaret");

        let dashed = Identity::new(user()).with_email("katherine-johnson-nasa@example.com");
        let profile = resolve_profile(&dashed);
        assert_eq!(profile.full_name, "Katherine Johnson");
    }

    #[test]
    fn test_email_without_at_is_ignored() {
        let identity = Identity::new(user()).with_email("not-an-email");
        let profile = resolve_profile(&identity);
        assert_eq!(profile, placeholder_profile(user()));
    }

    #[test]
    fn test_placeholder() {
        let profile = resolve_profile(&Identity::new(user()));
        assert_eq!(profile.full_name, "Patient 0f1e2d3c");
        assert_eq!(profile.first_name, "Patient");
        assert_eq!(profile.last_name, "0f1e2d3c");
        assert_eq!(profile.email, "patient-0f1e2d3c@app.com");
    }

    #[test]
    fn test_placeholder_identity_resolves_to_placeholder_profile() {
        let profile = resolve_profile(&placeholder_identity(user()));
        assert_eq!(profile, placeholder_profile(user()));
    }

    #[test]
    fn test_blank_and_non_string_metadata_are_ignored() {
        let mut identity = Identity::new(user())
            .with_metadata("first_name", "  ")
            .with_metadata("last_name", "Smith");
        identity
            .metadata
            .insert("full_name".into(), serde_json::json!(42));

        assert_eq!(resolve_profile(&identity), placeholder_profile(user()));
    }

    #[test]
    fn test_empty_chain_uses_placeholder() {
        let identity = Identity::new(user()).with_metadata("full_name", "Somebody");
        assert_eq!(resolve_with(&[], &identity), placeholder_profile(user()));
    }
}
