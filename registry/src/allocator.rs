//! Identifier allocation.
//!
//! Ids are intentionally human-decodable rather than random tokens: a
//! 5-character base derived from the person's name plus a 3-digit suffix
//! disambiguating different people who share the base.

use facegate_store::{IdentityRecord, RecordStore};

use crate::error::RegistryError;

/// How many distinct people may share one base before enrollment under that
/// base is rejected.
pub const MAX_SUFFIX: usize = 999;

/// Decides whether an existing identity sharing the candidate's base refers
/// to the same person.
///
/// The shipped [`ExactNameMatch`] policy conflates "same full name" with
/// "same person"; callers with stronger requirements inject their own
/// implementation (human confirmation, secondary biometric).
pub trait SamePersonPolicy: Send + Sync {
    fn same_person(&self, existing: &IdentityRecord, given_name: &str, family_name: &str) -> bool;
}

/// Treats an exact `(given_name, family_name)` match as the same person.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactNameMatch;

impl SamePersonPolicy for ExactNameMatch {
    fn same_person(&self, existing: &IdentityRecord, given_name: &str, family_name: &str) -> bool {
        existing.given_name == given_name && existing.family_name == family_name
    }
}

/// Result of resolving a name against the existing identifier space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allocation {
    /// The name resolved to an already-enrolled person; fold into this id.
    Existing(String),

    /// A fresh id for a new person.
    New(String),
}

/// Derive the 5-character base for a name: first and last character of the
/// family name, then the first three characters of the given name, padded
/// with 'X' when the given name is shorter.
///
/// Operates on characters, not bytes, so non-ASCII names work.
pub fn name_base(given_name: &str, family_name: &str) -> Result<String, RegistryError> {
    let family: Vec<char> = family_name.chars().collect();
    let given: Vec<char> = given_name.chars().collect();
    if family.is_empty() {
        return Err(RegistryError::InvalidName("family name is empty".into()));
    }
    if given.is_empty() {
        return Err(RegistryError::InvalidName("given name is empty".into()));
    }

    let mut base = String::new();
    base.push(family[0]);
    base.push(family[family.len() - 1]);
    for i in 0..3 {
        base.push(given.get(i).copied().unwrap_or('X'));
    }
    Ok(base)
}

/// Resolve a name to an identifier: reuse the id of a same-person match
/// among identities sharing the base, otherwise assign the next free
/// 3-digit suffix.
pub fn allocate(
    store: &dyn RecordStore,
    policy: &dyn SamePersonPolicy,
    given_name: &str,
    family_name: &str,
) -> Result<Allocation, RegistryError> {
    let base = name_base(given_name, family_name)?;
    let sharing = store.identities_with_prefix(&base)?;

    if let Some(existing) = sharing
        .iter()
        .find(|rec| policy.same_person(rec, given_name, family_name))
    {
        return Ok(Allocation::Existing(existing.id.clone()));
    }

    let next = sharing.len() + 1;
    if next > MAX_SUFFIX {
        return Err(RegistryError::AllocationExhausted { base });
    }
    Ok(Allocation::New(format!("{base}{next:03}")))
}
