//! Loading and editing the user profile through the document store.

use thiserror::Error;
use tracing::info;

use crate::core::profile::{ProfileEdit, ProfileError, ProfileField, UserProfile};
use crate::io::document_store::{DocumentStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileUpdateError {
    #[error(transparent)]
    Invalid(#[from] ProfileError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The stored profile, or an empty one if the user never saved any.
pub fn load_profile<S: DocumentStore>(store: &S, user_id: &str) -> Result<UserProfile, StoreError> {
    Ok(store.load_user_profile(user_id)?.unwrap_or_default())
}

/// Parse `value` for `field`, apply it, and store the result.
///
/// Nothing is written when the value is rejected.
pub fn update_profile<S: DocumentStore>(
    store: &S,
    user_id: &str,
    field: &str,
    value: &str,
) -> Result<UserProfile, ProfileUpdateError> {
    let field: ProfileField = field.parse()?;
    let edit = ProfileEdit::parse(&field, value)?;
    let mut profile = load_profile(store, user_id)?;
    profile.apply(edit);
    store.store_user_profile(user_id, &profile)?;
    info!(user_id, field = %field, "profile updated");
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::profile::{Sex, WeightUnit};
    use crate::test_support::MemoryDocumentStore;

    #[test]
    fn missing_profile_loads_as_default() {
        let store = MemoryDocumentStore::new();
        assert_eq!(load_profile(&store, "ana"), Ok(UserProfile::default()));
    }

    #[test]
    fn updates_accumulate_per_field() {
        let store = MemoryDocumentStore::new();

        update_profile(&store, "ana", "weight", "72.46").expect("weight");
        update_profile(&store, "ana", "units", "lbs").expect("units");
        update_profile(&store, "ana", "sex", "Female").expect("sex");
        let profile = update_profile(&store, "ana", "gym", "downtown").expect("other");

        assert_eq!(profile.weight, Some(72.5));
        assert_eq!(profile.weight_unit, WeightUnit::Lbs);
        assert_eq!(profile.sex, Some(Sex::Female));
        assert_eq!(profile.other.get("gym").map(String::as_str), Some("downtown"));
        assert_eq!(load_profile(&store, "ana"), Ok(profile));
    }

    #[test]
    fn invalid_value_is_not_stored() {
        let store = MemoryDocumentStore::new();

        let err = update_profile(&store, "ana", "birthdate", "yesterday").unwrap_err();

        assert!(matches!(err, ProfileUpdateError::Invalid(ProfileError::InvalidValue { .. })));
        assert_eq!(store.load_user_profile("ana"), Ok(None));
    }

    #[test]
    fn stored_password_verifies_after_reload() {
        let store = MemoryDocumentStore::new();

        update_profile(&store, "ana", "password", "hunter2").expect("password");

        let profile = load_profile(&store, "ana").expect("load");
        assert!(profile.verify_password("hunter2"));
        assert!(!profile.verify_password("Hunter2"));
    }

    #[test]
    fn store_failure_is_reported() {
        let store = MemoryDocumentStore::new();
        store.fail_writes(true);

        let err = update_profile(&store, "ana", "name", "Ana").unwrap_err();

        assert!(matches!(err, ProfileUpdateError::Store(StoreError::Write { .. })));
    }
}
