//! Field-level access control for filtering and ordering.
//!
//! A policy is an allow list plus a block list, evaluated per normalized
//! field name. The block list always wins, even when the allow list would
//! have accepted the field. Policies are checked against both the external
//! (request-facing) and internal (post-alias) spelling of a field, at any
//! nesting depth and for dot-qualified association paths.

use crate::errors::ApiError;
use std::collections::HashSet;

/// Allow/block evaluator for one operation kind (filtering or ordering).
#[derive(Debug, Clone)]
pub struct FieldPolicy {
    /// `None` or empty means "all fields permitted".
    allow: Option<HashSet<String>>,
    block: HashSet<String>,
    /// Verb used in rejection messages ("filtering" / "ordering").
    action: &'static str,
}

impl FieldPolicy {
    #[must_use]
    pub fn new(
        allow: Option<Vec<String>>,
        block: Option<Vec<String>>,
        action: &'static str,
    ) -> Self {
        let allow = allow
            .filter(|list| !list.is_empty())
            .map(|list| list.into_iter().collect());
        let block = block.map(|list| list.into_iter().collect()).unwrap_or_default();
        Self {
            allow,
            block,
            action,
        }
    }

    /// A policy that permits every field.
    #[must_use]
    pub fn permissive(action: &'static str) -> Self {
        Self::new(None, None, action)
    }

    /// Check a field under both its external and internal names.
    ///
    /// # Errors
    ///
    /// `ApiError::BadRequest` naming the external field when it is blocked or
    /// absent from a non-empty allow list.
    pub fn check(&self, external: &str, internal: &str) -> Result<(), ApiError> {
        if self.block.contains(external) || self.block.contains(internal) {
            return Err(self.reject(external));
        }
        if let Some(allow) = &self.allow
            && !allow.contains(external)
            && !allow.contains(internal)
        {
            return Err(self.reject(external));
        }
        Ok(())
    }

    fn reject(&self, field: &str) -> ApiError {
        ApiError::bad_request(format!(
            "{} on field '{field}' is not allowed",
            capitalize(self.action)
        ))
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().collect::<String>() + chars.as_str()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissive_allows_everything() {
        let policy = FieldPolicy::permissive("filtering");
        assert!(policy.check("anything", "anything").is_ok());
    }

    #[test]
    fn test_allow_list_restricts() {
        let policy = FieldPolicy::new(
            Some(vec!["price".to_string(), "category".to_string()]),
            None,
            "filtering",
        );
        assert!(policy.check("price", "price").is_ok());
        assert!(policy.check("secret", "secret").is_err());
    }

    /// Block wins over allow, even when the field is explicitly allowed.
    #[test]
    fn test_block_beats_allow() {
        let policy = FieldPolicy::new(
            Some(vec!["price".to_string()]),
            Some(vec!["price".to_string()]),
            "filtering",
        );
        assert!(policy.check("price", "price").is_err());
    }

    /// The block list matches the internal spelling of an aliased field too.
    #[test]
    fn test_block_matches_internal_name() {
        let policy = FieldPolicy::new(None, Some(vec!["price_cents".to_string()]), "filtering");
        assert!(policy.check("cost", "price_cents").is_err());
    }

    #[test]
    fn test_allow_matches_either_name() {
        let policy = FieldPolicy::new(Some(vec!["cost".to_string()]), None, "filtering");
        assert!(policy.check("cost", "price_cents").is_ok());

        let policy = FieldPolicy::new(Some(vec!["price_cents".to_string()]), None, "filtering");
        assert!(policy.check("cost", "price_cents").is_ok());
    }

    #[test]
    fn test_empty_allow_means_all_permitted() {
        let policy = FieldPolicy::new(Some(vec![]), None, "ordering");
        assert!(policy.check("anything", "anything").is_ok());
    }

    #[test]
    fn test_dotted_paths_checked_verbatim() {
        let policy = FieldPolicy::new(None, Some(vec!["artist.royalties".to_string()]), "filtering");
        assert!(policy.check("artist.royalties", "artist.royalties").is_err());
        assert!(policy.check("artist.name", "artist.name").is_ok());
    }

    #[test]
    fn test_rejection_message_names_the_field() {
        let policy = FieldPolicy::new(None, Some(vec!["secret".to_string()]), "ordering");
        let err = policy.check("secret", "secret").unwrap_err();
        assert_eq!(err.to_string(), "Ordering on field 'secret' is not allowed");
    }
}
