//! Identifier validation and conversation keys
//!
//! User and conversation identifiers arrive from cookies and client-supplied
//! call configuration, so they are checked against a closed character set
//! before they are allowed to address a message log.

use crate::error::{ErrorContext, ParleyError, ParleyResult};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

/// Joins the user and conversation components of a [`ConversationKey`].
///
/// Never accepted by [`is_valid_identifier`], so a key splits back into
/// exactly one `(user_id, conversation_id)` pair.
pub const SEPARATOR: char = '%';

static VALID_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\-_]+$").expect("identifier pattern is valid"));

/// Check that `value` is non-empty and only contains ASCII letters, digits,
/// hyphens and underscores.
pub fn is_valid_identifier(value: &str) -> bool {
    VALID_IDENTIFIER.is_match(value)
}

/// Storage key addressing one conversation's message log: `user_id%conversation_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ConversationKey(String);

impl ConversationKey {
    /// Validate both identifiers and derive the key.
    ///
    /// The user id is checked first; the returned error names the offending
    /// identifier and explains how to supply a valid one.
    pub fn new(user_id: &str, conversation_id: &str) -> ParleyResult<Self> {
        if !is_valid_identifier(user_id) {
            return Err(ParleyError::Validation {
                message: format!(
                    "User ID {user_id:?} is not in a valid format. \
                     User ID must only contain alphanumeric characters, hyphens, and underscores. \
                     Please include a valid cookie in the request headers called 'user_id'."
                ),
                field: Some("user_id".to_string()),
                context: ErrorContext::new("conversation_key")
                    .with_operation("validate_user_id")
                    .with_suggestion("Use GET /set-cookie/?user_id=<value> to set the cookie"),
            });
        }

        if !is_valid_identifier(conversation_id) {
            return Err(ParleyError::Validation {
                message: format!(
                    "Conversation ID {conversation_id:?} is not in a valid format. \
                     Conversation ID must only contain alphanumeric characters, hyphens, and underscores. \
                     Please provide a valid conversation id via config. \
                     For example, {{\"configurable\": {{\"conversation_id\": \"123\"}}}}"
                ),
                field: Some("conversation_id".to_string()),
                context: ErrorContext::new("conversation_key")
                    .with_operation("validate_conversation_id")
                    .with_suggestion(
                        "Send \"config\": {\"configurable\": {\"conversation_id\": \"...\"}} with the request",
                    ),
            });
        }

        Ok(Self(format!("{user_id}{SEPARATOR}{conversation_id}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn user_id(&self) -> &str {
        self.split().0
    }

    pub fn conversation_id(&self) -> &str {
        self.split().1
    }

    fn split(&self) -> (&str, &str) {
        // Both halves were validated, so there is exactly one separator.
        self.0.split_once(SEPARATOR).unwrap_or((self.0.as_str(), ""))
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ConversationKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        for value in ["alice", "user-1", "USER_2", "a", "0", "-", "_", "abc-DEF_123"] {
            assert!(is_valid_identifier(value), "{value} should be valid");
        }
    }

    #[test]
    fn test_invalid_identifiers() {
        for value in ["", "bad id", "a%b", "a/b", "bob@example.com", "tab\there", "ünï", "a\n"] {
            assert!(!is_valid_identifier(value), "{value:?} should be invalid");
        }
    }

    #[test]
    fn test_key_format() {
        let key = ConversationKey::new("alice", "conv-1").unwrap();
        assert_eq!(key.as_str(), "alice%conv-1");
        assert_eq!(key.user_id(), "alice");
        assert_eq!(key.conversation_id(), "conv-1");
    }

    #[test]
    fn test_keys_do_not_collide() {
        let a = ConversationKey::new("ab", "c").unwrap();
        let b = ConversationKey::new("a", "bc").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalid_user_id_is_reported_first() {
        let err = ConversationKey::new("bad id", "also bad").unwrap_err();
        match err {
            ParleyError::Validation { message, field, .. } => {
                assert!(message.contains("User ID"));
                assert_eq!(field.as_deref(), Some("user_id"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_conversation_id() {
        let err = ConversationKey::new("ok-id", "bad id").unwrap_err();
        match err {
            ParleyError::Validation { message, field, .. } => {
                assert!(message.contains("Conversation ID"));
                assert_eq!(field.as_deref(), Some("conversation_id"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_conversation_id_is_rejected() {
        assert!(ConversationKey::new("alice", "").is_err());
    }
}
