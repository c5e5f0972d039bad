//! Domain types for the session slice.
//!
//! The session holds who the user is (id, display name, token) and the
//! field errors from the last register/login attempt.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field-error mapping returned by the backend for a rejected form
///
/// Keys are form field names; a missing key means the field is valid.
/// Keys other than the three known fields are kept in `other` so the
/// mapping reaches the form layer verbatim.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors {
    /// Message for the `email` field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Message for the `password` field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Message for the `username` field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Any other keys the backend sent
    #[serde(flatten)]
    pub other: BTreeMap<String, String>,
}

impl FieldErrors {
    /// Key used when a request failed before the backend could answer
    pub const REQUEST: &'static str = "request";

    /// Errors for a request that never got a field-error body back
    #[must_use]
    pub fn request(message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.other.insert(Self::REQUEST.to_string(), message.into());
        errors
    }

    /// Returns true if every field is valid
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none() && self.username.is_none() && self.other.is_empty()
    }

    /// Message for a field, by name
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        match field {
            "email" => self.email.as_deref(),
            "password" => self.password.as_deref(),
            "username" => self.username.as_deref(),
            other => self.other.get(other).map(String::as_str),
        }
    }

    /// All `(field, message)` pairs, known fields first
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        [
            ("email", self.email.as_deref()),
            ("password", self.password.as_deref()),
            ("username", self.username.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, message)| message.map(|m| (field, m)))
        .chain(self.other.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

/// State of the user session
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Backend user id (empty until registered or logged in)
    pub id: String,
    /// Session token (empty until logged in)
    pub token: String,
    /// Display name
    pub user_name: String,
    /// Field errors from the last register/login attempt
    pub errors: FieldErrors,
}

impl SessionState {
    /// Creates an empty session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once a login produced a token
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }
}

/// Actions for the session store
///
/// Commands come from the UI. Settlement events are fed back by the
/// register/login effects once the backend has answered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionAction {
    // ========== Commands ==========
    /// Command: Register a new account
    Register {
        /// Desired display name
        username: String,
        /// Account email
        email: String,
        /// Account password
        password: String,
    },

    /// Command: Log in
    Login {
        /// Account email
        email: String,
        /// Account password
        password: String,
    },

    /// Command: Replace the user id
    SetId {
        /// New id
        id: String,
    },

    /// Command: Replace the session token
    SetToken {
        /// New token
        token: String,
    },

    /// Command: Replace the display name
    SetUsername {
        /// New display name
        user_name: String,
    },

    /// Command: Replace the field errors
    SetErrors {
        /// New errors
        errors: FieldErrors,
    },

    // ========== Events ==========
    /// Event: Registration accepted
    Registered {
        /// Id assigned by the backend
        id: String,
        /// Display name confirmed by the backend
        user_name: String,
    },

    /// Event: Registration rejected
    RegisterFailed {
        /// Field errors from the backend
        errors: FieldErrors,
    },

    /// Event: Login accepted
    LoggedIn {
        /// User id
        id: String,
        /// Session token
        token: String,
    },

    /// Event: Login rejected
    LoginFailed {
        /// Field errors from the backend
        errors: FieldErrors,
    },
}

impl SessionAction {
    /// Returns true for the events that settle a register or login request
    #[must_use]
    pub const fn is_settlement(&self) -> bool {
        matches!(
            self,
            Self::Registered { .. } | Self::RegisterFailed { .. } | Self::LoggedIn { .. } | Self::LoginFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_deserialize_known_and_unknown_keys() -> Result<(), serde_json::Error> {
        let errors: FieldErrors =
            serde_json::from_str(r#"{"email":"invalid email","password2":"passwords must match"}"#)?;

        assert_eq!(errors.email.as_deref(), Some("invalid email"));
        assert_eq!(errors.get("password2"), Some("passwords must match"));
        assert!(errors.password.is_none());
        assert!(!errors.is_empty());
        Ok(())
    }

    #[test]
    fn field_errors_iterate_known_fields_first() {
        let mut errors = FieldErrors::request("connection refused");
        errors.username = Some("taken".to_string());

        let pairs: Vec<_> = errors.iter().collect();
        assert_eq!(pairs, vec![("username", "taken"), ("request", "connection refused")]);
    }

    #[test]
    fn empty_session() {
        let state = SessionState::new();
        assert!(state.id.is_empty());
        assert!(state.errors.is_empty());
        assert!(!state.is_authenticated());
    }

    #[test]
    fn settlement_classification() {
        assert!(SessionAction::LoginFailed { errors: FieldErrors::default() }.is_settlement());
        assert!(
            !SessionAction::SetToken {
                token: "t".to_string()
            }
            .is_settlement()
        );
    }
}
