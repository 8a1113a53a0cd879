//! Boundary to the subject directory.
//!
//! Password storage and subject records live outside this crate. The session
//! flows only need to turn credentials into a subject id and a subject id
//! into a profile.

use crate::error::TokenError;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Public view of an authenticated subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectProfile {
    /// Stable subject id, used as the `sub` claim
    pub id: String,
    /// Sign-in identifier
    pub email: String,
    /// Display name
    pub full_name: String,
}

/// Credential checks and subject lookup, backed by the subject directory.
pub trait CredentialAuthority: Send + Sync {
    /// Check `identifier` and `secret`, returning the subject id.
    ///
    /// # Errors
    ///
    /// [`TokenError::InvalidCredentials`] for an unknown identifier or a wrong secret.
    /// Implementations must not reveal which of the two it was.
    fn authenticate_credentials(
        &self,
        identifier: &str,
        secret: &SecretString,
    ) -> impl Future<Output = Result<String, TokenError>> + Send;

    /// Fetch the profile for `subject_id`.
    ///
    /// # Errors
    ///
    /// [`TokenError::SubjectNotFound`] if no subject has this id.
    fn lookup_subject(
        &self,
        subject_id: &str,
    ) -> impl Future<Output = Result<SubjectProfile, TokenError>> + Send;
}
