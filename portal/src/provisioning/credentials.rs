//! Derivation of owner login credentials.
//!
//! Everything except the hash is a pure function of the owner's name, the
//! apartment, and the owner's position in the request. The plaintext
//! password leaves this module only inside an [`IssuedCredential`].

use serde::Serialize;
use uuid::Uuid;

use super::ProvisionError;
use crate::auth;
use crate::config::HashCost;

/// `first + " " + last`, trimmed.
pub fn display_name(first: &str, last: &str) -> String {
    format!("{} {}", first.trim(), last.trim()).trim().to_string()
}

/// `first + last + code` with every whitespace character removed.
pub fn derive_username(first: &str, last: &str, code: &str) -> String {
    strip_whitespace(&format!("{first}{last}{code}"))
}

/// `first + last + apartment id`. Bootstrap convenience, not a secret.
pub fn derive_password(first: &str, last: &str, apartment_id: Uuid) -> String {
    format!("{}{}{}", first.trim(), last.trim(), apartment_id)
}

/// `first.last.code.ordinal@domain`, lower-cased. The ordinal keeps owners
/// with identical names on one apartment apart.
pub fn derive_email(first: &str, last: &str, code: &str, ordinal: usize, domain: &str) -> String {
    format!(
        "{}.{}.{}.{}@{}",
        strip_whitespace(first).to_lowercase(),
        strip_whitespace(last).to_lowercase(),
        strip_whitespace(code).to_lowercase(),
        ordinal,
        domain
    )
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// An owner's derived identity, ready to persist.
pub struct MintedCredential {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    plaintext_password: String,
}

impl MintedCredential {
    /// Hand the plaintext over for the one response that may carry it.
    pub fn into_issued(self) -> IssuedCredential {
        IssuedCredential {
            name: self.name,
            username: self.username,
            email: self.email,
            password: self.plaintext_password,
        }
    }
}

impl std::fmt::Debug for MintedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MintedCredential")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Login details returned to the provisioning agent exactly once.
///
/// Deliberately not `Clone` and not convertible from a stored user: there is
/// no way to rebuild one after the provisioning response is sent.
#[derive(Serialize)]
pub struct IssuedCredential {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for IssuedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedCredential")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CredentialMinter {
    hash_cost: HashCost,
    email_domain: String,
}

impl CredentialMinter {
    pub fn new(hash_cost: HashCost, email_domain: impl Into<String>) -> Self {
        Self {
            hash_cost,
            email_domain: email_domain.into(),
        }
    }

    /// Derive and hash one owner's credentials. CPU-bound: call from a
    /// blocking task.
    pub fn mint(
        &self,
        first: &str,
        last: &str,
        apartment_code: &str,
        apartment_id: Uuid,
        ordinal: usize,
    ) -> Result<MintedCredential, ProvisionError> {
        let plaintext_password = derive_password(first, last, apartment_id);
        let password_hash = auth::hash_password(&plaintext_password, self.hash_cost)
            .map_err(|e| ProvisionError::Hash(e.to_string()))?;

        Ok(MintedCredential {
            name: display_name(first, last),
            username: derive_username(first, last, apartment_code),
            email: derive_email(first, last, apartment_code, ordinal, &self.email_domain),
            password_hash,
            plaintext_password,
        })
    }
}
