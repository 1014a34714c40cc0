//! Sign-in email policy.
//!
//! Decides whether a signed-in email may use the dashboard and turns it
//! into the caller identity every restaurant read is filtered by.

use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::model::{KamEmail, PreconditionError};

/// Rejected sign-in.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidEmail(#[from] PreconditionError),

    #[error("{email} is not authorized; only @{domain} emails are allowed")]
    NotAllowed { email: String, domain: String },
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub email: KamEmail,
    pub name: Option<String>,
}

/// Email domain gate.
///
/// In restricted mode only the organization domain is admitted. Otherwise
/// whitelisted test emails are admitted too.
#[derive(Debug, Clone)]
pub struct EmailPolicy {
    allowed_domain: String,
    restrict_domain: bool,
    allowed_test_emails: Vec<String>,
}

fn normalize(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

impl EmailPolicy {
    pub fn new(
        allowed_domain: impl Into<String>,
        restrict_domain: bool,
        allowed_test_emails: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Self {
        Self {
            allowed_domain: normalize(&allowed_domain.into())
                .trim_start_matches('@')
                .to_string(),
            restrict_domain,
            allowed_test_emails: allowed_test_emails
                .into_iter()
                .map(|e| normalize(e.as_ref()))
                .collect(),
        }
    }

    pub fn allowed_domain(&self) -> &str {
        &self.allowed_domain
    }

    fn is_domain_email(&self, email: &str) -> bool {
        email
            .strip_suffix(self.allowed_domain.as_str())
            .is_some_and(|local| local.len() > 1 && local.ends_with('@'))
    }

    pub fn is_authorized(&self, email: &str) -> bool {
        let email = normalize(email);
        if self.is_domain_email(&email) {
            return true;
        }
        !self.restrict_domain && self.allowed_test_emails.contains(&email)
    }

    /// Admit `email` and build the caller session.
    pub fn authorize(&self, email: &str, name: Option<&str>) -> Result<Session, AuthError> {
        let normalized = normalize(email);
        let kam_email = KamEmail::new(normalized.clone())?;

        if !self.is_authorized(&normalized) {
            warn!(email = %normalized, "Sign-in rejected by email policy");
            return Err(AuthError::NotAllowed {
                email: normalized,
                domain: self.allowed_domain.clone(),
            });
        }

        info!(email = %kam_email, "Signed in");
        Ok(Session {
            email: kam_email,
            name: name
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
        })
    }
}

impl From<&AuthConfig> for EmailPolicy {
    fn from(config: &AuthConfig) -> Self {
        Self::new(
            config.allowed_domain.clone(),
            config.restrict_domain,
            &config.allowed_test_emails,
        )
    }
}
