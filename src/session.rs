use crate::error::{Error, Result};

/// The signed-in outreach worker, if any.
///
/// Sign-in itself happens elsewhere; this only answers "may this action write?".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<String>,
}

impl Session {
    pub fn signed_in(user: impl Into<String>) -> Self {
        let user = user.into();
        if user.trim().is_empty() {
            return Self::anonymous();
        }
        Self { user: Some(user) }
    }

    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Gate for mutating actions. Checked before any write is attempted.
    pub fn require(&self) -> Result<&str> {
        self.user.as_deref().ok_or(Error::Unauthorized)
    }
}
