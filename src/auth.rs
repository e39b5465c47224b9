//! Per-request authorization capability.
//!
//! The identity provider's claims are resolved into a [`RequestContext`] once
//! per request; every manager operation takes it instead of looking the
//! caller up again.

use serde::Deserialize;

use crate::error::LottoError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestContext {
    Anonymous,
    User { owner_id: String },
    Admin { owner_id: String },
}

/// Claims as handed over by the identity provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::Anonymous
    }

    pub fn user(owner_id: impl Into<String>) -> Self {
        Self::User {
            owner_id: owner_id.into(),
        }
    }

    pub fn admin(owner_id: impl Into<String>) -> Self {
        Self::Admin {
            owner_id: owner_id.into(),
        }
    }

    /// An admin flag without an owner id does not authenticate anyone.
    pub fn from_claims(claims: Claims) -> Self {
        match claims.owner_id.filter(|id| !id.trim().is_empty()) {
            None => Self::Anonymous,
            Some(owner_id) if claims.is_admin => Self::Admin { owner_id },
            Some(owner_id) => Self::User { owner_id },
        }
    }

    pub fn owner_id(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::User { owner_id } | Self::Admin { owner_id } => Some(owner_id),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin { .. })
    }

    pub fn require_owner(&self) -> Result<&str, LottoError> {
        self.owner_id().ok_or(LottoError::NotAuthenticated)
    }

    pub fn require_admin(&self) -> Result<&str, LottoError> {
        let owner_id = self.require_owner()?;
        if self.is_admin() {
            Ok(owner_id)
        } else {
            Err(LottoError::NotAdmin)
        }
    }

    pub fn can_access(&self, owner_id: &str) -> bool {
        match self {
            Self::Anonymous => false,
            Self::User { owner_id: own } => own == owner_id,
            Self::Admin { .. } => true,
        }
    }
}
