use thiserror::Error;

use tokenledger_core::{CallerIdentity, LedgerError, OrgId};

/// The organization allowed to issue tokens (mint, reward).
///
/// Stored as ledger state, not process state: the wallet crate reads it fresh
/// on every privileged call and hands it to [`require_issuer`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthorizedIssuer(OrgId);

impl AuthorizedIssuer {
    pub fn new(org_id: OrgId) -> Self {
        Self(org_id)
    }

    /// Decode the raw stored value (a bare UTF-8 organization id).
    ///
    /// A value that is not a usable organization id grants nothing, so it
    /// decodes as [`AuthzError::IssuerUnset`].
    pub fn from_stored(raw: &[u8]) -> Result<Self, AuthzError> {
        core::str::from_utf8(raw)
            .ok()
            .and_then(|text| OrgId::new(text).ok())
            .map(Self)
            .ok_or(AuthzError::IssuerUnset)
    }

    pub fn org_id(&self) -> &OrgId {
        &self.0
    }

    pub fn to_stored(&self) -> Vec<u8> {
        self.0.as_str().as_bytes().to_vec()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("no authorized issuer is configured")]
    IssuerUnset,

    #[error("organization '{caller_org}' is not the authorized issuer")]
    Forbidden { caller_org: String },
}

impl From<AuthzError> for LedgerError {
    fn from(value: AuthzError) -> Self {
        LedgerError::unauthorized(value.to_string())
    }
}

/// Check that the caller's organization is the authorized issuer.
///
/// - No IO
/// - No panics
/// - Exact, case-sensitive comparison
pub fn require_issuer(
    issuer: Option<&AuthorizedIssuer>,
    caller: &CallerIdentity,
) -> Result<(), AuthzError> {
    let issuer = issuer.ok_or(AuthzError::IssuerUnset)?;
    if issuer.org_id().as_str() == caller.org_id {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            caller_org: caller.org_id.clone(),
        })
    }
}
