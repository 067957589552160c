//! Authorization gate over the stored issuer record.

use tracing::warn;

use tokenledger_auth::{AuthorizedIssuer, require_issuer};
use tokenledger_core::{CallerIdentity, LedgerError, LedgerResult, OrgId, WorldState};

use crate::schema::AUTHORIZED_ISSUER_KEY;

/// Reads and guards the durable authorized-issuer value.
///
/// Nothing is cached: every check reads the key again, since each invocation
/// may run in a fresh process.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct IssuerRegistry;

impl IssuerRegistry {
    /// The stored issuer, or `None` when the key is absent or holds no
    /// usable organization id.
    pub fn load<S: WorldState>(&self, state: &S) -> LedgerResult<Option<AuthorizedIssuer>> {
        let Some(raw) = state.get_state(AUTHORIZED_ISSUER_KEY)? else {
            return Ok(None);
        };
        match AuthorizedIssuer::from_stored(&raw) {
            Ok(issuer) => Ok(Some(issuer)),
            Err(e) => {
                warn!(key = AUTHORIZED_ISSUER_KEY, reason = %e, "stored issuer is unreadable");
                Ok(None)
            }
        }
    }

    /// Fail with an authorization error unless the caller's organization is
    /// the stored issuer. Returns the caller on success.
    pub fn require_issuer<S: WorldState>(&self, state: &S) -> LedgerResult<CallerIdentity> {
        let caller = state.caller_identity()?;
        let issuer = self.load(state)?;
        if let Err(e) = require_issuer(issuer.as_ref(), &caller) {
            warn!(caller_id = %caller.id, caller_org = %caller.org_id, reason = %e, "privileged call rejected");
            return Err(e.into());
        }
        Ok(caller)
    }

    /// Store the first issuer. Conflicts if one is already configured.
    pub fn initialize<S: WorldState>(&self, state: &mut S, org: OrgId) -> LedgerResult<()> {
        if let Some(existing) = state.get_state(AUTHORIZED_ISSUER_KEY)? {
            return Err(LedgerError::conflict(format!(
                "ledger already initialized with issuer '{}'",
                String::from_utf8_lossy(&existing)
            )));
        }
        self.store(state, &AuthorizedIssuer::new(org))
    }

    /// Replace the issuer and return the previous one. Callers run
    /// [`Self::require_issuer`] first.
    pub fn rotate<S: WorldState>(&self, state: &mut S, org: OrgId) -> LedgerResult<Option<OrgId>> {
        let previous = self.load(state)?.map(|i| i.org_id().clone());
        self.store(state, &AuthorizedIssuer::new(org))?;
        Ok(previous)
    }

    fn store<S: WorldState>(&self, state: &mut S, issuer: &AuthorizedIssuer) -> LedgerResult<()> {
        state.put_state(AUTHORIZED_ISSUER_KEY, issuer.to_stored())?;
        Ok(())
    }
}
