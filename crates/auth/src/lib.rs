//! `tokenledger-auth` — issuer authorization policy.
//!
//! Pure decisions only; reading the stored issuer is the caller's job.

pub mod authorize;

pub use authorize::{AuthorizedIssuer, AuthzError, require_issuer};
