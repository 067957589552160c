//! Line-oriented host for the token ledger.
//!
//! Each stdin line is one JSON invocation; each stdout line is its JSON
//! response. Logs go to stderr.

pub mod dto;
pub mod errors;
pub mod session;

pub use session::Session;
