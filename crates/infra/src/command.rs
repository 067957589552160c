//! Contract function names and argument parsing.
//!
//! Invocations arrive as a function name plus string arguments. Parsing is
//! strict: wrong arity, non-integer amounts and unknown names are validation
//! errors, raised before any transaction is opened.

use serde::{Deserialize, Serialize};

use tokenledger_core::{LedgerError, LedgerResult};
use tokenledger_wallet::{CommitVerdict, SeedAccount};

/// A raw invocation as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub function: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, A>(function: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            function: function.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCommand {
    InitLedger {
        issuer_org: String,
        seeds: Vec<SeedAccount>,
    },
    SetAuthorizedIssuer {
        org: String,
    },
    CreateAccount {
        owner: String,
        initial_balance: i64,
    },
    GetAccount {
        owner: String,
    },
    AccountExists {
        owner: String,
    },
    ListAccounts,
    BalanceOf {
        owner: String,
    },
    MyBalance,
    Transfer {
        from: String,
        to: String,
        amount: i64,
    },
    Burn {
        owner: String,
        amount: i64,
    },
    Mint {
        owner: String,
        amount: i64,
    },
    RewardForCommit {
        owner: String,
        hash: String,
        amount: i64,
    },
    RewardReviewedCommit {
        owner: String,
        hash: String,
        amount: i64,
        verdict: CommitVerdict,
    },
    GetCommitRecord {
        hash: String,
    },
}

impl LedgerCommand {
    pub fn parse(function: &str, args: &[String]) -> LedgerResult<Self> {
        let args = Args::new(function, args);
        let command = match function {
            "InitLedger" => {
                args.arity(1, 2)?;
                let seeds = match args.optional(1) {
                    Some(raw) => serde_json::from_str(raw).map_err(|e| {
                        LedgerError::validation(format!("InitLedger: bad seed accounts: {e}"))
                    })?,
                    None => Vec::new(),
                };
                LedgerCommand::InitLedger {
                    issuer_org: args.text(0),
                    seeds,
                }
            }
            "SetAuthorizedIssuer" => {
                args.exact(1)?;
                LedgerCommand::SetAuthorizedIssuer { org: args.text(0) }
            }
            "CreateAccount" | "CreateWallet" => {
                args.arity(1, 2)?;
                let initial_balance = match args.optional(1) {
                    Some(_) => args.integer(1)?,
                    None => 0,
                };
                LedgerCommand::CreateAccount {
                    owner: args.text(0),
                    initial_balance,
                }
            }
            "GetAccount" | "ReadWallet" | "GetWallet" => {
                args.exact(1)?;
                LedgerCommand::GetAccount {
                    owner: args.text(0),
                }
            }
            "AccountExists" | "WalletExists" => {
                args.exact(1)?;
                LedgerCommand::AccountExists {
                    owner: args.text(0),
                }
            }
            "ListAccounts" | "GetAllWallets" => {
                args.exact(0)?;
                LedgerCommand::ListAccounts
            }
            "BalanceOf" => {
                args.exact(1)?;
                LedgerCommand::BalanceOf {
                    owner: args.text(0),
                }
            }
            "MyBalance" => {
                args.exact(0)?;
                LedgerCommand::MyBalance
            }
            "Transfer" => {
                args.exact(3)?;
                LedgerCommand::Transfer {
                    from: args.text(0),
                    to: args.text(1),
                    amount: args.integer(2)?,
                }
            }
            "Burn" => {
                args.exact(2)?;
                LedgerCommand::Burn {
                    owner: args.text(0),
                    amount: args.integer(1)?,
                }
            }
            "Mint" => {
                args.exact(2)?;
                LedgerCommand::Mint {
                    owner: args.text(0),
                    amount: args.integer(1)?,
                }
            }
            "RewardForCommit" => {
                args.exact(3)?;
                LedgerCommand::RewardForCommit {
                    owner: args.text(0),
                    hash: args.text(1),
                    amount: args.integer(2)?,
                }
            }
            "RewardReviewedCommit" => {
                args.exact(4)?;
                LedgerCommand::RewardReviewedCommit {
                    owner: args.text(0),
                    hash: args.text(1),
                    amount: args.integer(2)?,
                    verdict: args.text(3).parse()?,
                }
            }
            "GetCommitRecord" => {
                args.exact(1)?;
                LedgerCommand::GetCommitRecord { hash: args.text(0) }
            }
            other => {
                return Err(LedgerError::validation(format!(
                    "unknown function '{other}'"
                )));
            }
        };
        Ok(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            LedgerCommand::InitLedger { .. } => "InitLedger",
            LedgerCommand::SetAuthorizedIssuer { .. } => "SetAuthorizedIssuer",
            LedgerCommand::CreateAccount { .. } => "CreateAccount",
            LedgerCommand::GetAccount { .. } => "GetAccount",
            LedgerCommand::AccountExists { .. } => "AccountExists",
            LedgerCommand::ListAccounts => "ListAccounts",
            LedgerCommand::BalanceOf { .. } => "BalanceOf",
            LedgerCommand::MyBalance => "MyBalance",
            LedgerCommand::Transfer { .. } => "Transfer",
            LedgerCommand::Burn { .. } => "Burn",
            LedgerCommand::Mint { .. } => "Mint",
            LedgerCommand::RewardForCommit { .. } => "RewardForCommit",
            LedgerCommand::RewardReviewedCommit { .. } => "RewardReviewedCommit",
            LedgerCommand::GetCommitRecord { .. } => "GetCommitRecord",
        }
    }

    /// Queries are evaluated and never committed.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            LedgerCommand::GetAccount { .. }
                | LedgerCommand::AccountExists { .. }
                | LedgerCommand::ListAccounts
                | LedgerCommand::BalanceOf { .. }
                | LedgerCommand::MyBalance
                | LedgerCommand::GetCommitRecord { .. }
        )
    }
}

impl TryFrom<&Invocation> for LedgerCommand {
    type Error = LedgerError;

    fn try_from(value: &Invocation) -> Result<Self, Self::Error> {
        LedgerCommand::parse(&value.function, &value.args)
    }
}

struct Args<'a> {
    function: &'a str,
    values: &'a [String],
}

impl<'a> Args<'a> {
    fn new(function: &'a str, values: &'a [String]) -> Self {
        Self { function, values }
    }

    fn exact(&self, n: usize) -> LedgerResult<()> {
        self.arity(n, n)
    }

    fn arity(&self, min: usize, max: usize) -> LedgerResult<()> {
        let got = self.values.len();
        if got < min || got > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{min} to {max}")
            };
            return Err(LedgerError::validation(format!(
                "{}: expected {expected} argument(s), got {got}",
                self.function
            )));
        }
        Ok(())
    }

    // Arity is checked first, so indexing below stays in bounds.
    fn text(&self, i: usize) -> String {
        self.values.get(i).cloned().unwrap_or_default()
    }

    fn optional(&self, i: usize) -> Option<&'a str> {
        self.values.get(i).map(String::as_str)
    }

    fn integer(&self, i: usize) -> LedgerResult<i64> {
        let raw = self.optional(i).unwrap_or_default();
        raw.trim().parse().map_err(|_| {
            LedgerError::validation(format!(
                "{}: argument {} must be an integer amount, got '{raw}'",
                self.function,
                i + 1
            ))
        })
    }
}
