pub mod error;
pub mod ledger;

pub use error::{EconomicsError, Result};
pub use ledger::{AgrLedger, MintOutcome, RewardPolicy, REASON_BOOST, REASON_WIN};
