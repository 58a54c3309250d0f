/*!
# Curia governance

Job lifecycle and voting for the marketplace ledger:

- Jury votes carry a reputation-derived weight `1 + ⌊√R⌋` clamped to `[1, 5]`;
  final votes are one-person-one-vote inside a time-boxed window.
- One vote per (job, voter); a revote overwrites in place.
- Jobs close exactly once, by sponsor choice or by finalizing the final-vote
  tally; both paths share the same closing primitive.
- Post-close side effects (notifications, win-reward mint, anchor snapshot)
  are best-effort and never fail the close.
*/

pub mod error;
pub mod lifecycle;
pub mod tally;
pub mod voting;

pub use error::{GovernanceError, Result};
pub use lifecycle::{JobLifecycle, Notifier, TracingNotifier};
pub use tally::{tally_final_votes, tally_jury_votes, vote_weight, VoteTally};
pub use voting::{VotingConfig, VotingService};
