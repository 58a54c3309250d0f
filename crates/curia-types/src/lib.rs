pub mod address;
pub mod anchor;
pub mod canonical_json;
pub mod economy;
pub mod id;
pub mod job;
pub mod onchain;
pub mod social;
pub mod submission;
pub mod vote;

pub use address::Address;
pub use anchor::AnchorBatch;
pub use canonical_json::{canonical_hash, to_canonical_bytes, to_canonical_json};
pub use economy::{AgrLedgerEntry, ReputationRecord};
pub use id::{AnchorBatchId, CommentId, EntryId, JobId, SubmissionId, VoteId};
pub use job::{Job, JobStatus};
pub use onchain::{
    cursor_key, event_id, ChainRef, DonationEvent, DonorTotal, SlashingEvent, StakeRecord,
};
pub use social::{AvatarMode, Comment, CommentTarget, ProfileRecord};
pub use submission::{Evidence, Submission};
pub use vote::{FinalVote, JuryVote};
