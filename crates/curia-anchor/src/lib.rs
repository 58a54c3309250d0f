pub mod batch;
pub mod calldata;
pub mod error;
pub mod snapshot;
pub mod store;

pub use batch::AnchorService;
pub use calldata::{decode_hex32, post_anchor_calldata};
pub use error::{AnchorError, Result};
pub use snapshot::{JobSnapshot, SnapshotComments};
pub use store::{FsSnapshotStore, MemorySnapshotStore, SnapshotStore};
