pub mod backend;
pub mod memory;
pub mod rocks;

pub use backend::{LedgerError, LedgerStore, Result};
pub use memory::MemoryBackend;
pub use rocks::RocksBackend;
