pub mod constants;
pub mod error;
pub mod frame;
pub mod io;
pub mod page_table;
pub mod stats;
pub mod storage;
pub mod tlb;
pub mod translation;

// Re-export commonly used items for convenience
pub use error::{Result, VmError};
pub use stats::StatsSnapshot;
pub use storage::{FileStore, MemoryStore, PageContentStore};
pub use translation::{Outcome, Resolution, TranslationRecord, Translator, VirtualAddress};
