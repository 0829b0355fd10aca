/// TLB capacity in entries (fully associative).
pub const TLB_SIZE: usize = 16;

/// Number of physical frames in the pool.
pub const TOTAL_FRAMES: usize = 128;

/// Entries in the first-level directory of the hierarchical table.
pub const DIRECTORY_ENTRIES: usize = 1024;

/// Entries in each second-level table.
pub const TABLE_ENTRIES: usize = 1024;

/// Entries in the flat table used for small addresses.
pub const FLAT_ENTRIES: usize = 32;

/// Addresses below this threshold take the flat-table path.
pub const FLAT_ADDRESS_LIMIT: u32 = 1 << 16;

/// Bits per index level in paged mode (directory and second-level).
pub const LEVEL_BITS: u32 = 10;
pub const LEVEL_MASK: u32 = (1 << LEVEL_BITS) - 1;

/// Page sizes the simulator accepts, in words.
pub const ALLOWED_PAGE_SIZES: [usize; 4] = [256, 1024, 2048, 4096];
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// One in DIRTY_WRITE_ODDS translations marks its entry dirty.
pub const DIRTY_WRITE_ODDS: u32 = 20;
