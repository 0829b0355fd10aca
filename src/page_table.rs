use crate::constants::*;

/// Identifies one page-table slot, and doubles as the TLB key.
///
/// The two table shapes have separate number spaces: flat page 5 and
/// hierarchical VPN 5 are different pages, so the key carries the variant
/// and not just the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKey {
    /// Page number in the 32-entry flat table.
    Flat(u32),
    /// Virtual page number `(dir << 10) | table` in the hierarchical table.
    Paged(u32),
}

/// One page-table entry. Exclusively owned by its slot; `frame`, when
/// present, names the physical frame currently bound to this page.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageTableEntry {
    pub valid: bool,
    pub accessed: bool,
    pub dirty: bool,
    pub frame: Option<usize>,
}

impl PageTableEntry {
    /// Reset to the unmapped state. Used when the entry's frame is evicted.
    pub fn clear(&mut self) {
        *self = PageTableEntry::default();
    }
}

/// Both page-table shapes for one run, addressed uniformly by [`PageKey`].
///
/// The flat table is allocated once at startup. The hierarchical table is a
/// directory of optional second-level tables; a second-level table is
/// allocated zeroed on the first touch of its directory slot and never freed
/// before teardown.
pub struct PageTables {
    flat: [PageTableEntry; FLAT_ENTRIES],
    directory: Vec<Option<Box<[PageTableEntry; TABLE_ENTRIES]>>>,
}

impl PageTables {
    pub fn new() -> Self {
        let mut directory = Vec::with_capacity(DIRECTORY_ENTRIES);
        directory.resize_with(DIRECTORY_ENTRIES, || None);
        PageTables {
            flat: [PageTableEntry::default(); FLAT_ENTRIES],
            directory,
        }
    }

    /// Max page number of the flat variant.
    pub fn flat_capacity(&self) -> u32 {
        FLAT_ENTRIES as u32
    }

    /// Resolve a key to its entry, lazily growing the hierarchical table.
    ///
    /// Flat keys must already be below [`Self::flat_capacity`]; the
    /// translator rejects out-of-range pages before ever building a key.
    pub fn entry_mut(&mut self, key: PageKey) -> &mut PageTableEntry {
        match key {
            PageKey::Flat(page) => &mut self.flat[page as usize],
            PageKey::Paged(vpn) => {
                let dir = (vpn >> LEVEL_BITS) as usize;
                let table = (vpn & LEVEL_MASK) as usize;
                let second = self.directory[dir]
                    .get_or_insert_with(|| Box::new([PageTableEntry::default(); TABLE_ENTRIES]));
                &mut second[table]
            }
        }
    }

    /// Read-only lookup that never allocates. Unmapped paged slots read as
    /// an unset default entry.
    pub fn entry(&self, key: PageKey) -> PageTableEntry {
        match key {
            PageKey::Flat(page) => self.flat[page as usize],
            PageKey::Paged(vpn) => {
                let dir = (vpn >> LEVEL_BITS) as usize;
                let table = (vpn & LEVEL_MASK) as usize;
                match &self.directory[dir] {
                    Some(second) => second[table],
                    None => PageTableEntry::default(),
                }
            }
        }
    }

    /// Whether the second-level table under `dir` has been allocated.
    pub fn second_level_present(&self, dir: u32) -> bool {
        self.directory[dir as usize].is_some()
    }
}

impl Default for PageTables {
    fn default() -> Self {
        Self::new()
    }
}
