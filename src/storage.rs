//! Page-content backing store.
//!
//! Two stores back a run, matching the file contract in the original tool:
//! a backing-store file consulted on page faults and appended to on dirty
//! write-back, and a flat data-memory file addressed by absolute physical
//! address for the final word read. Both are line oriented, one integer per
//! line; write-back blocks carry frame markers.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::constants::TOTAL_FRAMES;
use crate::error::{Result, VmError};

/// How much of a page a `load_page` call could actually fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Full,
    /// Backing data ran out; only the first `words` words were filled.
    Short { words: usize },
}

/// Durable page-content source/sink.
///
/// `load_page` returning `Err` means the store could not be opened at all,
/// which is fatal while a fault is in flight. Short data is reported through
/// [`LoadOutcome::Short`] and the run continues. `read_word` failures are
/// per-address; they surface as `None` and never abort.
pub trait PageContentStore {
    /// Fill `buf` from `buf.len()` consecutive words starting at word
    /// offset `page * buf.len()`.
    fn load_page(&mut self, frame: usize, page: u64, buf: &mut [i32]) -> Result<LoadOutcome>;

    /// Durably append `content`, tagged by frame index.
    fn write_back(&mut self, frame: usize, content: &[i32]) -> Result<()>;

    /// Read one word by absolute physical address, independent of any
    /// loaded frame buffer.
    fn read_word(&mut self, physical_address: usize) -> Option<i32>;
}

/// Line-oriented file store: `backing` for page content and write-back,
/// `data` for physical word reads (line number = physical address).
pub struct FileStore {
    backing_path: PathBuf,
    data_path: PathBuf,
    page_size: usize,
}

impl FileStore {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(backing: P, data: Q, page_size: usize) -> Self {
        FileStore {
            backing_path: backing.as_ref().to_path_buf(),
            data_path: data.as_ref().to_path_buf(),
            page_size,
        }
    }
}

impl PageContentStore for FileStore {
    fn load_page(&mut self, _frame: usize, page: u64, buf: &mut [i32]) -> Result<LoadOutcome> {
        let file = File::open(&self.backing_path).map_err(|source| {
            VmError::BackingStoreUnavailable {
                path: self.backing_path.clone(),
                source,
            }
        })?;

        let base = page as usize * buf.len();
        let mut filled = 0;
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            if line_no >= base + buf.len() {
                break;
            }
            let line = line?;
            if line_no >= base {
                if let Ok(value) = line.trim().parse::<i32>() {
                    buf[line_no - base] = value;
                }
                filled = line_no - base + 1;
            }
        }

        if filled == buf.len() {
            Ok(LoadOutcome::Full)
        } else {
            Ok(LoadOutcome::Short { words: filled })
        }
    }

    fn write_back(&mut self, frame: usize, content: &[i32]) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.backing_path)?;

        writeln!(file, "--- frame {frame} ---")?;
        for word in content {
            writeln!(file, "{word}")?;
        }
        writeln!(file, "--- end frame {frame} ---")?;
        Ok(())
    }

    fn read_word(&mut self, physical_address: usize) -> Option<i32> {
        if physical_address >= TOTAL_FRAMES * self.page_size {
            return None;
        }
        let file = File::open(&self.data_path).ok()?;
        let line = BufReader::new(file)
            .lines()
            .nth(physical_address)?
            .ok()?;
        line.trim().parse::<i32>().ok()
    }
}

/// In-memory store used by tests and embedders. Records every write-back so
/// assertions can check exactly which frames were flushed.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub backing: Vec<i32>,
    pub data: Vec<i32>,
    pub write_backs: Vec<(usize, Vec<i32>)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: Vec<i32>) -> Self {
        MemoryStore {
            data,
            ..Self::default()
        }
    }
}

impl PageContentStore for MemoryStore {
    fn load_page(&mut self, _frame: usize, page: u64, buf: &mut [i32]) -> Result<LoadOutcome> {
        let base = page as usize * buf.len();
        let mut filled = 0;
        for (i, slot) in buf.iter_mut().enumerate() {
            match self.backing.get(base + i) {
                Some(&word) => {
                    *slot = word;
                    filled = i + 1;
                }
                None => break,
            }
        }
        if filled == buf.len() {
            Ok(LoadOutcome::Full)
        } else {
            Ok(LoadOutcome::Short { words: filled })
        }
    }

    fn write_back(&mut self, frame: usize, content: &[i32]) -> Result<()> {
        self.write_backs.push((frame, content.to_vec()));
        Ok(())
    }

    fn read_word(&mut self, physical_address: usize) -> Option<i32> {
        self.data.get(physical_address).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_short_load() {
        let mut store = MemoryStore {
            backing: vec![1, 2, 3],
            ..MemoryStore::default()
        };
        let mut buf = vec![0i32; 4];
        let outcome = store.load_page(0, 0, &mut buf).unwrap();
        assert_eq!(outcome, LoadOutcome::Short { words: 3 });
        assert_eq!(buf, vec![1, 2, 3, 0]);
    }

    #[test]
    fn test_memory_store_full_load_from_page_offset() {
        let mut store = MemoryStore {
            backing: (0..8).collect(),
            ..MemoryStore::default()
        };
        let mut buf = vec![0i32; 4];
        let outcome = store.load_page(0, 1, &mut buf).unwrap();
        assert_eq!(outcome, LoadOutcome::Full);
        assert_eq!(buf, vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_memory_store_records_write_backs() {
        let mut store = MemoryStore::new();
        store.write_back(3, &[9, 9]).unwrap();
        assert_eq!(store.write_backs, vec![(3, vec![9, 9])]);
    }

    #[test]
    fn test_memory_store_read_word() {
        let mut store = MemoryStore::with_data(vec![10, 20, 30]);
        assert_eq!(store.read_word(1), Some(20));
        assert_eq!(store.read_word(3), None);
    }
}
