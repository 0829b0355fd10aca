use std::collections::VecDeque;

use crate::error::{Result, VmError};
use crate::page_table::{PageKey, PageTables};
use crate::stats::StatsCollector;
use crate::storage::PageContentStore;
use crate::tlb::TlbCache;

/// One physical frame: a page-sized buffer of words.
pub struct Frame {
    content: Vec<i32>,
}

/// Fixed pool of physical frames with FIFO reuse.
///
/// Frames enter the FIFO queue when first handed out and cycle through it
/// forever after. The `owner` back-reference records which page-table entry
/// currently claims each frame; it exists for eviction bookkeeping only, the
/// entry itself stays the owner of the mapping. The FIFO policy here and the
/// TLB's LRU policy are deliberately independent; the only coordination is
/// that evicting a frame invalidates its table entry and any cached hint.
pub struct FrameAllocator {
    frames: Vec<Frame>,
    used: Vec<bool>,
    queue: VecDeque<usize>,
    owner: Vec<Option<PageKey>>,
}

impl FrameAllocator {
    /// An empty pool can never service a fault, so it is rejected up front.
    pub fn new(total_frames: usize, page_size: usize) -> Result<Self> {
        if total_frames == 0 {
            return Err(VmError::NoFrames);
        }
        let frames = (0..total_frames)
            .map(|_| Frame {
                content: vec![0; page_size],
            })
            .collect();
        Ok(FrameAllocator {
            frames,
            used: vec![false; total_frames],
            queue: VecDeque::with_capacity(total_frames),
            owner: vec![None; total_frames],
        })
    }

    pub fn total_frames(&self) -> usize {
        self.frames.len()
    }

    /// Hand out a frame for `new_owner`, evicting the oldest-used frame when
    /// the pool is full.
    ///
    /// Eviction writes the frame back through `store` when its owning entry
    /// is dirty, clears that entry's flags and binding, and drops any TLB
    /// hint naming the frame. The reused frame re-enters the FIFO tail, so
    /// allocation always succeeds once the pool exists; `Err` here means the
    /// pool invariant was broken and the run cannot continue.
    pub fn allocate(
        &mut self,
        new_owner: PageKey,
        tables: &mut PageTables,
        tlb: &mut TlbCache,
        store: &mut dyn PageContentStore,
        stats: &mut StatsCollector,
    ) -> Result<usize> {
        if let Some(frame) = self.used.iter().position(|&in_use| !in_use) {
            self.used[frame] = true;
            self.queue.push_back(frame);
            self.owner[frame] = Some(new_owner);
            return Ok(frame);
        }

        let frame = self.queue.pop_front().ok_or(VmError::NoFrames)?;

        if let Some(old_key) = self.owner[frame] {
            let entry = tables.entry_mut(old_key);
            if entry.dirty {
                if let Err(err) = store.write_back(frame, &self.frames[frame].content) {
                    eprintln!("warning: write-back of frame {frame} failed: {err}");
                }
                stats.record_dirty_write();
            }
            entry.clear();
            tlb.invalidate_frame(frame);
        }

        self.queue.push_back(frame);
        self.owner[frame] = Some(new_owner);
        Ok(frame)
    }

    pub fn content(&self, frame: usize) -> &[i32] {
        &self.frames[frame].content
    }

    pub fn content_mut(&mut self, frame: usize) -> &mut [i32] {
        &mut self.frames[frame].content
    }

    #[cfg(test)]
    fn owner_of(&self, frame: usize) -> Option<PageKey> {
        self.owner[frame]
    }
}
