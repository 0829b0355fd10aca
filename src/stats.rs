use std::fmt;

/// Monotonic event counters for one simulation run.
///
/// Counters only ever increase; the report writer reads them through
/// [`StatsCollector::snapshot`]. Two identities hold at every point between
/// translations: `tlb_hits + tlb_misses == total_addresses` and
/// `page_hits + page_faults == tlb_misses`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_addresses: u64,
    pub tlb_hits: u64,
    pub tlb_misses: u64,
    pub page_hits: u64,
    pub page_faults: u64,
    pub dirty_writes: u64,
}

#[derive(Debug, Default)]
pub struct StatsCollector {
    counts: StatsSnapshot,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_address(&mut self) {
        self.counts.total_addresses += 1;
    }

    pub fn record_tlb_hit(&mut self) {
        self.counts.tlb_hits += 1;
    }

    pub fn record_tlb_miss(&mut self) {
        self.counts.tlb_misses += 1;
    }

    pub fn record_page_hit(&mut self) {
        self.counts.page_hits += 1;
    }

    pub fn record_page_fault(&mut self) {
        self.counts.page_faults += 1;
    }

    pub fn record_dirty_write(&mut self) {
        self.counts.dirty_writes += 1;
    }

    /// Read-only view for the report writer.
    pub fn snapshot(&self) -> StatsSnapshot {
        self.counts
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=========== FINAL REPORT ===========")?;
        writeln!(f, "Total addresses processed: {}", self.total_addresses)?;
        writeln!(f, "TLB hits: {}", self.tlb_hits)?;
        writeln!(f, "TLB misses: {}", self.tlb_misses)?;
        writeln!(f, "Page hits: {}", self.page_hits)?;
        writeln!(f, "Page faults: {}", self.page_faults)?;
        writeln!(f, "Dirty writes (pages written back): {}", self.dirty_writes)?;
        writeln!(f, "====================================")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let stats = StatsCollector::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_counters_are_monotonic() {
        let mut stats = StatsCollector::new();
        stats.record_address();
        stats.record_tlb_miss();
        stats.record_page_fault();
        stats.record_dirty_write();

        let snap = stats.snapshot();
        assert_eq!(snap.total_addresses, 1);
        assert_eq!(snap.tlb_hits, 0);
        assert_eq!(snap.tlb_misses, 1);
        assert_eq!(snap.page_faults, 1);
        assert_eq!(snap.dirty_writes, 1);
    }

    #[test]
    fn test_report_lists_every_counter() {
        let mut stats = StatsCollector::new();
        stats.record_address();
        stats.record_tlb_hit();

        let report = stats.snapshot().to_string();
        assert!(report.contains("Total addresses processed: 1"));
        assert!(report.contains("TLB hits: 1"));
        assert!(report.contains("TLB misses: 0"));
        assert!(report.contains("Page faults: 0"));
        assert!(report.contains("Dirty writes"));
    }
}
