use crate::error::Result;
use crate::tag::TicketTag;
use crate::types::TicketRecord;
use std::collections::BTreeMap;

/// Tickets already present in the tracker, keyed by the source issue number
/// found in their summary.
///
/// Filled once from a tracker search, then only read. When two tickets carry
/// the same number the first one seen is kept and the other is reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerIndex {
    tickets: BTreeMap<u64, TicketRecord>,
}

impl TrackerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record unless the number is already indexed. Returns `false`
    /// for a duplicate, leaving the existing record in place.
    pub fn insert(&mut self, number: u64, record: TicketRecord) -> bool {
        if let Some(existing) = self.tickets.get(&number) {
            tracing::warn!(
                number,
                kept = %existing.key,
                ignored = %record.key,
                "duplicate tracker tickets for the same source issue"
            );
            return false;
        }
        self.tickets.insert(number, record);
        true
    }

    /// Index a ticket by its summary. Untagged summaries are skipped and
    /// yield `Ok(None)`.
    pub fn ingest(
        &mut self,
        tag: &TicketTag,
        summary: &str,
        record: TicketRecord,
    ) -> Result<Option<u64>> {
        let Some(number) = tag.extract(summary)? else {
            return Ok(None);
        };
        self.insert(number, record);
        Ok(Some(number))
    }

    pub fn get(&self, number: u64) -> Option<&TicketRecord> {
        self.tickets.get(&number)
    }

    /// Indexed source issue numbers in ascending order.
    pub fn numbers(&self) -> Vec<u64> {
        self.tickets.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}
