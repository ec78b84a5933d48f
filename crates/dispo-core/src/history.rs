//! History views over the local slots and optional seed records.

use std::collections::HashSet;

use serde::Serialize;

use crate::models::DispositionRecord;

/// Badge shown next to a history row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncBadge {
    Synced,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub record: DispositionRecord,
    pub badge: SyncBadge,
}

impl HistoryEntry {
    pub const fn is_synced(&self) -> bool {
        matches!(self.badge, SyncBadge::Synced)
    }
}

/// Merge synced, pending, and seed records into one newest-first list.
///
/// A record id appears once; synced wins over pending, pending over seed.
/// Seeds are badged by their own `synced` flag. Ties on `created_at` keep
/// their merge order.
pub fn merge_history(
    synced: &[DispositionRecord],
    pending: &[DispositionRecord],
    seeds: &[DispositionRecord],
) -> Vec<HistoryEntry> {
    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(synced.len() + pending.len() + seeds.len());

    let sources = synced
        .iter()
        .map(|record| (record, SyncBadge::Synced))
        .chain(pending.iter().map(|record| (record, SyncBadge::Pending)))
        .chain(seeds.iter().map(|record| {
            let badge = if record.synced {
                SyncBadge::Synced
            } else {
                SyncBadge::Pending
            };
            (record, badge)
        }));

    for (record, badge) in sources {
        if seen.insert(record.id.clone()) {
            entries.push(HistoryEntry {
                record: record.clone(),
                badge,
            });
        }
    }

    entries.sort_by(|a, b| b.record.created_at.cmp(&a.record.created_at));
    entries
}

/// Look up a form answer on a record, whichever field shape it carries.
pub fn field_value<'a>(record: &'a DispositionRecord, name: &str) -> Option<&'a str> {
    record.fields.get(name)
}

pub fn filter_by_customer(
    entries: impl IntoIterator<Item = HistoryEntry>,
    customer_id: &str,
) -> Vec<HistoryEntry> {
    entries
        .into_iter()
        .filter(|entry| entry.record.customer_id.as_deref() == Some(customer_id))
        .collect()
}

pub fn filter_by_line_of_business(
    entries: impl IntoIterator<Item = HistoryEntry>,
    line_of_business_id: &str,
) -> Vec<HistoryEntry> {
    entries
        .into_iter()
        .filter(|entry| entry.record.line_of_business_id.as_deref() == Some(line_of_business_id))
        .collect()
}

/// One page of a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// Zero-based page index
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// Slice `items[page * page_size .. page * page_size + page_size]`, clamped
/// to the list. A zero page size yields empty pages.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> Page<'_, T> {
    let total = items.len();
    let total_pages = if page_size == 0 {
        0
    } else {
        total.div_ceil(page_size)
    };
    let start = page.saturating_mul(page_size).min(total);
    let end = start.saturating_add(page_size).min(total);

    Page {
        items: &items[start..end],
        page,
        page_size,
        total,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::{DispositionDraft, DispositionFields};

    fn record_at(millis: i64) -> DispositionRecord {
        DispositionDraft::new(DispositionFields::flat([("status", "PTP")]))
            .with_customer("cust-1")
            .into_record_at(Utc.timestamp_millis_opt(millis).unwrap())
    }

    fn created(entries: &[HistoryEntry]) -> Vec<i64> {
        entries.iter().map(|entry| entry.record.created_at).collect()
    }

    #[test]
    fn merges_newest_first_with_badges() {
        let synced = vec![record_at(1_000).into_synced(), record_at(3_000).into_synced()];
        let pending = vec![record_at(2_000)];

        let history = merge_history(&synced, &pending, &[]);

        assert_eq!(created(&history), vec![3_000, 2_000, 1_000]);
        assert_eq!(
            history.iter().map(|entry| entry.badge).collect::<Vec<_>>(),
            vec![SyncBadge::Synced, SyncBadge::Pending, SyncBadge::Synced]
        );
    }

    #[test]
    fn duplicate_ids_prefer_synced_then_pending() {
        let pending = record_at(2_000);
        let synced = pending.clone().into_synced();
        let seed = record_at(1_000);
        let seed_copy = DispositionRecord {
            synced: true,
            ..seed.clone()
        };

        let history = merge_history(&[synced], &[pending, seed.clone()], &[seed_copy]);

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].badge, SyncBadge::Synced);
        assert_eq!(history[1].record.id, seed.id);
        assert_eq!(history[1].badge, SyncBadge::Pending);
    }

    #[test]
    fn equal_timestamps_keep_merge_order() {
        let a = record_at(5_000).into_synced();
        let b = record_at(5_000);
        let c = record_at(5_000);

        let history = merge_history(&[a.clone()], &[b.clone()], &[c.clone()]);

        let ids: Vec<_> = history.into_iter().map(|entry| entry.record.id).collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
    }

    #[test]
    fn seeds_are_badged_by_their_own_flag() {
        let history = merge_history(&[], &[], &[record_at(1).into_synced(), record_at(2)]);
        assert_eq!(history[0].badge, SyncBadge::Pending);
        assert!(history[1].is_synced());
    }

    #[test]
    fn paginate_slices_by_offset() {
        let items: Vec<u32> = (0..7).collect();

        let first = paginate(&items, 0, 3);
        assert_eq!(first.items, &[0, 1, 2]);
        assert_eq!(first.total, 7);
        assert_eq!(first.total_pages, 3);

        assert_eq!(paginate(&items, 2, 3).items, &[6]);
        assert!(paginate(&items, 5, 3).items.is_empty());
        assert!(paginate(&items, 0, 0).items.is_empty());
        assert_eq!(paginate(&items, 0, 0).total_pages, 0);
        assert!(paginate(&items, usize::MAX, usize::MAX).items.is_empty());
    }

    #[test]
    fn filters_by_customer_and_line_of_business() {
        let mut other = record_at(10);
        other.customer_id = Some("cust-2".to_string());
        other.line_of_business_id = Some("lob-2".to_string());
        let mine = record_at(20);

        let history = merge_history(&[], &[mine.clone(), other.clone()], &[]);

        let by_customer = filter_by_customer(history.clone(), "cust-1");
        assert_eq!(by_customer.len(), 1);
        assert_eq!(by_customer[0].record.id, mine.id);

        let by_lob = filter_by_line_of_business(history, "lob-2");
        assert_eq!(by_lob.len(), 1);
        assert_eq!(by_lob[0].record.id, other.id);
    }

    #[test]
    fn field_value_reads_either_shape() {
        let mut record = record_at(1);
        assert_eq!(field_value(&record, "status"), Some("PTP"));
        record.fields = DispositionFields::fielded([("Call Status", "Answered")]);
        assert_eq!(field_value(&record, "Call Status"), Some("Answered"));
        assert_eq!(field_value(&record, "status"), None);
    }
}
