//! Compare pulled message files against the relational store.
//!
//! Ids are assigned independently by each store, so a pulled record with a known id
//! may be a different message. The report only classifies; nothing is written.

use gitchat_core::error;
use gitchat_core::types::MessageRecord;
use gitchat_state::MessageStore;
use gitchat_state::messages::get_message;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Same id and content exist locally.
    Known,
    /// No local row with this id.
    Unknown,
    /// Local row with this id holds different content.
    Conflict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciledRecord {
    #[serde(flatten)]
    pub record: MessageRecord,
    pub status: RecordStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub records: Vec<ReconciledRecord>,
    pub known: usize,
    pub unknown: usize,
    pub conflicts: usize,
}

pub fn reconcile(pulled: &[MessageRecord], store: &MessageStore) -> error::Result<ReconcileReport> {
    let mut report = ReconcileReport::default();
    for record in pulled {
        let status = match get_message(store.connection(), record.id)? {
            None => RecordStatus::Unknown,
            Some(local) if local.content == record.content => RecordStatus::Known,
            Some(_) => RecordStatus::Conflict,
        };
        match status {
            RecordStatus::Known => report.known += 1,
            RecordStatus::Unknown => report.unknown += 1,
            RecordStatus::Conflict => report.conflicts += 1,
        }
        report.records.push(ReconciledRecord {
            record: record.clone(),
            status,
        });
    }
    Ok(report)
}
