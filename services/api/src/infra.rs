use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::NaiveDate;
use leasekeeper::config::RulesConfig;
use leasekeeper::workflows::rentals::{MemoryDocumentStorage, MemoryEntityStore, RentalDesk};
use metrics_exporter_prometheus::PrometheusHandle;

/// Base locator for documents kept by the in-process storage backend.
pub(crate) const DOCUMENT_BASE_URL: &str = "memory://leasekeeper/documents";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type MemoryDesk = RentalDesk<MemoryEntityStore, MemoryDocumentStorage>;

/// Desk wired against process-local storage. State does not survive a restart.
pub(crate) fn memory_desk(rules: RulesConfig) -> MemoryDesk {
    RentalDesk::new(
        Arc::new(MemoryEntityStore::new()),
        Arc::new(MemoryDocumentStorage::with_base_url(DOCUMENT_BASE_URL)),
        rules,
    )
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_trims_and_reports_input() {
        assert_eq!(
            parse_date(" 2025-10-01 "),
            Ok(NaiveDate::from_ymd_opt(2025, 10, 1).expect("valid date"))
        );
        let err = parse_date("10/01/2025").expect_err("rejects US format");
        assert!(err.contains("10/01/2025"));
    }
}
