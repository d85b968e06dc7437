//! Read-only report payloads.
//!
//! Reports are stored verbatim under names such as
//! `savings_reports_entries` and `savings_reports_schema`.

use std::fmt;

use serde_json::{Value, json};

use crate::error::{SimError, SimResult};
use crate::store::same_id;

use super::{WorkdayStore, id_value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    ContractMilestone,
    Contract,
    Event,
    PerformanceReviewAnswer,
    PerformanceReview,
    ProjectMilestone,
    Project,
    Savings,
    Supplier,
    SupplierReview,
}

impl ReportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContractMilestone => "contract_milestone_reports",
            Self::Contract => "contract_reports",
            Self::Event => "event_reports",
            Self::PerformanceReviewAnswer => "performance_review_answer_reports",
            Self::PerformanceReview => "performance_review_reports",
            Self::ProjectMilestone => "project_milestone_reports",
            Self::Project => "project_reports",
            Self::Savings => "savings_reports",
            Self::Supplier => "supplier_reports",
            Self::SupplierReview => "supplier_review_reports",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn stored(store: &WorkdayStore, name: &str, empty: Value) -> Value {
    store.db.reports.get(name).cloned().unwrap_or(empty)
}

/// Entries of a report kind; empty when none were loaded.
pub fn entries(store: &WorkdayStore, kind: ReportKind) -> SimResult<Value> {
    Ok(stored(store, &format!("{kind}_entries"), json!([])))
}

pub fn schema(store: &WorkdayStore, kind: ReportKind) -> SimResult<Value> {
    Ok(stored(store, &format!("{kind}_schema"), json!({})))
}

/// The list of saved event reports.
pub fn event_reports(store: &WorkdayStore) -> SimResult<Value> {
    Ok(stored(store, ReportKind::Event.as_str(), json!([])))
}

pub fn event_report_entries(store: &WorkdayStore, report_id: &str) -> SimResult<Value> {
    Ok(stored(store, &format!("event_reports_{report_id}_entries"), json!([])))
}

pub fn project_report_entries(store: &WorkdayStore, report_id: &str) -> SimResult<Value> {
    Ok(stored(store, &format!("project_reports_{report_id}_entries"), json!([])))
}

/// Suppliers as they appear in reports.
pub fn suppliers(store: &WorkdayStore) -> SimResult<Value> {
    Ok(stored(store, "suppliers", json!([])))
}

pub fn supplier(store: &WorkdayStore, supplier_id: &str) -> SimResult<Value> {
    let wanted = id_value(supplier_id);
    store
        .db
        .reports
        .get("suppliers")
        .and_then(Value::as_array)
        .and_then(|suppliers| {
            suppliers
                .iter()
                .find(|supplier| supplier.get("id").is_some_and(|id| same_id(id, &wanted)))
        })
        .cloned()
        .ok_or_else(|| SimError::not_found(format!("Supplier {supplier_id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::VendorStore;

    #[test]
    fn missing_reports_are_empty() {
        let store = WorkdayStore::init();
        assert_eq!(entries(&store, ReportKind::Savings).expect("entries"), json!([]));
        assert_eq!(schema(&store, ReportKind::Savings).expect("schema"), json!({}));
    }

    #[test]
    fn numbered_report_entries_are_kept_apart() {
        let mut store = WorkdayStore::init();
        let reports = &mut store.db_mut().reports;
        reports.insert("event_reports_1_entries".to_string(), json!([{ "id": "e1" }]));
        reports.insert("project_reports_entries".to_string(), json!([{ "id": "p" }]));

        assert_eq!(event_report_entries(&store, "1").expect("entries")[0]["id"], "e1");
        assert_eq!(event_report_entries(&store, "2").expect("entries"), json!([]));
        assert_eq!(entries(&store, ReportKind::Project).expect("entries")[0]["id"], "p");
    }
}
