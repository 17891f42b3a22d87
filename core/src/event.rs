//! Run event log: everything an analysis run did, in order.
//!
//! RULE: The engine records every milestone as an AnalysisEvent.
//! Two runs with the same seed must produce identical payloads.

use crate::types::{CompanyId, Industry, RunId};
use serde::{Deserialize, Serialize};

/// Every event emitted during an analysis run.
/// Variants are added over time, never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisEvent {
    RunInitialized {
        run_id: RunId,
        seed:   u64,
    },
    CompaniesGenerated {
        count: usize,
    },
    CompanySimulated {
        company_id: CompanyId,
        industry:   Industry,
        runs:       usize,
        mean_loss:  f64,
        total_loss: f64,
    },
    CompanySkipped {
        company_id: CompanyId,
        reason:     String,
    },
    RunCompleted {
        simulated: usize,
        skipped:   usize,
    },
}

impl AnalysisEvent {
    /// Stable name for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RunInitialized { .. }     => "run_initialized",
            Self::CompaniesGenerated { .. } => "companies_generated",
            Self::CompanySimulated { .. }   => "company_simulated",
            Self::CompanySkipped { .. }     => "company_skipped",
            Self::RunCompleted { .. }       => "run_completed",
        }
    }
}

/// A persisted event log row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub run_id:     RunId,
    pub seq:        u64,
    pub event_type: String,
    pub payload:    String,
}
