use serde::{Deserialize, Serialize};
use sqlx::Type;

/// Outcome of a teacher's review. A solution without any correction row is
/// reported as `Pending` as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "correctionstatus", rename_all = "lowercase")]
pub enum CorrectionStatus {
    Pending,
    Passed,
    Failed,
}

impl CorrectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CorrectionStatus::Pending => "pending",
            CorrectionStatus::Passed => "passed",
            CorrectionStatus::Failed => "failed",
        }
    }
}
