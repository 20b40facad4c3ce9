use serde::{Deserialize, Serialize};

use crate::timer::reconcile;

/// One day of a study plan: the parent entity of a timer session.
///
/// Owned by the study-plan service; the timer only reads it to seed a
/// countdown and to render the "timer active" banner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyDay {
    pub study_plan_day_id: String,
    pub subject: String,
    pub allocated_minutes: u32,
    /// May be fractional; only whole minutes count against the budget.
    pub studied_minutes: f64,
    #[serde(default)]
    pub status: String,
}

impl StudyDay {
    pub fn new(
        study_plan_day_id: impl Into<String>,
        subject: impl Into<String>,
        allocated_minutes: u32,
        studied_minutes: f64,
    ) -> Self {
        Self {
            study_plan_day_id: study_plan_day_id.into(),
            subject: subject.into(),
            allocated_minutes,
            studied_minutes,
            status: String::new(),
        }
    }

    /// Seconds still to study, derived from the server-side totals.
    pub fn budget_secs(&self) -> u64 {
        reconcile::initial_budget(self.allocated_minutes, self.studied_minutes)
    }
}
