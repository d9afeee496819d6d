use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::services::streak::StreakData;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Completion {
    pub id: Uuid,
    pub habit_id: Uuid,
    pub completed_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateCompletionRequest {
    #[validate(length(max = 500, message = "Notes must be under 500 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionQuery {
    /// Restrict to completions recorded on this UTC day.
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HabitSummary {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct CompletionWithHabit {
    #[serde(flatten)]
    pub completion: Completion,
    pub habit: Option<HabitSummary>,
}

#[derive(Debug, Serialize)]
pub struct StreakInfo {
    pub habit_id: Uuid,
    #[serde(flatten)]
    pub streak_data: StreakData,
    pub completed_today: bool,
}
