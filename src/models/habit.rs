use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::completion::Completion;
use crate::services::streak::StreakData;

/// Palette new habits draw their colour from.
pub const HABIT_COLORS: [&str; 10] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEAA7", "#DDA0DD", "#98D8E8", "#F7DC6F",
    "#BB8FCE", "#85C1E9",
];

pub fn random_color() -> &'static str {
    HABIT_COLORS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(HABIT_COLORS[0])
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Habit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub frequency: HabitFrequency,
    pub color: String,
    pub is_active: bool,
    pub last_completed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored with the habit but not consulted by streak math.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "habit_frequency", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum HabitFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl Default for HabitFrequency {
    fn default() -> Self {
        Self::Daily
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateHabitRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: String,
    #[validate(length(max = 500, message = "Description must be under 500 characters"))]
    pub description: Option<String>,
    pub frequency: Option<HabitFrequency>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateHabitRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: Option<String>,
    /// An empty string clears the description.
    #[validate(length(max = 500, message = "Description must be under 500 characters"))]
    pub description: Option<String>,
    pub frequency: Option<HabitFrequency>,
    pub is_active: Option<bool>,
}

/// Fields of a habit about to be inserted.
#[derive(Debug, Clone)]
pub struct NewHabit {
    pub title: String,
    pub description: Option<String>,
    pub frequency: HabitFrequency,
    pub color: String,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct HabitChanges {
    pub title: Option<String>,
    /// `Some(None)` sets the column to NULL.
    pub description: Option<Option<String>>,
    pub frequency: Option<HabitFrequency>,
    pub is_active: Option<bool>,
}

impl From<UpdateHabitRequest> for HabitChanges {
    fn from(req: UpdateHabitRequest) -> Self {
        Self {
            title: req.title,
            description: req
                .description
                .map(|d| Some(d).filter(|d| !d.trim().is_empty())),
            frequency: req.frequency,
            is_active: req.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HabitWithStreak {
    #[serde(flatten)]
    pub habit: Habit,
    pub completions: Vec<Completion>,
    pub streak_data: StreakData,
    pub completed_today: bool,
}
