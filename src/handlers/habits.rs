use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::completion::Completion;
use crate::models::habit::{
    random_color, CreateHabitRequest, Habit, HabitChanges, HabitWithStreak, NewHabit,
    UpdateHabitRequest,
};
use crate::services::streak::{calculate_streak_data_at, is_completed_today_at};
use crate::AppState;

/// Loads a habit the caller owns. Someone else's habit is reported as missing.
pub(crate) async fn owned_habit(
    state: &AppState,
    habit_id: Uuid,
    user_id: Uuid,
) -> AppResult<Habit> {
    state
        .habits
        .find_habit(habit_id)
        .await?
        .filter(|h| h.user_id == user_id)
        .ok_or(AppError::NotFound("Habit not found".into()))
}

/// Pairs each habit with its completions and the streak facts derived from
/// them, all evaluated against the same `now`.
pub(crate) fn attach_streaks(
    habits: Vec<Habit>,
    completions: Vec<Completion>,
    now: DateTime<Utc>,
) -> Vec<HabitWithStreak> {
    let mut by_habit: HashMap<Uuid, Vec<Completion>> = HashMap::new();
    for completion in completions {
        by_habit
            .entry(completion.habit_id)
            .or_default()
            .push(completion);
    }

    habits
        .into_iter()
        .map(|habit| {
            let completions = by_habit.remove(&habit.id).unwrap_or_default();
            HabitWithStreak {
                streak_data: calculate_streak_data_at(&completions, now),
                completed_today: is_completed_today_at(&completions, now, &Utc),
                habit,
                completions,
            }
        })
        .collect()
}

pub(crate) async fn load_habits_with_streaks(
    state: &AppState,
    user_id: Uuid,
) -> AppResult<Vec<HabitWithStreak>> {
    let habits = state.habits.list_active_habits(user_id).await?;
    let habit_ids: Vec<Uuid> = habits.iter().map(|h| h.id).collect();
    let completions = state.habits.list_completions(&habit_ids).await?;
    Ok(attach_streaks(habits, completions, Utc::now()))
}

pub async fn list_habits(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<HabitWithStreak>>> {
    let habits = load_habits_with_streaks(&state, auth_user.id).await?;
    Ok(Json(habits))
}

pub async fn get_habit(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(habit_id): Path<Uuid>,
) -> AppResult<Json<HabitWithStreak>> {
    let habit = owned_habit(&state, habit_id, auth_user.id).await?;
    let completions = state.habits.list_completions(&[habit_id]).await?;

    let mut habits = attach_streaks(vec![habit], completions, Utc::now());
    let habit = habits
        .pop()
        .ok_or(AppError::NotFound("Habit not found".into()))?;
    Ok(Json(habit))
}

pub async fn create_habit(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateHabitRequest>,
) -> AppResult<Json<Habit>> {
    body.validate()?;

    let habit = state
        .habits
        .insert_habit(
            auth_user.id,
            NewHabit {
                title: body.title,
                description: body.description,
                frequency: body.frequency.unwrap_or_default(),
                color: random_color().to_string(),
            },
        )
        .await?;

    tracing::info!(
        user_id = %auth_user.id,
        username = %auth_user.username,
        habit_id = %habit.id,
        "Habit created"
    );

    Ok(Json(habit))
}

pub async fn update_habit(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(habit_id): Path<Uuid>,
    Json(body): Json<UpdateHabitRequest>,
) -> AppResult<Json<Habit>> {
    body.validate()?;
    owned_habit(&state, habit_id, auth_user.id).await?;

    let habit = state
        .habits
        .update_habit(habit_id, body.into())
        .await?
        .ok_or(AppError::NotFound("Habit not found".into()))?;

    Ok(Json(habit))
}

/// Soft delete: the habit is deactivated and its history kept.
pub async fn delete_habit(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(habit_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    owned_habit(&state, habit_id, auth_user.id).await?;

    state
        .habits
        .update_habit(
            habit_id,
            HabitChanges {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await?
        .ok_or(AppError::NotFound("Habit not found".into()))?;

    tracing::info!(user_id = %auth_user.id, habit_id = %habit_id, "Habit deactivated");

    Ok(Json(serde_json::json!({ "deleted": true, "id": habit_id })))
}
