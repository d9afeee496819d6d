use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::handlers::habits::owned_habit;
use crate::models::completion::{
    Completion, CompletionQuery, CompletionWithHabit, CreateCompletionRequest, HabitSummary,
};
use crate::services::streak::{day_bounds, get_completions_for_date};
use crate::AppState;

/// Marks a habit complete for today. One completion per habit per UTC day.
pub async fn create_completion(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(habit_id): Path<Uuid>,
    Json(body): Json<CreateCompletionRequest>,
) -> AppResult<Json<Completion>> {
    body.validate()?;

    let habit = owned_habit(&state, habit_id, auth_user.id).await?;
    if !habit.is_active {
        return Err(AppError::Validation("Habit is no longer active".into()));
    }

    let now = Utc::now();
    let (day_start, day_end) = day_bounds(now.date_naive(), &Utc);
    let completion = state
        .habits
        .insert_completion(habit_id, now, day_start..day_end, body.notes)
        .await?;

    tracing::info!(
        user_id = %auth_user.id,
        habit_id = %habit_id,
        completion_id = %completion.id,
        "Habit completed"
    );

    Ok(Json(completion))
}

pub async fn list_habit_completions(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(habit_id): Path<Uuid>,
    Query(query): Query<CompletionQuery>,
) -> AppResult<Json<Vec<Completion>>> {
    owned_habit(&state, habit_id, auth_user.id).await?;

    let completions = state.habits.list_completions(&[habit_id]).await?;
    let completions = match query.date {
        Some(date) => get_completions_for_date(&completions, date, &Utc)
            .into_iter()
            .cloned()
            .collect(),
        None => completions,
    };

    Ok(Json(completions))
}

/// Every completion across the caller's active habits, newest first.
pub async fn list_completions(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<CompletionWithHabit>>> {
    let habits = state.habits.list_active_habits(auth_user.id).await?;
    if habits.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let habit_ids: Vec<Uuid> = habits.iter().map(|h| h.id).collect();
    let summaries: HashMap<Uuid, HabitSummary> = habits
        .into_iter()
        .map(|h| {
            (
                h.id,
                HabitSummary {
                    id: h.id,
                    title: h.title,
                },
            )
        })
        .collect();

    let completions = state
        .habits
        .list_completions(&habit_ids)
        .await?
        .into_iter()
        .map(|completion| CompletionWithHabit {
            habit: summaries.get(&completion.habit_id).cloned(),
            completion,
        })
        .collect();

    Ok(Json(completions))
}

pub async fn delete_completion(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(completion_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let completion = state
        .habits
        .find_completion(completion_id)
        .await?
        .ok_or(AppError::NotFound("Completion not found".into()))?;

    // Ownership goes through the parent habit.
    match owned_habit(&state, completion.habit_id, auth_user.id).await {
        Err(AppError::NotFound(_)) => {
            return Err(AppError::NotFound("Completion not found".into()))
        }
        other => other?,
    };

    if !state.habits.delete_completion(completion_id).await? {
        return Err(AppError::NotFound("Completion not found".into()));
    }

    tracing::info!(
        user_id = %auth_user.id,
        habit_id = %completion.habit_id,
        completion_id = %completion_id,
        "Completion deleted"
    );

    Ok(Json(serde_json::json!({ "deleted": true, "id": completion_id })))
}
