use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::error::AppResult;
use crate::handlers::habits::{load_habits_with_streaks, owned_habit};
use crate::models::completion::{Completion, StreakInfo};
use crate::models::habit::HabitWithStreak;
use crate::services::streak::{calculate_streak_data_at, is_completed_today_at};
use crate::AppState;

pub async fn get_streak(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(habit_id): Path<Uuid>,
) -> AppResult<Json<StreakInfo>> {
    owned_habit(&state, habit_id, auth_user.id).await?;
    let completions = state.habits.list_completions(&[habit_id]).await?;
    Ok(Json(streak_info_at(habit_id, &completions, Utc::now())))
}

fn streak_info_at(habit_id: Uuid, completions: &[Completion], now: DateTime<Utc>) -> StreakInfo {
    StreakInfo {
        habit_id,
        streak_data: calculate_streak_data_at(completions, now),
        completed_today: is_completed_today_at(completions, now, &Utc),
    }
}

/// Active habits ranked by best streak, highest first.
pub async fn list_streaks(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<HabitWithStreak>>> {
    let mut habits = load_habits_with_streaks(&state, auth_user.id).await?;
    rank_by_best_streak(&mut habits);
    Ok(Json(habits))
}

fn rank_by_best_streak(habits: &mut [HabitWithStreak]) {
    habits.sort_by(|a, b| b.streak_data.best_streak.cmp(&a.streak_data.best_streak));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::habit::{Habit, HabitFrequency};
    use crate::services::streak::StreakData;
    use chrono::{Duration, TimeZone};

    fn ranked(title: &str, best_streak: u32) -> HabitWithStreak {
        let now = Utc::now();
        HabitWithStreak {
            habit: Habit {
                id: Uuid::new_v4(),
                user_id: Uuid::nil(),
                title: title.into(),
                description: None,
                frequency: HabitFrequency::Daily,
                color: "#F7DC6F".into(),
                is_active: true,
                last_completed: None,
                created_at: now,
                updated_at: now,
            },
            completions: Vec::new(),
            streak_data: StreakData {
                streak: 0,
                best_streak,
                total: best_streak,
            },
            completed_today: false,
        }
    }

    #[test]
    fn test_rank_is_descending_and_stable() {
        let mut habits = vec![
            ranked("a", 1),
            ranked("b", 5),
            ranked("c", 1),
            ranked("d", 3),
        ];
        rank_by_best_streak(&mut habits);
        let titles: Vec<&str> = habits.iter().map(|h| h.habit.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_streak_info_uses_one_instant() {
        let habit_id = Uuid::new_v4();
        let done_at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 10).unwrap();
        let completions = vec![Completion {
            id: Uuid::new_v4(),
            habit_id,
            completed_at: done_at,
            notes: None,
            created_at: done_at,
        }];

        let before_midnight = Utc.with_ymd_and_hms(2024, 6, 1, 23, 59, 59).unwrap();
        let info = streak_info_at(habit_id, &completions, before_midnight);
        assert_eq!(info.streak_data.streak, 1);
        assert!(info.completed_today);

        let after_midnight = before_midnight + Duration::seconds(2);
        let info = streak_info_at(habit_id, &completions, after_midnight);
        assert_eq!(info.streak_data.streak, 1);
        assert!(!info.completed_today);
    }
}
