//! Persistence seams.
//!
//! Handlers only see these traits. A concrete adapter is picked at startup
//! from `STORE_BACKEND` and shared through `AppState`.

use async_trait::async_trait;
use std::ops::Range;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::completion::Completion;
use crate::models::habit::{Habit, HabitChanges, NewHabit};
use crate::models::user::{NewUser, User};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `AppError::Conflict` when the email or username is taken.
    async fn insert_user(&self, new_user: NewUser) -> AppResult<User>;

    async fn find_user(&self, user_id: Uuid) -> AppResult<Option<User>>;

    /// Matches `login` against both email and username.
    async fn find_user_by_login(&self, login: &str) -> AppResult<Option<User>>;
}

#[async_trait]
pub trait HabitStore: Send + Sync {
    async fn insert_habit(&self, user_id: Uuid, new_habit: NewHabit) -> AppResult<Habit>;

    async fn find_habit(&self, habit_id: Uuid) -> AppResult<Option<Habit>>;

    /// Active habits of a user, newest first.
    async fn list_active_habits(&self, user_id: Uuid) -> AppResult<Vec<Habit>>;

    async fn update_habit(&self, habit_id: Uuid, changes: HabitChanges)
        -> AppResult<Option<Habit>>;

    /// Completions of the given habits, most recent `completed_at` first.
    async fn list_completions(&self, habit_ids: &[Uuid]) -> AppResult<Vec<Completion>>;

    /// Stores a completion and stamps the habit's `last_completed`.
    ///
    /// Fails with `AppError::Conflict` when the habit already has a completion
    /// inside `day`. The check and the insert are atomic per habit.
    async fn insert_completion(
        &self,
        habit_id: Uuid,
        completed_at: DateTime<Utc>,
        day: Range<DateTime<Utc>>,
        notes: Option<String>,
    ) -> AppResult<Completion>;

    async fn find_completion(&self, completion_id: Uuid) -> AppResult<Option<Completion>>;

    /// Returns false if nothing was deleted.
    async fn delete_completion(&self, completion_id: Uuid) -> AppResult<bool>;

    async fn ping(&self) -> AppResult<()>;
}
