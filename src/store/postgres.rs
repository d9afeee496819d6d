use std::ops::Range;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::completion::Completion;
use crate::models::habit::{Habit, HabitChanges, NewHabit};
use crate::models::user::{NewUser, User};
use crate::store::{HabitStore, UserStore};

/// Postgres-backed store. Expects the tables in `schema.sql`.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, new_user: NewUser) -> AppResult<User> {
        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, username, name, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.email)
        .bind(&new_user.username)
        .bind(&new_user.name)
        .bind(&new_user.password_hash)
        .fetch_one(&self.db)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Conflict(
                "User with this email or username already exists".into(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_user_by_login(&self, login: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = $1 OR username = $1 LIMIT 1",
        )
        .bind(login)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}

#[async_trait]
impl HabitStore for PgStore {
    async fn insert_habit(&self, user_id: Uuid, new_habit: NewHabit) -> AppResult<Habit> {
        let habit = sqlx::query_as::<_, Habit>(
            r#"
            INSERT INTO habits (id, user_id, title, description, frequency, color)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&new_habit.title)
        .bind(&new_habit.description)
        .bind(new_habit.frequency)
        .bind(&new_habit.color)
        .fetch_one(&self.db)
        .await?;
        Ok(habit)
    }

    async fn find_habit(&self, habit_id: Uuid) -> AppResult<Option<Habit>> {
        let habit = sqlx::query_as::<_, Habit>("SELECT * FROM habits WHERE id = $1")
            .bind(habit_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(habit)
    }

    async fn list_active_habits(&self, user_id: Uuid) -> AppResult<Vec<Habit>> {
        let habits = sqlx::query_as::<_, Habit>(
            r#"
            SELECT * FROM habits
            WHERE user_id = $1 AND is_active = true
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(habits)
    }

    async fn update_habit(
        &self,
        habit_id: Uuid,
        changes: HabitChanges,
    ) -> AppResult<Option<Habit>> {
        let set_description = changes.description.is_some();
        let habit = sqlx::query_as::<_, Habit>(
            r#"
            UPDATE habits SET
                title = COALESCE($2, title),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                frequency = COALESCE($5, frequency),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(habit_id)
        .bind(&changes.title)
        .bind(set_description)
        .bind(changes.description.flatten())
        .bind(changes.frequency)
        .bind(changes.is_active)
        .fetch_optional(&self.db)
        .await?;
        Ok(habit)
    }

    async fn list_completions(&self, habit_ids: &[Uuid]) -> AppResult<Vec<Completion>> {
        if habit_ids.is_empty() {
            return Ok(Vec::new());
        }

        let completions = sqlx::query_as::<_, Completion>(
            r#"
            SELECT * FROM habit_completions
            WHERE habit_id = ANY($1)
            ORDER BY completed_at DESC
            "#,
        )
        .bind(habit_ids)
        .fetch_all(&self.db)
        .await?;
        Ok(completions)
    }

    async fn insert_completion(
        &self,
        habit_id: Uuid,
        completed_at: DateTime<Utc>,
        day: Range<DateTime<Utc>>,
        notes: Option<String>,
    ) -> AppResult<Completion> {
        let mut tx = self.db.begin().await?;

        // Row lock serialises concurrent completions of the same habit.
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM habits WHERE id = $1 FOR UPDATE")
            .bind(habit_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Habit not found".into()))?;

        let already_completed: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM habit_completions
                WHERE habit_id = $1 AND completed_at >= $2 AND completed_at < $3
            )
            "#,
        )
        .bind(habit_id)
        .bind(day.start)
        .bind(day.end)
        .fetch_one(&mut *tx)
        .await?;
        if already_completed {
            return Err(AppError::Conflict("Habit already completed today".into()));
        }

        let completion = sqlx::query_as::<_, Completion>(
            r#"
            INSERT INTO habit_completions (id, habit_id, completed_at, notes)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(habit_id)
        .bind(completed_at)
        .bind(&notes)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE habits SET last_completed = $2, updated_at = NOW() WHERE id = $1")
            .bind(habit_id)
            .bind(completed_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(completion)
    }

    async fn find_completion(&self, completion_id: Uuid) -> AppResult<Option<Completion>> {
        let completion =
            sqlx::query_as::<_, Completion>("SELECT * FROM habit_completions WHERE id = $1")
                .bind(completion_id)
                .fetch_optional(&self.db)
                .await?;
        Ok(completion)
    }

    async fn delete_completion(&self, completion_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM habit_completions WHERE id = $1")
            .bind(completion_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.db)
            .await?;
        Ok(())
    }
}
