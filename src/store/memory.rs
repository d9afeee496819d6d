use std::ops::Range;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::completion::Completion;
use crate::models::habit::{Habit, HabitChanges, NewHabit};
use crate::models::user::{NewUser, User};
use crate::store::{HabitStore, UserStore};

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

// Vecs keep insertion order, which breaks `created_at` ties deterministically.
#[derive(Default)]
struct Inner {
    users: Vec<User>,
    habits: Vec<Habit>,
    completions: Vec<Completion>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, new_user: NewUser) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        if inner
            .users
            .iter()
            .any(|u| u.email == new_user.email || u.username == new_user.username)
        {
            return Err(AppError::Conflict(
                "User with this email or username already exists".into(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            username: new_user.username,
            name: new_user.name,
            password_hash: new_user.password_hash,
            created_at: now,
            updated_at: now,
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_user_by_login(&self, login: &str) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|u| u.email == login || u.username == login)
            .cloned())
    }
}

#[async_trait]
impl HabitStore for MemoryStore {
    async fn insert_habit(&self, user_id: Uuid, new_habit: NewHabit) -> AppResult<Habit> {
        let now = Utc::now();
        let habit = Habit {
            id: Uuid::new_v4(),
            user_id,
            title: new_habit.title,
            description: new_habit.description,
            frequency: new_habit.frequency,
            color: new_habit.color,
            is_active: true,
            last_completed: None,
            created_at: now,
            updated_at: now,
        };
        self.inner.write().await.habits.push(habit.clone());
        Ok(habit)
    }

    async fn find_habit(&self, habit_id: Uuid) -> AppResult<Option<Habit>> {
        let inner = self.inner.read().await;
        Ok(inner.habits.iter().find(|h| h.id == habit_id).cloned())
    }

    async fn list_active_habits(&self, user_id: Uuid) -> AppResult<Vec<Habit>> {
        let inner = self.inner.read().await;
        let mut habits: Vec<Habit> = inner
            .habits
            .iter()
            .rev()
            .filter(|h| h.user_id == user_id && h.is_active)
            .cloned()
            .collect();
        habits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(habits)
    }

    async fn update_habit(
        &self,
        habit_id: Uuid,
        changes: HabitChanges,
    ) -> AppResult<Option<Habit>> {
        let mut inner = self.inner.write().await;
        let Some(habit) = inner.habits.iter_mut().find(|h| h.id == habit_id) else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            habit.title = title;
        }
        if let Some(description) = changes.description {
            habit.description = description;
        }
        if let Some(frequency) = changes.frequency {
            habit.frequency = frequency;
        }
        if let Some(is_active) = changes.is_active {
            habit.is_active = is_active;
        }
        habit.updated_at = Utc::now();

        Ok(Some(habit.clone()))
    }

    async fn list_completions(&self, habit_ids: &[Uuid]) -> AppResult<Vec<Completion>> {
        let inner = self.inner.read().await;
        let mut completions: Vec<Completion> = inner
            .completions
            .iter()
            .rev()
            .filter(|c| habit_ids.contains(&c.habit_id))
            .cloned()
            .collect();
        completions.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(completions)
    }

    async fn insert_completion(
        &self,
        habit_id: Uuid,
        completed_at: DateTime<Utc>,
        day: Range<DateTime<Utc>>,
        notes: Option<String>,
    ) -> AppResult<Completion> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();

        if inner
            .completions
            .iter()
            .any(|c| c.habit_id == habit_id && day.contains(&c.completed_at))
        {
            return Err(AppError::Conflict("Habit already completed today".into()));
        }

        let habit = inner
            .habits
            .iter_mut()
            .find(|h| h.id == habit_id)
            .ok_or_else(|| AppError::NotFound("Habit not found".into()))?;
        habit.last_completed = Some(completed_at);
        habit.updated_at = now;

        let completion = Completion {
            id: Uuid::new_v4(),
            habit_id,
            completed_at,
            notes,
            created_at: now,
        };
        inner.completions.push(completion.clone());
        Ok(completion)
    }

    async fn find_completion(&self, completion_id: Uuid) -> AppResult<Option<Completion>> {
        let inner = self.inner.read().await;
        Ok(inner
            .completions
            .iter()
            .find(|c| c.id == completion_id)
            .cloned())
    }

    async fn delete_completion(&self, completion_id: Uuid) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.completions.len();
        inner.completions.retain(|c| c.id != completion_id);
        Ok(inner.completions.len() < before)
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
