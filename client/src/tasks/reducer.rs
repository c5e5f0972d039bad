//! Reducer logic for the task list slice.
//!
//! The fetch runs in the [`FETCH_TASKS`] slot. A new fetch aborts the one in
//! flight, so only the latest request can settle.

use super::types::{TaskListAction, TaskListState};
use crate::api::TaskApi;
use std::sync::Arc;
use taskboard_core::{
    SmallVec,
    effect::{Effect, EffectId},
    reducer::Reducer,
    smallvec,
};

/// Slot holding the task fetch in flight
pub const FETCH_TASKS: EffectId = EffectId::new("tasks.fetch");

/// Environment dependencies for the task list reducer
#[derive(Clone)]
pub struct TaskListEnvironment {
    /// Backend task operations
    pub api: Arc<dyn TaskApi>,
}

impl TaskListEnvironment {
    /// Creates a new `TaskListEnvironment`
    #[must_use]
    pub fn new(api: Arc<dyn TaskApi>) -> Self {
        Self { api }
    }
}

/// Reducer for the task list slice
#[derive(Clone, Debug, Default)]
pub struct TaskListReducer;

impl TaskListReducer {
    /// Creates a new `TaskListReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn fetch(env: &TaskListEnvironment, user_name: String) -> Effect<TaskListAction> {
        let api = Arc::clone(&env.api);

        Effect::future(async move {
            let settled = match api.tasks_for_user(user_name).await {
                Ok(tasks) => TaskListAction::TasksLoaded { tasks },
                Err(error) => TaskListAction::TasksFailed {
                    message: error.to_string(),
                },
            };
            Some(settled)
        })
        .cancellable(FETCH_TASKS)
    }
}

impl Reducer for TaskListReducer {
    type State = TaskListState;
    type Action = TaskListAction;
    type Environment = TaskListEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            TaskListAction::FetchTasksForUser { user_name } => {
                tracing::debug!(user_name = %user_name, "Fetching tasks");
                state.loading = true;
                smallvec![Self::fetch(env, user_name)]
            },

            TaskListAction::CancelFetch => {
                // A cancelled fetch never settles, so nothing else would clear the flag
                state.loading = false;
                smallvec![Effect::Cancel(FETCH_TASKS)]
            },

            // ========== Events ==========
            TaskListAction::TasksLoaded { tasks } => {
                tracing::debug!(count = tasks.len(), "Tasks loaded");
                state.tasks = tasks;
                state.loading = false;
                SmallVec::new()
            },

            TaskListAction::TasksFailed { message } => {
                tracing::debug!(error = %message, "Task fetch failed");
                state.error = Some(message);
                state.loading = false;
                SmallVec::new()
            },
        }
    }
}
