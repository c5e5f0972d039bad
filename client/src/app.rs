//! Wiring of the two stores and their collaborators.

use crate::api::{HttpApi, TaskApi, UserApi};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::navigation::Navigator;
use crate::session::{SessionAction, SessionEnvironment, SessionReducer, SessionState};
use crate::tasks::{TaskListAction, TaskListEnvironment, TaskListReducer, TaskListState};
use crate::view::MyTodos;
use std::sync::Arc;
use std::time::Duration;
use taskboard_runtime::{Store, StoreError};

/// Store of the user session
pub type SessionStore = Store<SessionState, SessionAction, SessionEnvironment, SessionReducer>;

/// Store of the task list
pub type TaskListStore = Store<TaskListState, TaskListAction, TaskListEnvironment, TaskListReducer>;

/// The client application: one session store and one task list store
///
/// Cloning is cheap; clones share both stores.
#[derive(Clone)]
pub struct App {
    session: SessionStore,
    tasks: TaskListStore,
}

impl App {
    /// Build both stores over one backend
    #[must_use]
    pub fn new<Api>(api: Arc<Api>, navigator: Arc<dyn Navigator>, dashboard_path: impl Into<String>) -> Self
    where
        Api: UserApi + TaskApi + 'static,
    {
        let user_api: Arc<dyn UserApi> = Arc::clone(&api) as Arc<dyn UserApi>;
        let task_api: Arc<dyn TaskApi> = api;

        Self {
            session: Store::new(
                SessionState::new(),
                SessionReducer::new(),
                SessionEnvironment::new(user_api, navigator, dashboard_path),
            ),
            tasks: Store::new(
                TaskListState::new(),
                TaskListReducer::new(),
                TaskListEnvironment::new(task_api),
            ),
        }
    }

    /// Build the application against the HTTP backend from `config`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn connect(config: &ClientConfig, navigator: Arc<dyn Navigator>) -> Result<Self, ApiError> {
        let api = Arc::new(HttpApi::new(config)?);
        tracing::info!(api_url = %api.base_url(), "Connecting to backend");
        Ok(Self::new(api, navigator, config.dashboard_path.clone()))
    }

    /// The session store
    #[must_use]
    pub const fn session(&self) -> &SessionStore {
        &self.session
    }

    /// The task list store
    #[must_use]
    pub const fn tasks(&self) -> &TaskListStore {
        &self.tasks
    }

    /// A fresh, unmounted `MyTodos` view over both stores
    #[must_use]
    pub fn my_todos(&self) -> MyTodos {
        MyTodos::new(self.session.clone(), self.tasks.clone())
    }

    /// Send a session action and wait until its effects have finished
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn settle_session(&self, action: SessionAction) -> Result<SessionState, StoreError> {
        let mut handle = self.session.send(action).await?;
        handle.wait().await;
        Ok(self.session.state(SessionState::clone).await)
    }

    /// Shut both stores down, waiting up to `timeout` for each
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if effects are still running.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.session.shutdown(timeout).await?;
        self.tasks.shutdown(timeout).await
    }
}
