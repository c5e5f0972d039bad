//! In-memory collaborators for tests.
//!
//! Compiled for this crate's unit tests and behind the `test-support`
//! feature for integration tests.
//!
//! [`ScriptedApi`] answers every backend call from a queue of canned
//! results and records the requests it saw. An optional gate holds each
//! response until the test releases it, which makes intermediate states
//! such as `loading == true` observable.

use crate::api::{ApiFuture, LoggedIn, LoginRequest, RegisterRequest, Registered, TaskApi, UserApi};
use crate::error::ApiError;
use crate::tasks::Task;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tokio::sync::Semaphore;

/// A request received by [`ScriptedApi`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    /// `register` call
    Register(RegisterRequest),
    /// `login` call
    Login(LoginRequest),
    /// `tasks_for_user` call, with the user name
    Tasks(String),
}

/// Backend double driven by queued results
///
/// A call with nothing queued fails with [`ApiError::Transport`].
#[derive(Debug, Default)]
pub struct ScriptedApi {
    registers: Mutex<VecDeque<Result<Registered, ApiError>>>,
    logins: Mutex<VecDeque<Result<LoggedIn, ApiError>>>,
    tasks: Mutex<VecDeque<Result<Vec<Task>, ApiError>>>,
    requests: Mutex<Vec<Request>>,
    gate: Option<Semaphore>,
}

impl ScriptedApi {
    /// Creates an API that answers immediately
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an API that holds every response until [`ScriptedApi::release`]
    #[must_use]
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    /// Let `count` held responses through
    pub fn release(&self, count: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(count);
        }
    }

    /// Queue the result of the next `register` call
    pub fn push_register(&self, result: Result<Registered, ApiError>) {
        lock(&self.registers).push_back(result);
    }

    /// Queue the result of the next `login` call
    pub fn push_login(&self, result: Result<LoggedIn, ApiError>) {
        lock(&self.logins).push_back(result);
    }

    /// Queue the result of the next `tasks_for_user` call
    pub fn push_tasks(&self, result: Result<Vec<Task>, ApiError>) {
        lock(&self.tasks).push_back(result);
    }

    /// Every request received so far, oldest first
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        lock(&self.requests).clone()
    }

    async fn answer<T>(&self, request: Request, queue: &Mutex<VecDeque<Result<T, ApiError>>>) -> Result<T, ApiError> {
        lock(&self.requests).push(request);

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        lock(queue)
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport("no scripted response".to_string())))
    }
}

impl UserApi for ScriptedApi {
    fn register(&self, request: RegisterRequest) -> ApiFuture<'_, Registered> {
        Box::pin(self.answer(Request::Register(request), &self.registers))
    }

    fn login(&self, request: LoginRequest) -> ApiFuture<'_, LoggedIn> {
        Box::pin(self.answer(Request::Login(request), &self.logins))
    }
}

impl TaskApi for ScriptedApi {
    fn tasks_for_user(&self, user_name: String) -> ApiFuture<'_, Vec<Task>> {
        Box::pin(self.answer(Request::Tasks(user_name), &self.tasks))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn answers_in_queue_order_and_records_requests() {
        let api = ScriptedApi::new();
        api.push_tasks(Ok(vec![Task::new("1")]));
        api.push_tasks(Err(ApiError::Transport("down".to_string())));

        assert_eq!(api.tasks_for_user("alice".to_string()).await, Ok(vec![Task::new("1")]));
        assert!(api.tasks_for_user("alice".to_string()).await.is_err());
        assert!(matches!(
            api.tasks_for_user("bob".to_string()).await,
            Err(ApiError::Transport(_))
        ));
        assert_eq!(api.requests().len(), 3);
        assert_eq!(api.requests()[2], Request::Tasks("bob".to_string()));
    }

    #[tokio::test]
    async fn gate_holds_response_until_released() {
        let api = std::sync::Arc::new(ScriptedApi::gated());
        api.push_tasks(Ok(Vec::new()));

        let call = {
            let api = std::sync::Arc::clone(&api);
            tokio::spawn(async move { api.tasks_for_user("alice".to_string()).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!call.is_finished());

        api.release(1);
        assert!(matches!(call.await, Ok(Ok(tasks)) if tasks.is_empty()));
    }
}
