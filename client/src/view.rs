//! The `MyTodos` view.
//!
//! The view holds both stores. It fetches the current user's tasks once
//! when mounted and re-renders whenever either store changes. Rendering is
//! a pure function of the task list state.

use crate::app::{SessionStore, TaskListStore};
use crate::tasks::{TaskListAction, TaskListState};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use taskboard_runtime::{EffectHandle, StoreError};

/// One piece of rendered output
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fragment {
    /// The last fetch error
    Error(String),
    /// Shown while a fetch is in flight
    Loading,
    /// One task, keyed by its id
    Task {
        /// Task id
        key: String,
        /// Human-readable text
        label: String,
    },
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(message) => write!(f, "error: {message}"),
            Self::Loading => f.write_str("Loading..."),
            Self::Task { key, label } => write!(f, "[{key}] {label}"),
        }
    }
}

/// A full render of the view
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    /// Fragments in display order
    pub fragments: Vec<Fragment>,
}

impl Frame {
    /// Task keys in display order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fragments.iter().filter_map(|fragment| match fragment {
            Fragment::Task { key, .. } => Some(key.as_str()),
            Fragment::Error(_) | Fragment::Loading => None,
        })
    }

    /// Returns true if the loading indicator is shown
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.fragments.contains(&Fragment::Loading)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for fragment in &self.fragments {
            writeln!(f, "{fragment}")?;
        }
        Ok(())
    }
}

/// Render the task list
///
/// Each condition is checked on its own, so an error, the loading
/// indicator and tasks can all appear in the same frame.
#[must_use]
pub fn render(state: &TaskListState) -> Frame {
    let mut fragments = Vec::with_capacity(state.tasks.len() + 2);

    if let Some(error) = &state.error {
        fragments.push(Fragment::Error(error.clone()));
    }
    if state.loading {
        fragments.push(Fragment::Loading);
    }
    fragments.extend(state.tasks.iter().map(|task| Fragment::Task {
        key: task.id.clone(),
        label: task.label().to_string(),
    }));

    Frame { fragments }
}

/// The list of the current user's tasks
pub struct MyTodos {
    session: SessionStore,
    tasks: TaskListStore,
    mounted: AtomicBool,
}

impl MyTodos {
    /// Creates an unmounted view over the two stores
    #[must_use]
    pub const fn new(session: SessionStore, tasks: TaskListStore) -> Self {
        Self {
            session,
            tasks,
            mounted: AtomicBool::new(false),
        }
    }

    /// Mount the view
    ///
    /// The first call fetches the tasks of the session's current user and
    /// returns the handle of that fetch. Later calls do nothing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the task store is shutting down.
    pub async fn mount(&self) -> Result<Option<EffectHandle>, StoreError> {
        if self.mounted.swap(true, Ordering::AcqRel) {
            return Ok(None);
        }

        let user_name = self.session.state(|s| s.user_name.clone()).await;
        tracing::debug!(user_name = %user_name, "MyTodos mounted");

        let handle = self
            .tasks
            .send(TaskListAction::FetchTasksForUser { user_name })
            .await?;
        Ok(Some(handle))
    }

    /// Returns true once [`MyTodos::mount`] has run
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    /// Unmount the view, abandoning a fetch still in flight
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the task store is shutting down.
    pub async fn unmount(self) -> Result<(), StoreError> {
        if self.tasks.state(|s| s.loading).await {
            tracing::debug!("MyTodos unmounted with a fetch in flight");
            self.tasks.send(TaskListAction::CancelFetch).await?;
        }
        Ok(())
    }

    /// Render the current task list state
    pub async fn frame(&self) -> Frame {
        self.tasks.state(render).await
    }

    /// Render now and after every change to either store, until `done`
    /// accepts the task list state
    ///
    /// Returns the state the loop stopped on.
    pub async fn run_until<F, P>(&self, mut on_render: F, mut done: P) -> TaskListState
    where
        F: FnMut(&Frame),
        P: FnMut(&TaskListState) -> bool,
    {
        let mut session_changes = self.session.subscribe_state();
        let mut task_changes = self.tasks.subscribe_state();

        loop {
            let state = self.tasks.state(TaskListState::clone).await;
            on_render(&render(&state));

            if done(&state) {
                return state;
            }

            let changed = tokio::select! {
                changed = session_changes.changed() => changed,
                changed = task_changes.changed() => changed,
            };
            if changed.is_err() {
                return state;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::Task;

    #[test]
    fn empty_state_renders_nothing() {
        assert!(render(&TaskListState::new()).fragments.is_empty());
    }

    #[test]
    fn fragments_are_independent_and_ordered() {
        let state = TaskListState {
            tasks: vec![Task::new("1").with_field("title", "Buy milk"), Task::new("2")],
            loading: true,
            error: Some("Server error".to_string()),
        };

        let frame = render(&state);
        assert_eq!(
            frame.fragments,
            vec![
                Fragment::Error("Server error".to_string()),
                Fragment::Loading,
                Fragment::Task {
                    key: "1".to_string(),
                    label: "Buy milk".to_string()
                },
                Fragment::Task {
                    key: "2".to_string(),
                    label: "2".to_string()
                },
            ]
        );
        assert!(frame.is_loading());
        assert_eq!(frame.keys().collect::<Vec<_>>(), vec!["1", "2"]);
    }

    #[test]
    fn frame_displays_one_line_per_fragment() {
        let frame = render(&TaskListState {
            tasks: vec![Task::new("1").with_field("title", "Buy milk")],
            loading: true,
            error: None,
        });
        assert_eq!(frame.to_string(), "Loading...\n[1] Buy milk\n");
    }
}
