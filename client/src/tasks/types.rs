//! Domain types for the task list slice.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A task as returned by the backend
///
/// Only `id` is interpreted. Every other field is kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Identity, used as the rendering key
    pub id: String,
    /// Remaining fields, untouched
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Task {
    /// Creates a task with no fields besides its id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Adds a field
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Looks up a field by name
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Human-readable text for the task
    ///
    /// The first string among `title`, `text`, `name` and `description`,
    /// falling back to the id.
    #[must_use]
    pub fn label(&self) -> &str {
        ["title", "text", "name", "description"]
            .into_iter()
            .find_map(|key| self.field(key).and_then(Value::as_str))
            .unwrap_or(&self.id)
    }
}

/// State of the task list
///
/// `loading` is true only between a fetch being dispatched and its
/// settlement. `error` and `tasks` are independent: a later success keeps
/// an earlier error, and a failure keeps earlier tasks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskListState {
    /// Tasks in backend order
    pub tasks: Vec<Task>,
    /// A fetch is in flight
    pub loading: bool,
    /// Message from the last failed fetch
    pub error: Option<String>,
}

impl TaskListState {
    /// Creates an empty task list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Actions for the task list store
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskListAction {
    // ========== Commands ==========
    /// Command: Fetch the tasks of a user, replacing any fetch in flight
    FetchTasksForUser {
        /// Display name of the user
        user_name: String,
    },

    /// Command: Abandon the fetch in flight, if any
    CancelFetch,

    // ========== Events ==========
    /// Event: The fetch returned tasks
    TasksLoaded {
        /// Tasks in backend order
        tasks: Vec<Task>,
    },

    /// Event: The fetch failed
    TasksFailed {
        /// User-facing message
        message: String,
    },
}

impl TaskListAction {
    /// Returns true for the events that settle a fetch
    #[must_use]
    pub const fn is_settlement(&self) -> bool {
        matches!(self, Self::TasksLoaded { .. } | Self::TasksFailed { .. })
    }
}
