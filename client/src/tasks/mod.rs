//! Task list slice: the tasks of the current user, with loading and error
//! state for the single remote fetch that populates them.

mod reducer;
mod types;

pub use reducer::{FETCH_TASKS, TaskListEnvironment, TaskListReducer};
pub use types::{Task, TaskListAction, TaskListState};
