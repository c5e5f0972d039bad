//! Todo-list client built on Taskboard stores.
//!
//! Two stores hold all client state:
//!
//! - the **session** ([`session`]): user id, display name, token and the
//!   field errors of the last register/login attempt
//! - the **task list** ([`tasks`]): the user's tasks plus the loading flag
//!   and error message of the fetch that populates them
//!
//! Remote calls run as effects against the [`api`] traits, so the same
//! reducers drive the HTTP client in production and the scripted double in
//! `mocks` (behind the `test-support` feature) in tests.
//! The [`view::MyTodos`] view reads both stores and renders the list.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskboard::{App, ClientConfig, History, session::SessionAction};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let app = App::connect(&config, Arc::new(History::new()))?;
//!
//! app.session()
//!     .send(SessionAction::SetUsername { user_name: "alice".to_string() })
//!     .await?;
//!
//! let view = app.my_todos();
//! view.mount().await?;
//! let state = view.run_until(|frame| print!("{frame}"), |s| !s.loading).await;
//! println!("{} tasks", state.tasks.len());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod app;
pub mod config;
pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod mocks;
pub mod navigation;
pub mod session;
pub mod tasks;
pub mod view;

// Re-export commonly used types
pub use app::{App, SessionStore, TaskListStore};
pub use config::ClientConfig;
pub use error::{ApiError, ConfigError};
pub use navigation::{History, Navigator};
pub use view::{Frame, Fragment, MyTodos};
