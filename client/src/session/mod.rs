//! User session slice: identity, token and form field errors.
//!
//! `register` and `login` are remote operations; their reducer arms return
//! an `Effect::Future` that calls the backend and feeds a settlement event
//! back into the store. The setters replace one field synchronously.

mod reducer;
mod types;

pub use reducer::{SessionEnvironment, SessionReducer};
pub use types::{FieldErrors, SessionAction, SessionState};
