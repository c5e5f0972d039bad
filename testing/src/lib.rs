//! # Taskboard Testing
//!
//! Testing utilities for reducers and the effects they return.
//!
//! This crate provides:
//! - [`ReducerTest`]: Given-When-Then harness over one or more reducer steps
//! - [`assertions`]: slot, cancel and count checks for `then_effects`
//! - [`effects`]: resolving effect descriptions into the actions they produce,
//!   without a Store
//!
//! ## Example
//!
//! ```ignore
//! use taskboard_testing::{ReducerTest, assertions, effects};
//!
//! let outcome = ReducerTest::new(TaskListReducer::new())
//!     .with_env(env)
//!     .given_state(TaskListState::default())
//!     .when_action(TaskListAction::FetchTasksForUser { user_name: "alice".into() })
//!     .then_state(|s| assert!(s.loading))
//!     .then_effects(|e| assertions::assert_has_cancellable_effect(e, "tasks.fetch"))
//!     .run();
//!
//! // What the scripted backend answer settles to
//! let settled = effects::resolve_all(outcome.effects).await;
//! ```


pub use reducer_test::{Effects, Outcome, ReducerTest, assertions};

/// Resolving effects outside of a Store
///
/// Useful to check what a remote-call effect settles to, given a scripted
/// environment, without spinning up the runtime.
pub mod effects {
    use futures::future::BoxFuture;
    use taskboard_core::effect::Effect;

    /// Run an effect to completion and collect every action it produces
    ///
    /// `Parallel` children are resolved in order, `Delay` actions are
    /// returned without sleeping, and `Cancel` produces nothing. Produced
    /// actions are NOT reduced, so follow-up effects are not run.
    pub fn resolve<A: Send + 'static>(effect: Effect<A>) -> BoxFuture<'static, Vec<A>> {
        Box::pin(async move {
            match effect {
                Effect::None | Effect::Cancel(_) => Vec::new(),
                Effect::Future(fut) => fut.await.into_iter().collect(),
                Effect::Delay { action, .. } => vec![*action],
                Effect::Cancellable { effect, .. } => resolve(*effect).await,
                Effect::Parallel(effects) | Effect::Sequential(effects) => {
                    let mut actions = Vec::new();
                    for effect in effects {
                        actions.extend(resolve(effect).await);
                    }
                    actions
                },
            }
        })
    }

    /// Resolve every effect of a reducer step, in order
    pub async fn resolve_all<A, I>(effects: I) -> Vec<A>
    where
        A: Send + 'static,
        I: IntoIterator<Item = Effect<A>>,
    {
        let mut actions = Vec::new();
        for effect in effects {
            actions.extend(resolve(effect).await);
        }
        actions
    }
}
