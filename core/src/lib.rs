//! # Taskboard Core
//!
//! Core traits and types behind the Taskboard client stores.
//!
//! Every piece of client state (the user session, the task list) lives in a
//! store driven by a reducer. This crate defines the vocabulary those stores
//! share.
//!
//! ## Core Concepts
//!
//! - **State**: Plain data owned by one store
//! - **Action**: Every input a store accepts (commands issued by the UI and
//!   settlement actions produced by remote calls)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Description of a side effect (remote call, navigation), not
//!   its execution
//! - **Environment**: Injected collaborators (API client, navigator)
//!
//! ## Example
//!
//! ```ignore
//! use taskboard_core::*;
//!
//! impl Reducer for TaskListReducer {
//!     type State = TaskListState;
//!     type Action = TaskListAction;
//!     type Environment = TaskListEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut TaskListState,
//!         action: TaskListAction,
//!         env: &TaskListEnvironment,
//!     ) -> SmallVec<[Effect<TaskListAction>; 4]> {
//!         match action {
//!             TaskListAction::FetchTasksForUser { user_name } => {
//!                 state.loading = true;
//!                 // return an Effect::Future performing the HTTP call
//!                 smallvec![]
//!             }
//!             _ => smallvec![],
//!         }
//!     }
//! }
//! ```

pub use smallvec::{SmallVec, smallvec};

/// Reducer module - The core trait for state transitions
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They never perform I/O themselves; anything asynchronous is returned as an
/// [`Effect`](crate::effect::Effect) for the runtime to execute.
pub mod reducer {
    use super::SmallVec;
    use super::effect::Effect;

    /// The Reducer trait - core abstraction for state transitions
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected collaborators this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected collaborators
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// Updates `state` in place and returns descriptions of the effects
        /// the runtime should execute. Most actions produce zero or one
        /// effect, hence the inline capacity of four.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects are values returned from reducers and executed by the Store
/// runtime. They are composable (`Parallel`, `Sequential`) and cancellable
/// (`Cancellable`, `Cancel`).
pub mod effect {
    use std::borrow::Cow;
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Identifier for a cancellable effect slot
    ///
    /// At most one effect runs per id and store. Starting a new
    /// [`Effect::Cancellable`] with an id that is already running aborts the
    /// older one first.
    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    pub struct EffectId(Cow<'static, str>);

    impl EffectId {
        /// Creates an id from a static name (usable in `const` items)
        #[must_use]
        pub const fn new(name: &'static str) -> Self {
            Self(Cow::Borrowed(name))
        }

        /// Creates an id from an owned name, for ids computed at runtime
        #[must_use]
        pub fn owned(name: impl Into<String>) -> Self {
            Self(Cow::Owned(name.into()))
        }

        /// Returns the id as a string slice
        #[must_use]
        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl std::fmt::Display for EffectId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what
    /// should happen, returned from reducers and executed by the Store.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// Run `effect` in the slot named `id`, aborting whatever ran there before
        ///
        /// Only `Future` and `Delay` effects can actually be aborted; other
        /// variants run to completion and merely occupy no slot.
        Cancellable {
            /// Slot identifier
            id: EffectId,
            /// The effect to run in the slot
            effect: Box<Effect<Action>>,
        },

        /// Abort the effect currently running in the slot named by the id
        ///
        /// A no-op when the slot is empty.
        Cancel(EffectId),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::Cancellable { id, effect } => f
                    .debug_struct("Effect::Cancellable")
                    .field("id", id)
                    .field("effect", effect)
                    .finish(),
                Effect::Cancel(id) => f.debug_tuple("Effect::Cancel").field(id).finish(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Wrap a future producing an optional action
        #[must_use]
        pub fn future<F>(fut: F) -> Effect<Action>
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }

        /// Place this effect in the cancellable slot `id`
        #[must_use]
        pub fn cancellable(self, id: EffectId) -> Effect<Action> {
            Effect::Cancellable {
                id,
                effect: Box::new(self),
            }
        }

        /// Returns true if this is a `Future` effect, also when wrapped in a slot
        #[must_use]
        pub fn is_future(&self) -> bool {
            match self {
                Effect::Future(_) => true,
                Effect::Cancellable { effect, .. } => effect.is_future(),
                _ => false,
            }
        }

        /// Returns the slot id if this effect is `Cancellable`
        #[must_use]
        pub const fn cancellable_id(&self) -> Option<&EffectId> {
            match self {
                Effect::Cancellable { id, .. } => Some(id),
                _ => None,
            }
        }
    }
}
