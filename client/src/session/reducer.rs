//! Reducer logic for the session slice.

use super::types::{FieldErrors, SessionAction, SessionState};
use crate::api::{LoginRequest, RegisterRequest, UserApi};
use crate::navigation::Navigator;
use std::sync::Arc;
use taskboard_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};

/// Environment dependencies for the session reducer
#[derive(Clone)]
pub struct SessionEnvironment {
    /// Backend account operations
    pub api: Arc<dyn UserApi>,
    /// Where a successful login navigates
    pub navigator: Arc<dyn Navigator>,
    /// Route visited after a successful login
    pub dashboard_path: String,
}

impl SessionEnvironment {
    /// Creates a new `SessionEnvironment`
    #[must_use]
    pub fn new(api: Arc<dyn UserApi>, navigator: Arc<dyn Navigator>, dashboard_path: impl Into<String>) -> Self {
        Self {
            api,
            navigator,
            dashboard_path: dashboard_path.into(),
        }
    }
}

/// Reducer for the session slice
#[derive(Clone, Debug, Default)]
pub struct SessionReducer;

impl SessionReducer {
    /// Creates a new `SessionReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn register(env: &SessionEnvironment, request: RegisterRequest) -> Effect<SessionAction> {
        let api = Arc::clone(&env.api);

        Effect::future(async move {
            let settled = match api.register(request).await {
                Ok(registered) => SessionAction::Registered {
                    id: registered.id,
                    user_name: registered.user_name,
                },
                Err(error) => SessionAction::RegisterFailed {
                    errors: error.into_field_errors(),
                },
            };
            Some(settled)
        })
    }

    fn login(env: &SessionEnvironment, request: LoginRequest) -> Effect<SessionAction> {
        let api = Arc::clone(&env.api);

        Effect::future(async move {
            let settled = match api.login(request).await {
                Ok(logged_in) => SessionAction::LoggedIn {
                    id: logged_in.id,
                    token: logged_in.token,
                },
                Err(error) => SessionAction::LoginFailed {
                    errors: error.into_field_errors(),
                },
            };
            Some(settled)
        })
    }

    fn navigate_to_dashboard(env: &SessionEnvironment) -> Effect<SessionAction> {
        let navigator = Arc::clone(&env.navigator);
        let path = env.dashboard_path.clone();

        Effect::future(async move {
            navigator.navigate_to(&path);
            None
        })
    }
}

impl Reducer for SessionReducer {
    type State = SessionState;
    type Action = SessionAction;
    type Environment = SessionEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            SessionAction::Register {
                username,
                email,
                password,
            } => {
                tracing::debug!(username = %username, "Registering");
                smallvec![Self::register(
                    env,
                    RegisterRequest {
                        username,
                        email,
                        password,
                    }
                )]
            },

            SessionAction::Login { email, password } => {
                tracing::debug!("Logging in");
                smallvec![Self::login(env, LoginRequest { email, password })]
            },

            SessionAction::SetId { id } => {
                state.id = id;
                SmallVec::new()
            },

            SessionAction::SetToken { token } => {
                state.token = token;
                SmallVec::new()
            },

            SessionAction::SetUsername { user_name } => {
                state.user_name = user_name;
                SmallVec::new()
            },

            SessionAction::SetErrors { errors } => {
                state.errors = errors;
                SmallVec::new()
            },

            // ========== Events ==========
            SessionAction::Registered { id, user_name } => {
                tracing::info!(id = %id, user_name = %user_name, "Registered");
                state.id = id;
                state.user_name = user_name;
                state.errors = FieldErrors::default();
                SmallVec::new()
            },

            SessionAction::LoggedIn { id, token } => {
                tracing::info!(id = %id, "Logged in");
                state.token = token;
                state.id = id;
                state.errors = FieldErrors::default();
                smallvec![Self::navigate_to_dashboard(env)]
            },

            SessionAction::RegisterFailed { errors } | SessionAction::LoginFailed { errors } => {
                tracing::info!(fields = errors.iter().count(), "Form rejected");
                state.errors = errors;
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::{LoggedIn, Registered};
    use crate::error::ApiError;
    use crate::mocks::{Request, ScriptedApi};
    use crate::navigation::History;
    use taskboard_testing::{ReducerTest, assertions, effects};

    fn create_test_env(api: &Arc<ScriptedApi>, history: &Arc<History>) -> SessionEnvironment {
        SessionEnvironment::new(
            Arc::clone(api) as Arc<dyn UserApi>,
            Arc::clone(history) as Arc<dyn Navigator>,
            "/dashboard",
        )
    }

    fn signed_in() -> SessionState {
        SessionState {
            id: "u1".to_string(),
            token: "tok".to_string(),
            user_name: "alice".to_string(),
            errors: FieldErrors::default(),
        }
    }

    fn email_error(message: &str) -> FieldErrors {
        FieldErrors {
            email: Some(message.to_string()),
            ..FieldErrors::default()
        }
    }

    #[test]
    fn test_setters_replace_fields() {
        let env = create_test_env(&Arc::new(ScriptedApi::new()), &Arc::new(History::new()));

        ReducerTest::new(SessionReducer::new())
            .with_env(env.clone())
            .given_state(SessionState::new())
            .when_action(SessionAction::SetId { id: "42".to_string() })
            .then_state(|state| assert_eq!(state.id, "42"))
            .then_effects(assertions::assert_no_effects)
            .run();

        ReducerTest::new(SessionReducer::new())
            .with_env(env.clone())
            .given_state(signed_in())
            .when_action(SessionAction::SetToken { token: String::new() })
            .then_state(|state| {
                assert!(!state.is_authenticated());
                assert_eq!(state.id, "u1");
            })
            .then_effects(assertions::assert_no_effects)
            .run();

        ReducerTest::new(SessionReducer::new())
            .with_env(env.clone())
            .given_state(signed_in())
            .when_action(SessionAction::SetUsername {
                user_name: "bob".to_string(),
            })
            .then_state(|state| assert_eq!(state.user_name, "bob"))
            .then_effects(assertions::assert_no_effects)
            .run();

        ReducerTest::new(SessionReducer::new())
            .with_env(env)
            .given_state(SessionState {
                errors: email_error("taken"),
                ..signed_in()
            })
            .when_action(SessionAction::SetErrors {
                errors: FieldErrors {
                    password: Some("too short".to_string()),
                    ..FieldErrors::default()
                },
            })
            .then_state(|state| {
                // replaced, not merged
                assert!(state.errors.email.is_none());
                assert_eq!(state.errors.password.as_deref(), Some("too short"));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_register_command_only_returns_effect() {
        let env = create_test_env(&Arc::new(ScriptedApi::new()), &Arc::new(History::new()));

        ReducerTest::new(SessionReducer::new())
            .with_env(env)
            .given_state(SessionState::new())
            .when_action(SessionAction::Register {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "secret".to_string(),
            })
            .then_state(|state| assert_eq!(state, &SessionState::new()))
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[tokio::test]
    async fn test_register_effect_settles_with_backend_answer() {
        let api = Arc::new(ScriptedApi::new());
        let env = create_test_env(&api, &Arc::new(History::new()));
        api.push_register(Ok(Registered {
            id: "u1".to_string(),
            user_name: "alice".to_string(),
        }));
        api.push_register(Err(ApiError::Rejected {
            status: 400,
            errors: email_error("invalid email"),
        }));

        let reducer = SessionReducer::new();
        let register = || SessionAction::Register {
            username: "alice".to_string(),
            email: "bad".to_string(),
            password: "secret".to_string(),
        };

        let mut state = SessionState::new();
        let first = effects::resolve_all(reducer.reduce(&mut state, register(), &env)).await;
        let second = effects::resolve_all(reducer.reduce(&mut state, register(), &env)).await;

        assert_eq!(
            first,
            vec![SessionAction::Registered {
                id: "u1".to_string(),
                user_name: "alice".to_string(),
            }]
        );
        assert_eq!(
            second,
            vec![SessionAction::RegisterFailed {
                errors: email_error("invalid email"),
            }]
        );
        assert!(matches!(&api.requests()[0], Request::Register(r) if r.email == "bad"));
    }

    #[test]
    fn test_registered_sets_identity_and_clears_errors() {
        let env = create_test_env(&Arc::new(ScriptedApi::new()), &Arc::new(History::new()));

        ReducerTest::new(SessionReducer::new())
            .with_env(env)
            .given_state(SessionState {
                errors: email_error("invalid email"),
                ..SessionState::new()
            })
            .when_action(SessionAction::Registered {
                id: "u1".to_string(),
                user_name: "alice".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.id, "u1");
                assert_eq!(state.user_name, "alice");
                assert!(state.errors.is_empty());
                assert!(state.token.is_empty());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_register_failure_leaves_identity_untouched() {
        let env = create_test_env(&Arc::new(ScriptedApi::new()), &Arc::new(History::new()));

        ReducerTest::new(SessionReducer::new())
            .with_env(env)
            .given_state(signed_in())
            .when_action(SessionAction::RegisterFailed {
                errors: email_error("invalid email"),
            })
            .then_state(|state| {
                assert_eq!(state.id, "u1");
                assert_eq!(state.token, "tok");
                assert_eq!(state.user_name, "alice");
                assert_eq!(state.errors.email.as_deref(), Some("invalid email"));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[tokio::test]
    async fn test_logged_in_navigates_once() {
        let api = Arc::new(ScriptedApi::new());
        let history = Arc::new(History::new());
        let env = create_test_env(&api, &history);
        api.push_login(Ok(LoggedIn {
            success: true,
            token: "tok".to_string(),
            id: "u1".to_string(),
        }));

        let reducer = SessionReducer::new();
        let mut state = SessionState {
            errors: email_error("unknown user"),
            ..SessionState::new()
        };

        let login = SessionAction::Login {
            email: "alice@example.com".to_string(),
            password: "secret".to_string(),
        };
        let settled = effects::resolve_all(reducer.reduce(&mut state, login, &env)).await;
        assert!(history.entries().is_empty());

        let mut follow_up = Vec::new();
        for action in settled {
            follow_up.extend(reducer.reduce(&mut state, action, &env));
        }
        assert!(effects::resolve_all(follow_up).await.is_empty());

        assert_eq!(state.token, "tok");
        assert_eq!(state.id, "u1");
        assert!(state.errors.is_empty());
        assert_eq!(history.entries(), vec!["/dashboard"]);
    }

    #[tokio::test]
    async fn test_login_failure_sets_errors_without_navigation() {
        let api = Arc::new(ScriptedApi::new());
        let history = Arc::new(History::new());
        let env = create_test_env(&api, &history);
        api.push_login(Err(ApiError::Transport("connection refused".to_string())));

        let reducer = SessionReducer::new();
        let mut state = SessionState::new();
        let login = SessionAction::Login {
            email: "alice@example.com".to_string(),
            password: "secret".to_string(),
        };

        let settled = effects::resolve_all(reducer.reduce(&mut state, login, &env)).await;
        assert_eq!(settled.len(), 1);
        assert!(settled[0].is_settlement());

        let follow_up = reducer.reduce(&mut state, settled.into_iter().next().unwrap(), &env);
        assert!(follow_up.is_empty());
        assert_eq!(
            state.errors.get(FieldErrors::REQUEST),
            Some("request failed: connection refused")
        );
        assert!(state.token.is_empty());
        assert!(history.entries().is_empty());
    }
}
