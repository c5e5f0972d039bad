//! Backend API: the remote operations behind the session and task stores.
//!
//! Reducers only see the [`UserApi`] and [`TaskApi`] traits through their
//! environment. [`HttpApi`] implements both over `reqwest`.
//!
//! | Operation | Request | Success | Failure |
//! |-----------|---------|---------|---------|
//! | register | `POST /api/users/register` | `{id, userName}` | `{field: message}` |
//! | login | `POST /api/users/login` | `{success, token, id}` | `{field: message}` |
//! | tasks | `GET /api/tasks/{userName}` | `Task[]` | any body, used as message |

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::session::FieldErrors;
use crate::tasks::Task;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, warn};
use url::Url;

/// Body of a registration request
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegisterRequest {
    /// Desired display name
    pub username: String,
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
}

/// Body of a login request
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
}

/// Successful registration response
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Registered {
    /// Id assigned by the backend
    pub id: String,
    /// Display name of the new account
    #[serde(rename = "userName")]
    pub user_name: String,
}

/// Successful login response
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct LoggedIn {
    /// Success flag as sent by the backend
    #[serde(default)]
    pub success: bool,
    /// Session token
    pub token: String,
    /// User id
    pub id: String,
}

/// Future returned by the API traits
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Account operations used by the session store
///
/// # Dyn Compatibility
///
/// Methods return boxed futures so the trait can be used as
/// `Arc<dyn UserApi>` inside effects.
pub trait UserApi: Send + Sync {
    /// Register a new account
    ///
    /// # Errors
    ///
    /// [`ApiError::Rejected`] carries the backend's field errors; other
    /// variants mean no field-error body was available.
    fn register(&self, request: RegisterRequest) -> ApiFuture<'_, Registered>;

    /// Log in with email and password
    ///
    /// # Errors
    ///
    /// Same as [`UserApi::register`].
    fn login(&self, request: LoginRequest) -> ApiFuture<'_, LoggedIn>;
}

/// Task operations used by the task list store
pub trait TaskApi: Send + Sync {
    /// Fetch the tasks of one user, in backend order
    ///
    /// # Errors
    ///
    /// Any failure; its `Display` is the message shown to the user.
    fn tasks_for_user(&self, user_name: String) -> ApiFuture<'_, Vec<Task>>;
}

/// HTTP implementation of the backend API
#[derive(Clone, Debug)]
pub struct HttpApi {
    client: Client,
    base_url: Url,
}

impl HttpApi {
    /// Build a client from configuration (base URL and request timeout)
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self::with_client(client, config.api_url.clone()))
    }

    /// Use an existing `reqwest` client
    #[must_use]
    pub const fn with_client(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Base URL all endpoints are resolved against
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append path segments to the base URL, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Transport(format!("{} cannot be used as a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn post_form<B, T>(&self, endpoint: &'static str, segments: &[&str], body: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        debug!(url = %url, endpoint, "POST request");

        let result: Result<T, ApiError> = async {
            let response = self.client.post(url).json(body).send().await?;
            let status = response.status();
            let text = response.text().await?;

            if status.is_success() {
                return serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()));
            }

            match serde_json::from_str::<FieldErrors>(&text) {
                Ok(errors) if !errors.is_empty() => Err(ApiError::Rejected {
                    status: status.as_u16(),
                    errors,
                }),
                _ => Err(ApiError::Status {
                    status: status.as_u16(),
                    message: failure_message(status, &text),
                }),
            }
        }
        .await;

        record(endpoint, &result);
        result
    }

    async fn get_tasks(&self, user_name: &str) -> Result<Vec<Task>, ApiError> {
        let url = self.endpoint(&["api", "tasks", user_name])?;
        debug!(url = %url, user_name, "GET request");

        let result: Result<Vec<Task>, ApiError> = async {
            let response = self.client.get(url).send().await?;
            let status = response.status();
            let text = response.text().await?;

            if status.is_success() {
                serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
            } else {
                Err(ApiError::Status {
                    status: status.as_u16(),
                    message: failure_message(status, &text),
                })
            }
        }
        .await;

        record("tasks", &result);
        result
    }
}

impl UserApi for HttpApi {
    fn register(&self, request: RegisterRequest) -> ApiFuture<'_, Registered> {
        Box::pin(async move { self.post_form("register", &["api", "users", "register"], &request).await })
    }

    fn login(&self, request: LoginRequest) -> ApiFuture<'_, LoggedIn> {
        Box::pin(async move { self.post_form("login", &["api", "users", "login"], &request).await })
    }
}

impl TaskApi for HttpApi {
    fn tasks_for_user(&self, user_name: String) -> ApiFuture<'_, Vec<Task>> {
        Box::pin(async move { self.get_tasks(&user_name).await })
    }
}

/// User-facing message for a non-success response
///
/// A JSON string body is unwrapped, any other body is used as-is, and an
/// empty body falls back to the status line.
fn failure_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return format!("HTTP {status}");
    }
    serde_json::from_str::<String>(body).unwrap_or_else(|_| body.to_string())
}

fn record<T>(endpoint: &'static str, result: &Result<T, ApiError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(error) if error.is_response() => "rejected",
        Err(_) => "failed",
    };
    metrics::counter!("api.requests.total", "endpoint" => endpoint, "outcome" => outcome).increment(1);

    if let Err(error) = result {
        warn!(endpoint, error = %error, "API request failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base: &str) -> Result<HttpApi, url::ParseError> {
        Ok(HttpApi::with_client(Client::new(), Url::parse(base)?))
    }

    #[test]
    fn endpoint_encodes_user_name() -> Result<(), Box<dyn std::error::Error>> {
        let url = api("http://localhost:5000")?.endpoint(&["api", "tasks", "alice smith/2"])?;
        assert_eq!(url.as_str(), "http://localhost:5000/api/tasks/alice%20smith%2F2");
        Ok(())
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() -> Result<(), Box<dyn std::error::Error>> {
        let url = api("http://example.test/todo/")?.endpoint(&["api", "users", "login"])?;
        assert_eq!(url.as_str(), "http://example.test/todo/api/users/login");
        Ok(())
    }

    #[test]
    fn failure_message_variants() {
        assert_eq!(failure_message(StatusCode::INTERNAL_SERVER_ERROR, "Server error"), "Server error");
        assert_eq!(failure_message(StatusCode::INTERNAL_SERVER_ERROR, "\"Server error\""), "Server error");
        assert_eq!(
            failure_message(StatusCode::BAD_GATEWAY, "  "),
            "HTTP 502 Bad Gateway"
        );
    }

    #[test]
    fn registered_uses_camel_case_user_name() -> Result<(), serde_json::Error> {
        let registered: Registered = serde_json::from_str(r#"{"id":"u1","userName":"alice"}"#)?;
        assert_eq!(registered.user_name, "alice");
        Ok(())
    }

    #[test]
    fn logged_in_tolerates_missing_success_flag() -> Result<(), serde_json::Error> {
        let logged_in: LoggedIn = serde_json::from_str(r#"{"token":"t","id":"u1"}"#)?;
        assert!(!logged_in.success);
        assert_eq!(logged_in.token, "t");
        Ok(())
    }
}
