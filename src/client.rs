//! WhatIamToDo API Client
//!
//! Thin wrapper over the service's REST endpoints:
//! - Authentication (register, login, password recovery, token check)
//! - Goals and their steps
//! - AI goal generation and rescheduling
//!
//! Requests are blocking `ureq` calls. The [`GoalApi`] implementation runs
//! them on tokio's blocking pool so callers can `.await` them.

use crate::error::{ServiceError, ServiceResult};
use crate::types::{
    BulkStep, CreatedStep, Credentials, GeneratedGoal, Goal, GoalId, GoalPatch, LoginResponse,
    MessageResponse, NewGoal, NewStep, Registration, RescheduleResponse, Step, StepId, StepPatch,
    StepsBulkResponse,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// API client for one user session.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
}

// Keep the bearer token out of debug logs.
impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
}

impl ApiClient {
    /// Create a new client
    pub fn new(config: ApiConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let mut request = ureq::request(method, &self.url(path));

        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {}", token));
        }

        request
    }

    fn execute<T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> ServiceResult<T> {
        tracing::debug!(method, path, "api request");
        let request = self.request(method, path);
        let result = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };

        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let message = response
                    .into_json::<MessageResponse>()
                    .ok()
                    .map(|m| m.message);
                tracing::debug!(method, path, code, ?message, "api request rejected");
                return Err(ServiceError::from_status(code, message));
            }
            Err(ureq::Error::Transport(e)) => {
                return Err(ServiceError::Network(format!("{} {}: {}", method, path, e)));
            }
        };

        let text = response
            .into_string()
            .map_err(|e| ServiceError::Network(format!("Failed to read response: {}", e)))?;

        serde_json::from_str(&text)
            .map_err(|e| ServiceError::InvalidResponse(format!("{} {}: {}", method, path, e)))
    }

    fn message(&self, method: &str, path: &str, body: Option<serde_json::Value>) -> ServiceResult<String> {
        self.execute::<MessageResponse>(method, path, body)
            .map(|m| m.message)
    }

    // Auth

    pub fn register(&self, registration: &Registration) -> ServiceResult<String> {
        self.message("POST", "/auth/register", Some(serde_json::to_value(registration)?))
    }

    /// Returns the server greeting and the access token.
    pub fn login(&self, credentials: &Credentials) -> ServiceResult<(String, String)> {
        let response: LoginResponse =
            self.execute("POST", "/auth/login", Some(serde_json::to_value(credentials)?))?;
        let token = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ServiceError::Api(response.message.clone()))?;
        Ok((response.message, token))
    }

    pub fn recover_password(&self, email: &str) -> ServiceResult<String> {
        self.message("POST", "/auth/recover-password", Some(json!({ "email": email })))
    }

    pub fn reset_password(&self, reset_token: &str, new_password: &str) -> ServiceResult<String> {
        self.message(
            "POST",
            "/auth/reset-password",
            Some(json!({ "token": reset_token, "new_password": new_password })),
        )
    }

    /// Cheap authenticated call used to check that the stored token still works.
    pub fn check_protected(&self) -> ServiceResult<String> {
        self.message("GET", "/auth/protected", None)
    }

    // Goals

    pub fn create_goal(&self, goal: &NewGoal) -> ServiceResult<String> {
        self.message("POST", "/api/goals", Some(serde_json::to_value(goal)?))
    }

    pub fn get_goals_with_steps(&self) -> ServiceResult<Vec<Goal>> {
        self.execute("GET", "/api/goals/with-steps", None)
    }

    /// A goal with its full step list.
    pub fn get_goal_info(&self, goal_id: GoalId) -> ServiceResult<Goal> {
        self.execute("GET", &format!("/api/goals/{}/info", goal_id), None)
    }

    /// A goal and one of its steps; the reply embeds only that step.
    pub fn get_goal_step_detail(&self, goal_id: GoalId, step_id: StepId) -> ServiceResult<(Goal, Step)> {
        let goal: Goal =
            self.execute("GET", &format!("/api/goals/{}/steps/{}", goal_id, step_id), None)?;
        let step = goal
            .steps
            .iter()
            .find(|s| s.id == step_id)
            .or_else(|| goal.steps.first())
            .cloned()
            .ok_or_else(|| {
                ServiceError::InvalidResponse(format!(
                    "goal {} reply carries no step {}",
                    goal_id, step_id
                ))
            })?;
        Ok((goal, step))
    }

    pub fn update_goal(&self, goal_id: GoalId, patch: &GoalPatch) -> ServiceResult<String> {
        self.message(
            "PATCH",
            &format!("/api/goals/{}", goal_id),
            Some(serde_json::to_value(patch)?),
        )
    }

    pub fn delete_goal(&self, goal_id: GoalId) -> ServiceResult<String> {
        self.message("DELETE", &format!("/api/goals/{}", goal_id), None)
    }

    // Steps

    /// Returns the id the server assigned.
    pub fn add_step(&self, goal_id: GoalId, step: &NewStep) -> ServiceResult<StepId> {
        let created: CreatedStep = self.execute(
            "POST",
            &format!("/api/goals/{}/steps", goal_id),
            Some(serde_json::to_value(step)?),
        )?;
        Ok(created.step_id)
    }

    pub fn add_steps_bulk(&self, goal_id: GoalId, steps: &[BulkStep]) -> ServiceResult<String> {
        self.message(
            "POST",
            &format!("/api/goals/{}/steps/bulk", goal_id),
            Some(json!({ "steps": steps })),
        )
    }

    pub fn update_step(&self, step_id: StepId, patch: &StepPatch) -> ServiceResult<String> {
        self.message(
            "PATCH",
            &format!("/api/steps/{}", step_id),
            Some(serde_json::to_value(patch)?),
        )
    }

    pub fn delete_step(&self, step_id: StepId) -> ServiceResult<String> {
        self.message("DELETE", &format!("/api/steps/{}", step_id), None)
    }

    pub fn get_steps_bulk(&self, step_ids: &[StepId]) -> ServiceResult<Vec<Step>> {
        let response: StepsBulkResponse =
            self.execute("POST", "/api/steps/bulk", Some(json!({ "step_ids": step_ids })))?;
        Ok(response.steps)
    }

    // AI

    /// Returns the server message and the ids of the steps it moved.
    pub fn reschedule_tasks(&self, problem: &str) -> ServiceResult<(String, Vec<StepId>)> {
        let response: RescheduleResponse =
            self.execute("POST", "/api/ai/reschedule", Some(json!({ "problem": problem })))?;
        let ids = response.updated_tasks.iter().map(|t| t.task_id).collect();
        Ok((response.message, ids))
    }

    pub fn generate_goal(&self, prompt: &str) -> ServiceResult<GoalId> {
        let generated: GeneratedGoal = self.execute(
            "POST",
            "/api/ai/generate-goal",
            Some(json!({ "user_prompt": prompt })),
        )?;
        Ok(generated.goal_id)
    }

    /// Run a blocking call against a clone of this client on tokio's blocking pool.
    pub async fn run_blocking<T, F>(&self, call: F) -> ServiceResult<T>
    where
        T: Send + 'static,
        F: FnOnce(ApiClient) -> ServiceResult<T> + Send + 'static,
    {
        let client = self.clone();
        tokio::task::spawn_blocking(move || call(client))
            .await
            .map_err(|e| {
                ServiceError::IoError(std::io::Error::other(format!(
                    "spawn_blocking failed: {}",
                    e
                )))
            })?
    }
}

/// The calls the synchronizer makes, as futures.
#[allow(async_fn_in_trait)]
pub trait GoalApi {
    async fn goals_with_steps(&self) -> ServiceResult<Vec<Goal>>;
    async fn goal_info(&self, goal_id: GoalId) -> ServiceResult<Goal>;
    async fn goal_step_detail(&self, goal_id: GoalId, step_id: StepId) -> ServiceResult<(Goal, Step)>;
    async fn create_goal(&self, goal: NewGoal) -> ServiceResult<String>;
    async fn generate_goal(&self, prompt: String) -> ServiceResult<GoalId>;
    async fn update_goal(&self, goal_id: GoalId, patch: GoalPatch) -> ServiceResult<String>;
    async fn delete_goal(&self, goal_id: GoalId) -> ServiceResult<String>;
    async fn add_step(&self, goal_id: GoalId, step: NewStep) -> ServiceResult<StepId>;
    async fn add_steps_bulk(&self, goal_id: GoalId, steps: Vec<BulkStep>) -> ServiceResult<String>;
    async fn update_step(&self, step_id: StepId, patch: StepPatch) -> ServiceResult<String>;
    async fn delete_step(&self, step_id: StepId) -> ServiceResult<String>;
    async fn steps_bulk(&self, step_ids: Vec<StepId>) -> ServiceResult<Vec<Step>>;
    async fn reschedule(&self, problem: String) -> ServiceResult<(String, Vec<StepId>)>;
}

impl GoalApi for ApiClient {
    async fn goals_with_steps(&self) -> ServiceResult<Vec<Goal>> {
        self.run_blocking(|c| c.get_goals_with_steps()).await
    }

    async fn goal_info(&self, goal_id: GoalId) -> ServiceResult<Goal> {
        self.run_blocking(move |c| c.get_goal_info(goal_id)).await
    }

    async fn goal_step_detail(&self, goal_id: GoalId, step_id: StepId) -> ServiceResult<(Goal, Step)> {
        self.run_blocking(move |c| c.get_goal_step_detail(goal_id, step_id))
            .await
    }

    async fn create_goal(&self, goal: NewGoal) -> ServiceResult<String> {
        self.run_blocking(move |c| ApiClient::create_goal(&c, &goal))
            .await
    }

    async fn generate_goal(&self, prompt: String) -> ServiceResult<GoalId> {
        self.run_blocking(move |c| ApiClient::generate_goal(&c, &prompt))
            .await
    }

    async fn update_goal(&self, goal_id: GoalId, patch: GoalPatch) -> ServiceResult<String> {
        self.run_blocking(move |c| ApiClient::update_goal(&c, goal_id, &patch))
            .await
    }

    async fn delete_goal(&self, goal_id: GoalId) -> ServiceResult<String> {
        self.run_blocking(move |c| ApiClient::delete_goal(&c, goal_id))
            .await
    }

    async fn add_step(&self, goal_id: GoalId, step: NewStep) -> ServiceResult<StepId> {
        self.run_blocking(move |c| ApiClient::add_step(&c, goal_id, &step))
            .await
    }

    async fn add_steps_bulk(&self, goal_id: GoalId, steps: Vec<BulkStep>) -> ServiceResult<String> {
        self.run_blocking(move |c| ApiClient::add_steps_bulk(&c, goal_id, &steps))
            .await
    }

    async fn update_step(&self, step_id: StepId, patch: StepPatch) -> ServiceResult<String> {
        self.run_blocking(move |c| ApiClient::update_step(&c, step_id, &patch))
            .await
    }

    async fn delete_step(&self, step_id: StepId) -> ServiceResult<String> {
        self.run_blocking(move |c| ApiClient::delete_step(&c, step_id))
            .await
    }

    async fn steps_bulk(&self, step_ids: Vec<StepId>) -> ServiceResult<Vec<Step>> {
        self.run_blocking(move |c| c.get_steps_bulk(&step_ids)).await
    }

    async fn reschedule(&self, problem: String) -> ServiceResult<(String, Vec<StepId>)> {
        self.run_blocking(move |c| c.reschedule_tasks(&problem)).await
    }
}

/// Build a client from a user-supplied address like "whatiamtodo.ru" or "https://whatiamtodo.ru".
pub fn create_api_client(address: &str, token: Option<String>) -> ServiceResult<ApiClient> {
    let address = address.trim();
    if address.is_empty() {
        return Err(ServiceError::Config("base URL is empty".to_string()));
    }
    let base_url = if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("https://{}", address)
    };

    Ok(ApiClient::new(ApiConfig { base_url, token }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_creation() {
        let config = ApiConfig {
            base_url: "https://whatiamtodo.ru/".to_string(),
            token: Some("test-token".to_string()),
        };

        let client = ApiClient::new(config);
        assert_eq!(client.base_url, "https://whatiamtodo.ru");
        assert_eq!(client.token, Some("test-token".to_string()));
        assert_eq!(client.url("/api/goals/with-steps"), "https://whatiamtodo.ru/api/goals/with-steps");
    }

    #[tokio::test]
    async fn test_address_parsing() {
        let client = create_api_client("whatiamtodo.ru", None).unwrap();
        assert_eq!(client.base_url(), "https://whatiamtodo.ru");
        assert!(!client.has_token());

        let client2 = create_api_client("http://localhost:5000", Some("key".to_string())).unwrap();
        assert_eq!(client2.base_url(), "http://localhost:5000");
        assert!(client2.has_token());

        assert!(create_api_client("   ", None).is_err());
    }

    #[test]
    fn token_can_be_attached_later() {
        let client = create_api_client("whatiamtodo.ru", None).unwrap();
        assert!(!client.has_token());
        let client = client.with_token("fresh");
        assert!(client.has_token());
        assert_eq!(client.token.as_deref(), Some("fresh"));
        assert_eq!(client.base_url(), "https://whatiamtodo.ru");
    }

    #[test]
    fn debug_output_hides_token() {
        let client = create_api_client("localhost:5000", Some("secret".to_string())).unwrap();
        let shown = format!("{:?}", client);
        assert!(!shown.contains("secret"));
        assert!(shown.contains("<redacted>"));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let client = create_api_client("http://127.0.0.1:9", Some("t".to_string())).unwrap();
        let err = client.goals_with_steps().await.unwrap_err();
        assert!(matches!(err, ServiceError::Network(_)), "got {err:?}");
    }
}
