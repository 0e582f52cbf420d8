use crate::infrastructure::activity_mapper::{ActivityPayload, ScheduleResponsePayload};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

const SCHEDULE_PATH: &str = "api/schedule";
const UPDATE_UNFINISHED_PATH: &str = "api/update-unfinished";
const COMPLETE_TASK_PATH: &str = "api/complete-task";
const CONFIRM_TASK_PATH: &str = "api/confirm-task";

#[async_trait]
pub trait ScheduleServiceClient: Send + Sync {
    async fn fetch_schedule(&self) -> Result<ScheduleResponsePayload, InfraError>;

    async fn update_unfinished(&self, unfinished_tasks: &[ActivityPayload]) -> Result<(), InfraError>;

    async fn complete_task(&self, task: &ActivityPayload) -> Result<(), InfraError>;

    async fn confirm_task(&self, task: &ActivityPayload, is_completed: bool) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestScheduleServiceClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug, serde::Serialize)]
struct UpdateUnfinishedRequest<'a> {
    #[serde(rename = "unfinishedTasks")]
    unfinished_tasks: &'a [ActivityPayload],
}

#[derive(Debug, serde::Serialize)]
struct CompleteTaskRequest<'a> {
    task: &'a ActivityPayload,
}

#[derive(Debug, serde::Serialize)]
struct ConfirmTaskRequest<'a> {
    task: &'a ActivityPayload,
    #[serde(rename = "isCompleted")]
    is_completed: bool,
}

#[derive(Debug, serde::Deserialize)]
struct SuccessResponse {
    #[serde(default)]
    success: bool,
}

impl ReqwestScheduleServiceClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, InfraError> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path)
            .map_err(|error| InfraError::InvalidConfig(format!("invalid endpoint {path}: {error}")))
    }

    fn http_error(status: reqwest::StatusCode, body: &str) -> InfraError {
        let message = if body.trim().is_empty() {
            format!("schedule service error: http {}", status.as_u16())
        } else {
            format!("schedule service error: http {}; body={body}", status.as_u16())
        };
        InfraError::Network(message)
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
        operation: &str,
    ) -> Result<T, InfraError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Network(format!("failed reading {operation} response: {error}")))?;

        if !status.is_success() {
            return Err(Self::http_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|error| {
            InfraError::Parse(format!("invalid {operation} payload: {error}; body={body}"))
        })
    }

    async fn post_for_success<B: serde::Serialize + Sync>(
        &self,
        path: &str,
        operation: &str,
        body: &B,
    ) -> Result<(), InfraError> {
        let response = self
            .client
            .post(self.endpoint(path)?)
            .json(body)
            .send()
            .await
            .map_err(|error| InfraError::Network(format!("network error during {operation}: {error}")))?;

        let parsed: SuccessResponse = Self::read_json(response, operation).await?;
        if !parsed.success {
            return Err(InfraError::Application(format!("{operation} returned success=false")));
        }
        Ok(())
    }
}

#[async_trait]
impl ScheduleServiceClient for ReqwestScheduleServiceClient {
    async fn fetch_schedule(&self) -> Result<ScheduleResponsePayload, InfraError> {
        let response = self
            .client
            .get(self.endpoint(SCHEDULE_PATH)?)
            .send()
            .await
            .map_err(|error| InfraError::Network(format!("network error while fetching schedule: {error}")))?;

        Self::read_json(response, "schedule").await
    }

    async fn update_unfinished(&self, unfinished_tasks: &[ActivityPayload]) -> Result<(), InfraError> {
        self.post_for_success(
            UPDATE_UNFINISHED_PATH,
            "update-unfinished",
            &UpdateUnfinishedRequest { unfinished_tasks },
        )
        .await
    }

    async fn complete_task(&self, task: &ActivityPayload) -> Result<(), InfraError> {
        self.post_for_success(COMPLETE_TASK_PATH, "complete-task", &CompleteTaskRequest { task })
            .await
    }

    async fn confirm_task(&self, task: &ActivityPayload, is_completed: bool) -> Result<(), InfraError> {
        self.post_for_success(
            CONFIRM_TASK_PATH,
            "confirm-task",
            &ConfirmTaskRequest { task, is_completed },
        )
        .await
    }
}
