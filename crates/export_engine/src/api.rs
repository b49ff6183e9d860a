use export_core::{TaskId, TaskSnapshot};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::client::ClientError;
use crate::config::{ExportConfig, ExportOptions};

const ACTIVE_USER_HEADER: &str = "x-notion-active-user-header";

/// Fields of an export job request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub space_id: String,
    pub options: ExportOptions,
}

/// The remote task endpoints: enqueue and status.
#[async_trait::async_trait]
pub trait TaskApi: Send + Sync {
    async fn enqueue_export(&self, request: &ExportRequest) -> Result<TaskId, ClientError>;

    async fn get_tasks(&self, task_ids: &[TaskId]) -> Result<Vec<TaskSnapshot>, ClientError>;
}

#[derive(Debug, Deserialize)]
struct EnqueueResponse {
    #[serde(rename = "taskId", default)]
    task_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetTasksResponse {
    #[serde(default)]
    results: Vec<TaskSnapshot>,
}

/// [`TaskApi`] over HTTP with the session cookie and active-user header.
#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    client: reqwest::Client,
    base: Url,
}

impl HttpTaskApi {
    pub fn new(config: &ExportConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        let cookie = format!("token_v2={};", config.credentials.token);
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&cookie)
                .map_err(|_| ClientError::InvalidHeader("token".to_string()))?,
        );
        headers.insert(
            HeaderName::from_static(ACTIVE_USER_HEADER),
            HeaderValue::from_str(&config.credentials.user_id)
                .map_err(|_| ClientError::InvalidHeader("user id".to_string()))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(config.fetch.connect_timeout)
            .timeout(config.fetch.request_timeout)
            .build()
            .map_err(|err| ClientError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            base: config.api_base.clone(),
        })
    }

    async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<T, ClientError> {
        let url = self
            .base
            .join(endpoint)
            .map_err(|err| ClientError::Transport(format!("{endpoint}: {err}")))?;

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|err| ClientError::Transport(format!("{endpoint}: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Transport(format!("{endpoint} returned {status}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|err| ClientError::RemoteRejected(format!("{endpoint}: {err}")))
    }
}

#[async_trait::async_trait]
impl TaskApi for HttpTaskApi {
    async fn enqueue_export(&self, request: &ExportRequest) -> Result<TaskId, ClientError> {
        let body = json!({
            "task": {
                "eventName": "exportSpace",
                "request": {
                    "spaceId": request.space_id,
                    "exportOptions": {
                        "exportType": request.options.format.as_str(),
                        "timeZone": request.options.time_zone,
                        "locale": request.options.locale,
                    },
                },
            },
        });

        let response: EnqueueResponse = self.post("enqueueTask", body).await?;
        response
            .task_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ClientError::RemoteRejected("enqueueTask: response has no taskId".into()))
    }

    async fn get_tasks(&self, task_ids: &[TaskId]) -> Result<Vec<TaskSnapshot>, ClientError> {
        let response: GetTasksResponse = self.post("getTasks", json!({ "taskIds": task_ids })).await?;
        Ok(response.results)
    }
}
