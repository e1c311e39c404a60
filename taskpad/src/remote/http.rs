//! REST collaborator speaking the `/api/todos` protocol over HTTP.
//!
//! The caller's identity travels in the [`USER_ID_HEADER`] header and every
//! request carries the configured timeout, so a hung service surfaces as
//! [`RemoteError::Timeout`] instead of blocking the caller forever.

use std::time::Duration;

use reqwest::StatusCode;
use taskpad_proto::task::{Task, TaskId};
use taskpad_proto::wire::{MessageBody, NewTask, TODOS_PATH, TaskPatch, USER_ID_HEADER};
use url::Url;

use super::{RemoteError, RemoteTasks};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for a `taskpad-server` compatible service.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    /// Service root, always ending in `/`.
    base_url: Url,
    timeout: Duration,
}

impl HttpRemote {
    /// Creates a client for the service rooted at `base_url`.
    #[must_use]
    pub fn new(base_url: Url, timeout: Duration) -> Self {
        let mut base_url = base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            client: reqwest::Client::new(),
            base_url,
            timeout,
        }
    }

    /// The service root this client talks to.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn collection_url(&self) -> Result<Url, RemoteError> {
        self.base_url
            .join(TODOS_PATH.trim_start_matches('/'))
            .map_err(|e| RemoteError::Connection(format!("invalid service url: {e}")))
    }

    fn item_url(&self, id: &TaskId) -> Result<Url, RemoteError> {
        let mut url = self.collection_url()?;
        url.path_segments_mut()
            .map_err(|()| RemoteError::Connection("service url cannot be a base".to_string()))?
            .push(id.as_str());
        Ok(url)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        user_id: &str,
    ) -> Result<reqwest::Response, RemoteError> {
        let response = request
            .header(USER_ID_HEADER, user_id)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await
    }
}

impl RemoteTasks for HttpRemote {
    async fn list(&self, user_id: &str) -> Result<Vec<Task>, RemoteError> {
        let url = self.collection_url()?;
        let response = self.send(self.client.get(url), user_id).await?;
        response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn create(&self, user_id: &str, task: &NewTask) -> Result<Task, RemoteError> {
        let url = self.collection_url()?;
        let response = self.send(self.client.post(url).json(task), user_id).await?;
        response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn update(
        &self,
        user_id: &str,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> Result<(), RemoteError> {
        let url = self.item_url(id)?;
        self.send(self.client.patch(url).json(patch), user_id).await?;
        Ok(())
    }

    async fn delete(&self, user_id: &str, id: &TaskId) -> Result<(), RemoteError> {
        let url = self.item_url(id)?;
        self.send(self.client.delete(url), user_id).await?;
        Ok(())
    }
}

fn transport_error(error: reqwest::Error) -> RemoteError {
    if error.is_timeout() {
        RemoteError::Timeout
    } else if error.is_connect() {
        RemoteError::Connection(error.to_string())
    } else if error.is_decode() {
        RemoteError::Decode(error.to_string())
    } else {
        RemoteError::Connection(error.to_string())
    }
}

/// Passes success responses through and maps the rest to [`RemoteError`].
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::UNAUTHORIZED => Err(RemoteError::Unauthorized),
        StatusCode::NOT_FOUND => Err(RemoteError::NotFound),
        _ => {
            let message = match response.json::<MessageBody>().await {
                Ok(body) => body.message,
                Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
            };
            Err(RemoteError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }
}
