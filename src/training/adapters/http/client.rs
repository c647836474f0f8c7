//! `reqwest` client for the training host protocol.
//!
//! | Operation | Request | Response |
//! |---|---|---|
//! | ping | `GET /` | 200 |
//! | train | `POST /jobs` (multipart) | `{"job_id": "..."}` |
//! | cancel | `POST /jobs/{id}/cancel` | `{"cancelled": bool}` |
//! | status | `GET /jobs/{id}/status` | `{"status": "..."}` |
//! | logs | `GET /jobs/{id}/logs` | text |
//! | result | `GET /jobs/{id}/result` | streamed bytes |

use crate::config::{ConfigError, HostClientSettings};
use crate::storage::ByteStream;
use crate::training::{
    domain::{HostUrl, RemoteJobId, TrainingStatus},
    ports::{TrainingHost, TrainingHostError, TrainingHostResult, TrainingSubmission},
};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::io;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct TrainAccepted {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct CancelAnswer {
    cancelled: bool,
}

#[derive(Debug, Deserialize)]
struct StatusAnswer {
    status: String,
}

/// Training host client over HTTP.
///
/// Constructed once at process start and shared; it holds no per-job state.
#[derive(Debug, Clone)]
pub struct HttpTrainingHost {
    client: Client,
    settings: HostClientSettings,
}

impl HttpTrainingHost {
    /// Creates a client with the given settings.
    ///
    /// Every response read is bounded by `idle_timeout`, so a host that stops
    /// sending mid-body fails the call instead of stalling it.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingHostError::Transport`] when the HTTP client cannot be
    /// built.
    pub fn new(settings: HostClientSettings) -> TrainingHostResult<Self> {
        let client = Client::builder()
            .read_timeout(settings.idle_timeout)
            .build()
            .map_err(TrainingHostError::transport)?;
        Ok(Self { client, settings })
    }

    fn request(&self, method: Method, url: String, timeout: Option<Duration>) -> RequestBuilder {
        let mut builder = self.client.request(method, url);
        if let Some(limit) = timeout {
            builder = builder.timeout(limit);
        }
        if let Some(token) = &self.settings.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    fn job_url(host: &HostUrl, job: &RemoteJobId, action: &str) -> String {
        host.endpoint(&format!("jobs/{job}/{action}"))
    }

    async fn json<T: DeserializeOwned>(response: Response) -> TrainingHostResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|err| TrainingHostError::UnexpectedResponse(err.to_string()))
    }
}

async fn send(builder: RequestBuilder) -> TrainingHostResult<Response> {
    let response = builder.send().await.map_err(TrainingHostError::transport)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = match response.text().await {
        Ok(text) => text,
        Err(err) => {
            debug!(status = status.as_u16(), error = %err, "failed to read error response body");
            String::new()
        }
    };
    Err(TrainingHostError::Http {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl TrainingHost for HttpTrainingHost {
    async fn ping(&self, host: &HostUrl) -> bool {
        let outcome = self
            .client
            .get(host.endpoint(""))
            .timeout(self.settings.request_timeout)
            .send()
            .await;
        match outcome {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(err) => {
                debug!(%host, error = %err, "training host ping failed");
                false
            }
        }
    }

    async fn train(
        &self,
        host: &HostUrl,
        submission: TrainingSubmission,
    ) -> TrainingHostResult<RemoteJobId> {
        let image = submission
            .image
            .or_else(|| self.settings.default_image.clone())
            .ok_or(ConfigError::MissingImage)?;
        let size = u64::try_from(submission.payload.len()).unwrap_or(u64::MAX);
        if let Some(limit) = self.settings.max_payload_bytes.filter(|limit| size > *limit) {
            return Err(TrainingHostError::PayloadTooLarge { size, limit });
        }

        let training_data = Part::bytes(submission.payload.to_vec())
            .file_name("training_data.json")
            .mime_str("application/json")
            .map_err(TrainingHostError::transport)?;
        let mut form = Form::new()
            .text("project_id", submission.project_id.as_str().to_owned())
            .text("image", image);
        if !submission.extra_args.is_empty() {
            let extra_args = serde_json::to_string(&submission.extra_args)
                .map_err(TrainingHostError::transport)?;
            form = form.text("extra_args", extra_args);
        }
        if let Some(node) = submission.node {
            form = form.text("node", node);
        }
        form = form.part("training_data", training_data);

        let response = send(
            self.request(Method::POST, host.endpoint("jobs"), self.settings.train_timeout)
                .multipart(form),
        )
        .await?;
        let accepted: TrainAccepted = Self::json(response).await?;
        RemoteJobId::new(accepted.job_id)
            .map_err(|err| TrainingHostError::UnexpectedResponse(err.to_string()))
    }

    async fn cancel(&self, host: &HostUrl, job: &RemoteJobId) -> TrainingHostResult<bool> {
        let response = send(self.request(
            Method::POST,
            Self::job_url(host, job, "cancel"),
            Some(self.settings.request_timeout),
        ))
        .await?;
        let answer: CancelAnswer = Self::json(response).await?;
        Ok(answer.cancelled)
    }

    async fn status(
        &self,
        host: &HostUrl,
        job: &RemoteJobId,
    ) -> TrainingHostResult<TrainingStatus> {
        let response = send(self.request(
            Method::GET,
            Self::job_url(host, job, "status"),
            Some(self.settings.request_timeout),
        ))
        .await?;
        let answer: StatusAnswer = Self::json(response).await?;
        TrainingStatus::try_from(answer.status.as_str())
            .map_err(|err| TrainingHostError::UnexpectedResponse(err.to_string()))
    }

    async fn logs(&self, host: &HostUrl, job: &RemoteJobId) -> TrainingHostResult<String> {
        let response = send(self.request(
            Method::GET,
            Self::job_url(host, job, "logs"),
            Some(self.settings.request_timeout),
        ))
        .await?;
        response.text().await.map_err(TrainingHostError::transport)
    }

    async fn result(&self, host: &HostUrl, job: &RemoteJobId) -> TrainingHostResult<ByteStream> {
        let response = send(self.request(
            Method::GET,
            Self::job_url(host, job, "result"),
            self.settings.result_timeout,
        ))
        .await?;
        let limit = self.settings.max_result_bytes;
        if let Some((size, ceiling)) = response
            .content_length()
            .zip(limit)
            .filter(|(size, ceiling)| size > ceiling)
        {
            warn!(%host, remote_job_id = %job, size, "training result exceeds size limit");
            return Err(TrainingHostError::ResultTooLarge { limit: ceiling });
        }

        let mut received: u64 = 0;
        let stream = response.bytes_stream().map(move |chunk| {
            let bytes = chunk.map_err(io::Error::other)?;
            received = received.saturating_add(u64::try_from(bytes.len()).unwrap_or(u64::MAX));
            match limit {
                Some(ceiling) if received > ceiling => Err(io::Error::other(format!(
                    "training result exceeds the {ceiling} byte limit"
                ))),
                _ => Ok(bytes),
            }
        });
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ProjectId;
    use bytes::Bytes;
    use mockito::{Matcher, Server};
    use rstest::rstest;

    fn settings() -> HostClientSettings {
        HostClientSettings {
            token: Some("secret".to_owned()),
            default_image: Some("trainer:latest".to_owned()),
            ..HostClientSettings::default()
        }
    }

    async fn silent_host() -> HostUrl {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener binds");
        let address = listener.local_addr().expect("listener address");
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        HostUrl::new(format!("http://{address}")).expect("listener URL is valid")
    }

    /// Answers one request with a 500 whose body ends early.
    async fn truncating_host() -> HostUrl {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener binds");
        let address = listener.local_addr().expect("listener address");
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request = vec![0_u8; 4096];
                let _ = socket.read(&mut request).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 64\r\n\r\nboom",
                    )
                    .await;
            }
        });
        HostUrl::new(format!("http://{address}")).expect("listener URL is valid")
    }

    fn host_of(server: &Server) -> HostUrl {
        HostUrl::new(server.url()).expect("mock server URL is valid")
    }

    fn job(id: &str) -> RemoteJobId {
        RemoteJobId::new(id).expect("valid remote id")
    }

    fn submission() -> TrainingSubmission {
        TrainingSubmission {
            project_id: ProjectId::new("bf").expect("valid project"),
            image: None,
            extra_args: vec!["--augmentation".to_owned(), "0".to_owned()],
            node: Some("gpu-1".to_owned()),
            payload: Bytes::from_static(b"{\"nlu\":[]}"),
        }
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn train_posts_multipart_and_returns_remote_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/jobs")
            .match_header("authorization", "Bearer secret")
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data".to_owned()),
            )
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("name=\"project_id\"".to_owned()),
                Matcher::Regex("trainer:latest".to_owned()),
                Matcher::Regex(r#"\["--augmentation","0"\]"#.to_owned()),
                Matcher::Regex("filename=\"training_data.json\"".to_owned()),
            ]))
            .with_status(200)
            .with_body(r#"{"job_id":"J1"}"#)
            .create_async()
            .await;
        let client = HttpTrainingHost::new(settings()).expect("client should build");

        let remote = client
            .train(&host_of(&server), submission())
            .await
            .expect("train should succeed");

        assert_eq!(remote, job("J1"));
        mock.assert_async().await;
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn train_without_any_image_fails_before_calling_the_host() {
        let mut server = Server::new_async().await;
        let mock = server.mock("POST", "/jobs").expect(0).create_async().await;
        let client = HttpTrainingHost::new(HostClientSettings::default()).expect("client should build");

        let result = client.train(&host_of(&server), submission()).await;

        assert!(matches!(
            result,
            Err(TrainingHostError::Config(ConfigError::MissingImage))
        ));
        mock.assert_async().await;
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn oversized_payload_is_rejected_locally() {
        let server = Server::new_async().await;
        let client = HttpTrainingHost::new(HostClientSettings {
            max_payload_bytes: Some(4),
            ..settings()
        })
        .expect("client should build");

        let result = client.train(&host_of(&server), submission()).await;

        assert!(matches!(
            result,
            Err(TrainingHostError::PayloadTooLarge { limit: 4, .. })
        ));
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn host_failures_are_surfaced_verbatim() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/jobs/J1/status")
            .with_status(503)
            .with_body("worker pool exhausted")
            .create_async()
            .await;
        let client = HttpTrainingHost::new(settings()).expect("client should build");

        let result = client.status(&host_of(&server), &job("J1")).await;

        assert!(matches!(
            result,
            Err(TrainingHostError::Http { status: 503, ref body }) if body == "worker pool exhausted"
        ));
    }

    #[rstest]
    #[case("training", TrainingStatus::Training)]
    #[case("success", TrainingStatus::Success)]
    #[case("failed", TrainingStatus::Failed)]
    #[case("cancelled", TrainingStatus::Cancelled)]
    #[tokio::test(flavor = "multi_thread")]
    async fn status_maps_remote_vocabulary(#[case] remote: &str, #[case] expected: TrainingStatus) {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/jobs/J1/status")
            .with_status(200)
            .with_body(format!(r#"{{"status":"{remote}"}}"#))
            .create_async()
            .await;
        let client = HttpTrainingHost::new(settings()).expect("client should build");

        let status = client
            .status(&host_of(&server), &job("J1"))
            .await
            .expect("status should succeed");

        assert_eq!(status, expected);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_status_is_an_unexpected_response() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/jobs/J1/status")
            .with_status(200)
            .with_body(r#"{"status":"queued"}"#)
            .create_async()
            .await;
        let client = HttpTrainingHost::new(settings()).expect("client should build");

        let result = client.status(&host_of(&server), &job("J1")).await;

        assert!(matches!(result, Err(TrainingHostError::UnexpectedResponse(_))));
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn cancel_and_logs_follow_the_protocol() {
        let mut server = Server::new_async().await;
        let _cancel = server
            .mock("POST", "/jobs/J1/cancel")
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_body(r#"{"cancelled":true}"#)
            .create_async()
            .await;
        let _logs = server
            .mock("GET", "/jobs/J1/logs")
            .with_status(200)
            .with_body("epoch 1/10")
            .create_async()
            .await;
        let client = HttpTrainingHost::new(settings()).expect("client should build");
        let host = host_of(&server);

        assert!(client.cancel(&host, &job("J1")).await.expect("cancel should succeed"));
        assert_eq!(
            client.logs(&host, &job("J1")).await.expect("logs should succeed"),
            "epoch 1/10"
        );
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn result_is_streamed_in_full() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/jobs/J1/result")
            .with_status(200)
            .with_body(vec![7_u8; 4096])
            .create_async()
            .await;
        let client = HttpTrainingHost::new(settings()).expect("client should build");

        let mut stream = client
            .result(&host_of(&server), &job("J1"))
            .await
            .expect("result should open");
        let mut total = 0_usize;
        while let Some(chunk) = stream.next().await {
            total += chunk.expect("chunk should arrive").len();
        }

        assert_eq!(total, 4096);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn result_over_the_ceiling_is_refused() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/jobs/J1/result")
            .with_status(200)
            .with_body(vec![7_u8; 4096])
            .create_async()
            .await;
        let client = HttpTrainingHost::new(HostClientSettings {
            max_result_bytes: Some(1024),
            ..settings()
        })
        .expect("client should build");

        let outcome = client.result(&host_of(&server), &job("J1")).await;

        let failed = match outcome {
            Err(TrainingHostError::ResultTooLarge { limit }) => limit == 1024,
            Err(_) => false,
            Ok(mut stream) => {
                let mut saw_error = false;
                while let Some(chunk) = stream.next().await {
                    saw_error |= chunk.is_err();
                }
                saw_error
            }
        };
        assert!(failed);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn ping_reports_liveness_without_failing() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(200)
            .create_async()
            .await;
        let client = HttpTrainingHost::new(settings()).expect("client should build");

        assert!(client.ping(&host_of(&server)).await);
        let unreachable = HostUrl::new("http://127.0.0.1:9").expect("valid host");
        assert!(!client.ping(&unreachable).await);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn silent_host_fails_result_after_idle_timeout() {
        let client = HttpTrainingHost::new(HostClientSettings {
            idle_timeout: Duration::from_millis(200),
            ..settings()
        })
        .expect("client should build");
        let host = silent_host().await;

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            client.result(&host, &job("J1")),
        )
        .await
        .expect("idle timeout should end the call");

        assert!(matches!(outcome, Err(TrainingHostError::Transport(_))));
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn unreadable_error_body_keeps_the_status() {
        let client = HttpTrainingHost::new(settings()).expect("client should build");
        let host = truncating_host().await;

        let outcome = client.logs(&host, &job("J1")).await;

        assert!(matches!(
            outcome,
            Err(TrainingHostError::Http { status: 500, ref body }) if body.is_empty()
        ));
    }
}
