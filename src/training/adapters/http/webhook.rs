//! Webhook delivery for model-ready notifications.

use crate::artifact::domain::ModelArtifact;
use crate::config::WebhookSettings;
use crate::project::ProjectId;
use crate::training::ports::{CollaboratorError, CollaboratorResult, ModelReadyNotifier};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelReadyPayload<'a> {
    project_id: &'a str,
    artifact_id: String,
    path: &'a str,
}

/// Posts a JSON notice to an operator-configured URL whenever a model is
/// captured.
///
/// Each delivery is bounded by the configured timeout; a receiver that never
/// answers yields a notification error.
#[derive(Debug, Clone)]
pub struct WebhookModelReadyNotifier {
    client: Client,
    settings: WebhookSettings,
}

impl WebhookModelReadyNotifier {
    /// Creates a notifier for the given webhook.
    #[must_use]
    pub fn new(settings: WebhookSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }
}

#[async_trait]
impl ModelReadyNotifier for WebhookModelReadyNotifier {
    async fn notify_model_ready(
        &self,
        project_id: &ProjectId,
        artifact: &ModelArtifact,
    ) -> CollaboratorResult<()> {
        let payload = ModelReadyPayload {
            project_id: project_id.as_str(),
            artifact_id: artifact.id().to_string(),
            path: artifact.storage_path().as_str(),
        };
        self.client
            .request(self.settings.method.clone(), &self.settings.url)
            .timeout(self.settings.timeout)
            .json(&payload)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(CollaboratorError::notification)?;
        debug!(project_id = %project_id, artifact_id = %artifact.id(), "model-ready webhook delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::domain::ArtifactFile;
    use mockable::DefaultClock;
    use mockito::{Matcher, Server};
    use reqwest::Method;
    use rstest::rstest;
    use serde_json::json;
    use std::time::Duration;

    fn artifact(project: &ProjectId) -> ModelArtifact {
        ModelArtifact::captured(
            project.clone(),
            None,
            ArtifactFile {
                storage_path: "/srv/models/bf/model-1.tar.gz".into(),
                size_bytes: 3,
                sha256: "00".repeat(32),
            },
            &DefaultClock,
        )
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn posts_camel_case_notice() {
        let mut server = Server::new_async().await;
        let project = ProjectId::new("bf").expect("valid project");
        let captured = artifact(&project);
        let mock = server
            .mock("PUT", "/hooks/model")
            .match_body(Matcher::Json(json!({
                "projectId": "bf",
                "artifactId": captured.id().to_string(),
                "path": "/srv/models/bf/model-1.tar.gz",
            })))
            .with_status(204)
            .create_async()
            .await;
        let notifier = WebhookModelReadyNotifier::new(WebhookSettings {
            url: format!("{}/hooks/model", server.url()),
            method: Method::PUT,
            timeout: Duration::from_secs(5),
        });

        notifier
            .notify_model_ready(&project, &captured)
            .await
            .expect("webhook should be delivered");

        mock.assert_async().await;
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn non_success_answer_is_a_notification_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/hooks/model")
            .with_status(500)
            .create_async()
            .await;
        let project = ProjectId::new("bf").expect("valid project");
        let notifier = WebhookModelReadyNotifier::new(WebhookSettings {
            url: format!("{}/hooks/model", server.url()),
            method: Method::POST,
            timeout: Duration::from_secs(5),
        });

        let result = notifier.notify_model_ready(&project, &artifact(&project)).await;

        assert!(matches!(result, Err(CollaboratorError::Notification(_))));
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn silent_receiver_times_out() {
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
        let project = ProjectId::new("bf").expect("valid project");
        let notifier = WebhookModelReadyNotifier::new(WebhookSettings {
            url: format!("http://{address}/hooks/model"),
            method: Method::POST,
            timeout: Duration::from_millis(200),
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            notifier.notify_model_ready(&project, &artifact(&project)),
        )
        .await
        .expect("delivery should give up within its timeout");

        assert!(matches!(result, Err(CollaboratorError::Notification(_))));
    }
}
