use crate::config::API_BASE_URL;
use crate::http::build_client;
use crate::metrics;
use crate::models::{ApiErrorBody, opt_id_string};
use crate::submission::{SubmissionPayload, SubmitError};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Instant;
use tracing::{info, warn};

/// Body of a successful create call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AdCreated {
    #[serde(default, deserialize_with = "opt_id_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[async_trait::async_trait]
pub trait AdPublisher: Send + Sync {
    async fn create_ad(
        &self,
        endpoint: &str,
        payload: SubmissionPayload,
        token: &str,
    ) -> Result<AdCreated, SubmitError>;
}

#[derive(Debug, Clone)]
pub struct AdsClient {
    base_url: String,
    http: Client,
}

impl AdsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: build_client(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(API_BASE_URL.as_str())
    }

    async fn send(&self, url: &str, form: Form, token: &str) -> Result<AdCreated, SubmitError> {
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(|err| SubmitError::Transport(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| SubmitError::Transport(err.to_string()))?;
        if !status.is_success() {
            return Err(rejection(status, &body));
        }
        Ok(serde_json::from_str::<AdCreated>(&body).unwrap_or_default())
    }
}

/// Reads path-backed files and builds the multipart body.
async fn multipart_form(payload: SubmissionPayload) -> Result<Form, SubmitError> {
    let mut form = Form::new();
    for (name, value) in payload.fields {
        form = form.text(name, value);
    }
    for attachment in payload.attachments {
        let bytes = attachment.file.read().await?;
        let part = Part::bytes(bytes)
            .file_name(attachment.file.name.clone())
            .mime_str(&attachment.file.mime)
            .map_err(|err| SubmitError::Transport(err.to_string()))?;
        form = form.part(attachment.field, part);
    }
    Ok(form)
}

/// Maps a non-success response to the caller-facing error.
fn rejection(status: StatusCode, body: &str) -> SubmitError {
    if status == StatusCode::UNAUTHORIZED {
        return SubmitError::SessionExpired;
    }
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    SubmitError::Rejected {
        status: status.as_u16(),
        message: parsed.message.or(parsed.error),
    }
}

#[async_trait::async_trait]
impl AdPublisher for AdsClient {
    async fn create_ad(
        &self,
        endpoint: &str,
        payload: SubmissionPayload,
        token: &str,
    ) -> Result<AdCreated, SubmitError> {
        let started = Instant::now();
        let attachments = payload.attachments.len();
        let form = multipart_form(payload).await?;
        let url = format!("{}{}", self.base_url, endpoint);
        info!(target = "trucksbus.ads", %url, attachments, "create_ad");

        let result = self.send(&url, form, token).await;

        metrics::submission_elapsed(endpoint, started.elapsed().as_millis(), result.is_ok());
        if let Err(err) = &result {
            warn!(target = "trucksbus.ads", endpoint, error = %err, "create_ad failed");
        }
        result
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::{AdCreated, AdPublisher};
    use crate::submission::{SubmissionPayload, SubmitError};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Records submissions and replays queued responses; succeeds when empty.
    #[derive(Default)]
    pub struct RecordingPublisher {
        pub sent: Mutex<Vec<(String, SubmissionPayload, String)>>,
        pub responses: Mutex<VecDeque<Result<AdCreated, SubmitError>>>,
    }

    impl RecordingPublisher {
        pub fn respond(self, response: Result<AdCreated, SubmitError>) -> Self {
            self.responses.lock().unwrap().push_back(response);
            self
        }

        pub fn sent(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl AdPublisher for RecordingPublisher {
        async fn create_ad(
            &self,
            endpoint: &str,
            payload: SubmissionPayload,
            token: &str,
        ) -> Result<AdCreated, SubmitError> {
            self.sent
                .lock()
                .unwrap()
                .push((endpoint.to_string(), payload, token.to_string()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Ok(AdCreated {
                        id: Some("1001".into()),
                        message: None,
                    })
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaFile;
    use crate::submission::Attachment;

    #[test]
    fn unauthorized_is_session_expiry() {
        assert_eq!(
            rejection(StatusCode::UNAUTHORIZED, r#"{"message":"jwt expired"}"#),
            SubmitError::SessionExpired
        );
    }

    #[test]
    fn server_message_is_carried() {
        let err = rejection(StatusCode::BAD_REQUEST, r#"{"message":"Fiyat zorunludur"}"#);
        assert_eq!(err.user_message(), "Fiyat zorunludur");
        let err = rejection(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
        assert_eq!(
            err,
            SubmitError::Rejected {
                status: 500,
                message: None
            }
        );
    }

    #[test]
    fn created_body_accepts_numeric_id() {
        let created: AdCreated = serde_json::from_str(r#"{"id": 77, "message": "ok"}"#).unwrap();
        assert_eq!(created.id.as_deref(), Some("77"));
    }

    #[tokio::test]
    async fn unreadable_attachment_fails_before_sending() {
        let missing = std::env::temp_dir().join(format!("trucksbus-missing-{}.jpg", uuid::Uuid::new_v4()));
        let payload = SubmissionPayload {
            fields: vec![("title".into(), "x".into())],
            attachments: vec![Attachment {
                field: "showcasePhoto".into(),
                file: MediaFile {
                    name: "cover.jpg".into(),
                    mime: "image/jpeg".into(),
                    size: 1,
                    source: crate::media::MediaSource::Path(missing),
                },
            }],
        };
        assert!(matches!(
            multipart_form(payload).await,
            Err(SubmitError::Media(_))
        ));
    }
}
