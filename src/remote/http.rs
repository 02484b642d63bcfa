use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};

use super::{Classification, Operation, RemoteError, RemoteProcessor, RemoteResult, UploadPayload};

const UPLOAD_ENDPOINT: &str = "upload-image";
const CLASSIFY_ENDPOINT: &str = "ONNX";
const PING_ENDPOINT: &str = "ping";

/// reqwest-backed [`RemoteProcessor`] bound to one base address.
#[derive(Debug, Clone)]
pub struct HttpProcessingClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpProcessingClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn read_image_body(
        endpoint: &str,
        response: reqwest::Response,
    ) -> RemoteResult<Bytes> {
        let response = check_status(endpoint, response)?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| transport(endpoint, &err))?;

        // The service always answers with an encoded raster; anything else
        // means the working image on the server is in an unexpected state.
        image::load_from_memory(&bytes).map_err(|err| RemoteError::Decode {
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        })?;

        Ok(bytes)
    }
}

#[async_trait]
impl RemoteProcessor for HttpProcessingClient {
    async fn upload(&self, payload: UploadPayload) -> RemoteResult<Bytes> {
        let part = Part::bytes(payload.bytes.to_vec())
            .file_name(payload.filename)
            .mime_str(payload.content_type)
            .map_err(|err| transport(UPLOAD_ENDPOINT, &err))?;
        let form = Form::new().part("file", part);

        tracing::debug!(endpoint = UPLOAD_ENDPOINT, "uploading working image");
        let response = self
            .http
            .post(self.url(UPLOAD_ENDPOINT))
            .multipart(form)
            .send()
            .await
            .map_err(|err| transport(UPLOAD_ENDPOINT, &err))?;

        Self::read_image_body(UPLOAD_ENDPOINT, response).await
    }

    async fn apply(&self, operation: Operation) -> RemoteResult<Bytes> {
        tracing::debug!(operation = %operation, "applying remote operation");
        let response = self
            .http
            .post(self.url(operation.endpoint))
            .query(operation.params)
            .send()
            .await
            .map_err(|err| transport(operation.endpoint, &err))?;

        Self::read_image_body(operation.endpoint, response).await
    }

    async fn classify(&self) -> RemoteResult<Classification> {
        let response = self
            .http
            .get(self.url(CLASSIFY_ENDPOINT))
            .send()
            .await
            .map_err(|err| transport(CLASSIFY_ENDPOINT, &err))?;
        let response = check_status(CLASSIFY_ENDPOINT, response)?;

        let body = response
            .text()
            .await
            .map_err(|err| transport(CLASSIFY_ENDPOINT, &err))?;
        Classification::from_json(&body).map_err(|err| RemoteError::Decode {
            endpoint: CLASSIFY_ENDPOINT.to_string(),
            message: err.to_string(),
        })
    }

    async fn ping(&self) -> RemoteResult<()> {
        let response = self
            .http
            .get(self.url(PING_ENDPOINT))
            .send()
            .await
            .map_err(|err| transport(PING_ENDPOINT, &err))?;
        check_status(PING_ENDPOINT, response)?;
        Ok(())
    }
}

fn transport(endpoint: &str, err: &reqwest::Error) -> RemoteError {
    RemoteError::Transport {
        endpoint: endpoint.to_string(),
        message: err.to_string(),
    }
}

fn check_status(endpoint: &str, response: reqwest::Response) -> RemoteResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        tracing::warn!(endpoint, status = status.as_u16(), "service returned error status");
        Err(RemoteError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        })
    }
}
