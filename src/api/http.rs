//! reqwest-backed [`RemoteApi`].

use super::types::*;
use super::RemoteApi;
use crate::config::DumpHubConfig;
use crate::error::{DumpHubError, Result, UNKNOWN_ERROR};
use crate::logging::log_warn;
use async_trait::async_trait;
use base64::Engine;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// Per-request timeout; chunk bodies are large, so this is generous
const REQUEST_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpApi {
    pub fn new(base_url: Url) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &DumpHubConfig) -> Result<Self> {
        Self::new(config.api_base_url()?)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.endpoint(path)?)
            .json(body)
            .send()
            .await?;
        check_status(response).await
    }

    async fn post_for<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        Ok(self.post_json(path, body).await?.json::<T>().await?)
    }
}

/// Turn a non-2xx response into an `Api` error carrying the body text
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);

    log_warn("api", &format!("{} {}: {}", status.as_u16(), url.path(), message))
        .unwrap_or_default();
    Err(DumpHubError::Api(message))
}

/// Text shown to the user for a failed request: the server's body as sent
fn error_message(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        UNKNOWN_ERROR.to_string()
    } else {
        body.to_string()
    }
}

/// Remote file id: standard base64 of the file name
pub fn encode_file_id(filename: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(filename.as_bytes())
}

#[async_trait]
impl RemoteApi for HttpApi {
    async fn upload_chunk(&self, chunk: ChunkUpload) -> Result<()> {
        let file_part = Part::bytes(chunk.bytes).file_name(chunk.filename.clone());
        let form = Form::new()
            .text("uuid", chunk.upload_id)
            .text("filename", chunk.filename)
            .text("offset", chunk.offset.to_string())
            .text("size", chunk.total_size.to_string())
            .part("file", file_part);

        let response = self
            .client
            .post(self.endpoint("upload")?)
            .multipart(form)
            .send()
            .await
            .map_err(|e| DumpHubError::ChunkUpload(e.to_string()))?;

        match check_status(response).await {
            Ok(_) => Ok(()),
            Err(DumpHubError::Api(message)) => Err(DumpHubError::ChunkUpload(message)),
            Err(other) => Err(other),
        }
    }

    async fn list_files(&self) -> Result<FilesResult> {
        let response = self.client.get(self.endpoint("files")?).send().await?;
        Ok(check_status(response).await?.json::<FilesResult>().await?)
    }

    async fn get_preview(&self, filename: &str, start_line: usize) -> Result<PreviewResult> {
        let request = PreviewRequest {
            filename: filename.to_string(),
            start: start_line,
        };
        self.post_for("preview", &request).await
    }

    async fn delete_file(&self, filename: &str) -> Result<()> {
        let url = self.endpoint(&format!("files/{}", encode_file_id(filename)))?;
        let response = self.client.delete(url).send().await?;
        check_status(response).await.map(|_| ())
    }

    async fn analyze(&self, request: &AnalyzeRequest) -> Result<()> {
        self.post_json("analyze", request).await.map(|_| ())
    }

    async fn search(&self, query: &str, page: u32) -> Result<SearchResult> {
        let request = SearchRequest {
            query: query.to_string(),
            page,
        };
        self.post_for("search", &request).await
    }

    async fn get_status(&self, page: u32) -> Result<StatusResult> {
        self.post_for("history", &StatusRequest { page }).await
    }

    async fn delete(&self, checksum: &str) -> Result<()> {
        let request = DeleteRequest {
            checksum: checksum.to_string(),
        };
        self.post_json("delete", &request).await.map(|_| ())
    }
}
