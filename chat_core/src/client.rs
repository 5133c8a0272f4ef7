use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use reqwest::{multipart, Client, RequestBuilder, Response};
use tracing::{debug, info};
use uuid::Uuid;

use crate::attachment::ImageAttachment;
use crate::error::{ChatError, Result};
use crate::protocol::{ChatRequest, PingResponse};

/// Header carrying a per-request id for backend log correlation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for the chat backend.
#[derive(Debug, Clone)]
pub struct ChatClient {
    base_url: String,
    http: Client,
}

impl ChatClient {
    /// Create a client for `base_url` (e.g. `http://localhost:8000`).
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_connect_timeout(base_url, DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn with_connect_timeout(base_url: &str, connect_timeout: Duration) -> Result<Self> {
        // No overall timeout: a streamed reply may legitimately take minutes.
        let http = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn tagged(builder: RequestBuilder) -> RequestBuilder {
        builder.header(REQUEST_ID_HEADER, Uuid::new_v4().to_string())
    }

    /// `GET /ping`
    pub async fn ping(&self) -> Result<PingResponse> {
        let response = Self::tagged(self.http.get(self.url("/ping")))
            .timeout(PING_TIMEOUT)
            .send()
            .await?;
        let response = check_status(response)?;
        Ok(response.json::<PingResponse>().await?)
    }

    /// Start a chat exchange and return the raw streamed body.
    ///
    /// With an image the request goes to `/chat/image` as multipart form
    /// data, otherwise to `/chat` as JSON. A non-success status is an error;
    /// the body is not read in that case.
    pub async fn open_chat(
        &self,
        session_id: &str,
        message: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<impl Stream<Item = reqwest::Result<Bytes>>> {
        let request = match image {
            Some(image) => {
                let part = multipart::Part::bytes(image.bytes.to_vec())
                    .file_name(image.file_name.clone())
                    .mime_str(image.mime_type)?;
                let form = multipart::Form::new()
                    .text("message", message.to_string())
                    .text("session_id", session_id.to_string())
                    .part("image", part);
                debug!("POST /chat/image ({} image bytes)", image.len());
                self.http.post(self.url("/chat/image")).multipart(form)
            }
            None => {
                debug!("POST /chat");
                self.http.post(self.url("/chat")).json(&ChatRequest {
                    message: message.to_string(),
                    session_id: session_id.to_string(),
                })
            }
        };

        let response = Self::tagged(request).send().await?;
        let response = check_status(response)?;
        Ok(response.bytes_stream())
    }

    /// `DELETE /chat/clear?session_id=<id>`
    pub async fn clear_session(&self, session_id: &str) -> Result<()> {
        let response = Self::tagged(self.http.delete(self.url("/chat/clear")))
            .query(&[("session_id", session_id)])
            .send()
            .await?;
        check_status(response)?;
        info!("Cleared server-side history for session {session_id}");
        Ok(())
    }
}

fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ChatError::Status(status.as_u16()))
    }
}
