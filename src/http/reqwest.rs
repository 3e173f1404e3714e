use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_core::Stream;
use futures_util::{StreamExt, stream};
use reqwest::{Client, Method};

use crate::error::LLMError;

use super::{
    DynHttpTransport, HttpBodyStream, HttpMethod, HttpRequest, HttpResponse, HttpStreamResponse,
    HttpTransport,
};

/// Default [`HttpTransport`] backed by `reqwest`.
///
/// [`HttpRequest::timeout`] bounds the whole exchange for [`HttpTransport::send`].
/// For [`HttpTransport::send_stream`] it bounds the wait for the response head
/// and then each gap between body chunks, so long generations are not cut off.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Wraps a caller-configured `reqwest::Client`.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a transport with the default client configuration.
    pub fn default_client() -> Result<Self, LLMError> {
        Client::builder()
            .build()
            .map(Self::new)
            .map_err(|err| LLMError::transport(format!("failed to create reqwest client: {err}")))
    }

    fn method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        }
    }

    fn build_request(
        &self,
        mut request: HttpRequest,
    ) -> Result<reqwest::RequestBuilder, LLMError> {
        let method = Self::method(request.method);
        let mut builder = self.client.request(method, &request.url);

        for (name, value) in request.headers.drain() {
            let header_name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| LLMError::transport(format!("invalid header name: {err}")))?;
            let header_value = reqwest::header::HeaderValue::from_str(&value).map_err(|err| {
                LLMError::transport(format!("invalid header value for {header_name}: {err}"))
            })?;
            builder = builder.header(header_name, header_value);
        }

        if let Some(body) = request.body.take() {
            builder = builder.body(body);
        }

        Ok(builder)
    }

    fn headers_to_map(headers: &reqwest::header::HeaderMap) -> HashMap<String, String> {
        headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect()
    }
}

/// Distinguishes elapsed timeouts from other `reqwest` failures.
fn map_reqwest_error(err: reqwest::Error) -> LLMError {
    if err.is_timeout() {
        LLMError::Timeout {
            message: err.to_string(),
        }
    } else {
        LLMError::transport(err.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
        let url = request.url.clone();
        let timeout = request.timeout;
        let mut builder = self.build_request(request)?;
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder.send().await.map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        tracing::debug!(%url, status, "received response");
        let headers = Self::headers_to_map(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(map_reqwest_error)?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
        let url = request.url.clone();
        let timeout = request.timeout;
        let pending = self.build_request(request)?.send();
        let response = match timeout {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| LLMError::Timeout {
                    message: format!("no response from {url} within {limit:?}"),
                })?,
            None => pending.await,
        }
        .map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        tracing::debug!(%url, status, "opened response stream");
        let headers = Self::headers_to_map(response.headers());
        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(map_reqwest_error));
        let body: HttpBodyStream = match timeout {
            Some(limit) => with_idle_timeout(chunks, limit),
            None => Box::pin(chunks),
        };

        Ok(HttpStreamResponse {
            status,
            headers,
            body,
        })
    }
}

/// Ends the body with [`LLMError::Timeout`] once no chunk arrives for `idle`.
fn with_idle_timeout<S>(chunks: S, idle: Duration) -> HttpBodyStream
where
    S: Stream<Item = Result<Vec<u8>, LLMError>> + Send + 'static,
{
    let state = Some(Box::pin(chunks));
    Box::pin(stream::unfold(state, move |state| async move {
        let Some(mut chunks) = state else {
            return None;
        };
        match tokio::time::timeout(idle, chunks.next()).await {
            Ok(Some(item)) => Some((item, Some(chunks))),
            Ok(None) => None,
            Err(_) => {
                let err = LLMError::Timeout {
                    message: format!("no data received for {idle:?}"),
                };
                Some((Err(err), None))
            }
        }
    }))
}

/// Builds a thread-safe handle to the default transport.
pub fn default_dyn_transport() -> Result<DynHttpTransport, LLMError> {
    Ok(Arc::new(ReqwestTransport::default_client()?))
}
