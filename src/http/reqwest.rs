use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response};

use crate::error::TransportError;

use super::{
    DynHttpTransport, HttpBodyStream, HttpMethod, HttpRequest, HttpResponse, HttpStreamResponse,
    HttpTransport,
};

/// 基于 reqwest 的默认 HttpTransport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// 使用自定义 reqwest::Client 例如配置代理或根证书
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// 默认配置
    pub fn default_client() -> Result<Self, TransportError> {
        Self::with_connect_timeout(None)
    }

    /// 仅限制建立连接的时间 不影响长时间的流式响应
    pub fn with_connect_timeout(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.connect_timeout(timeout);
        }
        builder
            .build()
            .map(Self::new)
            .map_err(|err| TransportError::network(format!("failed to build HTTP client: {err}")))
    }

    fn prepare(&self, request: HttpRequest) -> Result<RequestBuilder, TransportError> {
        let method = match request.method {
            HttpMethod::Post => Method::POST,
        };
        let mut builder = self
            .client
            .request(method, &request.url)
            .headers(to_header_map(request.headers)?);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        Ok(builder)
    }

    async fn execute(&self, request: HttpRequest) -> Result<Response, TransportError> {
        self.prepare(request)?
            .send()
            .await
            .map_err(network_error)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = self.execute(request).await?;
        let status = response.status().as_u16();
        let headers = from_header_map(response.headers());
        let body = response.bytes().await.map_err(network_error)?.to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn send_stream(
        &self,
        request: HttpRequest,
    ) -> Result<HttpStreamResponse, TransportError> {
        let response = self.execute(request).await?;
        let status = response.status().as_u16();
        let headers = from_header_map(response.headers());
        let body: HttpBodyStream = Box::pin(
            response
                .bytes_stream()
                .map_ok(|bytes| bytes.to_vec())
                .map_err(network_error),
        );
        Ok(HttpStreamResponse {
            status,
            headers,
            body,
        })
    }
}

fn to_header_map(headers: HashMap<String, String>) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| TransportError::network(format!("invalid header name `{name}`: {err}")))?;
        let value = HeaderValue::from_str(&value)
            .map_err(|err| TransportError::network(format!("invalid value for header {name}: {err}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// 非 UTF-8 的响应头直接丢弃
fn from_header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

fn network_error(err: reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        "request timed out"
    } else if err.is_connect() {
        "connection failed"
    } else if err.is_body() || err.is_decode() {
        "failed to read response body"
    } else {
        "request failed"
    };
    TransportError::network(format!("{kind}: {err}"))
}

/// 便捷构造线程安全 Transport
pub fn default_dyn_transport() -> Result<DynHttpTransport, TransportError> {
    Ok(Arc::new(ReqwestTransport::default_client()?))
}
