#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use serde_json::Value;
use unichat::TransportError;
use unichat::http::{
    DynHttpTransport, HttpBodyStream, HttpRequest, HttpResponse, HttpStreamResponse,
    HttpTransport,
};

/// 预置的响应
#[derive(Debug, Clone)]
pub enum Reply {
    /// 一次性返回完整 body
    Body {
        status: u16,
        headers: HashMap<String, String>,
        body: String,
    },
    /// 按给定分片返回 body 分片边界不必与行边界对齐
    Chunks {
        status: u16,
        chunks: Vec<String>,
        /// 发完分片后保持挂起 模拟停滞的连接
        hang: bool,
    },
    /// 永不返回
    Pending,
    /// 连接失败
    Network(String),
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Reply::Body {
            status,
            headers: HashMap::new(),
            body: body.to_string(),
        }
    }

    pub fn ndjson(lines: &[Value]) -> Self {
        Reply::Chunks {
            status: 200,
            chunks: lines.iter().map(|line| format!("{line}\n")).collect(),
            hang: false,
        }
    }

    pub fn chunks(chunks: &[&str]) -> Self {
        Reply::Chunks {
            status: 200,
            chunks: chunks.iter().map(|chunk| chunk.to_string()).collect(),
            hang: false,
        }
    }

    pub fn with_header(self, name: &str, value: &str) -> Self {
        match self {
            Reply::Body {
                status,
                mut headers,
                body,
            } => {
                headers.insert(name.to_string(), value.to_string());
                Reply::Body {
                    status,
                    headers,
                    body,
                }
            }
            other => other,
        }
    }

    pub fn then_hang(self) -> Self {
        match self {
            Reply::Chunks { status, chunks, .. } => Reply::Chunks {
                status,
                chunks,
                hang: true,
            },
            other => other,
        }
    }
}

/// 按 URL 后缀返回预置响应 并记录所有请求
#[derive(Default)]
pub struct MockTransport {
    routes: Vec<(String, Reply)>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url_suffix: &str, reply: Reply) -> Self {
        self.routes.push((url_suffix.to_string(), reply));
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("lock").clone()
    }

    /// 第 `index` 个请求的 JSON body
    pub fn request_json(&self, index: usize) -> Value {
        let requests = self.requests();
        let body = requests
            .get(index)
            .and_then(|request| request.body.as_ref())
            .expect("recorded request body");
        serde_json::from_slice(body).expect("request body is JSON")
    }

    fn reply_for(&self, request: &HttpRequest) -> Reply {
        self.requests.lock().expect("lock").push(request.clone());
        self.routes
            .iter()
            .find(|(suffix, _)| request.url.ends_with(suffix.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| panic!("no mock route for {}", request.url))
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        match self.reply_for(&request) {
            Reply::Body {
                status,
                headers,
                body,
            } => Ok(HttpResponse {
                status,
                headers,
                body: body.into_bytes(),
            }),
            Reply::Chunks { status, chunks, .. } => Ok(HttpResponse {
                status,
                headers: HashMap::new(),
                body: chunks.concat().into_bytes(),
            }),
            Reply::Pending => std::future::pending().await,
            Reply::Network(message) => Err(TransportError::network(message)),
        }
    }

    async fn send_stream(
        &self,
        request: HttpRequest,
    ) -> Result<HttpStreamResponse, TransportError> {
        let (status, headers, chunks, hang) = match self.reply_for(&request) {
            Reply::Body {
                status,
                headers,
                body,
            } => (status, headers, vec![body], false),
            Reply::Chunks {
                status,
                chunks,
                hang,
            } => (status, HashMap::new(), chunks, hang),
            Reply::Pending => std::future::pending().await,
            Reply::Network(message) => return Err(TransportError::network(message)),
        };

        let items = stream::iter(
            chunks
                .into_iter()
                .map(|chunk| Ok::<_, TransportError>(chunk.into_bytes())),
        );
        let body: HttpBodyStream = if hang {
            Box::pin(items.chain(stream::pending()))
        } else {
            Box::pin(items)
        };
        Ok(HttpStreamResponse {
            status,
            headers,
            body,
        })
    }
}

/// 任何调用都视为测试失败
pub struct PanicTransport;

#[async_trait]
impl HttpTransport for PanicTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        panic!("unexpected transport call to {}", request.url)
    }

    async fn send_stream(
        &self,
        request: HttpRequest,
    ) -> Result<HttpStreamResponse, TransportError> {
        panic!("unexpected transport call to {}", request.url)
    }
}

pub fn panic_transport() -> DynHttpTransport {
    Arc::new(PanicTransport)
}
