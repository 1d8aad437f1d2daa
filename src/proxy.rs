use std::net::SocketAddr;
use async_trait::async_trait;
use http_body_util::BodyExt;
use hyper::Uri;
use hyper_util::client::legacy;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, error};
use crate::middleware::{Body, BoxError, Handler, MiddlewareError, Request, Response};

/// 고정된 업스트림 하나로 요청을 전달하는 핸들러
///
/// 응답 본문은 스트리밍 그대로 돌려주며 버퍼링은 바깥 미들웨어가 맡습니다.
#[derive(Clone)]
pub struct ProxyUpstream {
    client: legacy::Client<HttpConnector, Body>,
    address: SocketAddr,
}

impl ProxyUpstream {
    pub fn new(address: SocketAddr) -> Self {
        let connector = HttpConnector::new();
        let client = legacy::Client::builder(TokioExecutor::new())
            .build::<_, Body>(connector);

        Self { client, address }
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }
}

#[async_trait]
impl Handler for ProxyUpstream {
    async fn call(&self, req: Request) -> Result<Response, MiddlewareError> {
        let proxied_req = build_proxied_request(self.address, req)?;
        debug!(upstream = %self.address, uri = %proxied_req.uri(), "Proxying request to upstream");

        let res = self.client.request(proxied_req).await.map_err(|e| {
            error!(upstream = %self.address, error = %e, "Upstream request failed");
            MiddlewareError::Upstream(e.to_string())
        })?;

        Ok(res.map(|body| body.map_err(|e| Box::new(e) as BoxError).boxed()))
    }
}

fn build_proxied_request(address: SocketAddr, req: Request) -> Result<Request, MiddlewareError> {
    let path_and_query = req.uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let uri: Uri = format!("http://{}{}", address, path_and_query)
        .parse()
        .map_err(hyper::http::Error::from)?;

    let (mut parts, body) = req.into_parts();
    parts.uri = uri;
    Ok(Request::from_parts(parts, body))
}
