use std::sync::Arc;
use async_trait::async_trait;
use bytes::Bytes;
use hyper::header::{self, HeaderMap};
use tracing::{debug, field, info, instrument, warn, Span};
use crate::compression::{CodecError, Encoding};
use crate::middleware::{Handler, MiddlewareError, Request, Response};
use super::config::Config;
use super::interceptor::{Buffered, InterceptedResponse};
use super::monitoring::{Decision, MonitoringPolicy, RequestMeta};
use super::rewrite::{RewriteChain, RewriteRule};

/// 응답 본문 재작성 미들웨어
///
/// 업스트림 응답 전체를 버퍼링한 뒤, 감시 정책을 통과하면 압축을 풀고
/// 재작성 규칙을 순서대로 적용한 다음 같은 알고리즘으로 다시 압축합니다.
/// 처리할 수 없는 응답은 받은 그대로 전달합니다.
pub struct RewriteBody {
    name: String,
    next: Arc<dyn Handler>,
    rewrites: RewriteChain,
    policy: MonitoringPolicy,
    last_modified: bool,
    max_body_size: Option<usize>,
}

impl RewriteBody {
    /// 설정을 검증하고 미들웨어를 만듭니다. 정규식이 하나라도 잘못되면 실패합니다.
    pub fn new(
        next: Arc<dyn Handler>,
        config: &Config,
        name: impl Into<String>,
    ) -> Result<Self, MiddlewareError> {
        let name = name.into();
        let rewrites = RewriteChain::new(&config.rewrites)?;
        let policy = config.monitoring.clone().finalize();

        let patterns: Vec<&str> = rewrites.rules().iter().map(RewriteRule::pattern).collect();
        info!(
            middleware = %name,
            rules = rewrites.len(),
            patterns = ?patterns,
            types = ?policy.types(),
            methods = ?policy.methods(),
            last_modified = config.last_modified,
            "응답 본문 재작성 미들웨어 생성"
        );

        Ok(Self {
            name,
            next,
            rewrites,
            policy,
            last_modified: config.last_modified,
            max_body_size: config.max_body_size,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &MonitoringPolicy {
        &self.policy
    }

    /// 디코딩 → 재작성 → 같은 알고리즘으로 재인코딩
    fn transform(&self, encoding: Encoding, body: Bytes) -> Result<Bytes, CodecError> {
        let decoded = encoding.decode(body)?;
        let rewritten = self.rewrites.apply(decoded);
        encoding.encode(rewritten)
    }

    fn finalize_headers(&self, headers: &mut HeaderMap) {
        // 본문 길이가 바뀌었으므로 전송 계층이 다시 계산하도록 제거
        headers.remove(header::CONTENT_LENGTH);

        if !self.last_modified {
            headers.remove(header::LAST_MODIFIED);
        }
    }
}

#[async_trait]
impl Handler for RewriteBody {
    #[instrument(
        skip(self, req),
        fields(middleware = field::Empty, method = %req.method(), path = %req.uri().path())
    )]
    async fn call(&self, req: Request) -> Result<Response, MiddlewareError> {
        Span::current().record("middleware", self.name.as_str());
        let meta = RequestMeta::from_request(&req);
        let res = self.next.call(req).await?;

        let captured = match InterceptedResponse::capture(res, self.max_body_size).await? {
            Buffered::Complete(captured) => captured,
            Buffered::Overflow(res) => {
                debug!(limit = ?self.max_body_size, "본문 크기 제한 초과, 재작성 생략");
                return Ok(res);
            }
        };

        let encoding = match self.policy.evaluate(&meta, captured.headers()) {
            Decision::Intercept(encoding) => encoding,
            Decision::Skip(reason) => {
                debug!(%reason, status = %captured.status(), "재작성 대상 아님");
                return Ok(captured.into_response());
            }
        };

        match self.transform(encoding, captured.body().clone()) {
            Ok(body) => {
                debug!(%encoding, bytes = body.len(), "응답 본문 재작성 완료");
                Ok(captured.respond_with(body, |headers| self.finalize_headers(headers)))
            }
            Err(e) => {
                warn!(error = %e, %encoding, "본문 변환 실패, 원본 그대로 전달");
                Ok(captured.into_response())
            }
        }
    }
}
