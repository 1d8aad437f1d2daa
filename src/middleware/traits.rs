use super::{MiddlewareError, Request, Response};
use async_trait::async_trait;
use std::future::Future;

/// 요청을 받아 응답을 돌려주는 핸들러
///
/// 업스트림 서비스와 미들웨어가 같은 인터페이스를 구현하므로
/// 미들웨어를 다른 미들웨어로 감쌀 수 있습니다.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, req: Request) -> Result<Response, MiddlewareError>;
}

/// 비동기 클로저를 감싼 핸들러
pub struct HandlerFn<F> {
    f: F,
}

/// 비동기 클로저로 [`Handler`]를 만듭니다.
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, MiddlewareError>> + Send,
{
    HandlerFn { f }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, MiddlewareError>> + Send,
{
    async fn call(&self, req: Request) -> Result<Response, MiddlewareError> {
        (self.f)(req).await
    }
}
