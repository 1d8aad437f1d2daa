//! HTTP 미들웨어
//!
//! 요청/응답 타입과 [`Handler`] 트레이트, 그리고 응답 본문 재작성 미들웨어를 제공합니다.

pub mod error;
pub mod rewrite_body;
pub mod traits;

pub use error::MiddlewareError;
pub use rewrite_body::RewriteBody;
pub use traits::{handler_fn, Handler, HandlerFn};

use bytes::Bytes;
use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 미들웨어 사이를 오가는 본문 타입
pub type Body = BoxBody<Bytes, BoxError>;
pub type Request = hyper::Request<Body>;
pub type Response = hyper::Response<Body>;

/// 메모리에 있는 바이트로 본문을 만듭니다.
pub fn full<T: Into<Bytes>>(chunk: T) -> Body {
    Full::new(chunk.into()).map_err(|never| match never {}).boxed()
}

pub fn empty() -> Body {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed()
}
