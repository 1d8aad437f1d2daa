//! 업스트림 응답 본문을 정규식으로 재작성하는 HTTP 미들웨어입니다.
//!
//! # 주요 기능
//!
//! - Content-Type, 메서드, 인코딩 기반 감시 정책
//! - gzip / deflate 응답의 압축 해제 후 재작성, 같은 알고리즘으로 재압축
//! - 처리할 수 없는 응답은 받은 그대로 전달
//!
//! # 예제
//!
//! ```
//! use std::sync::Arc;
//! use rewrite_body::middleware::{full, handler_fn, MiddlewareError, Request};
//! use rewrite_body::middleware::rewrite_body::Rewrite;
//!
//! let upstream = Arc::new(handler_fn(|_req: Request| async {
//!     let res = hyper::Response::builder()
//!         .header("content-type", "text/html")
//!         .body(full("foo is the new bar"))?;
//!     Ok::<_, MiddlewareError>(res)
//! }));
//!
//! let mut config = rewrite_body::create_config();
//! config.rewrites.push(Rewrite::new("foo", "bar"));
//!
//! let middleware = rewrite_body::new(upstream, &config, "rewriteBody").unwrap();
//! assert_eq!(middleware.name(), "rewriteBody");
//! ```

pub mod compression;
pub mod logging;
pub mod middleware;
pub mod proxy;
pub mod server;
pub mod settings;

use std::sync::Arc;
use middleware::rewrite_body::{Config, RewriteBody};
use middleware::{Handler, MiddlewareError};

/// 기본값으로 채운 미들웨어 설정을 만듭니다.
pub fn create_config() -> Config {
    Config::default()
}

/// `next`를 감싸는 응답 본문 재작성 미들웨어를 만듭니다.
pub fn new(
    next: Arc<dyn Handler>,
    config: &Config,
    name: &str,
) -> Result<RewriteBody, MiddlewareError> {
    RewriteBody::new(next, config, name)
}
