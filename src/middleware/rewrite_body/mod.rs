//! 응답 본문 재작성 미들웨어
//!
//! 업스트림 응답이 감시 조건에 맞으면 본문의 압축을 풀고 정규식 치환을 순서대로
//! 적용한 뒤 다시 압축합니다. 헤더(`Content-Length`, `Last-Modified`)도 함께 정리합니다.
//!
//! # 설정 예시 (TOML)
//!
//! ```toml
//! lastModified = false
//!
//! [[rewrites]]
//! regex = "http://internal\\.local"
//! replacement = "https://example.com"
//!
//! [monitoring]
//! types = ["text/html"]
//! methods = ["GET"]
//! ```

mod config;
mod interceptor;
mod middleware;
mod monitoring;
mod rewrite;

pub use config::{Config, MonitoringConfig, Rewrite};
pub use interceptor::{Buffered, InterceptedResponse};
pub use middleware::RewriteBody;
pub use monitoring::{Decision, MonitoringPolicy, RequestMeta, SkipReason};
pub use rewrite::{RewriteChain, RewriteRule};
