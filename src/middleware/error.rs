/// 미들웨어 에러
#[derive(Debug, thiserror::Error)]
pub enum MiddlewareError {
    /// 재작성 정규식 컴파일 실패 (생성 시점에만 발생)
    #[error("재작성 규칙 #{index} 정규식 오류 `{pattern}`: {reason}")]
    InvalidPattern {
        index: usize,
        pattern: String,
        reason: String,
    },

    /// 업스트림 핸들러 또는 업스트림 응답 본문 처리 실패
    #[error("업스트림 오류: {0}")]
    Upstream(String),

    #[error(transparent)]
    Build(#[from] hyper::http::Error),
}
