use std::fmt;
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::Method;
use crate::compression::Encoding;
use super::config::MonitoringConfig;

/// 기본값이 채워진 불변 감시 정책
///
/// 미들웨어 생성 시 한 번 만들어지고 모든 요청이 읽기 전용으로 공유합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoringPolicy {
    types: Vec<String>,
    methods: Vec<String>,
    check_mime_accept: bool,
    check_mime_content_type: bool,
    check_accept_encoding: bool,
    check_content_encoding: bool,
}

/// 정책 판단에 필요한 요청 정보
///
/// 요청은 업스트림으로 넘어가므로 필요한 값만 미리 떼어 둡니다.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub method: Method,
    pub accept: Option<HeaderValue>,
    pub accept_encoding: Option<HeaderValue>,
}

impl RequestMeta {
    pub fn from_request<B>(req: &hyper::Request<B>) -> Self {
        Self {
            method: req.method().clone(),
            accept: req.headers().get(header::ACCEPT).cloned(),
            accept_encoding: req.headers().get(header::ACCEPT_ENCODING).cloned(),
        }
    }
}

/// 재작성 여부 판단 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// 주어진 알고리즘으로 디코딩 후 재작성
    Intercept(Encoding),
    Skip(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Method,
    ContentType,
    Accept,
    AcceptEncoding,
    /// 알 수 없는 Content-Encoding
    UnknownEncoding,
    /// 인식은 되지만 디코딩할 수 없는 Content-Encoding
    UndecodableEncoding(Encoding),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Method => write!(f, "감시 대상 메서드 아님"),
            Self::ContentType => write!(f, "Content-Type 불일치"),
            Self::Accept => write!(f, "Accept 불일치"),
            Self::AcceptEncoding => write!(f, "클라이언트가 응답 인코딩을 허용하지 않음"),
            Self::UnknownEncoding => write!(f, "알 수 없는 Content-Encoding"),
            Self::UndecodableEncoding(encoding) => write!(f, "{} 디코딩 미지원", encoding),
        }
    }
}

impl MonitoringConfig {
    /// 형식 보정과 기본값 적용을 거쳐 불변 정책을 만듭니다.
    pub fn finalize(mut self) -> MonitoringPolicy {
        self.ensure_proper_format();
        self.ensure_defaults();

        MonitoringPolicy {
            types: self.types.iter().map(|t| t.to_ascii_lowercase()).collect(),
            methods: self.methods,
            check_mime_accept: self.check_mime_accept,
            check_mime_content_type: self.check_mime_content_type,
            check_accept_encoding: self.check_accept_encoding,
            check_content_encoding: self.check_content_encoding,
        }
    }
}

impl Default for MonitoringPolicy {
    fn default() -> Self {
        MonitoringConfig::default().finalize()
    }
}

impl MonitoringPolicy {
    pub fn types(&self) -> &[String] {
        &self.types
    }

    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    /// 요청/응답 메타데이터로 재작성 여부를 판단합니다.
    ///
    /// 활성화된 검사를 모두 통과해야 하며, 디코딩할 수 없는 인코딩은
    /// 검사 설정과 무관하게 항상 제외됩니다.
    pub fn evaluate(&self, req: &RequestMeta, response_headers: &HeaderMap) -> Decision {
        if !self.methods.iter().any(|m| m == req.method.as_str()) {
            return Decision::Skip(SkipReason::Method);
        }

        let Some(encoding) = content_encoding(response_headers) else {
            return Decision::Skip(SkipReason::UnknownEncoding);
        };

        if self.check_mime_content_type
            && !self.matches_type(header_str(response_headers.get(header::CONTENT_TYPE)))
        {
            return Decision::Skip(SkipReason::ContentType);
        }

        if self.check_mime_accept && !self.matches_type(header_str(req.accept.as_ref())) {
            return Decision::Skip(SkipReason::Accept);
        }

        if self.check_accept_encoding
            && !accepts_encoding(req.accept_encoding.as_ref(), encoding)
        {
            return Decision::Skip(SkipReason::AcceptEncoding);
        }

        if self.check_content_encoding && !encoding.can_decode() {
            return Decision::Skip(SkipReason::UndecodableEncoding(encoding));
        }

        Decision::Intercept(encoding)
    }

    /// 설정된 타입 중 하나라도 부분 문자열로 포함되는지 (대소문자 무시)
    fn matches_type(&self, value: Option<&str>) -> bool {
        let Some(value) = value else {
            return false;
        };
        let value = value.to_ascii_lowercase();
        self.types.iter().any(|t| value.contains(t.as_str()))
    }
}

fn header_str(value: Option<&HeaderValue>) -> Option<&str> {
    value.and_then(|v| v.to_str().ok())
}

/// 응답의 Content-Encoding을 해석합니다. 헤더가 없으면 identity.
fn content_encoding(headers: &HeaderMap) -> Option<Encoding> {
    let mut values = headers.get_all(header::CONTENT_ENCODING).iter();
    let encoding = match values.next() {
        None => Encoding::Identity,
        Some(value) => Encoding::parse(value.to_str().ok()?)?,
    };

    // 인코딩이 여러 번 적용된 응답은 다루지 않음
    if values.next().is_some() {
        return None;
    }
    Some(encoding)
}

/// 클라이언트가 응답 인코딩을 받을 수 있는지 확인합니다.
///
/// identity 응답이거나 Accept-Encoding 헤더가 없으면 허용으로 봅니다.
fn accepts_encoding(accept_encoding: Option<&HeaderValue>, encoding: Encoding) -> bool {
    if encoding == Encoding::Identity {
        return true;
    }

    let Some(value) = header_str(accept_encoding) else {
        return accept_encoding.is_none();
    };
    if value.trim().is_empty() {
        return true;
    }

    value.split(',').any(|item| {
        let mut parts = item.split(';');
        let coding = parts.next().unwrap_or("").trim();
        let matches = coding == "*" || Encoding::parse(coding) == Some(encoding);
        matches && quality(parts) > 0.0
    })
}

fn quality<'a>(params: impl Iterator<Item = &'a str>) -> f32 {
    for param in params {
        if let Some((key, value)) = param.split_once('=') {
            if key.trim().eq_ignore_ascii_case("q") {
                return value.trim().parse().unwrap_or(0.0);
            }
        }
    }
    1.0
}
