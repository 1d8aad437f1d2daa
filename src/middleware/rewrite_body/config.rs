use serde::{Deserialize, Serialize};

/// 재작성 규칙 하나 (정규식과 치환 문자열)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rewrite {
    pub regex: String,
    pub replacement: String,
}

impl Rewrite {
    pub fn new(regex: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            regex: regex.into(),
            replacement: replacement.into(),
        }
    }
}

/// 감시 대상 응답을 고르는 설정
///
/// 역직렬화된 그대로의 값이며, 요청 처리에는 [`MonitoringConfig::finalize`]로
/// 기본값을 채운 [`MonitoringPolicy`](super::MonitoringPolicy)를 사용합니다.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringConfig {
    /// Content-Type / Accept 에 포함되어야 하는 문자열 목록
    #[serde(default)]
    pub types: Vec<String>,

    /// 감시할 HTTP 메서드 목록
    #[serde(default)]
    pub methods: Vec<String>,

    #[serde(default)]
    pub check_mime_accept: bool,

    #[serde(default = "default_true")]
    pub check_mime_content_type: bool,

    #[serde(default = "default_true")]
    pub check_accept_encoding: bool,

    #[serde(default = "default_true")]
    pub check_content_encoding: bool,
}

/// 일부 YAML 제공자가 목록을 한 문자열로 합쳐 보낼 때 붙는 접두어
const PACKED_LIST_PREFIX: &str = "║24║";
const PACKED_LIST_SEPARATOR: char = '║';

pub(super) const DEFAULT_TYPE: &str = "text/html";
pub(super) const DEFAULT_METHOD: &str = "GET";

fn default_true() -> bool {
    true
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            types: Vec::new(),
            methods: Vec::new(),
            check_mime_accept: false,
            check_mime_content_type: true,
            check_accept_encoding: true,
            check_content_encoding: true,
        }
    }
}

impl MonitoringConfig {
    /// 비어 있는 `types`/`methods`에 기본값을 채웁니다.
    pub fn ensure_defaults(&mut self) {
        if self.methods.is_empty() {
            self.methods = vec![DEFAULT_METHOD.to_string()];
        }

        if self.types.is_empty() {
            self.types = vec![DEFAULT_TYPE.to_string()];
        }
    }

    /// `"║24║a║b"` 형태로 뭉쳐진 목록을 `["a", "b"]`로 풀어냅니다.
    pub fn ensure_proper_format(&mut self) {
        unpack_list(&mut self.methods);
        unpack_list(&mut self.types);
    }
}

fn unpack_list(values: &mut Vec<String>) {
    if values.len() != 1 || !values[0].starts_with(PACKED_LIST_PREFIX) {
        return;
    }

    let packed = values[0].replace(PACKED_LIST_PREFIX, "");
    *values = packed
        .split(PACKED_LIST_SEPARATOR)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
}

/// 응답 본문 재작성 미들웨어 설정
///
/// 플러그인 설정의 `logLevel` 필드는 읽지 않고 무시합니다. 로그 레벨은 `[logging]` 설정이나
/// `REWRITE_LOG_LEVEL`로 지정합니다.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// 재작성 후에도 Last-Modified 헤더를 유지할지 여부
    #[serde(default)]
    pub last_modified: bool,

    /// 순서대로 적용할 재작성 규칙
    #[serde(default)]
    pub rewrites: Vec<Rewrite>,

    #[serde(default)]
    pub monitoring: MonitoringConfig,

    /// 버퍼링할 최대 본문 크기 (바이트). 넘으면 재작성 없이 그대로 전달합니다.
    #[serde(default)]
    pub max_body_size: Option<usize>,
}

impl Config {
    pub fn from_toml(config: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(config)
    }

    pub fn from_json(config: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(config)
    }
}
