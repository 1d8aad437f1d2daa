use std::borrow::Cow;
use bytes::Bytes;
use regex::bytes::Regex;
use crate::middleware::MiddlewareError;
use super::config::Rewrite;

/// 컴파일된 재작성 규칙
#[derive(Debug, Clone)]
pub struct RewriteRule {
    pattern: Regex,
    replacement: Vec<u8>,
}

impl RewriteRule {
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// 겹치지 않는 모든 일치 구간을 한 번에 치환합니다.
    ///
    /// 치환 문자열의 `$1`, `$name`은 캡처 그룹으로 확장됩니다.
    fn apply(&self, body: Bytes) -> Bytes {
        let replaced = match self.pattern.replace_all(&body, self.replacement.as_slice()) {
            Cow::Borrowed(_) => None,
            Cow::Owned(rewritten) => Some(Bytes::from(rewritten)),
        };
        replaced.unwrap_or(body)
    }
}

/// 순서가 있는 재작성 규칙 목록
///
/// i+1번째 규칙은 i번째 규칙의 결과에 적용됩니다.
#[derive(Debug, Clone, Default)]
pub struct RewriteChain {
    rules: Vec<RewriteRule>,
}

impl RewriteChain {
    /// 모든 정규식을 컴파일합니다. 하나라도 실패하면 해당 규칙을 담은 에러를 반환합니다.
    pub fn new(rewrites: &[Rewrite]) -> Result<Self, MiddlewareError> {
        let rules = rewrites
            .iter()
            .enumerate()
            .map(|(index, rewrite)| {
                let pattern =
                    Regex::new(&rewrite.regex).map_err(|e| MiddlewareError::InvalidPattern {
                        index,
                        pattern: rewrite.regex.clone(),
                        reason: e.to_string(),
                    })?;
                Ok(RewriteRule {
                    pattern,
                    replacement: rewrite.replacement.as_bytes().to_vec(),
                })
            })
            .collect::<Result<Vec<_>, MiddlewareError>>()?;

        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn apply(&self, body: Bytes) -> Bytes {
        self.rules.iter().fold(body, |body, rule| rule.apply(body))
    }
}
