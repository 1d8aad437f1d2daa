use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, StreamExt};
use http_body_util::{BodyExt, BodyStream, StreamBody};
use hyper::body::Frame;
use hyper::header::HeaderMap;
use hyper::http::response::Parts;
use crate::middleware::{full, Body, BoxError, MiddlewareError, Response};

/// 업스트림이 만든 응답을 요청 하나 동안 붙잡아 두는 상태
///
/// 상태 코드와 헤더, 그리고 업스트림이 보낸 그대로의 (압축되었을 수 있는) 본문을 담습니다.
#[derive(Debug)]
pub struct InterceptedResponse {
    parts: Parts,
    body: Bytes,
    trailers: Option<HeaderMap>,
}

/// 버퍼링 결과
pub enum Buffered {
    Complete(InterceptedResponse),
    /// 크기 제한을 넘어 버퍼링을 멈춘 응답. 받은 부분과 나머지를 이어서 그대로 전달합니다.
    Overflow(Response),
}

impl InterceptedResponse {
    /// 업스트림 응답 본문을 끝까지 읽어 메모리에 쌓습니다.
    ///
    /// 본문 스트림에서 에러가 나면 일부만 받은 본문은 버리고 에러를 반환합니다.
    pub async fn capture(res: Response, limit: Option<usize>) -> Result<Buffered, MiddlewareError> {
        let (parts, mut body) = res.into_parts();
        let mut buffer = BytesMut::new();
        let mut trailers: Option<HeaderMap> = None;

        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(|e| MiddlewareError::Upstream(e.to_string()))?;
            match frame.into_data() {
                Ok(data) => {
                    buffer.extend_from_slice(&data);
                    if limit.is_some_and(|max| buffer.len() > max) {
                        let prefix = Frame::data(buffer.freeze());
                        let prefix = stream::iter([Ok::<_, BoxError>(prefix)]);
                        let rest = prefix.chain(BodyStream::new(body));
                        return Ok(Buffered::Overflow(Response::from_parts(
                            parts,
                            Body::new(StreamBody::new(rest)),
                        )));
                    }
                }
                Err(frame) => {
                    if let Ok(t) = frame.into_trailers() {
                        trailers.get_or_insert_with(HeaderMap::new).extend(t);
                    }
                }
            }
        }

        Ok(Buffered::Complete(Self {
            parts,
            body: buffer.freeze(),
            trailers,
        }))
    }

    pub fn status(&self) -> hyper::StatusCode {
        self.parts.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// 헤더를 수정하고 본문을 교체한 응답을 만듭니다.
    pub fn respond_with(self, body: Bytes, edit_headers: impl FnOnce(&mut HeaderMap)) -> Response {
        let mut parts = self.parts;
        edit_headers(&mut parts.headers);
        Response::from_parts(parts, body_with_trailers(body, self.trailers))
    }

    /// 받은 상태, 헤더, 본문을 그대로 돌려줍니다.
    pub fn into_response(self) -> Response {
        Response::from_parts(self.parts, body_with_trailers(self.body, self.trailers))
    }
}

fn body_with_trailers(data: Bytes, trailers: Option<HeaderMap>) -> Body {
    match trailers {
        None => full(data),
        Some(trailers) => {
            let frames = [
                Ok::<_, BoxError>(Frame::data(data)),
                Ok(Frame::trailers(trailers)),
            ];
            Body::new(StreamBody::new(stream::iter(frames)))
        }
    }
}
