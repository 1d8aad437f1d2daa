use std::io::Read;
use std::sync::Arc;
use bytes::Bytes;
use flate2::read::{GzDecoder, ZlibDecoder};
use futures_util::stream;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::Frame;
use hyper::{header, Method, StatusCode};
use rewrite_body::compression::Encoding;
use rewrite_body::middleware::rewrite_body::{Config, MonitoringConfig, Rewrite, RewriteBody};
use rewrite_body::middleware::{
    empty, full, handler_fn, Body, BoxError, Handler, MiddlewareError, Request, Response,
};

const LAST_MODIFIED: &str = "Thu, 02 Jun 2016 06:01:08 GMT";

struct Upstream {
    content_encoding: &'static str,
    content_type: &'static str,
    body: Bytes,
}

impl Upstream {
    fn new(
        content_encoding: &'static str,
        content_type: &'static str,
        body: impl Into<Bytes>,
    ) -> Self {
        Self {
            content_encoding,
            content_type,
            body: body.into(),
        }
    }

    fn into_handler(self) -> Arc<dyn Handler> {
        let Upstream { content_encoding, content_type, body } = self;
        Arc::new(handler_fn(move |_req: Request| {
            let body = body.clone();
            async move {
                let res = hyper::Response::builder()
                    .status(StatusCode::OK)
                    .header(header::CONTENT_ENCODING, content_encoding)
                    .header(header::CONTENT_TYPE, content_type)
                    .header(header::LAST_MODIFIED, LAST_MODIFIED)
                    .header(header::CONTENT_LENGTH, body.len())
                    .body(full(body))?;
                Ok::<_, MiddlewareError>(res)
            }
        }))
    }
}

fn config(rewrites: &[(&str, &str)], last_modified: bool) -> Config {
    Config {
        last_modified,
        rewrites: rewrites.iter().map(|(r, s)| Rewrite::new(*r, *s)).collect(),
        ..Default::default()
    }
}

/// 기본 감시 설정으로 `next`를 감싼 미들웨어
fn rewriter(next: Arc<dyn Handler>, rewrites: &[(&str, &str)]) -> RewriteBody {
    RewriteBody::new(next, &config(rewrites, false), "rewriteBody").unwrap()
}

fn get() -> Request {
    hyper::Request::builder()
        .method(Method::GET)
        .uri("/")
        .header(header::ACCEPT, "text/html")
        .body(empty())
        .unwrap()
}

fn compress(value: &str, encoding: Encoding) -> Bytes {
    encoding.encode(Bytes::copy_from_slice(value.as_bytes())).unwrap()
}

async fn call(middleware: &RewriteBody, req: Request) -> (hyper::http::response::Parts, Bytes) {
    let res = middleware.call(req).await.unwrap();
    let (parts, body) = res.into_parts();
    (parts, body.collect().await.unwrap().to_bytes())
}

struct Case {
    desc: &'static str,
    content_encoding: &'static str,
    content_type: &'static str,
    rewrites: &'static [(&'static str, &'static str)],
    last_modified: bool,
    res_body: Bytes,
    exp_res_body: Bytes,
    intercepted: bool,
}

#[tokio::test]
async fn test_serve_http() {
    let cases = vec![
        Case {
            desc: "should replace foo by bar",
            content_encoding: "",
            content_type: "text/html",
            rewrites: &[("foo", "bar")],
            last_modified: false,
            res_body: Bytes::from("foo is the new bar"),
            exp_res_body: Bytes::from("bar is the new bar"),
            intercepted: true,
        },
        Case {
            desc: "should replace foo by bar, then by foo",
            content_encoding: "",
            content_type: "text/html",
            rewrites: &[("foo", "bar"), ("bar", "foo")],
            last_modified: false,
            res_body: Bytes::from("foo is the new bar"),
            exp_res_body: Bytes::from("foo is the new foo"),
            intercepted: true,
        },
        Case {
            desc: "should not replace anything if content encoding is not identity or empty",
            content_encoding: "other",
            content_type: "text/html",
            rewrites: &[("foo", "bar")],
            last_modified: false,
            res_body: Bytes::from("foo is the new bar"),
            exp_res_body: Bytes::from("foo is the new bar"),
            intercepted: false,
        },
        Case {
            desc: "should not replace anything if content type does not match",
            content_encoding: "",
            content_type: "image",
            rewrites: &[("foo", "bar")],
            last_modified: false,
            res_body: Bytes::from("foo is the new bar"),
            exp_res_body: Bytes::from("foo is the new bar"),
            intercepted: false,
        },
        Case {
            desc: "should replace foo by bar if content encoding is identity",
            content_encoding: "identity",
            content_type: "text/html",
            rewrites: &[("foo", "bar")],
            last_modified: false,
            res_body: Bytes::from("foo is the new bar"),
            exp_res_body: Bytes::from("bar is the new bar"),
            intercepted: true,
        },
        Case {
            desc: "should not remove the last modified header",
            content_encoding: "identity",
            content_type: "text/html",
            rewrites: &[("foo", "bar")],
            last_modified: true,
            res_body: Bytes::from("foo is the new bar"),
            exp_res_body: Bytes::from("bar is the new bar"),
            intercepted: true,
        },
        Case {
            desc: "should support gzip encoding",
            content_encoding: "gzip",
            content_type: "text/html",
            rewrites: &[("foo", "bar")],
            last_modified: true,
            res_body: compress("foo is the new bar", Encoding::Gzip),
            exp_res_body: compress("bar is the new bar", Encoding::Gzip),
            intercepted: true,
        },
        Case {
            desc: "should support deflate encoding",
            content_encoding: "deflate",
            content_type: "text/html",
            rewrites: &[("foo", "bar")],
            last_modified: true,
            res_body: compress("foo is the new bar", Encoding::Deflate),
            exp_res_body: compress("bar is the new bar", Encoding::Deflate),
            intercepted: true,
        },
        Case {
            desc: "should pass brotli encoding through untouched",
            content_encoding: "br",
            content_type: "text/html",
            rewrites: &[("foo", "bar")],
            last_modified: true,
            res_body: compress("foo is the new bar", Encoding::Brotli),
            exp_res_body: compress("foo is the new bar", Encoding::Brotli),
            intercepted: false,
        },
        Case {
            desc: "should ignore unsupported encoding",
            content_encoding: "unknown",
            content_type: "text/html",
            rewrites: &[("foo", "bar")],
            last_modified: true,
            res_body: Bytes::from("foo is the new bar"),
            exp_res_body: Bytes::from("foo is the new bar"),
            intercepted: false,
        },
    ];

    for case in cases {
        let upstream =
            Upstream::new(case.content_encoding, case.content_type, case.res_body.clone());
        let middleware = RewriteBody::new(
            upstream.into_handler(),
            &config(case.rewrites, case.last_modified),
            "rewriteBody",
        )
        .unwrap();

        let (parts, body) = call(&middleware, get()).await;

        assert_eq!(parts.status, StatusCode::OK, "{}", case.desc);
        assert_eq!(body, case.exp_res_body, "{}: body mismatch", case.desc);

        if case.intercepted {
            assert!(
                !parts.headers.contains_key(header::CONTENT_LENGTH),
                "{}: Content-Length must be removed",
                case.desc
            );
            assert_eq!(
                parts.headers.contains_key(header::LAST_MODIFIED),
                case.last_modified,
                "{}: Last-Modified",
                case.desc
            );
        } else {
            // 그대로 전달된 응답은 헤더도 그대로
            assert_eq!(
                parts.headers[header::CONTENT_LENGTH],
                case.res_body.len().to_string(),
                "{}: Content-Length must be kept",
                case.desc
            );
            assert_eq!(parts.headers[header::LAST_MODIFIED], LAST_MODIFIED, "{}", case.desc);
        }
        assert_eq!(parts.headers[header::CONTENT_ENCODING], case.content_encoding, "{}", case.desc);
        assert_eq!(parts.headers[header::CONTENT_TYPE], case.content_type, "{}", case.desc);
    }
}

#[tokio::test]
async fn test_compressed_output_decodes_with_standard_decoders() {
    for encoding in [Encoding::Gzip, Encoding::Deflate] {
        let body = compress("foo is the new bar", encoding);
        let upstream = Upstream::new(encoding.as_str(), "text/html; charset=utf-8", body);
        let middleware = rewriter(upstream.into_handler(), &[("foo", "bar")]);

        let (_, body) = call(&middleware, get()).await;

        let mut plain = String::new();
        match encoding {
            Encoding::Gzip => GzDecoder::new(&body[..]).read_to_string(&mut plain).unwrap(),
            _ => ZlibDecoder::new(&body[..]).read_to_string(&mut plain).unwrap(),
        };
        assert_eq!(plain, "bar is the new bar", "{}", encoding);
    }
}

#[tokio::test]
async fn test_corrupt_gzip_passes_through() {
    let garbage = Bytes::from_static(b"\x1f\x8b\x08\x00 this is not really gzip");
    let upstream = Upstream::new("gzip", "text/html", garbage.clone());
    let middleware = rewriter(upstream.into_handler(), &[("is", "was")]);

    let (parts, body) = call(&middleware, get()).await;

    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(body, garbage);
    assert!(parts.headers.contains_key(header::CONTENT_LENGTH));
    assert!(parts.headers.contains_key(header::LAST_MODIFIED));
}

#[tokio::test]
async fn test_undecodable_encoding_passes_through_without_encoding_check() {
    let mut cfg = config(&[("foo", "bar")], false);
    cfg.monitoring.check_content_encoding = false;

    let compressed = compress("foo is the new bar", Encoding::Brotli);
    let upstream = Upstream::new("br", "text/html", compressed.clone());
    let middleware = RewriteBody::new(upstream.into_handler(), &cfg, "rewriteBody").unwrap();

    let (parts, body) = call(&middleware, get()).await;

    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(body, compressed);
    assert_eq!(parts.headers[header::CONTENT_ENCODING], "br");
    assert_eq!(parts.headers[header::CONTENT_TYPE], "text/html");
    assert_eq!(parts.headers[header::CONTENT_LENGTH], compressed.len().to_string());
    assert_eq!(parts.headers[header::LAST_MODIFIED], LAST_MODIFIED);
}

#[tokio::test]
async fn test_method_gating() {
    let upstream = Upstream::new("", "text/html", "foo is the new bar");
    let middleware = rewriter(upstream.into_handler(), &[("foo", "bar")]);

    let mut req = get();
    *req.method_mut() = Method::POST;
    let (_, body) = call(&middleware, req).await;
    assert_eq!(body, "foo is the new bar");

    let upstream = Upstream::new("", "text/html", "foo is the new bar");
    let mut cfg = config(&[("foo", "bar")], false);
    cfg.monitoring.methods = vec!["POST".into()];
    let middleware = RewriteBody::new(upstream.into_handler(), &cfg, "rewriteBody").unwrap();

    let mut req = get();
    *req.method_mut() = Method::POST;
    let (_, body) = call(&middleware, req).await;
    assert_eq!(body, "bar is the new bar");
}

#[tokio::test]
async fn test_accept_gating() {
    let mut cfg = config(&[("foo", "bar")], false);
    cfg.monitoring = MonitoringConfig {
        check_mime_accept: true,
        ..Default::default()
    };
    let middleware = RewriteBody::new(
        Upstream::new("", "text/html", "foo is the new bar").into_handler(),
        &cfg,
        "rewriteBody",
    )
    .unwrap();

    let (_, body) = call(&middleware, get()).await;
    assert_eq!(body, "bar is the new bar");

    let mut req = get();
    req.headers_mut().insert(header::ACCEPT, "application/json".parse().unwrap());
    let (_, body) = call(&middleware, req).await;
    assert_eq!(body, "foo is the new bar");
}

#[tokio::test]
async fn test_accept_encoding_gating() {
    let middleware = RewriteBody::new(
        Upstream::new("gzip", "text/html", compress("foo is the new bar", Encoding::Gzip))
            .into_handler(),
        &config(&[("foo", "bar")], false),
        "rewriteBody",
    )
    .unwrap();

    let mut req = get();
    req.headers_mut().insert(header::ACCEPT_ENCODING, "identity".parse().unwrap());
    let (_, body) = call(&middleware, req).await;
    assert_eq!(body, compress("foo is the new bar", Encoding::Gzip));

    let mut req = get();
    req.headers_mut().insert(header::ACCEPT_ENCODING, "gzip, deflate, br".parse().unwrap());
    let (_, body) = call(&middleware, req).await;
    assert_eq!(body, compress("bar is the new bar", Encoding::Gzip));
}

#[tokio::test]
async fn test_multiple_types_are_alternatives() {
    let mut cfg = config(&[("foo", "bar")], false);
    cfg.monitoring.types = vec!["application/json".into(), "text/html".into()];

    for content_type in ["application/json", "text/html; charset=utf-8"] {
        let middleware = RewriteBody::new(
            Upstream::new("", content_type, "foo is the new bar").into_handler(),
            &cfg,
            "rewriteBody",
        )
        .unwrap();
        let (_, body) = call(&middleware, get()).await;
        assert_eq!(body, "bar is the new bar", "{}", content_type);
    }
}

#[tokio::test]
async fn test_body_over_limit_passes_through() {
    let mut cfg = config(&[("foo", "bar")], false);
    cfg.max_body_size = Some(8);

    let middleware = RewriteBody::new(
        Upstream::new("", "text/html", "foo is the new bar").into_handler(),
        &cfg,
        "rewriteBody",
    )
    .unwrap();
    let (parts, body) = call(&middleware, get()).await;
    assert_eq!(body, "foo is the new bar");
    assert!(parts.headers.contains_key(header::CONTENT_LENGTH));

    cfg.max_body_size = Some(1024);
    let middleware = RewriteBody::new(
        Upstream::new("", "text/html", "foo is the new bar").into_handler(),
        &cfg,
        "rewriteBody",
    )
    .unwrap();
    let (_, body) = call(&middleware, get()).await;
    assert_eq!(body, "bar is the new bar");
}

#[tokio::test]
async fn test_streamed_upstream_body_is_buffered_before_rewrite() {
    // 청크 경계에 걸친 일치도 재작성되어야 함
    let upstream = handler_fn(|_req: Request| async {
        let frames: Vec<Result<Frame<Bytes>, BoxError>> = ["fo", "o is the ", "new b", "ar"]
            .into_iter()
            .map(|chunk| Ok(Frame::data(Bytes::from(chunk))))
            .collect();
        let res: Response = hyper::Response::builder()
            .header(header::CONTENT_TYPE, "text/html")
            .body(Body::new(StreamBody::new(stream::iter(frames))))?;
        Ok::<_, MiddlewareError>(res)
    });
    let middleware = rewriter(Arc::new(upstream), &[("foo", "bar"), ("new bar", "old baz")]);

    let (_, body) = call(&middleware, get()).await;
    assert_eq!(body, "bar is the old baz");
}

#[tokio::test]
async fn test_upstream_error_is_propagated() {
    let upstream = handler_fn(|_req: Request| async {
        Err::<Response, _>(MiddlewareError::Upstream("connection refused".into()))
    });
    let middleware = rewriter(Arc::new(upstream), &[("foo", "bar")]);

    let result = middleware.call(get()).await;
    assert!(matches!(result, Err(MiddlewareError::Upstream(_))));
}

#[test]
fn test_new() {
    let ok = config(&[("foo", "bar"), ("bar", "foo")], false);
    let upstream = Upstream::new("", "text/html", "").into_handler();
    assert!(RewriteBody::new(upstream.clone(), &ok, "rewriteBody").is_ok());

    let bad = config(&[("*", "bar")], false);
    let err = RewriteBody::new(upstream, &bad, "rewriteBody")
        .err()
        .expect("expected error on bad regexp format");
    assert!(err.to_string().contains('*'));
}

#[test]
fn test_crate_level_constructor() {
    let upstream = Upstream::new("", "text/html", "").into_handler();
    let config = rewrite_body::create_config();

    let middleware = rewrite_body::new(upstream, &config, "rewriteBody").unwrap();
    assert_eq!(middleware.policy().types(), ["text/html"]);
}
