use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::StatusCode;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{error, info};
use uuid::Uuid;
use crate::logging::{log_request, RequestLog};
use crate::middleware::{full, BoxError, Handler, MiddlewareError, Response};

/// 연결을 받아 HTTP/1로 처리합니다. 리스너가 살아 있는 동안 반환하지 않습니다.
pub async fn serve(listener: TcpListener, handler: Arc<dyn Handler>) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "HTTP 리스너 시작");

    loop {
        let (stream, remote) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(error = %e, "HTTP 연결 수락 실패");
                continue;
            }
        };

        let handler = handler.clone();
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| {
                let handler = handler.clone();
                async move { Ok::<_, Infallible>(handle_request(handler.as_ref(), req).await) }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                error!(error = %err, %remote, "HTTP 연결 처리 실패");
            }
        });
    }
}

/// 요청 하나를 핸들러로 처리하고 실패하면 오류 응답을 만듭니다.
pub async fn handle_request(handler: &dyn Handler, req: hyper::Request<Incoming>) -> Response {
    let start_time = Instant::now();
    let mut log = RequestLog::new(Uuid::new_v4().to_string());
    log.with_request(&req);

    let req = req.map(|body| body.map_err(|e| Box::new(e) as BoxError).boxed());
    let response = match handler.call(req).await {
        Ok(response) => response,
        Err(e) => {
            log.with_error(&e);
            error_response(&e)
        }
    };

    log.with_response(response.status());
    log.duration_ms = start_time.elapsed().as_millis() as u64;
    log_request(&log);

    response
}

fn error_response(err: &MiddlewareError) -> Response {
    let status = match err {
        MiddlewareError::Upstream(_) => StatusCode::BAD_GATEWAY,
        MiddlewareError::InvalidPattern { .. } | MiddlewareError::Build(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let mut response = Response::new(full(format!("Error: {}", err)));
    *response.status_mut() = status;
    response
}
