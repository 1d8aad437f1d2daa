use std::process;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use rewrite_body::{
    logging::init_logging,
    middleware::RewriteBody,
    proxy::ProxyUpstream,
    server,
    settings::Settings,
};

#[tokio::main]
async fn main() {
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("설정 로드 실패: {}", e);
            process::exit(1);
        }
    };

    let _guard = init_logging(&settings.logging);

    let upstream = Arc::new(ProxyUpstream::new(settings.server.upstream));
    let upstream_addr = upstream.address();
    let middleware = match RewriteBody::new(upstream, &settings.rewrite, "rewrite-body") {
        Ok(middleware) => middleware,
        Err(e) => {
            error!(error = %e, "미들웨어 생성 실패");
            process::exit(1);
        }
    };

    let listener = match TcpListener::bind(("0.0.0.0", settings.server.http_port)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, port = settings.server.http_port, "HTTP 포트 바인딩 실패");
            process::exit(1);
        }
    };

    info!(upstream = %upstream_addr, "응답 본문 재작성 프록시 시작");
    if let Err(e) = server::serve(listener, Arc::new(middleware)).await {
        error!(error = %e, "서버 종료");
        process::exit(1);
    }
}
