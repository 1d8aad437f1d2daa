use std::ffi::OsStr;
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn, error, Level, span};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{time::UtcTime, writer::BoxMakeWriter},
    EnvFilter,
};
use crate::settings::{LogFormat, LogOutput, LogSettings};

/// 전역 tracing 구독자를 설치합니다.
///
/// 파일 출력을 쓰는 경우 반환된 가드가 살아 있는 동안만 로그가 기록됩니다.
pub fn init_logging(settings: &LogSettings) -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env()
        .add_directive(LevelFilter::from_level(settings.level).into());

    let (writer, guard) = match &settings.output {
        LogOutput::Stdout => (BoxMakeWriter::new(std::io::stdout), None),
        LogOutput::File(path) => {
            let path = Path::new(path);
            let dir = path.parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file_name = path.file_name().unwrap_or(OsStr::new("rewrite_body.log"));
            let (non_blocking, guard) = tracing_appender::non_blocking(
                tracing_appender::rolling::never(dir, file_name)
            );
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_timer(UtcTime::new(Rfc3339))
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let result = match settings.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    if let Err(e) = result {
        eprintln!("로깅 초기화 실패: {}", e);
    }

    guard
}

#[derive(Debug)]
pub struct RequestLog {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub status_code: u16,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl RequestLog {
    pub fn new(request_id: String) -> Self {
        Self {
            request_id,
            method: String::new(),
            path: String::new(),
            status_code: 0,
            duration_ms: 0,
            error: None,
        }
    }

    pub fn with_request<B>(&mut self, req: &hyper::Request<B>) {
        self.method = req.method().to_string();
        self.path = req.uri().path().to_string();

        info!(
            request_id = %self.request_id,
            method = %self.method,
            path = %self.path,
            "Received request"
        );
    }

    pub fn with_response(&mut self, status: hyper::StatusCode) {
        self.status_code = status.as_u16();
    }

    pub fn with_error(&mut self, error: impl std::fmt::Display) {
        let error_msg = error.to_string();
        error!(
            request_id = %self.request_id,
            error = %error_msg,
            "Request error occurred"
        );
        self.error = Some(error_msg);
    }
}

pub fn log_request(log: &RequestLog) {
    let level = if log.error.is_some() {
        Level::ERROR
    } else if log.status_code >= 400 {
        Level::WARN
    } else {
        Level::INFO
    };

    let span = span!(
        Level::INFO,
        "request",
        request_id = %log.request_id,
        method = %log.method,
        path = %log.path,
        status = %log.status_code,
        duration_ms = %log.duration_ms
    );
    let _enter = span.enter();

    match level {
        Level::ERROR => error!(error = ?log.error, "Request failed"),
        Level::WARN => warn!("Request completed with warning"),
        _ => info!("Request completed successfully"),
    }
}
