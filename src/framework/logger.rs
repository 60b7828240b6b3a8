use super::ReqScopedState;
use serde_json::Value;

pub trait LoggerInterface {
    fn info(&self, item: &str);
    fn warning(&self, item: &str);
    fn danger(&self, item: &str);
    fn debug(&self, item: &str);
}

/// リクエストの情報を付けてログを出す
#[derive(Clone, Debug)]
pub struct Logger<'a>(pub &'a ReqScopedState);

impl<'a> LoggerInterface for Logger<'a> {
    fn info(&self, item: &str) {
        log(self.0, LogLevel::Info, item)
    }
    fn warning(&self, item: &str) {
        log(self.0, LogLevel::Warning, item)
    }

    fn danger(&self, item: &str) {
        log(self.0, LogLevel::Danger, item)
    }

    fn debug(&self, item: &str) {
        log(self.0, LogLevel::Debug, item)
    }
}

#[derive(Clone, Copy, Debug)]
enum LogLevel {
    Info,
    Warning,
    Danger,
    Debug,
}

fn log(ctx: &ReqScopedState, level: LogLevel, item: &str) {
    let req_id = ctx.req_id;
    let context = Value::Object(ctx.log_member.clone());

    match level {
        LogLevel::Info => tracing::info!(req_id = %req_id, context = %context, "{item}"),
        LogLevel::Warning => tracing::warn!(req_id = %req_id, context = %context, "{item}"),
        LogLevel::Danger => tracing::error!(req_id = %req_id, context = %context, "{item}"),
        LogLevel::Debug => tracing::debug!(req_id = %req_id, context = %context, "{item}"),
    }
}
