use std::time::Instant;

use async_trait::async_trait;
use tracing::{error, info};

use crate::{Next, PipelineBehavior, PipelineError, Request, RequestContext};

const TRUNCATION_MARKER: &str = "... (truncated)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingOptions {
    /// Include the serialized request in the "starting request" event.
    pub log_payloads: bool,
    /// Payloads longer than this many bytes are cut.
    pub max_payload_size: usize,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            log_payloads: false,
            max_payload_size: 10_000,
        }
    }
}

/// Emits start/completion events around the rest of the pipeline.
#[derive(Debug, Clone, Default)]
pub struct LoggingBehavior {
    options: LoggingOptions,
}

impl LoggingBehavior {
    pub fn new(options: LoggingOptions) -> Self {
        Self { options }
    }

    fn render_payload<R: Request>(&self, request: &R) -> String {
        match serde_json::to_string(request) {
            Ok(json) => truncate_payload(json, self.options.max_payload_size),
            Err(e) => format!("<unserializable: {e}>"),
        }
    }
}

#[async_trait]
impl<R: Request> PipelineBehavior<R> for LoggingBehavior {
    async fn handle(&self, request: R, ctx: &RequestContext, next: Next<'_, R>) -> Result<R::Response, PipelineError> {
        let name = request.name();
        let user_id = ctx.identity().id();
        let correlation_id = ctx.correlation_id();

        if self.options.log_payloads {
            let payload = self.render_payload(&request);
            info!(request = name, %correlation_id, user_id = ?user_id, payload = %payload, "starting request");
        } else {
            info!(request = name, %correlation_id, user_id = ?user_id, "starting request");
        }

        let started = Instant::now();
        let result = next.run(request, ctx).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => info!(request = name, %correlation_id, elapsed_ms, "completed request"),
            Err(err) => error!(request = name, %correlation_id, elapsed_ms, error = %err, "request failed"),
        }

        result
    }
}

fn truncate_payload(mut json: String, max: usize) -> String {
    if json.len() <= max {
        return json;
    }
    let mut cut = max;
    while !json.is_char_boundary(cut) {
        cut -= 1;
    }
    json.truncate(cut);
    json.push_str(TRUNCATION_MARKER);
    json
}
