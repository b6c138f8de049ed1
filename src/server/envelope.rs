//! Response envelope shared by every endpoint

use crate::orchestrator::RunSummary;
use crate::StarwatchError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

/// JSON body of every response
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_count: Option<usize>,
    /// Milliseconds spent handling the request
    pub execution_time: u64,
}

/// An envelope paired with its HTTP status
#[derive(Debug)]
pub struct Reply {
    status: StatusCode,
    envelope: Envelope,
}

impl Reply {
    /// 200 with a data payload
    pub fn data<T: Serialize>(payload: &T, started: Instant) -> Self {
        match serde_json::to_value(payload) {
            Ok(data) => Self {
                status: StatusCode::OK,
                envelope: Envelope {
                    success: true,
                    data: Some(data),
                    execution_time: elapsed_ms(started),
                    ..Default::default()
                },
            },
            Err(e) => Self::failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Could not serialize response: {}", e),
                started,
            ),
        }
    }

    /// 200 with the counts of a batch run, including runs with nothing to do
    pub fn summary(summary: &RunSummary, started: Instant) -> Self {
        let mut reply = Self::data(summary, started);
        reply.envelope.processed_count = Some(summary.processed_count);
        reply.envelope.total_count = Some(summary.total_count);
        reply.envelope.remaining_count = Some(summary.remaining_count);
        reply
    }

    /// 400 for missing or malformed input
    pub fn bad_request(message: impl Into<String>, started: Instant) -> Self {
        Self::failure(StatusCode::BAD_REQUEST, message.into(), started)
    }

    /// Maps an error onto its status: gone fictions are 404, unknown genres
    /// 400, everything else 500
    pub fn error(error: &StarwatchError, started: Instant) -> Self {
        let status = match error {
            StarwatchError::FictionGone(_) => StatusCode::NOT_FOUND,
            StarwatchError::UnknownGenre(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::failure(status, error.to_string(), started)
    }

    fn failure(status: StatusCode, message: String, started: Instant) -> Self {
        Self {
            status,
            envelope: Envelope {
                success: false,
                error: Some(message),
                execution_time: elapsed_ms(started),
                ..Default::default()
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
