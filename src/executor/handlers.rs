use super::coordinator::{Coordinator, PollReply, ReplyAck, SubmitReply};
use super::protocol::*;
use super::types::JobId;
use crate::error::CoordinatorError;

use axum::extract::rejection::JsonRejection;
use axum::{Extension, Json, extract::Path, http::StatusCode};
use std::sync::Arc;

/// Status code reported while a query is queued, partial or being enriched.
pub const CODE_PENDING: u16 = 250;
/// Status code of a poll for an unknown query.
pub const CODE_NOT_FOUND: u16 = 220;

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

pub async fn handle_status(
    Extension(coordinator): Extension<Arc<Coordinator>>,
) -> (StatusCode, Json<StatusResponse>) {
    let stats = coordinator.stats();
    (
        StatusCode::OK,
        Json(StatusResponse {
            status: STATUS_RUNNING.to_string(),
            active_jobs: stats.active_jobs,
            queued_jobs: stats.queued_jobs,
            live_workers: stats.live_workers,
        }),
    )
}

pub async fn handle_plugin_request(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    sequence: String,
) -> (StatusCode, Json<SubmitResponse>) {
    match coordinator.submit(sequence).await {
        Ok(reply) => {
            let code = match reply {
                SubmitReply::Queued(_) => status(CODE_PENDING),
                SubmitReply::Admitted(_) | SubmitReply::Cached(_) => StatusCode::OK,
            };
            (
                code,
                Json(SubmitResponse {
                    status: STATUS_SUCCESS.to_string(),
                    qid: Some(reply.qid().clone()),
                }),
            )
        }
        Err(e) => {
            let (text, qid) = refusal_text(&e);
            tracing::info!("Submission refused: {}", e);
            (
                status(e.status_code()),
                Json(SubmitResponse {
                    status: text.to_string(),
                    qid,
                }),
            )
        }
    }
}

/// Body text and echoed qid for a refused submission.
pub fn refusal_text(error: &CoordinatorError) -> (&'static str, Option<JobId>) {
    match error {
        CoordinatorError::Duplicate(id) => (STATUS_DUPLICATE, Some(id.clone())),
        CoordinatorError::NoWorkersAvailable => (STATUS_NO_WORKERS, None),
        CoordinatorError::EmptySequence => (STATUS_EMPTY_SEQUENCE, None),
        other => {
            tracing::error!("Unexpected submission failure: {}", other);
            (STATUS_BAD_REQUEST, None)
        }
    }
}

pub async fn handle_node_data(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Path(qid): Path<String>,
    payload: Result<Json<NodeDataRequest>, JsonRejection>,
) -> (StatusCode, Json<NodeDataResponse>) {
    let bad_call = |reason: String| {
        tracing::warn!("Bad call to node data for {}: {}", qid, reason);
        (
            StatusCode::BAD_REQUEST,
            Json(NodeDataResponse {
                status: STATUS_BAD_NODE_DATA.to_string(),
            }),
        )
    };

    let id = match JobId::parse(&qid) {
        Ok(id) => id,
        Err(e) => return bad_call(e.to_string()),
    };
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => return bad_call(rejection.body_text()),
    };

    match coordinator.accept_reply(&id, request).await {
        Ok(ReplyAck::Complete) => (
            StatusCode::OK,
            Json(NodeDataResponse {
                status: STATUS_SENT.to_string(),
            }),
        ),
        Ok(ReplyAck::Waiting { .. }) => (
            status(CODE_PENDING),
            Json(NodeDataResponse {
                status: STATUS_WAITING.to_string(),
            }),
        ),
        Err(e) => bad_call(e.to_string()),
    }
}

pub async fn handle_plugin_poll(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Path(qid): Path<String>,
) -> (StatusCode, Json<PollResponse>) {
    let Ok(id) = JobId::parse(&qid) else {
        tracing::debug!("Poll for malformed id {}", qid);
        return (status(CODE_NOT_FOUND), Json(PollResponse::pending(STATE_NOT_FOUND)));
    };

    match coordinator.poll(&id).await {
        PollReply::Done(result) => (StatusCode::OK, Json(PollResponse::done(result))),
        PollReply::Enriching => (
            status(CODE_PENDING),
            Json(PollResponse::pending(STATE_RETRIEVING)),
        ),
        PollReply::InQueue => (
            status(CODE_PENDING),
            Json(PollResponse::pending(STATE_IN_QUEUE)),
        ),
        PollReply::Partial { received, expected } => (
            status(CODE_PENDING),
            Json(PollResponse::pending(partial_state(received, expected))),
        ),
        PollReply::NotFound => (
            status(CODE_NOT_FOUND),
            Json(PollResponse::pending(STATE_NOT_FOUND)),
        ),
    }
}
