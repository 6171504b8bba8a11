// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket server and connection handling.

use std::sync::Arc;
use std::time::Instant;

use crew_core::{CreateRequest, IdempotencyKey, KeyError, WorkerId};
use crew_daemon::protocol::{self, Request, Response, DEFAULT_TIMEOUT, PROTOCOL_VERSION};
use tokio::net::UnixStream;
use tokio::sync::Notify;
use tracing::{debug, error};

use crate::lifecycle::DaemonRuntime;

/// Everything a connection task needs
pub struct ServerContext {
    pub runtime: Arc<DaemonRuntime>,
    pub start_time: Instant,
    /// Notified when a client asks the daemon to stop
    pub shutdown: Notify,
}

/// Handle a single client connection
pub async fn handle_connection(ctx: &ServerContext, stream: UnixStream) -> Result<(), ServerError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
        Ok(req) => req,
        Err(protocol::ProtocolError::Timeout) => {
            error!("Request read timeout");
            return Err(ServerError::Timeout);
        }
        Err(protocol::ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected before sending request");
            return Ok(());
        }
        Err(e) => {
            error!("Failed to read request: {}", e);
            return Err(ServerError::Protocol(e));
        }
    };

    debug!("Received request: {:?}", request);

    let response = handle_request(ctx, request).await;

    debug!("Sending response: {:?}", response);

    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT)
        .await
        .map_err(ServerError::Protocol)?;

    Ok(())
}

/// Handle a single request and return a response
pub(crate) async fn handle_request(ctx: &ServerContext, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::Shutdown => {
            ctx.shutdown.notify_one();
            Response::ShuttingDown
        }

        Request::Status => status(ctx),

        Request::Create {
            task_description,
            start_delay_ms,
            idempotency_key,
        } => {
            let key = match parse_key(idempotency_key) {
                Ok(key) => key,
                Err(e) => return error_response(e),
            };
            let request = CreateRequest {
                task_description,
                start_delay_ms,
            };
            match ctx.runtime.create_worker(request, key).await {
                Ok(worker_id) => Response::Created { worker_id },
                Err(e) => error_response(e),
            }
        }

        Request::Complete {
            id,
            idempotency_key,
        } => {
            let key = match parse_key(idempotency_key) {
                Ok(key) => key,
                Err(e) => return error_response(e),
            };
            match ctx.runtime.complete_worker(&WorkerId::from(id), key).await {
                Ok(()) => Response::Ok,
                Err(e) => error_response(e),
            }
        }

        Request::WorkerStatus { id } => {
            let worker_id = WorkerId::from(id);
            match ctx.runtime.status(&worker_id).await {
                Ok(status) => Response::Worker {
                    worker_id,
                    task_description: status.task_description,
                    status: status.status,
                },
                Err(e) => error_response(e),
            }
        }

        Request::List => match ctx.runtime.list().await {
            Ok(list) => Response::Workers {
                workers: list.workers,
            },
            Err(e) => error_response(e),
        },

        Request::Freeze { frozen } => match ctx.runtime.freeze(frozen).await {
            Ok(()) => Response::Ok,
            Err(e) => error_response(e),
        },

        Request::IsFrozen => match ctx.runtime.is_frozen() {
            Ok(frozen) => Response::Frozen { frozen },
            Err(e) => error_response(e),
        },
    }
}

fn status(ctx: &ServerContext) -> Response {
    let uptime_secs = ctx.start_time.elapsed().as_secs();
    ctx.runtime.executor().with_state(|state| Response::Status {
        uptime_secs,
        workers_total: state.workers.len(),
        workers_registered: state
            .registry
            .as_ref()
            .map_or(0, |r| r.worker_ids.len()),
        workers_active: state.workers.values().filter(|w| !w.is_terminal()).count(),
        scheduled_calls: state.scheduled.len(),
        frozen: state.registry.as_ref().is_some_and(|r| r.frozen),
    })
}

fn parse_key(key: Option<String>) -> Result<Option<IdempotencyKey>, KeyError> {
    key.map(IdempotencyKey::new).transpose()
}

fn error_response(e: impl std::fmt::Display) -> Response {
    Response::Error {
        message: e.to_string(),
    }
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),

    #[error("Request timeout")]
    Timeout,
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
