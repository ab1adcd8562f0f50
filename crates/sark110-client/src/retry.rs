//! Retry engine around one send/receive exchange.
//!
//! An attempt succeeds when a frame comes back with status `'O'` or `'E'`.
//! Everything else (send or receive failure, short frame, timeout, foreign
//! status byte) is a failed attempt and is retried as the plan allows. A
//! device error is a successful exchange and is never retried.

use crate::config::ExchangePlan;
use crate::error::CommError;
use sark110_protocol::{FRAME_LEN, Request, Response, Status};
use sark110_transport::Transport;
use std::time::Duration;
use tracing::{debug, error, warn};

/// One send followed by one receive.
pub(crate) fn exchange_once(
    transport: &mut dyn Transport,
    device: usize,
    request: &Request,
) -> Result<Response, CommError> {
    transport
        .send(device, request.as_bytes())
        .map_err(CommError::Send)?;

    let mut frame = [0u8; FRAME_LEN];
    transport
        .receive(device, &mut frame)
        .map_err(CommError::Receive)?;

    let response = Response::from_bytes(frame);
    match response.status() {
        Status::Invalid(byte) => Err(CommError::MalformedStatus(byte)),
        Status::Ok | Status::DeviceError => Ok(response),
    }
}

struct Failure {
    attempts: u32,
    last: CommError,
}

fn repeat(
    transport: &mut dyn Transport,
    device: usize,
    request: &Request,
    attempts: u32,
) -> Result<Response, Failure> {
    let mut last = CommError::NotConnected;
    for attempt in 1..=attempts {
        match exchange_once(transport, device, request) {
            Ok(response) => {
                debug!(
                    opcode = request.opcode_byte(),
                    attempt,
                    status = response.status_byte(),
                    "Exchange complete"
                );
                return Ok(response);
            }
            Err(e) => {
                warn!(opcode = request.opcode_byte(), attempt, error = %e, "Exchange attempt failed");
                last = e;
            }
        }
    }
    Err(Failure { attempts, last })
}

fn reconnect(transport: &mut dyn Transport, delay: Duration) {
    transport.close();
    std::thread::sleep(delay);
    match transport.open() {
        Ok(_) => debug!(transport = %transport.kind(), "Reconnected"),
        Err(e) => warn!(transport = %transport.kind(), error = %e, "Reconnect failed"),
    }
}

/// Run `request` under `plan`.
pub(crate) fn run(
    transport: &mut dyn Transport,
    device: usize,
    request: &Request,
    plan: ExchangePlan,
) -> Result<Response, CommError> {
    let kind = transport.kind();
    let outcome = match plan {
        ExchangePlan::Single => return exchange_once(transport, device, request),
        ExchangePlan::Repeat { attempts } => repeat(transport, device, request, attempts),
        ExchangePlan::Reconnect {
            inner,
            outer,
            delay,
        } => {
            let mut total = 0u32;
            let mut last = CommError::NotConnected;
            let mut found = None;
            for round in 1..=outer {
                if round > 1 {
                    warn!(opcode = request.opcode_byte(), round, "Reconnecting before retry");
                    reconnect(transport, delay);
                }
                match repeat(transport, device, request, inner) {
                    Ok(response) => {
                        found = Some(response);
                        break;
                    }
                    Err(failure) => {
                        total = total.saturating_add(failure.attempts);
                        last = failure.last;
                    }
                }
            }
            found.ok_or(Failure {
                attempts: total,
                last,
            })
        }
    };

    outcome.map_err(|Failure { attempts, last }| {
        error!(
            opcode = request.opcode_byte(),
            transport = %kind,
            attempts,
            error = %last,
            "Exchange retry budget exhausted"
        );
        CommError::Exhausted {
            kind,
            attempts,
            last: Box::new(last),
        }
    })
}
