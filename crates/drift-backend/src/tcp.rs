//! Blocking TCP transport to a generation service.
//!
//! Each request opens a fresh connection, writes one framed request, reads
//! one framed response, and closes. No timeouts or retries are applied.

use std::io::ErrorKind;
use std::net::TcpStream;

use tracing::{debug, warn};

use drift_types::Candidate;

use crate::backend::GenerationBackend;
use crate::codec::BackendCodec;
use crate::error::{BackendError, BackendResult};
use crate::message::{codes, BackendMessage};

/// Client for a backend listening on `host:port`.
#[derive(Clone, Debug)]
pub struct TcpBackend {
    addr: String,
}

impl TcpBackend {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn round_trip(&self, request: &BackendMessage) -> BackendResult<Vec<Candidate>> {
        let mut stream = TcpStream::connect(&self.addr)?;
        debug!(addr = %self.addr, msg = request.type_name(), "sending request");
        BackendCodec::write_to(&mut stream, request)?;

        match BackendCodec::read_from(&mut stream)? {
            BackendMessage::Candidates { items } => Ok(items),
            BackendMessage::Error { code, message } => {
                warn!(addr = %self.addr, code, %message, "backend reported an error");
                Err(BackendError::Remote { code, message })
            }
            other => Err(BackendError::UnexpectedResponse(other.type_name())),
        }
    }
}

impl GenerationBackend for TcpBackend {
    fn describe(&self) -> String {
        format!("tcp://{}", self.addr)
    }

    fn query(&self, text: &str, num_candidates: usize) -> BackendResult<Vec<Candidate>> {
        self.round_trip(&BackendMessage::Query {
            text: text.to_string(),
            num_candidates: num_candidates as u32,
        })
    }

    fn diffuse(
        &self,
        source: &Candidate,
        candidate_index: usize,
        skip_rate: f32,
        num_candidates: usize,
    ) -> BackendResult<Vec<Candidate>> {
        self.round_trip(&BackendMessage::Diffuse {
            source: source.clone(),
            candidate_index: candidate_index as u32,
            skip_rate,
            num_candidates: num_candidates as u32,
        })
    }

    fn upscale(&self, source: &Candidate, candidate_index: usize) -> BackendResult<Vec<Candidate>> {
        self.round_trip(&BackendMessage::Upscale {
            source: source.clone(),
            candidate_index: candidate_index as u32,
        })
    }
}

/// Serve one request on an accepted connection by delegating to `backend`.
///
/// Backend failures are answered with an `Error` message rather than
/// returned; only transport failures surface as `Err`.
pub fn handle_connection(
    stream: &mut TcpStream,
    backend: &dyn GenerationBackend,
) -> BackendResult<()> {
    let request = match BackendCodec::read_from(stream) {
        Ok(request) => request,
        Err(BackendError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => {
            debug!("peer closed before sending a request");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let result = match &request {
        BackendMessage::Query {
            text,
            num_candidates,
        } => backend.query(text, *num_candidates as usize),
        BackendMessage::Diffuse {
            source,
            candidate_index,
            skip_rate,
            num_candidates,
        } => backend.diffuse(
            source,
            *candidate_index as usize,
            *skip_rate,
            *num_candidates as usize,
        ),
        BackendMessage::Upscale {
            source,
            candidate_index,
        } => backend.upscale(source, *candidate_index as usize),
        other => {
            let reply = BackendMessage::Error {
                code: codes::BAD_REQUEST,
                message: format!("{} is not a request", other.type_name()),
            };
            return BackendCodec::write_to(stream, &reply);
        }
    };

    let reply = match result {
        Ok(items) => BackendMessage::Candidates { items },
        Err(BackendError::Remote { code, message }) => BackendMessage::Error { code, message },
        Err(e) => BackendMessage::Error {
            code: codes::GENERATION_FAILED,
            message: e.to_string(),
        },
    };
    debug!(request = request.type_name(), reply = reply.type_name(), "served request");
    BackendCodec::write_to(stream, &reply)
}
