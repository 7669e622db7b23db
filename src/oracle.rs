use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::OracleError;
use crate::markup::parse_tagged;
use crate::session::CheckTicket;
use crate::suggestion::ProposedEdit;

/// Anything that turns a text into proposed edits.
pub trait SuggestionOracle: Send + Sync {
    fn check(&self, content: &str) -> Result<Vec<ProposedEdit>, OracleError>;
}

#[derive(Serialize)]
struct CheckRequest<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct CheckResponse {
    #[serde(default)]
    suggestions: Option<Vec<ProposedEdit>>,
    #[serde(default, rename = "markedContent")]
    marked_content: Option<String>,
}

/// Reads either response shape of the check service: a JSON suggestion
/// list, or the text echoed back with inline annotation tags.
pub fn parse_check_response(body: &str) -> Result<Vec<ProposedEdit>, OracleError> {
    let response: CheckResponse = serde_json::from_str(body)?;
    match (response.suggestions, response.marked_content) {
        (Some(suggestions), _) => Ok(suggestions),
        (None, Some(marked)) => Ok(parse_tagged(&marked).edits),
        (None, None) => Err(OracleError::Malformed(
            "response has neither suggestions nor markedContent".to_string(),
        )),
    }
}

const ERROR_BODY_LIMIT: usize = 200;

/// Check service reached over HTTP: `POST {"content": ...}`.
#[derive(Debug, Clone)]
pub struct HttpOracle {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpOracle {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, OracleError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("quillcheck/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl SuggestionOracle for HttpOracle {
    fn check(&self, content: &str) -> Result<Vec<ProposedEdit>, OracleError> {
        let response = self
            .client
            .post(&self.url)
            .json(&CheckRequest { content })
            .send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(OracleError::Status {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }
        let edits = parse_check_response(&body)?;
        debug!(url = %self.url, count = edits.len(), "check service answered");
        Ok(edits)
    }
}

/// The answer to one dispatched check.
#[derive(Debug)]
pub struct CheckReply {
    pub ticket: CheckTicket,
    pub result: Result<Vec<ProposedEdit>, OracleError>,
}

/// Runs checks off the UI thread. Each request gets its own worker; replies
/// come back tagged with their ticket so the session can drop stale ones.
pub struct CheckDispatcher {
    oracle: Arc<dyn SuggestionOracle>,
    sender: Sender<CheckReply>,
    receiver: Receiver<CheckReply>,
}

impl CheckDispatcher {
    pub fn new(oracle: Arc<dyn SuggestionOracle>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            oracle,
            sender,
            receiver,
        }
    }

    pub fn dispatch(&self, ticket: CheckTicket, content: String) {
        let oracle = Arc::clone(&self.oracle);
        let sender = self.sender.clone();
        let spawned = thread::Builder::new()
            .name(format!("check-{}", ticket.generation()))
            .spawn(move || {
                let result = oracle.check(&content);
                if sender.send(CheckReply { ticket, result }).is_err() {
                    debug!("check reply dropped, dispatcher is gone");
                }
            });
        if let Err(err) = spawned {
            warn!(error = %err, "failed to start check worker");
            let reply = CheckReply {
                ticket,
                result: Err(OracleError::Disconnected),
            };
            if self.sender.send(reply).is_err() {
                debug!("check reply dropped, dispatcher is gone");
            }
        }
    }

    /// Next finished check, if any, without blocking.
    pub fn try_recv(&self) -> Option<CheckReply> {
        match self.receiver.try_recv() {
            Ok(reply) => Some(reply),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<CheckReply, OracleError> {
        self.receiver
            .recv_timeout(timeout)
            .map_err(|err| match err {
                RecvTimeoutError::Timeout => OracleError::Timeout(timeout),
                RecvTimeoutError::Disconnected => OracleError::Disconnected,
            })
    }
}
