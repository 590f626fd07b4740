//! One-line-per-command view of a transcript.

use std::fmt;

use serde::Serialize;

use super::packet::Timestamp;
use super::session::{Connection, Transmission};
use super::structure::Event;

/// How the server answered a command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResponseStatus {
    /// No response was captured.
    Pending,
    Ok { affected_rows: u64 },
    Rows { columns: usize, rows: usize },
    Prepared { statement_id: u32, params: u16 },
    Error { code: u16, message: String },
    /// Any other response event, by kind.
    Other { kind: &'static str },
}

impl ResponseStatus {
    fn from_event(event: &Event) -> Self {
        match event {
            Event::Ok(ok) => ResponseStatus::Ok {
                affected_rows: ok.affected_rows,
            },
            Event::ResultSet(rs) => ResponseStatus::Rows {
                columns: rs.columns.len(),
                rows: rs.rows.len(),
            },
            Event::PrepareOk(p) => ResponseStatus::Prepared {
                statement_id: p.statement_id,
                params: p.num_params,
            },
            Event::Error(e) => ResponseStatus::Error {
                code: e.code,
                message: e.message.clone(),
            },
            other => ResponseStatus::Other { kind: other.kind() },
        }
    }

    /// Progress reports and authentication steps arrive before the real answer.
    fn is_final(&self) -> bool {
        !matches!(
            self,
            ResponseStatus::Pending
                | ResponseStatus::Other {
                    kind: "Progress" | "AuthSwitch" | "AuthMoreData"
                }
        )
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseStatus::Pending => write!(f, "-"),
            ResponseStatus::Ok { affected_rows } => write!(f, "OK ({affected_rows} affected)"),
            ResponseStatus::Rows { columns, rows } => {
                write!(f, "{rows} rows x {columns} columns")
            }
            ResponseStatus::Prepared {
                statement_id,
                params,
            } => write!(f, "prepared #{statement_id} ({params} params)"),
            ResponseStatus::Error { code, message } => write!(f, "ERROR {code}: {message}"),
            ResponseStatus::Other { kind } => write!(f, "{kind}"),
        }
    }
}

/// A client command paired with the server's answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandSummary {
    pub started: Option<Timestamp>,
    pub finished: Option<Timestamp>,
    pub command: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub outcome: ResponseStatus,
}

impl CommandSummary {
    /// Microseconds between the command and its final response.
    pub fn elapsed(&self) -> Option<i64> {
        Some(self.finished? - self.started?)
    }
}

fn detail(event: &Event) -> Option<String> {
    match event {
        Event::Query(q) => Some(q.query.clone()),
        Event::Prepare(p) => Some(p.query.clone()),
        Event::Execute(e) => Some(format!("statement {}", e.statement_id)),
        Event::Login(l) if !l.username.is_empty() => Some(l.username.clone()),
        Event::Command(c) => c
            .argument
            .clone()
            .or_else(|| c.statement_id.map(|id| format!("statement {id}"))),
        Event::Unrecognised(c) => Some(format!("command byte {:#04x}", c.code)),
        Event::AuthSwitch(a) => Some(a.plugin.clone()),
        Event::Greeting(g) => Some(g.version.clone()),
        Event::DecodeError(e) => Some(e.message.clone()),
        _ => None,
    }
}

fn open(item: &Transmission) -> CommandSummary {
    CommandSummary {
        started: item.first_seen(),
        finished: None,
        command: item.kind,
        detail: detail(&item.event),
        outcome: ResponseStatus::Pending,
    }
}

/// Pair each request with the first final response that follows it.
///
/// Responses with no open request (the greeting, or answers whose request
/// was not captured) get an entry of their own.
pub fn summarize(connection: &Connection) -> Vec<CommandSummary> {
    let mut summaries: Vec<CommandSummary> = Vec::new();
    let mut awaiting: Option<usize> = None;

    for item in &connection.items {
        if item.is_request() {
            // Part of the login still waiting for its answer
            if matches!(item.event, Event::AuthResponse(_)) && awaiting.is_some() {
                continue;
            }
            awaiting = Some(summaries.len());
            summaries.push(open(item));
            continue;
        }

        let status = ResponseStatus::from_event(&item.event);
        match awaiting.and_then(|i| summaries.get_mut(i)) {
            Some(summary) => {
                let done = status.is_final();
                summary.outcome = status;
                summary.finished = item.first_seen();
                if done {
                    awaiting = None;
                }
            }
            None => {
                let mut summary = open(item);
                summary.finished = item.first_seen();
                summary.outcome = status;
                summaries.push(summary);
            }
        }
    }

    summaries
}
