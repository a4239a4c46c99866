//! Scripted endpoint for tests.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use serde_json::{json, Value};

use super::error::ClientError;
use super::transport::Endpoint;

/// A canned reply to one call.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Envelope with the given `result` and `error`, id echoed.
    Envelope { result: Value, error: Value },
    /// Body returned as-is.
    Raw(Value),
    /// Connection failure.
    Unreachable,
}

impl Reply {
    pub fn result(result: Value) -> Self {
        Reply::Envelope {
            result,
            error: Value::Null,
        }
    }

    pub fn error(code: i64, message: &str) -> Self {
        Reply::Envelope {
            result: Value::Null,
            error: json!({"code": code, "message": message}),
        }
    }

    pub fn both(result: Value, error: Value) -> Self {
        Reply::Envelope { result, error }
    }

    pub fn raw(body: Value) -> Self {
        Reply::Raw(body)
    }
}

/// Replays replies per method. The last reply queued for a method is
/// repeated once the queue is down to it.
#[derive(Debug, Default)]
pub struct ScriptedEndpoint {
    replies: HashMap<String, VecDeque<Reply>>,
    calls: Rc<RefCell<Vec<Value>>>,
    closed: Rc<RefCell<usize>>,
}

impl ScriptedEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, method: &str, reply: Reply) -> Self {
        self.replies
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Shared log of every request body posted.
    pub fn calls(&self) -> Rc<RefCell<Vec<Value>>> {
        Rc::clone(&self.calls)
    }

    /// Shared counter of `close` invocations.
    pub fn closed(&self) -> Rc<RefCell<usize>> {
        Rc::clone(&self.closed)
    }
}

impl Endpoint for ScriptedEndpoint {
    fn post(&mut self, body: &Value) -> Result<Value, ClientError> {
        self.calls.borrow_mut().push(body.clone());

        let method = body["method"].as_str().unwrap_or_default().to_string();
        let queue = self
            .replies
            .get_mut(&method)
            .ok_or_else(|| ClientError::Transport(format!("no scripted reply for {}", method)))?;
        let reply = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
        .ok_or_else(|| ClientError::Transport(format!("no scripted reply for {}", method)))?;

        match reply {
            Reply::Envelope { result, error } => Ok(json!({
                "id": body["id"].clone(),
                "result": result,
                "error": error,
            })),
            Reply::Raw(body) => Ok(body),
            Reply::Unreachable => Err(ClientError::Transport("connection refused".to_string())),
        }
    }

    fn close(&mut self) {
        *self.closed.borrow_mut() += 1;
    }
}

/// Number of posted calls for `method`.
pub fn count_calls(calls: &Rc<RefCell<Vec<Value>>>, method: &str) -> usize {
    calls
        .borrow()
        .iter()
        .filter(|c| c["method"] == method)
        .count()
}
