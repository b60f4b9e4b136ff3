//! Messages exchanged between a [`ProcessPool`][crate::ProcessPool] and its worker processes.
//!
//! Each message is one JSON object on its own line. The parent writes a task to the worker's
//! stdin and reads the reply from the worker's stdout:
//!
//! ```text
//! -> {"index":0,"start":0,"end":250000}
//! <- {"index":0,"count":22044}
//! ```

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{Error, Interval, Result, count_primes};

/// Asks a worker to count the primes in `[start, end)` for task slot `index`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub(crate) struct TaskMessage {
    pub(crate) index: usize,
    pub(crate) start: u64,
    pub(crate) end: u64,
}

impl TaskMessage {
    pub(crate) fn new(index: usize, interval: Interval) -> Self {
        Self {
            index,
            start: interval.start(),
            end: interval.end(),
        }
    }
}

/// A worker's answer to the task with the same `index`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub(crate) struct ReplyMessage {
    pub(crate) index: usize,
    pub(crate) count: u64,
}

/// Encodes a message as a single line, including the trailing newline.
pub(crate) fn encode_line<T: Serialize>(message: &T) -> Result<String> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

/// Runs the worker side of the protocol until `input` is exhausted.
///
/// Every task read from `input` is answered with a flushed reply on `output` before the next
/// task is read. Blank lines are ignored. Returns the number of tasks served.
///
/// # Errors
///
/// Returns an error if a line is not a valid task, if a task describes an interval whose start
/// is after its end, or if reading or writing fails.
pub fn serve_tasks(input: impl BufRead, mut output: impl Write) -> Result<u64> {
    let mut served: u64 = 0;

    for line in input.lines() {
        let line = line.map_err(Error::ServeIo)?;

        if line.trim().is_empty() {
            continue;
        }

        let task: TaskMessage = serde_json::from_str(&line)?;

        let interval = Interval::checked_new(task.start, task.end).ok_or(Error::InvalidInterval {
            start: task.start,
            end: task.end,
        })?;

        let reply = ReplyMessage {
            index: task.index,
            count: count_primes(interval),
        };

        trace!(index = reply.index, count = reply.count, "task served");

        output
            .write_all(encode_line(&reply)?.as_bytes())
            .and_then(|()| output.flush())
            .map_err(Error::ServeIo)?;

        served = served.saturating_add(1);
    }

    Ok(served)
}
