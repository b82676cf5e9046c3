//! Serialized command surface
//!
//! A [`Command`] names one leaderboard operation with its arguments and
//! options; [`TallyDb::dispatch`] runs it and returns a [`Reply`]. The JSON
//! form is what the CLI's `exec` subcommand and remote callers send:
//!
//! ```json
//! {"op":"set_score","key":"weekly","options":{"capacity":100},
//!  "entries":[{"id":"alice","score":42,"info":"Alice"}]}
//! ```

use crate::entry::{Entry, EntryInput};
use crate::options::Options;
use crate::{Result, TallyDb, TallyError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    Touch {
        key: String,
        #[serde(default)]
        options: Option<Options>,
    },
    RemoveId {
        key: String,
        #[serde(default)]
        options: Option<Options>,
        ids: Vec<String>,
    },
    SetScore {
        key: String,
        #[serde(default)]
        options: Option<Options>,
        entries: Vec<EntryInput>,
    },
    IncScore {
        key: String,
        #[serde(default)]
        options: Option<Options>,
        entries: Vec<EntryInput>,
    },
    SetInfo {
        key: String,
        #[serde(default)]
        options: Option<Options>,
        entries: Vec<EntryInput>,
    },
    GetRange {
        key: String,
        #[serde(default)]
        options: Option<Options>,
        start: i64,
        stop: i64,
    },
    GetById {
        key: String,
        #[serde(default)]
        options: Option<Options>,
        id: String,
    },
    Append {
        key: String,
        #[serde(default)]
        options: Option<Options>,
        entries: Vec<EntryInput>,
    },
    SwapById {
        key: String,
        #[serde(default)]
        options: Option<Options>,
        id_a: String,
        id_b: String,
    },
    SwapByRank {
        key: String,
        #[serde(default)]
        options: Option<Options>,
        rank_a: i64,
        rank_b: i64,
    },
}

impl Command {
    pub fn key(&self) -> &str {
        match self {
            Command::Touch { key, .. }
            | Command::RemoveId { key, .. }
            | Command::SetScore { key, .. }
            | Command::IncScore { key, .. }
            | Command::SetInfo { key, .. }
            | Command::GetRange { key, .. }
            | Command::GetById { key, .. }
            | Command::Append { key, .. }
            | Command::SwapById { key, .. }
            | Command::SwapByRank { key, .. } => key,
        }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| TallyError::MalformedPayload(format!("command: {}", e)))
    }
}

/// Result of a dispatched [`Command`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Reply {
    Done,
    Count(usize),
    Scores(Vec<f64>),
    Entries(Vec<Entry>),
    Entry(Option<Entry>),
}

impl TallyDb {
    pub fn dispatch(&self, command: &Command) -> Result<Reply> {
        match command {
            Command::Touch { key, options } => {
                self.touch(key, options.as_ref())?;
                Ok(Reply::Done)
            }
            Command::RemoveId { key, options, ids } => {
                let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
                self.remove_id(key, options.as_ref(), &ids).map(Reply::Count)
            }
            Command::SetScore {
                key,
                options,
                entries,
            } => self.set_score(key, options.as_ref(), entries).map(Reply::Count),
            Command::IncScore {
                key,
                options,
                entries,
            } => self.inc_score(key, options.as_ref(), entries).map(Reply::Scores),
            Command::SetInfo {
                key,
                options,
                entries,
            } => self.set_info(key, options.as_ref(), entries).map(Reply::Count),
            Command::GetRange {
                key,
                options,
                start,
                stop,
            } => self
                .get_range(key, options.as_ref(), *start, *stop)
                .map(Reply::Entries),
            Command::GetById { key, options, id } => {
                self.get_by_id(key, options.as_ref(), id).map(Reply::Entry)
            }
            Command::Append {
                key,
                options,
                entries,
            } => self.append(key, options.as_ref(), entries).map(Reply::Count),
            Command::SwapById {
                key,
                options,
                id_a,
                id_b,
            } => self
                .swap_by_id(key, options.as_ref(), id_a, id_b)
                .map(Reply::Count),
            Command::SwapByRank {
                key,
                options,
                rank_a,
                rank_b,
            } => self
                .swap_by_rank(key, options.as_ref(), *rank_a, *rank_b)
                .map(Reply::Count),
        }
    }

    /// Decode a JSON command, run it and encode the reply
    ///
    /// Undecodable input fails before any unit starts.
    pub fn dispatch_json(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let command = Command::from_json(bytes)?;
        let reply = self.dispatch(&command)?;
        serde_json::to_vec(&reply).map_err(|e| TallyError::Serialization(e.to_string()))
    }
}
