// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Instants: points in the table's commit history.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp format used for instant times, millisecond precision.
const INSTANT_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";

/// The kind of action an instant records on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// A regular write commit.
    Commit,
    /// An incremental (delta) commit.
    DeltaCommit,
    /// A clean action.
    Clean,
    /// A compaction of file versions.
    Compaction,
    /// A replace of existing file groups.
    Replace,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionKind::Commit => "commit",
            ActionKind::DeltaCommit => "deltacommit",
            ActionKind::Clean => "clean",
            ActionKind::Compaction => "compaction",
            ActionKind::Replace => "replace",
        };
        f.write_str(s)
    }
}

/// Lifecycle state of an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InstantState {
    /// The action has been requested but not started.
    Requested,
    /// The action is in flight.
    Inflight,
    /// The action has completed.
    Completed,
}

/// A point in the table's commit history: action kind, lifecycle state and
/// timestamp.
///
/// The timestamp is an opaque, lexicographically ordered string in
/// `yyyyMMddHHmmssSSS` form. The cleaner copies the plan's
/// earliest-instant-to-retain into every finalized [`CleanStat`]
/// (see [`crate::clean::CleanStat`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionInstant {
    /// Kind of the recorded action.
    pub action: ActionKind,
    /// Lifecycle state at the time of reference.
    pub state: InstantState,
    /// Instant time, `yyyyMMddHHmmssSSS`.
    pub timestamp: String,
}

impl ActionInstant {
    /// Create an instant in the completed state.
    pub fn completed(action: ActionKind, timestamp: impl Into<String>) -> Self {
        Self {
            action,
            state: InstantState::Completed,
            timestamp: timestamp.into(),
        }
    }

    /// Parse the instant time into a UTC datetime, if it is well formed.
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(&self.timestamp, INSTANT_TIMESTAMP_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }
}

impl fmt::Display for ActionInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}__{}__{:?}]", self.timestamp, self.action, self.state)
    }
}
