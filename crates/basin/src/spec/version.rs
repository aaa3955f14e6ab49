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

//! Table format versions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, ErrorKind, Result};

/// On-disk metadata schema revision of a table.
///
/// Versions form a total order over a small closed set of integer codes.
/// Version transitions are driven one adjacent step at a time by the
/// upgrade/downgrade engine; see [`crate::version::UpgradeDowngrade`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum TableVersion {
    /// The original layout.
    Zero,
    /// Adds the versioned timeline layout.
    One,
    /// Adds persisted partition fields and meta-field bookkeeping.
    Two,
    /// Reserved for the next layout revision.
    Three,
}

impl TableVersion {
    /// Integer code persisted in table metadata.
    pub fn code(self) -> i32 {
        match self {
            TableVersion::Zero => 0,
            TableVersion::One => 1,
            TableVersion::Two => 2,
            TableVersion::Three => 3,
        }
    }

    /// Resolve a persisted integer code into a version.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(TableVersion::Zero),
            1 => Ok(TableVersion::One),
            2 => Ok(TableVersion::Two),
            3 => Ok(TableVersion::Three),
            _ => Err(
                Error::new(ErrorKind::DataInvalid, "unknown table version code")
                    .with_context("code", code.to_string()),
            ),
        }
    }

    /// The newest version this crate understands.
    pub fn latest() -> Self {
        TableVersion::Three
    }

    /// Whether `other` is exactly one version step away.
    pub fn is_adjacent(self, other: TableVersion) -> bool {
        (self.code() - other.code()).abs() == 1
    }
}

impl fmt::Display for TableVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<TableVersion> for i32 {
    fn from(value: TableVersion) -> Self {
        value.code()
    }
}

impl TryFrom<i32> for TableVersion {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        TableVersion::from_code(value)
    }
}
