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

//! Maintenance layer for basin tables.
//!
//! Two operations live here:
//!
//! - **Clean**: [`clean::CleanPlanExecutor`] takes a precomputed
//!   [`clean::CleanerPlan`], deletes the listed files through an injected
//!   [`engine::ExecutionContext`], and reports one [`clean::CleanStat`] per
//!   partition. Individual delete failures are recorded, never fatal.
//! - **Version transitions**: [`version::UpgradeDowngrade`] moves a table
//!   across adjacent [`spec::TableVersion`] steps by dispatching to
//!   registered transition handlers and committing properties and version
//!   marker atomically.

#![deny(missing_docs)]

mod error;

pub mod clean;
pub mod config;
pub mod engine;
pub mod io;
pub mod metadata;
pub mod spec;
pub mod version;

pub use error::{Error, ErrorKind, Result};
