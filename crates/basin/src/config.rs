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

//! Configuration for maintenance operations.

use std::collections::HashMap;

use crate::clean::CleanerPolicy;
use crate::spec::TableProperties;
use crate::{Error, ErrorKind, Result};

/// Configuration consumed by the clean executor and the version transition
/// handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceConfig {
    /// Retention policy token recorded into every finalized clean stat.
    pub cleaner_policy: CleanerPolicy,
    /// Maximum number of delete calls in flight during a clean run.
    pub max_concurrent_deletes: usize,
    /// Partition field names, persisted by the one-to-two upgrade.
    pub partition_fields: Vec<String>,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            cleaner_policy: CleanerPolicy::default(),
            max_concurrent_deletes:
                TableProperties::PROPERTY_CLEAN_MAX_CONCURRENT_DELETES_DEFAULT,
            partition_fields: Vec::new(),
        }
    }
}

impl MaintenanceConfig {
    /// Build a config from a table property map, falling back to defaults
    /// for absent keys.
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self> {
        let typed = TableProperties::try_from(properties)?;
        let cleaner_policy = match properties.get(TableProperties::PROPERTY_CLEANER_POLICY) {
            Some(raw) => raw.parse()?,
            None => CleanerPolicy::default(),
        };
        let partition_fields = properties
            .get(TableProperties::PROPERTY_PARTITION_FIELDS)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        if typed.clean_max_concurrent_deletes == 0 {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                "max concurrent deletes must be at least 1",
            ));
        }

        Ok(Self {
            cleaner_policy,
            max_concurrent_deletes: typed.clean_max_concurrent_deletes,
            partition_fields,
        })
    }
}
