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

use std::collections::HashMap;

use crate::{Error, ErrorKind};

// Helper function to parse a property from a HashMap
// If the property is not found, use the default value
fn parse_property<T: std::str::FromStr>(
    properties: &HashMap<String, String>,
    key: &str,
    default: T,
) -> std::result::Result<T, anyhow::Error>
where
    <T as std::str::FromStr>::Err: std::fmt::Display,
{
    properties.get(key).map_or(Ok(default), |value| {
        value
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value for {key}: {e}"))
    })
}

/// TableProperties that contains the typed maintenance properties of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableProperties {
    /// Layout revision of the timeline directory.
    pub timeline_layout_version: u32,
    /// Whether record-level meta fields are populated on write.
    pub populate_meta_fields: bool,
    /// Maximum number of concurrent delete calls during a clean run.
    pub clean_max_concurrent_deletes: usize,
}

impl TableProperties {
    /// Property key for the timeline layout revision.
    pub const PROPERTY_TIMELINE_LAYOUT_VERSION: &str = "basin.timeline.layout-version";
    /// Default value for the timeline layout revision.
    pub const PROPERTY_TIMELINE_LAYOUT_VERSION_DEFAULT: u32 = 0;

    /// Property key for the comma-separated partition field list.
    pub const PROPERTY_PARTITION_FIELDS: &str = "basin.table.partition-fields";
    /// Default value for the partition field list.
    pub const PROPERTY_PARTITION_FIELDS_DEFAULT: &str = "";

    /// Property key for whether meta fields are populated on write.
    pub const PROPERTY_POPULATE_META_FIELDS: &str = "basin.table.populate-meta-fields";
    /// Default value for meta field population.
    pub const PROPERTY_POPULATE_META_FIELDS_DEFAULT: bool = true;

    /// Property key for the cleaner retention policy.
    pub const PROPERTY_CLEANER_POLICY: &str = "basin.clean.policy";

    /// Property key for max concurrent delete calls during cleaning.
    pub const PROPERTY_CLEAN_MAX_CONCURRENT_DELETES: &str = "basin.clean.max-concurrent-deletes";
    /// Default value for max concurrent delete calls.
    pub const PROPERTY_CLEAN_MAX_CONCURRENT_DELETES_DEFAULT: usize = 16;
}

impl TryFrom<&HashMap<String, String>> for TableProperties {
    type Error = Error;

    fn try_from(properties: &HashMap<String, String>) -> Result<Self, Error> {
        Ok(TableProperties {
            timeline_layout_version: parse_property(
                properties,
                TableProperties::PROPERTY_TIMELINE_LAYOUT_VERSION,
                TableProperties::PROPERTY_TIMELINE_LAYOUT_VERSION_DEFAULT,
            )
            .map_err(map_parse_error)?,
            populate_meta_fields: parse_property(
                properties,
                TableProperties::PROPERTY_POPULATE_META_FIELDS,
                TableProperties::PROPERTY_POPULATE_META_FIELDS_DEFAULT,
            )
            .map_err(map_parse_error)?,
            clean_max_concurrent_deletes: parse_property(
                properties,
                TableProperties::PROPERTY_CLEAN_MAX_CONCURRENT_DELETES,
                TableProperties::PROPERTY_CLEAN_MAX_CONCURRENT_DELETES_DEFAULT,
            )
            .map_err(map_parse_error)?,
        })
    }
}

fn map_parse_error(e: anyhow::Error) -> Error {
    Error::new(ErrorKind::DataInvalid, "invalid table property").with_source(e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_map() {
        let props = HashMap::new();
        let parsed = TableProperties::try_from(&props).unwrap();

        assert_eq!(
            parsed.timeline_layout_version,
            TableProperties::PROPERTY_TIMELINE_LAYOUT_VERSION_DEFAULT
        );
        assert!(parsed.populate_meta_fields);
        assert_eq!(
            parsed.clean_max_concurrent_deletes,
            TableProperties::PROPERTY_CLEAN_MAX_CONCURRENT_DELETES_DEFAULT
        );
    }

    #[test]
    fn test_parses_overrides() {
        let mut props = HashMap::new();
        props.insert(
            TableProperties::PROPERTY_TIMELINE_LAYOUT_VERSION.to_string(),
            "1".to_string(),
        );
        props.insert(
            TableProperties::PROPERTY_CLEAN_MAX_CONCURRENT_DELETES.to_string(),
            "64".to_string(),
        );

        let parsed = TableProperties::try_from(&props).unwrap();
        assert_eq!(parsed.timeline_layout_version, 1);
        assert_eq!(parsed.clean_max_concurrent_deletes, 64);
    }

    #[test]
    fn test_invalid_value_is_rejected() {
        let mut props = HashMap::new();
        props.insert(
            TableProperties::PROPERTY_CLEAN_MAX_CONCURRENT_DELETES.to_string(),
            "many".to_string(),
        );

        let err = TableProperties::try_from(&props).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::DataInvalid);
    }
}
