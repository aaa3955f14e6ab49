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

//! Version transition handlers and their registry.
//!
//! Each handler migrates table state across exactly one adjacent version
//! step. Handlers compute the property changes the step requires and return
//! them; the engine merges them into metadata and commits. Every upgrade
//! handler has an inverse downgrade handler that restores the prior
//! property values.

use std::collections::HashMap;
use std::fmt;

use crate::config::MaintenanceConfig;
use crate::metadata::TableMetadata;
use crate::spec::{TableProperties, TableVersion};
use crate::{Error, ErrorKind, Result};

/// Property changes produced by a transition handler.
pub type PropertyMap = HashMap<String, String>;

/// Direction of a version transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Moving to a higher version.
    Upgrade,
    /// Moving to a lower version.
    Downgrade,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Upgrade => "upgrade",
            Direction::Downgrade => "downgrade",
        })
    }
}

/// Handler for one adjacent upgrade step.
pub trait UpgradeHandler: Send + Sync {
    /// Compute the property changes this upgrade step requires.
    fn upgrade(
        &self,
        config: &MaintenanceConfig,
        metadata: &TableMetadata,
        instant_time: &str,
    ) -> Result<PropertyMap>;
}

/// Handler for one adjacent downgrade step.
pub trait DowngradeHandler: Send + Sync {
    /// Compute the property changes this downgrade step requires.
    fn downgrade(
        &self,
        config: &MaintenanceConfig,
        metadata: &TableMetadata,
        instant_time: &str,
    ) -> Result<PropertyMap>;
}

/// Upgrade from version zero to one: moves the timeline to layout
/// revision 1.
pub struct ZeroToOneUpgradeHandler;

impl UpgradeHandler for ZeroToOneUpgradeHandler {
    fn upgrade(
        &self,
        _config: &MaintenanceConfig,
        _metadata: &TableMetadata,
        _instant_time: &str,
    ) -> Result<PropertyMap> {
        Ok(HashMap::from([(
            TableProperties::PROPERTY_TIMELINE_LAYOUT_VERSION.to_string(),
            "1".to_string(),
        )]))
    }
}

/// Downgrade from version one to zero: restores timeline layout
/// revision 0.
pub struct OneToZeroDowngradeHandler;

impl DowngradeHandler for OneToZeroDowngradeHandler {
    fn downgrade(
        &self,
        _config: &MaintenanceConfig,
        _metadata: &TableMetadata,
        _instant_time: &str,
    ) -> Result<PropertyMap> {
        Ok(HashMap::from([(
            TableProperties::PROPERTY_TIMELINE_LAYOUT_VERSION.to_string(),
            TableProperties::PROPERTY_TIMELINE_LAYOUT_VERSION_DEFAULT.to_string(),
        )]))
    }
}

/// Upgrade from version one to two: persists the configured partition
/// fields into table properties.
pub struct OneToTwoUpgradeHandler;

impl UpgradeHandler for OneToTwoUpgradeHandler {
    fn upgrade(
        &self,
        config: &MaintenanceConfig,
        _metadata: &TableMetadata,
        _instant_time: &str,
    ) -> Result<PropertyMap> {
        Ok(HashMap::from([(
            TableProperties::PROPERTY_PARTITION_FIELDS.to_string(),
            config.partition_fields.join(","),
        )]))
    }
}

/// Downgrade from version two to one: clears the persisted partition
/// fields.
pub struct TwoToOneDowngradeHandler;

impl DowngradeHandler for TwoToOneDowngradeHandler {
    fn downgrade(
        &self,
        _config: &MaintenanceConfig,
        _metadata: &TableMetadata,
        _instant_time: &str,
    ) -> Result<PropertyMap> {
        Ok(HashMap::from([(
            TableProperties::PROPERTY_PARTITION_FIELDS.to_string(),
            TableProperties::PROPERTY_PARTITION_FIELDS_DEFAULT.to_string(),
        )]))
    }
}

/// Registry of transition handlers keyed by `(from, to)` version codes.
///
/// Only adjacent pairs are registrable. Resolution failures are reported by
/// the engine as unsupported transitions, never by panicking dispatch.
pub struct TransitionRegistry {
    upgrades: HashMap<(i32, i32), Box<dyn UpgradeHandler>>,
    downgrades: HashMap<(i32, i32), Box<dyn DowngradeHandler>>,
}

impl TransitionRegistry {
    /// Create a registry with no handlers.
    pub fn empty() -> Self {
        Self {
            upgrades: HashMap::new(),
            downgrades: HashMap::new(),
        }
    }

    /// Register an upgrade handler for the adjacent step `from -> to`.
    pub fn register_upgrade(
        &mut self,
        from: TableVersion,
        to: TableVersion,
        handler: Box<dyn UpgradeHandler>,
    ) -> Result<()> {
        if to.code() != from.code() + 1 {
            return Err(non_adjacent_registration(from, to, Direction::Upgrade));
        }
        self.upgrades.insert((from.code(), to.code()), handler);
        Ok(())
    }

    /// Register a downgrade handler for the adjacent step `from -> to`.
    pub fn register_downgrade(
        &mut self,
        from: TableVersion,
        to: TableVersion,
        handler: Box<dyn DowngradeHandler>,
    ) -> Result<()> {
        if to.code() != from.code() - 1 {
            return Err(non_adjacent_registration(from, to, Direction::Downgrade));
        }
        self.downgrades.insert((from.code(), to.code()), handler);
        Ok(())
    }

    /// Look up the upgrade handler for `from -> to`, if registered.
    pub fn resolve_upgrade(
        &self,
        from: TableVersion,
        to: TableVersion,
    ) -> Option<&dyn UpgradeHandler> {
        self.upgrades
            .get(&(from.code(), to.code()))
            .map(Box::as_ref)
    }

    /// Look up the downgrade handler for `from -> to`, if registered.
    pub fn resolve_downgrade(
        &self,
        from: TableVersion,
        to: TableVersion,
    ) -> Option<&dyn DowngradeHandler> {
        self.downgrades
            .get(&(from.code(), to.code()))
            .map(Box::as_ref)
    }
}

fn non_adjacent_registration(from: TableVersion, to: TableVersion, direction: Direction) -> Error {
    Error::new(
        ErrorKind::PreconditionFailed,
        "transition handlers must cover exactly one adjacent step",
    )
    .with_context("from", from.code().to_string())
    .with_context("to", to.code().to_string())
    .with_context("direction", direction.to_string())
}

impl Default for TransitionRegistry {
    /// Registry covering the transitions shipped with this crate:
    /// `0 <-> 1` and `1 <-> 2`.
    fn default() -> Self {
        let mut upgrades: HashMap<(i32, i32), Box<dyn UpgradeHandler>> = HashMap::new();
        upgrades.insert((0, 1), Box::new(ZeroToOneUpgradeHandler));
        upgrades.insert((1, 2), Box::new(OneToTwoUpgradeHandler));

        let mut downgrades: HashMap<(i32, i32), Box<dyn DowngradeHandler>> = HashMap::new();
        downgrades.insert((1, 0), Box::new(OneToZeroDowngradeHandler));
        downgrades.insert((2, 1), Box::new(TwoToOneDowngradeHandler));

        Self {
            upgrades,
            downgrades,
        }
    }
}
