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

//! The upgrade/downgrade engine.
//!
//! One `run` performs at most one adjacent version step: load metadata,
//! dispatch to the registered handler for the requested step, merge the
//! returned properties and commit the new snapshot together with the new
//! version marker. A request for the current version is a no-op; a request
//! the registry cannot serve fails before any state is touched.

use tracing::{debug, info};

use crate::config::MaintenanceConfig;
use crate::metadata::{MetadataStore, TableMetadata};
use crate::spec::TableVersion;
use crate::version::handler::{Direction, PropertyMap, TransitionRegistry};
use crate::{Error, ErrorKind, Result};

/// Drives single-step table version transitions against a metadata store.
pub struct UpgradeDowngrade<S> {
    store: S,
    config: MaintenanceConfig,
    registry: TransitionRegistry,
}

impl<S: MetadataStore> UpgradeDowngrade<S> {
    /// Create an engine with the handlers shipped in
    /// [`TransitionRegistry::default`].
    pub fn new(store: S, config: MaintenanceConfig) -> Self {
        Self::with_registry(store, config, TransitionRegistry::default())
    }

    /// Create an engine over a custom handler registry.
    pub fn with_registry(
        store: S,
        config: MaintenanceConfig,
        registry: TransitionRegistry,
    ) -> Self {
        Self {
            store,
            config,
            registry,
        }
    }

    /// Transition the table to `to_version` and return the version the table
    /// ends at.
    ///
    /// Returns the current version unchanged when the table is already
    /// there. Fails with [`ErrorKind::UnsupportedVersionTransition`] when the
    /// requested step is not adjacent or has no registered handler, and with
    /// [`ErrorKind::MigrationFailed`] when loading, migrating or committing
    /// fails partway.
    pub async fn run(&self, to_version: TableVersion, instant_time: &str) -> Result<TableVersion> {
        let mut metadata = self
            .store
            .load()
            .await
            .map_err(|e| migration_failed("failed to load table metadata", to_version, e))?;
        let from_version = metadata.version;

        if from_version == to_version {
            debug!(version = %from_version, "table already at requested version");
            return Ok(from_version);
        }

        let direction = if to_version.code() > from_version.code() {
            Direction::Upgrade
        } else {
            Direction::Downgrade
        };
        debug!(
            from = %from_version,
            to = %to_version,
            %direction,
            instant = instant_time,
            "running version transition"
        );

        let changes = self.migrate(from_version, to_version, direction, &metadata, instant_time)?;

        // Properties and version marker move in one commit.
        metadata.properties.extend(changes);
        metadata.version = to_version;
        self.store
            .commit(&metadata)
            .await
            .map_err(|e| migration_failed("failed to commit migrated metadata", to_version, e))?;

        info!(from = %from_version, to = %to_version, "version transition committed");
        Ok(to_version)
    }

    fn migrate(
        &self,
        from_version: TableVersion,
        to_version: TableVersion,
        direction: Direction,
        metadata: &TableMetadata,
        instant_time: &str,
    ) -> Result<PropertyMap> {
        let handler_result = match direction {
            Direction::Upgrade => self
                .registry
                .resolve_upgrade(from_version, to_version)
                .map(|handler| handler.upgrade(&self.config, metadata, instant_time)),
            Direction::Downgrade => self
                .registry
                .resolve_downgrade(from_version, to_version)
                .map(|handler| handler.downgrade(&self.config, metadata, instant_time)),
        };

        match handler_result {
            Some(result) => {
                result.map_err(|e| migration_failed("transition handler failed", to_version, e))
            }
            None => Err(Error::new(
                ErrorKind::UnsupportedVersionTransition,
                "no handler registered for the requested version step",
            )
            .with_context("from", from_version.code().to_string())
            .with_context("to", to_version.code().to_string())
            .with_context("direction", direction.to_string())),
        }
    }
}

fn migration_failed(message: &'static str, to_version: TableVersion, source: Error) -> Error {
    Error::new(ErrorKind::MigrationFailed, message)
        .with_context("to", to_version.code().to_string())
        .with_source(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MemoryMetadataStore;
    use crate::spec::TableProperties;

    fn engine(store: MemoryMetadataStore) -> UpgradeDowngrade<MemoryMetadataStore> {
        UpgradeDowngrade::new(store, MaintenanceConfig::default())
    }

    #[tokio::test]
    async fn test_run_to_current_version_is_noop() {
        let engine = engine(MemoryMetadataStore::new(TableMetadata::new()));
        let ended_at = engine
            .run(TableVersion::Zero, "20260828103045123")
            .await
            .unwrap();
        assert_eq!(ended_at, TableVersion::Zero);
    }

    #[tokio::test]
    async fn test_upgrade_then_downgrade_restores_properties() {
        let original = TableMetadata::new();
        let original_properties = original.properties.clone();
        let engine = engine(MemoryMetadataStore::new(original));

        engine
            .run(TableVersion::One, "20260828103045123")
            .await
            .unwrap();
        let upgraded = engine.store.load().await.unwrap();
        assert_eq!(upgraded.version, TableVersion::One);
        assert_eq!(
            upgraded
                .properties
                .get(TableProperties::PROPERTY_TIMELINE_LAYOUT_VERSION),
            Some(&"1".to_string())
        );

        engine
            .run(TableVersion::Zero, "20260828103045124")
            .await
            .unwrap();
        let downgraded = engine.store.load().await.unwrap();
        assert_eq!(downgraded.version, TableVersion::Zero);
        assert_eq!(downgraded.properties, original_properties);
    }

    #[tokio::test]
    async fn test_partition_fields_persisted_on_upgrade_to_two() {
        let mut metadata = TableMetadata::new();
        metadata.version = TableVersion::One;
        let config = MaintenanceConfig {
            partition_fields: vec!["region".to_string(), "day".to_string()],
            ..MaintenanceConfig::default()
        };
        let engine = UpgradeDowngrade::new(MemoryMetadataStore::new(metadata), config);

        engine
            .run(TableVersion::Two, "20260828103045123")
            .await
            .unwrap();
        let upgraded = engine.store.load().await.unwrap();
        assert_eq!(
            upgraded
                .properties
                .get(TableProperties::PROPERTY_PARTITION_FIELDS),
            Some(&"region,day".to_string())
        );
    }

    #[tokio::test]
    async fn test_non_adjacent_transition_rejected_without_side_effects() {
        let engine = engine(MemoryMetadataStore::new(TableMetadata::new()));
        let err = engine
            .run(TableVersion::Two, "20260828103045123")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedVersionTransition);
        assert_eq!(err.context_value("from"), Some("0"));
        assert_eq!(err.context_value("to"), Some("2"));

        let untouched = engine.store.load().await.unwrap();
        assert_eq!(untouched.version, TableVersion::Zero);
    }

    #[tokio::test]
    async fn test_adjacent_but_unregistered_step_rejected() {
        let mut metadata = TableMetadata::new();
        metadata.version = TableVersion::Two;
        let engine = engine(MemoryMetadataStore::new(metadata));

        let err = engine
            .run(TableVersion::Three, "20260828103045123")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedVersionTransition);
    }

    #[tokio::test]
    async fn test_commit_failure_surfaces_as_migration_failed() {
        let store = MemoryMetadataStore::new(TableMetadata::new());
        store.fail_commits(true);
        let engine = engine(store);

        let err = engine
            .run(TableVersion::One, "20260828103045123")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MigrationFailed);
        assert_eq!(err.context_value("to"), Some("1"));

        // The persisted snapshot is unchanged after the failed commit.
        let untouched = engine.store.load().await.unwrap();
        assert_eq!(untouched.version, TableVersion::Zero);
    }
}
