//! Record store: persistence of sighting metadata and attachment references.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use common::BlobName;
use sea_orm::*;
use uuid::Uuid;

use crate::entity::sighting;

/// Scalar metadata of a sighting, as replaced wholesale by an update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SightingMetadata {
    pub name: Option<String>,
    pub species: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// What an update does to one attachment reference.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RefUpdate {
    #[default]
    Keep,
    Set(BlobName),
    Clear,
}

#[derive(Debug, thiserror::Error)]
pub enum RecordStoreError {
    #[error("sighting {0} not found")]
    NotFound(Uuid),
    #[error("record store unavailable: {0}")]
    Unavailable(#[from] DbErr),
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a new record. `observed_at` defaults to the creation time.
    async fn create(
        &self,
        metadata: SightingMetadata,
        observed_at: Option<DateTime<Utc>>,
        photo: Option<BlobName>,
        audio: Option<BlobName>,
    ) -> Result<sighting::Model, RecordStoreError>;

    async fn get(&self, id: Uuid) -> Result<sighting::Model, RecordStoreError>;

    /// All records, newest `observed_at` first, ties broken by id (descending).
    async fn list(&self) -> Result<Vec<sighting::Model>, RecordStoreError>;

    /// Replace the scalar metadata and apply the reference updates.
    /// `observed_at` is never touched.
    async fn update(
        &self,
        id: Uuid,
        metadata: SightingMetadata,
        photo: RefUpdate,
        audio: RefUpdate,
    ) -> Result<sighting::Model, RecordStoreError>;

    /// Remove a record and return its last state.
    async fn delete(&self, id: Uuid) -> Result<sighting::Model, RecordStoreError>;

    /// Every blob name referenced by any record.
    async fn referenced_blobs(&self) -> Result<HashSet<String>, RecordStoreError>;
}

/// [`RecordStore`] backed by a sea-orm connection (PostgreSQL or SQLite).
#[derive(Clone)]
pub struct SeaOrmRecordStore {
    db: DatabaseConnection,
}

impl SeaOrmRecordStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Timestamps are kept at microsecond precision so every backend round-trips
/// them unchanged.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn apply_ref(target: &mut ActiveValue<Option<String>>, update: RefUpdate) {
    match update {
        RefUpdate::Keep => {}
        RefUpdate::Set(name) => *target = Set(Some(name.to_string())),
        RefUpdate::Clear => *target = Set(None),
    }
}

#[async_trait]
impl RecordStore for SeaOrmRecordStore {
    async fn create(
        &self,
        metadata: SightingMetadata,
        observed_at: Option<DateTime<Utc>>,
        photo: Option<BlobName>,
        audio: Option<BlobName>,
    ) -> Result<sighting::Model, RecordStoreError> {
        let now = now();
        let new_sighting = sighting::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(metadata.name),
            species: Set(metadata.species),
            description: Set(metadata.description),
            notes: Set(metadata.notes),
            latitude: Set(metadata.latitude),
            longitude: Set(metadata.longitude),
            city: Set(metadata.city),
            country: Set(metadata.country),
            observed_at: Set(observed_at.map(|t| t.trunc_subsecs(6)).unwrap_or(now)),
            photo: Set(photo.map(|n| n.to_string())),
            audio: Set(audio.map(|n| n.to_string())),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(new_sighting.insert(&self.db).await?)
    }

    async fn get(&self, id: Uuid) -> Result<sighting::Model, RecordStoreError> {
        sighting::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(RecordStoreError::NotFound(id))
    }

    async fn list(&self) -> Result<Vec<sighting::Model>, RecordStoreError> {
        Ok(sighting::Entity::find()
            .order_by_desc(sighting::Column::ObservedAt)
            .order_by_desc(sighting::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn update(
        &self,
        id: Uuid,
        metadata: SightingMetadata,
        photo: RefUpdate,
        audio: RefUpdate,
    ) -> Result<sighting::Model, RecordStoreError> {
        let txn = self.db.begin().await?;

        let Some(existing) = sighting::Entity::find_by_id(id).one(&txn).await? else {
            txn.rollback().await?;
            return Err(RecordStoreError::NotFound(id));
        };

        let mut active: sighting::ActiveModel = existing.into();
        active.name = Set(metadata.name);
        active.species = Set(metadata.species);
        active.description = Set(metadata.description);
        active.notes = Set(metadata.notes);
        active.latitude = Set(metadata.latitude);
        active.longitude = Set(metadata.longitude);
        active.city = Set(metadata.city);
        active.country = Set(metadata.country);
        apply_ref(&mut active.photo, photo);
        apply_ref(&mut active.audio, audio);
        active.updated_at = Set(now());

        let updated = active.update(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<sighting::Model, RecordStoreError> {
        let txn = self.db.begin().await?;

        let Some(existing) = sighting::Entity::find_by_id(id).one(&txn).await? else {
            txn.rollback().await?;
            return Err(RecordStoreError::NotFound(id));
        };

        sighting::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(existing)
    }

    async fn referenced_blobs(&self) -> Result<HashSet<String>, RecordStoreError> {
        let refs: Vec<(Option<String>, Option<String>)> = sighting::Entity::find()
            .select_only()
            .column(sighting::Column::Photo)
            .column(sighting::Column::Audio)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(refs
            .into_iter()
            .flat_map(|(photo, audio)| photo.into_iter().chain(audio))
            .collect())
    }
}
