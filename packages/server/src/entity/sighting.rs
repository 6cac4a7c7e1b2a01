use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sighting")]
pub struct Model {
    /// UUIDv7 primary key, assigned by the record store.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: Option<String>,
    pub species: String,
    pub description: Option<String>,
    pub notes: Option<String>,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub city: Option<String>,
    pub country: Option<String>,

    /// Set once at creation.
    pub observed_at: DateTimeUtc,

    /// Blob name of the photo attachment.
    pub photo: Option<String>,
    /// Blob name of the audio attachment.
    pub audio: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
