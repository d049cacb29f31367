// src/models/photos.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Os dois rastreadores de anexos têm a mesma forma; só muda onde ficam
/// os arquivos e qual indicador da ordem eles alimentam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PhotoKind {
    Evidence,
    Guide,
}

impl PhotoKind {
    pub fn table(&self) -> &'static str {
        match self {
            PhotoKind::Evidence => "evidence_photos",
            PhotoKind::Guide => "guide_photos",
        }
    }

    pub fn directory(&self) -> &'static str {
        match self {
            PhotoKind::Evidence => "fotos_recojo",
            PhotoKind::Guide => "fotos_guia_recojo",
        }
    }

    pub fn file_prefix(&self) -> &'static str {
        match self {
            PhotoKind::Evidence => "foto",
            PhotoKind::Guide => "guia",
        }
    }

    /// Pasta com todos os arquivos deste tipo para uma ordem.
    pub fn order_directory(&self, order_id: i64) -> String {
        format!("{}/orden_{}", self.directory(), order_id)
    }

    /// Coluna derivada da ordem que acompanha a contagem deste tipo.
    pub fn order_flag_column(&self) -> &'static str {
        match self {
            PhotoKind::Evidence => "has_photo_evidence",
            PhotoKind::Guide => "has_pickup_guide_photo",
        }
    }

    pub fn event_prefix(&self) -> &'static str {
        match self {
            PhotoKind::Evidence => "evidence_photo",
            PhotoKind::Guide => "guide_photo",
        }
    }

    pub fn added_event(&self) -> String {
        format!("{}_added", self.event_prefix())
    }

    pub fn removed_event(&self) -> String {
        format!("{}_removed", self.event_prefix())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: i64,
    pub order_id: i64,
    #[schema(example = "foto_20250301_101500_123456.jpg")]
    pub file_name: String,
    #[schema(example = "fotos_recojo/orden_12/foto_20250301_101500_123456.jpg")]
    pub relative_path: String,
    pub captured_at: DateTime<Utc>,
    pub size_bytes: i64,
}

#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub order_id: i64,
    pub file_name: String,
    pub relative_path: String,
    pub captured_at: DateTime<Utc>,
    pub size_bytes: i64,
}
