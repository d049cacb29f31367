// src/services/evidence_service.rs

use chrono::{DateTime, Local, Utc};
use serde_json::json;
use std::{path::Path, sync::Arc};

use crate::{
    common::error::AppError,
    db::store::{RecordStore, StoreTx},
    models::photos::{NewPhoto, Photo, PhotoKind},
    realtime::NotificationBus,
    storage::BlobStore,
};

pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// Extensão em minúsculas, se estiver na lista permitida.
pub fn allowed_extension(filename: &str) -> Option<String> {
    let ext = Path::new(filename).extension()?.to_str()?.to_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

// Rastreador das fotos de recojo e das fotos de guia.
// Anexar: arquivo primeiro, depois a linha no banco; se o banco falhar, o arquivo é apagado.
// Remover: linha e arquivo saem na mesma transação, arquivo antes do commit.
#[derive(Clone)]
pub struct EvidenceService {
    store: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    bus: NotificationBus,
}

impl EvidenceService {
    pub fn new(store: Arc<dyn RecordStore>, blobs: Arc<dyn BlobStore>, bus: NotificationBus) -> Self {
        Self { store, blobs, bus }
    }

    pub async fn attach(
        &self,
        order_id: i64,
        kind: PhotoKind,
        bytes: &[u8],
        filename: &str,
    ) -> Result<Photo, AppError> {
        let ext = allowed_extension(filename).ok_or_else(|| {
            AppError::UnsupportedMedia(format!(
                "Formato não permitido. Use: {}",
                ALLOWED_EXTENSIONS.join(", ")
            ))
        })?;

        // A ordem precisa existir antes de qualquer arquivo ser gravado.
        {
            let mut tx = self.store.begin().await?;
            if tx.find_order(order_id).await?.is_none() {
                return Err(AppError::NotFound("Ordem".into()));
            }
        }

        let captured_at = Utc::now();
        let (file_name, relative_path) = self.unique_name(order_id, kind, &ext, captured_at).await?;
        self.blobs.save(&relative_path, bytes).await?;

        let new_photo = NewPhoto {
            order_id,
            file_name,
            relative_path: relative_path.clone(),
            captured_at,
            size_bytes: bytes.len() as i64,
        };
        let photo = match self.record(kind, &new_photo).await {
            Ok(photo) => photo,
            Err(e) => {
                tracing::error!("🔥 Falha ao registrar {} da ordem {}: {}", relative_path, order_id, e);
                if let Err(cleanup) = self.blobs.delete(&relative_path).await {
                    tracing::warn!("Arquivo órfão {} não pôde ser removido: {}", relative_path, cleanup);
                }
                return Err(e);
            }
        };

        tracing::info!("📸 {} anexada à ordem {} ({} bytes)", photo.file_name, order_id, photo.size_bytes);
        self.bus.publish_order(
            order_id,
            &kind.added_event(),
            json!({ "photoId": photo.id, "fileName": photo.file_name }),
        );
        Ok(photo)
    }

    pub async fn list(&self, order_id: i64, kind: PhotoKind) -> Result<Vec<Photo>, AppError> {
        let mut tx = self.store.begin().await?;
        tx.list_photos(kind, order_id).await
    }

    pub async fn delete(&self, order_id: i64, photo_id: i64, kind: PhotoKind) -> Result<(), AppError> {
        let mut tx = self.store.begin().await?;
        let photo = tx
            .find_photo(kind, photo_id)
            .await?
            .filter(|p| p.order_id == order_id)
            .ok_or_else(|| AppError::NotFound("Foto".into()))?;

        tx.delete_photo(kind, photo_id).await?;
        refresh_flag(tx.as_mut(), kind, order_id).await?;

        // O arquivo sai antes do commit: se o disco falhar, a linha volta com o rollback.
        if !self.blobs.delete(&photo.relative_path).await? {
            tracing::warn!("Arquivo {} já não existia no disco", photo.relative_path);
        }
        tx.commit().await?;

        tracing::info!("🗑️ {} removida da ordem {}", photo.file_name, order_id);
        self.bus
            .publish_order(order_id, &kind.removed_event(), json!({ "photoId": photo_id }));
        Ok(())
    }

    async fn record(&self, kind: PhotoKind, photo: &NewPhoto) -> Result<Photo, AppError> {
        let mut tx = self.store.begin().await?;
        // A ordem pode ter sido apagada enquanto o arquivo era gravado.
        if tx.find_order(photo.order_id).await?.is_none() {
            return Err(AppError::NotFound("Ordem".into()));
        }
        let created = tx.insert_photo(kind, photo).await?;
        refresh_flag(tx.as_mut(), kind, photo.order_id).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn unique_name(
        &self,
        order_id: i64,
        kind: PhotoKind,
        ext: &str,
        captured_at: DateTime<Utc>,
    ) -> Result<(String, String), AppError> {
        let stamp = captured_at.with_timezone(&Local).format("%Y%m%d_%H%M%S_%6f");
        let dir = kind.order_directory(order_id);

        let mut file_name = format!("{}_{}.{}", kind.file_prefix(), stamp, ext);
        let mut suffix = 1;
        while self.blobs.exists(&format!("{}/{}", dir, file_name)).await? {
            file_name = format!("{}_{}_{}.{}", kind.file_prefix(), stamp, suffix, ext);
            suffix += 1;
        }
        let relative_path = format!("{}/{}", dir, file_name);
        Ok((file_name, relative_path))
    }
}

/// O indicador da ordem é sempre `count > 0` para o tipo.
async fn refresh_flag(tx: &mut dyn StoreTx, kind: PhotoKind, order_id: i64) -> Result<(), AppError> {
    let count = tx.count_photos(kind, order_id).await?;
    tx.set_photo_flag(kind, order_id, count > 0).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::order_service::tests::{fixture, Fixture};

    fn tracker(fx: &Fixture) -> EvidenceService {
        EvidenceService::new(Arc::new(fx.store.clone()), fx.blobs.clone(), fx.bus.clone())
    }

    async fn new_order(fx: &Fixture) -> i64 {
        fx.service.create_order(fx.input(1, 0, None)).await.unwrap().order.id
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert_eq!(allowed_extension("IMG_001.JPG").as_deref(), Some("jpg"));
        assert_eq!(allowed_extension("guia.webp").as_deref(), Some("webp"));
        assert!(allowed_extension("virus.exe").is_none());
        assert!(allowed_extension("sem_extensao").is_none());
    }

    #[tokio::test]
    async fn flag_tracks_the_attachment_count() {
        let fx = fixture().await;
        let photos = tracker(&fx);
        let order_id = new_order(&fx).await;

        let first = photos.attach(order_id, PhotoKind::Evidence, b"a", "a.jpg").await.unwrap();
        assert!(fx.order(order_id).await.has_photo_evidence);
        assert!(first.relative_path.starts_with(&format!("fotos_recojo/orden_{order_id}/foto_")));
        assert_eq!(first.size_bytes, 1);

        let second = photos.attach(order_id, PhotoKind::Evidence, b"bb", "b.png").await.unwrap();
        assert_ne!(first.relative_path, second.relative_path);

        photos.delete(order_id, first.id, PhotoKind::Evidence).await.unwrap();
        assert!(fx.order(order_id).await.has_photo_evidence);

        photos.delete(order_id, second.id, PhotoKind::Evidence).await.unwrap();
        assert!(!fx.order(order_id).await.has_photo_evidence);
        assert!(fx.blobs.paths().await.is_empty());

        photos.attach(order_id, PhotoKind::Evidence, b"c", "c.gif").await.unwrap();
        assert!(fx.order(order_id).await.has_photo_evidence);
        assert!(!fx.order(order_id).await.has_pickup_guide_photo);
    }

    #[tokio::test]
    async fn kinds_are_tracked_independently() {
        let fx = fixture().await;
        let photos = tracker(&fx);
        let order_id = new_order(&fx).await;

        let guide = photos.attach(order_id, PhotoKind::Guide, b"g", "guia.jpeg").await.unwrap();
        assert!(guide.file_name.starts_with("guia_"));
        assert!(guide.relative_path.starts_with("fotos_guia_recojo/"));

        let order = fx.order(order_id).await;
        assert!(order.has_pickup_guide_photo);
        assert!(!order.has_photo_evidence);
        assert!(photos.list(order_id, PhotoKind::Evidence).await.unwrap().is_empty());

        // Id de guia não serve para apagar uma foto de evidência.
        let err = photos.delete(order_id, guide.id, PhotoKind::Evidence).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn unsupported_extension_leaves_no_trace() {
        let fx = fixture().await;
        let photos = tracker(&fx);
        let order_id = new_order(&fx).await;
        let mut rx = fx.bus.subscribe();

        let err = photos.attach(order_id, PhotoKind::Evidence, b"MZ", "x.exe").await.unwrap_err();

        assert!(matches!(err, AppError::UnsupportedMedia(_)));
        assert!(fx.store.snapshot().await.evidence_photos.is_empty());
        assert!(fx.blobs.paths().await.is_empty());
        assert!(!fx.order(order_id).await.has_photo_evidence);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn missing_order_is_not_found() {
        let fx = fixture().await;
        let err = tracker(&fx)
            .attach(404, PhotoKind::Guide, b"g", "g.png")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(fx.blobs.paths().await.is_empty());
    }

    #[tokio::test]
    async fn database_failure_removes_the_written_file() {
        let fx = fixture().await;
        let photos = tracker(&fx);
        let order_id = new_order(&fx).await;

        fx.store.set_fail_photo_inserts(true).await;
        let err = photos.attach(order_id, PhotoKind::Evidence, b"a", "a.jpg").await.unwrap_err();

        assert!(matches!(err, AppError::StorageError(_)));
        assert!(fx.blobs.paths().await.is_empty());
        assert!(!fx.order(order_id).await.has_photo_evidence);
    }

    #[tokio::test]
    async fn disk_failure_leaves_no_row() {
        let fx = fixture().await;
        let photos = tracker(&fx);
        let order_id = new_order(&fx).await;

        fx.blobs.set_fail_writes(true).await;
        let err = photos.attach(order_id, PhotoKind::Guide, b"a", "a.png").await.unwrap_err();

        assert!(matches!(err, AppError::StorageError(_)));
        assert!(fx.store.snapshot().await.guide_photos.is_empty());
    }

    #[tokio::test]
    async fn disk_failure_on_delete_keeps_the_row_and_the_file() {
        let fx = fixture().await;
        let photos = tracker(&fx);
        let order_id = new_order(&fx).await;
        let photo = photos.attach(order_id, PhotoKind::Evidence, b"a", "a.jpg").await.unwrap();
        let mut rx = fx.bus.subscribe();

        fx.blobs.set_fail_deletes(true).await;
        let err = photos.delete(order_id, photo.id, PhotoKind::Evidence).await.unwrap_err();

        assert!(matches!(err, AppError::StorageError(_)));
        assert_eq!(fx.store.snapshot().await.evidence_photos.len(), 1);
        assert!(fx.order(order_id).await.has_photo_evidence);
        assert_eq!(fx.blobs.paths().await, vec![photo.relative_path.clone()]);
        assert!(rx.try_recv().is_err());

        fx.blobs.set_fail_deletes(false).await;
        photos.delete(order_id, photo.id, PhotoKind::Evidence).await.unwrap();
        assert!(fx.store.snapshot().await.evidence_photos.is_empty());
        assert!(!fx.order(order_id).await.has_photo_evidence);
        assert!(fx.blobs.paths().await.is_empty());
        let wire = serde_json::to_value(&rx.try_recv().unwrap().event).unwrap();
        assert_eq!(wire["kind"], "evidence_photo_removed");
    }

    #[tokio::test]
    async fn photos_of_another_order_cannot_be_deleted() {
        let fx = fixture().await;
        let photos = tracker(&fx);
        let a = new_order(&fx).await;
        let b = new_order(&fx).await;
        let photo = photos.attach(b, PhotoKind::Evidence, b"x", "x.jpg").await.unwrap();

        let err = photos.delete(a, photo.id, PhotoKind::Evidence).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(photos.list(b, PhotoKind::Evidence).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn listing_is_newest_first_and_events_are_published() {
        let fx = fixture().await;
        let photos = tracker(&fx);
        let order_id = new_order(&fx).await;
        let mut rx = fx.bus.subscribe();

        let older = photos.attach(order_id, PhotoKind::Evidence, b"1", "1.jpg").await.unwrap();
        let newer = photos.attach(order_id, PhotoKind::Evidence, b"2", "2.jpg").await.unwrap();

        let listed: Vec<i64> = photos
            .list(order_id, PhotoKind::Evidence)
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(listed, vec![newer.id, older.id]);

        let envelope = rx.try_recv().unwrap();
        let wire = serde_json::to_value(&envelope.event).unwrap();
        assert_eq!(wire["kind"], "evidence_photo_added");
    }
}
