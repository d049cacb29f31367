// src/storage.rs

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::common::error::AppError;

/// Armazenamento de arquivos: gravar uma vez, checar existência, apagar.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn save(&self, relative_path: &str, bytes: &[u8]) -> Result<(), AppError>;
    async fn exists(&self, relative_path: &str) -> Result<bool, AppError>;
    /// `Ok(false)` quando o arquivo já não existia.
    async fn delete(&self, relative_path: &str) -> Result<bool, AppError>;
    async fn delete_dir(&self, relative_dir: &str) -> Result<(), AppError>;
}

// --- Disco local (UPLOAD_DIR) ---

#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    // Só aceita caminhos relativos e sem "..": nada escapa da raiz.
    fn resolve(&self, relative_path: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(relative_path);
        let safe = !relative_path.is_empty()
            && relative.components().all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(AppError::ValidationError(format!(
                "Caminho de arquivo inválido: {}",
                relative_path
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn save(&self, relative_path: &str, bytes: &[u8]) -> Result<(), AppError> {
        let path = self.resolve(relative_path)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(())
    }

    async fn exists(&self, relative_path: &str) -> Result<bool, AppError> {
        let path = self.resolve(relative_path)?;
        Ok(tokio::fs::try_exists(path).await?)
    }

    async fn delete(&self, relative_path: &str) -> Result<bool, AppError> {
        let path = self.resolve(relative_path)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_dir(&self, relative_dir: &str) -> Result<(), AppError> {
        let path = self.resolve(relative_dir)?;
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// --- Memória (testes) ---
