//! On-disk storage for farmer supporting documents.
//!
//! Files land in `<dir>/<farmer id>/<file name>` and are served under
//! `<url_prefix>/<farmer id>/<file name>`. Re-uploading a name replaces the
//! stored file.

use std::{io, path::PathBuf};

use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
  pub dir:        PathBuf,
  pub url_prefix: String,
}

impl Default for DocumentConfig {
  fn default() -> Self {
    Self {
      dir:        PathBuf::from("uploads/farmer-documents"),
      url_prefix: "/farmer-documents".into(),
    }
  }
}

#[derive(Debug, Error)]
pub enum DocumentError {
  #[error("invalid document file name {0:?}")]
  InvalidFileName(String),

  #[error(transparent)]
  Io(#[from] io::Error),
}

/// A file written by [`DocumentStorage::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
  pub file_name: String,
  pub path:      PathBuf,
  pub url:       String,
}

#[derive(Debug, Clone)]
pub struct DocumentStorage {
  config: DocumentConfig,
}

impl DocumentStorage {
  pub fn new(config: DocumentConfig) -> Self { Self { config } }

  pub fn config(&self) -> &DocumentConfig { &self.config }

  pub async fn save(
    &self,
    farmer_id: Uuid,
    file_name: &str,
    contents: &[u8],
  ) -> Result<StoredDocument, DocumentError> {
    let file_name = sanitize_file_name(file_name)?;
    let dir = self.config.dir.join(farmer_id.to_string());
    tokio::fs::create_dir_all(&dir).await?;

    let path = dir.join(&file_name);
    tokio::fs::write(&path, contents).await?;

    let url = format!(
      "{}/{farmer_id}/{file_name}",
      self.config.url_prefix.trim_end_matches('/')
    );
    tracing::debug!(%farmer_id, path = %path.display(), bytes = contents.len(), "document stored");
    Ok(StoredDocument { file_name, path, url })
  }
}

/// Last path component of a client-supplied name, restricted to
/// `[A-Za-z0-9._-]`.
fn sanitize_file_name(raw: &str) -> Result<String, DocumentError> {
  let base = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
  let cleaned: String = base
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' }
    })
    .collect();

  if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
    return Err(DocumentError::InvalidFileName(raw.to_owned()));
  }
  Ok(cleaned)
}
