use crate::artifact_store::{signed_key, ArtifactStore, FsArtifactStore};
use crate::codec::PDFStampDocument;
use crate::config::Config;
use crate::document::{Document, DocumentStatus, Signature};
use crate::metadata_store::{JsonFileMetadataStore, MetadataStore};
use crate::placement::{resolve_placement, SIGNATURE_COLOR, SIGNATURE_FONT_SIZE};
use crate::request::{SignRequest, SignResponse, ValidSignRequest};
use crate::Error;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-process advisory locks, one per `(user_id, filename)`.
/// Entries are dropped again once nobody holds or waits for them.
#[derive(Debug, Default)]
struct DocumentLocks {
    locks: Mutex<HashMap<(String, String), Arc<Mutex<()>>>>,
}

impl DocumentLocks {
    fn with_lock<T>(
        &self,
        user_id: &str,
        filename: &str,
        action: impl FnOnce() -> Result<T, Error>,
    ) -> Result<T, Error> {
        let key = (user_id.to_owned(), filename.to_owned());
        let document_lock = {
            let mut locks = self.map()?;
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        let result = {
            let _guard = document_lock
                .lock()
                .map_err(|_| Error::StorageFailure("document lock poisoned".to_owned()))?;
            action()
        };
        let mut locks = self.map()?;
        drop(document_lock);
        // Clones are only taken while the table is locked, so the count is exact here.
        if locks
            .get(&key)
            .map_or(false, |lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&key);
        }
        result
    }

    fn map(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<(String, String), Arc<Mutex<()>>>>, Error> {
        self.locks
            .lock()
            .map_err(|_| Error::StorageFailure("document lock table poisoned".to_owned()))
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }
}

/// Upload, list, fetch, delete and sign documents of a user.
///
/// Every operation is scoped by the caller's user id, there is no way to reach
/// the documents of another user.
#[derive(Debug)]
pub struct DocumentService<M: MetadataStore, A: ArtifactStore> {
    metadata: M,
    artifacts: A,
    locks: DocumentLocks,
}

impl DocumentService<JsonFileMetadataStore, FsArtifactStore> {
    /// Service backed by the filesystem locations of `config`.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let metadata = JsonFileMetadataStore::open(&config.metadata_path)?;
        let artifacts = FsArtifactStore::new(&config.storage_root);
        Ok(DocumentService::new(metadata, artifacts))
    }
}

impl<M: MetadataStore, A: ArtifactStore> DocumentService<M, A> {
    pub fn new(metadata: M, artifacts: A) -> Self {
        DocumentService {
            metadata,
            artifacts,
            locks: DocumentLocks::default(),
        }
    }

    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    pub fn artifacts(&self) -> &A {
        &self.artifacts
    }

    /// Store a new document. The bytes are not checked to be a PDF here,
    /// a broken file only shows up once it is signed.
    pub fn upload(&self, user_id: &str, original_name: &str, bytes: &[u8]) -> Result<Document, Error> {
        if bytes.is_empty() {
            return Err(Error::MissingField("file"));
        }
        if original_name.trim().is_empty() {
            return Err(Error::MissingField("originalName"));
        }
        let uploaded_at = Utc::now();
        let filename = format!(
            "{}-{}",
            uploaded_at.timestamp_millis(),
            storage_safe_name(original_name)
        );

        self.locks.with_lock(user_id, &filename, || {
            if self.metadata.find_one(user_id, &filename)?.is_some() {
                return Err(Error::StorageFailure(format!(
                    "document `{}` already exists",
                    filename
                )));
            }
            self.artifacts.write(user_id, &filename, bytes)?;
            let record = Document::new_pending(
                user_id,
                filename.clone(),
                original_name,
                bytes.len() as u64,
                uploaded_at,
            );
            match self.metadata.create(record) {
                Ok(document) => {
                    log::info!("Uploaded `{}` for user {}.", document.filename, user_id);
                    Ok(document)
                }
                Err(err) => {
                    // Without a record nobody can reach the artifact again.
                    if let Err(cleanup_err) = self.artifacts.delete(user_id, &filename) {
                        log::error!(
                            "Could not remove artifact `{}` after failed upload: {}",
                            filename,
                            cleanup_err
                        );
                    }
                    Err(err)
                }
            }
        })
    }

    /// All documents of the user, newest upload first.
    pub fn list(&self, user_id: &str) -> Result<Vec<Document>, Error> {
        self.metadata.find_all_by_user(user_id)
    }

    /// The metadata record of a document.
    pub fn document(&self, user_id: &str, filename: &str) -> Result<Document, Error> {
        let document = self.find_document(user_id, filename)?;
        if document.status == DocumentStatus::Pending
            && self.artifacts.exists(user_id, &signed_key(filename))?
        {
            log::warn!(
                "Document `{}` of user {} has a signed copy but is still pending, sign it again to reconcile.",
                filename,
                user_id
            );
        }
        Ok(document)
    }

    /// The original bytes of a document.
    pub fn get_document(&self, user_id: &str, filename: &str) -> Result<Vec<u8>, Error> {
        let document = self.find_document(user_id, filename)?;
        self.read_original(&document)
    }

    /// The bytes of the signed copy. Only the storage is consulted, not the record.
    pub fn get_signed_document(&self, user_id: &str, filename: &str) -> Result<Vec<u8>, Error> {
        self.artifacts
            .read(user_id, &signed_key(filename))?
            .ok_or_else(|| Error::NotFound("Signed file not found".to_owned()))
    }

    /// Remove the record, the original and the signed copy.
    pub fn delete_document(&self, user_id: &str, filename: &str) -> Result<(), Error> {
        self.locks.with_lock(user_id, filename, || {
            if !self.metadata.delete_one(user_id, filename)? {
                return Err(Error::NotFound("Document not found".to_owned()));
            }
            for key in [filename.to_owned(), signed_key(filename)] {
                if !self.artifacts.delete(user_id, &key)? {
                    log::debug!("No artifact `{}` to delete for user {}.", key, user_id);
                }
            }
            log::info!("Deleted `{}` for user {}.", filename, user_id);
            Ok(())
        })
    }

    /// Stamp the signature text onto a page and store the result as the signed copy.
    /// Signing again replaces the earlier signed copy and signature.
    pub fn sign(&self, user_id: &str, request: SignRequest) -> Result<SignResponse, Error> {
        let request = request.validate()?;
        self.locks.with_lock(user_id, &request.filename, || {
            self.sign_document(user_id, &request)
        })
    }

    fn sign_document(&self, user_id: &str, request: &ValidSignRequest) -> Result<SignResponse, Error> {
        log::debug!(
            "Signing `{}` of user {} on page {}.",
            request.filename,
            user_id,
            request.page_number
        );
        let document = self.find_document(user_id, &request.filename)?;
        let original = self.read_original(&document)?;

        let mut pdf = PDFStampDocument::load(&original)?;
        let page = pdf.page(request.page_number)?;
        let position = resolve_placement(
            page.width(),
            page.height(),
            request.x_percent,
            request.y_percent,
        );
        // Finite fractions can still overflow on a large page.
        if !position.x.is_finite() {
            return Err(Error::InvalidField("xPercent"));
        }
        if !position.y.is_finite() {
            return Err(Error::InvalidField("yPercent"));
        }
        let font = pdf.embed_font(request.font.as_deref());
        pdf.draw_text(
            &page,
            &request.signature_text,
            position.x,
            position.y,
            &font,
            SIGNATURE_FONT_SIZE,
            SIGNATURE_COLOR,
        )?;
        let signed_bytes = pdf.serialize()?;

        let signed_filename = signed_key(&document.filename);
        self.artifacts
            .write(user_id, &signed_filename, &signed_bytes)?;

        let signature = Signature {
            text: request.signature_text.clone(),
            font: request.font.clone(),
            x: position.x,
            y: position.y,
            page: request.page_number,
            signed_at: Utc::now(),
        };
        // The signed copy stays in place if this fails. Signing again repairs it.
        self.metadata
            .update_status_and_signature(&document, signature)
            .map_err(|err| {
                log::error!(
                    "Signed copy `{}` written but record update failed: {}",
                    signed_filename,
                    err
                );
                Error::StorageFailure(format!("signed copy stored but record not updated: {}", err))
            })?;

        log::info!("Signed `{}` for user {}.", document.filename, user_id);
        Ok(SignResponse::signed(signed_filename))
    }

    fn find_document(&self, user_id: &str, filename: &str) -> Result<Document, Error> {
        self.metadata
            .find_one(user_id, filename)?
            .ok_or_else(|| Error::NotFound("Document not found".to_owned()))
    }

    fn read_original(&self, document: &Document) -> Result<Vec<u8>, Error> {
        self.artifacts
            .read(&document.user_id, &document.filename)?
            .ok_or_else(|| {
                log::warn!(
                    "Record `{}` of user {} exists but its file is missing.",
                    document.filename,
                    document.user_id
                );
                Error::NotFound("File not found".to_owned())
            })
    }
}

/// Keep an uploaded name usable as a single path component.
fn storage_safe_name(original_name: &str) -> String {
    original_name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
