//! Encrypted section store. Every operation loads the whole file, optionally
//! replaces one section, and writes the whole file back; nothing is cached
//! between calls.
//!
//! Writers hold an exclusive advisory lock on `<store>.lock` for the full
//! read-modify-write cycle and replace the file by atomic rename, so two
//! writers never lose each other's sections and readers never see a
//! half-written file.

pub mod field;
pub mod format;
pub mod lock;
pub mod model;

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

use crate::crypto::envelope::{EnvelopeError, SecretKey};
use crate::crypto::integrity::key_fingerprint;

pub use field::{is_private_name, Field, PRIVATE_MARKER};
pub use model::{Section, Store};

use format::{Document, RawSection};
use lock::StoreLock;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{}: malformed store file at line {line}: {reason}", path.display())]
    Format {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("section `{section}` field `{field}` holds a malformed token: {reason}")]
    Token {
        section: String,
        field: String,
        reason: String,
    },
    #[error("section `{section}` field `{field}` failed authentication; wrong key or tampered value")]
    Authentication { section: String, field: String },
    #[error("invalid section name {name:?}: {reason}")]
    InvalidSection { name: String, reason: String },
    #[error("invalid field {name:?}: {reason}")]
    InvalidField { name: String, reason: String },
    #[error("encryption failed: {0}")]
    Encryption(String),
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Coarse error classes callers branch on, e.g. "wrong key" versus "corrupt file".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    Authentication,
    Io,
    Invalid,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Format { .. } | StoreError::Token { .. } => ErrorKind::Format,
            StoreError::Authentication { .. } => ErrorKind::Authentication,
            StoreError::Io { .. } => ErrorKind::Io,
            StoreError::InvalidSection { .. }
            | StoreError::InvalidField { .. }
            | StoreError::Encryption(_) => ErrorKind::Invalid,
        }
    }

    fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn from_envelope(section: &str, field: &str, err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::Authentication => StoreError::Authentication {
                section: section.to_string(),
                field: field.to_string(),
            },
            EnvelopeError::Format(reason) => StoreError::Token {
                section: section.to_string(),
                field: field.to_string(),
                reason,
            },
            EnvelopeError::Encryption(reason) => StoreError::Encryption(reason),
            EnvelopeError::KeyLength { .. } => StoreError::Encryption(err.to_string()),
        }
    }
}

/// Handle on one store file. Holds only the path; the key is passed per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionStore {
    path: PathBuf,
}

impl SectionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces (or appends) `section_name` with exactly `fields`, sealing
    /// private values. Fields of the old section not present in `fields` are
    /// dropped. Other sections are copied through untouched.
    pub fn write_section<I, K, V>(
        &self,
        section_name: &str,
        fields: I,
        key: &SecretKey,
    ) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let section = Section::from_pairs(section_name, fields);
        self.write(&section, key)
    }

    /// Same as [`SectionStore::write_section`] for an already built [`Section`].
    pub fn write(&self, section: &Section, key: &SecretKey) -> Result<(), StoreError> {
        validate(section)?;
        self.ensure_exists()?;

        let _lock = StoreLock::exclusive(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        let mut document = self.load_document()?;

        let mut raw = RawSection::new(section.name());
        for field in section.fields() {
            let stored = field
                .to_stored(key)
                .map_err(|e| StoreError::from_envelope(section.name(), field.name(), e))?;
            raw.entries.push((field.name().to_string(), stored));
        }
        let replaced = document.get(section.name()).is_some();
        document.upsert(raw);

        self.persist(&document)?;
        info!(
            store = %self.path.display(),
            section = section.name(),
            fields = section.len(),
            replaced,
            key = %key_fingerprint(key),
            "wrote section"
        );
        Ok(())
    }

    /// Loads and decrypts every section. A single field that fails to open
    /// fails the whole read.
    pub fn read(&self, key: &SecretKey) -> Result<Store, StoreError> {
        self.ensure_exists()?;
        let document = {
            let _lock = StoreLock::shared(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
            self.load_document()?
        };

        let mut store = Store::default();
        for raw in document.sections() {
            let mut section = Section::new(raw.name.as_str());
            for (name, stored) in &raw.entries {
                let field = Field::from_stored(name, stored, key)
                    .map_err(|e| StoreError::from_envelope(&raw.name, name, e))?;
                section.push(field);
            }
            store.push(section);
        }
        debug!(
            store = %self.path.display(),
            sections = store.len(),
            key = %key_fingerprint(key),
            "read store"
        );
        Ok(store)
    }

    /// Full read projected onto one section; empty if the section is absent.
    pub fn read_section(&self, section_name: &str, key: &SecretKey) -> Result<Section, StoreError> {
        Ok(self.read(key)?.take_section(section_name))
    }

    fn ensure_exists(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| StoreError::io(&self.path, e))?;
        info!(store = %self.path.display(), "created empty store");
        Ok(())
    }

    fn load_document(&self) -> Result<Document, StoreError> {
        let bytes = fs::read(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        let text = String::from_utf8(bytes).map_err(|e| {
            let valid = e.utf8_error().valid_up_to();
            StoreError::Format {
                path: self.path.clone(),
                line: e.as_bytes()[..valid].iter().filter(|b| **b == b'\n').count() + 1,
                reason: "not valid UTF-8".to_string(),
            }
        })?;
        let document = Document::parse(&text).map_err(|e| StoreError::Format {
            path: self.path.clone(),
            line: e.line,
            reason: e.reason,
        })?;
        debug!(
            store = %self.path.display(),
            sections = document.sections().len(),
            "parsed store"
        );
        Ok(document)
    }

    /// Replaces the file the store path resolves to, so a symlinked store
    /// stays a symlink, and keeps the old file's permissions.
    fn persist(&self, document: &Document) -> Result<(), StoreError> {
        let target = fs::canonicalize(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        let permissions = fs::metadata(&target)
            .map_err(|e| StoreError::io(&target, e))?
            .permissions();
        let dir = target.parent().unwrap_or_else(|| Path::new("."));

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
        tmp.write_all(document.render().as_bytes())
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.as_file()
            .set_permissions(permissions)
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.persist(&target)
            .map_err(|e| StoreError::io(&target, e.error))?;
        debug!(store = %target.display(), "replaced store file");
        Ok(())
    }
}

fn validate(section: &Section) -> Result<(), StoreError> {
    field::validate_section_name(section.name()).map_err(|reason| StoreError::InvalidSection {
        name: section.name().to_string(),
        reason,
    })?;
    for entry in section.fields() {
        field::validate_field(entry.name(), entry.value()).map_err(|reason| {
            StoreError::InvalidField {
                name: entry.name().to_string(),
                reason,
            }
        })?;
    }
    Ok(())
}

/// Writes one section of the store at `path`. See [`SectionStore::write_section`].
pub fn write_section<I, K, V>(
    path: impl AsRef<Path>,
    section_name: &str,
    fields: I,
    key: &SecretKey,
) -> Result<(), StoreError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    SectionStore::new(path.as_ref()).write_section(section_name, fields, key)
}

/// Reads and decrypts the whole store at `path`, creating it if missing.
pub fn read_store(path: impl AsRef<Path>, key: &SecretKey) -> Result<Store, StoreError> {
    SectionStore::new(path.as_ref()).read(key)
}

/// Reads one section of the store at `path`; empty if absent.
pub fn read_section(
    path: impl AsRef<Path>,
    section_name: &str,
    key: &SecretKey,
) -> Result<Section, StoreError> {
    SectionStore::new(path.as_ref()).read_section(section_name, key)
}
