//! Configuration for PDF processing.
//!
//! [`EngineConfig`] bounds what a single request may consume and selects the
//! parser and writer behaviour. [`ProtectOptions`] describes how a document
//! is to be encrypted.

use crate::encryption::{Algorithm, Permissions};
use crate::error::{Error, Result};
use crate::parser_config::ParserOptions;
use crate::writer::WriterConfig;

/// Default limit on a single input document (256 MiB).
pub const DEFAULT_MAX_DOCUMENT_SIZE: usize = 256 * 1024 * 1024;

/// Engine-wide processing configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Largest accepted input document in bytes
    pub max_document_size: usize,
    /// Parser behaviour
    pub parser: ParserOptions,
    /// Output layout
    pub writer: WriterConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            max_document_size: DEFAULT_MAX_DOCUMENT_SIZE,
            parser: ParserOptions::default(),
            writer: WriterConfig::default(),
        }
    }

    /// Set the input size limit.
    pub fn with_max_document_size(mut self, bytes: usize) -> Self {
        self.max_document_size = bytes;
        self
    }

    /// Set parser options.
    pub fn with_parser(mut self, parser: ParserOptions) -> Self {
        self.parser = parser;
        self
    }

    /// Set writer options.
    pub fn with_writer(mut self, writer: WriterConfig) -> Self {
        self.writer = writer;
        self
    }

    /// Reject empty or oversized input.
    ///
    /// # Errors
    ///
    /// `EmptyInput` for zero bytes, `DocumentTooLarge` above the limit.
    pub fn check_input(&self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(Error::EmptyInput);
        }
        if data.len() > self.max_document_size {
            return Err(Error::DocumentTooLarge {
                size: data.len(),
                limit: self.max_document_size,
            });
        }
        Ok(())
    }
}

/// How to protect a document.
#[derive(Debug, Clone)]
pub struct ProtectOptions {
    /// Password required to open the document
    pub user_password: String,
    /// Password granting full access; empty means "same as user"
    pub owner_password: String,
    /// Cipher family and key size
    pub algorithm: Algorithm,
    /// Explicit security handler revision; must match the algorithm
    pub revision: Option<u32>,
    /// Access granted to the user
    pub permissions: Permissions,
    /// Whether XMP metadata streams are encrypted too
    pub encrypt_metadata: bool,
}

impl ProtectOptions {
    /// AES-128 protection with `password` as both user and owner password.
    pub fn new(password: impl Into<String>) -> Self {
        let password = password.into();
        Self {
            owner_password: password.clone(),
            user_password: password,
            algorithm: Algorithm::Aes128,
            revision: None,
            permissions: Permissions::default(),
            encrypt_metadata: true,
        }
    }

    /// Use a distinct owner password.
    pub fn with_owner_password(mut self, password: impl Into<String>) -> Self {
        self.owner_password = password.into();
        self
    }

    /// Select the algorithm.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Request a specific revision.
    pub fn with_revision(mut self, revision: u32) -> Self {
        self.revision = Some(revision);
        self
    }

    /// Set user permissions.
    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    /// Leave metadata streams unencrypted when `false`.
    pub fn with_encrypt_metadata(mut self, encrypt: bool) -> Self {
        self.encrypt_metadata = encrypt;
        self
    }
}
