//! Core trait definitions for Genesis abstractions.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use crate::enums::KeyUsage;
use crate::errors::{Result, StoreStatus};

/// The image of a store subtree as returned by one `export` call:
/// vault path to key to value.
pub type ExportData = BTreeMap<String, BTreeMap<String, String>>;

/// Request to issue (or re-issue) an X.509 certificate in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X509IssueRequest {
    /// Full vault path the certificate lives under
    pub path: String,
    /// Issue a certificate authority
    pub is_ca: bool,
    /// Full vault path of the signing CA; self-signed when absent
    pub signer: Option<String>,
    /// Subject names; the first becomes the CN, all become SANs
    pub names: Vec<String>,
    /// Key usage and extended key usage to assert
    pub usage: Vec<KeyUsage>,
    /// Validity period in store syntax (e.g. `2y`, `90d`); store default when absent
    pub ttl: Option<String>,
    /// Leave an existing certificate untouched
    pub no_clobber: bool,
}

/// Request to renew an existing X.509 certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X509RenewRequest {
    /// Full vault path of the certificate
    pub path: String,
    /// Re-assert this subject CN while renewing
    pub subject_cn: Option<String>,
    /// Validity period for the renewed certificate; store default when absent
    pub ttl: Option<String>,
}

/// Trait for secret storage backends.
///
/// The canonical implementation drives the external `safe` CLI; tests use
/// an in-memory store. Implementations must be idempotence-friendly: the
/// `no_clobber` flags leave existing material untouched, `delete` tolerates
/// missing paths, and `get` of an absent path returns an empty map rather
/// than an error.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// The store name/alias.
    fn name(&self) -> &str;

    /// The store URL.
    fn url(&self) -> &str;

    /// Read all keys under a vault path. Absence yields an empty map.
    async fn get(&self, path: &str) -> Result<BTreeMap<String, String>>;

    /// Read one key under a vault path. Absence yields `None`.
    async fn get_key(&self, path: &str, key: &str) -> Result<Option<String>>;

    /// Write one key under a vault path.
    async fn set(&self, path: &str, key: &str, value: &str) -> Result<()>;

    /// Write one key from the contents of a file (multiline material).
    async fn set_from_file(&self, path: &str, key: &str, file: &Path) -> Result<()>;

    /// Whether a path (or a specific key under it) exists.
    async fn has(&self, path: &str, key: Option<&str>) -> Result<bool>;

    /// One bulk read of every secret under the given prefixes.
    async fn export(&self, prefixes: &[String]) -> Result<ExportData>;

    /// Delete a whole vault path. Missing paths are not an error.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Delete one key under a vault path. Missing keys are not an error.
    async fn delete_key(&self, path: &str, key: &str) -> Result<()>;

    /// Generate a random string under `path:key`.
    async fn gen_random(
        &self,
        path: &str,
        key: &str,
        size: usize,
        charset: Option<&str>,
        no_clobber: bool,
    ) -> Result<()>;

    /// Derive a formatted sibling of a previously generated random string.
    async fn fmt_random(
        &self,
        path: &str,
        key: &str,
        format: &str,
        destination: &str,
    ) -> Result<()>;

    /// Generate an SSH key pair under a path.
    async fn gen_ssh(&self, path: &str, bits: u32, no_clobber: bool) -> Result<()>;

    /// Generate an RSA key pair under a path.
    async fn gen_rsa(&self, path: &str, bits: u32, no_clobber: bool) -> Result<()>;

    /// Generate Diffie-Hellman parameters under a path.
    async fn gen_dhparams(&self, path: &str, bits: u32, no_clobber: bool) -> Result<()>;

    /// Issue an X.509 certificate.
    async fn issue_x509(&self, req: &X509IssueRequest) -> Result<()>;

    /// Renew an X.509 certificate, returning the store's report output
    /// (callers parse the new expiry out of it).
    async fn renew_x509(&self, req: &X509RenewRequest) -> Result<String>;

    /// Ask the store whether `cert_path` is validly signed by `signer_path`.
    async fn check_x509_chain(&self, cert_path: &str, signer_path: &str) -> Result<bool>;

    /// Probe the store and classify its condition.
    async fn status(&self) -> StoreStatus;
}
