//! In-memory secret store.
//!
//! Backs the executor and validator test suites: implements the same
//! `SecretStore` contract as the safe client, including `no_clobber`
//! semantics and tolerant deletes, and records every mutation so tests can
//! assert idempotence.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use genesis_types::traits::{ExportData, SecretStore, X509IssueRequest, X509RenewRequest};
use genesis_types::{GenesisError, Result, StoreError, StoreStatus};
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::sync::RwLock;

const DEFAULT_CHARSET: &str = "a-zA-Z0-9";

/// A `SecretStore` living entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<ExportData>,
    log: RwLock<Vec<String>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every mutating operation performed so far, in order.
    pub async fn write_log(&self) -> Vec<String> {
        self.log.read().await.clone()
    }

    /// Snapshot of the raw contents.
    pub async fn dump(&self) -> ExportData {
        self.data.read().await.clone()
    }

    /// Seed a value directly, bypassing the log (fixture setup).
    pub async fn seed(&self, path: &str, key: &str, value: &str) {
        self.data
            .write()
            .await
            .entry(norm(path))
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    async fn record(&self, entry: String) {
        self.log.write().await.push(entry);
    }

    async fn insert(&self, path: &str, key: &str, value: String) {
        self.data
            .write()
            .await
            .entry(norm(path))
            .or_default()
            .insert(key.to_string(), value);
    }
}

fn norm(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

/// Expand a `a-zA-Z0-9!@`-style charset description into its characters.
fn expand_charset(spec: &str) -> Vec<char> {
    let chars: Vec<char> = spec.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if i + 2 < chars.len() && chars[i + 1] == '-' {
            let (lo, hi) = (chars[i], chars[i + 2]);
            for c in lo..=hi {
                out.push(c);
            }
            i += 3;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

fn random_string(size: usize, charset: Option<&str>) -> String {
    let pool = expand_charset(charset.unwrap_or(DEFAULT_CHARSET));
    let mut rng = rand::thread_rng();
    (0..size).map(|_| *pool.choose(&mut rng).unwrap()).collect()
}

#[async_trait]
impl SecretStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn url(&self) -> &str {
        "memory://"
    }

    async fn get(&self, path: &str) -> Result<BTreeMap<String, String>> {
        Ok(self
            .data
            .read()
            .await
            .get(&norm(path))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_key(&self, path: &str, key: &str) -> Result<Option<String>> {
        Ok(self
            .data
            .read()
            .await
            .get(&norm(path))
            .and_then(|m| m.get(key))
            .cloned())
    }

    async fn set(&self, path: &str, key: &str, value: &str) -> Result<()> {
        self.record(format!("set {}:{}", norm(path), key)).await;
        self.insert(path, key, value.to_string()).await;
        Ok(())
    }

    async fn set_from_file(&self, path: &str, key: &str, file: &Path) -> Result<()> {
        let value = std::fs::read_to_string(file)?;
        self.record(format!("set {}:{}", norm(path), key)).await;
        self.insert(path, key, value).await;
        Ok(())
    }

    async fn has(&self, path: &str, key: Option<&str>) -> Result<bool> {
        let data = self.data.read().await;
        Ok(match (data.get(&norm(path)), key) {
            (Some(m), Some(k)) => m.contains_key(k),
            (Some(_), None) => true,
            (None, _) => false,
        })
    }

    async fn export(&self, prefixes: &[String]) -> Result<ExportData> {
        let data = self.data.read().await;
        let mut out = ExportData::new();
        for (path, keys) in data.iter() {
            if prefixes.iter().any(|p| path.starts_with(&norm(p))) {
                out.insert(path.clone(), keys.clone());
            }
        }
        Ok(out)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.record(format!("rm {}", norm(path))).await;
        self.data.write().await.remove(&norm(path));
        Ok(())
    }

    async fn delete_key(&self, path: &str, key: &str) -> Result<()> {
        self.record(format!("rm {}:{}", norm(path), key)).await;
        if let Some(m) = self.data.write().await.get_mut(&norm(path)) {
            m.remove(key);
        }
        Ok(())
    }

    async fn gen_random(
        &self,
        path: &str,
        key: &str,
        size: usize,
        charset: Option<&str>,
        no_clobber: bool,
    ) -> Result<()> {
        if no_clobber && self.has(path, Some(key)).await? {
            return Ok(());
        }
        self.record(format!("gen {}:{}", norm(path), key)).await;
        self.insert(path, key, random_string(size, charset)).await;
        Ok(())
    }

    async fn fmt_random(
        &self,
        path: &str,
        key: &str,
        format: &str,
        destination: &str,
    ) -> Result<()> {
        let value = self.get_key(path, key).await?.ok_or_else(|| {
            GenesisError::Store(
                StoreError::NotFound,
                format!("no value at {}:{}", norm(path), key),
            )
        })?;
        let formatted = match format {
            "base64" => {
                use base64::Engine;
                base64::engine::general_purpose::STANDARD.encode(value.as_bytes())
            }
            other => format!("{}({})", other, value),
        };
        self.record(format!("fmt {}:{}", norm(path), destination)).await;
        self.insert(path, destination, formatted).await;
        Ok(())
    }

    async fn gen_ssh(&self, path: &str, bits: u32, no_clobber: bool) -> Result<()> {
        if no_clobber && self.has(path, Some("private")).await? {
            return Ok(());
        }
        self.record(format!("ssh {}", norm(path))).await;
        self.insert(path, "private", format!("ssh-private({} bit)", bits)).await;
        self.insert(path, "public", format!("ssh-rsa pub{}", bits)).await;
        self.insert(path, "fingerprint", format!("SHA256:{}", random_string(43, None))).await;
        Ok(())
    }

    async fn gen_rsa(&self, path: &str, bits: u32, no_clobber: bool) -> Result<()> {
        if no_clobber && self.has(path, Some("private")).await? {
            return Ok(());
        }
        self.record(format!("rsa {}", norm(path))).await;
        self.insert(path, "private", format!("rsa-private({} bit)", bits)).await;
        self.insert(path, "public", format!("rsa-public({} bit)", bits)).await;
        Ok(())
    }

    async fn gen_dhparams(&self, path: &str, bits: u32, no_clobber: bool) -> Result<()> {
        if no_clobber && self.has(path, Some("dhparam-pem")).await? {
            return Ok(());
        }
        self.record(format!("dhparam {}", norm(path))).await;
        self.insert(path, "dhparam-pem", format!("dhparam({} bit)", bits)).await;
        Ok(())
    }

    async fn issue_x509(&self, req: &X509IssueRequest) -> Result<()> {
        if req.no_clobber && self.has(&req.path, Some("certificate")).await? {
            return Ok(());
        }
        self.record(format!("x509 issue {}", norm(&req.path))).await;
        let subject = req.names.first().cloned().unwrap_or_else(|| norm(&req.path));
        self.insert(&req.path, "certificate", format!("cert({})", subject)).await;
        self.insert(&req.path, "key", format!("key({})", subject)).await;
        self.insert(&req.path, "combined", format!("cert({0})key({0})", subject)).await;
        if req.is_ca {
            self.insert(&req.path, "crl", format!("crl({})", subject)).await;
            self.insert(&req.path, "serial", "1".to_string()).await;
        }
        Ok(())
    }

    async fn renew_x509(&self, req: &X509RenewRequest) -> Result<String> {
        if !self.has(&req.path, Some("certificate")).await? {
            return Err(GenesisError::Store(
                StoreError::NotFound,
                format!("no certificate at {}", norm(&req.path)),
            ));
        }
        self.record(format!("x509 renew {}", norm(&req.path))).await;
        let expiry = Utc::now() + Duration::days(365);
        Ok(format!(
            "Renewed x509 certificate at {}; expiry set to {}\n",
            norm(&req.path),
            expiry.format("%b %e %Y %H:%M UTC")
        ))
    }

    async fn check_x509_chain(&self, cert_path: &str, signer_path: &str) -> Result<bool> {
        Ok(self.has(cert_path, Some("certificate")).await?
            && self.has(signer_path, Some("certificate")).await?)
    }

    async fn status(&self) -> StoreStatus {
        StoreStatus::Ok
    }
}
