//! The `safe` CLI client.
//!
//! Every invocation pins `SAFE_TARGET` to the configured store and scrubs
//! the caller's ambient `VAULT_ADDR`/debug variables, so a run can never be
//! cross-contaminated by whatever store the operator's shell happens to
//! point at. All commands are argv arrays; no shell is ever involved.

use async_trait::async_trait;
use genesis_core::util::process::{self, EnvSpec, RunOutput};
use genesis_types::traits::{ExportData, SecretStore, X509IssueRequest, X509RenewRequest};
use genesis_types::{GenesisError, Result, StoreError, StoreStatus};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tokio::net::TcpStream;
use url::Url;

use crate::config::VaultConfig;

/// How long the TCP reachability probe waits before declaring the store
/// unreachable.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Typed wrapper around the external `safe` CLI.
#[derive(Debug, Clone)]
pub struct SafeClient {
    config: VaultConfig,
}

impl SafeClient {
    /// Create a client for one configured store.
    pub fn new(config: VaultConfig) -> Self {
        Self { config }
    }

    /// The configuration this client targets.
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Run a raw safe command under the pinned environment, returning
    /// `(stdout, rc, stderr)`.
    ///
    /// The typed verbs below are built on this; it is public for the few
    /// callers that need a verb without a wrapper.
    pub async fn run(&self, args: &[&str]) -> Result<RunOutput> {
        let set = [("SAFE_TARGET", self.config.url.as_str())];
        let unset = ["VAULT_ADDR", "VAULT_TOKEN", "DEBUG", "SAFE_DEBUG", "SAFE_TRACE"];
        let env = EnvSpec { set: &set, unset: &unset };
        tracing::debug!(store = %self.config.name, ?args, "safe");
        process::run_with_env("safe", args, &env).await
    }

    async fn run_owned(&self, args: &[String]) -> Result<RunOutput> {
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&refs).await
    }

    async fn run_with_stdin(&self, args: &[&str], input: &[u8]) -> Result<RunOutput> {
        let set = [("SAFE_TARGET", self.config.url.as_str())];
        let unset = ["VAULT_ADDR", "VAULT_TOKEN", "DEBUG", "SAFE_DEBUG", "SAFE_TRACE"];
        let env = EnvSpec { set: &set, unset: &unset };
        process::run_with_stdin("safe", args, &env, input).await
    }

    /// Make this store the safe CLI's named target.
    pub async fn target(&self) -> Result<()> {
        let mut args = vec!["target"];
        if !self.config.verify {
            args.push("-k");
        }
        args.push(&self.config.url);
        args.push(&self.config.name);

        let (_, rc, stderr) = self.run(&args).await?;
        if rc != 0 {
            return Err(classify_failure(rc, &stderr));
        }
        Ok(())
    }

    /// Authenticate against the store using whatever credentials the
    /// environment carries.
    ///
    /// Tried in order: approle (`VAULT_ROLE_ID` + `VAULT_SECRET_ID`), token
    /// (`VAULT_AUTH_TOKEN`), userpass (`VAULT_USERNAME` + `VAULT_PASSWORD`),
    /// github (`VAULT_GITHUB_TOKEN`).
    pub async fn authenticate(&self) -> Result<()> {
        let (method, input) = if let (Ok(role), Ok(secret)) =
            (std::env::var("VAULT_ROLE_ID"), std::env::var("VAULT_SECRET_ID"))
        {
            ("approle", format!("{}\n{}\n", role, secret))
        } else if let Ok(token) = std::env::var("VAULT_AUTH_TOKEN") {
            ("token", format!("{}\n", token))
        } else if let (Ok(user), Ok(pass)) =
            (std::env::var("VAULT_USERNAME"), std::env::var("VAULT_PASSWORD"))
        {
            ("userpass", format!("{}\n{}\n", user, pass))
        } else if let Ok(token) = std::env::var("VAULT_GITHUB_TOKEN") {
            ("github", format!("{}\n", token))
        } else {
            return Err(GenesisError::Store(
                StoreError::Unauthenticated,
                "no store credentials found in the environment".to_string(),
            ));
        };

        tracing::info!(method, store = %self.config.name, "authenticating to secret store");
        let (_, rc, stderr) = self
            .run_with_stdin(&["auth", method], input.as_bytes())
            .await?;
        if rc != 0 {
            return Err(GenesisError::Store(
                StoreError::Unauthenticated,
                condense(&stderr, rc),
            ));
        }
        Ok(())
    }

    async fn probe_tcp(&self) -> bool {
        let parsed = match Url::parse(&self.config.url) {
            Ok(u) => u,
            Err(_) => return false,
        };
        let host = match parsed.host_str() {
            Some(h) => h.to_string(),
            None => return false,
        };
        let port = parsed.port_or_known_default().unwrap_or(8200);

        matches!(
            tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect((host.as_str(), port))).await,
            Ok(Ok(_))
        )
    }
}

#[async_trait]
impl SecretStore for SafeClient {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn url(&self) -> &str {
        &self.config.url
    }

    async fn get(&self, path: &str) -> Result<BTreeMap<String, String>> {
        let (stdout, rc, stderr) = self.run(&["export", &norm(path)]).await?;
        if rc != 0 {
            let err = classify_failure(rc, &stderr);
            if err.store_error() == Some(StoreError::NotFound) {
                return Ok(BTreeMap::new());
            }
            return Err(err);
        }
        let data = parse_export(&stdout)?;
        Ok(data.get(&norm(path)).cloned().unwrap_or_default())
    }

    async fn get_key(&self, path: &str, key: &str) -> Result<Option<String>> {
        let target = format!("{}:{}", norm(path), key);
        let (stdout, rc, stderr) = self.run(&["get", &target]).await?;
        if rc != 0 {
            let err = classify_failure(rc, &stderr);
            if err.store_error() == Some(StoreError::NotFound) {
                return Ok(None);
            }
            return Err(err);
        }
        Ok(Some(trim_value(&stdout)))
    }

    async fn set(&self, path: &str, key: &str, value: &str) -> Result<()> {
        let assignment = format!("{}={}", key, value);
        let (_, rc, stderr) = self.run(&["set", &norm(path), &assignment]).await?;
        if rc != 0 {
            return Err(classify_failure(rc, &stderr));
        }
        Ok(())
    }

    async fn set_from_file(&self, path: &str, key: &str, file: &Path) -> Result<()> {
        let assignment = format!("{}@{}", key, file.display());
        let (_, rc, stderr) = self.run(&["set", &norm(path), &assignment]).await?;
        if rc != 0 {
            return Err(classify_failure(rc, &stderr));
        }
        Ok(())
    }

    async fn has(&self, path: &str, key: Option<&str>) -> Result<bool> {
        let target = match key {
            Some(k) => format!("{}:{}", norm(path), k),
            None => norm(path),
        };
        let (_, rc, stderr) = self.run(&["exists", &target]).await?;
        if rc == 0 {
            return Ok(true);
        }
        if stderr.trim().is_empty() {
            return Ok(false);
        }
        let err = classify_failure(rc, &stderr);
        if err.store_error() == Some(StoreError::NotFound) {
            return Ok(false);
        }
        Err(err)
    }

    async fn export(&self, prefixes: &[String]) -> Result<ExportData> {
        let mut args = vec!["export".to_string()];
        args.extend(prefixes.iter().map(|p| norm(p)));

        let (stdout, rc, stderr) = self.run_owned(&args).await?;
        if rc != 0 {
            let err = classify_failure(rc, &stderr);
            if err.store_error() == Some(StoreError::NotFound) {
                return Ok(ExportData::new());
            }
            return Err(err);
        }
        parse_export(&stdout)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let (_, rc, stderr) = self.run(&["rm", "-f", &norm(path)]).await?;
        if rc != 0 {
            let err = classify_failure(rc, &stderr);
            if err.store_error() == Some(StoreError::NotFound) {
                return Ok(());
            }
            return Err(err);
        }
        Ok(())
    }

    async fn delete_key(&self, path: &str, key: &str) -> Result<()> {
        let target = format!("{}:{}", norm(path), key);
        let (_, rc, stderr) = self.run(&["rm", "-f", &target]).await?;
        if rc != 0 {
            let err = classify_failure(rc, &stderr);
            if err.store_error() == Some(StoreError::NotFound) {
                return Ok(());
            }
            return Err(err);
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
        let args = args::gen_random(&norm(path), key, size, charset, no_clobber);
        let (_, rc, stderr) = self.run_owned(&args).await?;
        if rc != 0 {
            return Err(classify_failure(rc, &stderr));
        }
        Ok(())
    }

    async fn fmt_random(
        &self,
        path: &str,
        key: &str,
        format: &str,
        destination: &str,
    ) -> Result<()> {
        let path = norm(path);
        let (_, rc, stderr) = self
            .run(&["fmt", format, &path, key, destination])
            .await?;
        if rc != 0 {
            return Err(classify_failure(rc, &stderr));
        }
        Ok(())
    }

    async fn gen_ssh(&self, path: &str, bits: u32, no_clobber: bool) -> Result<()> {
        let args = args::gen_keypair("ssh", &norm(path), bits, no_clobber);
        let (_, rc, stderr) = self.run_owned(&args).await?;
        if rc != 0 {
            return Err(classify_failure(rc, &stderr));
        }
        Ok(())
    }

    async fn gen_rsa(&self, path: &str, bits: u32, no_clobber: bool) -> Result<()> {
        let args = args::gen_keypair("rsa", &norm(path), bits, no_clobber);
        let (_, rc, stderr) = self.run_owned(&args).await?;
        if rc != 0 {
            return Err(classify_failure(rc, &stderr));
        }
        Ok(())
    }

    async fn gen_dhparams(&self, path: &str, bits: u32, no_clobber: bool) -> Result<()> {
        let args = args::gen_keypair("dhparam", &norm(path), bits, no_clobber);
        let (_, rc, stderr) = self.run_owned(&args).await?;
        if rc != 0 {
            return Err(classify_failure(rc, &stderr));
        }
        Ok(())
    }

    async fn issue_x509(&self, req: &X509IssueRequest) -> Result<()> {
        let args = args::x509_issue(req);
        let (_, rc, stderr) = self.run_owned(&args).await?;
        if rc != 0 {
            return Err(classify_failure(rc, &stderr));
        }
        Ok(())
    }

    async fn renew_x509(&self, req: &X509RenewRequest) -> Result<String> {
        let args = args::x509_renew(req);
        let (stdout, rc, stderr) = self.run_owned(&args).await?;
        if rc != 0 {
            return Err(classify_failure(rc, &stderr));
        }
        Ok(stdout)
    }

    async fn check_x509_chain(&self, cert_path: &str, signer_path: &str) -> Result<bool> {
        let cert = norm(cert_path);
        let signer = norm(signer_path);
        let (_, rc, stderr) = self
            .run(&["x509", "validate", "--signed-by", &signer, &cert])
            .await?;
        if rc == 0 {
            return Ok(true);
        }
        match classify_failure(rc, &stderr).store_error() {
            Some(StoreError::Unreachable)
            | Some(StoreError::Sealed)
            | Some(StoreError::Unauthenticated)
            | Some(StoreError::Uninitialized) => Err(classify_failure(rc, &stderr)),
            _ => Ok(false),
        }
    }

    async fn status(&self) -> StoreStatus {
        if !self.probe_tcp().await {
            return StoreStatus::Unreachable;
        }

        match self.run(&["vault", "status"]).await {
            Ok((stdout, 0, _)) => {
                if stdout.to_lowercase().contains("sealed: true") {
                    StoreStatus::Sealed
                } else {
                    StoreStatus::Ok
                }
            }
            Ok((_, rc, stderr)) => match classify_failure(rc, &stderr).store_error() {
                Some(StoreError::Sealed) => StoreStatus::Sealed,
                Some(StoreError::Uninitialized) => StoreStatus::Uninitialized,
                Some(StoreError::Unauthenticated) => StoreStatus::Unauthenticated,
                _ => StoreStatus::Unreachable,
            },
            Err(_) => StoreStatus::Unreachable,
        }
    }
}

/// Vault paths are matched without a leading slash.
fn norm(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

/// Strip the single trailing newline `safe get` appends to a value.
fn trim_value(stdout: &str) -> String {
    stdout.strip_suffix('\n').unwrap_or(stdout).to_string()
}

/// Parse `safe export` JSON into path -> key -> value maps.
fn parse_export(stdout: &str) -> Result<ExportData> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(ExportData::new());
    }

    let raw: BTreeMap<String, BTreeMap<String, serde_json::Value>> =
        serde_json::from_str(trimmed).map_err(|e| {
            GenesisError::Store(
                StoreError::Protocol,
                format!("unparseable export output: {}", e),
            )
        })?;

    let mut data = ExportData::new();
    for (path, keys) in raw {
        let entry = data.entry(norm(&path)).or_default();
        for (key, value) in keys {
            let value = match value.as_str() {
                Some(s) => s.to_string(),
                None => value.to_string(),
            };
            entry.insert(key, value);
        }
    }
    Ok(data)
}

/// Map a failed safe invocation to a classified store error.
fn classify_failure(rc: i32, stderr: &str) -> GenesisError {
    let lower = stderr.to_lowercase();
    let kind = if lower.contains("connection refused")
        || lower.contains("no such host")
        || lower.contains("no route to host")
        || lower.contains("i/o timeout")
        || lower.contains("connection timed out")
    {
        StoreError::Unreachable
    } else if lower.contains("sealed") {
        StoreError::Sealed
    } else if lower.contains("not initialized") || lower.contains("uninitialized") {
        StoreError::Uninitialized
    } else if lower.contains("403")
        || lower.contains("permission denied")
        || lower.contains("missing client token")
        || lower.contains("invalid token")
        || lower.contains("not authenticated")
    {
        StoreError::Unauthenticated
    } else if lower.contains("404")
        || lower.contains("not found")
        || lower.contains("no secret exists")
    {
        StoreError::NotFound
    } else {
        StoreError::Protocol
    };
    GenesisError::Store(kind, condense(stderr, rc))
}

fn condense(stderr: &str, rc: i32) -> String {
    let msg = stderr.trim();
    if msg.is_empty() {
        format!("safe exited {}", rc)
    } else {
        msg.lines().next().unwrap_or(msg).to_string()
    }
}

/// Pure argv builders for the generation verbs, split out so the exact
/// command lines are testable without a live store.
pub(crate) mod args {
    use genesis_types::traits::{X509IssueRequest, X509RenewRequest};

    pub fn gen_random(
        path: &str,
        key: &str,
        size: usize,
        charset: Option<&str>,
        no_clobber: bool,
    ) -> Vec<String> {
        let mut args = vec!["gen".to_string(), "-l".to_string(), size.to_string()];
        if let Some(policy) = charset {
            args.push("--policy".to_string());
            args.push(policy.to_string());
        }
        if no_clobber {
            args.push("--no-clobber".to_string());
        }
        args.push(format!("{}:{}", path, key));
        args
    }

    pub fn gen_keypair(verb: &str, path: &str, bits: u32, no_clobber: bool) -> Vec<String> {
        let mut args = vec![verb.to_string(), bits.to_string()];
        if no_clobber {
            args.push("--no-clobber".to_string());
        }
        args.push(path.to_string());
        args
    }

    pub fn x509_issue(req: &X509IssueRequest) -> Vec<String> {
        let mut args = vec!["x509".to_string(), "issue".to_string()];
        if req.is_ca {
            args.push("-A".to_string());
        }
        if let Some(ref signer) = req.signer {
            args.push("-i".to_string());
            args.push(signer.trim_start_matches('/').to_string());
        }
        for name in &req.names {
            args.push("-n".to_string());
            args.push(name.clone());
        }
        for usage in &req.usage {
            args.push("-u".to_string());
            args.push(usage.to_string());
        }
        if let Some(ref ttl) = req.ttl {
            args.push("-t".to_string());
            args.push(ttl.clone());
        }
        if req.no_clobber {
            args.push("--no-clobber".to_string());
        }
        args.push(req.path.trim_start_matches('/').to_string());
        args
    }

    pub fn x509_renew(req: &X509RenewRequest) -> Vec<String> {
        let mut args = vec!["x509".to_string(), "renew".to_string()];
        if let Some(ref ttl) = req.ttl {
            args.push("-t".to_string());
            args.push(ttl.clone());
        }
        if let Some(ref cn) = req.subject_cn {
            args.push("--subject".to_string());
            args.push(format!("cn={}", cn));
        }
        args.push(req.path.trim_start_matches('/').to_string());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genesis_types::KeyUsage;

    #[test]
    fn export_parse_normalizes_paths_and_values() {
        let out = r#"{"/secret/env/thing": {"id": "abc", "count": 3}}"#;
        let data = parse_export(out).unwrap();
        let entry = data.get("secret/env/thing").unwrap();
        assert_eq!(entry.get("id").unwrap(), "abc");
        assert_eq!(entry.get("count").unwrap(), "3");
    }

    #[test]
    fn empty_export_is_empty() {
        assert!(parse_export("").unwrap().is_empty());
        assert!(parse_export("  \n").unwrap().is_empty());
    }

    #[test]
    fn get_values_lose_only_the_final_newline() {
        assert_eq!(trim_value("sekrit\n"), "sekrit");
        assert_eq!(trim_value("line1\nline2\n"), "line1\nline2");
        assert_eq!(trim_value("no-newline"), "no-newline");
    }

    #[test]
    fn failures_classify_by_stderr() {
        let cases = [
            ("dial tcp: connection refused", StoreError::Unreachable),
            ("Vault is sealed", StoreError::Sealed),
            ("server is not initialized", StoreError::Uninitialized),
            ("API 403 permission denied", StoreError::Unauthenticated),
            ("no secret exists at that path", StoreError::NotFound),
            ("something inexplicable", StoreError::Protocol),
        ];
        for (stderr, want) in cases {
            assert_eq!(
                classify_failure(1, stderr).store_error(),
                Some(want),
                "stderr: {}",
                stderr
            );
        }
    }

    #[test]
    fn gen_random_args_include_policy_and_clobber_guard() {
        let argv = args::gen_random("env/thing", "id", 32, Some("a-z0-9"), true);
        assert_eq!(
            argv,
            vec!["gen", "-l", "32", "--policy", "a-z0-9", "--no-clobber", "env/thing:id"]
        );
    }

    #[test]
    fn x509_issue_args_cover_the_request() {
        let req = X509IssueRequest {
            path: "/secret/env/my-cert/server".to_string(),
            is_ca: false,
            signer: Some("/secret/env/my-cert/ca".to_string()),
            names: vec!["srv.example".to_string(), "10.0.0.1".to_string()],
            usage: vec![KeyUsage::ServerAuth, KeyUsage::ClientAuth],
            ttl: Some("1y".to_string()),
            no_clobber: true,
        };
        let argv = args::x509_issue(&req);
        assert_eq!(
            argv,
            vec![
                "x509", "issue", "-i", "secret/env/my-cert/ca", "-n", "srv.example", "-n",
                "10.0.0.1", "-u", "server_auth", "-u", "client_auth", "-t", "1y", "--no-clobber",
                "secret/env/my-cert/server"
            ]
        );
    }

    #[test]
    fn x509_renew_args_reassert_subject() {
        let req = X509RenewRequest {
            path: "secret/env/my-cert/server".to_string(),
            subject_cn: Some("srv.example".to_string()),
            ttl: None,
        };
        assert_eq!(
            args::x509_renew(&req),
            vec!["x509", "renew", "--subject", "cn=srv.example", "secret/env/my-cert/server"]
        );
    }
}
