//! The action executor: realizes `add`, `recreate`, `renew`, and `remove`
//! against a secret store.
//!
//! Strictly sequential: CAs must exist before their signees are issued,
//! operator confirmations interleave with the work, and the progress sink
//! sees one ordered stream of events. A store failure aborts the run after
//! the current item is reported, since one failed issuance can invalidate
//! everything signed after it.

use chrono::{DateTime, NaiveDateTime, Utc};
use genesis_types::traits::{SecretStore, X509IssueRequest, X509RenewRequest};
use genesis_types::{split_path_key, Action, CheckStatus, GenesisError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Write;

use crate::plan::{Plan, PlanSet, SecretKind};
use crate::progress::{ProgressEvent, ProgressSink, PromptOptions};

static RENEWED_EXPIRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"expiry set to (.+?)\s*$").unwrap());

/// Options for an executor run.
#[derive(Debug, Clone, Default)]
pub struct ExecutorOptions {
    /// Vault prefix every plan path lives under (mount + environment slug)
    pub prefix: String,
    /// Ask y/n/q per item
    pub interactive: bool,
    /// Skip the destructive-action confirmation
    pub no_prompt: bool,
    /// Re-assert the subject CN while renewing
    pub renew_subject: bool,
}

/// Counts for a finished (or aborted) run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecSummary {
    /// Plans acted on
    pub processed: usize,
    /// Plans skipped by the operator or by idempotence
    pub skipped: usize,
    /// Error plans surfaced during the run
    pub errors: usize,
}

/// Drives one store through one plan set, one plan at a time.
pub struct Executor<'a, S: SecretStore + ?Sized> {
    store: &'a S,
    sink: &'a dyn ProgressSink,
    opts: ExecutorOptions,
}

impl<'a, S: SecretStore + ?Sized> Executor<'a, S> {
    /// Build an executor over a store and a progress sink.
    pub fn new(store: &'a S, sink: &'a dyn ProgressSink, opts: ExecutorOptions) -> Self {
        Self { store, sink, opts }
    }

    /// Run one action over the plan set, in build order.
    pub async fn execute(&self, action: Action, plans: &PlanSet) -> Result<ExecSummary> {
        // renew only makes sense for certificates; everything else is
        // filtered out silently
        let runnable: Vec<&Plan> = match action {
            Action::Renew => plans
                .iter()
                .filter(|p| matches!(p.kind, SecretKind::X509(_)))
                .collect(),
            _ => plans.iter().collect(),
        };

        if runnable.is_empty() {
            self.sink.emit(ProgressEvent::Empty);
            return Ok(ExecSummary::default());
        }

        if action.is_destructive() && !self.opts.no_prompt {
            let answer = self.sink.prompt(
                &format!(
                    "About to {} {} secrets under {} -- type 'yes' to continue",
                    action,
                    runnable.len(),
                    self.opts.prefix
                ),
                PromptOptions::default(),
            )?;
            if answer.trim() != "yes" {
                return Err(GenesisError::UserAbort);
            }
        }

        self.sink.emit(ProgressEvent::Init {
            action: action.to_string(),
            total: runnable.len(),
        });

        let mut summary = ExecSummary::default();
        for (index, plan) in runnable.iter().enumerate() {
            self.sink.emit(ProgressEvent::StartItem {
                index: index + 1,
                total: runnable.len(),
                path: plan.path.clone(),
                detail: plan.describe(),
            });

            if let SecretKind::Error(e) = &plan.kind {
                self.sink.emit(ProgressEvent::DoneItem {
                    path: plan.path.clone(),
                    status: CheckStatus::Error,
                    notes: vec![e.error.clone()],
                });
                summary.errors += 1;
                continue;
            }

            if self.opts.interactive {
                match self
                    .sink
                    .inline_prompt(&format!("{} {} [y/n/q]?", action, plan.path))?
                {
                    'y' | 'Y' => {}
                    'q' | 'Q' => {
                        self.sink.emit(ProgressEvent::Abort {
                            msg: "aborted by operator".to_string(),
                        });
                        return Err(GenesisError::UserAbort);
                    }
                    _ => {
                        self.sink.emit(ProgressEvent::DoneItem {
                            path: plan.path.clone(),
                            status: CheckStatus::Ok,
                            notes: vec!["skipped".to_string()],
                        });
                        summary.skipped += 1;
                        continue;
                    }
                }
            }

            tracing::debug!(action = %action, path = %plan.path, "processing plan");
            match self.run_one(action, plan).await {
                Ok(notes) => {
                    self.sink.emit(ProgressEvent::DoneItem {
                        path: plan.path.clone(),
                        status: CheckStatus::Ok,
                        notes,
                    });
                    summary.processed += 1;
                }
                Err(e) => {
                    self.sink.emit(ProgressEvent::DoneItem {
                        path: plan.path.clone(),
                        status: CheckStatus::Error,
                        notes: vec![e.to_string()],
                    });
                    return Err(e);
                }
            }
        }

        self.sink.emit(ProgressEvent::Completed {
            summary: format!(
                "{}: {} done, {} skipped, {} errors",
                action, summary.processed, summary.skipped, summary.errors
            ),
        });
        Ok(summary)
    }

    async fn run_one(&self, action: Action, plan: &Plan) -> Result<Vec<String>> {
        match action {
            Action::Add => self.generate(plan, true).await,
            Action::Recreate => self.generate(plan, plan.is_fixed()).await,
            Action::Renew => self.renew(plan).await,
            Action::Remove => self.remove(plan).await,
        }
    }

    fn full(&self, rel: &str) -> String {
        format!(
            "{}/{}",
            self.opts.prefix.trim_matches('/'),
            rel.trim_start_matches('/')
        )
    }

    /// Generate one plan. `no_clobber` keeps existing material untouched;
    /// it is always on for `add` and stays on for `fixed` plans under
    /// `recreate`.
    async fn generate(&self, plan: &Plan, no_clobber: bool) -> Result<Vec<String>> {
        match &plan.kind {
            SecretKind::X509(x509) => {
                let signer = match (&x509.signed_by, x509.self_signed) {
                    (Some(signer), 0) => Some(if x509.signed_by_abs_path {
                        signer.clone()
                    } else {
                        self.full(signer)
                    }),
                    _ => None,
                };
                let req = X509IssueRequest {
                    path: self.full(&plan.path),
                    is_ca: x509.is_ca,
                    signer,
                    names: x509.names.clone(),
                    usage: x509.effective_usage(),
                    ttl: x509.valid_for.as_ref().map(|v| v.to_string()),
                    no_clobber,
                };
                self.store.issue_x509(&req).await?;
                Ok(vec![])
            }
            SecretKind::Ssh(ssh) => {
                self.store.gen_ssh(&self.full(&plan.path), ssh.size, no_clobber).await?;
                Ok(vec![])
            }
            SecretKind::Rsa(rsa) => {
                self.store.gen_rsa(&self.full(&plan.path), rsa.size, no_clobber).await?;
                Ok(vec![])
            }
            SecretKind::DhParams(dh) => {
                self.store.gen_dhparams(&self.full(&plan.path), dh.size, no_clobber).await?;
                Ok(vec![])
            }
            SecretKind::Random(random) => {
                let (path, key) = split_path_key(&plan.path);
                let key = key.unwrap_or(&random.key);
                let full = self.full(path);
                self.store
                    .gen_random(&full, key, random.size, random.valid_chars.as_deref(), no_clobber)
                    .await?;
                if let (Some(format), Some(dest)) =
                    (&random.format, random.format_destination())
                {
                    if !no_clobber || !self.store.has(&full, Some(&dest)).await? {
                        self.store.fmt_random(&full, key, format, &dest).await?;
                    }
                }
                Ok(vec![])
            }
            SecretKind::Uuid(uuid) => {
                let (path, key) = split_path_key(&plan.path);
                let key = key.unwrap_or(&uuid.key);
                let full = self.full(path);
                if no_clobber && self.store.has(&full, Some(key)).await? {
                    return Ok(vec!["already present".to_string()]);
                }
                let value = uuid.generate(&plan.path).to_string();
                self.store.set(&full, key, &value).await?;
                Ok(vec![])
            }
            SecretKind::Provided(provided) => {
                let full = self.full(&plan.path);
                let mut collected = 0;
                for (key, attrs) in &provided.keys {
                    let present = self.store.has(&full, Some(key)).await?;
                    if present && (no_clobber || attrs.fixed) {
                        continue;
                    }
                    let value = self.sink.prompt(
                        &provided.prompt_for(&plan.path, key),
                        PromptOptions {
                            secret: attrs.sensitive,
                            multiline: attrs.multiline,
                        },
                    )?;
                    if attrs.multiline {
                        // multi-line material goes through an ephemeral
                        // file, never through argv
                        let mut file = tempfile::NamedTempFile::new()?;
                        file.write_all(value.as_bytes())?;
                        file.flush()?;
                        self.store.set_from_file(&full, key, file.path()).await?;
                    } else {
                        self.store.set(&full, key, &value).await?;
                    }
                    collected += 1;
                }
                Ok(if collected == 0 {
                    vec!["all keys already present".to_string()]
                } else {
                    vec![format!("collected {} keys", collected)]
                })
            }
            SecretKind::Error(_) => Ok(vec![]),
        }
    }

    async fn renew(&self, plan: &Plan) -> Result<Vec<String>> {
        let x509 = match &plan.kind {
            SecretKind::X509(x) => x,
            _ => return Ok(vec![]),
        };

        let req = X509RenewRequest {
            path: self.full(&plan.path),
            subject_cn: if self.opts.renew_subject {
                x509.names.first().cloned()
            } else {
                None
            },
            ttl: x509.valid_for.as_ref().map(|v| v.to_string()),
        };
        let output = self.store.renew_x509(&req).await?;

        Ok(match parse_renewed_expiry(&output) {
            Some(expiry) => {
                let days = (expiry - Utc::now()).num_days();
                vec![format!("expires in {} days", days)]
            }
            None => vec!["renewed".to_string()],
        })
    }

    async fn remove(&self, plan: &Plan) -> Result<Vec<String>> {
        match &plan.kind {
            SecretKind::Random(random) => {
                let (path, key) = split_path_key(&plan.path);
                let key = key.unwrap_or(&random.key);
                let full = self.full(path);
                self.store.delete_key(&full, key).await?;
                if let Some(dest) = random.format_destination() {
                    self.store.delete_key(&full, &dest).await?;
                }
            }
            SecretKind::Uuid(uuid) => {
                let (path, key) = split_path_key(&plan.path);
                let key = key.unwrap_or(&uuid.key);
                self.store.delete_key(&self.full(path), key).await?;
            }
            _ => {
                self.store.delete(&self.full(&plan.path)).await?;
            }
        }
        Ok(vec![])
    }
}

/// Pull the new expiry out of the store's `Renewed ... expiry set to <DATE>`
/// report line.
pub(crate) fn parse_renewed_expiry(output: &str) -> Option<DateTime<Utc>> {
    let raw = RENEWED_EXPIRY.captures(output.lines().find(|l| l.contains("expiry set to"))?)?;
    let raw = raw.get(1)?.as_str().trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%b %e %Y %H:%M UTC", "%Y-%m-%d %H:%M:%S UTC"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    None
}
