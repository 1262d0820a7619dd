//! Validation of existing secrets against their plans.
//!
//! One bulk `export` populates a [`SecretSnapshot`]; every plan is then
//! checked against that single store image. Validation is best-effort: a
//! failing check never stops the run, and the report covers every plan.

use genesis_types::traits::SecretStore;
use genesis_types::{CheckStatus, Result};

use crate::plan::{PlanSet, SecretKind};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::report::{Check, PlanReport, SecretsReport};
use crate::snapshot::SecretSnapshot;

/// Options for a validation run.
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    /// Vault prefix every plan path lives under
    pub prefix: String,
    /// Absolute store path of the external root CA, when one is in play
    pub root_ca_path: Option<String>,
}

/// Validate every plan in the set against the store's current contents.
pub async fn validate<S: SecretStore + ?Sized>(
    store: &S,
    sink: &dyn ProgressSink,
    plans: &PlanSet,
    opts: &ValidateOptions,
) -> Result<SecretsReport> {
    if plans.is_empty() {
        sink.emit(ProgressEvent::Empty);
        return Ok(SecretsReport::default());
    }

    sink.emit(ProgressEvent::Wait {
        msg: format!("Retrieving secrets under {}", opts.prefix),
    });
    let mut prefixes = vec![opts.prefix.clone()];
    if let Some(ref root) = opts.root_ca_path {
        prefixes.push(root.clone());
    }
    let snapshot = SecretSnapshot::new(store.export(&prefixes).await?);
    sink.emit(ProgressEvent::WaitDone);
    tracing::debug!(prefix = %opts.prefix, plans = plans.len(), "validating against one store image");

    if snapshot.is_empty() {
        sink.emit(ProgressEvent::Notify {
            level: CheckStatus::Warn,
            msg: format!("no secrets found under {}", opts.prefix),
        });
    }

    sink.emit(ProgressEvent::Init {
        action: "validate".to_string(),
        total: plans.len(),
    });

    let mut report = SecretsReport::default();
    for (index, plan) in plans.iter().enumerate() {
        sink.emit(ProgressEvent::StartItem {
            index: index + 1,
            total: plans.len(),
            path: plan.path.clone(),
            detail: plan.describe(),
        });

        let full = full_path(&opts.prefix, &plan.path);
        let checks = match &plan.kind {
            SecretKind::Error(e) => vec![Check::error("definition", e.error.clone())],
            SecretKind::X509(x509) => {
                let entry = snapshot.entry(&full);
                let signer_full = match (&x509.signed_by, x509.self_signed) {
                    (Some(signer), 0) => Some(if x509.signed_by_abs_path {
                        signer.clone()
                    } else {
                        full_path(&opts.prefix, signer)
                    }),
                    _ => None,
                };
                let signer_pem = signer_full
                    .as_deref()
                    .and_then(|p| snapshot.value(p, "certificate"));
                x509.validate(&full, entry, signer_pem, signer_full.as_deref(), store)
                    .await
            }
            SecretKind::Ssh(ssh) => ssh.validate(snapshot.entry(&full)).await,
            SecretKind::Rsa(rsa) => rsa.validate(snapshot.entry(&full)),
            SecretKind::DhParams(dh) => dh.validate(snapshot.entry(&full)).await,
            SecretKind::Random(random) => {
                let (base, _) = split(&plan.path);
                random.validate(snapshot.entry(&full_path(&opts.prefix, base)))
            }
            SecretKind::Uuid(uuid) => {
                let (base, _) = split(&plan.path);
                uuid.validate(&plan.path, snapshot.entry(&full_path(&opts.prefix, base)))
            }
            SecretKind::Provided(provided) => provided.validate(snapshot.entry(&full)),
        };

        let plan_report = PlanReport {
            path: plan.path.clone(),
            kind: plan.secret_type(),
            checks,
        };
        sink.emit(ProgressEvent::DoneItem {
            path: plan.path.clone(),
            status: plan_report.status(),
            notes: plan_report
                .checks
                .iter()
                .filter(|c| c.status != CheckStatus::Ok)
                .map(|c| match &c.note {
                    Some(note) => format!("{}: {}", c.label, note),
                    None => c.label.clone(),
                })
                .collect(),
        });
        report.plans.push(plan_report);
    }

    let (ok, warn, missing, error) = report.counts();
    sink.emit(ProgressEvent::Completed {
        summary: format!(
            "validated {} secrets: {} ok, {} warnings, {} missing, {} errors",
            report.plans.len(),
            ok,
            warn,
            missing,
            error
        ),
    });

    Ok(report)
}

fn split(plan_path: &str) -> (&str, Option<&str>) {
    genesis_types::split_path_key(plan_path)
}

fn full_path(prefix: &str, rel: &str) -> String {
    format!(
        "{}/{}",
        prefix.trim_matches('/'),
        rel.trim_start_matches('/')
    )
}
