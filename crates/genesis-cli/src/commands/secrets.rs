//! Secret lifecycle commands: the wiring from kit metadata through the
//! engine to the store.

use colored::Colorize;
use genesis_core::env;
use genesis_kit::KitMetadata;
use genesis_secrets::{
    apply_filters, parse_plans, resolve, validate, Executor, ExecutorOptions, KitSecrets, PlanSet,
    ResolveOptions, ValidateOptions,
};
use genesis_types::{Action, CheckStatus, EnvName, GenesisError, Result, SecretStore, StoreStatus};
use genesis_vault::{SafeClient, StoreRegistry, VaultConfig};

use crate::cli::SecretsOpts;
use crate::ui::TermSink;

pub async fn run_action(
    action: Action,
    opts: &SecretsOpts,
    yes: bool,
    quiet: bool,
) -> Result<i32> {
    let (plans, client, prefix) = prepare(opts).await?;
    let sink = TermSink::new(quiet);

    let executor = Executor::new(
        &client,
        &sink,
        ExecutorOptions {
            prefix,
            interactive: opts.interactive,
            no_prompt: yes,
            renew_subject: env::renew_subject_requested(),
        },
    );

    let summary = executor.execute(action, &plans).await?;
    Ok(if summary.errors > 0 { 1 } else { 0 })
}

pub async fn check(opts: &SecretsOpts, quiet: bool) -> Result<i32> {
    let (plans, client, prefix) = prepare(opts).await?;
    let sink = TermSink::new(quiet);

    let report = validate(
        &client,
        &sink,
        &plans,
        &ValidateOptions {
            prefix,
            root_ca_path: opts.root_ca.clone(),
        },
    )
    .await?;

    let hide = env::hide_problematic_secrets();
    for plan in &report.plans {
        let status = plan.status();
        if status == CheckStatus::Ok {
            continue;
        }
        println!("\n  {} [{}]", plan.path.cyan(), plan.kind);
        for check in plan.visible_checks(hide) {
            let note = check.note.as_deref().unwrap_or("");
            println!("    {} {} {}", check.status, check.label, note.dimmed());
        }
    }

    Ok(match report.status() {
        CheckStatus::Ok | CheckStatus::Warn => 0,
        CheckStatus::Missing | CheckStatus::Error => 1,
    })
}

/// Load the kit, parse and resolve the plans, and point a client at the
/// configured store.
async fn prepare(opts: &SecretsOpts) -> Result<(PlanSet, SafeClient, String)> {
    let env_name = EnvName::new(&opts.env)?;

    let kit = KitMetadata::load(&opts.kit)?;
    kit.validate_features(&opts.features)?;

    let secrets = KitSecrets {
        certificates: kit.certificates.clone(),
        credentials: kit.credentials.clone(),
        provided: kit.provided.clone(),
    };
    let parsed = parse_plans(&secrets, &opts.features);
    let plans = resolve(
        parsed,
        &ResolveOptions {
            root_ca_path: opts.root_ca.clone(),
            prevalidate: true,
        },
    );
    let plans = apply_filters(&plans, &opts.filters)?;

    let mut registry = StoreRegistry::new();
    registry.register(VaultConfig::from_metadata("default", &opts.vault)?);
    let client = registry.client("default")?;

    match client.status().await {
        StoreStatus::Ok => {}
        StoreStatus::Unauthenticated => client.authenticate().await?,
        status => {
            return Err(GenesisError::Store(
                match status {
                    StoreStatus::Sealed => genesis_types::StoreError::Sealed,
                    StoreStatus::Uninitialized => genesis_types::StoreError::Uninitialized,
                    _ => genesis_types::StoreError::Unreachable,
                },
                format!("secret store at {} is {}", client.url(), status),
            ))
        }
    }

    let prefix = format!(
        "{}{}",
        env::secrets_mount().trim_start_matches('/'),
        env_name.secrets_slug()
    );

    tracing::info!(env = %env_name, prefix = %prefix, plans = plans.len(), "prepared plan set");
    Ok((plans, client, prefix))
}
