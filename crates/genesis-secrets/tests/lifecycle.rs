//! End-to-end lifecycle tests: parse -> resolve -> execute -> validate
//! against an in-memory store and a buffering progress sink.

use genesis_secrets::{
    apply_filters, parse_plans, resolve, validate, Executor, ExecutorOptions, KitSecrets,
    MemorySink, ProgressEvent, ResolveOptions, ValidateOptions,
};
use genesis_types::{Action, CheckStatus, GenesisError, SecretStore};
use genesis_vault::MemoryStore;

const PREFIX: &str = "secret/snw/lab/dev";

fn plan_set(yaml: &str) -> genesis_secrets::PlanSet {
    let secrets = KitSecrets::from_metadata(&serde_yaml::from_str(yaml).unwrap());
    resolve(parse_plans(&secrets, &[]), &ResolveOptions::default())
}

fn executor_opts() -> ExecutorOptions {
    ExecutorOptions {
        prefix: PREFIX.to_string(),
        interactive: false,
        no_prompt: true,
        renew_subject: false,
    }
}

#[tokio::test]
async fn add_is_idempotent() {
    let plans = plan_set(
        r#"
credentials:
  base:
    crazy/thing:
      id: random 32 fixed
      token: random 16
    work/signing_key: rsa 2048
"#,
    );
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    let executor = Executor::new(&store, &sink, executor_opts());

    executor.execute(Action::Add, &plans).await.unwrap();
    let after_first = store.dump().await;
    let mutations = store.write_log().await.len();

    executor.execute(Action::Add, &plans).await.unwrap();
    assert_eq!(store.dump().await, after_first);
    assert_eq!(store.write_log().await.len(), mutations, "second add must not mutate");
}

#[tokio::test]
async fn recreate_preserves_fixed_plans() {
    let plans = plan_set(
        r#"
credentials:
  base:
    crazy/thing:
      id: random 32 fixed
      token: random 16
"#,
    );
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    let executor = Executor::new(&store, &sink, executor_opts());

    executor.execute(Action::Add, &plans).await.unwrap();
    let id_before = store.get_key("secret/snw/lab/dev/crazy/thing", "id").await.unwrap().unwrap();
    let token_before =
        store.get_key("secret/snw/lab/dev/crazy/thing", "token").await.unwrap().unwrap();

    executor.execute(Action::Recreate, &plans).await.unwrap();
    let id_after = store.get_key("secret/snw/lab/dev/crazy/thing", "id").await.unwrap().unwrap();
    let token_after =
        store.get_key("secret/snw/lab/dev/crazy/thing", "token").await.unwrap().unwrap();

    assert_eq!(id_before, id_after, "fixed plan must survive recreate");
    assert_ne!(token_before, token_after, "non-fixed plan must be regenerated");
}

#[tokio::test]
async fn remove_deletes_the_formatted_sibling_too() {
    let plans = plan_set(
        r#"
credentials:
  base:
    vcap/pass: { secret: 'random 16 fmt base64 at token-b64' }
"#,
    );
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    let executor = Executor::new(&store, &sink, executor_opts());

    executor.execute(Action::Add, &plans).await.unwrap();
    assert!(store.has("secret/snw/lab/dev/vcap/pass", Some("secret")).await.unwrap());
    assert!(store.has("secret/snw/lab/dev/vcap/pass", Some("token-b64")).await.unwrap());

    executor.execute(Action::Remove, &plans).await.unwrap();
    assert!(!store.has("secret/snw/lab/dev/vcap/pass", Some("secret")).await.unwrap());
    assert!(!store.has("secret/snw/lab/dev/vcap/pass", Some("token-b64")).await.unwrap());
}

#[tokio::test]
async fn uuid_v5_is_deterministic_and_tampering_fails_validation() {
    let plans = plan_set(
        r#"
credentials:
  base:
    ids/cluster: { id: uuid v5 namespace dns name foo.example }
"#,
    );
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    let executor = Executor::new(&store, &sink, executor_opts());

    executor.execute(Action::Add, &plans).await.unwrap();
    let first = store.get_key("secret/snw/lab/dev/ids/cluster", "id").await.unwrap().unwrap();

    // re-running add writes nothing; recreate writes the identical value
    executor.execute(Action::Add, &plans).await.unwrap();
    executor.execute(Action::Recreate, &plans).await.unwrap();
    let second = store.get_key("secret/snw/lab/dev/ids/cluster", "id").await.unwrap().unwrap();
    assert_eq!(first, second);

    let opts = ValidateOptions { prefix: PREFIX.to_string(), root_ca_path: None };
    let report = validate(&store, &MemorySink::new(), &plans, &opts).await.unwrap();
    assert_eq!(report.status(), CheckStatus::Ok);

    store.seed("secret/snw/lab/dev/ids/cluster", "id", "f3ad2f1c-4b8a-4f3e-9d7e-111111111111").await;
    let report = validate(&store, &MemorySink::new(), &plans, &opts).await.unwrap();
    assert_eq!(report.status(), CheckStatus::Error);
    let checks = &report.plans[0].checks;
    assert!(checks.iter().any(|c| c.label == "hash" && c.status == CheckStatus::Error));
}

#[tokio::test]
async fn random_plans_validate_after_generation() {
    let plans = plan_set(
        r#"
credentials:
  base:
    crazy/thing:
      id: 'random 32 allowed-chars a-f0-9'
      token: random 16 fmt base64
"#,
    );
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    Executor::new(&store, &sink, executor_opts())
        .execute(Action::Add, &plans)
        .await
        .unwrap();

    let opts = ValidateOptions { prefix: PREFIX.to_string(), root_ca_path: None };
    let report = validate(&store, &MemorySink::new(), &plans, &opts).await.unwrap();
    assert_eq!(report.status(), CheckStatus::Ok, "report: {:?}", report);
}

#[tokio::test]
async fn rsa_plans_validate_after_seeding_real_keys() {
    use rsa::pkcs1::EncodeRsaPrivateKey;
    use rsa::pkcs8::{EncodePublicKey, LineEnding};

    let plans = plan_set("credentials: { base: { work/signing_key: rsa 1024 } }");

    let mut rng = rand::thread_rng();
    let key = rsa::RsaPrivateKey::new(&mut rng, 1024).unwrap();
    let private_pem = key.to_pkcs1_pem(LineEnding::LF).unwrap();
    let public_pem = key.to_public_key().to_public_key_pem(LineEnding::LF).unwrap();

    let store = MemoryStore::new();
    store.seed("secret/snw/lab/dev/work/signing_key", "private", &private_pem).await;
    store.seed("secret/snw/lab/dev/work/signing_key", "public", &public_pem).await;

    let opts = ValidateOptions { prefix: PREFIX.to_string(), root_ca_path: None };
    let report = validate(&store, &MemorySink::new(), &plans, &opts).await.unwrap();
    assert_eq!(report.status(), CheckStatus::Ok, "report: {:?}", report);
    let labels: Vec<&str> = report.plans[0].checks.iter().map(|c| c.label.as_str()).collect();
    assert!(labels.contains(&"private key parses"));
    assert!(labels.contains(&"public key parses"));
    assert!(labels.contains(&"modulus agreement"));
    assert!(labels.contains(&"size"));

    // a foreign public key breaks modulus agreement
    let other = rsa::RsaPrivateKey::new(&mut rng, 1024).unwrap();
    let other_pub = other.to_public_key().to_public_key_pem(LineEnding::LF).unwrap();
    store.seed("secret/snw/lab/dev/work/signing_key", "public", &other_pub).await;
    let report = validate(&store, &MemorySink::new(), &plans, &opts).await.unwrap();
    assert_eq!(report.status(), CheckStatus::Error);
}

#[tokio::test]
async fn missing_secrets_validate_as_missing() {
    let plans = plan_set("credentials: { base: { absent/thing: { id: random 8 } } }");
    let store = MemoryStore::new();
    let opts = ValidateOptions { prefix: PREFIX.to_string(), root_ca_path: None };
    let report = validate(&store, &MemorySink::new(), &plans, &opts).await.unwrap();
    assert_eq!(report.status(), CheckStatus::Missing);
}

#[tokio::test]
async fn provided_plans_prompt_once_and_then_skip() {
    let plans = plan_set(
        r#"
provided:
  base:
    auth/admin:
      keys:
        password: { prompt: Admin password }
"#,
    );
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    sink.push_answer("hunter2");
    let executor = Executor::new(&store, &sink, executor_opts());

    executor.execute(Action::Add, &plans).await.unwrap();
    assert_eq!(
        store.get_key("secret/snw/lab/dev/auth/admin", "password").await.unwrap().unwrap(),
        "hunter2"
    );

    // second add finds every key present and collects nothing
    let mutations = store.write_log().await.len();
    executor.execute(Action::Add, &plans).await.unwrap();
    assert_eq!(store.write_log().await.len(), mutations);
}

#[tokio::test]
async fn interactive_q_aborts_the_remainder() {
    let plans = plan_set(
        r#"
credentials:
  base:
    one/thing: { id: random 8 }
    two/thing: { id: random 8 }
"#,
    );
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    sink.push_key('y');
    sink.push_key('q');
    let opts = ExecutorOptions { interactive: true, ..executor_opts() };
    let err = Executor::new(&store, &sink, opts)
        .execute(Action::Add, &plans)
        .await
        .unwrap_err();

    assert!(matches!(err, GenesisError::UserAbort));
    assert_eq!(sink.completed_paths().len(), 1);
    assert!(sink.events().iter().any(|e| matches!(e, ProgressEvent::Abort { .. })));
    // first plan's work is preserved, second never happened
    assert!(store.has("secret/snw/lab/dev/one/thing", Some("id")).await.unwrap());
    assert!(!store.has("secret/snw/lab/dev/two/thing", Some("id")).await.unwrap());
}

#[tokio::test]
async fn declining_the_destructive_confirmation_aborts() {
    let plans = plan_set("credentials: { base: { a/b: { id: random 8 } } }");
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    sink.push_answer("no");
    let opts = ExecutorOptions { no_prompt: false, ..executor_opts() };
    let err = Executor::new(&store, &sink, opts)
        .execute(Action::Remove, &plans)
        .await
        .unwrap_err();
    assert!(matches!(err, GenesisError::UserAbort));
}

#[tokio::test]
async fn renew_touches_only_certificates_and_reports_days() {
    let plans = plan_set(
        r#"
certificates:
  base:
    pki:
      ca: { is_ca: true }
      server: { names: [srv.example] }
credentials:
  base:
    other/thing: { id: random 8 }
"#,
    );
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    let executor = Executor::new(&store, &sink, executor_opts());
    executor.execute(Action::Add, &plans).await.unwrap();

    let renew_sink = MemorySink::new();
    let summary = Executor::new(&store, &renew_sink, executor_opts())
        .execute(Action::Renew, &plans)
        .await
        .unwrap();

    assert_eq!(summary.processed, 2, "only the two certificates renew");
    let done: Vec<_> = renew_sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            ProgressEvent::DoneItem { path, notes, .. } => Some((path, notes)),
            _ => None,
        })
        .collect();
    assert!(done.iter().all(|(p, _)| p.starts_with("pki/")));
    assert!(done.iter().all(|(_, notes)| notes.iter().any(|n| n.contains("expires in"))));
}

#[tokio::test]
async fn renew_of_an_absent_certificate_surfaces_a_store_error() {
    let plans = plan_set("certificates: { base: { pki: { ca: { is_ca: true } } } }");
    let store = MemoryStore::new();
    let err = Executor::new(&store, &MemorySink::new(), executor_opts())
        .execute(Action::Renew, &plans)
        .await
        .unwrap_err();
    assert!(err.store_error().is_some());
}

#[tokio::test]
async fn events_arrive_in_build_order() {
    let plans = plan_set(
        r#"
certificates:
  base:
    pki:
      ca: { is_ca: true }
      server: { signed_by: pki/ca }
credentials:
  base:
    aa/thing: { id: random 8 }
"#,
    );
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    Executor::new(&store, &sink, executor_opts())
        .execute(Action::Add, &plans)
        .await
        .unwrap();

    assert_eq!(sink.completed_paths(), vec!["pki/ca", "pki/server", "aa/thing:id"]);
}

#[tokio::test]
async fn filters_narrow_an_executor_run() {
    let plans = plan_set(
        r#"
credentials:
  base:
    keep/this: { id: random 8 }
    drop/this: { id: random 8 }
"#,
    );
    let narrowed = apply_filters(&plans, &["/^keep//".to_string()]).unwrap();
    let store = MemoryStore::new();
    Executor::new(&store, &MemorySink::new(), executor_opts())
        .execute(Action::Add, &narrowed)
        .await
        .unwrap();

    assert!(store.has("secret/snw/lab/dev/keep/this", Some("id")).await.unwrap());
    assert!(!store.has("secret/snw/lab/dev/drop/this", Some("id")).await.unwrap());
}

#[tokio::test]
async fn error_plans_surface_in_reports_without_aborting() {
    let plans = plan_set(
        r#"
credentials:
  base:
    bad/spec: quantum 99
    good/spec: { id: random 8 }
"#,
    );
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    let summary = Executor::new(&store, &sink, executor_opts())
        .execute(Action::Add, &plans)
        .await
        .unwrap();
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.processed, 1);

    let opts = ValidateOptions { prefix: PREFIX.to_string(), root_ca_path: None };
    let report = validate(&store, &MemorySink::new(), &plans, &opts).await.unwrap();
    assert_eq!(report.status(), CheckStatus::Error);
}
