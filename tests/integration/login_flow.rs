use std::{fs, time::Duration};

use anyhow::Result;
use stackeye::{
    auth::{login, LoginRequest},
    lib::errors::LoginError,
    store::{ConfigStore, MergeAction},
};
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

use crate::common::{revoked_key, seed_store, settings_for, valid_key, CallbackLauncher, MockPlatform};

fn never_confirm(_: &str) -> bool {
    false
}

#[tokio::test]
async fn fresh_login_creates_current_context() -> Result<()> {
    let platform = MockPlatform::start().await?;
    let temp = tempdir()?;
    let store_path = temp.path().join("stackeye").join("config.toml");
    let launcher = CallbackLauncher::delivering(format!(
        "api_key={}&org_id=org_hint&org_name=Hinted",
        valid_key()
    ));

    let report = login(
        &settings_for(&platform.api_url, Duration::from_secs(10)),
        &LoginRequest {
            store_path: store_path.clone(),
            assume_yes: false,
        },
        &launcher,
        never_confirm,
        &CancellationToken::new(),
    )
    .await?;

    assert_eq!(report.context_name, "acme-corp-local");
    assert_eq!(report.action, MergeAction::Created);
    assert_eq!(platform.verify_calls(), 1);

    let store = ConfigStore::load(&store_path)?;
    let (name, context) = store.current().expect("current context is set");
    assert_eq!(name, "acme-corp-local");
    assert_eq!(context.api_url, platform.api_url);
    assert_eq!(context.organization_id, "org_acme");
    assert_eq!(context.organization_name, "Acme Corp");
    assert_eq!(context.api_key, valid_key());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&store_path)?.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
    Ok(())
}

#[tokio::test]
async fn relogin_with_yes_updates_in_place() -> Result<()> {
    let platform = MockPlatform::start().await?;
    let temp = tempdir()?;
    let store_path = temp.path().join("config.toml");
    seed_store(&store_path, &[("acme-corp-local", &platform.api_url, "se_old")]);
    let launcher = CallbackLauncher::delivering(format!("api_key={}", valid_key()));

    let report = login(
        &settings_for(&platform.api_url, Duration::from_secs(10)),
        &LoginRequest {
            store_path: store_path.clone(),
            assume_yes: true,
        },
        &launcher,
        never_confirm,
        &CancellationToken::new(),
    )
    .await?;

    assert_eq!(report.action, MergeAction::Updated);
    let store = ConfigStore::load(&store_path)?;
    assert_eq!(store.contexts.len(), 1);
    assert_eq!(store.contexts["acme-corp-local"].api_key, valid_key());
    Ok(())
}

#[tokio::test]
async fn name_collision_with_other_environment_gets_suffix() -> Result<()> {
    let platform = MockPlatform::start().await?;
    let temp = tempdir()?;
    let store_path = temp.path().join("config.toml");
    seed_store(
        &store_path,
        &[("acme-corp-local", "http://127.0.0.1:1", "se_other")],
    );
    let launcher = CallbackLauncher::delivering(format!("api_key={}", valid_key()));

    let report = login(
        &settings_for(&platform.api_url, Duration::from_secs(10)),
        &LoginRequest {
            store_path: store_path.clone(),
            assume_yes: false,
        },
        &launcher,
        never_confirm,
        &CancellationToken::new(),
    )
    .await?;

    assert_eq!(report.context_name, "acme-corp-local-2");
    let store = ConfigStore::load(&store_path)?;
    assert_eq!(store.current_context, "acme-corp-local-2");
    assert_eq!(store.contexts["acme-corp-local"].api_key, "se_other");
    Ok(())
}

#[tokio::test]
async fn rejected_credential_persists_nothing() -> Result<()> {
    let platform = MockPlatform::start().await?;
    let temp = tempdir()?;
    let store_path = temp.path().join("config.toml");
    let launcher = CallbackLauncher::delivering(format!("api_key={}", revoked_key()));

    let err = login(
        &settings_for(&platform.api_url, Duration::from_secs(10)),
        &LoginRequest {
            store_path: store_path.clone(),
            assume_yes: false,
        },
        &launcher,
        never_confirm,
        &CancellationToken::new(),
    )
    .await
    .expect_err("revoked key must fail");

    match err {
        LoginError::VerificationFailed { reason } => {
            assert!(reason.contains("invalid api key"), "reason: {reason}")
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(platform.verify_calls(), 1);
    assert!(!store_path.exists(), "no config file may be written");
    Ok(())
}

#[tokio::test]
async fn malformed_credential_never_reaches_platform() -> Result<()> {
    let platform = MockPlatform::start().await?;
    let temp = tempdir()?;
    let store_path = temp.path().join("config.toml");
    let launcher = CallbackLauncher::delivering("api_key=not-a-stackeye-key");

    let err = login(
        &settings_for(&platform.api_url, Duration::from_secs(10)),
        &LoginRequest {
            store_path: store_path.clone(),
            assume_yes: false,
        },
        &launcher,
        never_confirm,
        &CancellationToken::new(),
    )
    .await
    .expect_err("malformed key must fail");

    assert!(matches!(err, LoginError::InvalidCredentialFormat));
    assert_eq!(platform.verify_calls(), 0);
    assert!(!store_path.exists());
    Ok(())
}

#[tokio::test]
async fn timeout_leaves_existing_config_untouched() -> Result<()> {
    let platform = MockPlatform::start().await?;
    let temp = tempdir()?;
    let store_path = temp.path().join("config.toml");
    seed_store(&store_path, &[("other", "https://api.dev.stackeye.io", "se_dev")]);
    let before = fs::read_to_string(&store_path)?;

    let err = login(
        &settings_for(&platform.api_url, Duration::from_millis(200)),
        &LoginRequest {
            store_path: store_path.clone(),
            assume_yes: false,
        },
        &CallbackLauncher::silent(),
        never_confirm,
        &CancellationToken::new(),
    )
    .await
    .expect_err("no callback must time out");

    assert!(matches!(err, LoginError::HandshakeTimeout { .. }));
    assert_eq!(fs::read_to_string(&store_path)?, before);
    assert_eq!(platform.verify_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn cancellation_aborts_without_persisting() -> Result<()> {
    let platform = MockPlatform::start().await?;
    let temp = tempdir()?;
    let store_path = temp.path().join("config.toml");
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = login(
        &settings_for(&platform.api_url, Duration::from_secs(60)),
        &LoginRequest {
            store_path: store_path.clone(),
            assume_yes: false,
        },
        &CallbackLauncher::silent(),
        never_confirm,
        &cancel,
    )
    .await
    .expect_err("cancelled");

    assert!(matches!(err, LoginError::Cancelled));
    assert_eq!(err.descriptor().exit_code, 130);
    assert!(!store_path.exists());
    Ok(())
}
