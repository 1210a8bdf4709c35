//! End-to-end tests of the slot migration flow against an in-memory chain

mod helpers;

use std::time::Duration;

use eyre::Result;
use helpers::{
    migration_config, ChainCall, MockChain, MockVerifier, RecordingSleeper, ADMIN,
    ORIGINAL_IMPLEMENTATION, PROXY, TARGET_NAME,
};
use scripts::{
    constants::DEFAULT_SLOT_MANAGER_NAME,
    errors::{MigrationStep, ScriptError},
    migration::SlotMigration,
    types::{MigrationOperation, RequestedOperation, VerificationOutcome},
};

/// Count the slot mutations recorded on the chain
fn count_mutations(chain: &MockChain) -> (usize, usize) {
    let calls = chain.calls();
    let adds = calls
        .iter()
        .filter(|call| matches!(call, ChainCall::AddVariable { .. }))
        .count();
    let removes = calls
        .iter()
        .filter(|call| matches!(call, ChainCall::RemoveVariable { .. }))
        .count();
    (adds, removes)
}

#[tokio::test]
async fn test_add_variable() -> Result<()> {
    let chain = MockChain::new();
    let verifier = MockVerifier::returning(VerificationOutcome::Verified);
    let sleeper = RecordingSleeper::default();

    let config = migration_config(MigrationOperation::AddVariable, 2, 5);
    let report = SlotMigration::new(&chain, &verifier, &sleeper)
        .run(&config)
        .await?;

    let adds: Vec<ChainCall> = chain
        .writes()
        .into_iter()
        .filter(|call| matches!(call, ChainCall::AddVariable { .. }))
        .collect();
    assert_eq!(
        adds,
        vec![ChainCall::AddVariable {
            proxy: PROXY,
            slot: 2,
            last_slot: 5,
        }]
    );
    assert_eq!(count_mutations(&chain), (1, 0));
    assert_eq!(report.operation, MigrationOperation::AddVariable);
    assert_eq!(report.admin, ADMIN);
    assert_eq!(chain.settled_implementation(), report.target);
    assert_eq!(chain.deployed_address(TARGET_NAME), Some(report.target));
    assert_eq!(
        chain.deployed_address(DEFAULT_SLOT_MANAGER_NAME),
        Some(report.slot_manager)
    );
    assert_eq!(verifier.requests(), vec![(TARGET_NAME.to_string(), report.target)]);

    Ok(())
}

#[tokio::test]
async fn test_remove_variable() -> Result<()> {
    let chain = MockChain::new();
    let verifier = MockVerifier::returning(VerificationOutcome::Verified);
    let sleeper = RecordingSleeper::default();

    let config = migration_config(MigrationOperation::RemoveVariable, 3, 6);
    let report = SlotMigration::new(&chain, &verifier, &sleeper)
        .run(&config)
        .await?;

    assert_eq!(count_mutations(&chain), (0, 1));
    assert_eq!(chain.settled_implementation(), report.target);
    assert_eq!(report.verification, VerificationOutcome::Verified);

    Ok(())
}

#[tokio::test]
async fn test_call_order() -> Result<()> {
    let chain = MockChain::new();
    let verifier = MockVerifier::returning(VerificationOutcome::Verified);
    let sleeper = RecordingSleeper::default();

    let mut config = migration_config(MigrationOperation::RemoveVariable, 3, 6);
    config.unmovable_slots = vec![1, 2];
    let report = SlotMigration::new(&chain, &verifier, &sleeper)
        .run(&config)
        .await?;

    let expected = vec![
        ChainCall::Deploy(DEFAULT_SLOT_MANAGER_NAME.to_string()),
        ChainCall::Deploy(TARGET_NAME.to_string()),
        ChainCall::Upgrade {
            admin: ADMIN,
            proxy: PROXY,
            implementation: report.slot_manager,
        },
        ChainCall::UpdateSlotMovability {
            proxy: PROXY,
            slot: 1,
            movable: true,
        },
        ChainCall::UpdateSlotMovability {
            proxy: PROXY,
            slot: 2,
            movable: true,
        },
        ChainCall::RemoveVariable {
            proxy: PROXY,
            slot: 3,
            last_slot: 6,
        },
        ChainCall::Upgrade {
            admin: ADMIN,
            proxy: PROXY,
            implementation: report.target,
        },
    ];
    assert_eq!(chain.writes(), expected);

    // The admin is resolved from the proxy before the first repoint
    let calls = chain.calls();
    let admin_read = calls.iter().position(|c| *c == ChainCall::ReadAdmin(PROXY));
    let first_upgrade = calls
        .iter()
        .position(|c| matches!(c, ChainCall::Upgrade { .. }));
    assert!(admin_read.is_some() && admin_read < first_upgrade);

    Ok(())
}

#[tokio::test]
async fn test_unsupported_operation() -> Result<()> {
    let chain = MockChain::new();
    let verifier = MockVerifier::returning(VerificationOutcome::Verified);
    let sleeper = RecordingSleeper::default();

    let mut config = migration_config(MigrationOperation::AddVariable, 3, 6);
    config.operation = RequestedOperation::Unsupported("operation code 2".to_string());
    config.unmovable_slots = vec![1];

    let err = SlotMigration::new(&chain, &verifier, &sleeper)
        .run(&config)
        .await
        .unwrap_err();

    assert_eq!(err.step, MigrationStep::ApplyOperation);
    assert!(matches!(err.source, ScriptError::UnsupportedOperation(_)));

    // The proxy is left on the slot manager with its storage untouched
    let slot_manager = chain.deployed_address(DEFAULT_SLOT_MANAGER_NAME);
    assert_eq!(err.last_known_implementation, slot_manager);
    assert_eq!(Some(chain.settled_implementation()), slot_manager);
    assert_eq!(count_mutations(&chain), (0, 0));
    assert!(!chain
        .calls()
        .iter()
        .any(|c| matches!(c, ChainCall::UpdateSlotMovability { .. })));
    assert!(verifier.requests().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_invalid_config_touches_nothing() -> Result<()> {
    let chain = MockChain::new();
    let verifier = MockVerifier::returning(VerificationOutcome::Verified);
    let sleeper = RecordingSleeper::default();

    let config = migration_config(MigrationOperation::AddVariable, 7, 6);
    let err = SlotMigration::new(&chain, &verifier, &sleeper)
        .run(&config)
        .await
        .unwrap_err();

    assert_eq!(err.step, MigrationStep::ValidateConfig);
    assert!(chain.calls().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_stale_polls() -> Result<()> {
    let mut chain = MockChain::new();
    chain.stale_polls = 2;
    let verifier = MockVerifier::returning(VerificationOutcome::Verified);
    let sleeper = RecordingSleeper::default();

    let config = migration_config(MigrationOperation::AddVariable, 2, 5);
    let report = SlotMigration::new(&chain, &verifier, &sleeper)
        .run(&config)
        .await?;

    assert_eq!(report.slot_manager_polls, 3);
    assert_eq!(report.target_polls, 3);

    // Two backoff sleeps per repoint
    let per_repoint = vec![Duration::from_millis(10), Duration::from_millis(20)];
    assert_eq!(sleeper.sleeps(), [per_repoint.clone(), per_repoint].concat());

    Ok(())
}

#[tokio::test]
async fn test_transient_poll_errors_are_retried() -> Result<()> {
    let chain = MockChain::new().with_transient_errors(2);
    let verifier = MockVerifier::returning(VerificationOutcome::Verified);
    let sleeper = RecordingSleeper::default();

    let config = migration_config(MigrationOperation::RemoveVariable, 0, 4);
    let report = SlotMigration::new(&chain, &verifier, &sleeper)
        .run(&config)
        .await?;

    assert_eq!(report.slot_manager_polls, 3);
    assert_eq!(report.target_polls, 1);

    Ok(())
}

#[tokio::test]
async fn test_confirmation_timeout() -> Result<()> {
    let mut chain = MockChain::new();
    chain.never_confirm = true;
    let verifier = MockVerifier::returning(VerificationOutcome::Verified);
    let sleeper = RecordingSleeper::default();

    let mut config = migration_config(MigrationOperation::AddVariable, 2, 5);
    config.confirmation.max_attempts = 3;
    let err = SlotMigration::new(&chain, &verifier, &sleeper)
        .run(&config)
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(err.step, MigrationStep::ConfirmSlotManager);
    assert_eq!(err.last_known_implementation, Some(ORIGINAL_IMPLEMENTATION));
    match err.source {
        ScriptError::ConfirmationTimeout {
            attempts, last_seen, ..
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(last_seen, Some(ORIGINAL_IMPLEMENTATION));
        }
        other => panic!("expected a timeout, got {other:?}"),
    }

    // No sleep after the final poll
    assert_eq!(sleeper.sleeps().len(), 2);
    assert_eq!(count_mutations(&chain), (0, 0));

    Ok(())
}

#[tokio::test]
async fn test_stalled_reads_time_out() -> Result<()> {
    let mut chain = MockChain::new();
    chain.stall_reads = true;
    let verifier = MockVerifier::returning(VerificationOutcome::Verified);
    let sleeper = RecordingSleeper::default();

    let mut config = migration_config(MigrationOperation::AddVariable, 2, 5);
    config.confirmation.max_attempts = 2;
    config.confirmation.poll_timeout_ms = 20;
    let err = tokio::time::timeout(
        Duration::from_secs(5),
        SlotMigration::new(&chain, &verifier, &sleeper).run(&config),
    )
    .await?
    .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(err.step, MigrationStep::ConfirmSlotManager);
    match err.source {
        ScriptError::ConfirmationTimeout {
            attempts, last_seen, ..
        } => {
            assert_eq!(attempts, 2);
            assert_eq!(last_seen, None);
        }
        other => panic!("expected a timeout, got {other:?}"),
    }

    // Both polls and the failure re-read were attempted
    let reads = chain
        .calls()
        .iter()
        .filter(|call| matches!(call, ChainCall::ReadImplementation(_)))
        .count();
    assert_eq!(reads, 3);
    assert_eq!(sleeper.sleeps().len(), 1);
    assert_eq!(count_mutations(&chain), (0, 0));

    Ok(())
}

#[tokio::test]
async fn test_revert_is_not_a_timeout() -> Result<()> {
    let mut chain = MockChain::new();
    chain.revert_upgrades = true;
    let verifier = MockVerifier::returning(VerificationOutcome::Verified);
    let sleeper = RecordingSleeper::default();

    let config = migration_config(MigrationOperation::AddVariable, 2, 5);
    let err = SlotMigration::new(&chain, &verifier, &sleeper)
        .run(&config)
        .await
        .unwrap_err();

    assert!(!err.is_timeout());
    assert_eq!(err.step, MigrationStep::RepointToSlotManager);
    assert!(matches!(err.source, ScriptError::ContractRevert(_)));
    assert_eq!(err.last_known_implementation, Some(ORIGINAL_IMPLEMENTATION));
    assert!(sleeper.sleeps().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_failed_deploy_leaves_proxy_alone() -> Result<()> {
    let mut chain = MockChain::new();
    chain.failing_deploy = Some(TARGET_NAME.to_string());
    let verifier = MockVerifier::returning(VerificationOutcome::Verified);
    let sleeper = RecordingSleeper::default();

    let config = migration_config(MigrationOperation::AddVariable, 2, 5);
    let err = SlotMigration::new(&chain, &verifier, &sleeper)
        .run(&config)
        .await
        .unwrap_err();

    assert_eq!(err.step, MigrationStep::DeployTarget);
    assert_eq!(err.last_known_implementation, Some(ORIGINAL_IMPLEMENTATION));
    assert!(!chain
        .calls()
        .iter()
        .any(|c| matches!(c, ChainCall::Upgrade { .. })));

    Ok(())
}

#[tokio::test]
async fn test_already_verified_is_success() -> Result<()> {
    let chain = MockChain::new();
    let verifier = MockVerifier::returning(VerificationOutcome::AlreadyVerified);
    let sleeper = RecordingSleeper::default();

    let config = migration_config(MigrationOperation::AddVariable, 2, 5);
    let report = SlotMigration::new(&chain, &verifier, &sleeper)
        .run(&config)
        .await?;

    assert_eq!(report.verification, VerificationOutcome::AlreadyVerified);

    Ok(())
}

#[tokio::test]
async fn test_verification_failure_keeps_upgrade() -> Result<()> {
    let chain = MockChain::new();
    let verifier = MockVerifier::failing("Error: Invalid API Key");
    let sleeper = RecordingSleeper::default();

    let config = migration_config(MigrationOperation::RemoveVariable, 3, 6);
    let err = SlotMigration::new(&chain, &verifier, &sleeper)
        .run(&config)
        .await
        .unwrap_err();

    let target = chain.deployed_address(TARGET_NAME);
    assert_eq!(err.step, MigrationStep::VerifyTarget);
    assert!(matches!(err.source, ScriptError::Verification(_)));
    assert_eq!(err.last_known_implementation, target);
    assert_eq!(Some(chain.settled_implementation()), target);
    assert_eq!(count_mutations(&chain), (0, 1));

    Ok(())
}
