//! Snapshot persistence round trips

mod common;

use common::{account, setup_test_env};
use polity_governance::{
    Ballot, ClassConfig, Governance, GovernanceError, GovernanceManager, GovernanceSnapshot,
    ProposalRequest,
};
use tempfile::tempdir;

#[tokio::test]
async fn test_restore_preserves_tally_and_voters() {
    let env = setup_test_env(vec![ClassConfig::direct(70), ClassConfig::direct(30)], 50);
    let id = env
        .manager
        .create_proposal(&env.governor, ProposalRequest::new("Persist me", 10, 2))
        .await
        .unwrap();
    env.manager
        .vote(&account("alice"), id, Ballot::new(vec![0, 1], vec![75, 25]))
        .await
        .unwrap();
    env.manager.set_quorum(&env.governor, 40).await.unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("governance.json");
    env.manager.save_snapshot(&path).await.unwrap();

    let restored = GovernanceManager::restore_from_file(&path, env.collaborators()).unwrap();
    assert_eq!(restored.get_config().await, env.manager.get_config().await);
    assert_eq!(restored.proposal_count().await, 1);
    assert_eq!(
        restored.option_class_raw(id, 0).await.unwrap(),
        vec![75, 75]
    );
    assert!(restored.has_voted(id, &account("alice")).await.unwrap());

    // The voted set survives, so a second ballot is still refused
    let err = restored
        .vote(&account("alice"), id, Ballot::single(1))
        .await
        .unwrap_err();
    assert!(matches!(err, GovernanceError::AlreadyVoted { .. }));

    // New proposals continue the id sequence
    let next = restored
        .create_proposal(&env.governor, ProposalRequest::new("Next", 10, 1))
        .await
        .unwrap();
    assert_eq!(next, 1);
}

#[tokio::test]
async fn test_restore_rejects_inconsistent_snapshot() {
    let env = setup_test_env(vec![ClassConfig::direct(100)], 50);
    for _ in 0..2 {
        env.manager
            .create_proposal(&env.governor, ProposalRequest::new("p", 10, 1))
            .await
            .unwrap();
    }

    let mut snapshot: GovernanceSnapshot = env.manager.snapshot().await;
    snapshot.proposals.swap(0, 1);
    assert!(GovernanceManager::restore(snapshot.clone(), env.collaborators()).is_err());

    snapshot.proposals.swap(0, 1);
    snapshot.proposals[1].class_totals_raw.push(0);
    assert!(matches!(
        GovernanceManager::restore(snapshot, env.collaborators()),
        Err(GovernanceError::Serialization(_))
    ));
}

/// A snapshot with one voted proposal, for corrupting field by field
async fn voted_snapshot() -> (common::TestEnv, GovernanceSnapshot) {
    let env = setup_test_env(vec![ClassConfig::direct(60), ClassConfig::direct(40)], 50);
    let id = env
        .manager
        .create_proposal(&env.governor, ProposalRequest::new("Corrupt me", 10, 2))
        .await
        .unwrap();
    env.manager
        .vote(&account("alice"), id, Ballot::new(vec![0, 1], vec![50, 50]))
        .await
        .unwrap();
    let snapshot = env.manager.snapshot().await;
    assert!(snapshot.validate().is_ok());
    (env, snapshot)
}

fn assert_rejected(env: &common::TestEnv, snapshot: GovernanceSnapshot) {
    assert!(matches!(
        GovernanceManager::restore(snapshot, env.collaborators()),
        Err(GovernanceError::Serialization(_))
    ));
}

#[tokio::test]
async fn test_restore_rejects_bad_class_snapshot() {
    let (env, mut snapshot) = voted_snapshot().await;
    snapshot.proposals[0].classes_snapshot[0].slice_pct = 70;
    assert_rejected(&env, snapshot);
}

#[tokio::test]
async fn test_restore_rejects_option_count_out_of_range() {
    let (env, mut snapshot) = voted_snapshot().await;
    snapshot.proposals[0].options.clear();
    assert_rejected(&env, snapshot);

    let (env, mut snapshot) = voted_snapshot().await;
    let extra = snapshot.proposals[0].options[0].clone();
    snapshot.proposals[0].options.resize(51, extra);
    // Keep the tally consistent so only the count is wrong
    for option in &mut snapshot.proposals[0].options {
        option.class_raw = vec![0, 0];
    }
    assert_rejected(&env, snapshot);
}

#[tokio::test]
async fn test_restore_rejects_option_above_class_total() {
    let (env, mut snapshot) = voted_snapshot().await;
    snapshot.proposals[0].options[0].class_raw[0] = u128::MAX;
    assert_rejected(&env, snapshot);

    let (env, mut snapshot) = voted_snapshot().await;
    let total = snapshot.proposals[0].class_totals_raw[1];
    snapshot.proposals[0].options[1].class_raw[1] = total + 1;
    assert_rejected(&env, snapshot);
}

#[tokio::test]
async fn test_restore_rejects_total_wider_than_accumulator() {
    let (env, mut snapshot) = voted_snapshot().await;
    snapshot.proposals[0].class_totals_raw[0] = 1u128 << 96;
    assert_rejected(&env, snapshot);
}

#[tokio::test]
async fn test_restore_rejects_window_and_gate_mismatch() {
    let (env, mut snapshot) = voted_snapshot().await;
    let created = snapshot.proposals[0].created_at;
    snapshot.proposals[0].end_timestamp = created - 1;
    assert_rejected(&env, snapshot);

    let (env, mut snapshot) = voted_snapshot().await;
    snapshot.proposals[0].restricted = true;
    assert_rejected(&env, snapshot);
}

#[test]
fn test_missing_snapshot_file() {
    let dir = tempdir().unwrap();
    let err = GovernanceSnapshot::load(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, GovernanceError::Io(_)));
}
