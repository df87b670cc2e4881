//! Tally and winner-selection scenarios
//!
//! These tests drive the manager end to end and check the scores, winner
//! and validity produced for known vote distributions.

mod common;

use common::{account, setup_test_env, START};
use polity_governance::{
    Ballot, ClassConfig, ExecutionStatus, Governance, GovernanceError, ProposalRequest,
};

#[tokio::test]
async fn test_empty_class_is_excluded_from_scores() {
    // Two direct classes, the second gated so nobody qualifies for it
    let env = setup_test_env(
        vec![
            ClassConfig::direct(60),
            ClassConfig::direct(40).gated(vec!["council".into()]),
        ],
        50,
    );
    let id = env
        .manager
        .create_proposal(&env.governor, ProposalRequest::new("Scenario A", 10, 2))
        .await
        .unwrap();

    env.manager
        .vote(&account("alice"), id, Ballot::single(0))
        .await
        .unwrap();

    assert_eq!(env.manager.class_totals_raw(id).await.unwrap(), vec![100, 0]);

    env.close(10);
    let resolution = env.manager.announce_winner(id).await.unwrap();
    assert_eq!(resolution.decision.scores, vec![60, 0]);
    assert_eq!(resolution.winner(), Some(0));
    assert!(resolution.valid());
    assert_eq!(resolution.execution, ExecutionStatus::NotRequested);
}

#[tokio::test]
async fn test_split_ballots_single_class() {
    let env = setup_test_env(vec![ClassConfig::direct(100)], 50);
    let id = env
        .manager
        .create_proposal(&env.governor, ProposalRequest::new("Scenario B", 10, 2))
        .await
        .unwrap();

    env.manager
        .vote(&account("alice"), id, Ballot::single(0))
        .await
        .unwrap();
    env.manager
        .vote(&account("bob"), id, Ballot::single(1))
        .await
        .unwrap();
    env.manager
        .vote(&account("carol"), id, Ballot::new(vec![0, 1], vec![60, 40]))
        .await
        .unwrap();

    assert_eq!(env.manager.option_class_raw(id, 0).await.unwrap(), vec![160]);
    assert_eq!(env.manager.option_class_raw(id, 1).await.unwrap(), vec![140]);
    assert_eq!(env.manager.class_totals_raw(id).await.unwrap(), vec![300]);

    env.close(10);
    let resolution = env.manager.announce_winner(id).await.unwrap();
    assert_eq!(resolution.decision.scores, vec![53, 46]);
    assert_eq!(resolution.winner(), Some(0));
    assert!(resolution.valid());
}

#[tokio::test]
async fn test_quadratic_balance_power() {
    let env = setup_test_env(
        vec![ClassConfig::balance_weighted("GOV", 100, 100, true)],
        50,
    );
    env.balances.set_balance("GOV", "whale", 10_000);
    env.balances.set_balance("GOV", "minnow", 99);

    let id = env
        .manager
        .create_proposal(&env.governor, ProposalRequest::new("Scenario C", 10, 2))
        .await
        .unwrap();

    let receipt = env
        .manager
        .vote(&account("whale"), id, Ballot::single(1))
        .await
        .unwrap();
    assert_eq!(receipt.class_powers, vec![10_000]);

    // Below the minimum balance: accepted with zero power
    let receipt = env
        .manager
        .vote(&account("minnow"), id, Ballot::single(0))
        .await
        .unwrap();
    assert_eq!(receipt.class_powers, vec![0]);
    assert!(env.manager.has_voted(id, &account("minnow")).await.unwrap());

    assert_eq!(env.manager.class_totals_raw(id).await.unwrap(), vec![10_000]);
    assert_eq!(env.manager.option_class_raw(id, 0).await.unwrap(), vec![0]);
}

#[tokio::test]
async fn test_linear_balance_power_and_governor_bypass() {
    let env = setup_test_env(
        vec![
            ClassConfig::balance_weighted("GOV", 50, 0, false),
            ClassConfig::direct(50).gated(vec!["member".into()]),
        ],
        10,
    );
    env.balances.set_balance("GOV", "alice", 7);
    env.balances.set_balance("GOV", "governor", 3);

    let id = env
        .manager
        .create_proposal(&env.governor, ProposalRequest::new("Linear", 10, 1))
        .await
        .unwrap();

    let alice = env
        .manager
        .vote(&account("alice"), id, Ballot::single(0))
        .await
        .unwrap();
    assert_eq!(alice.class_powers, vec![700, 0]);

    let governor = env
        .manager
        .vote(&env.governor, id, Ballot::single(0))
        .await
        .unwrap();
    assert_eq!(governor.class_powers, vec![300, 100]);
}

#[tokio::test]
async fn test_tie_is_deterministic_and_invalid() {
    let env = setup_test_env(vec![ClassConfig::direct(100)], 1);
    let id = env
        .manager
        .create_proposal(&env.governor, ProposalRequest::new("Tie", 10, 3))
        .await
        .unwrap();

    env.manager
        .vote(&account("alice"), id, Ballot::single(2))
        .await
        .unwrap();
    env.manager
        .vote(&account("bob"), id, Ballot::single(1))
        .await
        .unwrap();

    env.close(10);
    let resolution = env.manager.announce_winner(id).await.unwrap();
    assert_eq!(resolution.decision.scores, vec![0, 50, 50]);
    assert_eq!(resolution.winner(), Some(1));
    assert!(!resolution.valid());
    assert!(!resolution.executed());
}

#[tokio::test]
async fn test_below_quorum_is_invalid() {
    let env = setup_test_env(vec![ClassConfig::direct(100)], 60);
    let id = env
        .manager
        .create_proposal(&env.governor, ProposalRequest::new("Quorum", 10, 2))
        .await
        .unwrap();

    env.manager
        .vote(&account("alice"), id, Ballot::new(vec![0, 1], vec![55, 45]))
        .await
        .unwrap();

    env.close(10);
    let resolution = env.manager.announce_winner(id).await.unwrap();
    assert_eq!(resolution.decision.hi, 55);
    assert_eq!(resolution.winner(), Some(0));
    assert!(!resolution.valid());
}

#[tokio::test]
async fn test_no_votes_yields_no_winner() {
    let env = setup_test_env(vec![ClassConfig::direct(100)], 1);
    let id = env
        .manager
        .create_proposal(&env.governor, ProposalRequest::new("Silent", 10, 2))
        .await
        .unwrap();

    let err = env.manager.announce_winner(id).await.unwrap_err();
    assert!(matches!(err, GovernanceError::ProposalStillOpen(_)));

    env.clock.set(START + 10 * 60 + 1);
    let resolution = env.manager.announce_winner(id).await.unwrap();
    assert_eq!(resolution.winner(), None);
    assert!(!resolution.valid());
}
