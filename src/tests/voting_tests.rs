use cosmwasm_std::testing::{message_info, mock_dependencies, mock_env};
use cosmwasm_std::{from_json, Decimal, Uint128};

use crate::contract::{execute, query};
use crate::error::ContractError;
use crate::msg::{ExecuteMsg, QueryMsg, VoteResponse};
use crate::state::StrategyState;
use crate::tests::common::*;
use crate::voting::Tally;

fn query_tally(deps: &TestDeps, strategy_id: u64) -> Tally {
    let res = query(deps.as_ref(), mock_env(), QueryMsg::Tally { strategy_id }).unwrap();
    from_json(&res).unwrap()
}

fn join(deps: &mut TestDeps, garden_id: u64, amount: Uint128) {
    execute(
        deps.as_mut(),
        mock_env(),
        message_info(&member(), &deposit_funds(amount)),
        ExecuteMsg::Deposit { garden_id },
    )
    .unwrap();
}

#[test]
fn test_cast_vote() {
    let mut deps = mock_dependencies();
    let garden_id = setup_garden(&mut deps);
    let strategy_id = propose(&mut deps, garden_id, vec![vault_operation()]);

    let tally = query_tally(&deps, strategy_id);
    assert!(!tally.quorum_reached);
    assert_eq!(tally.eligible_weight, units(100));

    let res = vote(&mut deps, &creator(), strategy_id).unwrap();
    assert_eq!(attr(&res, "weight"), units(100).to_string());
    assert_eq!(attr(&res, "quorum_reached"), "true");

    let tally = query_tally(&deps, strategy_id);
    assert!(tally.quorum_reached);
    assert_eq!(tally.total_weight, units(100));
    assert_eq!(tally.voters, 1);
    assert_eq!(tally.approval_ratio, Decimal::one());

    let res = query(
        deps.as_ref(),
        mock_env(),
        QueryMsg::Vote {
            strategy_id,
            voter: creator().to_string(),
        },
    )
    .unwrap();
    let vote_res: VoteResponse = from_json(&res).unwrap();
    assert_eq!(vote_res.weight, Some(units(100)));
}

#[test]
fn test_duplicate_vote_leaves_tally_unchanged() {
    let mut deps = mock_dependencies();
    let garden_id = setup_garden(&mut deps);
    let strategy_id = propose(&mut deps, garden_id, vec![vault_operation()]);

    vote(&mut deps, &creator(), strategy_id).unwrap();
    let before = query_tally(&deps, strategy_id);

    let err = vote(&mut deps, &creator(), strategy_id).unwrap_err();
    assert_eq!(err, ContractError::DuplicateVote {});
    assert_eq!(query_tally(&deps, strategy_id), before);
}

#[test]
fn test_vote_after_window_is_rejected() {
    let mut deps = mock_dependencies();
    let garden_id = setup_garden(&mut deps);
    let strategy_id = propose(&mut deps, garden_id, vec![vault_operation()]);
    join(&mut deps, garden_id, units(50));

    // The last second of the window still accepts votes
    execute(
        deps.as_mut(),
        env_at(VOTING_PERIOD),
        message_info(&member(), &[]),
        ExecuteMsg::CastVote { strategy_id },
    )
    .unwrap();
    assert_eq!(query_tally(&deps, strategy_id).total_weight, units(50));

    let err = execute(
        deps.as_mut(),
        env_at(VOTING_PERIOD + 1),
        message_info(&creator(), &[]),
        ExecuteMsg::CastVote { strategy_id },
    )
    .unwrap_err();
    assert_eq!(err, ContractError::VotingClosed {});

    // Outsiders carry no weight
    let err = vote(&mut deps, &addr("outsider"), strategy_id).unwrap_err();
    assert!(matches!(err, ContractError::Validation { .. }));
}

#[test]
fn test_weight_is_snapshot_at_vote_time() {
    let mut deps = mock_dependencies();
    let garden_id = setup_garden(&mut deps);
    let strategy_id = propose(&mut deps, garden_id, vec![vault_operation()]);

    // Joined after the proposal, still votes with its current balance
    join(&mut deps, garden_id, units(50));
    let res = vote(&mut deps, &member(), strategy_id).unwrap();
    assert_eq!(attr(&res, "weight"), units(50).to_string());

    let tally = query_tally(&deps, strategy_id);
    assert_eq!(tally.total_weight, units(50));
    assert_eq!(tally.eligible_weight, units(150));
}

#[test]
fn test_quorum_requires_fraction_and_voter_count() {
    let mut deps = mock_dependencies();
    setup_contract(deps.as_mut());

    let mut config = garden_config();
    config.min_voter_quorum = Decimal::percent(20);
    config.min_voters = 2;
    let garden_id = create_garden_with(deps.as_mut(), config, units(100));
    join(&mut deps, garden_id, units(900));
    let strategy_id = propose(&mut deps, garden_id, vec![vault_operation()]);

    // 10% of the weight from a single voter
    vote(&mut deps, &creator(), strategy_id).unwrap();
    let tally = query_tally(&deps, strategy_id);
    assert!(!tally.quorum_reached);
    assert_eq!(tally.approval_ratio, Decimal::percent(10));

    let err = keeper_execute(
        &mut deps,
        COOLDOWN,
        ExecuteMsg::ActivateStrategy { strategy_id },
    )
    .unwrap_err();
    assert_eq!(err, ContractError::QuorumNotMet {});

    vote(&mut deps, &member(), strategy_id).unwrap();
    let tally = query_tally(&deps, strategy_id);
    assert!(tally.quorum_reached);
    assert_eq!(tally.voters, 2);
}

#[test]
fn test_resolve_voting() {
    let mut deps = mock_dependencies();
    let garden_id = setup_garden(&mut deps);
    join(&mut deps, garden_id, units(50));
    let strategy_id = propose(&mut deps, garden_id, vec![vault_operation()]);

    let resolve = |voters: Vec<String>, weights: Vec<Uint128>| ExecuteMsg::ResolveVoting {
        strategy_id,
        voters,
        weights,
    };

    // Only keepers submit batches
    let err = execute(
        deps.as_mut(),
        mock_env(),
        message_info(&creator(), &[]),
        resolve(vec![creator().to_string()], vec![units(1)]),
    )
    .unwrap_err();
    assert_eq!(err, ContractError::Unauthorized {});

    let err = keeper_execute(
        &mut deps,
        0,
        resolve(vec![creator().to_string()], vec![]),
    )
    .unwrap_err();
    assert!(matches!(err, ContractError::Validation { .. }));

    let err = keeper_execute(
        &mut deps,
        0,
        resolve(vec![member().to_string()], vec![units(51)]),
    )
    .unwrap_err();
    assert!(matches!(err, ContractError::Validation { .. }));

    let res = keeper_execute(
        &mut deps,
        0,
        resolve(
            vec![creator().to_string(), member().to_string()],
            vec![units(100), units(20)],
        ),
    )
    .unwrap();
    assert_eq!(attr(&res, "quorum_reached"), "true");
    assert_eq!(attr(&res, "voters"), "2");

    let tally = query_tally(&deps, strategy_id);
    assert_eq!(tally.total_weight, units(120));
    assert_eq!(query_strategy(&deps, strategy_id).state, StrategyState::Proposed);
}

#[test]
fn test_resolve_voting_expires_without_quorum() {
    let mut deps = mock_dependencies();
    let garden_id = setup_garden(&mut deps);
    let strategy_id = propose(&mut deps, garden_id, vec![vault_operation()]);
    assert_eq!(
        load_member(&deps, garden_id, &creator()).locked_shares,
        Uint128::new(UNIT / 10)
    );

    // Still inside the window, nothing changes
    let res = keeper_execute(
        &mut deps,
        VOTING_PERIOD,
        ExecuteMsg::ResolveVoting {
            strategy_id,
            voters: vec![],
            weights: vec![],
        },
    )
    .unwrap();
    assert_eq!(attr(&res, "quorum_reached"), "false");
    assert_eq!(query_strategy(&deps, strategy_id).state, StrategyState::Proposed);

    let res = keeper_execute(
        &mut deps,
        VOTING_PERIOD + 1,
        ExecuteMsg::ResolveVoting {
            strategy_id,
            voters: vec![],
            weights: vec![],
        },
    )
    .unwrap();
    assert_eq!(attr(&res, "to_state"), "expired");

    let strategy = query_strategy(&deps, strategy_id);
    assert_eq!(strategy.state, StrategyState::Expired);

    // Stake unlocked without penalty
    let creator_member = load_member(&deps, garden_id, &creator());
    assert!(creator_member.locked_shares.is_zero());
    assert_eq!(creator_member.shares, units(100));

    let garden = query_garden(&deps, garden_id);
    assert!(garden.strategies.is_empty());
    assert_eq!(garden.archived_strategies, vec![strategy_id]);
    assert!(garden.ledger.reserved.is_zero());
}

#[test]
fn test_expire_strategy() {
    let mut deps = mock_dependencies();
    let garden_id = setup_garden(&mut deps);
    let strategy_id = propose(&mut deps, garden_id, vec![vault_operation()]);
    let expire = ExecuteMsg::ExpireStrategy { strategy_id };

    let err = execute(
        deps.as_mut(),
        env_at(VOTING_PERIOD),
        message_info(&member(), &[]),
        expire.clone(),
    )
    .unwrap_err();
    assert_eq!(err, ContractError::VotingStillOpen {});

    execute(
        deps.as_mut(),
        env_at(VOTING_PERIOD + 1),
        message_info(&member(), &[]),
        expire.clone(),
    )
    .unwrap();
    assert_eq!(query_strategy(&deps, strategy_id).state, StrategyState::Expired);

    let err = execute(
        deps.as_mut(),
        env_at(VOTING_PERIOD + 1),
        message_info(&member(), &[]),
        expire,
    )
    .unwrap_err();
    assert!(format!("{:?}", err).contains("StateConflict"));
}

#[test]
fn test_approved_strategy_does_not_expire() {
    let mut deps = mock_dependencies();
    let garden_id = setup_garden(&mut deps);
    let strategy_id = propose(&mut deps, garden_id, vec![vault_operation()]);
    vote(&mut deps, &creator(), strategy_id).unwrap();

    let err = execute(
        deps.as_mut(),
        env_at(VOTING_PERIOD + 1),
        message_info(&member(), &[]),
        ExecuteMsg::ExpireStrategy { strategy_id },
    )
    .unwrap_err();
    assert!(matches!(err, ContractError::Validation { .. }));
}
