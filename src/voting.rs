use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Decimal, Fraction, Storage, Timestamp, Uint128};

use crate::error::ContractError;
use crate::state::{GardenConfig, Strategy, StrategyState, VOTES};

#[cw_serde]
pub struct Tally {
    pub quorum_reached: bool,
    pub approval_ratio: Decimal,
    pub total_weight: Uint128,
    pub eligible_weight: Uint128,
    pub voters: u32,
}

/// Records `weight` for `voter`. A cast vote is final. The window includes
/// `voting_ends_at` itself.
pub fn cast_vote(
    storage: &mut dyn Storage,
    strategy: &mut Strategy,
    voter: &Addr,
    weight: Uint128,
    now: Timestamp,
) -> Result<(), ContractError> {
    if strategy.state != StrategyState::Proposed || now > strategy.voting_ends_at {
        return Err(ContractError::VotingClosed {});
    }
    if VOTES.has(storage, (strategy.id, voter)) {
        return Err(ContractError::DuplicateVote {});
    }
    if weight.is_zero() {
        return Err(ContractError::validation("voter has no voting weight"));
    }

    VOTES.save(storage, (strategy.id, voter), &weight)?;
    strategy.votes.total_weight += weight;
    strategy.votes.voters += 1;

    Ok(())
}

pub fn tally(strategy: &Strategy, config: &GardenConfig, eligible_weight: Uint128) -> Tally {
    let approval_ratio = if eligible_weight.is_zero() {
        Decimal::zero()
    } else {
        Decimal::from_ratio(strategy.votes.total_weight, eligible_weight)
    };

    Tally {
        quorum_reached: meets_quorum(
            strategy.votes.total_weight,
            eligible_weight,
            config.min_voter_quorum,
        ) && strategy.votes.voters >= config.min_voters,
        approval_ratio,
        total_weight: strategy.votes.total_weight,
        eligible_weight,
        voters: strategy.votes.voters,
    }
}

/// `weight / eligible >= quorum`, compared without rounding.
fn meets_quorum(weight: Uint128, eligible: Uint128, quorum: Decimal) -> bool {
    !eligible.is_zero()
        && weight.full_mul(quorum.denominator()) >= eligible.full_mul(quorum.numerator())
}
