use cosmwasm_std::{Coin, CosmosMsg, Decimal, Deps, Fraction, Int128, Timestamp, Uint128};

use crate::error::ContractError;
use crate::integrations::{create_integration, signed_pnl, StepContext};
use crate::ledger::shares_to_mint_for_value;
use crate::rewards::{Settlement, SettlementTerms};
use crate::state::{Garden, GardenConfig, Member, Operation, Strategy, StrategyParams, StrategyState};
use crate::voting;

pub struct StrategyExecutor {}

pub enum ExecutionOutcome {
    Executed {
        messages: Vec<CosmosMsg>,
        released: Uint128,
    },
    /// A step failed; entered positions were unwound in reverse order.
    RolledBack {
        error: ContractError,
        messages: Vec<CosmosMsg>,
    },
}

pub struct Finalization {
    pub messages: Vec<CosmosMsg>,
    pub returned: Uint128,
    pub pnl: i128,
    pub settlement: Settlement,
    pub bonus_shares: Uint128,
    pub penalty_shares: Uint128,
}

pub enum UnwindOutcome {
    AlreadyUnwound,
    Unwound {
        messages: Vec<CosmosMsg>,
        returned: Uint128,
        pnl: i128,
        penalty_shares: Uint128,
    },
    Partial {
        messages: Vec<CosmosMsg>,
        error: ContractError,
        remaining: usize,
    },
}

impl StrategyExecutor {
    pub fn validate_proposal(
        config: &GardenConfig,
        params: &StrategyParams,
        operations: &[Operation],
    ) -> Result<(), ContractError> {
        if operations.is_empty() {
            return Err(ContractError::validation("strategy needs at least one operation"));
        }
        if params.duration < config.min_strategy_duration
            || params.duration > config.max_strategy_duration
        {
            return Err(ContractError::validation(format!(
                "duration must be within [{}, {}]",
                config.min_strategy_duration, config.max_strategy_duration
            )));
        }
        if params.max_capital_requested.is_zero() || params.stake.is_zero() {
            return Err(ContractError::validation(
                "stake and max capital requested must be positive",
            ));
        }
        if params.max_allocation_percentage.is_zero()
            || params.max_allocation_percentage > Decimal::one()
            || params.max_gas_fee_percentage > Decimal::one()
            || params.max_trade_slippage_percentage > Decimal::one()
        {
            return Err(ContractError::validation("percentages must be within (0, 1]"));
        }
        Ok(())
    }

    // Proposed -> Active
    pub fn activate(
        garden: &mut Garden,
        strategy: &mut Strategy,
        now: Timestamp,
    ) -> Result<Uint128, ContractError> {
        ensure_state(strategy, &[StrategyState::Proposed], "activate")?;

        let tally = voting::tally(strategy, &garden.config, garden.total_shares);
        if !tally.quorum_reached {
            return Err(ContractError::QuorumNotMet {});
        }
        if now < strategy
            .proposed_at
            .plus_seconds(garden.config.strategy_cooldown_period)
        {
            return Err(ContractError::CooldownNotElapsed {});
        }

        let allocation = strategy.params.max_allocation_percentage;
        let cap = garden
            .ledger
            .available()
            .multiply_ratio(allocation.numerator(), allocation.denominator());
        let amount = (strategy.params.stake + strategy.params.max_capital_requested).min(cap);
        if amount.is_zero() {
            return Err(ContractError::InsufficientFunds {});
        }

        garden.ledger.reserve(&mut strategy.capital_reserved, amount)?;
        strategy.state = StrategyState::Active;
        strategy.activated_at = Some(now);

        Ok(amount)
    }

    // Active -> Executed, activating a proposed strategy first
    #[allow(clippy::too_many_arguments)]
    pub fn execute(
        deps: Deps,
        garden: &mut Garden,
        strategy: &mut Strategy,
        strategist: &mut Member,
        capital: Option<Uint128>,
        fee: Uint128,
        now: Timestamp,
    ) -> Result<ExecutionOutcome, ContractError> {
        if strategy.state == StrategyState::Proposed {
            Self::activate(garden, strategy, now)?;
        }
        ensure_state(strategy, &[StrategyState::Active], "execute")?;

        if capital == Some(Uint128::zero()) {
            return Err(ContractError::validation("capital must be positive"));
        }
        let allocated = capital
            .unwrap_or(strategy.params.max_capital_requested)
            .min(strategy.params.max_capital_requested)
            .min(strategy.capital_reserved);
        if allocated.is_zero() {
            return Err(ContractError::InsufficientFunds {});
        }
        check_fee(&strategy.params, allocated, fee)?;

        let released = strategy.capital_reserved - allocated;
        garden.ledger.release(&mut strategy.capital_reserved, released)?;
        garden.ledger.debit(fee)?;
        strategy.keeper_fees += fee;
        strategy.capital_allocated = allocated;

        let mut capital = Coin {
            denom: garden.reserve_denom.clone(),
            amount: allocated,
        };
        let mut positions = vec![];
        let mut messages = vec![];

        let operations = strategy.operations.clone();
        for (index, operation) in operations.iter().enumerate() {
            let ctx = step_context(garden, strategy, index as u32);
            let adapter =
                create_integration(operation.integration_kind, operation.integration.clone());

            match adapter.enter(deps, &ctx, capital.clone(), &operation.params) {
                Ok(entered) => {
                    capital = entered.position.output.clone();
                    messages.extend(entered.messages);
                    positions.push(entered.position);
                }
                Err(err) => {
                    let error = err.at_step(index as u32);
                    strategy.positions = positions;
                    strategy.pending_return = None;
                    let unwound = Self::unwind_positions(deps, garden, strategy, strategist, now)?;
                    messages.extend(unwound.into_messages());
                    return Ok(ExecutionOutcome::RolledBack { error, messages });
                }
            }
        }

        strategy.positions = positions;
        strategy.executed_at = Some(now);
        strategy.finalize_after = Some(now.plus_seconds(strategy.params.duration));
        strategy.state = StrategyState::Executed;

        Ok(ExecutionOutcome::Executed { messages, released })
    }

    // Executed -> Finalized
    #[allow(clippy::too_many_arguments)]
    pub fn finalize(
        deps: Deps,
        garden: &mut Garden,
        strategy: &mut Strategy,
        strategist: &mut Member,
        fee: Uint128,
        min_return: Uint128,
        now: Timestamp,
    ) -> Result<Finalization, ContractError> {
        ensure_state(strategy, &[StrategyState::Executed], "finalize")?;
        let finalize_after = strategy.finalize_after.unwrap_or(now);
        if now < finalize_after {
            return Err(ContractError::DurationNotElapsed {});
        }
        check_fee(&strategy.params, strategy.capital_allocated, fee)?;

        // Exit on a copy so a failing venue leaves the strategy executed
        let mut working = strategy.clone();
        let (messages, failure) = Self::exit_positions(deps, garden, &mut working);
        if let Some(error) = failure {
            return Err(error);
        }
        let returned = working
            .pending_return
            .take()
            .unwrap_or(working.capital_allocated);
        if !min_return.is_zero() && returned < min_return {
            return Err(ContractError::MinimumReturnNotMet {
                expected: min_return,
                returned,
            });
        }
        let pnl = signed_diff(returned, working.capital_allocated)?;
        *strategy = working;

        let held = strategy.capital_reserved;
        garden.ledger.release(&mut strategy.capital_reserved, held)?;
        garden.ledger.settle_pnl(pnl)?;
        garden.ledger.debit(fee)?;
        strategy.keeper_fees += fee;

        let settlement = garden.config.reward_curve.settle(
            &garden.config,
            &SettlementTerms {
                stake: strategy.params.stake,
                pnl,
                duration: strategy.params.duration,
                lateness: now.seconds().saturating_sub(finalize_after.seconds()),
            },
        );
        let (bonus_shares, penalty_shares) =
            settle_stake(garden, strategy, strategist, &settlement);

        strategy.capital_returned = returned;
        strategy.realized_pnl = Int128::new(pnl);
        strategy.finalized_at = Some(now);
        strategy.state = StrategyState::Finalized;
        garden.archive(strategy.id);

        Ok(Finalization {
            messages,
            returned,
            pnl,
            settlement,
            bonus_shares,
            penalty_shares,
        })
    }

    /// Forced exit. Repeating it on an unwound strategy is a no-op.
    pub fn unwind(
        deps: Deps,
        garden: &mut Garden,
        strategy: &mut Strategy,
        strategist: &mut Member,
        now: Timestamp,
    ) -> Result<UnwindOutcome, ContractError> {
        match strategy.state {
            StrategyState::Unwound => Ok(UnwindOutcome::AlreadyUnwound),
            StrategyState::Active => {
                let held = strategy.capital_reserved;
                garden.ledger.release(&mut strategy.capital_reserved, held)?;
                let (_, penalty_shares) =
                    settle_stake(garden, strategy, strategist, &Settlement::default());
                strategy.finalized_at = Some(now);
                strategy.state = StrategyState::Unwound;
                garden.archive(strategy.id);

                Ok(UnwindOutcome::Unwound {
                    messages: vec![],
                    returned: Uint128::zero(),
                    pnl: 0,
                    penalty_shares,
                })
            }
            StrategyState::Executed | StrategyState::UnwoundPartial => {
                Self::unwind_positions(deps, garden, strategy, strategist, now)
            }
            _ => Err(conflict(strategy, "unwind")),
        }
    }

    // Proposed -> Expired
    pub fn expire(
        garden: &mut Garden,
        strategy: &mut Strategy,
        strategist: &mut Member,
        now: Timestamp,
    ) -> Result<(), ContractError> {
        ensure_state(strategy, &[StrategyState::Proposed], "expire")?;
        if now <= strategy.voting_ends_at {
            return Err(ContractError::VotingStillOpen {});
        }
        if voting::tally(strategy, &garden.config, garden.total_shares).quorum_reached {
            return Err(ContractError::validation(
                "strategy reached quorum and can still be activated",
            ));
        }

        let held = strategy.capital_reserved;
        garden.ledger.release(&mut strategy.capital_reserved, held)?;
        settle_stake(garden, strategy, strategist, &Settlement::default());
        strategy.finalized_at = Some(now);
        strategy.state = StrategyState::Expired;
        garden.archive(strategy.id);

        Ok(())
    }

    /// Exits live positions last-in first-out, feeding each exit's return into
    /// the exit below it. Stops at the first failure, keeping what remains.
    fn exit_positions(
        deps: Deps,
        garden: &Garden,
        strategy: &mut Strategy,
    ) -> (Vec<CosmosMsg>, Option<ContractError>) {
        let mut messages = vec![];

        while let Some(position) = strategy.positions.last().cloned() {
            let amount = strategy.pending_return.unwrap_or(position.output.amount);
            let ctx = step_context(garden, strategy, position.step);
            let adapter = create_integration(position.integration_kind, position.integration.clone());

            match adapter.exit(deps, &ctx, &position, amount) {
                Ok(exited) => {
                    messages.extend(exited.messages);
                    strategy.pending_return = Some(exited.returned.amount);
                    strategy.positions.pop();
                }
                Err(err) => return (messages, Some(err.at_step(position.step))),
            }
        }

        (messages, None)
    }

    fn unwind_positions(
        deps: Deps,
        garden: &mut Garden,
        strategy: &mut Strategy,
        strategist: &mut Member,
        now: Timestamp,
    ) -> Result<UnwindOutcome, ContractError> {
        let (messages, failure) = Self::exit_positions(deps, garden, strategy);
        if let Some(error) = failure {
            strategy.state = StrategyState::UnwoundPartial;
            return Ok(UnwindOutcome::Partial {
                messages,
                error,
                remaining: strategy.positions.len(),
            });
        }

        let returned = strategy
            .pending_return
            .take()
            .unwrap_or(strategy.capital_allocated);
        let pnl = signed_diff(returned, strategy.capital_allocated)?;

        let held = strategy.capital_reserved;
        garden.ledger.release(&mut strategy.capital_reserved, held)?;
        garden.ledger.settle_pnl(pnl)?;

        // Forced exits never earn a bonus
        let settlement = Settlement {
            bonus: Uint128::zero(),
            ..garden.config.reward_curve.settle(
                &garden.config,
                &SettlementTerms {
                    stake: strategy.params.stake,
                    pnl,
                    duration: strategy.params.duration,
                    lateness: 0,
                },
            )
        };
        let (_, penalty_shares) = settle_stake(garden, strategy, strategist, &settlement);

        strategy.capital_returned = returned;
        strategy.realized_pnl = Int128::new(pnl);
        strategy.finalized_at = Some(now);
        strategy.state = StrategyState::Unwound;
        garden.archive(strategy.id);

        Ok(UnwindOutcome::Unwound {
            messages,
            returned,
            pnl,
            penalty_shares,
        })
    }
}

impl UnwindOutcome {
    pub fn into_messages(self) -> Vec<CosmosMsg> {
        match self {
            UnwindOutcome::AlreadyUnwound => vec![],
            UnwindOutcome::Unwound { messages, .. } | UnwindOutcome::Partial { messages, .. } => {
                messages
            }
        }
    }
}

fn ensure_state(
    strategy: &Strategy,
    allowed: &[StrategyState],
    action: &str,
) -> Result<(), ContractError> {
    if allowed.contains(&strategy.state) {
        Ok(())
    } else {
        Err(conflict(strategy, action))
    }
}

fn conflict(strategy: &Strategy, action: &str) -> ContractError {
    ContractError::StateConflict {
        state: strategy.state.to_string(),
        action: action.to_string(),
    }
}

fn step_context(garden: &Garden, strategy: &Strategy, step: u32) -> StepContext {
    StepContext {
        step,
        // The garden's base slippage is the floor every strategy trades under
        max_slippage: strategy
            .params
            .max_trade_slippage_percentage
            .max(garden.config.base_slippage),
        min_liquidity: garden.config.min_liquidity_asset,
    }
}

fn check_fee(params: &StrategyParams, capital: Uint128, fee: Uint128) -> Result<(), ContractError> {
    let pct = params.max_gas_fee_percentage;
    let max_fee = capital.multiply_ratio(pct.numerator(), pct.denominator());
    if fee > max_fee {
        return Err(ContractError::validation(format!(
            "keeper fee {} exceeds maximum {}",
            fee, max_fee
        )));
    }
    Ok(())
}

// Capital comes back through the exit of the first step
fn signed_diff(returned: Uint128, allocated: Uint128) -> Result<i128, ContractError> {
    signed_pnl(returned, allocated).map_err(|err| err.at_step(0))
}

/// Unlocks the stake, burning the slashed part and minting the bonus.
fn settle_stake(
    garden: &mut Garden,
    strategy: &Strategy,
    strategist: &mut Member,
    settlement: &Settlement,
) -> (Uint128, Uint128) {
    let penalty_shares = if settlement.penalty.is_zero() {
        Uint128::zero()
    } else {
        strategy
            .stake_shares
            .multiply_ratio(settlement.penalty, strategy.params.stake)
    };

    strategist.locked_shares = strategist.locked_shares.saturating_sub(strategy.stake_shares);
    strategist.shares = strategist.shares.saturating_sub(penalty_shares);
    garden.total_shares = garden.total_shares.saturating_sub(penalty_shares);

    let bonus_shares =
        shares_to_mint_for_value(settlement.bonus, garden.total_shares, garden.ledger.balance);
    strategist.shares += bonus_shares;
    garden.total_shares += bonus_shares;

    (bonus_shares, penalty_shares)
}
