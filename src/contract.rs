#[cfg(not(feature = "library"))]
use cosmwasm_std::entry_point;
use cosmwasm_std::{
    to_json_binary, Addr, Attribute, BankMsg, Binary, Coin, CosmosMsg, Decimal, Deps, DepsMut,
    Env, MessageInfo, Order, Response, StdResult, Storage, Uint128,
};
use cw2::set_contract_version;
use cw_storage_plus::Bound;

use crate::error::ContractError;
use crate::integrations::resolve_operation;
use crate::ledger::{shares_for_deposit, value_of_shares};
use crate::msg::{
    ConfigResponse, ExecuteMsg, GardenConfigMsg, GardenResponse, GardensResponse,
    InstantiateMsg, IntegrationMsg, IntegrationsResponse, MemberResponse, OperationMsg,
    QueryMsg, StrategiesResponse, StrategyResponse, VoteResponse,
};
use crate::state::{
    CapitalLedger, Config, Garden, GardenConfig, IntegrationInfo, Member, Strategy,
    StrategyParams, StrategyState, VoteTally, CONFIG, GARDENS, GARDEN_COUNT, INTEGRATIONS,
    MEMBERS, STRATEGIES, STRATEGY_COUNT, VOTES,
};
use crate::strategy_executor::{ExecutionOutcome, StrategyExecutor, UnwindOutcome};
use crate::voting;

// version info for migration
const CONTRACT_NAME: &str = "crates.io:garden-strategies";
const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 30;

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn instantiate(
    deps: DepsMut,
    _env: Env,
    _info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    let config = Config {
        admin: deps.api.addr_validate(&msg.admin)?,
        keepers: msg
            .keepers
            .iter()
            .map(|keeper| deps.api.addr_validate(keeper))
            .collect::<StdResult<Vec<_>>>()?,
    };
    CONFIG.save(deps.storage, &config)?;

    for integration in &msg.integrations {
        let info = integration_info(deps.as_ref(), integration)?;
        INTEGRATIONS.save(deps.storage, &info.address, &info)?;
    }

    GARDEN_COUNT.save(deps.storage, &0)?;
    STRATEGY_COUNT.save(deps.storage, &0)?;

    Ok(Response::new()
        .add_attribute("method", "instantiate")
        .add_attribute("admin", msg.admin)
        .add_attribute("keepers", config.keepers.len().to_string())
        .add_attribute("integrations", msg.integrations.len().to_string()))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    match msg {
        // Garden membership
        ExecuteMsg::CreateGarden {
            name,
            reserve_denom,
            config,
        } => execute_create_garden(deps, env, info, name, reserve_denom, config),
        ExecuteMsg::Deposit { garden_id } => execute_deposit(deps, env, info, garden_id),
        ExecuteMsg::Withdraw { garden_id, shares } => {
            execute_withdraw(deps, env, info, garden_id, shares)
        }

        // Strategy proposals and voting
        ExecuteMsg::AddStrategy {
            garden_id,
            name,
            metadata,
            params,
            operations,
        } => execute_add_strategy(deps, env, info, garden_id, name, metadata, params, operations),
        ExecuteMsg::CastVote { strategy_id } => execute_cast_vote(deps, env, info, strategy_id),
        ExecuteMsg::ResolveVoting {
            strategy_id,
            voters,
            weights,
        } => execute_resolve_voting(deps, env, info, strategy_id, voters, weights),

        // Keeper transitions
        ExecuteMsg::ActivateStrategy { strategy_id } => {
            execute_activate_strategy(deps, env, info, strategy_id)
        }
        ExecuteMsg::ExecuteStrategy {
            strategy_id,
            capital,
            fee,
        } => execute_execute_strategy(deps, env, info, strategy_id, capital, fee),
        ExecuteMsg::FinalizeStrategy {
            strategy_id,
            fee,
            min_return,
        } => execute_finalize_strategy(deps, env, info, strategy_id, fee, min_return),
        ExecuteMsg::UnwindStrategy { strategy_id } => {
            execute_unwind_strategy(deps, env, info, strategy_id)
        }
        ExecuteMsg::ExpireStrategy { strategy_id } => {
            execute_expire_strategy(deps, env, info, strategy_id)
        }

        // Admin functions
        ExecuteMsg::RegisterIntegration { integration } => {
            execute_register_integration(deps, env, info, integration)
        }
        ExecuteMsg::RemoveIntegration { address } => {
            execute_remove_integration(deps, env, info, address)
        }
        ExecuteMsg::UpdateKeepers { add, remove } => {
            execute_update_keepers(deps, env, info, add, remove)
        }
        ExecuteMsg::UpdateAdmin { admin } => execute_update_admin(deps, env, info, admin),
    }
}

pub fn execute_create_garden(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    name: String,
    reserve_denom: String,
    config: GardenConfigMsg,
) -> Result<Response, ContractError> {
    if name.trim().is_empty() || reserve_denom.trim().is_empty() {
        return Err(ContractError::validation("garden name and denom are required"));
    }
    let config = GardenConfig::from(config);
    validate_garden_config(&config)?;

    // The creator seeds the garden and becomes its first member
    let contribution = single_coin(&info, &reserve_denom)?;
    if contribution < config.min_contribution {
        return Err(ContractError::MinContributionNotMet {});
    }
    if contribution > config.max_deposit_limit {
        return Err(ContractError::DepositLimitExceeded {});
    }

    let id = GARDEN_COUNT.load(deps.storage)? + 1;
    GARDEN_COUNT.save(deps.storage, &id)?;

    let garden = Garden {
        id,
        name: name.clone(),
        creator: info.sender.clone(),
        reserve_denom: reserve_denom.clone(),
        config,
        ledger: CapitalLedger {
            balance: contribution,
            reserved: Uint128::zero(),
        },
        total_shares: contribution,
        strategies: vec![],
        archived_strategies: vec![],
        created_at: env.block.time,
    };
    GARDENS.save(deps.storage, id, &garden)?;
    MEMBERS.save(
        deps.storage,
        (id, &info.sender),
        &Member {
            shares: contribution,
            locked_shares: Uint128::zero(),
            last_deposit_at: env.block.time,
        },
    )?;

    Ok(Response::new()
        .add_attribute("method", "create_garden")
        .add_attribute("garden_id", id.to_string())
        .add_attribute("name", name)
        .add_attribute("creator", info.sender)
        .add_attribute("reserve_denom", reserve_denom)
        .add_attribute("contribution", contribution.to_string()))
}

pub fn execute_deposit(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    garden_id: u64,
) -> Result<Response, ContractError> {
    let mut garden = load_garden(deps.storage, garden_id)?;
    let amount = single_coin(&info, &garden.reserve_denom)?;

    if amount < garden.config.min_contribution {
        return Err(ContractError::MinContributionNotMet {});
    }
    if garden.ledger.balance + amount > garden.config.max_deposit_limit {
        return Err(ContractError::DepositLimitExceeded {});
    }

    let shares = shares_for_deposit(amount, garden.total_shares, garden.ledger.balance);
    if shares.is_zero() {
        return Err(ContractError::validation("deposit too small to mint shares"));
    }

    garden.ledger.credit(amount);
    garden.total_shares += shares;
    GARDENS.save(deps.storage, garden_id, &garden)?;

    MEMBERS.update(
        deps.storage,
        (garden_id, &info.sender),
        |maybe_member| -> StdResult<_> {
            let mut member = maybe_member.unwrap_or(Member {
                shares: Uint128::zero(),
                locked_shares: Uint128::zero(),
                last_deposit_at: env.block.time,
            });
            member.shares += shares;
            member.last_deposit_at = env.block.time;
            Ok(member)
        },
    )?;

    Ok(Response::new()
        .add_attribute("method", "deposit")
        .add_attribute("garden_id", garden_id.to_string())
        .add_attribute("depositor", info.sender)
        .add_attribute("amount", amount.to_string())
        .add_attribute("shares", shares.to_string()))
}

pub fn execute_withdraw(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    garden_id: u64,
    shares: Uint128,
) -> Result<Response, ContractError> {
    let mut garden = load_garden(deps.storage, garden_id)?;
    let mut member = MEMBERS
        .may_load(deps.storage, (garden_id, &info.sender))?
        .ok_or(ContractError::Unauthorized {})?;

    if shares.is_zero() {
        return Err(ContractError::validation("shares must be positive"));
    }

    let unlocks_at = member
        .last_deposit_at
        .plus_seconds(garden.config.deposit_hardlock);
    if env.block.time < unlocks_at {
        return Err(ContractError::HardlockActive { unlocks_at });
    }

    // Shares backing an open stake cannot leave
    if shares > member.unlocked_shares() {
        return Err(ContractError::InsufficientFunds {});
    }

    let value = value_of_shares(shares, garden.total_shares, garden.ledger.balance);
    garden.ledger.debit(value)?;
    garden.total_shares -= shares;
    member.shares -= shares;

    GARDENS.save(deps.storage, garden_id, &garden)?;
    MEMBERS.save(deps.storage, (garden_id, &info.sender), &member)?;

    let mut messages: Vec<CosmosMsg> = vec![];
    if !value.is_zero() {
        messages.push(CosmosMsg::Bank(BankMsg::Send {
            to_address: info.sender.to_string(),
            amount: vec![Coin {
                denom: garden.reserve_denom.clone(),
                amount: value,
            }],
        }));
    }

    Ok(Response::new()
        .add_messages(messages)
        .add_attribute("method", "withdraw")
        .add_attribute("garden_id", garden_id.to_string())
        .add_attribute("withdrawer", info.sender)
        .add_attribute("shares", shares.to_string())
        .add_attribute("amount", value.to_string()))
}

#[allow(clippy::too_many_arguments)]
pub fn execute_add_strategy(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    garden_id: u64,
    name: String,
    metadata: String,
    params: StrategyParams,
    operations: Vec<OperationMsg>,
) -> Result<Response, ContractError> {
    let mut garden = load_garden(deps.storage, garden_id)?;

    // Only strategists of the garden can propose
    let mut member = match MEMBERS.may_load(deps.storage, (garden_id, &info.sender))? {
        Some(member) if garden.is_strategist(&info.sender, Some(&member)) => member,
        _ => return Err(ContractError::Unauthorized {}),
    };

    let mut resolved = Vec::with_capacity(operations.len());
    for op in operations {
        let address = deps.api.addr_validate(&op.integration)?;
        resolved.push(resolve_operation(
            deps.storage,
            &garden.config,
            op.kind,
            address,
            op.params,
        )?);
    }
    StrategyExecutor::validate_proposal(&garden.config, &params, &resolved)?;

    let free_value = value_of_shares(
        member.unlocked_shares(),
        garden.total_shares,
        garden.ledger.balance,
    );
    if params.stake > free_value {
        return Err(ContractError::StakeExceedsBalance {});
    }
    let stake_shares = params
        .stake
        .multiply_ratio(garden.total_shares, garden.ledger.balance);
    member.locked_shares += stake_shares;

    let id = STRATEGY_COUNT.load(deps.storage)? + 1;
    STRATEGY_COUNT.save(deps.storage, &id)?;

    let now = env.block.time;
    let strategy = Strategy {
        id,
        garden_id,
        strategist: info.sender.clone(),
        name: name.clone(),
        metadata,
        params,
        stake_shares,
        operations: resolved,
        state: StrategyState::Proposed,
        votes: VoteTally::default(),
        proposed_at: now,
        voting_ends_at: now.plus_seconds(garden.config.max_candidate_period),
        activated_at: None,
        executed_at: None,
        finalize_after: None,
        finalized_at: None,
        capital_reserved: Uint128::zero(),
        capital_allocated: Uint128::zero(),
        capital_returned: Uint128::zero(),
        realized_pnl: Default::default(),
        keeper_fees: Uint128::zero(),
        positions: vec![],
        pending_return: None,
    };
    garden.strategies.push(id);

    STRATEGIES.save(deps.storage, id, &strategy)?;
    GARDENS.save(deps.storage, garden_id, &garden)?;
    MEMBERS.save(deps.storage, (garden_id, &info.sender), &member)?;

    Ok(Response::new()
        .add_attribute("method", "add_strategy")
        .add_attribute("garden_id", garden_id.to_string())
        .add_attribute("strategy_id", id.to_string())
        .add_attribute("strategist", info.sender)
        .add_attribute("name", name)
        .add_attribute("stake", strategy.params.stake.to_string())
        .add_attribute("voting_ends_at", strategy.voting_ends_at.to_string()))
}

pub fn execute_cast_vote(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    strategy_id: u64,
) -> Result<Response, ContractError> {
    let mut strategy = load_strategy(deps.storage, strategy_id)?;
    let garden = load_garden(deps.storage, strategy.garden_id)?;

    // Weight is the voter's balance at the time of the vote
    let weight = MEMBERS
        .may_load(deps.storage, (garden.id, &info.sender))?
        .map(|member| member.shares)
        .unwrap_or_default();
    voting::cast_vote(deps.storage, &mut strategy, &info.sender, weight, env.block.time)?;
    STRATEGIES.save(deps.storage, strategy_id, &strategy)?;

    let tally = voting::tally(&strategy, &garden.config, garden.total_shares);

    Ok(Response::new()
        .add_attribute("method", "cast_vote")
        .add_attribute("strategy_id", strategy_id.to_string())
        .add_attribute("voter", info.sender)
        .add_attribute("weight", weight.to_string())
        .add_attribute("quorum_reached", tally.quorum_reached.to_string()))
}

pub fn execute_resolve_voting(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    strategy_id: u64,
    voters: Vec<String>,
    weights: Vec<Uint128>,
) -> Result<Response, ContractError> {
    ensure_keeper(deps.storage, &info.sender)?;
    if voters.len() != weights.len() {
        return Err(ContractError::validation("voters and weights differ in length"));
    }

    let mut strategy = load_strategy(deps.storage, strategy_id)?;
    let mut garden = load_garden(deps.storage, strategy.garden_id)?;

    for (voter, weight) in voters.iter().zip(weights) {
        let voter = deps.api.addr_validate(voter)?;
        let balance = MEMBERS
            .may_load(deps.storage, (garden.id, &voter))?
            .map(|member| member.shares)
            .unwrap_or_default();
        if weight > balance {
            return Err(ContractError::validation(format!(
                "vote weight of {} exceeds its share balance",
                voter
            )));
        }
        voting::cast_vote(deps.storage, &mut strategy, &voter, weight, env.block.time)?;
    }

    let tally = voting::tally(&strategy, &garden.config, garden.total_shares);
    let mut response = Response::new()
        .add_attribute("method", "resolve_voting")
        .add_attribute("strategy_id", strategy_id.to_string())
        .add_attribute("voters", tally.voters.to_string())
        .add_attribute("total_weight", tally.total_weight.to_string())
        .add_attribute("quorum_reached", tally.quorum_reached.to_string());

    // A closed window without quorum expires the proposal right away
    if !tally.quorum_reached && env.block.time > strategy.voting_ends_at {
        let mut strategist = load_strategist(deps.storage, &strategy)?;
        StrategyExecutor::expire(&mut garden, &mut strategy, &mut strategist, env.block.time)?;
        MEMBERS.save(deps.storage, (garden.id, &strategy.strategist), &strategist)?;
        GARDENS.save(deps.storage, garden.id, &garden)?;
        response = response.add_attribute("to_state", strategy.state.to_string());
    }
    STRATEGIES.save(deps.storage, strategy_id, &strategy)?;

    Ok(response)
}

pub fn execute_activate_strategy(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    strategy_id: u64,
) -> Result<Response, ContractError> {
    ensure_keeper(deps.storage, &info.sender)?;
    let mut strategy = load_strategy(deps.storage, strategy_id)?;
    let mut garden = load_garden(deps.storage, strategy.garden_id)?;

    let reserved = StrategyExecutor::activate(&mut garden, &mut strategy, env.block.time)?;

    GARDENS.save(deps.storage, garden.id, &garden)?;
    STRATEGIES.save(deps.storage, strategy_id, &strategy)?;

    Ok(Response::new()
        .add_attribute("method", "activate_strategy")
        .add_attribute("strategy_id", strategy_id.to_string())
        .add_attribute("capital_reserved", reserved.to_string())
        .add_attribute("to_state", strategy.state.to_string()))
}

pub fn execute_execute_strategy(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    strategy_id: u64,
    capital: Option<Uint128>,
    fee: Uint128,
) -> Result<Response, ContractError> {
    ensure_keeper(deps.storage, &info.sender)?;
    let mut strategy = load_strategy(deps.storage, strategy_id)?;
    let mut garden = load_garden(deps.storage, strategy.garden_id)?;
    let mut strategist = load_strategist(deps.storage, &strategy)?;
    let from_state = strategy.state;

    let outcome = StrategyExecutor::execute(
        deps.as_ref(),
        &mut garden,
        &mut strategy,
        &mut strategist,
        capital,
        fee,
        env.block.time,
    )?;

    GARDENS.save(deps.storage, garden.id, &garden)?;
    STRATEGIES.save(deps.storage, strategy_id, &strategy)?;
    MEMBERS.save(deps.storage, (garden.id, &strategy.strategist), &strategist)?;

    let mut response = Response::new()
        .add_attribute("method", "execute_strategy")
        .add_attribute("strategy_id", strategy_id.to_string())
        .add_attribute("from_state", from_state.to_string())
        .add_attribute("to_state", strategy.state.to_string())
        .add_attribute("capital_allocated", strategy.capital_allocated.to_string());

    // Failed pipelines are persisted as unwound rather than reverted
    match outcome {
        ExecutionOutcome::Executed { messages, released } => {
            response = response
                .add_messages(messages)
                .add_attribute("result", "executed")
                .add_attribute("released", released.to_string());
        }
        ExecutionOutcome::RolledBack { error, messages } => {
            response = response
                .add_messages(messages)
                .add_attributes(failure_attributes(&error));
        }
    }

    Ok(response.add_messages(keeper_fee(&info.sender, &garden, fee)))
}

pub fn execute_finalize_strategy(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    strategy_id: u64,
    fee: Uint128,
    min_return: Uint128,
) -> Result<Response, ContractError> {
    ensure_keeper(deps.storage, &info.sender)?;
    let mut strategy = load_strategy(deps.storage, strategy_id)?;
    let mut garden = load_garden(deps.storage, strategy.garden_id)?;
    let mut strategist = load_strategist(deps.storage, &strategy)?;

    let finalization = StrategyExecutor::finalize(
        deps.as_ref(),
        &mut garden,
        &mut strategy,
        &mut strategist,
        fee,
        min_return,
        env.block.time,
    )?;

    GARDENS.save(deps.storage, garden.id, &garden)?;
    STRATEGIES.save(deps.storage, strategy_id, &strategy)?;
    MEMBERS.save(deps.storage, (garden.id, &strategy.strategist), &strategist)?;

    Ok(Response::new()
        .add_messages(finalization.messages)
        .add_messages(keeper_fee(&info.sender, &garden, fee))
        .add_attribute("method", "finalize_strategy")
        .add_attribute("strategy_id", strategy_id.to_string())
        .add_attribute("to_state", strategy.state.to_string())
        .add_attribute("capital_returned", finalization.returned.to_string())
        .add_attribute("pnl", finalization.pnl.to_string())
        .add_attribute("bonus", finalization.settlement.bonus.to_string())
        .add_attribute("penalty", finalization.settlement.penalty.to_string())
        .add_attribute("bonus_shares", finalization.bonus_shares.to_string())
        .add_attribute("penalty_shares", finalization.penalty_shares.to_string()))
}

pub fn execute_unwind_strategy(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    strategy_id: u64,
) -> Result<Response, ContractError> {
    ensure_keeper(deps.storage, &info.sender)?;
    let mut strategy = load_strategy(deps.storage, strategy_id)?;
    let mut garden = load_garden(deps.storage, strategy.garden_id)?;
    let mut strategist = load_strategist(deps.storage, &strategy)?;
    let from_state = strategy.state;

    let outcome = StrategyExecutor::unwind(
        deps.as_ref(),
        &mut garden,
        &mut strategy,
        &mut strategist,
        env.block.time,
    )?;

    let response = Response::new()
        .add_attribute("method", "unwind_strategy")
        .add_attribute("strategy_id", strategy_id.to_string())
        .add_attribute("from_state", from_state.to_string());

    let response = match outcome {
        // Nothing to persist
        UnwindOutcome::AlreadyUnwound => {
            return Ok(response.add_attribute("status", "already_unwound"));
        }
        UnwindOutcome::Unwound {
            messages,
            returned,
            pnl,
            penalty_shares,
        } => response
            .add_messages(messages)
            .add_attribute("result", "unwound")
            .add_attribute("capital_returned", returned.to_string())
            .add_attribute("pnl", pnl.to_string())
            .add_attribute("penalty_shares", penalty_shares.to_string()),
        UnwindOutcome::Partial {
            messages,
            error,
            remaining,
        } => response
            .add_messages(messages)
            .add_attributes(failure_attributes(&error))
            .add_attribute("remaining_positions", remaining.to_string()),
    };

    GARDENS.save(deps.storage, garden.id, &garden)?;
    STRATEGIES.save(deps.storage, strategy_id, &strategy)?;
    MEMBERS.save(deps.storage, (garden.id, &strategy.strategist), &strategist)?;

    Ok(response.add_attribute("to_state", strategy.state.to_string()))
}

pub fn execute_expire_strategy(
    deps: DepsMut,
    env: Env,
    _info: MessageInfo,
    strategy_id: u64,
) -> Result<Response, ContractError> {
    let mut strategy = load_strategy(deps.storage, strategy_id)?;
    let mut garden = load_garden(deps.storage, strategy.garden_id)?;
    let mut strategist = load_strategist(deps.storage, &strategy)?;

    StrategyExecutor::expire(&mut garden, &mut strategy, &mut strategist, env.block.time)?;

    GARDENS.save(deps.storage, garden.id, &garden)?;
    STRATEGIES.save(deps.storage, strategy_id, &strategy)?;
    MEMBERS.save(deps.storage, (garden.id, &strategy.strategist), &strategist)?;

    Ok(Response::new()
        .add_attribute("method", "expire_strategy")
        .add_attribute("strategy_id", strategy_id.to_string())
        .add_attribute("to_state", strategy.state.to_string()))
}

pub fn execute_register_integration(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    integration: IntegrationMsg,
) -> Result<Response, ContractError> {
    ensure_admin(deps.storage, &info.sender)?;

    let integration = integration_info(deps.as_ref(), &integration)?;
    INTEGRATIONS.save(deps.storage, &integration.address, &integration)?;

    Ok(Response::new()
        .add_attribute("method", "register_integration")
        .add_attribute("address", integration.address)
        .add_attribute("name", integration.name))
}

pub fn execute_remove_integration(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    address: String,
) -> Result<Response, ContractError> {
    ensure_admin(deps.storage, &info.sender)?;

    let addr = deps.api.addr_validate(&address)?;
    if !INTEGRATIONS.has(deps.storage, &addr) {
        return Err(ContractError::IntegrationNotFound { address });
    }
    // Strategies already proposed keep their resolved integration kind
    INTEGRATIONS.remove(deps.storage, &addr);

    Ok(Response::new()
        .add_attribute("method", "remove_integration")
        .add_attribute("address", address))
}

pub fn execute_update_keepers(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    add: Vec<String>,
    remove: Vec<String>,
) -> Result<Response, ContractError> {
    let mut config = ensure_admin(deps.storage, &info.sender)?;

    for keeper in &add {
        let keeper = deps.api.addr_validate(keeper)?;
        if !config.keepers.contains(&keeper) {
            config.keepers.push(keeper);
        }
    }
    for keeper in &remove {
        let keeper = deps.api.addr_validate(keeper)?;
        config.keepers.retain(|k| *k != keeper);
    }
    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new()
        .add_attribute("method", "update_keepers")
        .add_attribute("keepers", config.keepers.len().to_string()))
}

pub fn execute_update_admin(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    admin: String,
) -> Result<Response, ContractError> {
    // Only current admin can update admin
    let mut config = ensure_admin(deps.storage, &info.sender)?;

    config.admin = deps.api.addr_validate(&admin)?;
    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new()
        .add_attribute("method", "update_admin")
        .add_attribute("new_admin", admin))
}

fn ensure_admin(storage: &dyn Storage, sender: &Addr) -> Result<Config, ContractError> {
    let config = CONFIG.load(storage)?;
    if *sender != config.admin {
        return Err(ContractError::Unauthorized {});
    }
    Ok(config)
}

fn ensure_keeper(storage: &dyn Storage, sender: &Addr) -> Result<(), ContractError> {
    if !CONFIG.load(storage)?.is_keeper(sender) {
        return Err(ContractError::Unauthorized {});
    }
    Ok(())
}

fn load_garden(storage: &dyn Storage, id: u64) -> Result<Garden, ContractError> {
    GARDENS
        .may_load(storage, id)?
        .ok_or(ContractError::GardenNotFound { id })
}

fn load_strategy(storage: &dyn Storage, id: u64) -> Result<Strategy, ContractError> {
    STRATEGIES
        .may_load(storage, id)?
        .ok_or(ContractError::StrategyNotFound { id })
}

fn load_strategist(storage: &dyn Storage, strategy: &Strategy) -> Result<Member, ContractError> {
    Ok(MEMBERS.load(storage, (strategy.garden_id, &strategy.strategist))?)
}

fn integration_info(deps: Deps, msg: &IntegrationMsg) -> Result<IntegrationInfo, ContractError> {
    if msg.name.trim().is_empty() {
        return Err(ContractError::validation("integration name is required"));
    }
    Ok(IntegrationInfo {
        address: deps.api.addr_validate(&msg.address)?,
        name: msg.name.clone(),
        kind: msg.kind,
    })
}

// Exactly one coin of the garden's reserve denomination
fn single_coin(info: &MessageInfo, denom: &str) -> Result<Uint128, ContractError> {
    match info.funds.as_slice() {
        [] => Err(ContractError::NoFunds {}),
        [coin] if coin.denom != denom => Err(ContractError::InvalidDenom {
            expected: denom.to_string(),
            received: coin.denom.clone(),
        }),
        [coin] if coin.amount.is_zero() => Err(ContractError::NoFunds {}),
        [coin] => Ok(coin.amount),
        _ => Err(ContractError::MultipleDenoms {}),
    }
}

fn validate_garden_config(config: &GardenConfig) -> Result<(), ContractError> {
    let one = Decimal::one();

    if config.min_voter_quorum.is_zero() || config.min_voter_quorum > one {
        return Err(ContractError::validation("min voter quorum must be within (0, 1]"));
    }
    if config.min_strategy_duration > config.max_strategy_duration {
        return Err(ContractError::validation(
            "min strategy duration exceeds max strategy duration",
        ));
    }
    if config.min_voters < 1 {
        return Err(ContractError::validation("at least one voter is required"));
    }
    if config.min_contribution.is_zero() || config.min_contribution > config.max_deposit_limit {
        return Err(ContractError::validation(
            "min contribution must be positive and within the deposit limit",
        ));
    }
    if config.decay_rate > one
        || config.base_slippage > one
        || config.strategist_profit_share > one
        || config.strategist_loss_share > one
    {
        return Err(ContractError::validation("rates must not exceed 100%"));
    }
    if config.strategy_cooldown_period >= config.max_candidate_period {
        return Err(ContractError::validation(
            "cooldown must end before the voting window closes",
        ));
    }
    Ok(())
}

fn failure_attributes(error: &ContractError) -> Vec<Attribute> {
    let (result, step) = match error {
        ContractError::SlippageExceeded { step, .. } => ("slippage_exceeded", *step),
        ContractError::IntegrationFailed { step, .. } => ("integration_failed", *step),
        _ => ("failed", 0),
    };
    vec![
        Attribute::new("result", result),
        Attribute::new("step", step.to_string()),
        Attribute::new("cause", error.to_string()),
    ]
}

fn keeper_fee(keeper: &Addr, garden: &Garden, fee: Uint128) -> Vec<CosmosMsg> {
    if fee.is_zero() {
        return vec![];
    }
    vec![CosmosMsg::Bank(BankMsg::Send {
        to_address: keeper.to_string(),
        amount: vec![Coin {
            denom: garden.reserve_denom.clone(),
            amount: fee,
        }],
    })]
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, _env: Env, msg: QueryMsg) -> StdResult<Binary> {
    match msg {
        QueryMsg::Config {} => to_json_binary(&query_config(deps)?),
        QueryMsg::Garden { garden_id } => to_json_binary(&query_garden(deps, garden_id)?),
        QueryMsg::Gardens { start_after, limit } => {
            to_json_binary(&query_gardens(deps, start_after, limit)?)
        }
        QueryMsg::Member { garden_id, address } => {
            to_json_binary(&query_member(deps, garden_id, address)?)
        }
        QueryMsg::Strategy { strategy_id } => to_json_binary(&query_strategy(deps, strategy_id)?),
        QueryMsg::Strategies {
            garden_id,
            include_archived,
        } => to_json_binary(&query_strategies(deps, garden_id, include_archived)?),
        QueryMsg::Tally { strategy_id } => to_json_binary(&query_tally(deps, strategy_id)?),
        QueryMsg::Vote { strategy_id, voter } => {
            to_json_binary(&query_vote(deps, strategy_id, voter)?)
        }
        QueryMsg::Integrations {} => to_json_binary(&query_integrations(deps)?),
    }
}

fn query_config(deps: Deps) -> StdResult<ConfigResponse> {
    let config = CONFIG.load(deps.storage)?;
    Ok(ConfigResponse {
        admin: config.admin,
        keepers: config.keepers,
    })
}

fn query_garden(deps: Deps, garden_id: u64) -> StdResult<GardenResponse> {
    let garden = GARDENS.load(deps.storage, garden_id)?;
    Ok(GardenResponse {
        available_capital: garden.ledger.available(),
        garden,
    })
}

fn query_gardens(
    deps: Deps,
    start_after: Option<u64>,
    limit: Option<u32>,
) -> StdResult<GardensResponse> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize;
    let gardens = GARDENS
        .range(
            deps.storage,
            start_after.map(Bound::exclusive),
            None,
            Order::Ascending,
        )
        .take(limit)
        .map(|item| item.map(|(_, garden)| garden))
        .collect::<StdResult<Vec<_>>>()?;

    Ok(GardensResponse { gardens })
}

fn query_member(deps: Deps, garden_id: u64, address: String) -> StdResult<MemberResponse> {
    let addr = deps.api.addr_validate(&address)?;
    let garden = GARDENS.load(deps.storage, garden_id)?;
    let member = MEMBERS.may_load(deps.storage, (garden_id, &addr))?;
    let value = member
        .as_ref()
        .map(|m| value_of_shares(m.shares, garden.total_shares, garden.ledger.balance))
        .unwrap_or_default();

    Ok(MemberResponse { member, value })
}

fn query_strategy(deps: Deps, strategy_id: u64) -> StdResult<StrategyResponse> {
    let strategy = STRATEGIES.load(deps.storage, strategy_id)?;
    Ok(StrategyResponse { strategy })
}

fn query_strategies(
    deps: Deps,
    garden_id: u64,
    include_archived: Option<bool>,
) -> StdResult<StrategiesResponse> {
    let garden = GARDENS.load(deps.storage, garden_id)?;
    let mut ids = garden.strategies;
    if include_archived.unwrap_or(false) {
        ids.extend(garden.archived_strategies);
    }

    let strategies = ids
        .into_iter()
        .map(|id| STRATEGIES.load(deps.storage, id))
        .collect::<StdResult<Vec<_>>>()?;

    Ok(StrategiesResponse { strategies })
}

fn query_tally(deps: Deps, strategy_id: u64) -> StdResult<voting::Tally> {
    let strategy = STRATEGIES.load(deps.storage, strategy_id)?;
    let garden = GARDENS.load(deps.storage, strategy.garden_id)?;
    Ok(voting::tally(&strategy, &garden.config, garden.total_shares))
}

fn query_vote(deps: Deps, strategy_id: u64, voter: String) -> StdResult<VoteResponse> {
    let voter = deps.api.addr_validate(&voter)?;
    let weight = VOTES.may_load(deps.storage, (strategy_id, &voter))?;
    Ok(VoteResponse { weight })
}

fn query_integrations(deps: Deps) -> StdResult<IntegrationsResponse> {
    let integrations = INTEGRATIONS
        .range(deps.storage, None, None, Order::Ascending)
        .map(|item| item.map(|(_, info)| info))
        .collect::<StdResult<Vec<_>>>()?;

    Ok(IntegrationsResponse { integrations })
}
