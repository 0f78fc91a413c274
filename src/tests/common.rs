use cosmwasm_std::testing::{message_info, mock_env, MockApi, MockQuerier, MockStorage};
use cosmwasm_std::{
    coins, from_json, to_json_binary, Addr, Binary, Coin, ContractResult, Decimal, DepsMut,
    Empty, Env, OwnedDeps, QuerierResult, Response, SystemError, SystemResult, Uint128, WasmQuery,
};

use crate::contract::{execute, instantiate, query};
use crate::error::ContractError;
use crate::integrations::{custom, lending, vault, TradeParams};
use crate::msg::{
    ExecuteMsg, GardenConfigMsg, GardenResponse, InstantiateMsg, IntegrationMsg, OperationMsg,
    QueryMsg, StrategyResponse,
};
use crate::state::{
    Garden, IntegrationKind, Member, OperationKind, RewardCurve, Strategy, StrategyParams, MEMBERS,
};
use crate::token_converter::astroport::{self, Asset, AssetInfo};

pub type TestDeps = OwnedDeps<MockStorage, MockApi, MockQuerier, Empty>;

// Fixed-point scale of the reserve asset
pub const UNIT: u128 = 1_000_000_000_000_000_000;

pub const RESERVE: &str = "uusdc";
pub const ATOM: &str = "uatom";
pub const VAULT_SHARE: &str = "vusdc";

pub const COOLDOWN: u64 = 3_600;
pub const DURATION: u64 = 86_400;
pub const VOTING_PERIOD: u64 = 86_400 * 7;

// Generate valid bech32 addresses for testing
pub fn addr(input: &str) -> Addr {
    MockApi::default().addr_make(input)
}

pub fn admin() -> Addr {
    addr("admin")
}

pub fn keeper() -> Addr {
    addr("keeper")
}

pub fn creator() -> Addr {
    addr("creator")
}

pub fn member() -> Addr {
    addr("member")
}

pub fn pair_address() -> Addr {
    addr("pair")
}

pub fn vault_address() -> Addr {
    addr("vault")
}

pub fn market_address() -> Addr {
    addr("market")
}

pub fn custom_address() -> Addr {
    addr("custom")
}

pub fn units(amount: u128) -> Uint128 {
    Uint128::new(amount * UNIT)
}

pub fn env_at(seconds: u64) -> Env {
    let mut env = mock_env();
    env.block.time = env.block.time.plus_seconds(seconds);
    env
}

pub fn setup_contract(deps: DepsMut) {
    let msg = InstantiateMsg {
        admin: admin().to_string(),
        keepers: vec![keeper().to_string()],
        integrations: vec![
            IntegrationMsg {
                address: pair_address().to_string(),
                name: "usdc-atom pair".to_string(),
                kind: IntegrationKind::AstroportPair,
            },
            IntegrationMsg {
                address: vault_address().to_string(),
                name: "usdc vault".to_string(),
                kind: IntegrationKind::Vault,
            },
            IntegrationMsg {
                address: market_address().to_string(),
                name: "money market".to_string(),
                kind: IntegrationKind::LendingMarket,
            },
        ],
    };

    instantiate(deps, mock_env(), message_info(&creator(), &[]), msg).unwrap();
}

pub fn garden_config() -> GardenConfigMsg {
    GardenConfigMsg {
        max_deposit_limit: units(1_000),
        min_liquidity_asset: units(50),
        deposit_hardlock: 60,
        min_contribution: Uint128::new(UNIT / 100),
        strategy_cooldown_period: COOLDOWN,
        min_voter_quorum: Decimal::percent(10),
        min_strategy_duration: DURATION,
        max_strategy_duration: DURATION * 30,
        min_voters: 1,
        decay_rate: Decimal::zero(),
        base_slippage: Decimal::percent(1),
        custom_integrations_enabled: false,
        public_strategists: true,
        max_candidate_period: VOTING_PERIOD,
        strategist_profit_share: Decimal::percent(10),
        strategist_loss_share: Decimal::percent(50),
        reward_curve: RewardCurve::Linear,
    }
}

pub fn create_garden_with(deps: DepsMut, config: GardenConfigMsg, contribution: Uint128) -> u64 {
    let res = execute(
        deps,
        mock_env(),
        message_info(&creator(), &[Coin::new(contribution, RESERVE)]),
        ExecuteMsg::CreateGarden {
            name: "Yield Garden".to_string(),
            reserve_denom: RESERVE.to_string(),
            config,
        },
    )
    .unwrap();
    attr(&res, "garden_id").parse().unwrap()
}

/// One garden whose creator holds every share, funded with 100 units.
pub fn setup_garden(deps: &mut TestDeps) -> u64 {
    setup_contract(deps.as_mut());
    create_garden_with(deps.as_mut(), garden_config(), units(100))
}

pub fn strategy_params() -> StrategyParams {
    StrategyParams {
        max_capital_requested: units(10),
        stake: Uint128::new(UNIT / 10),
        duration: DURATION,
        expected_return: Decimal::percent(5),
        max_allocation_percentage: Decimal::one(),
        max_gas_fee_percentage: Decimal::percent(1),
        max_trade_slippage_percentage: Decimal::percent(5),
    }
}

pub fn vault_operation() -> OperationMsg {
    OperationMsg {
        kind: OperationKind::Deposit,
        integration: vault_address().to_string(),
        params: Binary::default(),
    }
}

pub fn lend_operation() -> OperationMsg {
    OperationMsg {
        kind: OperationKind::Lend,
        integration: market_address().to_string(),
        params: Binary::default(),
    }
}

pub fn trade_operation(ask_denom: &str) -> OperationMsg {
    OperationMsg {
        kind: OperationKind::Trade,
        integration: pair_address().to_string(),
        params: to_json_binary(&TradeParams {
            ask_denom: ask_denom.to_string(),
        })
        .unwrap(),
    }
}

pub fn propose(deps: &mut TestDeps, garden_id: u64, operations: Vec<OperationMsg>) -> u64 {
    let res = propose_as(deps, &creator(), garden_id, strategy_params(), operations).unwrap();
    attr(&res, "strategy_id").parse().unwrap()
}

pub fn propose_as(
    deps: &mut TestDeps,
    sender: &Addr,
    garden_id: u64,
    params: StrategyParams,
    operations: Vec<OperationMsg>,
) -> Result<Response, ContractError> {
    execute(
        deps.as_mut(),
        mock_env(),
        message_info(sender, &[]),
        ExecuteMsg::AddStrategy {
            garden_id,
            name: "vault carry".to_string(),
            metadata: "{}".to_string(),
            params,
            operations,
        },
    )
}

pub fn vote(deps: &mut TestDeps, voter: &Addr, strategy_id: u64) -> Result<Response, ContractError> {
    execute(
        deps.as_mut(),
        mock_env(),
        message_info(voter, &[]),
        ExecuteMsg::CastVote { strategy_id },
    )
}

pub fn keeper_execute(
    deps: &mut TestDeps,
    seconds: u64,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    execute(deps.as_mut(), env_at(seconds), message_info(&keeper(), &[]), msg)
}

pub fn execute_strategy(
    deps: &mut TestDeps,
    seconds: u64,
    strategy_id: u64,
) -> Result<Response, ContractError> {
    keeper_execute(
        deps,
        seconds,
        ExecuteMsg::ExecuteStrategy {
            strategy_id,
            capital: None,
            fee: Uint128::zero(),
        },
    )
}

pub fn finalize_strategy(
    deps: &mut TestDeps,
    seconds: u64,
    strategy_id: u64,
) -> Result<Response, ContractError> {
    keeper_execute(
        deps,
        seconds,
        ExecuteMsg::FinalizeStrategy {
            strategy_id,
            fee: Uint128::zero(),
            min_return: Uint128::zero(),
        },
    )
}

pub fn unwind_strategy(
    deps: &mut TestDeps,
    seconds: u64,
    strategy_id: u64,
) -> Result<Response, ContractError> {
    keeper_execute(deps, seconds, ExecuteMsg::UnwindStrategy { strategy_id })
}

pub fn query_garden(deps: &TestDeps, garden_id: u64) -> Garden {
    let res = query(deps.as_ref(), mock_env(), QueryMsg::Garden { garden_id }).unwrap();
    from_json::<GardenResponse>(&res).unwrap().garden
}

pub fn query_strategy(deps: &TestDeps, strategy_id: u64) -> Strategy {
    let res = query(deps.as_ref(), mock_env(), QueryMsg::Strategy { strategy_id }).unwrap();
    from_json::<StrategyResponse>(&res).unwrap().strategy
}

pub fn load_member(deps: &TestDeps, garden_id: u64, address: &Addr) -> Member {
    MEMBERS
        .load(deps.as_ref().storage, (garden_id, address))
        .unwrap()
}

pub fn attr(res: &Response, key: &str) -> String {
    res.attributes
        .iter()
        .find(|attr| attr.key == key)
        .map(|attr| attr.value.clone())
        .unwrap_or_else(|| panic!("missing attribute {}", key))
}

pub fn deposit_funds(amount: Uint128) -> Vec<Coin> {
    coins(amount.u128(), RESERVE)
}

/// Programmable state of the external venues answered by the mock querier.
#[derive(Clone, Debug)]
pub struct Venues {
    pub vault_assets: Uint128,
    pub vault_shares: Uint128,
    pub vault_paused: bool,
    /// Atoms quoted per reserve unit, as numerator / denominator.
    pub pair_price: (u128, u128),
    pub pair_spread_percent: u128,
    pub pair_depth: Uint128,
    pub pair_exit_fails: bool,
    pub market_rate: Decimal,
}

impl Default for Venues {
    fn default() -> Self {
        Venues {
            vault_assets: units(1_000),
            vault_shares: units(1_000),
            vault_paused: false,
            pair_price: (2, 1),
            pair_spread_percent: 0,
            pair_depth: units(10_000),
            pair_exit_fails: false,
            market_rate: Decimal::one(),
        }
    }
}

impl Venues {
    fn answer(&self, contract_addr: &str, msg: &Binary) -> QuerierResult {
        if contract_addr == vault_address().as_str() {
            if self.vault_paused {
                return failure("vault paused");
            }
            return ok(&vault::VaultInfoResponse {
                asset_denom: RESERVE.to_string(),
                share_denom: VAULT_SHARE.to_string(),
                total_assets: self.vault_assets,
                total_shares: self.vault_shares,
            });
        }

        if contract_addr == market_address().as_str() {
            let lending::QueryMsg::Market { denom } = from_json(msg).unwrap();
            return ok(&lending::MarketResponse {
                receipt_denom: format!("l{}", denom),
                denom,
                exchange_rate: self.market_rate,
            });
        }

        if contract_addr == pair_address().as_str() {
            return match from_json(msg).unwrap() {
                astroport::QueryMsg::Pool {} => ok(&astroport::PoolResponse {
                    assets: vec![
                        native_asset(RESERVE, self.pair_depth),
                        native_asset(ATOM, self.pair_depth * Uint128::new(2)),
                    ],
                    total_share: self.pair_depth,
                }),
                astroport::QueryMsg::Simulation { offer_asset, .. } => {
                    self.simulate(offer_asset)
                }
            };
        }

        if contract_addr == custom_address().as_str() {
            return match from_json(msg).unwrap() {
                custom::QueryMsg::PreviewEnter { offer, .. } => ok(&custom::PreviewResponse {
                    amount: Coin::new(offer.amount, "custom-receipt"),
                }),
                custom::QueryMsg::PreviewExit { offer, .. } => ok(&custom::PreviewResponse {
                    amount: Coin::new(offer.amount, RESERVE),
                }),
            };
        }

        SystemResult::Err(SystemError::NoSuchContract {
            addr: contract_addr.to_string(),
        })
    }

    fn simulate(&self, offer: Asset) -> QuerierResult {
        let (num, den) = self.pair_price;
        let forward = offer.info
            == AssetInfo::NativeToken {
                denom: RESERVE.to_string(),
            };
        if !forward && self.pair_exit_fails {
            return failure("pair halted");
        }

        let return_amount = if forward {
            offer.amount.multiply_ratio(num, den)
        } else {
            offer.amount.multiply_ratio(den, num)
        };
        let spread_amount =
            return_amount.multiply_ratio(self.pair_spread_percent, 100 - self.pair_spread_percent);

        ok(&astroport::SimulationResponse {
            return_amount,
            spread_amount,
            commission_amount: Uint128::zero(),
        })
    }
}

pub fn mock_venues(deps: &mut TestDeps, venues: Venues) {
    deps.querier.update_wasm(move |query| match query {
        WasmQuery::Smart { contract_addr, msg } => venues.answer(contract_addr, msg),
        _ => SystemResult::Err(SystemError::InvalidRequest {
            error: "Unexpected wasm query type".to_string(),
            request: Default::default(),
        }),
    });
}

fn native_asset(denom: &str, amount: Uint128) -> Asset {
    Asset {
        info: AssetInfo::NativeToken {
            denom: denom.to_string(),
        },
        amount,
    }
}

fn ok<T: serde::Serialize>(response: &T) -> QuerierResult {
    SystemResult::Ok(ContractResult::Ok(to_json_binary(response).unwrap()))
}

fn failure(reason: &str) -> QuerierResult {
    SystemResult::Ok(ContractResult::Err(reason.to_string()))
}
