use std::fmt;

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Binary, Coin, Decimal, Int128, Timestamp, Uint128};
use cw_storage_plus::{Item, Map};

#[cw_serde]
pub struct Config {
    pub admin: Addr,
    pub keepers: Vec<Addr>,
}

impl Config {
    pub fn is_keeper(&self, addr: &Addr) -> bool {
        self.keepers.contains(addr)
    }
}

/// How the strategist's stake is rewarded or slashed at settlement.
#[cw_serde]
pub enum RewardCurve {
    Linear,
    /// Bonus decays with the time a strategy is finalized past its duration.
    Decaying,
}

#[cw_serde]
pub struct GardenConfig {
    pub max_deposit_limit: Uint128,
    pub min_liquidity_asset: Uint128, // Minimum pool depth for trade integrations
    pub deposit_hardlock: u64,        // Seconds a deposit stays locked
    pub min_contribution: Uint128,
    pub strategy_cooldown_period: u64,
    pub min_voter_quorum: Decimal,
    pub min_strategy_duration: u64,
    pub max_strategy_duration: u64,
    pub min_voters: u32,
    pub decay_rate: Decimal,
    pub base_slippage: Decimal,
    pub custom_integrations_enabled: bool,
    pub public_strategists: bool,
    pub max_candidate_period: u64, // Voting window after proposal
    pub strategist_profit_share: Decimal,
    pub strategist_loss_share: Decimal,
    pub reward_curve: RewardCurve,
}

/// Pooled capital of a garden. `reserved` never exceeds `balance`.
#[cw_serde]
#[derive(Default)]
pub struct CapitalLedger {
    pub balance: Uint128,
    pub reserved: Uint128,
}

#[cw_serde]
pub struct Garden {
    pub id: u64,
    pub name: String,
    pub creator: Addr,
    pub reserve_denom: String,
    pub config: GardenConfig,
    pub ledger: CapitalLedger,
    pub total_shares: Uint128,
    pub strategies: Vec<u64>,
    pub archived_strategies: Vec<u64>,
    pub created_at: Timestamp,
}

impl Garden {
    pub fn is_strategist(&self, addr: &Addr, member: Option<&Member>) -> bool {
        let is_member = member.map(|m| !m.shares.is_zero()).unwrap_or(false);
        is_member && (self.config.public_strategists || *addr == self.creator)
    }

    pub fn archive(&mut self, strategy_id: u64) {
        self.strategies.retain(|id| *id != strategy_id);
        if !self.archived_strategies.contains(&strategy_id) {
            self.archived_strategies.push(strategy_id);
        }
    }
}

#[cw_serde]
pub struct Member {
    pub shares: Uint128,
    pub locked_shares: Uint128, // Shares backing open strategist stakes
    pub last_deposit_at: Timestamp,
}

impl Member {
    pub fn unlocked_shares(&self) -> Uint128 {
        self.shares.saturating_sub(self.locked_shares)
    }
}

#[cw_serde]
#[derive(Copy)]
pub enum OperationKind {
    Trade,
    Deposit,
    Lend,
    Custom,
}

/// Adapter implementation an integration address resolves to.
#[cw_serde]
#[derive(Copy)]
pub enum IntegrationKind {
    AstroportPair,
    Vault,
    LendingMarket,
    Custom,
}

#[cw_serde]
pub struct IntegrationInfo {
    pub address: Addr,
    pub name: String,
    pub kind: IntegrationKind,
}

#[cw_serde]
pub struct Operation {
    pub kind: OperationKind,
    pub integration: Addr,
    pub integration_kind: IntegrationKind,
    pub params: Binary,
}

/// Live position opened by one pipeline step.
#[cw_serde]
pub struct Position {
    pub step: u32,
    pub integration: Addr,
    pub integration_kind: IntegrationKind,
    pub input: Coin,
    pub output: Coin,
    pub entry_rate: Option<Decimal>,
    pub params: Binary,
}

#[cw_serde]
pub struct StrategyParams {
    pub max_capital_requested: Uint128,
    pub stake: Uint128,
    pub duration: u64,
    pub expected_return: Decimal,
    pub max_allocation_percentage: Decimal,
    pub max_gas_fee_percentage: Decimal,
    pub max_trade_slippage_percentage: Decimal,
}

#[cw_serde]
#[derive(Copy)]
pub enum StrategyState {
    Proposed,
    Active,
    Executed,
    Finalized,
    Expired,
    Unwound,
    UnwoundPartial,
}

impl fmt::Display for StrategyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyState::Proposed => "proposed",
            StrategyState::Active => "active",
            StrategyState::Executed => "executed",
            StrategyState::Finalized => "finalized",
            StrategyState::Expired => "expired",
            StrategyState::Unwound => "unwound",
            StrategyState::UnwoundPartial => "unwound_partial",
        };
        f.write_str(name)
    }
}

#[cw_serde]
#[derive(Default)]
pub struct VoteTally {
    pub total_weight: Uint128,
    pub voters: u32,
}

#[cw_serde]
pub struct Strategy {
    pub id: u64,
    pub garden_id: u64,
    pub strategist: Addr,
    pub name: String,
    pub metadata: String,
    pub params: StrategyParams,
    pub stake_shares: Uint128,
    pub operations: Vec<Operation>,
    pub state: StrategyState,
    pub votes: VoteTally,
    pub proposed_at: Timestamp,
    pub voting_ends_at: Timestamp,
    pub activated_at: Option<Timestamp>,
    pub executed_at: Option<Timestamp>,
    pub finalize_after: Option<Timestamp>,
    pub finalized_at: Option<Timestamp>,
    pub capital_reserved: Uint128,
    pub capital_allocated: Uint128,
    pub capital_returned: Uint128,
    pub realized_pnl: Int128,
    pub keeper_fees: Uint128,
    pub positions: Vec<Position>,
    /// Capital handed back by the last exit of an interrupted unwind.
    pub pending_return: Option<Uint128>,
}

pub const CONFIG: Item<Config> = Item::new("config");
pub const INTEGRATIONS: Map<&Addr, IntegrationInfo> = Map::new("integrations");
pub const GARDEN_COUNT: Item<u64> = Item::new("garden_count");
pub const GARDENS: Map<u64, Garden> = Map::new("gardens");
pub const MEMBERS: Map<(u64, &Addr), Member> = Map::new("members");
pub const STRATEGY_COUNT: Item<u64> = Item::new("strategy_count");
pub const STRATEGIES: Map<u64, Strategy> = Map::new("strategies");
pub const VOTES: Map<(u64, &Addr), Uint128> = Map::new("votes");
