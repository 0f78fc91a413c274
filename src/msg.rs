use crate::state::{
    Garden, GardenConfig, IntegrationInfo, IntegrationKind, Member, OperationKind, RewardCurve,
    Strategy, StrategyParams,
};
use crate::voting::Tally;
use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Addr, Binary, Decimal, Uint128};

#[cw_serde]
pub struct InstantiateMsg {
    pub admin: String,
    pub keepers: Vec<String>,
    pub integrations: Vec<IntegrationMsg>, // Initial whitelist
}

#[cw_serde]
pub struct IntegrationMsg {
    pub address: String,
    pub name: String,
    pub kind: IntegrationKind,
}

#[cw_serde]
pub struct GardenConfigMsg {
    pub max_deposit_limit: Uint128,
    pub min_liquidity_asset: Uint128,
    pub deposit_hardlock: u64,
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
    pub max_candidate_period: u64,
    pub strategist_profit_share: Decimal,
    pub strategist_loss_share: Decimal,
    pub reward_curve: RewardCurve,
}

#[cw_serde]
pub struct OperationMsg {
    pub kind: OperationKind,
    pub integration: String,
    pub params: Binary,
}

#[cw_serde]
pub enum ExecuteMsg {
    // Garden membership
    CreateGarden {
        name: String,
        reserve_denom: String,
        config: GardenConfigMsg,
    },
    Deposit {
        garden_id: u64,
    },
    Withdraw {
        garden_id: u64,
        shares: Uint128,
    },

    // Strategy proposals and voting
    AddStrategy {
        garden_id: u64,
        name: String,
        metadata: String,
        params: StrategyParams,
        operations: Vec<OperationMsg>,
    },
    CastVote {
        strategy_id: u64,
    },
    ResolveVoting {
        strategy_id: u64,
        voters: Vec<String>,
        weights: Vec<Uint128>,
    },

    // Keeper transitions
    ActivateStrategy {
        strategy_id: u64,
    },
    ExecuteStrategy {
        strategy_id: u64,
        capital: Option<Uint128>, // Defaults to the full reservation
        fee: Uint128,
    },
    FinalizeStrategy {
        strategy_id: u64,
        fee: Uint128,
        min_return: Uint128, // Zero disables the guard
    },
    UnwindStrategy {
        strategy_id: u64,
    },
    ExpireStrategy {
        strategy_id: u64,
    },

    // Admin functions
    RegisterIntegration {
        integration: IntegrationMsg,
    },
    RemoveIntegration {
        address: String,
    },
    UpdateKeepers {
        add: Vec<String>,
        remove: Vec<String>,
    },
    UpdateAdmin {
        admin: String,
    },
}

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    #[returns(ConfigResponse)]
    Config {},

    #[returns(GardenResponse)]
    Garden { garden_id: u64 },

    #[returns(GardensResponse)]
    Gardens {
        start_after: Option<u64>,
        limit: Option<u32>,
    },

    #[returns(MemberResponse)]
    Member { garden_id: u64, address: String },

    #[returns(StrategyResponse)]
    Strategy { strategy_id: u64 },

    #[returns(StrategiesResponse)]
    Strategies {
        garden_id: u64,
        include_archived: Option<bool>,
    },

    #[returns(Tally)]
    Tally { strategy_id: u64 },

    #[returns(VoteResponse)]
    Vote { strategy_id: u64, voter: String },

    #[returns(IntegrationsResponse)]
    Integrations {},
}

#[cw_serde]
pub struct ConfigResponse {
    pub admin: Addr,
    pub keepers: Vec<Addr>,
}

#[cw_serde]
pub struct GardenResponse {
    pub garden: Garden,
    pub available_capital: Uint128,
}

#[cw_serde]
pub struct GardensResponse {
    pub gardens: Vec<Garden>,
}

#[cw_serde]
pub struct MemberResponse {
    pub member: Option<Member>,
    pub value: Uint128,
}

#[cw_serde]
pub struct StrategyResponse {
    pub strategy: Strategy,
}

#[cw_serde]
pub struct StrategiesResponse {
    pub strategies: Vec<Strategy>,
}

#[cw_serde]
pub struct VoteResponse {
    pub weight: Option<Uint128>,
}

#[cw_serde]
pub struct IntegrationsResponse {
    pub integrations: Vec<IntegrationInfo>,
}

impl From<GardenConfigMsg> for GardenConfig {
    fn from(msg: GardenConfigMsg) -> Self {
        GardenConfig {
            max_deposit_limit: msg.max_deposit_limit,
            min_liquidity_asset: msg.min_liquidity_asset,
            deposit_hardlock: msg.deposit_hardlock,
            min_contribution: msg.min_contribution,
            strategy_cooldown_period: msg.strategy_cooldown_period,
            min_voter_quorum: msg.min_voter_quorum,
            min_strategy_duration: msg.min_strategy_duration,
            max_strategy_duration: msg.max_strategy_duration,
            min_voters: msg.min_voters,
            decay_rate: msg.decay_rate,
            base_slippage: msg.base_slippage,
            custom_integrations_enabled: msg.custom_integrations_enabled,
            public_strategists: msg.public_strategists,
            max_candidate_period: msg.max_candidate_period,
            strategist_profit_share: msg.strategist_profit_share,
            strategist_loss_share: msg.strategist_loss_share,
            reward_curve: msg.reward_curve,
        }
    }
}
