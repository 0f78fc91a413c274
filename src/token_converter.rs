use cosmwasm_std::{
    to_json_binary, Addr, Coin, CosmosMsg, Decimal, Deps, StdResult, Uint128, WasmMsg,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use self::astroport::{Asset, AssetInfo, PoolResponse, SimulationResponse};

/// An Astroport-style constant-product pair used for trade steps.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
pub struct AstroportPair(pub Addr);

impl AstroportPair {
    // Pool depth on the offer side of the pair
    pub fn pool_depth(&self, deps: Deps, denom: &str) -> StdResult<Uint128> {
        let pool: PoolResponse = deps
            .querier
            .query_wasm_smart(self.0.to_string(), &astroport::QueryMsg::Pool {})?;

        Ok(pool
            .assets
            .iter()
            .find(|asset| asset.info == native(denom))
            .map(|asset| asset.amount)
            .unwrap_or_default())
    }

    pub fn simulate(&self, deps: Deps, offer: &Coin, ask_denom: &str) -> StdResult<SimulationResponse> {
        deps.querier.query_wasm_smart(
            self.0.to_string(),
            &astroport::QueryMsg::Simulation {
                offer_asset: Asset {
                    info: native(&offer.denom),
                    amount: offer.amount,
                },
                ask_asset_info: Some(native(ask_denom)),
            },
        )
    }

    pub fn swap_msg(&self, offer: Coin, ask_denom: &str, max_spread: Decimal) -> StdResult<CosmosMsg> {
        let msg = WasmMsg::Execute {
            contract_addr: self.0.to_string(),
            msg: to_json_binary(&astroport::ExecuteMsg::Swap {
                offer_asset: Asset {
                    info: native(&offer.denom),
                    amount: offer.amount,
                },
                ask_asset_info: Some(native(ask_denom)),
                belief_price: None,
                max_spread: Some(max_spread),
                to: None,
            })?,
            funds: vec![offer],
        };

        Ok(CosmosMsg::Wasm(msg))
    }
}

/// Share of the ideal output lost to price impact.
pub fn spread_ratio(simulation: &SimulationResponse) -> Decimal {
    let ideal = simulation.return_amount + simulation.spread_amount;
    if ideal.is_zero() {
        return Decimal::zero();
    }
    Decimal::from_ratio(simulation.spread_amount, ideal)
}

fn native(denom: &str) -> AssetInfo {
    AssetInfo::NativeToken {
        denom: denom.to_string(),
    }
}

// Subset of the Astroport pair interface used by trade steps
pub mod astroport {
    use cosmwasm_schema::cw_serde;
    use cosmwasm_std::{Decimal, Uint128};

    #[cw_serde]
    pub enum AssetInfo {
        NativeToken { denom: String },
        Token { contract_addr: String },
    }

    #[cw_serde]
    pub struct Asset {
        pub info: AssetInfo,
        pub amount: Uint128,
    }

    #[cw_serde]
    pub enum ExecuteMsg {
        Swap {
            offer_asset: Asset,
            ask_asset_info: Option<AssetInfo>,
            belief_price: Option<Decimal>,
            max_spread: Option<Decimal>,
            to: Option<String>,
        },
    }

    #[cw_serde]
    pub enum QueryMsg {
        Pool {},
        Simulation {
            offer_asset: Asset,
            ask_asset_info: Option<AssetInfo>,
        },
    }

    #[cw_serde]
    pub struct PoolResponse {
        pub assets: Vec<Asset>,
        pub total_share: Uint128,
    }

    #[cw_serde]
    pub struct SimulationResponse {
        pub return_amount: Uint128,
        pub spread_amount: Uint128,
        pub commission_amount: Uint128,
    }
}
