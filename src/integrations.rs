use cosmwasm_schema::cw_serde;
use cosmwasm_std::{
    from_json, to_json_binary, Addr, Binary, Coin, CosmosMsg, Decimal, Deps, Fraction, Storage,
    Uint128, WasmMsg,
};

use crate::error::{ContractError, IntegrationError};
use crate::state::{
    GardenConfig, IntegrationKind, Operation, OperationKind, Position, INTEGRATIONS,
};
use crate::token_converter::{spread_ratio, AstroportPair};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capabilities {
    pub deposit: bool,
    pub trade: bool,
}

impl Capabilities {
    pub fn supports(&self, kind: OperationKind) -> bool {
        match kind {
            OperationKind::Trade => self.trade,
            OperationKind::Deposit | OperationKind::Lend => self.deposit,
            OperationKind::Custom => self.deposit || self.trade,
        }
    }
}

/// Limits a pipeline step runs under.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub step: u32,
    pub max_slippage: Decimal,
    pub min_liquidity: Uint128,
}

pub struct Entered {
    pub position: Position,
    pub messages: Vec<CosmosMsg>,
}

pub struct Exited {
    /// Capital handed back, in the denomination the step was entered with.
    pub returned: Coin,
    pub pnl: i128,
    pub messages: Vec<CosmosMsg>,
}

/// Standard interface for all pluggable integrations.
///
/// `enter` and `exit` quote against the venue synchronously through queries and
/// return the messages that perform the move once the handler succeeds.
pub trait Integration {
    fn name(&self) -> &str;

    fn kind(&self) -> IntegrationKind;

    fn capabilities(&self) -> Capabilities;

    fn validate_params(&self, _params: &Binary) -> Result<(), IntegrationError> {
        Ok(())
    }

    fn enter(
        &self,
        deps: Deps,
        ctx: &StepContext,
        capital: Coin,
        params: &Binary,
    ) -> Result<Entered, IntegrationError>;

    /// Exits `amount` of the position's output.
    fn exit(
        &self,
        deps: Deps,
        ctx: &StepContext,
        position: &Position,
        amount: Uint128,
    ) -> Result<Exited, IntegrationError>;
}

fn open_position(
    ctx: &StepContext,
    integration: &dyn Integration,
    address: &Addr,
    input: Coin,
    output: Coin,
    entry_rate: Option<Decimal>,
    params: &Binary,
) -> Position {
    Position {
        step: ctx.step,
        integration: address.clone(),
        integration_kind: integration.kind(),
        input,
        output,
        entry_rate,
        params: params.clone(),
    }
}

/// `returned - input` as a signed amount. Fails when either side does not fit
/// in an `i128`.
pub fn signed_pnl(returned: Uint128, input: Uint128) -> Result<i128, IntegrationError> {
    let returned =
        i128::try_from(returned.u128()).map_err(|_| IntegrationError::AmountOverflow {})?;
    let input = i128::try_from(input.u128()).map_err(|_| IntegrationError::AmountOverflow {})?;
    Ok(returned - input)
}

fn closed(
    position: &Position,
    returned: Uint128,
    messages: Vec<CosmosMsg>,
) -> Result<Exited, IntegrationError> {
    Ok(Exited {
        returned: Coin {
            denom: position.input.denom.clone(),
            amount: returned,
        },
        pnl: signed_pnl(returned, position.input.amount)?,
        messages,
    })
}

// Trade: swaps the incoming capital through an Astroport pair
#[cw_serde]
pub struct TradeParams {
    pub ask_denom: String,
}

pub struct AstroportTrade {
    pub pair: AstroportPair,
}

impl AstroportTrade {
    fn params(params: &Binary) -> Result<TradeParams, IntegrationError> {
        from_json(params).map_err(|err| IntegrationError::InvalidParams(err.to_string()))
    }
}

impl Integration for AstroportTrade {
    fn name(&self) -> &str {
        "astroport_pair"
    }

    fn kind(&self) -> IntegrationKind {
        IntegrationKind::AstroportPair
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            deposit: false,
            trade: true,
        }
    }

    fn validate_params(&self, params: &Binary) -> Result<(), IntegrationError> {
        Self::params(params).map(|_| ())
    }

    fn enter(
        &self,
        deps: Deps,
        ctx: &StepContext,
        capital: Coin,
        params: &Binary,
    ) -> Result<Entered, IntegrationError> {
        let TradeParams { ask_denom } = Self::params(params)?;
        if ask_denom == capital.denom {
            return Err(IntegrationError::InvalidParams(
                "ask denom equals offer denom".to_string(),
            ));
        }

        let depth = self.pair.pool_depth(deps, &capital.denom)?;
        if depth < ctx.min_liquidity {
            return Err(IntegrationError::InsufficientLiquidity {
                available: depth,
                required: ctx.min_liquidity,
            });
        }

        let simulation = self.pair.simulate(deps, &capital, &ask_denom)?;
        let slippage = spread_ratio(&simulation);
        if slippage > ctx.max_slippage {
            return Err(IntegrationError::SlippageExceeded {
                actual: slippage,
                max: ctx.max_slippage,
            });
        }
        if simulation.return_amount.is_zero() {
            return Err(IntegrationError::ZeroOutput {});
        }

        let swap = self
            .pair
            .swap_msg(capital.clone(), &ask_denom, ctx.max_slippage)?;
        let output = Coin {
            denom: ask_denom,
            amount: simulation.return_amount,
        };

        Ok(Entered {
            position: open_position(ctx, self, &self.pair.0, capital, output, None, params),
            messages: vec![swap],
        })
    }

    fn exit(
        &self,
        deps: Deps,
        ctx: &StepContext,
        position: &Position,
        amount: Uint128,
    ) -> Result<Exited, IntegrationError> {
        let offer = Coin {
            denom: position.output.denom.clone(),
            amount,
        };
        let simulation = self.pair.simulate(deps, &offer, &position.input.denom)?;
        let slippage = spread_ratio(&simulation);
        if slippage > ctx.max_slippage {
            return Err(IntegrationError::SlippageExceeded {
                actual: slippage,
                max: ctx.max_slippage,
            });
        }

        let swap = self
            .pair
            .swap_msg(offer, &position.input.denom, ctx.max_slippage)?;
        closed(position, simulation.return_amount, vec![swap])
    }
}

// Deposit: share-issuing vault
pub struct VaultDeposit {
    pub vault: Addr,
}

impl VaultDeposit {
    fn info(&self, deps: Deps) -> Result<vault::VaultInfoResponse, IntegrationError> {
        Ok(deps
            .querier
            .query_wasm_smart(self.vault.to_string(), &vault::QueryMsg::VaultInfo {})?)
    }
}

impl Integration for VaultDeposit {
    fn name(&self) -> &str {
        "vault"
    }

    fn kind(&self) -> IntegrationKind {
        IntegrationKind::Vault
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            deposit: true,
            trade: false,
        }
    }

    fn enter(
        &self,
        deps: Deps,
        ctx: &StepContext,
        capital: Coin,
        params: &Binary,
    ) -> Result<Entered, IntegrationError> {
        let info = self.info(deps)?;
        if info.asset_denom != capital.denom {
            return Err(IntegrationError::DenomMismatch {
                expected: info.asset_denom,
                received: capital.denom,
            });
        }

        let (shares, rate) = if info.total_shares.is_zero() || info.total_assets.is_zero() {
            (capital.amount, Decimal::one())
        } else {
            (
                capital
                    .amount
                    .multiply_ratio(info.total_shares, info.total_assets),
                Decimal::from_ratio(info.total_assets, info.total_shares),
            )
        };
        if shares.is_zero() {
            return Err(IntegrationError::ZeroOutput {});
        }

        let deposit = CosmosMsg::Wasm(WasmMsg::Execute {
            contract_addr: self.vault.to_string(),
            msg: to_json_binary(&vault::ExecuteMsg::Deposit {})?,
            funds: vec![capital.clone()],
        });
        let output = Coin {
            denom: info.share_denom,
            amount: shares,
        };

        Ok(Entered {
            position: open_position(ctx, self, &self.vault, capital, output, Some(rate), params),
            messages: vec![deposit],
        })
    }

    fn exit(
        &self,
        deps: Deps,
        _ctx: &StepContext,
        position: &Position,
        amount: Uint128,
    ) -> Result<Exited, IntegrationError> {
        let info = self.info(deps)?;
        if info.total_shares.is_zero() {
            return Err(IntegrationError::ZeroOutput {});
        }
        let assets = amount.multiply_ratio(info.total_assets, info.total_shares);

        let redeem = CosmosMsg::Wasm(WasmMsg::Execute {
            contract_addr: self.vault.to_string(),
            msg: to_json_binary(&vault::ExecuteMsg::Redeem {})?,
            funds: vec![Coin {
                denom: position.output.denom.clone(),
                amount,
            }],
        });

        closed(position, assets, vec![redeem])
    }
}

// Lend: supply to a money market against exchange-rate receipts
pub struct LendingSupply {
    pub market: Addr,
}

impl LendingSupply {
    fn market(&self, deps: Deps, denom: &str) -> Result<lending::MarketResponse, IntegrationError> {
        let market: lending::MarketResponse = deps.querier.query_wasm_smart(
            self.market.to_string(),
            &lending::QueryMsg::Market {
                denom: denom.to_string(),
            },
        )?;
        if market.exchange_rate.is_zero() {
            return Err(IntegrationError::ZeroOutput {});
        }
        Ok(market)
    }
}

impl Integration for LendingSupply {
    fn name(&self) -> &str {
        "lending_market"
    }

    fn kind(&self) -> IntegrationKind {
        IntegrationKind::LendingMarket
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            deposit: true,
            trade: false,
        }
    }

    fn enter(
        &self,
        deps: Deps,
        ctx: &StepContext,
        capital: Coin,
        params: &Binary,
    ) -> Result<Entered, IntegrationError> {
        let market = self.market(deps, &capital.denom)?;
        let rate = market.exchange_rate;
        let receipt = capital
            .amount
            .multiply_ratio(rate.denominator(), rate.numerator());
        if receipt.is_zero() {
            return Err(IntegrationError::ZeroOutput {});
        }

        let supply = CosmosMsg::Wasm(WasmMsg::Execute {
            contract_addr: self.market.to_string(),
            msg: to_json_binary(&lending::ExecuteMsg::Supply {})?,
            funds: vec![capital.clone()],
        });
        let output = Coin {
            denom: market.receipt_denom,
            amount: receipt,
        };

        Ok(Entered {
            position: open_position(ctx, self, &self.market, capital, output, Some(rate), params),
            messages: vec![supply],
        })
    }

    fn exit(
        &self,
        deps: Deps,
        _ctx: &StepContext,
        position: &Position,
        amount: Uint128,
    ) -> Result<Exited, IntegrationError> {
        let rate = self.market(deps, &position.input.denom)?.exchange_rate;
        let returned = amount.multiply_ratio(rate.numerator(), rate.denominator());

        let withdraw = CosmosMsg::Wasm(WasmMsg::Execute {
            contract_addr: self.market.to_string(),
            msg: to_json_binary(&lending::ExecuteMsg::Withdraw {})?,
            funds: vec![Coin {
                denom: position.output.denom.clone(),
                amount,
            }],
        });

        closed(position, returned, vec![withdraw])
    }
}

// Custom: any contract speaking the preview/enter/exit interface
pub struct CustomIntegration {
    pub contract: Addr,
}

impl Integration for CustomIntegration {
    fn name(&self) -> &str {
        "custom"
    }

    fn kind(&self) -> IntegrationKind {
        IntegrationKind::Custom
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            deposit: true,
            trade: true,
        }
    }

    fn enter(
        &self,
        deps: Deps,
        ctx: &StepContext,
        capital: Coin,
        params: &Binary,
    ) -> Result<Entered, IntegrationError> {
        let preview: custom::PreviewResponse = deps.querier.query_wasm_smart(
            self.contract.to_string(),
            &custom::QueryMsg::PreviewEnter {
                offer: capital.clone(),
                params: params.clone(),
            },
        )?;
        if preview.amount.amount.is_zero() {
            return Err(IntegrationError::ZeroOutput {});
        }

        let enter = CosmosMsg::Wasm(WasmMsg::Execute {
            contract_addr: self.contract.to_string(),
            msg: to_json_binary(&custom::ExecuteMsg::Enter {
                params: params.clone(),
            })?,
            funds: vec![capital.clone()],
        });

        Ok(Entered {
            position: open_position(
                ctx,
                self,
                &self.contract,
                capital,
                preview.amount,
                None,
                params,
            ),
            messages: vec![enter],
        })
    }

    fn exit(
        &self,
        deps: Deps,
        _ctx: &StepContext,
        position: &Position,
        amount: Uint128,
    ) -> Result<Exited, IntegrationError> {
        let offer = Coin {
            denom: position.output.denom.clone(),
            amount,
        };
        let preview: custom::PreviewResponse = deps.querier.query_wasm_smart(
            self.contract.to_string(),
            &custom::QueryMsg::PreviewExit {
                offer: offer.clone(),
                params: position.params.clone(),
            },
        )?;
        if preview.amount.denom != position.input.denom {
            return Err(IntegrationError::DenomMismatch {
                expected: position.input.denom.clone(),
                received: preview.amount.denom,
            });
        }

        let exit = CosmosMsg::Wasm(WasmMsg::Execute {
            contract_addr: self.contract.to_string(),
            msg: to_json_binary(&custom::ExecuteMsg::Exit {
                params: position.params.clone(),
            })?,
            funds: vec![offer],
        });

        closed(position, preview.amount.amount, vec![exit])
    }
}

// Message interfaces of the venues the adapters talk to
pub mod vault {
    use cosmwasm_schema::cw_serde;
    use cosmwasm_std::Uint128;

    #[cw_serde]
    pub enum ExecuteMsg {
        Deposit {},
        Redeem {},
    }

    #[cw_serde]
    pub enum QueryMsg {
        VaultInfo {},
    }

    #[cw_serde]
    pub struct VaultInfoResponse {
        pub asset_denom: String,
        pub share_denom: String,
        pub total_assets: Uint128,
        pub total_shares: Uint128,
    }
}

pub mod lending {
    use cosmwasm_schema::cw_serde;
    use cosmwasm_std::Decimal;

    #[cw_serde]
    pub enum ExecuteMsg {
        Supply {},
        Withdraw {},
    }

    #[cw_serde]
    pub enum QueryMsg {
        Market { denom: String },
    }

    #[cw_serde]
    pub struct MarketResponse {
        pub denom: String,
        pub receipt_denom: String,
        pub exchange_rate: Decimal,
    }
}

pub mod custom {
    use cosmwasm_schema::cw_serde;
    use cosmwasm_std::{Binary, Coin};

    #[cw_serde]
    pub enum ExecuteMsg {
        Enter { params: Binary },
        Exit { params: Binary },
    }

    #[cw_serde]
    pub enum QueryMsg {
        PreviewEnter { offer: Coin, params: Binary },
        PreviewExit { offer: Coin, params: Binary },
    }

    #[cw_serde]
    pub struct PreviewResponse {
        pub amount: Coin,
    }
}

// Factory function to create integration adapters
pub fn create_integration(kind: IntegrationKind, address: Addr) -> Box<dyn Integration> {
    match kind {
        IntegrationKind::AstroportPair => Box::new(AstroportTrade {
            pair: AstroportPair(address),
        }),
        IntegrationKind::Vault => Box::new(VaultDeposit { vault: address }),
        IntegrationKind::LendingMarket => Box::new(LendingSupply { market: address }),
        IntegrationKind::Custom => Box::new(CustomIntegration { contract: address }),
    }
}

/// Resolves a proposed operation against the whitelist and the garden's
/// custom integration policy.
pub fn resolve_operation(
    storage: &dyn Storage,
    config: &GardenConfig,
    kind: OperationKind,
    address: Addr,
    params: Binary,
) -> Result<Operation, ContractError> {
    let registered = INTEGRATIONS.may_load(storage, &address)?;

    // Anything off the whitelist speaks the custom interface
    let integration_kind = match (kind, registered) {
        (OperationKind::Custom, _) | (_, None) => {
            if !config.custom_integrations_enabled {
                return Err(ContractError::CustomIntegrationsDisabled {});
            }
            IntegrationKind::Custom
        }
        (_, Some(info)) => info.kind,
    };

    let adapter = create_integration(integration_kind, address.clone());
    if !adapter.capabilities().supports(kind) {
        return Err(ContractError::validation(format!(
            "{} integration cannot run {:?} operations",
            adapter.name(),
            kind
        )));
    }
    adapter
        .validate_params(&params)
        .map_err(|err| ContractError::validation(err.to_string()))?;

    Ok(Operation {
        kind,
        integration: address,
        integration_kind,
        params,
    })
}
