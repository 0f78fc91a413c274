use cosmwasm_std::{Decimal, StdError, Timestamp, Uint128};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("Unauthorized")]
    Unauthorized {},

    #[error("Invalid parameters: {reason}")]
    Validation { reason: String },

    #[error("Insufficient funds")]
    InsufficientFunds {},

    #[error("Release exceeds reserved capital")]
    OverRelease {},

    #[error("No funds sent")]
    NoFunds {},

    #[error("Invalid denomination. Expected {expected}, received {received}")]
    InvalidDenom { expected: String, received: String },

    #[error("Multiple denominations not supported")]
    MultipleDenoms {},

    #[error("Contribution below garden minimum")]
    MinContributionNotMet {},

    #[error("Deposit exceeds garden limit")]
    DepositLimitExceeded {},

    #[error("Deposit hardlock active until {unlocks_at}")]
    HardlockActive { unlocks_at: Timestamp },

    #[error("Stake exceeds strategist balance")]
    StakeExceedsBalance {},

    #[error("Custom integrations are disabled for this garden")]
    CustomIntegrationsDisabled {},

    #[error("Quorum not met")]
    QuorumNotMet {},

    #[error("Strategy cooldown not elapsed")]
    CooldownNotElapsed {},

    #[error("Strategy duration not elapsed")]
    DurationNotElapsed {},

    #[error("Voting closed")]
    VotingClosed {},

    #[error("Voting window still open")]
    VotingStillOpen {},

    #[error("Duplicate vote")]
    DuplicateVote {},

    #[error("Cannot {action} strategy in state {state}")]
    StateConflict { state: String, action: String },

    #[error("Integration failed at step {step}: {cause}")]
    IntegrationFailed { step: u32, cause: String },

    #[error("Slippage {actual} exceeds maximum {max} at step {step}")]
    SlippageExceeded {
        step: u32,
        actual: Decimal,
        max: Decimal,
    },

    #[error("Returned capital {returned} below minimum {expected}")]
    MinimumReturnNotMet {
        expected: Uint128,
        returned: Uint128,
    },

    #[error("Garden not found: {id}")]
    GardenNotFound { id: u64 },

    #[error("Strategy not found: {id}")]
    StrategyNotFound { id: u64 },

    #[error("Integration not found: {address}")]
    IntegrationNotFound { address: String },
}

impl ContractError {
    pub fn validation(reason: impl Into<String>) -> Self {
        ContractError::Validation {
            reason: reason.into(),
        }
    }
}

/// Failures reported by an integration while quoting or unwinding a position.
#[derive(Error, Debug, PartialEq)]
pub enum IntegrationError {
    #[error("venue query failed: {0}")]
    Query(#[from] StdError),

    #[error("invalid integration params: {0}")]
    InvalidParams(String),

    #[error("venue expects {expected}, received {received}")]
    DenomMismatch { expected: String, received: String },

    #[error("pool depth {available} below minimum liquidity {required}")]
    InsufficientLiquidity {
        available: Uint128,
        required: Uint128,
    },

    #[error("slippage {actual} exceeds maximum {max}")]
    SlippageExceeded { actual: Decimal, max: Decimal },

    #[error("venue quoted zero output")]
    ZeroOutput {},

    #[error("venue quoted an amount outside the signed range")]
    AmountOverflow {},
}

impl IntegrationError {
    /// Lifts an adapter failure at `step` into the contract taxonomy.
    pub fn at_step(self, step: u32) -> ContractError {
        match self {
            IntegrationError::SlippageExceeded { actual, max } => {
                ContractError::SlippageExceeded { step, actual, max }
            }
            other => ContractError::IntegrationFailed {
                step,
                cause: other.to_string(),
            },
        }
    }
}
