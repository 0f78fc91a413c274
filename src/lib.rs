pub mod contract;
mod error;
pub mod integrations;
pub mod ledger;
pub mod msg;
pub mod rewards;
pub mod state;
pub mod strategy_executor;
pub mod token_converter;
pub mod voting;

#[cfg(test)]
mod tests;

pub use crate::error::{ContractError, IntegrationError};
