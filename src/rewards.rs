use cosmwasm_std::{Decimal, Fraction, Uint128};

use crate::state::{GardenConfig, RewardCurve};

pub struct SettlementTerms {
    pub stake: Uint128,
    pub pnl: i128,
    pub duration: u64,
    /// Seconds between the earliest finalize time and the actual one.
    pub lateness: u64,
}

#[derive(Debug, PartialEq, Default)]
pub struct Settlement {
    pub bonus: Uint128,
    pub penalty: Uint128,
}

impl RewardCurve {
    pub fn settle(&self, config: &GardenConfig, terms: &SettlementTerms) -> Settlement {
        let magnitude = Uint128::new(terms.pnl.unsigned_abs());

        if terms.pnl < 0 {
            let share = config.strategist_loss_share;
            let penalty = magnitude.multiply_ratio(share.numerator(), share.denominator());
            return Settlement {
                bonus: Uint128::zero(),
                penalty: penalty.min(terms.stake),
            };
        }

        let share = config.strategist_profit_share;
        let linear = magnitude.multiply_ratio(share.numerator(), share.denominator());
        let bonus = match self {
            RewardCurve::Linear => linear,
            RewardCurve::Decaying => {
                let factor = decay_factor(config.decay_rate, terms.lateness, terms.duration);
                let kept = Decimal::one() - factor;
                linear.multiply_ratio(kept.numerator(), kept.denominator())
            }
        };

        Settlement {
            bonus,
            penalty: Uint128::zero(),
        }
    }
}

fn decay_factor(decay_rate: Decimal, lateness: u64, duration: u64) -> Decimal {
    if lateness == 0 || duration == 0 {
        return Decimal::zero();
    }
    let overrun = Decimal::from_ratio(lateness, duration).min(Decimal::one());
    (decay_rate * overrun).min(Decimal::one())
}
