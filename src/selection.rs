//! Coin selection strategies for spends

use crate::error::{Result, ZerocoinError};
use crate::registry::MintMeta;
use crate::types::Denomination;

/// Coins chosen for a spend and the change left over
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub coins: Vec<MintMeta>,
    /// Amount to re-mint back to the wallet
    pub change: u64,
}

impl Selection {
    pub fn total(&self) -> u64 {
        self.coins.iter().map(|c| c.denomination.value()).sum()
    }
}

/// Picks spendable mints covering a target amount
pub trait CoinSelector: Send + Sync {
    fn select(&self, target: u64, available: &[MintMeta], max_spends: usize) -> Result<Selection>;

    fn name(&self) -> &'static str;
}

fn total_of(coins: &[MintMeta]) -> u64 {
    coins.iter().map(|c| c.denomination.value()).sum()
}

/// Largest denomination first, oldest first within a denomination
fn sorted_desc(available: &[MintMeta]) -> Vec<MintMeta> {
    let mut coins = available.to_vec();
    coins.sort_by(|a, b| {
        b.denomination
            .cmp(&a.denomination)
            .then(a.height.cmp(&b.height))
            .then(a.public_value.cmp(&b.public_value))
    });
    coins
}

/// Spends exactly one coin whose denomination equals the target
#[derive(Clone, Copy, Debug, Default)]
pub struct ExactDenominationSelector;

impl CoinSelector for ExactDenominationSelector {
    fn select(&self, target: u64, available: &[MintMeta], max_spends: usize) -> Result<Selection> {
        let denomination = Denomination::from_value(target)?;
        if max_spends == 0 {
            return Err(ZerocoinError::TooManySpends {
                requested: 1,
                limit: max_spends,
            });
        }

        let coin = available
            .iter()
            .filter(|c| c.denomination == denomination)
            .min_by(|a, b| {
                a.height
                    .cmp(&b.height)
                    .then(a.public_value.cmp(&b.public_value))
            })
            .ok_or(ZerocoinError::InsufficientFunds {
                required: target,
                available: total_of(available),
            })?;

        Ok(Selection {
            coins: vec![coin.clone()],
            change: 0,
        })
    }

    fn name(&self) -> &'static str {
        "exact-denomination"
    }
}

/// Exact multi-coin match when possible, otherwise the smallest over-target set
#[derive(Clone, Copy, Debug, Default)]
pub struct DecomposingSelector;

impl DecomposingSelector {
    /// Greedy largest-first exact match
    fn exact(target: u64, coins: &[MintMeta]) -> Option<Vec<MintMeta>> {
        let mut remaining = target;
        let mut picked = Vec::new();
        for coin in coins {
            let value = coin.denomination.value();
            if value <= remaining {
                remaining -= value;
                picked.push(coin.clone());
                if remaining == 0 {
                    return Some(picked);
                }
            }
        }
        None
    }

    /// Cover the target with as little excess as the greedy pass allows
    fn covering(target: u64, coins: &[MintMeta]) -> Vec<MintMeta> {
        let mut remaining = target;
        let mut picked = Vec::new();
        let mut unused = Vec::new();
        for coin in coins {
            let value = coin.denomination.value();
            if value <= remaining {
                remaining -= value;
                picked.push(coin.clone());
            } else {
                unused.push(coin.clone());
            }
        }

        if remaining > 0 {
            // unused is in descending order; the last fitting coin is the smallest
            match unused
                .iter()
                .rposition(|c| c.denomination.value() >= remaining)
            {
                Some(index) => picked.push(unused.remove(index)),
                None => {
                    for coin in unused {
                        if remaining == 0 {
                            break;
                        }
                        remaining = remaining.saturating_sub(coin.denomination.value());
                        picked.push(coin);
                    }
                }
            }
        }

        // Drop the smallest coins that are no longer needed
        picked.sort_by(|a, b| b.denomination.cmp(&a.denomination));
        while let Some(last) = picked.last() {
            if total_of(&picked) - last.denomination.value() >= target {
                picked.pop();
            } else {
                break;
            }
        }
        picked
    }
}

impl CoinSelector for DecomposingSelector {
    fn select(&self, target: u64, available: &[MintMeta], max_spends: usize) -> Result<Selection> {
        if target == 0 {
            return Err(ZerocoinError::InvalidDenomination(target));
        }

        let funds = total_of(available);
        if funds < target {
            return Err(ZerocoinError::InsufficientFunds {
                required: target,
                available: funds,
            });
        }

        let coins = sorted_desc(available);
        if let Some(exact) = Self::exact(target, &coins) {
            if exact.len() <= max_spends {
                return Ok(Selection {
                    coins: exact,
                    change: 0,
                });
            }
        }

        let picked = Self::covering(target, &coins);
        if picked.len() > max_spends {
            return Err(ZerocoinError::TooManySpends {
                requested: picked.len(),
                limit: max_spends,
            });
        }

        let change = total_of(&picked) - target;
        Ok(Selection {
            coins: picked,
            change,
        })
    }

    fn name(&self) -> &'static str {
        "decomposing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_coin_secret;
    use crate::registry::MintState;
    use crate::types::TxID;

    fn mint(denomination: Denomination, height: u64) -> MintMeta {
        MintMeta {
            public_value: generate_coin_secret(denomination).public_value(),
            denomination,
            version: 2,
            accumulator_checksum: None,
            height,
            txid: TxID(format!("tx-{}", height)),
            spendable: true,
            confirmations: 30,
            state: MintState::Confirmed,
        }
    }

    fn values(selection: &Selection) -> Vec<u64> {
        selection
            .coins
            .iter()
            .map(|c| c.denomination.value())
            .collect()
    }

    #[test]
    fn test_exact_denomination_picks_oldest() {
        let coins = vec![
            mint(Denomination::Ten, 5),
            mint(Denomination::Ten, 2),
            mint(Denomination::Fifty, 1),
        ];
        let selection = ExactDenominationSelector.select(10, &coins, 7).unwrap();

        assert_eq!(selection.coins.len(), 1);
        assert_eq!(selection.coins[0].height, 2);
        assert_eq!(selection.change, 0);
    }

    #[test]
    fn test_exact_denomination_errors() {
        let coins = vec![mint(Denomination::Fifty, 1)];

        assert!(matches!(
            ExactDenominationSelector.select(7, &coins, 7),
            Err(ZerocoinError::InvalidDenomination(7))
        ));
        assert!(matches!(
            ExactDenominationSelector.select(10, &coins, 7),
            Err(ZerocoinError::InsufficientFunds {
                required: 10,
                available: 50
            })
        ));
    }

    #[test]
    fn test_decomposing_exact_match() {
        let coins = vec![
            mint(Denomination::One, 1),
            mint(Denomination::Five, 1),
            mint(Denomination::Ten, 1),
            mint(Denomination::Fifty, 1),
        ];
        let selection = DecomposingSelector.select(16, &coins, 7).unwrap();

        assert_eq!(values(&selection), vec![10, 5, 1]);
        assert_eq!(selection.change, 0);
    }

    #[test]
    fn test_decomposing_with_change() {
        let coins = vec![mint(Denomination::Ten, 1), mint(Denomination::OneHundred, 1)];
        let selection = DecomposingSelector.select(30, &coins, 7).unwrap();

        assert_eq!(values(&selection), vec![100]);
        assert_eq!(selection.change, 70);
        assert_eq!(selection.total(), 100);
    }

    #[test]
    fn test_decomposing_prefers_smallest_cover() {
        let coins = vec![
            mint(Denomination::Five, 1),
            mint(Denomination::Fifty, 1),
            mint(Denomination::FiveHundred, 1),
        ];
        let selection = DecomposingSelector.select(8, &coins, 7).unwrap();

        assert_eq!(values(&selection), vec![50]);
        assert_eq!(selection.change, 42);
    }

    #[test]
    fn test_decomposing_insufficient_funds() {
        let coins = vec![mint(Denomination::Five, 1)];
        assert!(matches!(
            DecomposingSelector.select(6, &coins, 7),
            Err(ZerocoinError::InsufficientFunds {
                required: 6,
                available: 5
            })
        ));
    }

    #[test]
    fn test_decomposing_spend_limit() {
        let coins: Vec<MintMeta> = (0..5).map(|h| mint(Denomination::One, h)).collect();
        assert!(matches!(
            DecomposingSelector.select(5, &coins, 3),
            Err(ZerocoinError::TooManySpends {
                requested: 5,
                limit: 3
            })
        ));
    }
}
