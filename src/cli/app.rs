//! Simulation runner behind the `zerocoin` binary

use crate::config::ZerocoinConfig;
use crate::crypto::generate_coin_secret;
use crate::error::ZerocoinError;
use crate::orchestrator::{ConfirmedMint, MintSpendOrchestrator};
use crate::selection::{CoinSelector, DecomposingSelector, ExactDenominationSelector};
use crate::state::ZerocoinState;
use crate::types::{BlockHeight, Denomination, Hash, SpendType, TxID};
use crate::wallet::InMemoryCoinStore;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::commands::SelectorKind;

/// Inputs for one simulated mint/spend cycle
#[derive(Clone, Debug)]
pub struct SimulationParams {
    pub mint: u64,
    pub spend: u64,
    pub spend_type: SpendType,
    pub decoys: usize,
    pub selector: SelectorKind,
    pub output: Option<PathBuf>,
}

/// What happened during a simulation
#[derive(Clone, Debug)]
pub struct SimulationReport {
    pub minted: usize,
    pub tip: BlockHeight,
    pub spent_coins: usize,
    pub change: u64,
    pub balance_after: u64,
    /// Error the engine returned when the same spend was replayed
    pub replay_rejection: String,
}

/// Load config from a file when given, else defaults overlaid with the environment
pub fn load_config(path: Option<&Path>) -> Result<ZerocoinConfig> {
    match path {
        Some(path) => ZerocoinConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => ZerocoinConfig::from_env().context("invalid ZEROCOIN_* environment"),
    }
}

/// Chain stand-in driving an orchestrator block by block
pub struct SimulationApp {
    orchestrator: MintSpendOrchestrator,
    height: BlockHeight,
}

impl SimulationApp {
    pub fn new(config: ZerocoinConfig, selector: SelectorKind) -> Result<Self> {
        let state = ZerocoinState::new(config).context("invalid engine config")?;
        let selector: Arc<dyn CoinSelector> = match selector {
            SelectorKind::Exact => Arc::new(ExactDenominationSelector),
            SelectorKind::Decomposing => Arc::new(DecomposingSelector),
        };
        let orchestrator =
            MintSpendOrchestrator::with_parts(state, Box::new(InMemoryCoinStore::new()), selector);

        Ok(Self {
            orchestrator,
            height: 0,
        })
    }

    pub fn orchestrator(&self) -> &MintSpendOrchestrator {
        &self.orchestrator
    }

    async fn next_block(&mut self, mints: Vec<ConfirmedMint>) -> Result<()> {
        self.height += 1;
        let report = self
            .orchestrator
            .ingest_block(self.height, mints)
            .await
            .with_context(|| format!("failed to ingest block {}", self.height))?;
        if report.checkpointed {
            tracing::debug!("Checkpoint taken at block {}", report.height);
        }
        Ok(())
    }

    /// Mint, mature, spend, submit and replay
    pub async fn run(&mut self, params: &SimulationParams) -> Result<SimulationReport> {
        let config = self.orchestrator.state().config().clone();
        tracing::info!(
            "Simulating mint of {} and {} of {} with the {} selector",
            params.mint,
            params.spend_type,
            params.spend,
            self.orchestrator.selector_name()
        );

        let pending = self
            .orchestrator
            .mint(params.mint)
            .await
            .context("mint failed")?;
        let minted = pending.len();

        let mut block: Vec<ConfirmedMint> = pending.into_iter().map(Into::into).collect();
        for denomination in Denomination::all() {
            for i in 0..params.decoys {
                let public_value = generate_coin_secret(denomination).public_value();
                block.push(ConfirmedMint {
                    txid: TxID(format!("decoy-{}-{}", denomination, i)),
                    public_value,
                    denomination,
                });
            }
        }
        self.next_block(block).await?;

        // Mature the mints and reach a checkpoint that contains them
        while self.height < config.required_confirmations
            || !config.is_checkpoint_height(self.height)
        {
            self.next_block(Vec::new()).await?;
        }

        let tx = self
            .orchestrator
            .spend(
                params.spend,
                params.spend_type,
                vec![Hash::from_bytes(b"simulated payee")],
            )
            .await
            .context("spend construction failed")?;

        let receipt = self
            .orchestrator
            .submit_spend(&tx)
            .await
            .context("spend was rejected")?;
        tracing::info!("Spend {} accepted", receipt.txid);

        let replay_rejection = match self.orchestrator.submit_spend(&tx).await {
            Ok(_) => bail!("replayed spend {} was accepted", tx.txid),
            Err(err @ ZerocoinError::SerialAlreadySpent(_)) => err.to_string(),
            Err(err) => return Err(err).context("replay failed for an unexpected reason"),
        };
        tracing::info!("Replay rejected: {}", replay_rejection);

        if let Some(path) = &params.output {
            self.orchestrator
                .state()
                .save_snapshot(path)
                .await
                .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
        }

        Ok(SimulationReport {
            minted,
            tip: self.height,
            spent_coins: receipt.serials.len(),
            change: tx.change(),
            balance_after: self.orchestrator.balance(false).await,
            replay_rejection,
        })
    }
}

/// One line per denomination in the decomposition of `amount`
pub fn describe_denominations(amount: u64) -> Vec<String> {
    let mut lines = Vec::new();
    for denomination in Denomination::all().into_iter().rev() {
        let count = Denomination::decompose(amount)
            .into_iter()
            .filter(|d| *d == denomination)
            .count();
        if count > 0 {
            lines.push(format!("{:>4} x {}", denomination.value(), count));
        }
    }
    lines
}

/// Human-readable summary of a saved snapshot
pub async fn inspect_snapshot(path: &Path) -> Result<Vec<String>> {
    let state = ZerocoinState::load_snapshot(path)
        .await
        .with_context(|| format!("failed to load snapshot {}", path.display()))?;

    let mut lines = Vec::new();
    match state.tip().await {
        Some(tip) => lines.push(format!("tip height: {}", tip)),
        None => lines.push("tip height: genesis".to_string()),
    }

    let accumulator = state.accumulator();
    let accumulator = accumulator.read().await;
    lines.push(format!("checkpoints: {:?}", accumulator.checkpoint_heights()));
    for denomination in Denomination::all() {
        let members = accumulator.member_count(denomination);
        if members == 0 {
            continue;
        }
        let checksum = accumulator
            .latest_checksum(denomination)
            .map(|c| c.short())
            .unwrap_or_else(|| "-".to_string());
        lines.push(format!(
            "denomination {:>5}: {} coins, checkpoint {}",
            denomination.value(),
            members,
            checksum
        ));
    }

    let registry = state.registry();
    let registry = registry.lock().await;
    lines.push(format!(
        "mints: {}, spent serials: {}",
        registry.mints().count(),
        registry.spent_count()
    ));
    Ok(lines)
}
