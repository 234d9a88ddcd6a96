//! Mint/spend orchestration over the shared engine state

use crate::accumulator::AccumulatorSnapshot;
use crate::crypto::{
    decode_public_value, generate_coin_secret, CoinSecret, PublicValue, SerialNumber,
    COIN_VERSION,
};
use crate::error::{Result, ZerocoinError};
use crate::registry::{MintMeta, MintState};
use crate::selection::{CoinSelector, DecomposingSelector};
use crate::spend::{verify_spend, ProofStatement, SpendAttempt, SpendProof, TransactionContext};
use crate::state::ZerocoinState;
use crate::types::{BlockHeight, Denomination, Hash, SpendType, TxID};
use crate::wallet::{CoinSecretStore, InMemoryCoinStore};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Mint created locally, waiting for the chain to confirm it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMint {
    pub txid: TxID,
    pub public_value: PublicValue,
    pub denomination: Denomination,
}

/// Mint reported by the chain layer as included in a block
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedMint {
    pub txid: TxID,
    pub public_value: PublicValue,
    pub denomination: Denomination,
}

impl From<PendingMint> for ConfirmedMint {
    fn from(pending: PendingMint) -> Self {
        Self {
            txid: pending.txid,
            public_value: pending.public_value,
            denomination: pending.denomination,
        }
    }
}

/// Outcome of ingesting one block
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockReport {
    pub height: BlockHeight,
    pub registered: usize,
    /// Registered mints whose secret this wallet holds
    pub owned: usize,
    pub checkpointed: bool,
}

/// Spend transaction ready for submission
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendTransaction {
    pub txid: TxID,
    pub spend_type: SpendType,
    pub context: TransactionContext,
    pub proofs: Vec<SpendProof>,
}

impl SpendTransaction {
    /// Amount the wallet should re-mint as change
    pub fn change(&self) -> u64 {
        self.context.change
    }

    /// Total value of the coins the proofs spend
    pub fn input_value(&self) -> Option<u64> {
        self.proofs
            .iter()
            .try_fold(0u64, |total, p| total.checked_add(p.denomination.value()))
    }

    pub fn serials(&self) -> Vec<SerialNumber> {
        self.proofs.iter().map(|p| p.serial).collect()
    }

    pub fn statement(&self) -> ProofStatement {
        ProofStatement {
            spend_type: self.spend_type,
            context: self.context.commitment(),
        }
    }
}

/// Accepted spend
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpendReceipt {
    pub txid: TxID,
    pub serials: Vec<SerialNumber>,
    /// Proofs rebuilt against a newer checkpoint before acceptance
    pub rebuilt: usize,
}

/// Drives minting, block ingestion, spend construction and acceptance
#[derive(Clone)]
pub struct MintSpendOrchestrator {
    state: ZerocoinState,
    wallet: Arc<Mutex<Box<dyn CoinSecretStore>>>,
    selector: Arc<dyn CoinSelector>,
    /// Spends built here and not yet accepted, by txid
    pending: Arc<Mutex<HashMap<TxID, SpendTransaction>>>,
}

impl MintSpendOrchestrator {
    /// Orchestrator with an in-memory wallet and the decomposing selector
    pub fn new(state: ZerocoinState) -> Self {
        Self::with_parts(
            state,
            Box::new(InMemoryCoinStore::new()),
            Arc::new(DecomposingSelector),
        )
    }

    pub fn with_parts(
        state: ZerocoinState,
        wallet: Box<dyn CoinSecretStore>,
        selector: Arc<dyn CoinSelector>,
    ) -> Self {
        Self {
            state,
            wallet: Arc::new(Mutex::new(wallet)),
            selector,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn state(&self) -> &ZerocoinState {
        &self.state
    }

    pub fn selector_name(&self) -> &'static str {
        self.selector.name()
    }

    /// Create coins worth `amount`, one per denomination in its decomposition.
    ///
    /// Secrets go straight to the wallet; the returned mints still need to be
    /// confirmed through `ingest_block`.
    pub async fn mint(&self, amount: u64) -> Result<Vec<PendingMint>> {
        let count = Denomination::coin_count(amount);
        if count == 0 {
            return Err(ZerocoinError::InvalidDenomination(amount));
        }
        let limit = self.state.config().max_mints_per_tx;
        if count > limit as u64 {
            return Err(ZerocoinError::TooManyMints {
                requested: count,
                limit,
            });
        }
        let denominations = Denomination::decompose(amount);

        let mut wallet = self.wallet.lock().await;
        let mut pending = Vec::with_capacity(denominations.len());
        for denomination in denominations {
            let secret = generate_coin_secret(denomination);
            let public_value = wallet.store(secret)?;
            pending.push(PendingMint {
                txid: TxID::from_payload(public_value.as_bytes()),
                public_value,
                denomination,
            });
        }

        tracing::info!("Minted {} coins worth {}", pending.len(), amount);
        Ok(pending)
    }

    /// Apply the mints confirmed in block `height`.
    ///
    /// The whole block is validated before anything is applied. Mints are
    /// applied in canonical order, then confirmations are refreshed and a
    /// checkpoint is taken on interval heights.
    pub async fn ingest_block(
        &self,
        height: BlockHeight,
        mut mints: Vec<ConfirmedMint>,
    ) -> Result<BlockReport> {
        if let Some(tip) = self.state.tip().await {
            if height <= tip {
                return Err(ZerocoinError::Internal(format!(
                    "block {} is not above tip {}",
                    height, tip
                )));
            }
        }

        mints.sort_by(|a, b| {
            a.denomination
                .cmp(&b.denomination)
                .then(a.public_value.cmp(&b.public_value))
        });

        let owned: BTreeMap<PublicValue, SerialNumber> = {
            let wallet = self.wallet.lock().await;
            let mut owned = BTreeMap::new();
            for mint in &mints {
                if wallet.contains(&mint.public_value) {
                    let serial = wallet.get(&mint.public_value)?.serial_number();
                    owned.insert(mint.public_value, serial);
                }
            }
            owned
        };

        let config = self.state.config().clone();
        let accumulator = self.state.accumulator();
        let registry = self.state.registry();
        let mut accumulator = accumulator.write().await;
        let mut registry = registry.lock().await;

        let mut seen = HashSet::new();
        for mint in &mints {
            decode_public_value(&mint.public_value)?;
            if !seen.insert(mint.public_value) || registry.get(&mint.public_value).is_some() {
                return Err(ZerocoinError::DuplicateCommitment(mint.public_value.to_hex()));
            }
        }

        for mint in &mints {
            let is_owned = owned.contains_key(&mint.public_value);
            registry.register_mint(MintMeta {
                public_value: mint.public_value,
                denomination: mint.denomination,
                version: COIN_VERSION,
                accumulator_checksum: accumulator.latest_checksum(mint.denomination),
                height,
                txid: mint.txid.clone(),
                spendable: is_owned,
                confirmations: 0,
                state: MintState::Minted,
            })?;
            accumulator.add(mint.denomination, &mint.public_value)?;
        }

        for (public_value, serial) in &owned {
            registry.link_serial(*serial, *public_value);
        }
        registry.update_confirmations(height, config.required_confirmations);

        let checkpointed = config.is_checkpoint_height(height);
        if checkpointed {
            accumulator.checkpoint(height)?;
        }
        drop(registry);
        drop(accumulator);
        self.state.set_tip(height).await;

        tracing::debug!(
            "Ingested block {} with {} mints ({} owned)",
            height,
            mints.len(),
            owned.len()
        );

        Ok(BlockReport {
            height,
            registered: mints.len(),
            owned: owned.len(),
            checkpointed,
        })
    }

    /// Build a spend of `amount` bound to `spend_type` and the given outputs.
    ///
    /// Proofs are constructed on the blocking pool without holding any state lock.
    pub async fn spend(
        &self,
        amount: u64,
        spend_type: SpendType,
        outputs: Vec<Hash>,
    ) -> Result<SpendTransaction> {
        let config = self.state.config().clone();
        let available = self
            .state
            .registry()
            .lock()
            .await
            .spendable_mints(config.required_confirmations);

        let selection = self
            .selector
            .select(amount, &available, config.max_spends_per_tx)?;

        let mut context = TransactionContext::new(amount).with_change(selection.change);
        for output in outputs {
            context = context.with_output(output);
        }

        let mut jobs = Vec::with_capacity(selection.coins.len());
        for coin in &selection.coins {
            let secret = self.wallet.lock().await.get(&coin.public_value)?;
            let snapshot = self
                .state
                .accumulator()
                .read()
                .await
                .latest_checkpoint(coin.denomination)?;
            let attempt =
                SpendAttempt::new(coin.public_value, coin.denomination, spend_type, &context);
            jobs.push(prove_off_thread(attempt, secret, snapshot));
        }
        let proofs = try_join_all(jobs).await?;

        let mut payload = context.commitment().0.to_vec();
        for proof in &proofs {
            payload.extend_from_slice(&proof.serial.0);
        }
        let tx = SpendTransaction {
            txid: TxID::from_payload(&payload),
            spend_type,
            context,
            proofs,
        };

        tracing::info!(
            "Built {} spend {} of {} using {} coins (change {})",
            spend_type,
            tx.txid,
            amount,
            tx.proofs.len(),
            tx.change()
        );
        self.pending
            .lock()
            .await
            .insert(tx.txid.clone(), tx.clone());
        Ok(tx)
    }

    /// Verify every proof of `tx`, then record all its serials as spent.
    ///
    /// The spent denominations must add up to amount, fee and change. A proof
    /// referencing a checkpoint that is no longer known is rebuilt against the
    /// latest checkpoint exactly once, and only when `tx` is a spend this
    /// orchestrator built, unaltered. Consensus errors reject the whole
    /// transaction.
    pub async fn submit_spend(&self, tx: &SpendTransaction) -> Result<SpendReceipt> {
        let config = self.state.config();
        if tx.proofs.is_empty() {
            return Err(ZerocoinError::BadProof("transaction has no proofs".to_string()));
        }
        if tx.proofs.len() > config.max_spends_per_tx {
            return Err(ZerocoinError::TooManySpends {
                requested: tx.proofs.len(),
                limit: config.max_spends_per_tx,
            });
        }

        let mut serials = HashSet::new();
        for proof in &tx.proofs {
            if !serials.insert(proof.serial) {
                return Err(ZerocoinError::DoubleSpend(proof.serial.to_hex()));
            }
        }

        let (inputs, outputs) = (tx.input_value(), tx.context.total_out());
        if inputs.is_none() || inputs != outputs {
            let inputs = inputs.unwrap_or(u64::MAX);
            let outputs = outputs.unwrap_or(u64::MAX);
            tracing::warn!(
                "Rejected spend {}: inputs {} do not match outputs {}",
                tx.txid,
                inputs,
                outputs
            );
            return Err(ZerocoinError::UnbalancedSpend { inputs, outputs });
        }

        let statement = tx.statement();
        let mut accepted = Vec::with_capacity(tx.proofs.len());
        let mut rebuilt = 0;
        for proof in &tx.proofs {
            match self.check_proof(proof, &statement).await {
                Ok(()) => accepted.push(proof.clone()),
                Err(err) if err.is_retryable() => {
                    if !self.is_own_pending(tx).await {
                        tracing::warn!(
                            "Rejected spend {}: checkpoint {} unknown",
                            tx.txid,
                            proof.checksum.short()
                        );
                        return Err(err);
                    }
                    tracing::warn!(
                        "Checkpoint {} for serial {} is gone, rebuilding proof",
                        proof.checksum.short(),
                        proof.serial
                    );
                    let fresh = self.rebuild_proof(proof, tx).await.map_err(|rebuild_err| {
                        tracing::debug!("Rebuild of {} failed: {}", proof.serial, rebuild_err);
                        err
                    })?;
                    self.check_proof(&fresh, &statement).await?;
                    accepted.push(fresh);
                    rebuilt += 1;
                }
                Err(err) => {
                    tracing::warn!("Rejected spend {}: {}", tx.txid, err);
                    return Err(err);
                }
            }
        }

        let retired = {
            let registry = self.state.registry();
            let mut registry = registry.lock().await;
            if let Some(spent) = accepted.iter().find(|p| registry.is_serial_spent(&p.serial)) {
                tracing::warn!("Rejected spend {}: serial {} raced", tx.txid, spent.serial);
                return Err(ZerocoinError::DoubleSpend(spent.serial.to_hex()));
            }
            let mut retired = Vec::new();
            for proof in &accepted {
                if let Some(public_value) = registry.mark_spent(&proof.serial)? {
                    retired.push(public_value);
                }
            }
            retired
        };

        {
            let mut wallet = self.wallet.lock().await;
            for public_value in &retired {
                if wallet.contains(public_value) {
                    wallet.remove(public_value)?;
                }
            }
        }
        self.pending.lock().await.remove(&tx.txid);

        tracing::info!(
            "Accepted {} spend {} ({} serials)",
            tx.spend_type,
            tx.txid,
            accepted.len()
        );
        Ok(SpendReceipt {
            txid: tx.txid.clone(),
            serials: accepted.iter().map(|p| p.serial).collect(),
            rebuilt,
        })
    }

    /// Whether `tx` is exactly a spend built here and not yet accepted
    async fn is_own_pending(&self, tx: &SpendTransaction) -> bool {
        self.pending.lock().await.get(&tx.txid) == Some(tx)
    }

    async fn check_proof(&self, proof: &SpendProof, statement: &ProofStatement) -> Result<()> {
        let accumulator = self.state.accumulator();
        let accumulator = accumulator.read().await;
        let registry = self.state.registry();
        let registry = registry.lock().await;
        verify_spend(proof, statement, &accumulator, &registry)
    }

    /// Recompute witness and proof for a local coin against its latest checkpoint
    async fn rebuild_proof(&self, stale: &SpendProof, tx: &SpendTransaction) -> Result<SpendProof> {
        let public_value = self
            .state
            .registry()
            .lock()
            .await
            .owner_of(&stale.serial)
            .ok_or_else(|| ZerocoinError::CoinSecretNotFound(stale.serial.to_hex()))?;
        let secret = self.wallet.lock().await.get(&public_value)?;
        let snapshot = self
            .state
            .accumulator()
            .read()
            .await
            .latest_checkpoint(stale.denomination)?;

        let attempt =
            SpendAttempt::new(public_value, stale.denomination, tx.spend_type, &tx.context);
        prove_off_thread(attempt, secret, snapshot).await
    }

    /// Every mint the registry knows about
    pub async fn mints(&self) -> Vec<MintMeta> {
        self.state.registry().lock().await.mints().cloned().collect()
    }

    pub async fn spendable_mints(&self) -> Vec<MintMeta> {
        let required = self.state.config().required_confirmations;
        self.state.registry().lock().await.spendable_mints(required)
    }

    pub async fn balance(&self, mature_only: bool) -> u64 {
        let required = self.state.config().required_confirmations;
        self.state
            .registry()
            .lock()
            .await
            .balance(required, mature_only)
    }

    pub async fn distribution(&self) -> BTreeMap<Denomination, u64> {
        self.state.registry().lock().await.distribution()
    }
}

/// Compute witness and proof on the blocking pool
async fn prove_off_thread(
    mut attempt: SpendAttempt,
    secret: CoinSecret,
    snapshot: Arc<AccumulatorSnapshot>,
) -> Result<SpendProof> {
    tokio::task::spawn_blocking(move || {
        attempt.compute_witness(&snapshot)?;
        attempt.construct_proof(&secret, &snapshot).cloned()
    })
    .await
    .map_err(|e| ZerocoinError::Internal(format!("proof task failed: {}", e)))?
}
