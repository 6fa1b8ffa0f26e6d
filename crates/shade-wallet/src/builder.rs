//! Transaction construction pipeline.
//!
//! A transfer runs: select a source balance, derive one-time outputs,
//! prove output ranges, balance a pseudo commitment against the
//! outputs, sign the spend over a decoy ring, evaluate the timelock,
//! and seal the transaction id last. Every proof produced here is
//! verified locally before the transaction leaves the wallet.

use chrono::Utc;
use rand::{CryptoRng, RngCore};
use tracing::info;

use curve25519_dalek::scalar::Scalar;
use shade_core::constants::{REWARD_MATURITY, RING_SIZE, STAKE_REWARD, TX_VERSION};
use shade_core::types::{
    CoinType, Hash256, RangeProofEntry, RingPayload, Transaction, Vin, Vout, Vtime,
};
use shade_core::{commitment, mlsag, rangeproof, stealth};

use crate::balance;
use crate::error::WalletError;
use crate::keys::StealthAddress;
use crate::records::{TxDirection, WalletTransaction};
use crate::ring::{self, RingCandidate};
use crate::session::{OperationGuard, Session, TransferKind};
use crate::store::WalletStore;
use crate::timelock::{self, TimelockPolicy};

/// A signed transaction together with the wallet's record of it.
#[derive(Clone, Debug)]
pub struct BuiltTransfer {
    pub transaction: Transaction,
    pub record: WalletTransaction,
}

/// One output in flight, before it becomes a [`Vout`].
struct PendingOutput {
    value: u64,
    blind: Scalar,
    visible_amount: u64,
    coin_type: CoinType,
    ephemeral_key: [u8; 32],
    one_time_key: [u8; 32],
    note: Vec<u8>,
    script: Option<String>,
    /// Minted outputs are excluded from the commitment balance check.
    minted: bool,
}

fn make_output<R: RngCore + CryptoRng>(
    destination: &StealthAddress,
    value: u64,
    visible_amount: u64,
    coin_type: CoinType,
    script: Option<String>,
    minted: bool,
    memo: &str,
    rng: &mut R,
) -> Result<PendingOutput, WalletError> {
    let payment = stealth::create_payment(
        &destination.spend_public,
        &destination.scan_public,
        rng,
    )?;
    let blind = commitment::random_blind(rng);
    let note = crate::notes::seal(&payment.note_key, value, &blind, memo)?;
    Ok(PendingOutput {
        value,
        blind,
        visible_amount,
        coin_type,
        ephemeral_key: payment.ephemeral_public,
        one_time_key: payment.one_time_key,
        note,
        script,
        minted,
    })
}

/// Digest an unsigned transaction for ring signing.
///
/// The precursor carries the final inputs, outputs, range proofs, ring
/// members and pseudo commitment; the signature itself, the timelock
/// witness and the id are still blank, so the ring signature binds
/// everything the verifier will check against it.
fn signing_message(precursor: &Transaction) -> Result<[u8; 32], WalletError> {
    let digest = precursor
        .compute_id()
        .map_err(|e| WalletError::Serialization(e.to_string()))?;
    Ok(*digest.as_bytes())
}

/// Build and sign a complete transfer.
///
/// `decoy_pool` must contain the source output itself; the chain client
/// indexes every spendable output, the wallet's own included.
pub fn build_transfer<R: RngCore + CryptoRng>(
    session: &Session,
    store: &WalletStore,
    decoy_pool: &[RingCandidate],
    recipient: &StealthAddress,
    payment: u64,
    memo: &str,
    policy: &TimelockPolicy,
    now: u64,
    rng: &mut R,
) -> Result<BuiltTransfer, WalletError> {
    let _guard = OperationGuard::enter();
    let correlation_id = session.correlation_id();
    let own_address = *session.key_set().address();

    let balances = balance::compute_balances(session, store)?;
    let (source, change) = balance::calculate_change(&balances, payment, now)?;

    info!(
        %correlation_id,
        payment,
        change,
        kind = ?session.transfer_kind(),
        "building transfer"
    );

    // Canonical output order: [reward,] [change,] payment.
    let mut pending: Vec<PendingOutput> = Vec::with_capacity(3);
    if session.transfer_kind() == TransferKind::Coinstake {
        pending.push(make_output(
            &own_address,
            STAKE_REWARD,
            STAKE_REWARD,
            CoinType::Coinstake,
            Some(format!("{REWARD_MATURITY} OP_CHECKSEQUENCEVERIFY OP_DROP")),
            true,
            "",
            rng,
        )?);
    }
    if change > 0 {
        pending.push(make_output(
            &own_address,
            change,
            0,
            CoinType::Change,
            None,
            false,
            "",
            rng,
        )?);
    }
    pending.push(make_output(
        recipient,
        payment,
        0,
        CoinType::Payment,
        None,
        false,
        memo,
        rng,
    )?);

    // Range proofs for every output. The prover returns the commitment
    // it attested to; the output carries exactly those bytes.
    let mut vouts = Vec::with_capacity(pending.len());
    let mut range_proofs = Vec::with_capacity(pending.len());
    for out in &pending {
        let (proof, committed) = rangeproof::prove(out.value, &out.blind)
            .map_err(|e| WalletError::RangeProofInvalid(e.to_string()))?;
        rangeproof::verify(&committed, &proof)
            .map_err(|e| WalletError::RangeProofInvalid(e.to_string()))?;
        vouts.push(Vout {
            amount: out.visible_amount,
            commitment: committed,
            ephemeral_key: out.ephemeral_key,
            lock_time: 0,
            note: out.note.clone(),
            one_time_key: out.one_time_key,
            script: out.script.clone(),
            coin_type: out.coin_type,
        });
        range_proofs.push(RangeProofEntry {
            commitment: committed,
            proof,
        });
    }

    // The pseudo commitment re-commits the source value under the sum
    // of the confidential output blinds, so pseudo minus outputs nets
    // to the identity. Minted reward value stays outside the check.
    let confidential: Vec<&PendingOutput> = pending.iter().filter(|o| !o.minted).collect();
    let pseudo_blind = commitment::blind_sum(
        &confidential.iter().map(|o| o.blind).collect::<Vec<_>>(),
        &[],
    );
    let pseudo_commitment = commitment::commit_bytes(source.total, &pseudo_blind);
    let confidential_commitments: Vec<[u8; 32]> = vouts
        .iter()
        .zip(&pending)
        .filter(|(_, o)| !o.minted)
        .map(|(v, _)| v.commitment)
        .collect();
    commitment::verify_commit_sum(&[pseudo_commitment], &confidential_commitments)
        .map_err(|_| WalletError::CommitSumMismatch)?;

    // The one-time secret for the source output and its key image.
    let unlocked = session.key_set().unlock();
    let spend_secret = stealth::uncover_secret(
        &unlocked.scan_secret,
        &unlocked.spend_secret,
        &source.ephemeral_key,
    )?;
    let key_image = mlsag::key_image(&spend_secret, &source.one_time_key);

    let ring = ring::build_ring(decoy_pool, &source.one_time_key, RING_SIZE, now, rng)?;

    let mut transaction = Transaction {
        version: TX_VERSION,
        mix: RING_SIZE as u16,
        vins: vec![Vin {
            key_image,
            key_offsets: ring.key_offsets.clone(),
        }],
        vouts,
        range_proofs,
        ring_sig: RingPayload {
            ring_keys: ring.keys.clone(),
            ring_commitments: ring.commitments.clone(),
            pseudo_commitment,
            signature: mlsag::MlsagSignature {
                challenge: [0u8; 32],
                responses: Vec::new(),
                key_image,
            },
        },
        vtime: Vtime::default(),
        id: Hash256::ZERO,
    };

    let message = signing_message(&transaction)?;
    let blind_delta = source.blind - pseudo_blind;
    transaction.ring_sig.signature = ring::sign_and_verify(
        &message,
        &ring,
        &pseudo_commitment,
        &spend_secret,
        &blind_delta,
        rng,
    )?;

    let (vtime, delay_counter) =
        timelock::compute_timelock(&Hash256(message), policy, now)?;
    transaction.vtime = vtime;

    transaction.id = transaction
        .compute_id()
        .map_err(|e| WalletError::Serialization(e.to_string()))?;

    let reward = if session.transfer_kind() == TransferKind::Coinstake {
        STAKE_REWARD
    } else {
        0
    };
    let record = WalletTransaction {
        transaction: transaction.clone(),
        payment,
        change,
        reward,
        source_commitment: source.commitment,
        delay_counter,
        is_verified: false,
        is_spent: false,
        direction: TxDirection::Send,
        sender: own_address.to_string(),
        recipient: recipient.to_string(),
        memo: memo.to_string(),
        timestamp: Utc::now(),
        correlation_id,
    };

    info!(%correlation_id, txid = %transaction.id, "transfer built");
    Ok(BuiltTransfer {
        transaction,
        record,
    })
}
