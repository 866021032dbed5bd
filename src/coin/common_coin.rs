//! The asynchronous common-coin driver.

use std::collections::BTreeMap;
use std::result;

use log::{debug, warn};
use thiserror::Error as ThisError;
use tokio::sync::{watch, Mutex};

use super::core::CoinCore;
use super::crypto::CoinCrypto;
use super::message::Message;
use crate::crypto;
use crate::messaging::{MessageStream, NodeId, SessionId, Transceiver};

/// A common-coin error.
#[derive(Clone, PartialEq, Debug, ThisError)]
pub enum Error {
    /// A crypto primitive failed; fatal for the caller.
    #[error("crypto error: {0}")]
    Crypto(#[from] crypto::Error),
    /// The round's state was pruned while a caller was still waiting on it.
    #[error("round was pruned while being awaited")]
    RoundPruned,
}

/// A common-coin result.
pub type Result<T> = result::Result<T, Error>;

/// One round's completion state: the channel holds `None` until the bit is
/// extracted, then `Some(bit)` forever. Every waiter holds a receiver, so
/// completion wakes all of them exactly once and late callers take the fast
/// path off the stored value.
type RoundResult = watch::Sender<Option<bool>>;

/// The common-coin protocol instance of one party.
///
/// [`CommonCoin::run`] must be driven in a background task to absorb peers'
/// shares; any number of concurrent [`CommonCoin::get_coin`] calls then
/// resolve as their rounds complete. Rounds are created lazily on first use
/// and this party broadcasts at most one share per round.
pub struct CommonCoin<T, C> {
    transport: T,
    crypto: C,
    inner: Mutex<Inner>,
}

struct Inner {
    core: CoinCore,
    results: BTreeMap<u64, RoundResult>,
}

impl Inner {
    fn round_result(&mut self, round: u64) -> &mut RoundResult {
        self.results
            .entry(round)
            .or_insert_with(|| watch::channel(None).0)
    }
}

impl<T, C> CommonCoin<T, C>
where
    T: Transceiver<Message>,
    C: CoinCrypto,
{
    /// Creates the coin instance of party `our_id` in `session_id`, among
    /// `num_nodes` parties tolerating `num_faulty` faults.
    pub fn new(
        session_id: SessionId,
        our_id: NodeId,
        num_nodes: usize,
        num_faulty: usize,
        transport: T,
        crypto: C,
    ) -> Self {
        CommonCoin {
            transport,
            crypto,
            inner: Mutex::new(Inner {
                core: CoinCore::new(session_id, our_id, num_nodes, num_faulty),
                results: BTreeMap::new(),
            }),
        }
    }

    /// Obtains the coin bit for `round`.
    ///
    /// On the first call for a round this signs and broadcasts our own share;
    /// afterwards it suspends until enough peer shares have arrived via
    /// [`CommonCoin::run`]. Completed rounds return immediately.
    pub async fn get_coin(&self, round: u64) -> Result<bool> {
        let (mut rx, request) = {
            let mut inner = self.inner.lock().await;
            let rx = inner.round_result(round).subscribe();
            if let Some(bit) = *rx.borrow() {
                return Ok(bit);
            }
            if inner.core.has_requested(round) {
                (rx, None)
            } else {
                inner.core.mark_requested(round);
                (rx, Some(inner.core.make_payload_bytes(round)))
            }
        };

        if let Some(payload) = request {
            let share = self.crypto.sign_share(&payload).await?;
            let (threshold_met, msg) = {
                let mut inner = self.inner.lock().await;
                let our_id = inner.core.our_id();
                let met = inner.core.add_share(round, our_id, share);
                let msg = Message {
                    sender: our_id,
                    session_id: inner.core.session_id(),
                    round,
                    share,
                };
                (met && !inner.core.is_finished(round), msg)
            };
            self.transport.broadcast(msg).await;
            if threshold_met {
                self.process_threshold_met(round).await;
            }
        }

        loop {
            if let Some(bit) = *rx.borrow_and_update() {
                return Ok(bit);
            }
            rx.changed().await.map_err(|_| Error::RoundPruned)?;
        }
    }

    /// The background message pump: verifies and absorbs peers' shares until
    /// the stream is exhausted, completing rounds as thresholds are met.
    pub async fn run<S: MessageStream<Message>>(&self, mut stream: S) {
        while let Some(msg) = stream.next().await {
            let payload = {
                let inner = self.inner.lock().await;
                if msg.session_id != inner.core.session_id() {
                    debug!(
                        "dropping coin share for foreign session {}",
                        msg.session_id
                    );
                    continue;
                }
                if inner.core.is_finished(msg.round) {
                    continue;
                }
                inner.core.make_payload_bytes(msg.round)
            };

            if !self
                .crypto
                .verify_share(&msg.share, &payload, msg.sender)
                .await
            {
                warn!(
                    "dropping invalid coin share from {} for round {}",
                    msg.sender, msg.round
                );
                continue;
            }

            let threshold_met = {
                let mut inner = self.inner.lock().await;
                let met = inner.core.add_share(msg.round, msg.sender, msg.share);
                met && !inner.core.is_finished(msg.round)
            };
            if threshold_met {
                self.process_threshold_met(msg.round).await;
            }
        }
    }

    /// Drops completion state for all rounds below `min_active_round`; the
    /// memory cap for long-running sessions. Callers must no longer await
    /// pruned rounds.
    pub async fn prune(&self, min_active_round: u64) {
        let mut inner = self.inner.lock().await;
        inner.results.retain(|&round, _| round >= min_active_round);
    }

    /// Combines the collected shares for `round` and resolves its waiters.
    /// Idempotent: re-checks completion around every suspension point.
    async fn process_threshold_met(&self, round: u64) {
        let (shares, payload) = {
            let inner = self.inner.lock().await;
            if inner.core.is_finished(round) {
                return;
            }
            (
                inner.core.get_shares(round),
                inner.core.make_payload_bytes(round),
            )
        };

        let Some(combined) = self.crypto.combine_signatures(&shares).await else {
            // Unreachable after per-share verification; abort the attempt and
            // let a later share trigger another one.
            warn!("combining {} verified shares failed", shares.len());
            return;
        };
        if !self.crypto.verify_signature(&combined, &payload).await {
            warn!("combined signature failed verification, dropping round attempt");
            return;
        }
        let bit = self.crypto.hash_to_bit(&combined);

        let mut inner = self.inner.lock().await;
        if inner.core.is_finished(round) {
            return;
        }
        inner.core.mark_finished(round);
        inner.round_result(round).send_replace(Some(bit));
        debug!("coin round {} resolved to {}", round, bit);
    }
}
