//! Common coin.
//!
//! For each round, every correct party obtains the same unpredictable bit.
//! Each party signs the round-specific payload `"<session_id>:<round>"` with
//! its TBLS key share and broadcasts the share; once `f + 1` verified shares
//! for a round are collected they are combined into the unique master
//! signature, whose hash yields the coin bit. No coalition of at most `f`
//! parties can predict or bias the outcome, because fewer than `f + 1`
//! shares reveal nothing about the combined signature.
//!
//! [`CoinCore`] is the pure per-round bookkeeping; [`CommonCoin`] is the
//! async driver serving [`CommonCoin::get_coin`] requests while absorbing
//! peers' shares from the message stream in [`CommonCoin::run`].

mod common_coin;
mod core;
mod crypto;
mod message;

pub use self::common_coin::{CommonCoin, Error, Result};
pub use self::core::CoinCore;
pub use self::crypto::{CoinCrypto, ThresholdSigner};
pub use self::message::Message;
