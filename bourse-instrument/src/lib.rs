#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # Bourse-Instrument
//! Bourse-Instrument contains the core venue Instrument data structures and the instrument
//! cache used to resolve client-supplied instrument descriptors to a single cached listing.
//!
//! A descriptor carries a heterogeneous identifier set (symbol, alternative security ids,
//! currency, exchange, parties); the cache scores every listing with a best-match algorithm
//! and yields exactly one [`View`](cache::View), or a [`LookupError`](lookup::LookupError)
//! describing why resolution failed.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// [`Instrument`](instrument::Instrument) and its attribute types.
pub mod instrument;

/// Client-supplied [`InstrumentDescriptor`](descriptor::InstrumentDescriptor) locator.
pub mod descriptor;

/// Id-ordered instrument [`Cache`](cache::Cache) with descriptor resolution.
pub mod cache;

/// Best-match lookup internals: match-rate algebra, attribute matchers, strategies.
pub mod lookup;

/// Abstract instrument producers used to populate the cache at startup.
pub mod sources;

/// [`Side`] of an order or trade - Buy or Sell.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub enum Side {
    #[serde(alias = "buy", alias = "BUY", alias = "b")]
    Buy,
    #[serde(alias = "sell", alias = "SELL", alias = "s")]
    Sell,
}

impl Side {
    /// The opposing book side this `Side` trades against.
    pub fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Side::Buy => "buy",
                Side::Sell => "sell",
            }
        )
    }
}

pub mod test_utils {
    use crate::instrument::{Instrument, SecurityType, Symbol};

    pub fn listing(symbol: &str) -> Instrument {
        Instrument {
            symbol: Some(Symbol::new(symbol)),
            security_type: Some(SecurityType::CommonStock),
            ..Default::default()
        }
    }
}
