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

//! # Bourse
//! Bourse emulates a single trading venue so external trading clients can exercise a
//! realistic order-book lifecycle over standard messaging protocols.
//!
//! The crate wires a per-instrument trading-engine fleet to external gateways through
//! typed middleware channels:
//! * **[`middleware`]**: named request/reply/event channels with at-most-one bound
//!   receiver each.
//! * **[`engine`]**: one command-serialising trading engine per cached instrument,
//!   owning an order book, market-data publisher and client-notification cache.
//! * **[`execution`]**: resolves instrument descriptors and routes each external request
//!   to the engine of the resolved listing, or answers with a typed reject.
//! * **[`events`]**: timezone-aware clock, trading-phase schedule and the periodic event
//!   loop driving `Tick` and `PhaseTransition` broadcasts.
//! * **[`persistence`]**: store/recover of the fleet's market state through a pluggable
//!   serializer.
//! * **[`system`]**: the [`TradingSystem`](system::TradingSystem) facade constructing and
//!   wiring all of the above.

/// Venue configuration consumed by the trading system.
pub mod config;

/// Per-instrument trading engine: command queue, order book, market data.
pub mod engine;

/// Resolves requests to engines and emits typed rejects.
pub mod execution;

/// Trading-engine repository keyed by internal instrument id.
pub mod fleet;

/// Initialise Bourse logging.
pub mod logging;

/// Process-wide middleware channels connecting gateways and the trading system.
pub mod middleware;

/// Internal event system: clock, phase schedule, event loop, halt/resume.
pub mod events;

/// Market-state persistence controller and serializers.
pub mod persistence;

/// Top-level trading-system facade.
pub mod system;

pub type FnvIndexMap<K, V> = indexmap::IndexMap<K, V, fnv::FnvBuildHasher>;
