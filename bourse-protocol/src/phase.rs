use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Market-session phase a venue listing is trading in.
///
/// Scheduled phases follow the venue's trading-phase schedule; [`TradingPhase::Halted`]
/// may be entered from any other phase by an admin halt and must be explicitly resumed.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub enum TradingPhase {
    Open,
    Closed,
    OpeningAuction,
    ClosingAuction,
    IntradayAuction,
    Halted,
}

impl TradingPhase {
    pub fn is_auction(&self) -> bool {
        matches!(
            self,
            Self::OpeningAuction | Self::ClosingAuction | Self::IntradayAuction
        )
    }
}
