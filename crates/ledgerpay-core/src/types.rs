//! Domain enums shared across the platform
//!
//! All of these are stored as text columns; the database layer converts at
//! the row boundary with `TryFrom<String>`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A string did not name a known enum variant.
#[derive(Debug, Clone, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError::new($kind, other)),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseEnumError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }
    };
}

// ============================================================================
// Order status
// ============================================================================

/// Lifecycle state of an order.
///
/// The only legal transitions are `pending → success`, `pending → failed`,
/// and `success → refund`; anything else is a programming error and is
/// rejected by [`OrderStatus::transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Success,
    Refund,
    Failed,
}

text_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Success => "success",
    Refund => "refund",
    Failed => "failed",
});

/// Attempted transition outside the allowed edge set.
#[derive(Debug, Clone, Copy, Error)]
#[error("illegal order status transition: {from} -> {to}")]
pub struct IllegalTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl OrderStatus {
    /// Whether `self → to` is an allowed edge.
    pub fn can_transition(self, to: OrderStatus) -> bool {
        matches!(
            (self, to),
            (OrderStatus::Pending, OrderStatus::Success)
                | (OrderStatus::Pending, OrderStatus::Failed)
                | (OrderStatus::Success, OrderStatus::Refund)
        )
    }

    /// Validate an edge, returning the target state.
    pub fn transition(self, to: OrderStatus) -> Result<OrderStatus, IllegalTransition> {
        if self.can_transition(to) {
            Ok(to)
        } else {
            Err(IllegalTransition { from: self, to })
        }
    }
}

// ============================================================================
// Order type
// ============================================================================

/// Kind of money movement behind an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Merchant-initiated payment fulfilled at checkout
    Payment,
    /// Merchant payment through the online (hosted) flow
    Online,
    /// Direct user-to-user transfer
    Transfer,
}

text_enum!(OrderType, "order type", {
    Payment => "payment",
    Online => "online",
    Transfer => "transfer",
});

impl OrderType {
    /// Types that count toward the payer's daily spending limit.
    pub const DAILY_LIMIT_TYPES: [OrderType; 2] = [OrderType::Payment, OrderType::Online];

    /// Types included in leaderboard aggregation.
    pub const LEADERBOARD_TYPES: [OrderType; 3] =
        [OrderType::Payment, OrderType::Online, OrderType::Transfer];
}

// ============================================================================
// Leaderboard periods, metrics, trends
// ============================================================================

/// Leaderboard time window kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    Day,
    Week,
    Month,
    AllTime,
}

text_enum!(PeriodType, "period type", {
    Day => "day",
    Week => "week",
    Month => "month",
    AllTime => "all_time",
});

impl PeriodType {
    pub const ALL: [PeriodType; 4] = [
        PeriodType::Day,
        PeriodType::Week,
        PeriodType::Month,
        PeriodType::AllTime,
    ];
}

/// Leaderboard ranking metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    ReceiveAmount,
    PaymentAmount,
    TransferInAmount,
    TransferOutAmount,
    VolumeAmount,
    NetAmount,
}

text_enum!(MetricType, "metric type", {
    ReceiveAmount => "receive_amount",
    PaymentAmount => "payment_amount",
    TransferInAmount => "transfer_in_amount",
    TransferOutAmount => "transfer_out_amount",
    VolumeAmount => "volume_amount",
    NetAmount => "net_amount",
});

impl MetricType {
    pub const ALL: [MetricType; 6] = [
        MetricType::ReceiveAmount,
        MetricType::PaymentAmount,
        MetricType::TransferInAmount,
        MetricType::TransferOutAmount,
        MetricType::VolumeAmount,
        MetricType::NetAmount,
    ];

    /// Human-readable label for the metadata endpoint.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ReceiveAmount => "Total received",
            Self::PaymentAmount => "Total paid",
            Self::TransferInAmount => "Transfers in",
            Self::TransferOutAmount => "Transfers out",
            Self::VolumeAmount => "Trading volume",
            Self::NetAmount => "Net income",
        }
    }

    /// SQL aggregate expression for the realtime leaderboard query.
    ///
    /// The expression assumes a `users`/`orders` join where the user may be
    /// payer or payee; this is the single dispatch site for metric SQL.
    pub fn order_expr(&self) -> &'static str {
        match self {
            Self::ReceiveAmount => {
                "COALESCE(SUM(CASE WHEN orders.payee_user_id = users.id THEN orders.amount ELSE 0 END), 0)"
            }
            Self::PaymentAmount => {
                "COALESCE(SUM(CASE WHEN orders.payer_user_id = users.id THEN orders.amount ELSE 0 END), 0)"
            }
            Self::TransferInAmount => {
                "COALESCE(SUM(CASE WHEN orders.payee_user_id = users.id AND orders.type = 'transfer' THEN orders.amount ELSE 0 END), 0)"
            }
            Self::TransferOutAmount => {
                "COALESCE(SUM(CASE WHEN orders.payer_user_id = users.id AND orders.type = 'transfer' THEN orders.amount ELSE 0 END), 0)"
            }
            Self::VolumeAmount => "COALESCE(SUM(orders.amount), 0)",
            Self::NetAmount => {
                "COALESCE(SUM(CASE WHEN orders.payee_user_id = users.id THEN orders.amount ELSE 0 END), 0) - COALESCE(SUM(CASE WHEN orders.payer_user_id = users.id THEN orders.amount ELSE 0 END), 0)"
            }
        }
    }
}

/// Rank movement relative to the previous snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendType {
    Up,
    Down,
    Same,
}

text_enum!(TrendType, "trend type", {
    Up => "up",
    Down => "down",
    Same => "same",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert!(OrderStatus::Pending.can_transition(OrderStatus::Success));
        assert!(OrderStatus::Pending.can_transition(OrderStatus::Failed));
        assert!(OrderStatus::Success.can_transition(OrderStatus::Refund));

        assert!(!OrderStatus::Pending.can_transition(OrderStatus::Refund));
        assert!(!OrderStatus::Success.can_transition(OrderStatus::Pending));
        assert!(!OrderStatus::Refund.can_transition(OrderStatus::Success));
        assert!(!OrderStatus::Failed.can_transition(OrderStatus::Success));

        assert!(OrderStatus::Pending.transition(OrderStatus::Success).is_ok());
        assert!(OrderStatus::Refund.transition(OrderStatus::Refund).is_err());
    }

    #[test]
    fn test_text_round_trip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Success,
            OrderStatus::Refund,
            OrderStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        for metric in MetricType::ALL {
            assert_eq!(metric.as_str().parse::<MetricType>().unwrap(), metric);
        }
        assert_eq!("all_time".parse::<PeriodType>().unwrap(), PeriodType::AllTime);
        assert!("yearly".parse::<PeriodType>().is_err());
    }

    #[test]
    fn test_metric_expr_dispatch() {
        // every metric resolves to a COALESCE'd aggregate over orders
        for metric in MetricType::ALL {
            assert!(metric.order_expr().starts_with("COALESCE(SUM("));
        }
        assert!(MetricType::NetAmount.order_expr().contains('-'));
    }
}
