//! Square-Off Port (Driven Port)
//!
//! Closes every leg of a position once its stop triggers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::{ClientOrderId, Timestamp};
use crate::domain::trailing_stop::{JobRecord, SquareOffOrder};

/// Broker session a square-off is executed under.
///
/// Passed into each tick; never held globally.
#[derive(Clone, PartialEq, Eq)]
pub struct BrokerSession {
    /// Broker account.
    pub account_id: String,
    /// Session token, if the broker needs one per request.
    pub access_token: Option<String>,
}

impl BrokerSession {
    /// Session for an account without a token.
    #[must_use]
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            access_token: None,
        }
    }
}

impl fmt::Debug for BrokerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerSession")
            .field("account_id", &self.account_id)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Acknowledgement of submitted close orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SquareOffReceipt {
    /// One client order ID per submitted order.
    pub client_order_ids: Vec<ClientOrderId>,
    /// Submission time.
    pub submitted_at: Timestamp,
}

/// Square-off error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SquareOffError {
    /// Broker rejected one of the orders.
    #[error("Square-off rejected for {symbol}: {reason}")]
    Rejected {
        /// Leg symbol.
        symbol: String,
        /// Rejection reason.
        reason: String,
    },

    /// Broker unreachable.
    #[error("Broker unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// Nothing to close.
    #[error("No square-off orders for job {job_id}")]
    NoOrders {
        /// The job ID.
        job_id: String,
    },
}

/// Port for closing a position.
#[async_trait]
pub trait SquareOffPort: Send + Sync {
    /// Submit `orders` for `job` under `session`.
    async fn square_off(
        &self,
        orders: &[SquareOffOrder],
        session: &BrokerSession,
        job: &JobRecord,
    ) -> Result<SquareOffReceipt, SquareOffError>;
}
