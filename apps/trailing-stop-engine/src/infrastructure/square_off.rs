//! Paper square-off collaborator.
//!
//! Records close orders instead of routing them to a broker.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::application::ports::{BrokerSession, SquareOffError, SquareOffPort, SquareOffReceipt};
use crate::domain::shared::{ClientOrderId, JobId, Timestamp};
use crate::domain::trailing_stop::{JobRecord, SquareOffOrder};

/// A recorded close-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedSquareOff {
    /// Job that was closed.
    pub job_id: JobId,
    /// Generation that triggered.
    pub generation: u64,
    /// Broker account.
    pub account_id: String,
    /// Orders with their client order IDs.
    pub orders: Vec<(ClientOrderId, SquareOffOrder)>,
}

/// Square-off collaborator that fills nothing and records everything.
#[derive(Debug, Default)]
pub struct PaperSquareOff {
    submitted: Mutex<Vec<SubmittedSquareOff>>,
    reject_reason: Mutex<Option<String>>,
}

impl PaperSquareOff {
    /// Create a recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every subsequent square-off with `reason`.
    pub fn reject_with(&self, reason: impl Into<String>) {
        *self.reject_reason.lock() = Some(reason.into());
    }

    /// Close-outs recorded so far.
    #[must_use]
    pub fn submitted(&self) -> Vec<SubmittedSquareOff> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl SquareOffPort for PaperSquareOff {
    async fn square_off(
        &self,
        orders: &[SquareOffOrder],
        session: &BrokerSession,
        job: &JobRecord,
    ) -> Result<SquareOffReceipt, SquareOffError> {
        let Some(first) = orders.first() else {
            return Err(SquareOffError::NoOrders {
                job_id: job.id().to_string(),
            });
        };

        if let Some(reason) = self.reject_reason.lock().clone() {
            return Err(SquareOffError::Rejected {
                symbol: first.symbol.to_string(),
                reason,
            });
        }

        let orders: Vec<_> = orders
            .iter()
            .map(|o| (ClientOrderId::generate(), o.clone()))
            .collect();
        let client_order_ids = orders.iter().map(|(id, _)| id.clone()).collect();

        for (id, order) in &orders {
            tracing::info!(
                job_id = %job.id(),
                client_order_id = %id,
                symbol = %order.symbol,
                side = ?order.side,
                quantity = order.quantity,
                "Paper square-off order submitted"
            );
        }

        self.submitted.lock().push(SubmittedSquareOff {
            job_id: job.id().clone(),
            generation: job.generation(),
            account_id: session.account_id.clone(),
            orders,
        });

        Ok(SquareOffReceipt {
            client_order_ids,
            submitted_at: Timestamp::now(),
        })
    }
}
