//! Development implementations of the outbound ports.
//!
//! `DevPaymentGateway` simulates a refund processor with an interface
//! compatible with services like Stripe and `PayPal`. `LogNotifier` writes
//! notices to the log instead of a delivery channel. In production both
//! would be replaced with real integrations.

use stagepass_core::{
    GatewayRefundStatus, GatewayResult, Money, Notice, Notifier, NotifyError, PaymentGateway,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Mock refund processor (always succeeds, for development).
#[derive(Clone, Debug)]
pub struct DevPaymentGateway;

impl DevPaymentGateway {
    /// Creates a new mock gateway.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Creates an Arc-wrapped instance for sharing.
    #[must_use]
    pub fn shared() -> Arc<dyn PaymentGateway> {
        Arc::new(Self::new())
    }
}

impl Default for DevPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentGateway for DevPaymentGateway {
    fn issue_refund(
        &self,
        payment_reference: &str,
        amount: Money,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<String>> + Send>> {
        let payment_reference = payment_reference.to_string();
        Box::pin(async move {
            // Simulate network delay
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

            let refund_reference = format!("dev_refund_{}", uuid::Uuid::new_v4());

            tracing::info!(
                payment_reference = %payment_reference,
                amount = amount.cents(),
                refund_reference = %refund_reference,
                "Dev refund processed successfully"
            );

            Ok(refund_reference)
        })
    }

    fn refund_status(
        &self,
        _refund_reference: &str,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<GatewayRefundStatus>> + Send>> {
        Box::pin(async move { Ok(GatewayRefundStatus::Completed) })
    }
}

/// Notifier that logs notices instead of delivering them.
#[derive(Clone, Debug)]
pub struct LogNotifier;

impl LogNotifier {
    /// Creates a new logging notifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Creates an Arc-wrapped instance for sharing.
    #[must_use]
    pub fn shared() -> Arc<dyn Notifier> {
        Arc::new(Self::new())
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for LogNotifier {
    fn notify(
        &self,
        notice: Notice,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + '_>> {
        Box::pin(async move {
            match notice {
                Notice::BookingConfirmed {
                    user_id,
                    event_name,
                    booking_id,
                    ticket_id,
                    total_amount,
                } => tracing::info!(
                    user_id = %user_id,
                    event = %event_name,
                    booking_id = %booking_id,
                    ticket_id = %ticket_id,
                    total = total_amount.cents(),
                    "notice: booking confirmed"
                ),
                Notice::BookingCancelled {
                    user_id,
                    event_name,
                    booking_id,
                    refund_amount,
                    refund_status,
                } => tracing::info!(
                    user_id = %user_id,
                    event = %event_name,
                    booking_id = %booking_id,
                    refund = refund_amount.cents(),
                    status = %refund_status,
                    "notice: booking cancelled"
                ),
            }
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dev_refunds_resolve_with_a_reference() {
        let gateway = DevPaymentGateway::new();
        let reference = gateway
            .issue_refund("pay_123", Money::from_cents(500))
            .await
            .unwrap();
        assert!(reference.starts_with("dev_refund_"));

        let status = gateway.refund_status(&reference).await.unwrap();
        assert_eq!(status, GatewayRefundStatus::Completed);
    }
}
