//! Payments against orders.

use async_trait::async_trait;
use chrono::Utc;
use domain::{Entity, ledger};
use model::{NewPayment, Payment, PaymentReceipt};
use repository::Store;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{RestaurantServiceImpl, ServiceError, require_text, required};

#[async_trait]
pub trait BillingService: Send + Sync {
    /// Records a payment and re-evaluates settlement of its order.
    ///
    /// The order row stays locked from reading the paid sum until commit, so
    /// of two payments that each complete the total only one reports
    /// `settled_now`. Overpayment is accepted. The order's payment method is
    /// set by the payment that settles it.
    async fn add_payment(&self, input: NewPayment) -> Result<PaymentReceipt, ServiceError>;
    async fn get_payment(&self, id: Uuid) -> Result<Payment, ServiceError>;
    async fn list_payments(&self, order_id: Option<Uuid>) -> Result<Vec<Payment>, ServiceError>;
}

#[async_trait]
impl<S: Store> BillingService for RestaurantServiceImpl<S> {
    #[instrument(skip(self, input), fields(order_id = %input.order_id, amount = %input.amount))]
    async fn add_payment(&self, input: NewPayment) -> Result<PaymentReceipt, ServiceError> {
        require_text("method", &input.method)?;
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;

        let mut order = required(
            uow.get_order_for_update(input.order_id).await?,
            Entity::Order,
            input.order_id,
        )?;
        let paid_before = uow.sum_payments(order.id).await?;
        let settlement = ledger::apply_payment(&order, paid_before, input.amount)?;

        let payment = Payment {
            id: Uuid::new_v4(),
            order_id: order.id,
            amount: input.amount,
            method: input.method,
            reference: input.reference,
            created_at: Utc::now(),
        };
        uow.insert_payment(&payment).await?;

        order.is_paid = settlement.settled;
        if settlement.newly_settled {
            order.payment_method = Some(payment.method.clone());
        }
        order.updated_at = Utc::now();
        uow.update_order(&order).await?;
        uow.commit().await?;

        if settlement.newly_settled {
            info!(payment_id = %payment.id, paid = %settlement.paid, "Order settled");
        } else {
            info!(payment_id = %payment.id, paid = %settlement.paid, "Payment recorded");
        }
        Ok(PaymentReceipt {
            payment,
            order,
            amount_paid: settlement.paid,
            settled_now: settlement.newly_settled,
        })
    }

    async fn get_payment(&self, id: Uuid) -> Result<Payment, ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;
        required(uow.get_payment(id).await?, Entity::Payment, id)
    }

    async fn list_payments(&self, order_id: Option<Uuid>) -> Result<Vec<Payment>, ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;
        Ok(uow.list_payments(order_id).await?)
    }
}
