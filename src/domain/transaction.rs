use crate::error::{Result, ServiceError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A row of the `transactions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub order_id: i64,
    pub payment_status: String,
    pub payment_gateway: String,
    pub amount: Decimal,
    pub payment_date: DateTime<Utc>,
    pub transfer_id: String,
}

impl PaymentTransaction {
    pub fn validate(&self) -> Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Amount must be positive".to_string(),
            ));
        }
        if self.payment_status.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "payment_status is required".to_string(),
            ));
        }
        if self.payment_gateway.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "payment_gateway is required".to_string(),
            ));
        }
        Ok(())
    }
}
