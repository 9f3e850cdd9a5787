use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{Collection, Record};
use crate::workflows::{MortgageApplicationId, PurchaseId};

/// Loan request details supplied by the buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MortgageRequest {
    pub bank: String,
    pub amount: u64,
    pub term_years: u8,
}

/// A submitted loan application. Its presence satisfies the mortgage stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MortgageApplication {
    pub id: MortgageApplicationId,
    pub purchase_id: PurchaseId,
    pub bank: String,
    pub amount: u64,
    pub term_years: u8,
    pub submitted_date: DateTime<Utc>,
}

impl MortgageApplication {
    pub(crate) fn submit(
        purchase_id: PurchaseId,
        request: MortgageRequest,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MortgageApplicationId::generate(),
            purchase_id,
            bank: request.bank,
            amount: request.amount,
            term_years: request.term_years,
            submitted_date: now,
        }
    }
}

impl Record for MortgageApplication {
    const COLLECTION: Collection = Collection::MortgageApplications;

    fn record_id(&self) -> &str {
        self.id.as_str()
    }
}
