use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::domain::{
    Purchase, PurchaseStatus, Stage, StageKind, StageRequirement, StageStatus, TOTAL_STEPS,
};
use crate::workflows::bookings::Booking;
use crate::workflows::documents::{Document, DocumentKind, DocumentOwner};
use crate::workflows::payments::{Payment, PaymentMethod};
use crate::workflows::PurchaseId;

/// A document the buyer must supply for the given financing methods.
#[derive(Debug, Clone)]
pub struct DocumentTemplate {
    pub kind: DocumentKind,
    pub title: &'static str,
    pub methods: &'static [PaymentMethod],
    pub deadline_days: i64,
}

impl DocumentTemplate {
    pub fn applies_to(&self, method: PaymentMethod) -> bool {
        self.methods.contains(&method)
    }
}

#[derive(Debug, Clone)]
pub struct PurchaseBlueprint {
    stages: Vec<StageKind>,
    documents: Vec<DocumentTemplate>,
}

/// Everything a purchase instance is built from besides the booking itself.
#[derive(Debug)]
pub(crate) struct PurchaseSeed<'a> {
    pub id: PurchaseId,
    pub method: PaymentMethod,
    pub started: DateTime<Utc>,
    pub manager_name: &'a str,
    pub estimated_completion: NaiveDate,
    pub documents: &'a [Document],
    pub payments: &'a [Payment],
}

impl PurchaseBlueprint {
    pub fn standard() -> Self {
        Self {
            stages: StageKind::ordered().to_vec(),
            documents: standard_document_templates(),
        }
    }

    pub fn stages(&self) -> &[StageKind] {
        &self.stages
    }

    pub fn document_templates(&self) -> &[DocumentTemplate] {
        &self.documents
    }

    pub fn documents_for(&self, method: PaymentMethod) -> Vec<&DocumentTemplate> {
        self.documents
            .iter()
            .filter(|template| template.applies_to(method))
            .collect()
    }

    pub(crate) fn required_documents(
        &self,
        purchase_id: &PurchaseId,
        method: PaymentMethod,
        today: NaiveDate,
    ) -> Vec<Document> {
        self.documents_for(method)
            .into_iter()
            .map(|template| {
                Document::required(
                    DocumentOwner::Purchase(purchase_id.clone()),
                    template.kind,
                    template.title,
                    Some(today + Duration::days(template.deadline_days)),
                )
            })
            .collect()
    }

    /// Confirmation is already done by the act of starting, so the second stage opens.
    pub(crate) fn instantiate(&self, booking: &Booking, seed: PurchaseSeed<'_>) -> Purchase {
        let mut stages: Vec<Stage> = self
            .stages
            .iter()
            .zip(1..=TOTAL_STEPS)
            .map(|(&kind, id)| Stage::new(id, kind, requirements_for(kind, &seed)))
            .collect();

        if let Some(first) = stages.first_mut() {
            first.status = StageStatus::Completed;
            first.completed_date = Some(seed.started);
        }
        let next_action = match stages.get_mut(1) {
            Some(second) => {
                second.status = StageStatus::InProgress;
                second.kind.next_action()
            }
            None => StageKind::Confirmation.next_action(),
        };

        Purchase {
            id: seed.id,
            booking_id: booking.id.clone(),
            property_id: booking.property_id.clone(),
            apartment_id: booking.apartment_id.clone(),
            title: booking.title.clone(),
            address: booking.address.clone(),
            price: booking.price,
            apartment: booking.apartment.clone(),
            status: PurchaseStatus::InProgress,
            current_step: 1,
            total_steps: TOTAL_STEPS,
            payment_method: seed.method,
            start_date: seed.started,
            completion_date: None,
            manager_name: seed.manager_name.to_string(),
            estimated_completion: seed.estimated_completion,
            next_action: next_action.to_string(),
            stages,
        }
    }
}

fn requirements_for(kind: StageKind, seed: &PurchaseSeed<'_>) -> Vec<StageRequirement> {
    match kind {
        StageKind::Documents => seed
            .documents
            .iter()
            .map(|document| StageRequirement::Document(document.id.clone()))
            .collect(),
        StageKind::Payments => seed
            .payments
            .iter()
            .map(|payment| StageRequirement::Payment(payment.id.clone()))
            .collect(),
        _ => Vec::new(),
    }
}

const ALL_METHODS: &[PaymentMethod] = &[
    PaymentMethod::Cash,
    PaymentMethod::Installment,
    PaymentMethod::Mortgage,
];
const FINANCED: &[PaymentMethod] = &[PaymentMethod::Installment, PaymentMethod::Mortgage];
const MORTGAGE_ONLY: &[PaymentMethod] = &[PaymentMethod::Mortgage];

fn standard_document_templates() -> Vec<DocumentTemplate> {
    vec![
        DocumentTemplate {
            kind: DocumentKind::Passport,
            title: "Паспорт покупателя",
            methods: ALL_METHODS,
            deadline_days: 14,
        },
        DocumentTemplate {
            kind: DocumentKind::Income,
            title: "Справка о доходах (2-НДФЛ)",
            methods: FINANCED,
            deadline_days: 14,
        },
        DocumentTemplate {
            kind: DocumentKind::Mortgage,
            title: "Одобрение ипотеки банком",
            methods: MORTGAGE_ONLY,
            deadline_days: 14,
        },
        DocumentTemplate {
            kind: DocumentKind::Insurance,
            title: "Страховой полис",
            methods: MORTGAGE_ONLY,
            deadline_days: 14,
        },
    ]
}
