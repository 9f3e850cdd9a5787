use std::sync::Arc;

use chrono::{Days, NaiveDate};
use serde::Serialize;
use tracing::{debug, info};

use super::blueprint::{PurchaseBlueprint, PurchaseSeed};
use super::domain::{GateFlags, Purchase, StageKind};
use super::mortgage::{MortgageApplication, MortgageRequest};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{DealError, Entity, Violation};
use crate::store::{RecordStore, UnitOfWork};
use crate::workflows::bookings::{Booking, BookingRegistry};
use crate::workflows::documents::DocumentGate;
use crate::workflows::payments::{PaymentMethod, PaymentScheduler, ScheduleOwner};
use crate::workflows::{BookingId, PurchaseId};

/// The stage that stopped [`PurchaseEngine::progress`], with the gate's reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockedStage {
    pub stage: StageKind,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Progress {
    pub purchase: Purchase,
    pub completed: Vec<StageKind>,
    pub blocked: Option<BlockedStage>,
}

/// Drives purchases through their stages, consulting documents and payments at each gate.
#[derive(Debug, Clone)]
pub struct PurchaseEngine {
    store: Arc<RecordStore>,
    clock: Arc<dyn Clock>,
    blueprint: PurchaseBlueprint,
    config: EngineConfig,
}

impl PurchaseEngine {
    pub fn new(store: Arc<RecordStore>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        Self {
            store,
            clock,
            blueprint: PurchaseBlueprint::standard(),
            config,
        }
    }

    pub fn blueprint(&self) -> &PurchaseBlueprint {
        &self.blueprint
    }

    /// Start a purchase from an active booking.
    ///
    /// The purchase, its document checklist, its payment schedule and the booking conversion
    /// are committed together; any failure leaves the store untouched. `initial` defaults to
    /// the configured share of the price and is ignored for cash deals.
    pub fn create_from_booking(
        &self,
        booking_id: &BookingId,
        method: PaymentMethod,
        initial: Option<u64>,
    ) -> Result<Purchase, DealError> {
        let now = self.clock.now();
        let today = now.date_naive();
        let estimated_completion = self.estimated_completion(today)?;

        let (purchase, outcome) = self.store.transaction(|uow| {
            let booking: Booking = BookingRegistry::convert_to_purchase(uow, booking_id)?;
            let purchase_id = PurchaseId::generate();

            let documents = self
                .blueprint
                .required_documents(&purchase_id, method, today);
            for document in &documents {
                uow.add(document)?;
            }

            let initial = match method {
                PaymentMethod::Cash => 0,
                PaymentMethod::Installment | PaymentMethod::Mortgage => {
                    initial.unwrap_or_else(|| self.default_initial(booking.price))
                }
            };
            let payments = PaymentScheduler::schedule_in(
                uow,
                &ScheduleOwner::Purchase(purchase_id.clone()),
                &booking.property_id,
                booking.price,
                initial,
                method,
                today,
            )?;

            let purchase = self.blueprint.instantiate(
                &booking,
                PurchaseSeed {
                    id: purchase_id,
                    method,
                    started: now,
                    manager_name: &self.config.manager_name,
                    estimated_completion,
                    documents: &documents,
                    payments: &payments,
                },
            );
            uow.add(&purchase)?;
            Ok::<_, DealError>(purchase)
        })?;

        info!(
            purchase_id = %purchase.id,
            booking_id = %purchase.booking_id,
            method = purchase.payment_method.label(),
            ?outcome,
            "purchase started; booking converted"
        );
        Ok(purchase)
    }

    /// Complete exactly the current stage, or explain which gate refused.
    pub fn advance(&self, id: &PurchaseId, flags: GateFlags) -> Result<Purchase, DealError> {
        let now = self.clock.now();
        let (purchase, _) = self.store.transaction(|uow| {
            let mut purchase = Self::open_purchase(uow, id)?;
            let stage = Self::current_kind(&purchase)?;
            Self::check_gate(uow, &purchase, stage, flags)
                .map_err(|reason| DealError::PreconditionNotMet { stage, reason })?;
            purchase.complete_current(now);
            uow.put(&purchase)?;
            Ok::<_, DealError>(purchase)
        })?;
        self.log_progress(&purchase);
        Ok(purchase)
    }

    /// Complete as many consecutive stages as the gates allow.
    pub fn progress(&self, id: &PurchaseId, flags: GateFlags) -> Result<Progress, DealError> {
        let now = self.clock.now();
        let (progress, _) = self.store.transaction(|uow| {
            let mut purchase = Self::open_purchase(uow, id)?;
            let mut completed = Vec::new();
            let mut blocked = None;

            while let Some(stage) = purchase.current_stage().map(|stage| stage.kind) {
                if let Err(reason) = Self::check_gate(uow, &purchase, stage, flags) {
                    blocked = Some(BlockedStage { stage, reason });
                    break;
                }
                purchase.complete_current(now);
                completed.push(stage);
            }

            if !completed.is_empty() {
                uow.put(&purchase)?;
            }
            Ok::<_, DealError>(Progress {
                purchase,
                completed,
                blocked,
            })
        })?;

        if let Some(blocked) = &progress.blocked {
            debug!(
                purchase_id = %progress.purchase.id,
                stage = blocked.stage.title(),
                reason = %blocked.reason,
                "purchase waiting on gate"
            );
        }
        if !progress.completed.is_empty() {
            self.log_progress(&progress.purchase);
        }
        Ok(progress)
    }

    /// Stop the purchase: open stages are blocked and pending payments cancelled.
    pub fn cancel_purchase(&self, id: &PurchaseId) -> Result<Purchase, DealError> {
        let (purchase, _) = self.store.transaction(|uow| {
            let mut purchase = uow
                .find::<Purchase>(id.as_str())
                .ok_or_else(|| DealError::not_found(Entity::Purchase, id.as_str()))?;
            purchase.cancel()?;
            let cancelled = PaymentScheduler::cancel_pending_in(uow, &ScheduleOwner::Purchase(id.clone()))?;
            uow.put(&purchase)?;
            debug!(purchase_id = %id, cancelled, "pending payments cancelled");
            Ok::<_, DealError>(purchase)
        })?;
        info!(purchase_id = %purchase.id, "purchase cancelled");
        Ok(purchase)
    }

    pub fn submit_mortgage_application(
        &self,
        id: &PurchaseId,
        request: MortgageRequest,
    ) -> Result<MortgageApplication, DealError> {
        let now = self.clock.now();
        let (application, _) = self.store.transaction(|uow| {
            let purchase = Self::open_purchase(uow, id)?;
            if purchase.payment_method != PaymentMethod::Mortgage {
                return Err(DealError::from(Violation::NotMortgageFinanced {
                    id: id.to_string(),
                }));
            }
            let application = MortgageApplication::submit(id.clone(), request, now);
            uow.add(&application)?;
            Ok::<_, DealError>(application)
        })?;
        info!(
            purchase_id = %id,
            application_id = %application.id,
            bank = %application.bank,
            "mortgage application submitted"
        );
        Ok(application)
    }

    pub fn get_by_id(&self, id: &PurchaseId) -> Option<Purchase> {
        self.store.find(id.as_str())
    }

    pub fn get_by_booking(&self, booking_id: &BookingId) -> Option<Purchase> {
        self.all()
            .into_iter()
            .find(|purchase| &purchase.booking_id == booking_id)
    }

    pub fn all(&self) -> Vec<Purchase> {
        self.store.all()
    }

    pub fn mortgage_applications(&self, id: &PurchaseId) -> Vec<MortgageApplication> {
        self.store
            .all::<MortgageApplication>()
            .into_iter()
            .filter(|application| &application.purchase_id == id)
            .collect()
    }

    fn default_initial(&self, price: u64) -> u64 {
        price / 100 * u64::from(self.config.initial_payment_percent)
            + price % 100 * u64::from(self.config.initial_payment_percent) / 100
    }

    fn estimated_completion(&self, today: NaiveDate) -> Result<NaiveDate, Violation> {
        let days = self.config.estimated_completion_days;
        u64::try_from(days)
            .ok()
            .and_then(|ahead| today.checked_add_days(Days::new(ahead)))
            .ok_or(Violation::CompletionOutOfRange { days })
    }

    fn open_purchase(uow: &UnitOfWork, id: &PurchaseId) -> Result<Purchase, DealError> {
        let purchase = uow
            .find::<Purchase>(id.as_str())
            .ok_or_else(|| DealError::not_found(Entity::Purchase, id.as_str()))?;
        purchase.ensure_open()?;
        Ok(purchase)
    }

    fn current_kind(purchase: &Purchase) -> Result<StageKind, DealError> {
        purchase.current_stage().map(|stage| stage.kind).ok_or_else(|| {
            Violation::PurchaseClosed {
                id: purchase.id.to_string(),
                status: purchase.status,
            }
            .into()
        })
    }

    /// Gating predicate of `stage`. `Err` carries a reason fit for the buyer.
    fn check_gate(
        uow: &UnitOfWork,
        purchase: &Purchase,
        stage: StageKind,
        flags: GateFlags,
    ) -> Result<(), String> {
        match stage {
            StageKind::Confirmation if !flags.acknowledged => {
                Err("booking has not been acknowledged".to_string())
            }
            StageKind::Documents => {
                let outstanding = DocumentGate::outstanding_in(uow, &purchase.id);
                if outstanding.is_empty() {
                    Ok(())
                } else {
                    let titles: Vec<&str> =
                        outstanding.iter().map(|doc| doc.title.as_str()).collect();
                    Err(format!("documents outstanding: {}", titles.join(", ")))
                }
            }
            StageKind::Mortgage => {
                let arranged = purchase.payment_method != PaymentMethod::Mortgage
                    || flags.mortgage_application_submitted
                    || uow
                        .all::<MortgageApplication>()
                        .iter()
                        .any(|application| application.purchase_id == purchase.id);
                if arranged {
                    Ok(())
                } else {
                    Err("mortgage application has not been submitted".to_string())
                }
            }
            StageKind::PreliminaryContract if !flags.preliminary_contract_signed => {
                Err("preliminary contract is not signed".to_string())
            }
            StageKind::Payments => {
                let unpaid = PaymentScheduler::unpaid_in(uow, &purchase.id);
                if unpaid.is_empty() {
                    Ok(())
                } else {
                    let amount: u64 = unpaid.iter().map(|payment| payment.amount).sum();
                    Err(format!(
                        "{} payments outstanding totalling {}",
                        unpaid.len(),
                        amount
                    ))
                }
            }
            StageKind::FinalContract if !flags.final_contract_signed => {
                Err("final contract is not signed".to_string())
            }
            _ => Ok(()),
        }
    }

    fn log_progress(&self, purchase: &Purchase) {
        match purchase.completion_date {
            Some(completed) => info!(
                purchase_id = %purchase.id,
                %completed,
                "purchase completed"
            ),
            None => info!(
                purchase_id = %purchase.id,
                current_step = purchase.current_step,
                next_action = %purchase.next_action,
                "purchase stage completed"
            ),
        }
    }
}
