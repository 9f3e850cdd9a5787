use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Violation;
use crate::store::{Collection, Record};
use crate::workflows::catalog::ApartmentRef;
use crate::workflows::payments::PaymentMethod;
use crate::workflows::{BookingId, DocumentId, PaymentId, PurchaseId};

/// Number of stages every purchase walks through.
pub const TOTAL_STEPS: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    InProgress,
    Completed,
    Cancelled,
}

impl PurchaseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::InProgress => "В процессе",
            Self::Completed => "Завершена",
            Self::Cancelled => "Отменена",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Confirmation,
    Documents,
    Mortgage,
    PreliminaryContract,
    Payments,
    FinalContract,
    KeyHandover,
}

impl StageKind {
    pub const fn ordered() -> [Self; TOTAL_STEPS as usize] {
        [
            Self::Confirmation,
            Self::Documents,
            Self::Mortgage,
            Self::PreliminaryContract,
            Self::Payments,
            Self::FinalContract,
            Self::KeyHandover,
        ]
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::Confirmation => "Подтверждение бронирования",
            Self::Documents => "Сбор документов",
            Self::Mortgage => "Ипотека",
            Self::PreliminaryContract => "Предварительный договор",
            Self::Payments => "Оплата",
            Self::FinalContract => "Основной договор",
            Self::KeyHandover => "Передача ключей",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Confirmation => "Бронирование подтверждено, квартира закреплена за вами",
            Self::Documents => "Загрузите документы, необходимые для сделки",
            Self::Mortgage => "Подайте заявку на ипотеку и дождитесь решения банка",
            Self::PreliminaryContract => "Подпишите предварительный договор купли-продажи",
            Self::Payments => "Внесите платежи по графику",
            Self::FinalContract => "Подпишите основной договор и зарегистрируйте сделку",
            Self::KeyHandover => "Примите квартиру и получите ключи",
        }
    }

    /// What the buyer should do while this stage is current.
    pub const fn next_action(self) -> &'static str {
        match self {
            Self::Confirmation => "Подтвердите бронирование",
            Self::Documents => "Загрузите недостающие документы",
            Self::Mortgage => "Подайте заявку на ипотеку",
            Self::PreliminaryContract => "Подпишите предварительный договор",
            Self::Payments => "Оплатите платежи по графику",
            Self::FinalContract => "Подпишите основной договор",
            Self::KeyHandover => "Согласуйте дату передачи ключей",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    InProgress,
    Completed,
    Blocked,
}

impl StageStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Ожидает",
            Self::InProgress => "В работе",
            Self::Completed => "Завершён",
            Self::Blocked => "Заблокирован",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum StageRequirement {
    Document(DocumentId),
    Payment(PaymentId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// 1-based position in the purchase.
    pub id: u8,
    pub kind: StageKind,
    pub title: String,
    pub status: StageStatus,
    #[serde(default)]
    pub completed_date: Option<DateTime<Utc>>,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<StageRequirement>,
}

impl Stage {
    pub(crate) fn new(id: u8, kind: StageKind, requirements: Vec<StageRequirement>) -> Self {
        Self {
            id,
            kind,
            title: kind.title().to_string(),
            status: StageStatus::Pending,
            completed_date: None,
            description: kind.description().to_string(),
            requirements,
        }
    }
}

/// Caller-supplied acknowledgements and signatures. The engine never infers them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateFlags {
    pub acknowledged: bool,
    pub mortgage_application_submitted: bool,
    pub preliminary_contract_signed: bool,
    pub final_contract_signed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub booking_id: BookingId,
    pub property_id: String,
    pub apartment_id: String,
    pub title: String,
    pub address: String,
    pub price: u64,
    pub apartment: ApartmentRef,
    pub status: PurchaseStatus,
    pub current_step: u8,
    pub total_steps: u8,
    pub payment_method: PaymentMethod,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub completion_date: Option<DateTime<Utc>>,
    pub manager_name: String,
    pub estimated_completion: NaiveDate,
    pub next_action: String,
    pub stages: Vec<Stage>,
}

const COMPLETED_ACTION: &str = "Покупка завершена, поздравляем с новосельем";
const CANCELLED_ACTION: &str = "Покупка отменена";

impl Purchase {
    pub fn current_stage(&self) -> Option<&Stage> {
        self.stages
            .iter()
            .find(|stage| stage.status == StageStatus::InProgress)
    }

    pub fn completed_stages(&self) -> usize {
        self.stages
            .iter()
            .filter(|stage| stage.status == StageStatus::Completed)
            .count()
    }

    pub fn progress_percent(&self) -> u8 {
        let total = usize::from(self.total_steps.max(1));
        (self.completed_stages() * 100 / total).min(100) as u8
    }

    pub fn stage(&self, kind: StageKind) -> Option<&Stage> {
        self.stages.iter().find(|stage| stage.kind == kind)
    }

    pub(crate) fn ensure_open(&self) -> Result<(), Violation> {
        if self.status.is_terminal() {
            return Err(Violation::PurchaseClosed {
                id: self.id.to_string(),
                status: self.status,
            });
        }
        Ok(())
    }

    /// Complete the in-progress stage and open the next one, or finish the purchase when the
    /// last stage closes. Returns the kind of the completed stage.
    pub(crate) fn complete_current(&mut self, now: DateTime<Utc>) -> Option<StageKind> {
        let index = self
            .stages
            .iter()
            .position(|stage| stage.status == StageStatus::InProgress)?;

        let completed = &mut self.stages[index];
        completed.status = StageStatus::Completed;
        completed.completed_date = Some(now);
        let kind = completed.kind;

        let reached = (completed.id.saturating_add(1)).min(self.total_steps);
        self.current_step = self.current_step.max(reached);

        match self.stages.get_mut(index + 1) {
            Some(next) => {
                next.status = StageStatus::InProgress;
                self.next_action = next.kind.next_action().to_string();
            }
            None => {
                self.status = PurchaseStatus::Completed;
                self.completion_date = Some(now);
                self.next_action = COMPLETED_ACTION.to_string();
            }
        }
        Some(kind)
    }

    pub(crate) fn cancel(&mut self) -> Result<(), Violation> {
        self.ensure_open()?;
        for stage in &mut self.stages {
            if stage.status != StageStatus::Completed {
                stage.status = StageStatus::Blocked;
            }
        }
        self.status = PurchaseStatus::Cancelled;
        self.next_action = CANCELLED_ACTION.to_string();
        Ok(())
    }
}

impl Record for Purchase {
    const COLLECTION: Collection = Collection::Purchases;

    fn record_id(&self) -> &str {
        self.id.as_str()
    }
}
