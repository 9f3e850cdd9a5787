use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Violation;
use crate::store::{Collection, Record};
use crate::workflows::{BookingId, DocumentId, PurchaseId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Passport,
    Income,
    Contract,
    Mortgage,
    Insurance,
    Other,
}

impl DocumentKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Passport => "Паспорт",
            Self::Income => "Справка о доходах",
            Self::Contract => "Договор",
            Self::Mortgage => "Ипотечное одобрение",
            Self::Insurance => "Страховой полис",
            Self::Other => "Прочее",
        }
    }

    pub const fn ordered() -> [Self; 6] {
        [
            Self::Passport,
            Self::Income,
            Self::Contract,
            Self::Mortgage,
            Self::Insurance,
            Self::Other,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Required,
    Uploaded,
    Verified,
    Signed,
    Rejected,
}

impl DocumentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Required => "Требуется",
            Self::Uploaded => "Загружен",
            Self::Verified => "Проверен",
            Self::Signed => "Подписан",
            Self::Rejected => "Отклонён",
        }
    }

    /// Position on the forward path. Rejected sits off the path.
    const fn rank(self) -> Option<u8> {
        match self {
            Self::Required => Some(0),
            Self::Uploaded => Some(1),
            Self::Verified => Some(2),
            Self::Signed => Some(3),
            Self::Rejected => None,
        }
    }

    /// Forward moves, a sideways move to rejected, and a fresh upload after rejection.
    /// Uploaded may be replaced by another upload.
    pub fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Uploaded, Self::Uploaded) | (Self::Rejected, Self::Uploaded) => true,
            (Self::Signed | Self::Rejected, Self::Rejected) => false,
            (_, Self::Rejected) => true,
            (from, to) => match (from.rank(), to.rank()) {
                (Some(from), Some(to)) => to > from,
                _ => false,
            },
        }
    }
}

/// Which record a document belongs to. Legacy documents hang off a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentOwner {
    Purchase(PurchaseId),
    Booking(BookingId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub name: String,
    pub size: u64,
}

/// Optional extras recorded alongside a status change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    #[serde(default)]
    pub file: Option<FileMeta>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub kind: DocumentKind,
    pub owner: DocumentOwner,
    pub status: DocumentStatus,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub file: Option<FileMeta>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub uploaded_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub verified_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub signed_date: Option<DateTime<Utc>>,
}

impl Document {
    pub fn required(
        owner: DocumentOwner,
        kind: DocumentKind,
        title: impl Into<String>,
        deadline: Option<NaiveDate>,
    ) -> Self {
        Self {
            id: DocumentId::generate(),
            title: title.into(),
            kind,
            owner,
            status: DocumentStatus::Required,
            deadline,
            file: None,
            note: None,
            uploaded_date: None,
            verified_date: None,
            signed_date: None,
        }
    }

    pub fn belongs_to(&self, purchase_id: &PurchaseId) -> bool {
        matches!(&self.owner, DocumentOwner::Purchase(owner) if owner == purchase_id)
    }

    pub fn is_outstanding(&self) -> bool {
        self.status == DocumentStatus::Required
    }

    pub(crate) fn apply(
        &mut self,
        next: DocumentStatus,
        update: StatusUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), Violation> {
        if !self.status.can_transition_to(next) {
            return Err(Violation::DocumentTransition {
                id: self.id.to_string(),
                from: self.status,
                to: next,
            });
        }

        match next {
            DocumentStatus::Uploaded => self.uploaded_date = Some(now),
            DocumentStatus::Verified => self.verified_date = Some(now),
            DocumentStatus::Signed => self.signed_date = Some(now),
            DocumentStatus::Required | DocumentStatus::Rejected => {}
        }
        if let Some(file) = update.file {
            self.file = Some(file);
        }
        if update.note.is_some() {
            self.note = update.note;
        }
        self.status = next;
        Ok(())
    }
}

impl Record for Document {
    const COLLECTION: Collection = Collection::Documents;

    fn record_id(&self) -> &str {
        self.id.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_moves_forward_or_to_rejected() {
        use DocumentStatus::*;
        assert!(Required.can_transition_to(Uploaded));
        assert!(Required.can_transition_to(Verified));
        assert!(Uploaded.can_transition_to(Verified));
        assert!(Verified.can_transition_to(Signed));
        assert!(Verified.can_transition_to(Rejected));
        assert!(Rejected.can_transition_to(Uploaded));
        assert!(Uploaded.can_transition_to(Uploaded));

        assert!(!Verified.can_transition_to(Uploaded));
        assert!(!Uploaded.can_transition_to(Required));
        assert!(!Signed.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Verified));
        assert!(!Signed.can_transition_to(Signed));
    }
}
