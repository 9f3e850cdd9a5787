mod blueprint;
mod domain;
mod engine;
mod mortgage;

pub use blueprint::{DocumentTemplate, PurchaseBlueprint};
pub use domain::{
    GateFlags, Purchase, PurchaseStatus, Stage, StageKind, StageRequirement, StageStatus,
    TOTAL_STEPS,
};
pub use engine::{BlockedStage, Progress, PurchaseEngine};
pub use mortgage::{MortgageApplication, MortgageRequest};
