mod domain;
mod export;
mod scheduler;

pub use domain::{
    build_schedule, Payment, PaymentKind, PaymentMethod, PaymentState, PaymentStatus,
    ScheduleOwner, INSTALLMENT_COUNT,
};
pub use export::schedule_csv;
pub use scheduler::PaymentScheduler;
