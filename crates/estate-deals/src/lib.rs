//! Transaction lifecycle engine for apartment sales.
//!
//! A booking reserves a unit for a fixed term; acting on it produces a purchase that walks a
//! fixed seven stage template (confirmation, documents, mortgage, preliminary contract,
//! payments, final contract, key handover). Every component reads and writes through the
//! shared [`store::RecordStore`], which serializes multi-record changes through a single
//! unit of work.

pub mod clock;
pub mod config;
pub mod error;
pub mod store;
pub mod telemetry;
pub mod workflows;

pub use workflows::DealDesk;
