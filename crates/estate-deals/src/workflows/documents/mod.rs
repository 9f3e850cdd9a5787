mod domain;
mod gate;
mod template;

pub use domain::{Document, DocumentKind, DocumentOwner, DocumentStatus, FileMeta, StatusUpdate};
pub use gate::DocumentGate;
pub use template::generate_template;
