pub mod context;
pub mod pagination;
pub mod validation;

pub use context::{RequestContext, Role};
pub use pagination::{Page, PageParams};
pub use validation::FieldErrors;
