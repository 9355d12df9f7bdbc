pub mod category;
pub mod project;
pub mod status;

pub use category::Category;
pub use project::{Project, ProjectTag};
pub use status::Status;
