pub mod error;
pub mod logging;

pub use error::UserError;
pub use logging::init_logging;
