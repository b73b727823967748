mod authorization;
mod logging;
mod validation;

pub use authorization::AuthorizationBehavior;
pub use logging::{LoggingBehavior, LoggingOptions};
pub use validation::{ValidationBehavior, validation_failures};
