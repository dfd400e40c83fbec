pub mod calc;
pub mod core;
pub mod history;
pub mod setup;
