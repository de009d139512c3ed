pub mod analyze;
pub mod auth_cmd;
pub mod common;
pub mod edit;
pub mod notes;
