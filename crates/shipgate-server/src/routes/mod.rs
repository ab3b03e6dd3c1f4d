pub mod approvals;
pub mod callback;
pub mod health;
pub mod history;
pub mod interactions;
pub mod messages;
