pub mod criteria;
pub mod execution;
pub mod notification;
pub mod submission;
