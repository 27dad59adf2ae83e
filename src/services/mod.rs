pub mod dispatch;
pub mod reaper;
pub mod registry;
pub mod relay;
pub mod workflow;
