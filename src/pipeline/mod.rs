pub mod collaborators;
pub mod events;
pub mod history;
pub mod lock;
pub mod orchestrator;
pub mod worker;
