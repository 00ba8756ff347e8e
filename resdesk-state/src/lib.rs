pub mod facade;
pub mod notifier;
pub mod orchestrator;
pub mod state;
pub mod store;

pub use facade::ReservationsFacade;
pub use notifier::{BroadcastNotifier, Notifier, TracingNotifier};
pub use orchestrator::{Intent, Orchestrator};
pub use state::{ErrorInfo, Operation, ReservationsState, StoreEvent};
pub use store::ReservationStore;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("Orchestrator is not running")]
    OrchestratorStopped,
}
