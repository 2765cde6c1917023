pub mod app;
pub mod cli;
pub mod client;
pub mod error;
pub mod events;
pub mod index;
pub mod macros;
pub mod metadata;
pub mod session;
pub mod settings;
pub mod store;
pub mod sync;
pub mod types;
pub mod view;

pub use client::{ApiClient, GoalApi};
pub use error::{ServiceError, ServiceResult};
pub use events::StoreEvent;
pub use index::StepIndex;
pub use store::CalendarStore;
pub use sync::Synchronizer;
