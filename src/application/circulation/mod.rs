mod config;
mod errors;
mod issue_service;
mod reservation_service;

pub use config::CirculationConfig;
pub use errors::{CirculationError, Result};
pub use issue_service::{
    ServiceDependencies, active_issues_for, create_issue, get_issue, overdue_issues, return_issue,
};
pub use reservation_service::{
    cancel_reservation, create_reservation, fulfill_reservation, pending_reservations_for,
    reservations_for,
};
