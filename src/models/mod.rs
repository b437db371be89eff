//! Modelos del sistema
//!
//! Este módulo contiene los modelos de datos del centro de yoga:
//! clases, instructores y reservas.

pub mod instructor;
pub mod reservation;
pub mod yoga_class;

pub use instructor::Instructor;
pub use reservation::{Reservation, ReservationStatus};
pub use yoga_class::*;
