//! Repositorios
//!
//! Acceso al estado de negocio del centro (clases, instructores y reservas).

pub mod yoga_repository;

pub use yoga_repository::{OccupancySnapshot, ReservationError, YogaRepository};
