//! DTOs de la API
//!
//! Envoltorios de respuesta y parámetros de query que no son modelos de negocio.

pub mod api_response;
pub mod query_dto;

pub use api_response::ApiResponse;
pub use query_dto::{ReserveQuery, ResolveAlertQuery};
