use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Estado de una reserva; no hay cancelación, toda reserva guardada está confirmada
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Confirmed,
}

/// Reserva de un usuario en una clase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reservation {
    pub id: u64,
    pub user_id: u64,
    pub class_id: u64,
    pub date: DateTime<Utc>,
    pub status: ReservationStatus,
}
