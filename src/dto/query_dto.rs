use serde::Deserialize;

// Query de reserva: POST /classes/:id/reserve?user_id=
#[derive(Debug, Deserialize)]
pub struct ReserveQuery {
    pub user_id: u64,
}

// Query de resolución de alertas: POST /alerts/resolve?alert_title=
#[derive(Debug, Deserialize)]
pub struct ResolveAlertQuery {
    pub alert_title: String,
}
