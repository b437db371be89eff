pub mod alert_routes;
pub mod class_routes;
pub mod system_routes;

pub use alert_routes::create_alert_router;
pub use class_routes::create_class_router;
pub use system_routes::create_system_router;
