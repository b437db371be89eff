//! Configuración del proyecto
//!
//! Este módulo contiene la configuración de entorno del servidor, el cache y
//! el rate limiting.

pub mod environment;

pub use environment::*;
