//! Repositorio en memoria de clases, instructores y reservas
//!
//! Contenedor de estado explícito que se inyecta vía `AppState`. Cada operación
//! toma el lock una sola vez, así que comprobar cupo y reservar es atómico.

use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{
    ClassFilter, ClassWithAvailability, CreateClassRequest, Instructor, Reservation,
    ReservationStatus, UpdateClassRequest, YogaClass,
};

/// Errores de negocio al reservar
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReservationError {
    #[error("Class {0} not found")]
    ClassNotFound(u64),

    #[error("Class not available")]
    ClassInactive,

    #[error("Class full")]
    ClassFull,
}

/// Resumen de ocupación para métricas de negocio
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OccupancySnapshot {
    pub active_classes: usize,
    pub reservations: usize,
    pub average_occupancy: f64,
}

#[derive(Debug, Default)]
struct YogaData {
    classes: BTreeMap<u64, YogaClass>,
    reservations: BTreeMap<u64, Reservation>,
    instructors: BTreeMap<u64, Instructor>,
    next_class_id: u64,
    next_reservation_id: u64,
}

impl YogaData {
    fn confirmed_reservations(&self, class_id: u64) -> usize {
        self.reservations
            .values()
            .filter(|r| r.class_id == class_id)
            .count()
    }

    fn with_availability(&self, class: &YogaClass) -> ClassWithAvailability {
        let reserved = self.confirmed_reservations(class.id) as u32;
        ClassWithAvailability {
            class: class.clone(),
            available_spots: class.max_capacity.saturating_sub(reserved),
            instructor: self.instructors.get(&class.instructor_id).cloned(),
        }
    }
}

#[derive(Clone, Default)]
pub struct YogaRepository {
    data: Arc<RwLock<YogaData>>,
}

impl YogaRepository {
    /// Repositorio vacío
    pub fn new() -> Self {
        Self::default()
    }

    /// Repositorio con los instructores por defecto
    pub fn with_default_instructors() -> Self {
        let mut data = YogaData::default();
        for instructor in Instructor::default_roster() {
            data.instructors.insert(instructor.id, instructor);
        }
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    pub async fn find_instructor(&self, id: u64) -> Option<Instructor> {
        self.data.read().await.instructors.get(&id).cloned()
    }

    pub async fn create_class(&self, request: CreateClassRequest) -> YogaClass {
        let mut data = self.data.write().await;
        data.next_class_id += 1;
        let now = Utc::now();

        let class = YogaClass {
            id: data.next_class_id,
            name: request.name,
            description: request.description,
            instructor_id: request.instructor_id,
            style: request.style,
            level: request.level,
            duration_minutes: request.duration_minutes,
            max_capacity: request.max_capacity,
            price: request.price,
            schedule_time: request.schedule_time,
            week_days: request.week_days,
            active: true,
            created_at: now,
            updated_at: now,
        };

        data.classes.insert(class.id, class.clone());
        class
    }

    pub async fn find_class_with_availability(&self, id: u64) -> Option<ClassWithAvailability> {
        let data = self.data.read().await;
        data.classes.get(&id).map(|class| data.with_availability(class))
    }

    pub async fn list_classes(&self, filter: &ClassFilter) -> Vec<ClassWithAvailability> {
        let data = self.data.read().await;
        data.classes
            .values()
            .filter(|class| filter.matches(class))
            .map(|class| data.with_availability(class))
            .collect()
    }

    pub async fn update_class(&self, id: u64, update: UpdateClassRequest) -> Option<YogaClass> {
        let mut data = self.data.write().await;
        let class = data.classes.get_mut(&id)?;
        class.apply(update, Utc::now());
        Some(class.clone())
    }

    /// Reservar un cupo; verifica existencia, estado y capacidad bajo el mismo lock
    pub async fn reserve(&self, class_id: u64, user_id: u64) -> Result<Reservation, ReservationError> {
        let mut data = self.data.write().await;

        let class = data
            .classes
            .get(&class_id)
            .ok_or(ReservationError::ClassNotFound(class_id))?;

        if !class.active {
            return Err(ReservationError::ClassInactive);
        }

        if data.confirmed_reservations(class_id) >= class.max_capacity as usize {
            return Err(ReservationError::ClassFull);
        }

        data.next_reservation_id += 1;
        let reservation = Reservation {
            id: data.next_reservation_id,
            user_id,
            class_id,
            date: Utc::now(),
            status: ReservationStatus::Confirmed,
        };
        data.reservations.insert(reservation.id, reservation.clone());

        Ok(reservation)
    }

    pub async fn occupancy(&self) -> OccupancySnapshot {
        let data = self.data.read().await;
        let active: Vec<&YogaClass> = data.classes.values().filter(|c| c.active).collect();

        let ratios: Vec<f64> = active
            .iter()
            .filter(|c| c.max_capacity > 0)
            .map(|c| data.confirmed_reservations(c.id) as f64 / c.max_capacity as f64)
            .collect();

        let average_occupancy = if ratios.is_empty() {
            0.0
        } else {
            ratios.iter().sum::<f64>() / ratios.len() as f64
        };

        OccupancySnapshot {
            active_classes: active.len(),
            reservations: data.reservations.len(),
            average_occupancy,
        }
    }
}
