use serde_json::json;
use tracing::{info, warn};
use validator::Validate;

use crate::cache::CacheManager;
use crate::dto::ApiResponse;
use crate::models::{
    ClassFilter, ClassWithAvailability, CreateClassRequest, Reservation, UpdateClassRequest,
    YogaClass,
};
use crate::monitoring::MetricsCollector;
use crate::repositories::{ReservationError, YogaRepository};
use crate::state::AppState;
use crate::utils::errors::{bad_request_error, AppError, AppResult};

/// TTL del listado de clases (segundos)
const LIST_CLASSES_TTL: u64 = 180;
/// TTL del detalle de una clase (segundos)
const CLASS_DETAIL_TTL: u64 = 240;

const LIST_CLASSES_KEY: &str = "list_classes";
const CLASS_DETAIL_KEY: &str = "class_detail";

pub struct ClassController {
    repository: YogaRepository,
    cache: CacheManager,
    metrics: MetricsCollector,
}

impl ClassController {
    pub fn new(state: &AppState) -> Self {
        Self {
            repository: state.repository.clone(),
            cache: state.cache.clone(),
            metrics: state.metrics.clone(),
        }
    }

    pub async fn create(&self, request: CreateClassRequest) -> AppResult<ApiResponse<YogaClass>> {
        request.validate()?;

        if self.repository.find_instructor(request.instructor_id).await.is_none() {
            return Err(bad_request_error(&format!(
                "Instructor {} no existe",
                request.instructor_id
            )));
        }

        let class = self.repository.create_class(request).await;
        info!("🧘 Clase creada: {} ({})", class.name, class.id);

        self.cache.invalidate_pattern(LIST_CLASSES_KEY).await;
        self.metrics
            .record_event("class_created", json!({ "class_id": class.id }))
            .await;

        Ok(ApiResponse::success_with_message(
            class,
            "Clase creada exitosamente".to_string(),
        ))
    }

    pub async fn list(&self, filter: ClassFilter) -> AppResult<Vec<ClassWithAvailability>> {
        let repository = self.repository.clone();
        let metrics = self.metrics.clone();

        self.cache
            .cached(LIST_CLASSES_KEY, LIST_CLASSES_TTL, move |filter: ClassFilter| {
                let repository = repository.clone();
                let metrics = metrics.clone();
                async move {
                    let classes = repository.list_classes(&filter).await;
                    metrics
                        .record_event("classes_listed", json!({ "count": classes.len() }))
                        .await;
                    Ok::<_, AppError>(classes)
                }
            })
            .call(filter)
            .await
    }

    /// Detalle de una clase; un 404 no queda en cache
    pub async fn get(&self, id: u64) -> AppResult<ClassWithAvailability> {
        let repository = self.repository.clone();

        self.cache
            .cached("get_class", CLASS_DETAIL_TTL, move |id: u64| {
                let repository = repository.clone();
                async move {
                    repository
                        .find_class_with_availability(id)
                        .await
                        .ok_or_else(|| AppError::NotFound("Clase no encontrada".to_string()))
                }
            })
            .key_prefix(CLASS_DETAIL_KEY)
            .call(id)
            .await
    }

    pub async fn update(
        &self,
        id: u64,
        request: UpdateClassRequest,
    ) -> AppResult<ApiResponse<YogaClass>> {
        request.validate()?;

        let class = self
            .repository
            .update_class(id, request)
            .await
            .ok_or_else(|| AppError::NotFound("Clase no encontrada".to_string()))?;

        self.cache
            .invalidate_patterns(&[CLASS_DETAIL_KEY, LIST_CLASSES_KEY])
            .await;
        self.metrics
            .record_event("class_updated", json!({ "class_id": id }))
            .await;

        Ok(ApiResponse::success_with_message(
            class,
            "Clase actualizada exitosamente".to_string(),
        ))
    }

    pub async fn reserve(&self, class_id: u64, user_id: u64) -> AppResult<ApiResponse<Reservation>> {
        let reservation = self
            .repository
            .reserve(class_id, user_id)
            .await
            .map_err(|e| match e {
                ReservationError::ClassNotFound(_) => AppError::NotFound("Clase no encontrada".to_string()),
                other => {
                    warn!("⚠️ Reserva rechazada para clase {}: {}", class_id, other);
                    AppError::BadRequest(other.to_string())
                }
            })?;

        self.cache
            .invalidate_patterns(&[CLASS_DETAIL_KEY, LIST_CLASSES_KEY])
            .await;
        self.metrics
            .record_event(
                "reservation_created",
                json!({ "class_id": class_id, "user_id": user_id }),
            )
            .await;

        Ok(ApiResponse::success_with_message(
            reservation,
            "Reserva confirmada".to_string(),
        ))
    }
}
