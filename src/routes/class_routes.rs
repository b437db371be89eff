use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};

use crate::controllers::ClassController;
use crate::dto::{ApiResponse, ReserveQuery};
use crate::models::{
    ClassFilter, ClassWithAvailability, CreateClassRequest, Reservation, UpdateClassRequest,
    YogaClass,
};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_class_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_class).get(list_classes))
        .route("/:id", get(get_class).put(update_class))
        .route("/:id/reserve", post(reserve_class))
}

async fn create_class(
    State(state): State<AppState>,
    Json(request): Json<CreateClassRequest>,
) -> Result<Json<ApiResponse<YogaClass>>, AppError> {
    let controller = ClassController::new(&state);
    let response = controller.create(request).await?;
    Ok(Json(response))
}

async fn list_classes(
    State(state): State<AppState>,
    Query(filter): Query<ClassFilter>,
) -> Result<Json<Vec<ClassWithAvailability>>, AppError> {
    let controller = ClassController::new(&state);
    let response = controller.list(filter).await?;
    Ok(Json(response))
}

async fn get_class(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ClassWithAvailability>, AppError> {
    let controller = ClassController::new(&state);
    let response = controller.get(id).await?;
    Ok(Json(response))
}

async fn update_class(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<UpdateClassRequest>,
) -> Result<Json<ApiResponse<YogaClass>>, AppError> {
    let controller = ClassController::new(&state);
    let response = controller.update(id, request).await?;
    Ok(Json(response))
}

async fn reserve_class(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(query): Query<ReserveQuery>,
) -> Result<Json<ApiResponse<Reservation>>, AppError> {
    let controller = ClassController::new(&state);
    let response = controller.reserve(id, query.user_id).await?;
    Ok(Json(response))
}
