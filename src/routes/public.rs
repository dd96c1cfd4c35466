use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::{
    auth::issue_token,
    availability,
    db::{fetch_user, upsert_user},
    error::ApiError,
    models::{ServiceAvailability, ServiceRow, UserProfile, ROLE_ADMIN},
    state::AppState,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/service").route(web::get().to(list_services)))
        .service(web::resource("/available").route(web::get().to(available)))
        .service(web::resource("/user/{email}").route(web::put().to(put_user)))
        .service(web::resource("/admin/{email}").route(web::get().to(admin_status)))
        .service(web::resource("/health").route(web::get().to(health)));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

async fn list_services(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let rows =
        sqlx::query_as::<_, ServiceRow>("SELECT id, name, price, slots FROM services ORDER BY name")
            .fetch_all(&state.db)
            .await?;

    let services: Vec<ServiceAvailability> = rows
        .iter()
        .map(|row| ServiceAvailability {
            name: row.name.clone(),
            price: row.price,
            slots: row.slot_labels(),
        })
        .collect();

    Ok(HttpResponse::Ok().json(services))
}

#[derive(serde::Deserialize)]
struct AvailableQuery {
    date: String,
}

async fn available(
    state: web::Data<AppState>,
    query: web::Query<AvailableQuery>,
) -> Result<HttpResponse, ApiError> {
    let services = availability::available_slots(&state.db, &query.date).await?;
    Ok(HttpResponse::Ok().json(services))
}

async fn put_user(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UserProfile>,
) -> Result<HttpResponse, ApiError> {
    let email = path.into_inner();
    let stored = upsert_user(&state.db, &email, &body).await?;
    let token = issue_token(&state.jwt, &email)?;
    Ok(HttpResponse::Ok().json(json!({ "result": stored, "token": token })))
}

async fn admin_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let email = path.into_inner();
    let is_admin = fetch_user(&state.db, &email)
        .await?
        .map(|user| user.role == ROLE_ADMIN)
        .unwrap_or(false);
    Ok(HttpResponse::Ok().json(json!({ "admin": is_admin })))
}
