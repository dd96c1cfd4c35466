use actix_web::{web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{admin_validator, new_id, Identity},
    db::promote_user,
    error::ApiError,
    models::DoctorRow,
    state::AppState,
};

#[derive(Deserialize)]
struct DoctorInput {
    name: String,
    email: String,
    specialty: String,
    image: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/user/admin/{email}")
            .wrap(HttpAuthentication::bearer(admin_validator))
            .route(web::put().to(promote)),
    )
    .service(
        web::scope("/doctor")
            .wrap(HttpAuthentication::bearer(admin_validator))
            .service(
                web::resource("")
                    .route(web::get().to(list_doctors))
                    .route(web::post().to(add_doctor)),
            )
            .service(web::resource("/{email}").route(web::delete().to(remove_doctor))),
    );
}

async fn promote(
    state: web::Data<AppState>,
    auth: web::ReqData<Identity>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let email = path.into_inner();
    promote_user(&state.db, &email).await?;
    log::info!("User {email} promoted to admin by {}", auth.email);
    Ok(HttpResponse::Ok().json(json!({ "modifiedCount": 1 })))
}

async fn list_doctors(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let doctors = sqlx::query_as::<_, DoctorRow>(
        "SELECT id, name, email, specialty, image, created_at FROM doctors ORDER BY name",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(HttpResponse::Ok().json(doctors))
}

async fn add_doctor(
    state: web::Data<AppState>,
    body: web::Json<DoctorInput>,
) -> Result<HttpResponse, ApiError> {
    let doctor = body.into_inner();
    sqlx::query(
        r#"INSERT INTO doctors (id, name, email, specialty, image, created_at)
           VALUES (?, ?, ?, ?, ?, ?)
           ON CONFLICT(email) DO UPDATE SET
             name = excluded.name,
             specialty = excluded.specialty,
             image = excluded.image"#,
    )
    .bind(new_id())
    .bind(&doctor.name)
    .bind(&doctor.email)
    .bind(&doctor.specialty)
    .bind(&doctor.image)
    .bind(Utc::now().to_rfc3339())
    .execute(&state.db)
    .await?;

    log::info!("Doctor roster entry saved for {}", doctor.email);
    Ok(HttpResponse::Ok().json(json!({ "acknowledged": true })))
}

async fn remove_doctor(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let email = path.into_inner();
    let result = sqlx::query("DELETE FROM doctors WHERE email = ?")
        .bind(&email)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(HttpResponse::Ok().json(json!({ "deletedCount": result.rows_affected() })))
}
