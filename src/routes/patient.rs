use actix_web::{web, HttpResponse};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::verify_token,
    bookings,
    error::ApiError,
    models::{BookingRequest, PaymentInput, UserRow},
    payments,
    state::AppState,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/booking")
            // Admission is open to unauthenticated callers; only reads of
            // existing bookings need a credential.
            .route(web::post().to(create_booking))
            .route(web::get().to(own_bookings)),
    )
    .service(
        web::resource("/booking/{id}")
            .route(web::get().to(booking_by_id))
            .route(web::patch().to(pay_booking)),
    )
    .service(web::resource("/create-payment-intent").route(web::post().to(payment_intent)))
    .service(web::resource("/user").route(web::get().to(list_users)));
}

#[derive(Deserialize)]
struct PatientQuery {
    patient: String,
}

async fn create_booking(
    state: web::Data<AppState>,
    body: web::Json<BookingRequest>,
) -> Result<HttpResponse, ApiError> {
    let outcome = bookings::submit_booking(&state.db, body.into_inner()).await?;
    if outcome.success {
        log::info!(
            "Booking admitted: {} on {} at {}",
            outcome.booking.treatment_name,
            outcome.booking.date,
            outcome.booking.slot
        );
    }
    Ok(HttpResponse::Ok().json(outcome))
}

/// A caller may only read their own bookings; the query parameter must match
/// the verified identity.
async fn own_bookings(
    state: web::Data<AppState>,
    auth: BearerAuth,
    query: web::Query<PatientQuery>,
) -> Result<HttpResponse, ApiError> {
    let identity = verify_token(&state.jwt, auth.token())?;
    if query.patient != identity.email {
        return Err(ApiError::Forbidden);
    }
    let rows = bookings::fetch_patient_bookings(&state.db, &query.patient).await?;
    Ok(HttpResponse::Ok().json(rows))
}

async fn booking_by_id(
    state: web::Data<AppState>,
    auth: BearerAuth,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    verify_token(&state.jwt, auth.token())?;
    let booking = bookings::fetch_booking(&state.db, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(booking))
}

async fn pay_booking(
    state: web::Data<AppState>,
    auth: BearerAuth,
    path: web::Path<String>,
    body: web::Json<PaymentInput>,
) -> Result<HttpResponse, ApiError> {
    verify_token(&state.jwt, auth.token())?;
    let booking =
        bookings::attach_payment(&state.db, &path.into_inner(), body.into_inner()).await?;
    log::info!("Payment attached to booking {}", booking.id);
    Ok(HttpResponse::Ok().json(booking))
}

#[derive(Deserialize)]
struct IntentRequest {
    price: f64,
}

async fn payment_intent(
    state: web::Data<AppState>,
    auth: BearerAuth,
    body: web::Json<IntentRequest>,
) -> Result<HttpResponse, ApiError> {
    verify_token(&state.jwt, auth.token())?;
    let client_secret = payments::create_intent(&state.payments, body.price).await?;
    Ok(HttpResponse::Ok().json(json!({ "clientSecret": client_secret })))
}

async fn list_users(
    state: web::Data<AppState>,
    auth: BearerAuth,
) -> Result<HttpResponse, ApiError> {
    verify_token(&state.jwt, auth.token())?;
    let users = sqlx::query_as::<_, UserRow>(
        "SELECT email, name, role, updated_at FROM users ORDER BY email",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(HttpResponse::Ok().json(users))
}
