use sqlx::SqlitePool;

use crate::{
    error::ApiError,
    models::{BookingRow, ServiceAvailability, ServiceRow},
};

/// Availability projection for one date: every catalog service, in catalog
/// order, with its slot list reduced to the labels no booking on that date
/// has claimed. Read-only; makes no admission decision.
pub async fn available_slots(
    db: &SqlitePool,
    date: &str,
) -> Result<Vec<ServiceAvailability>, ApiError> {
    let services =
        sqlx::query_as::<_, ServiceRow>("SELECT id, name, price, slots FROM services ORDER BY name")
            .fetch_all(db)
            .await?;

    let bookings = sqlx::query_as::<_, BookingRow>(
        r#"SELECT id, treatment_name, date, slot, patient, patient_name, phone,
                  paid, transaction_id, created_at
           FROM bookings WHERE date = ?"#,
    )
    .bind(date)
    .fetch_all(db)
    .await?;

    Ok(project(&services, &bookings))
}

/// Set difference per service, order of the catalog slots preserved. A
/// service with every slot taken still appears, with an empty list.
fn project(services: &[ServiceRow], bookings: &[BookingRow]) -> Vec<ServiceAvailability> {
    services
        .iter()
        .map(|service| {
            let booked: Vec<&str> = bookings
                .iter()
                .filter(|booking| booking.treatment_name == service.name)
                .map(|booking| booking.slot.as_str())
                .collect();
            let open = service
                .slot_labels()
                .into_iter()
                .filter(|slot| !booked.contains(&slot.as_str()))
                .collect();
            ServiceAvailability {
                name: service.name.clone(),
                price: service.price,
                slots: open,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(name: &str, slots: &[&str]) -> ServiceRow {
        ServiceRow {
            id: name.to_lowercase(),
            name: name.to_string(),
            price: 30.0,
            slots: serde_json::to_string(slots).unwrap(),
        }
    }

    fn booking(treatment: &str, date: &str, slot: &str, patient: &str) -> BookingRow {
        BookingRow {
            id: format!("{treatment}-{patient}"),
            treatment_name: treatment.to_string(),
            date: date.to_string(),
            slot: slot.to_string(),
            patient: patient.to_string(),
            patient_name: None,
            phone: None,
            paid: 0,
            transaction_id: None,
            created_at: String::new(),
        }
    }

    #[test]
    fn booked_slots_are_subtracted_in_catalog_order() {
        let services = vec![service("Cleaning", &["9am", "10am", "11am"])];
        let bookings = vec![booking("Cleaning", "2024-01-01", "10am", "a@x.com")];

        let result = project(&services, &bookings);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "Cleaning");
        assert_eq!(result[0].slots, vec!["9am", "11am"]);
    }

    #[test]
    fn a_date_with_no_bookings_returns_the_full_catalog() {
        let services = vec![
            service("Cleaning", &["9am", "10am", "11am"]),
            service("Whitening", &["1pm"]),
        ];

        let result = project(&services, &[]);
        assert_eq!(result[0].slots, vec!["9am", "10am", "11am"]);
        assert_eq!(result[1].slots, vec!["1pm"]);
    }

    #[test]
    fn different_patients_on_different_slots_both_count() {
        let services = vec![service("Cleaning", &["9am", "10am", "11am"])];
        let bookings = vec![
            booking("Cleaning", "2024-01-01", "9am", "a@x.com"),
            booking("Cleaning", "2024-01-01", "11am", "b@x.com"),
        ];

        let result = project(&services, &bookings);
        assert_eq!(result[0].slots, vec!["10am"]);
    }

    #[test]
    fn a_fully_booked_service_stays_in_the_projection() {
        let services = vec![service("Whitening", &["1pm"])];
        let bookings = vec![booking("Whitening", "2024-01-01", "1pm", "a@x.com")];

        let result = project(&services, &bookings);
        assert_eq!(result.len(), 1);
        assert!(result[0].slots.is_empty());
    }

    #[test]
    fn bookings_for_other_services_are_ignored() {
        let services = vec![service("Cleaning", &["9am", "10am"])];
        let bookings = vec![booking("Whitening", "2024-01-01", "9am", "a@x.com")];

        let result = project(&services, &bookings);
        assert_eq!(result[0].slots, vec!["9am", "10am"]);
    }
}
