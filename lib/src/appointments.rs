// lib/src/appointments.rs
//! Doctor schedules: bookable slots, upcoming appointments and counts for
//! the admin dashboard. Pure functions over appointment lists so callers
//! decide where the appointments come from.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use models::medical::{Appointment, AppointmentStatus, NewAppointment};

use crate::config::SchedulingConfig;
use crate::errors::{ClinicError, Result};
use crate::storage_engine::ClinicStorage;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slot {
    pub time: DateTime<Utc>,
    pub available: bool,
}

/// Slots for `doctor_id` on `date`, from the start of working hours up to
/// and including the end hour. A slot is taken when a non-cancelled
/// appointment for that doctor starts exactly at it.
pub fn generate_slots(
    date: NaiveDate,
    doctor_id: &Uuid,
    appointments: &[Appointment],
    schedule: &SchedulingConfig,
) -> Vec<Slot> {
    let (Some(start), Some(end)) = (
        NaiveTime::from_hms_opt(schedule.start_hour, 0, 0),
        NaiveTime::from_hms_opt(schedule.end_hour, 0, 0),
    ) else {
        return Vec::new();
    };
    let step = Duration::minutes(i64::from(schedule.slot_minutes.max(1)));
    let end = date.and_time(end).and_utc();

    let mut slots = Vec::new();
    let mut current = date.and_time(start).and_utc();
    while current <= end {
        let taken = appointments
            .iter()
            .any(|a| a.doctor_id == *doctor_id && !a.is_cancelled() && a.scheduled_time == current);
        slots.push(Slot { time: current, available: !taken });
        current += step;
    }
    slots
}

/// Books an appointment if the doctor's slot is free.
pub async fn book<S: ClinicStorage + ?Sized>(storage: &S, appointment: NewAppointment) -> Result<Appointment> {
    let existing = storage.list_appointments().await?;
    let clash = existing.iter().any(|a| {
        a.doctor_id == appointment.doctor_id && !a.is_cancelled() && a.scheduled_time == appointment.scheduled_time
    });
    if clash {
        return Err(ClinicError::Conflict(format!(
            "doctor {} is already booked at {}",
            appointment.doctor_id, appointment.scheduled_time
        )));
    }
    storage.add_appointment(appointment).await
}

/// Non-cancelled appointments after `now` and within `days` days, earliest first.
/// A negative window, or one reaching past the representable calendar, is
/// rejected as invalid input.
pub fn upcoming(appointments: &[Appointment], now: DateTime<Utc>, days: i64) -> Result<Vec<Appointment>> {
    let until = (days >= 0)
        .then(|| Duration::try_days(days))
        .flatten()
        .and_then(|window| now.checked_add_signed(window))
        .ok_or_else(|| ClinicError::InvalidData(format!("{} is not a valid number of days", days)))?;
    let mut upcoming: Vec<Appointment> = appointments
        .iter()
        .filter(|a| !a.is_cancelled() && a.scheduled_time > now && a.scheduled_time <= until)
        .cloned()
        .collect();
    upcoming.sort_by_key(|a| a.scheduled_time);
    Ok(upcoming)
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentStats {
    pub total: usize,
    pub today: usize,
    pub upcoming: usize,
    pub completed: usize,
    pub cancelled: usize,
}

pub fn statistics(appointments: &[Appointment], now: DateTime<Utc>) -> AppointmentStats {
    let today = now.date_naive();
    appointments.iter().fold(
        AppointmentStats { total: appointments.len(), ..Default::default() },
        |mut stats, a| {
            if a.scheduled_time.date_naive() == today {
                stats.today += 1;
            }
            if a.scheduled_time > now && !a.is_cancelled() {
                stats.upcoming += 1;
            }
            match a.status {
                AppointmentStatus::Completed => stats.completed += 1,
                AppointmentStatus::Cancelled => stats.cancelled += 1,
                _ => {}
            }
            stats
        },
    )
}
