use anyhow::Result;
use tabled::Tabled;

use liftlog_core::models::{MeasurementType, NewProgressPhoto, PhotoPose, new_id};
use liftlog_core::service::FitnessService;

use super::helpers::{empty_list, local_time, parse_datetime, print_json, render_table};

fn default_unit(kind: MeasurementType) -> &'static str {
    match kind {
        MeasurementType::Weight | MeasurementType::MuscleMass => "kg",
        MeasurementType::BodyFat => "%",
        MeasurementType::Waist
        | MeasurementType::Chest
        | MeasurementType::Arms
        | MeasurementType::Thighs
        | MeasurementType::Neck => "cm",
    }
}

pub(crate) async fn cmd_measure_log(
    svc: &FitnessService,
    user_id: &str,
    kind: MeasurementType,
    value: f64,
    unit: Option<&str>,
    at: Option<&str>,
    json: bool,
) -> Result<()> {
    let measured_at = parse_datetime(at)?;
    let unit = unit.unwrap_or_else(|| default_unit(kind));
    let m = svc
        .log_measurement(user_id, kind, value, unit, measured_at)
        .await?;

    if json {
        print_json(&m)?;
    } else {
        println!(
            "Logged {} {}{} at {}",
            m.kind,
            m.value,
            m.unit,
            local_time(&m.measured_at)
        );
    }
    Ok(())
}

pub(crate) async fn cmd_measure_history(
    svc: &FitnessService,
    user_id: &str,
    kind: MeasurementType,
    limit: i64,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct MeasurementRow {
        #[tabled(rename = "Measured")]
        measured: String,
        #[tabled(rename = "Value")]
        value: String,
    }

    let entries = svc
        .store()
        .get_body_measurements(user_id, kind, limit)
        .await?;

    if entries.is_empty() {
        empty_list(
            json,
            &format!("No {kind} measurements found. Use `liftlog measure log {kind} <value>`"),
        );
    }

    if json {
        return print_json(&entries);
    }

    let rows: Vec<MeasurementRow> = entries
        .iter()
        .map(|m| MeasurementRow {
            measured: local_time(&m.measured_at),
            value: format!("{:.1} {}", m.value, m.unit),
        })
        .collect();
    println!("{}", render_table(&rows, 1..));
    Ok(())
}

pub(crate) async fn cmd_photo_add(
    svc: &FitnessService,
    user_id: &str,
    image_url: &str,
    pose: PhotoPose,
    notes: Option<String>,
    at: Option<&str>,
    json: bool,
) -> Result<()> {
    let taken_at = parse_datetime(at)?;
    let photo = svc
        .store()
        .create_progress_photo(NewProgressPhoto {
            id: new_id(),
            user_id: user_id.to_string(),
            image_url: image_url.to_string(),
            pose,
            notes,
            taken_at,
        })
        .await?;

    if json {
        print_json(&photo)?;
    } else {
        println!("Saved {} photo (id: {})", photo.pose, photo.id);
    }
    Ok(())
}

pub(crate) async fn cmd_photo_list(svc: &FitnessService, user_id: &str, json: bool) -> Result<()> {
    let photos = svc.store().get_progress_photos(user_id).await?;
    if photos.is_empty() {
        empty_list(json, "No progress photos yet");
    }
    if json {
        return print_json(&photos);
    }
    for p in &photos {
        println!("{}  {:<5}  {}", local_time(&p.taken_at), p.pose.as_str(), p.image_url);
        if let Some(notes) = &p.notes {
            println!("    {notes}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_units() {
        assert_eq!(default_unit(MeasurementType::Weight), "kg");
        assert_eq!(default_unit(MeasurementType::BodyFat), "%");
        assert_eq!(default_unit(MeasurementType::Waist), "cm");
    }
}
