use anyhow::Result;
use chrono::{Duration, Utc};
use tabled::Tabled;

use liftlog_core::models::{HealthMetric, HealthSource, NewHealthData, NewSleepData, new_id};
use liftlog_core::service::FitnessService;

use super::helpers::{empty_list, local_time, parse_datetime, print_json, render_table};

fn default_unit(metric: HealthMetric) -> &'static str {
    match metric {
        HealthMetric::Steps => "steps",
        HealthMetric::HeartRate => "bpm",
        HealthMetric::Sleep | HealthMetric::ActiveMinutes => "min",
        HealthMetric::CaloriesBurned => "kcal",
    }
}

#[derive(Debug)]
pub(crate) struct SleepArgs {
    pub bed: String,
    pub wake: String,
    pub quality: Option<i64>,
    pub deep_min: Option<i64>,
    pub rem_min: Option<i64>,
    pub light_min: Option<i64>,
    pub source: HealthSource,
}

pub(crate) async fn cmd_sleep_log(
    svc: &FitnessService,
    user_id: &str,
    args: SleepArgs,
    json: bool,
) -> Result<()> {
    let bed_time = parse_datetime(Some(&args.bed))?;
    let wake_time = parse_datetime(Some(&args.wake))?;
    let sleep = svc
        .store()
        .create_sleep_data(NewSleepData {
            id: new_id(),
            user_id: user_id.to_string(),
            bed_time,
            wake_time,
            deep_sleep_min: args.deep_min,
            rem_sleep_min: args.rem_min,
            light_sleep_min: args.light_min,
            quality: args.quality,
            source: args.source,
            recorded_at: wake_time,
        })
        .await?;

    if json {
        print_json(&sleep)?;
    } else {
        println!(
            "Logged {}h{:02}m of sleep ending {}",
            sleep.duration_min / 60,
            sleep.duration_min % 60,
            local_time(&sleep.wake_time)
        );
    }
    Ok(())
}

pub(crate) async fn cmd_sleep_history(
    svc: &FitnessService,
    user_id: &str,
    limit: i64,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct SleepRow {
        #[tabled(rename = "Bed")]
        bed: String,
        #[tabled(rename = "Wake")]
        wake: String,
        #[tabled(rename = "Duration")]
        duration: String,
        #[tabled(rename = "Quality")]
        quality: String,
    }

    let nights = svc.store().get_sleep_data(user_id, limit).await?;
    if nights.is_empty() {
        empty_list(json, "No sleep logged yet");
    }
    if json {
        return print_json(&nights);
    }

    let rows: Vec<SleepRow> = nights
        .iter()
        .map(|s| SleepRow {
            bed: local_time(&s.bed_time),
            wake: local_time(&s.wake_time),
            duration: format!("{}h{:02}m", s.duration_min / 60, s.duration_min % 60),
            quality: s.quality.map_or("-".to_string(), |q| format!("{q}/10")),
        })
        .collect();
    println!("{}", render_table(&rows, 2..));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub(crate) async fn cmd_health_log(
    svc: &FitnessService,
    user_id: &str,
    metric: HealthMetric,
    value: f64,
    unit: Option<&str>,
    source: HealthSource,
    at: Option<&str>,
    json: bool,
) -> Result<()> {
    let recorded_at = parse_datetime(at)?;
    let data = svc
        .store()
        .create_health_data(NewHealthData {
            id: new_id(),
            user_id: user_id.to_string(),
            kind: metric,
            value,
            unit: unit.unwrap_or_else(|| default_unit(metric)).to_string(),
            source,
            recorded_at,
        })
        .await?;

    if json {
        print_json(&data)?;
    } else {
        println!(
            "Logged {} {} {} at {}",
            data.kind,
            data.value,
            data.unit,
            local_time(&data.recorded_at)
        );
    }
    Ok(())
}

pub(crate) async fn cmd_health_show(
    svc: &FitnessService,
    user_id: &str,
    metric: HealthMetric,
    days: u32,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct HealthRow {
        #[tabled(rename = "Recorded")]
        recorded: String,
        #[tabled(rename = "Source")]
        source: String,
        #[tabled(rename = "Value")]
        value: String,
    }

    let end = Utc::now();
    let start = end - Duration::days(i64::from(days));
    let samples = svc
        .store()
        .get_health_data(user_id, metric, start, end)
        .await?;
    if samples.is_empty() {
        empty_list(json, &format!("No {metric} data in the last {days} days"));
    }
    if json {
        return print_json(&samples);
    }

    let rows: Vec<HealthRow> = samples
        .iter()
        .map(|d| HealthRow {
            recorded: local_time(&d.recorded_at),
            source: d.source.to_string(),
            value: format!("{} {}", d.value, d.unit),
        })
        .collect();
    println!("{}", render_table(&rows, 2..));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_units() {
        assert_eq!(default_unit(HealthMetric::Steps), "steps");
        assert_eq!(default_unit(HealthMetric::HeartRate), "bpm");
        assert_eq!(default_unit(HealthMetric::CaloriesBurned), "kcal");
    }

    #[tokio::test]
    async fn test_sleep_log_rejects_wake_before_bed() {
        let svc = FitnessService::open_in_memory().await.unwrap();
        svc.ensure_user("u1", "Ada", "ada@example.com").await.unwrap();
        let err = cmd_sleep_log(
            &svc,
            "u1",
            SleepArgs {
                bed: "2024-06-15T07:00:00Z".to_string(),
                wake: "2024-06-14T23:00:00Z".to_string(),
                quality: None,
                deep_min: None,
                rem_min: None,
                light_min: None,
                source: HealthSource::Manual,
            },
            true,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().to_lowercase().contains("wake"), "{err}");
    }
}
