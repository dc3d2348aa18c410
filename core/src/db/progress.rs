use chrono::{DateTime, Utc};
use rusqlite::params;

use super::{Database, enum_col, now_text, ts_col, ts_text};
use crate::error::{StorageError, StorageResult};
use crate::models::{
    BodyMeasurement, HealthData, HealthMetric, HealthSource, MeasurementType, NewBodyMeasurement,
    NewHealthData, NewPersonalRecord, NewProgressPhoto, NewSleepData, PersonalRecord, PhotoPose,
    ProgressPhoto, RecordType, SleepData, validate_measurement_value, validate_new_sleep,
};

const MEASUREMENT_COLUMNS: &str = "id, user_id, type, value, unit, measured_at, created_at";
const RECORD_COLUMNS: &str =
    "id, user_id, exercise_id, type, value, unit, workout_id, achieved_at, created_at";
const PHOTO_COLUMNS: &str = "id, user_id, image_url, pose, notes, taken_at, created_at";
const HEALTH_COLUMNS: &str = "id, user_id, type, value, unit, source, recorded_at, synced_at";
const SLEEP_COLUMNS: &str = "id, user_id, bed_time, wake_time, duration_min, deep_sleep_min, \
    rem_sleep_min, light_sleep_min, quality, source, recorded_at, synced_at";

fn measurement_from_row(row: &rusqlite::Row) -> rusqlite::Result<BodyMeasurement> {
    Ok(BodyMeasurement {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: enum_col::<MeasurementType>(row, 2)?,
        value: row.get(3)?,
        unit: row.get(4)?,
        measured_at: ts_col(row, 5)?,
        created_at: ts_col(row, 6)?,
    })
}

fn record_from_row(row: &rusqlite::Row) -> rusqlite::Result<PersonalRecord> {
    Ok(PersonalRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        exercise_id: row.get(2)?,
        kind: enum_col::<RecordType>(row, 3)?,
        value: row.get(4)?,
        unit: row.get(5)?,
        workout_id: row.get(6)?,
        achieved_at: ts_col(row, 7)?,
        created_at: ts_col(row, 8)?,
    })
}

fn photo_from_row(row: &rusqlite::Row) -> rusqlite::Result<ProgressPhoto> {
    Ok(ProgressPhoto {
        id: row.get(0)?,
        user_id: row.get(1)?,
        image_url: row.get(2)?,
        pose: enum_col::<PhotoPose>(row, 3)?,
        notes: row.get(4)?,
        taken_at: ts_col(row, 5)?,
        created_at: ts_col(row, 6)?,
    })
}

fn health_from_row(row: &rusqlite::Row) -> rusqlite::Result<HealthData> {
    Ok(HealthData {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: enum_col::<HealthMetric>(row, 2)?,
        value: row.get(3)?,
        unit: row.get(4)?,
        source: enum_col::<HealthSource>(row, 5)?,
        recorded_at: ts_col(row, 6)?,
        synced_at: ts_col(row, 7)?,
    })
}

fn sleep_from_row(row: &rusqlite::Row) -> rusqlite::Result<SleepData> {
    Ok(SleepData {
        id: row.get(0)?,
        user_id: row.get(1)?,
        bed_time: ts_col(row, 2)?,
        wake_time: ts_col(row, 3)?,
        duration_min: row.get(4)?,
        deep_sleep_min: row.get(5)?,
        rem_sleep_min: row.get(6)?,
        light_sleep_min: row.get(7)?,
        quality: row.get(8)?,
        source: enum_col::<HealthSource>(row, 9)?,
        recorded_at: ts_col(row, 10)?,
        synced_at: ts_col(row, 11)?,
    })
}

impl Database {
    // --- Body measurements ---

    pub fn create_body_measurement(
        &self,
        measurement: &NewBodyMeasurement,
    ) -> StorageResult<BodyMeasurement> {
        validate_measurement_value(measurement.value)?;
        self.conn.execute(
            "INSERT INTO body_measurements (id, user_id, type, value, unit, measured_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                measurement.id,
                measurement.user_id,
                measurement.kind.as_str(),
                measurement.value,
                measurement.unit,
                ts_text(&measurement.measured_at),
                now_text(),
            ],
        )?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEASUREMENT_COLUMNS} FROM body_measurements WHERE id = ?1"
        ))?;
        let mut rows = stmt.query(params![measurement.id])?;
        match rows.next()? {
            Some(row) => Ok(measurement_from_row(row)?),
            None => Err(StorageError::not_found("body measurement", &measurement.id)),
        }
    }

    /// Most recent first.
    pub fn get_body_measurements(
        &self,
        user_id: &str,
        kind: MeasurementType,
        limit: i64,
    ) -> StorageResult<Vec<BodyMeasurement>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEASUREMENT_COLUMNS} FROM body_measurements
             WHERE user_id = ?1 AND type = ?2
             ORDER BY measured_at DESC, rowid DESC LIMIT ?3"
        ))?;
        let measurements = stmt
            .query_map(params![user_id, kind.as_str(), limit], measurement_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(measurements)
    }

    // --- Personal records ---

    pub fn create_personal_record(
        &self,
        record: &NewPersonalRecord,
    ) -> StorageResult<PersonalRecord> {
        if !record.value.is_finite() {
            return Err(StorageError::InvalidData(
                "record value must be a finite number".to_string(),
            ));
        }
        self.conn.execute(
            "INSERT INTO personal_records (id, user_id, exercise_id, type, value, unit,
                workout_id, achieved_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id,
                record.user_id,
                record.exercise_id,
                record.kind.as_str(),
                record.value,
                record.unit,
                record.workout_id,
                ts_text(&record.achieved_at),
                now_text(),
            ],
        )?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM personal_records WHERE id = ?1"
        ))?;
        let mut rows = stmt.query(params![record.id])?;
        match rows.next()? {
            Some(row) => Ok(record_from_row(row)?),
            None => Err(StorageError::not_found("personal record", &record.id)),
        }
    }

    /// Most recent first, optionally narrowed to one exercise.
    pub fn get_personal_records(
        &self,
        user_id: &str,
        exercise_id: Option<&str>,
    ) -> StorageResult<Vec<PersonalRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM personal_records
             WHERE user_id = ?1 AND (?2 IS NULL OR exercise_id = ?2)
             ORDER BY achieved_at DESC, rowid DESC"
        ))?;
        let records = stmt
            .query_map(params![user_id, exercise_id], record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn get_best_personal_record(
        &self,
        user_id: &str,
        exercise_id: &str,
        kind: RecordType,
    ) -> StorageResult<Option<PersonalRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM personal_records
             WHERE user_id = ?1 AND exercise_id = ?2 AND type = ?3
             ORDER BY value DESC, achieved_at LIMIT 1"
        ))?;
        let mut rows = stmt.query(params![user_id, exercise_id, kind.as_str()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(record_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Stores `record` only when it beats the best of its user, exercise and
    /// type. Equal values are not a new record.
    pub fn record_if_best(
        &self,
        record: &NewPersonalRecord,
    ) -> StorageResult<Option<PersonalRecord>> {
        let best = self.get_best_personal_record(&record.user_id, &record.exercise_id, record.kind)?;
        if best.is_some_and(|b| b.value >= record.value) {
            return Ok(None);
        }
        self.create_personal_record(record).map(Some)
    }

    // --- Progress photos ---

    pub fn create_progress_photo(&self, photo: &NewProgressPhoto) -> StorageResult<ProgressPhoto> {
        if photo.image_url.trim().is_empty() {
            return Err(StorageError::InvalidData(
                "image reference must not be empty".to_string(),
            ));
        }
        self.conn.execute(
            "INSERT INTO progress_photos (id, user_id, image_url, pose, notes, taken_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                photo.id,
                photo.user_id,
                photo.image_url,
                photo.pose.as_str(),
                photo.notes,
                ts_text(&photo.taken_at),
                now_text(),
            ],
        )?;
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PHOTO_COLUMNS} FROM progress_photos WHERE id = ?1"))?;
        let mut rows = stmt.query(params![photo.id])?;
        match rows.next()? {
            Some(row) => Ok(photo_from_row(row)?),
            None => Err(StorageError::not_found("progress photo", &photo.id)),
        }
    }

    pub fn get_progress_photos(&self, user_id: &str) -> StorageResult<Vec<ProgressPhoto>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PHOTO_COLUMNS} FROM progress_photos WHERE user_id = ?1
             ORDER BY taken_at DESC, rowid DESC"
        ))?;
        let photos = stmt
            .query_map(params![user_id], photo_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(photos)
    }

    // --- Health data ---

    /// `synced_at` is stamped with the current time.
    pub fn create_health_data(&self, data: &NewHealthData) -> StorageResult<HealthData> {
        if !data.value.is_finite() || data.value < 0.0 {
            return Err(StorageError::InvalidData(
                "health value must not be negative".to_string(),
            ));
        }
        self.conn.execute(
            "INSERT INTO health_data (id, user_id, type, value, unit, source, recorded_at, synced_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                data.id,
                data.user_id,
                data.kind.as_str(),
                data.value,
                data.unit,
                data.source.as_str(),
                ts_text(&data.recorded_at),
                now_text(),
            ],
        )?;
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {HEALTH_COLUMNS} FROM health_data WHERE id = ?1"))?;
        let mut rows = stmt.query(params![data.id])?;
        match rows.next()? {
            Some(row) => Ok(health_from_row(row)?),
            None => Err(StorageError::not_found("health data", &data.id)),
        }
    }

    /// Samples of one metric recorded within `[start, end]`, oldest first.
    pub fn get_health_data(
        &self,
        user_id: &str,
        kind: HealthMetric,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StorageResult<Vec<HealthData>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {HEALTH_COLUMNS} FROM health_data
             WHERE user_id = ?1 AND type = ?2 AND recorded_at BETWEEN ?3 AND ?4
             ORDER BY recorded_at, rowid"
        ))?;
        let data = stmt
            .query_map(
                params![user_id, kind.as_str(), ts_text(&start), ts_text(&end)],
                health_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(data)
    }

    // --- Sleep ---

    /// Duration is derived from bed and wake time.
    pub fn create_sleep_data(&self, sleep: &NewSleepData) -> StorageResult<SleepData> {
        validate_new_sleep(sleep)?;
        self.conn.execute(
            "INSERT INTO sleep_data (id, user_id, bed_time, wake_time, duration_min,
                deep_sleep_min, rem_sleep_min, light_sleep_min, quality, source, recorded_at,
                synced_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                sleep.id,
                sleep.user_id,
                ts_text(&sleep.bed_time),
                ts_text(&sleep.wake_time),
                sleep.duration_min(),
                sleep.deep_sleep_min,
                sleep.rem_sleep_min,
                sleep.light_sleep_min,
                sleep.quality,
                sleep.source.as_str(),
                ts_text(&sleep.recorded_at),
                now_text(),
            ],
        )?;
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {SLEEP_COLUMNS} FROM sleep_data WHERE id = ?1"))?;
        let mut rows = stmt.query(params![sleep.id])?;
        match rows.next()? {
            Some(row) => Ok(sleep_from_row(row)?),
            None => Err(StorageError::not_found("sleep data", &sleep.id)),
        }
    }

    /// Most recent nights first.
    pub fn get_sleep_data(&self, user_id: &str, limit: i64) -> StorageResult<Vec<SleepData>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SLEEP_COLUMNS} FROM sleep_data WHERE user_id = ?1
             ORDER BY wake_time DESC, rowid DESC LIMIT ?2"
        ))?;
        let nights = stmt
            .query_map(params![user_id, limit], sleep_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(nights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::db_with_user;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 7, 0, 0).unwrap()
    }

    fn weight(id: &str, value: f64, measured_at: DateTime<Utc>) -> NewBodyMeasurement {
        NewBodyMeasurement {
            id: id.to_string(),
            user_id: "u1".to_string(),
            kind: MeasurementType::Weight,
            value,
            unit: "kg".to_string(),
            measured_at,
        }
    }

    fn record(id: &str, exercise: &str, value: f64, achieved_at: DateTime<Utc>) -> NewPersonalRecord {
        NewPersonalRecord {
            id: id.to_string(),
            user_id: "u1".to_string(),
            exercise_id: exercise.to_string(),
            kind: RecordType::OneRepMax,
            value,
            unit: "kg".to_string(),
            workout_id: None,
            achieved_at,
        }
    }

    #[test]
    fn test_measurements_most_recent_first() {
        let db = db_with_user("u1");
        db.create_body_measurement(&weight("m1", 82.0, t0())).unwrap();
        db.create_body_measurement(&weight("m2", 81.4, t0() + Duration::days(7)))
            .unwrap();
        db.create_body_measurement(&NewBodyMeasurement {
            kind: MeasurementType::Waist,
            unit: "cm".to_string(),
            ..weight("m3", 84.0, t0() + Duration::days(8))
        })
        .unwrap();

        let weights = db
            .get_body_measurements("u1", MeasurementType::Weight, 10)
            .unwrap();
        let ids: Vec<&str> = weights.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m1"]);

        let latest = db
            .get_body_measurements("u1", MeasurementType::Weight, 1)
            .unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].value, 81.4);
    }

    #[test]
    fn test_measurement_rejects_non_positive_value() {
        let db = db_with_user("u1");
        let err = db
            .create_body_measurement(&weight("m1", 0.0, t0()))
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidData(_)), "{err:?}");
    }

    #[test]
    fn test_personal_records_filter_and_best() {
        let db = db_with_user("u1");
        db.create_personal_record(&record("r1", "squat", 140.0, t0()))
            .unwrap();
        db.create_personal_record(&record("r2", "squat", 150.0, t0() + Duration::days(30)))
            .unwrap();
        db.create_personal_record(&record("r3", "deadlift", 180.0, t0() + Duration::days(1)))
            .unwrap();

        let all = db.get_personal_records("u1", None).unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r2", "r3", "r1"]);

        let squats = db.get_personal_records("u1", Some("squat")).unwrap();
        assert_eq!(squats.len(), 2);

        let best = db
            .get_best_personal_record("u1", "squat", RecordType::OneRepMax)
            .unwrap()
            .unwrap();
        assert_eq!(best.id, "r2");
        assert!(db
            .get_best_personal_record("u1", "squat", RecordType::Volume)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_record_if_best_only_stores_improvements() {
        let db = db_with_user("u1");
        let first = db.record_if_best(&record("p1", "squat", 140.0, t0())).unwrap();
        assert_eq!(first.map(|r| r.id), Some("p1".to_string()));

        let tie = db
            .record_if_best(&record("p2", "squat", 140.0, t0() + Duration::days(1)))
            .unwrap();
        assert!(tie.is_none());

        let better = db
            .record_if_best(&record("p3", "squat", 145.0, t0() + Duration::days(2)))
            .unwrap();
        assert_eq!(better.map(|r| r.value), Some(145.0));
        assert_eq!(db.get_personal_records("u1", Some("squat")).unwrap().len(), 2);
    }

    #[test]
    fn test_personal_record_requires_exercise() {
        let db = db_with_user("u1");
        let err = db
            .create_personal_record(&record("r1", "curl", 40.0, t0()))
            .unwrap_err();
        assert!(matches!(err, StorageError::ForeignKey(_)), "{err:?}");
    }

    #[test]
    fn test_progress_photos() {
        let db = db_with_user("u1");
        db.create_progress_photo(&NewProgressPhoto {
            id: "p1".to_string(),
            user_id: "u1".to_string(),
            image_url: "file:///photos/front.jpg".to_string(),
            pose: PhotoPose::Front,
            notes: None,
            taken_at: t0(),
        })
        .unwrap();
        let photos = db.get_progress_photos("u1").unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].pose, PhotoPose::Front);
    }

    #[test]
    fn test_health_data_range_ascending() {
        let db = db_with_user("u1");
        for (id, offset, value) in [("h2", 2, 9000.0), ("h1", 1, 12000.0), ("h3", 3, 4000.0)] {
            db.create_health_data(&NewHealthData {
                id: id.to_string(),
                user_id: "u1".to_string(),
                kind: HealthMetric::Steps,
                value,
                unit: "count".to_string(),
                source: HealthSource::AppleHealth,
                recorded_at: t0() + Duration::days(offset),
            })
            .unwrap();
        }

        let data = db
            .get_health_data(
                "u1",
                HealthMetric::Steps,
                t0() + Duration::days(1),
                t0() + Duration::days(2),
            )
            .unwrap();
        let ids: Vec<&str> = data.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["h1", "h2"]);
        assert_eq!(data[0].source, HealthSource::AppleHealth);
        assert!(db
            .get_health_data("u1", HealthMetric::HeartRate, t0(), t0() + Duration::days(5))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_sleep_duration_derived() {
        let db = db_with_user("u1");
        let bed = t0() - Duration::hours(8) - Duration::minutes(30);
        let night = db
            .create_sleep_data(&NewSleepData {
                id: "s1".to_string(),
                user_id: "u1".to_string(),
                bed_time: bed,
                wake_time: t0(),
                deep_sleep_min: Some(90),
                rem_sleep_min: Some(110),
                light_sleep_min: None,
                quality: Some(8),
                source: HealthSource::Whoop,
                recorded_at: t0(),
            })
            .unwrap();
        assert_eq!(night.duration_min, 510);
        assert_eq!(night.quality, Some(8));

        let nights = db.get_sleep_data("u1", 7).unwrap();
        assert_eq!(nights.len(), 1);
        assert_eq!(nights[0].source, HealthSource::Whoop);
    }
}
