use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

use super::{Database, enum_col, list_col, now_text, opt_ts_col, ts_col, ts_text};
use crate::error::{StorageError, StorageResult};
use crate::models::{
    Exercise, ExerciseCategory, NewWorkout, NewWorkoutExercise, NewWorkoutSet,
    NewWorkoutTemplate, TemplateExercise, Workout, WorkoutExercise, WorkoutSet, WorkoutTemplate,
    validate_new_set,
};

const EXERCISE_COLUMNS: &str = "id, name, category, primary_muscles, secondary_muscles, \
    equipment, instructions, video_url, image_url, created_at";

const WORKOUT_COLUMNS: &str = "id, user_id, name, template_id, start_time, end_time, \
    duration_secs, total_volume, notes, is_completed, created_at, updated_at";

const SET_COLUMNS: &str = "id, workout_exercise_id, reps, weight_kg, duration_secs, distance_m, \
    rpe, rest_secs, notes, is_warmup, is_drop_set, is_failure, created_at";

// workout_exercises columns 0..=5 followed by the exercise at 6..=15
const WORKOUT_EXERCISE_SELECT: &str = "SELECT we.id, we.workout_id, we.exercise_id, \
    we.order_index, we.notes, we.created_at, e.id, e.name, e.category, e.primary_muscles, \
    e.secondary_muscles, e.equipment, e.instructions, e.video_url, e.image_url, e.created_at \
    FROM workout_exercises we JOIN exercises e ON e.id = we.exercise_id";

fn exercise_at(row: &rusqlite::Row, base: usize) -> rusqlite::Result<Exercise> {
    Ok(Exercise {
        id: row.get(base)?,
        name: row.get(base + 1)?,
        category: enum_col::<ExerciseCategory>(row, base + 2)?,
        primary_muscles: list_col(row, base + 3)?,
        secondary_muscles: list_col(row, base + 4)?,
        equipment: list_col(row, base + 5)?,
        instructions: list_col(row, base + 6)?,
        video_url: row.get(base + 7)?,
        image_url: row.get(base + 8)?,
        created_at: ts_col(row, base + 9)?,
    })
}

fn exercise_from_row(row: &rusqlite::Row) -> rusqlite::Result<Exercise> {
    exercise_at(row, 0)
}

fn workout_from_row(row: &rusqlite::Row) -> rusqlite::Result<Workout> {
    Ok(Workout {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        template_id: row.get(3)?,
        exercises: Vec::new(),
        start_time: ts_col(row, 4)?,
        end_time: opt_ts_col(row, 5)?,
        duration_secs: row.get(6)?,
        total_volume: row.get(7)?,
        notes: row.get(8)?,
        is_completed: row.get(9)?,
        created_at: ts_col(row, 10)?,
        updated_at: ts_col(row, 11)?,
    })
}

fn workout_exercise_from_row(row: &rusqlite::Row) -> rusqlite::Result<WorkoutExercise> {
    Ok(WorkoutExercise {
        id: row.get(0)?,
        workout_id: row.get(1)?,
        exercise_id: row.get(2)?,
        order_index: row.get(3)?,
        notes: row.get(4)?,
        created_at: ts_col(row, 5)?,
        exercise: exercise_at(row, 6)?,
        sets: Vec::new(),
    })
}

fn set_from_row(row: &rusqlite::Row) -> rusqlite::Result<WorkoutSet> {
    Ok(WorkoutSet {
        id: row.get(0)?,
        workout_exercise_id: row.get(1)?,
        reps: row.get(2)?,
        weight_kg: row.get(3)?,
        duration_secs: row.get(4)?,
        distance_m: row.get(5)?,
        rpe: row.get(6)?,
        rest_secs: row.get(7)?,
        notes: row.get(8)?,
        is_warmup: row.get(9)?,
        is_drop_set: row.get(10)?,
        is_failure: row.get(11)?,
        created_at: ts_col(row, 12)?,
    })
}

fn load_sets(conn: &Connection, workout_exercise_id: &str) -> StorageResult<Vec<WorkoutSet>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SET_COLUMNS} FROM workout_sets WHERE workout_exercise_id = ?1 ORDER BY rowid"
    ))?;
    let sets = stmt
        .query_map(params![workout_exercise_id], set_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(sets)
}

fn load_set(conn: &Connection, id: &str) -> StorageResult<Option<WorkoutSet>> {
    let mut stmt = conn.prepare(&format!("SELECT {SET_COLUMNS} FROM workout_sets WHERE id = ?1"))?;
    let mut rows = stmt.query(params![id])?;
    if let Some(row) = rows.next()? {
        Ok(Some(set_from_row(row)?))
    } else {
        Ok(None)
    }
}

fn load_workout_exercises(
    conn: &Connection,
    workout_id: &str,
) -> StorageResult<Vec<WorkoutExercise>> {
    let mut stmt = conn.prepare(&format!(
        "{WORKOUT_EXERCISE_SELECT} WHERE we.workout_id = ?1 ORDER BY we.order_index"
    ))?;
    let mut exercises = stmt
        .query_map(params![workout_id], workout_exercise_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    for exercise in &mut exercises {
        exercise.sets = load_sets(conn, &exercise.id)?;
    }
    Ok(exercises)
}

fn load_workout_exercise(conn: &Connection, id: &str) -> StorageResult<Option<WorkoutExercise>> {
    let mut stmt = conn.prepare(&format!("{WORKOUT_EXERCISE_SELECT} WHERE we.id = ?1"))?;
    let mut rows = stmt.query(params![id])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };
    let mut exercise = workout_exercise_from_row(row)?;
    exercise.sets = load_sets(conn, &exercise.id)?;
    Ok(Some(exercise))
}

fn load_workout(conn: &Connection, id: &str) -> StorageResult<Option<Workout>> {
    let mut stmt = conn.prepare(&format!("SELECT {WORKOUT_COLUMNS} FROM workouts WHERE id = ?1"))?;
    let mut rows = stmt.query(params![id])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };
    let mut workout = workout_from_row(row)?;
    workout.exercises = load_workout_exercises(conn, &workout.id)?;
    Ok(Some(workout))
}

/// Fails unless the workout exists and is still open for edits.
fn ensure_open(conn: &Connection, workout_id: &str) -> StorageResult<()> {
    let mut stmt = conn.prepare("SELECT is_completed FROM workouts WHERE id = ?1")?;
    let mut rows = stmt.query(params![workout_id])?;
    match rows.next()? {
        None => Err(StorageError::not_found("workout", workout_id)),
        Some(row) if row.get::<_, bool>(0)? => {
            Err(StorageError::WorkoutCompleted(workout_id.to_string()))
        }
        Some(_) => Ok(()),
    }
}

fn touch_workout(conn: &Connection, workout_id: &str, now: &str) -> StorageResult<()> {
    conn.execute(
        "UPDATE workouts SET updated_at = ?1 WHERE id = ?2",
        params![now, workout_id],
    )?;
    Ok(())
}

fn insert_set(
    conn: &Connection,
    workout_exercise_id: &str,
    set: &NewWorkoutSet,
    now: &str,
) -> StorageResult<()> {
    validate_new_set(set)?;
    conn.execute(
        "INSERT INTO workout_sets (id, workout_exercise_id, reps, weight_kg, duration_secs,
            distance_m, rpe, rest_secs, notes, is_warmup, is_drop_set, is_failure, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            set.id,
            workout_exercise_id,
            set.reps,
            set.weight_kg,
            set.duration_secs,
            set.distance_m,
            set.rpe,
            set.rest_secs,
            set.notes,
            set.is_warmup,
            set.is_drop_set,
            set.is_failure,
            now,
        ],
    )?;
    Ok(())
}

fn insert_workout_exercise(
    conn: &Connection,
    workout_id: &str,
    order_index: i64,
    exercise: &NewWorkoutExercise,
    now: &str,
) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO workout_exercises (id, workout_id, exercise_id, order_index, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            exercise.id,
            workout_id,
            exercise.exercise_id,
            order_index,
            exercise.notes,
            now,
        ],
    )?;
    for set in &exercise.sets {
        insert_set(conn, &exercise.id, set, now)?;
    }
    Ok(())
}

impl Database {
    // --- Exercises ---

    pub fn get_all_exercises(&self) -> StorageResult<Vec<Exercise>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {EXERCISE_COLUMNS} FROM exercises ORDER BY name"))?;
        let exercises = stmt
            .query_map([], exercise_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(exercises)
    }

    pub fn get_exercises_by_category(
        &self,
        category: ExerciseCategory,
    ) -> StorageResult<Vec<Exercise>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EXERCISE_COLUMNS} FROM exercises WHERE category = ?1 ORDER BY name"
        ))?;
        let exercises = stmt
            .query_map(params![category.as_str()], exercise_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(exercises)
    }

    pub fn get_exercise_by_id(&self, id: &str) -> StorageResult<Option<Exercise>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {EXERCISE_COLUMNS} FROM exercises WHERE id = ?1"))?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(exercise_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn count_exercises(&self) -> StorageResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM exercises", [], |row| row.get(0))?;
        Ok(count)
    }

    // --- Workouts ---

    /// Inserts the workout with its exercises (in list order) and their sets
    /// in one transaction.
    pub fn create_workout(&mut self, workout: &NewWorkout) -> StorageResult<Workout> {
        if workout.name.trim().is_empty() {
            return Err(StorageError::InvalidData(
                "Workout name must not be empty".to_string(),
            ));
        }
        let now = now_text();
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO workouts (id, user_id, name, template_id, start_time, notes,
                is_completed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)",
            params![
                workout.id,
                workout.user_id,
                workout.name.trim(),
                workout.template_id,
                ts_text(&workout.start_time),
                workout.notes,
                now,
            ],
        )?;
        for (index, exercise) in (0_i64..).zip(&workout.exercises) {
            insert_workout_exercise(&tx, &workout.id, index, exercise, &now)?;
        }
        tx.commit()?;

        load_workout(&self.conn, &workout.id)?
            .ok_or_else(|| StorageError::not_found("workout", &workout.id))
    }

    pub fn get_workout_by_id(&self, id: &str) -> StorageResult<Option<Workout>> {
        load_workout(&self.conn, id)
    }

    /// Most recent first by start time.
    pub fn get_workouts_for_user(&self, user_id: &str, limit: i64) -> StorageResult<Vec<Workout>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {WORKOUT_COLUMNS} FROM workouts WHERE user_id = ?1
             ORDER BY start_time DESC LIMIT ?2"
        ))?;
        let mut workouts = stmt
            .query_map(params![user_id, limit], workout_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for workout in &mut workouts {
            workout.exercises = load_workout_exercises(&self.conn, &workout.id)?;
        }
        Ok(workouts)
    }

    /// Appends an exercise after the workout's existing ones.
    pub fn add_workout_exercise(
        &mut self,
        workout_id: &str,
        exercise: &NewWorkoutExercise,
    ) -> StorageResult<WorkoutExercise> {
        let now = now_text();
        let tx = self.conn.transaction()?;
        ensure_open(&tx, workout_id)?;
        let next_index: i64 = tx.query_row(
            "SELECT COUNT(*) FROM workout_exercises WHERE workout_id = ?1",
            params![workout_id],
            |row| row.get(0),
        )?;
        insert_workout_exercise(&tx, workout_id, next_index, exercise, &now)?;
        touch_workout(&tx, workout_id, &now)?;
        tx.commit()?;

        load_workout_exercise(&self.conn, &exercise.id)?
            .ok_or_else(|| StorageError::not_found("workout exercise", &exercise.id))
    }

    /// Removes one exercise (with its sets) and closes the gap in `order_index`.
    pub fn remove_workout_exercise(
        &mut self,
        workout_id: &str,
        workout_exercise_id: &str,
    ) -> StorageResult<bool> {
        let now = now_text();
        let tx = self.conn.transaction()?;
        ensure_open(&tx, workout_id)?;
        let removed_index: Option<i64> = {
            let mut stmt = tx.prepare(
                "SELECT order_index FROM workout_exercises WHERE id = ?1 AND workout_id = ?2",
            )?;
            let mut rows = stmt.query(params![workout_exercise_id, workout_id])?;
            match rows.next()? {
                Some(row) => Some(row.get(0)?),
                None => None,
            }
        };
        let Some(removed_index) = removed_index else {
            return Ok(false);
        };

        tx.execute(
            "DELETE FROM workout_exercises WHERE id = ?1",
            params![workout_exercise_id],
        )?;
        // Shift through negative values so the unique (workout_id, order_index)
        // pair never collides mid-update.
        tx.execute(
            "UPDATE workout_exercises SET order_index = -order_index - 1
             WHERE workout_id = ?1 AND order_index > ?2",
            params![workout_id, removed_index],
        )?;
        tx.execute(
            "UPDATE workout_exercises SET order_index = -order_index - 2
             WHERE workout_id = ?1 AND order_index < 0",
            params![workout_id],
        )?;
        touch_workout(&tx, workout_id, &now)?;
        tx.commit()?;
        Ok(true)
    }

    pub fn add_workout_set(
        &mut self,
        workout_exercise_id: &str,
        set: &NewWorkoutSet,
    ) -> StorageResult<WorkoutSet> {
        let now = now_text();
        let tx = self.conn.transaction()?;
        let workout_id: Option<String> = {
            let mut stmt =
                tx.prepare("SELECT workout_id FROM workout_exercises WHERE id = ?1")?;
            let mut rows = stmt.query(params![workout_exercise_id])?;
            match rows.next()? {
                Some(row) => Some(row.get(0)?),
                None => None,
            }
        };
        let workout_id = workout_id
            .ok_or_else(|| StorageError::not_found("workout exercise", workout_exercise_id))?;
        ensure_open(&tx, &workout_id)?;
        insert_set(&tx, workout_exercise_id, set, &now)?;
        touch_workout(&tx, &workout_id, &now)?;
        tx.commit()?;

        load_set(&self.conn, &set.id)?.ok_or_else(|| StorageError::not_found("set", &set.id))
    }

    /// Closes the workout: stores end time, duration in seconds and total volume.
    pub fn complete_workout(
        &mut self,
        workout_id: &str,
        end_time: DateTime<Utc>,
    ) -> StorageResult<Workout> {
        let now = now_text();
        let tx = self.conn.transaction()?;
        ensure_open(&tx, workout_id)?;
        let workout = load_workout(&tx, workout_id)?
            .ok_or_else(|| StorageError::not_found("workout", workout_id))?;
        if end_time < workout.start_time {
            return Err(StorageError::InvalidData(
                "end_time must not be before start_time".to_string(),
            ));
        }
        let duration_secs = (end_time - workout.start_time).num_seconds();
        let volume = workout.volume();
        tx.execute(
            "UPDATE workouts SET end_time = ?1, duration_secs = ?2, total_volume = ?3,
                is_completed = 1, updated_at = ?4
             WHERE id = ?5",
            params![ts_text(&end_time), duration_secs, volume, now, workout_id],
        )?;
        tx.commit()?;

        load_workout(&self.conn, workout_id)?
            .ok_or_else(|| StorageError::not_found("workout", workout_id))
    }

    /// Removes the workout together with its exercises and sets.
    pub fn delete_workout(&self, id: &str) -> StorageResult<bool> {
        let changes = self
            .conn
            .execute("DELETE FROM workouts WHERE id = ?1", params![id])?;
        Ok(changes > 0)
    }

    // --- Templates ---

    fn template_from_row(row: &rusqlite::Row) -> rusqlite::Result<WorkoutTemplate> {
        Ok(WorkoutTemplate {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            exercises: Vec::new(),
            is_public: row.get(4)?,
            created_at: ts_col(row, 5)?,
            updated_at: ts_col(row, 6)?,
        })
    }

    fn template_exercises(&self, template_id: &str) -> StorageResult<Vec<TemplateExercise>> {
        let mut stmt = self.conn.prepare(
            "SELECT exercise_id, order_index, target_sets, target_reps, target_weight_kg, rest_secs
             FROM template_exercises WHERE template_id = ?1 ORDER BY order_index",
        )?;
        let exercises = stmt
            .query_map(params![template_id], |row| {
                Ok(TemplateExercise {
                    exercise_id: row.get(0)?,
                    order_index: row.get(1)?,
                    target_sets: row.get(2)?,
                    target_reps: row.get(3)?,
                    target_weight_kg: row.get(4)?,
                    rest_secs: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(exercises)
    }

    pub fn create_template(
        &mut self,
        template: &NewWorkoutTemplate,
    ) -> StorageResult<WorkoutTemplate> {
        if template.name.trim().is_empty() {
            return Err(StorageError::InvalidData(
                "Template name must not be empty".to_string(),
            ));
        }
        if let Some(bad) = template.exercises.iter().find(|e| e.target_sets < 1) {
            return Err(StorageError::InvalidData(format!(
                "target_sets must be at least 1 for exercise '{}'",
                bad.exercise_id
            )));
        }

        let now = now_text();
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO workout_templates (id, user_id, name, description, is_public,
                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                template.id,
                template.user_id,
                template.name.trim(),
                template.description,
                template.is_public,
                now,
            ],
        )?;
        for (index, exercise) in (0_i64..).zip(&template.exercises) {
            tx.execute(
                "INSERT INTO template_exercises (template_id, exercise_id, order_index,
                    target_sets, target_reps, target_weight_kg, rest_secs)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    template.id,
                    exercise.exercise_id,
                    index,
                    exercise.target_sets,
                    exercise.target_reps,
                    exercise.target_weight_kg,
                    exercise.rest_secs,
                ],
            )?;
        }
        tx.commit()?;

        self.get_template_by_id(&template.id)?
            .ok_or_else(|| StorageError::not_found("template", &template.id))
    }

    pub fn get_template_by_id(&self, id: &str) -> StorageResult<Option<WorkoutTemplate>> {
        let template = {
            let mut stmt = self.conn.prepare(
                "SELECT id, user_id, name, description, is_public, created_at, updated_at
                 FROM workout_templates WHERE id = ?1",
            )?;
            let mut rows = stmt.query(params![id])?;
            match rows.next()? {
                Some(row) => Self::template_from_row(row)?,
                None => return Ok(None),
            }
        };
        let exercises = self.template_exercises(&template.id)?;
        Ok(Some(WorkoutTemplate {
            exercises,
            ..template
        }))
    }

    pub fn get_templates_for_user(&self, user_id: &str) -> StorageResult<Vec<WorkoutTemplate>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, description, is_public, created_at, updated_at
             FROM workout_templates WHERE user_id = ?1 ORDER BY name",
        )?;
        let mut templates = stmt
            .query_map(params![user_id], Self::template_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for template in &mut templates {
            template.exercises = self.template_exercises(&template.id)?;
        }
        Ok(templates)
    }

    pub fn delete_template(&self, id: &str) -> StorageResult<bool> {
        let changes = self
            .conn
            .execute("DELETE FROM workout_templates WHERE id = ?1", params![id])?;
        Ok(changes > 0)
    }
}
