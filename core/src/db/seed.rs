use rusqlite::params;

use super::{Database, now_text};
use crate::error::StorageResult;
use crate::models::ExerciseCategory;

struct SeedExercise {
    id: &'static str,
    name: &'static str,
    category: ExerciseCategory,
    primary_muscles: &'static [&'static str],
    secondary_muscles: &'static [&'static str],
    equipment: &'static [&'static str],
    instructions: &'static [&'static str],
}

const CATALOG: &[SeedExercise] = &[
    SeedExercise {
        id: "bench-press",
        name: "Bench Press",
        category: ExerciseCategory::Chest,
        primary_muscles: &["chest", "triceps"],
        secondary_muscles: &["shoulders"],
        equipment: &["barbell", "bench"],
        instructions: &[
            "Lie flat on bench with feet on floor",
            "Grip bar slightly wider than shoulder width",
            "Lower bar to chest with control",
            "Press bar up explosively",
            "Keep core tight throughout movement",
        ],
    },
    SeedExercise {
        id: "squat",
        name: "Squat",
        category: ExerciseCategory::Legs,
        primary_muscles: &["quadriceps", "glutes"],
        secondary_muscles: &["hamstrings", "calves"],
        equipment: &["barbell", "squat-rack"],
        instructions: &[
            "Position bar on upper back",
            "Stand with feet shoulder-width apart",
            "Lower by pushing hips back and bending knees",
            "Descend until thighs parallel to floor",
            "Drive through heels to return to start",
        ],
    },
    SeedExercise {
        id: "deadlift",
        name: "Deadlift",
        category: ExerciseCategory::Back,
        primary_muscles: &["hamstrings", "glutes", "back"],
        secondary_muscles: &["traps", "forearms"],
        equipment: &["barbell"],
        instructions: &[
            "Stand with feet hip-width apart",
            "Grip bar with hands just outside legs",
            "Keep back straight and chest up",
            "Lift by extending hips and knees",
            "Stand tall at top, then lower with control",
        ],
    },
    SeedExercise {
        id: "overhead-press",
        name: "Overhead Press",
        category: ExerciseCategory::Shoulders,
        primary_muscles: &["shoulders"],
        secondary_muscles: &["triceps", "core"],
        equipment: &["barbell"],
        instructions: &[
            "Stand with feet shoulder-width apart",
            "Hold bar at shoulder level",
            "Press bar straight up overhead",
            "Keep core tight and avoid arching back",
            "Lower bar back to shoulders with control",
        ],
    },
    SeedExercise {
        id: "pull-up",
        name: "Pull-up",
        category: ExerciseCategory::Back,
        primary_muscles: &["lats", "rhomboids"],
        secondary_muscles: &["biceps", "rear-delts"],
        equipment: &["pull-up-bar"],
        instructions: &[
            "Hang from bar with overhand grip",
            "Pull body up until chin over bar",
            "Squeeze shoulder blades together",
            "Lower with control to full extension",
            "Maintain straight body throughout",
        ],
    },
];

impl Database {
    /// Inserts the built-in exercise catalog when the table is empty.
    /// Returns the number of rows inserted.
    pub(super) fn seed_exercises(&mut self) -> StorageResult<usize> {
        if self.count_exercises()? > 0 {
            return Ok(0);
        }

        let now = now_text();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO exercises (id, name, category, primary_muscles, secondary_muscles,
                    equipment, instructions, video_url, image_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, NULL, ?8)",
            )?;
            for exercise in CATALOG {
                stmt.execute(params![
                    exercise.id,
                    exercise.name,
                    exercise.category.as_str(),
                    serde_json::to_string(exercise.primary_muscles)?,
                    serde_json::to_string(exercise.secondary_muscles)?,
                    serde_json::to_string(exercise.equipment)?,
                    serde_json::to_string(exercise.instructions)?,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(CATALOG.len())
    }
}
