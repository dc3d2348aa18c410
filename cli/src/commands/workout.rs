use anyhow::{Context, Result, bail};
use tabled::Tabled;

use liftlog_core::models::{
    ExerciseCategory, NewTemplateExercise, NewWorkoutExercise, NewWorkoutSet, NewWorkoutTemplate,
    Workout, new_id,
};
use liftlog_core::service::FitnessService;

use super::helpers::{
    empty_list, local_time, nothing_found, parse_datetime, print_json, render_table, truncate,
};

pub(crate) async fn cmd_exercises(
    svc: &FitnessService,
    category: Option<ExerciseCategory>,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct ExerciseRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Primary")]
        primary: String,
        #[tabled(rename = "Equipment")]
        equipment: String,
    }

    let exercises = match category {
        Some(c) => svc.store().get_exercises_by_category(c).await?,
        None => svc.store().get_all_exercises().await?,
    };
    if exercises.is_empty() {
        empty_list(json, "No exercises found");
    }
    if json {
        return print_json(&exercises);
    }

    let rows: Vec<ExerciseRow> = exercises
        .iter()
        .map(|e| ExerciseRow {
            id: e.id.clone(),
            name: e.name.clone(),
            category: e.category.to_string(),
            primary: truncate(&e.primary_muscles.join(", "), 30),
            equipment: truncate(&e.equipment.join(", "), 25),
        })
        .collect();
    println!("{}", render_table(&rows, 5..));
    Ok(())
}

pub(crate) async fn cmd_workout_start(
    svc: &FitnessService,
    user_id: &str,
    name: &str,
    template: Option<&str>,
    at: Option<&str>,
    json: bool,
) -> Result<()> {
    let start = parse_datetime(at)?;
    let workout = svc.start_workout(user_id, name, template, start).await?;

    if json {
        print_json(&workout)?;
    } else {
        println!("Started '{}' (id: {})", workout.name, workout.id);
        for e in &workout.exercises {
            println!("  [{}] {} (id: {})", e.order_index, e.exercise.name, e.id);
        }
    }
    Ok(())
}

pub(crate) async fn cmd_workout_add_exercise(
    svc: &FitnessService,
    workout_id: &str,
    exercise_id: &str,
    notes: Option<String>,
    json: bool,
) -> Result<()> {
    let added = svc
        .store()
        .add_workout_exercise(
            workout_id,
            NewWorkoutExercise {
                id: new_id(),
                exercise_id: exercise_id.to_string(),
                notes,
                sets: Vec::new(),
            },
        )
        .await?;

    if json {
        print_json(&added)?;
    } else {
        println!(
            "Added {} at position {} (id: {})",
            added.exercise.name, added.order_index, added.id
        );
    }
    Ok(())
}

pub(crate) async fn cmd_workout_remove_exercise(
    svc: &FitnessService,
    workout_id: &str,
    workout_exercise_id: &str,
    json: bool,
) -> Result<()> {
    let removed = svc
        .store()
        .remove_workout_exercise(workout_id, workout_exercise_id)
        .await?;
    if !removed {
        nothing_found(
            json,
            &format!("No exercise '{workout_exercise_id}' in workout '{workout_id}'"),
        );
    }

    if json {
        println!("{}", serde_json::json!({ "removed": workout_exercise_id }));
    } else {
        println!("Removed {workout_exercise_id}");
    }
    Ok(())
}

pub(crate) async fn cmd_workout_add_set(
    svc: &FitnessService,
    workout_exercise_id: &str,
    set: NewWorkoutSet,
    json: bool,
) -> Result<()> {
    let set = svc
        .store()
        .add_workout_set(workout_exercise_id, NewWorkoutSet { id: new_id(), ..set })
        .await?;

    if json {
        print_json(&set)?;
    } else {
        let weight = set
            .weight_kg
            .map(|w| format!(" x {w}kg"))
            .unwrap_or_default();
        let warmup = if set.is_warmup { " (warm-up)" } else { "" };
        println!("Logged {} reps{weight}{warmup} (id: {})", set.reps, set.id);
    }
    Ok(())
}

pub(crate) async fn cmd_workout_finish(
    svc: &FitnessService,
    workout_id: &str,
    at: Option<&str>,
    json: bool,
) -> Result<()> {
    let end = parse_datetime(at)?;
    let done = svc.complete_workout(workout_id, end).await?;

    if json {
        return print_json(&done);
    }

    let w = &done.workout;
    let minutes = w.duration_secs.unwrap_or_default() / 60;
    println!(
        "Finished '{}': {minutes} min, {:.0} kg total volume",
        w.name,
        w.total_volume.unwrap_or_default()
    );
    for record in &done.new_records {
        let name = w
            .exercises
            .iter()
            .find(|e| e.exercise_id == record.exercise_id)
            .map_or(record.exercise_id.as_str(), |e| e.exercise.name.as_str());
        println!("  New record: {name} {:.0} {}", record.value, record.unit);
    }
    Ok(())
}

fn print_workout(w: &Workout) {
    let status = if w.is_completed { "completed" } else { "in progress" };
    println!("{} ({status})", w.name);
    println!("  id:      {}", w.id);
    println!("  started: {}", local_time(&w.start_time));
    if let Some(end) = &w.end_time {
        println!("  ended:   {}", local_time(end));
    }
    for e in &w.exercises {
        println!("  [{}] {} (id: {})", e.order_index, e.exercise.name, e.id);
        for (n, s) in e.sets.iter().enumerate() {
            let weight = s.weight_kg.map(|w| format!(" x {w}kg")).unwrap_or_default();
            let rpe = s.rpe.map(|r| format!(" @ RPE {r}")).unwrap_or_default();
            let warmup = if s.is_warmup { " (warm-up)" } else { "" };
            println!("      {}. {} reps{weight}{rpe}{warmup}", n + 1, s.reps);
        }
    }
    println!("  volume:  {:.0} kg", w.volume());
}

pub(crate) async fn cmd_workout_show(svc: &FitnessService, id: &str, json: bool) -> Result<()> {
    let Some(workout) = svc.store().get_workout_by_id(id).await? else {
        nothing_found(json, &format!("No workout with id '{id}'"));
    };
    if json {
        print_json(&workout)?;
    } else {
        print_workout(&workout);
    }
    Ok(())
}

pub(crate) async fn cmd_workout_list(
    svc: &FitnessService,
    user_id: &str,
    limit: i64,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct WorkoutRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Started")]
        started: String,
        #[tabled(rename = "Status")]
        status: String,
        #[tabled(rename = "Exercises")]
        exercises: usize,
        #[tabled(rename = "Volume (kg)")]
        volume: String,
    }

    let workouts = svc.store().get_workouts_for_user(user_id, limit).await?;
    if workouts.is_empty() {
        empty_list(json, "No workouts yet. Use `liftlog workout start <name>`");
    }
    if json {
        return print_json(&workouts);
    }

    let rows: Vec<WorkoutRow> = workouts
        .iter()
        .map(|w| WorkoutRow {
            id: w.id.clone(),
            name: truncate(&w.name, 30),
            started: local_time(&w.start_time),
            status: if w.is_completed { "done" } else { "open" }.to_string(),
            exercises: w.exercises.len(),
            volume: format!("{:.0}", w.volume()),
        })
        .collect();
    println!("{}", render_table(&rows, 4..));
    Ok(())
}

pub(crate) async fn cmd_workout_delete(svc: &FitnessService, id: &str, json: bool) -> Result<()> {
    if !svc.store().delete_workout(id).await? {
        nothing_found(json, &format!("No workout with id '{id}'"));
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted workout {id}");
    }
    Ok(())
}

/// `<exercise>:<sets>[x<reps>][@<kg>]`, e.g. `squat:5x5@100`.
pub(crate) fn parse_template_exercise(s: &str) -> Result<NewTemplateExercise> {
    let (exercise_id, plan) = s
        .split_once(':')
        .with_context(|| format!("Invalid exercise '{s}'. Use <id>:<sets>[x<reps>][@<kg>]"))?;
    if exercise_id.trim().is_empty() {
        bail!("Missing exercise id in '{s}'");
    }
    let (plan, weight) = match plan.split_once('@') {
        Some((plan, w)) => (
            plan,
            Some(
                w.trim()
                    .parse::<f64>()
                    .with_context(|| format!("Invalid weight in '{s}'"))?,
            ),
        ),
        None => (plan, None),
    };
    let (sets, reps) = match plan.split_once('x') {
        Some((sets, reps)) => (
            sets,
            Some(
                reps.trim()
                    .parse::<i64>()
                    .with_context(|| format!("Invalid reps in '{s}'"))?,
            ),
        ),
        None => (plan, None),
    };
    let target_sets = sets
        .trim()
        .parse::<i64>()
        .with_context(|| format!("Invalid set count in '{s}'"))?;

    Ok(NewTemplateExercise {
        exercise_id: exercise_id.trim().to_string(),
        target_sets,
        target_reps: reps,
        target_weight_kg: weight,
        rest_secs: None,
    })
}

pub(crate) async fn cmd_template_create(
    svc: &FitnessService,
    user_id: &str,
    name: &str,
    description: Option<String>,
    exercises: &[String],
    json: bool,
) -> Result<()> {
    let exercises = exercises
        .iter()
        .map(|s| parse_template_exercise(s))
        .collect::<Result<Vec<_>>>()?;
    let template = svc
        .store()
        .create_template(NewWorkoutTemplate {
            id: new_id(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            description,
            is_public: false,
            exercises,
        })
        .await?;

    if json {
        print_json(&template)?;
    } else {
        println!(
            "Created template '{}' with {} exercises (id: {})",
            template.name,
            template.exercises.len(),
            template.id
        );
    }
    Ok(())
}

pub(crate) async fn cmd_template_list(svc: &FitnessService, user_id: &str, json: bool) -> Result<()> {
    let templates = svc.store().get_templates_for_user(user_id).await?;
    if templates.is_empty() {
        empty_list(json, "No templates yet. Use `liftlog template create`");
    }
    if json {
        return print_json(&templates);
    }
    for t in &templates {
        println!("{} (id: {})", t.name, t.id);
        for e in &t.exercises {
            let reps = e.target_reps.map(|r| format!("x{r}")).unwrap_or_default();
            let weight = e
                .target_weight_kg
                .map(|w| format!(" @ {w}kg"))
                .unwrap_or_default();
            println!("  {}. {} {}{reps}{weight}", e.order_index + 1, e.exercise_id, e.target_sets);
        }
    }
    Ok(())
}

pub(crate) async fn cmd_template_delete(svc: &FitnessService, id: &str, json: bool) -> Result<()> {
    if !svc.store().delete_template(id).await? {
        nothing_found(json, &format!("No template with id '{id}'"));
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted template {id}");
    }
    Ok(())
}

pub(crate) async fn cmd_records(
    svc: &FitnessService,
    user_id: &str,
    exercise: Option<&str>,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct RecordRow {
        #[tabled(rename = "Exercise")]
        exercise: String,
        #[tabled(rename = "Type")]
        kind: String,
        #[tabled(rename = "Achieved")]
        achieved: String,
        #[tabled(rename = "Value")]
        value: String,
    }

    let records = svc.store().get_personal_records(user_id, exercise).await?;
    if records.is_empty() {
        empty_list(json, "No personal records yet");
    }
    if json {
        return print_json(&records);
    }

    let rows: Vec<RecordRow> = records
        .iter()
        .map(|r| RecordRow {
            exercise: r.exercise_id.clone(),
            kind: r.kind.to_string(),
            achieved: local_time(&r.achieved_at),
            value: format!("{:.1} {}", r.value, r.unit),
        })
        .collect();
    println!("{}", render_table(&rows, 3..));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_template_exercise_full() {
        let e = parse_template_exercise("squat:5x5@100").unwrap();
        assert_eq!(e.exercise_id, "squat");
        assert_eq!(e.target_sets, 5);
        assert_eq!(e.target_reps, Some(5));
        assert_eq!(e.target_weight_kg, Some(100.0));
    }

    #[test]
    fn test_parse_template_exercise_sets_only() {
        let e = parse_template_exercise("pull-up:3").unwrap();
        assert_eq!(e.exercise_id, "pull-up");
        assert_eq!(e.target_sets, 3);
        assert!(e.target_reps.is_none());
        assert!(e.target_weight_kg.is_none());
    }

    #[test]
    fn test_parse_template_exercise_invalid() {
        assert!(parse_template_exercise("squat").is_err());
        assert!(parse_template_exercise(":3").is_err());
        assert!(parse_template_exercise("squat:three").is_err());
        assert!(parse_template_exercise("squat:3xfive").is_err());
    }

    #[tokio::test]
    async fn test_template_then_workout_flow() {
        let svc = FitnessService::open_in_memory().await.unwrap();
        svc.ensure_user("u1", "Ada", "ada@example.com").await.unwrap();

        cmd_template_create(
            &svc,
            "u1",
            "Legs",
            None,
            &["squat:5x5@100".to_string(), "deadlift:1x5".to_string()],
            true,
        )
        .await
        .unwrap();
        let templates = svc.store().get_templates_for_user("u1").await.unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].exercises[1].exercise_id, "deadlift");

        cmd_workout_start(&svc, "u1", "Leg day", Some(&templates[0].id), None, true)
            .await
            .unwrap();
        let workouts = svc.store().get_workouts_for_user("u1", 10).await.unwrap();
        assert_eq!(workouts[0].exercises.len(), 2);
    }
}
