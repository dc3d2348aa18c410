use anyhow::{Result, bail};

use liftlog_core::models::{ActivityLevel, FitnessGoal, NewUser, NewUserProfile, UserProfile};
use liftlog_core::service::FitnessService;

use super::helpers::{local_time, nothing_found, print_json};

pub(crate) async fn cmd_init(svc: &FitnessService, user_id: &str, json: bool) -> Result<()> {
    let store = svc.store();
    let user = svc
        .ensure_user(user_id, "Local user", &format!("{user_id}@localhost"))
        .await?;
    let exercises = store.count_exercises().await?;

    if json {
        print_json(&serde_json::json!({
            "database": store.location().to_string(),
            "user": user,
            "exercises": exercises,
        }))?;
    } else {
        println!("Database: {}", store.location());
        println!("User: {} ({})", user.name, user.id);
        println!("Exercise catalog: {exercises} exercises");
    }
    Ok(())
}

pub(crate) async fn cmd_user_add(
    svc: &FitnessService,
    id: &str,
    name: &str,
    email: &str,
    json: bool,
) -> Result<()> {
    let user = svc
        .store()
        .create_user(NewUser {
            id: id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            avatar: None,
        })
        .await?;

    if json {
        print_json(&user)?;
    } else {
        println!("Added user {} <{}> (id: {})", user.name, user.email, user.id);
    }
    Ok(())
}

pub(crate) async fn cmd_user_show(svc: &FitnessService, user_id: &str, json: bool) -> Result<()> {
    let Some(user) = svc.store().get_user_by_id(user_id).await? else {
        nothing_found(json, &format!("No user '{user_id}'. Run `liftlog init` first"));
    };

    if json {
        print_json(&user)?;
    } else {
        println!("{} <{}>", user.name, user.email);
        println!("  id:      {}", user.id);
        println!("  created: {}", local_time(&user.created_at));
    }
    Ok(())
}

#[derive(Debug, Default)]
pub(crate) struct ProfileArgs {
    pub age: Option<i64>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub body_fat_pct: Option<f64>,
    pub activity_level: Option<ActivityLevel>,
    pub fitness_goal: Option<FitnessGoal>,
    pub calories: Option<i64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
}

/// Applies the given fields on top of the stored profile.
fn merge_profile(user_id: &str, current: Option<UserProfile>, args: ProfileArgs) -> NewUserProfile {
    let base = current.map_or_else(
        || NewUserProfile {
            user_id: user_id.to_string(),
            age: None,
            height_cm: None,
            weight_kg: None,
            body_fat_pct: None,
            activity_level: ActivityLevel::ModeratelyActive,
            fitness_goal: FitnessGoal::MaintainWeight,
            target_calories: None,
            target_protein: None,
            target_carbs: None,
            target_fat: None,
        },
        |p| NewUserProfile {
            user_id: p.user_id,
            age: p.age,
            height_cm: p.height_cm,
            weight_kg: p.weight_kg,
            body_fat_pct: p.body_fat_pct,
            activity_level: p.activity_level,
            fitness_goal: p.fitness_goal,
            target_calories: p.target_calories,
            target_protein: p.target_protein,
            target_carbs: p.target_carbs,
            target_fat: p.target_fat,
        },
    );

    NewUserProfile {
        age: args.age.or(base.age),
        height_cm: args.height_cm.or(base.height_cm),
        weight_kg: args.weight_kg.or(base.weight_kg),
        body_fat_pct: args.body_fat_pct.or(base.body_fat_pct),
        activity_level: args.activity_level.unwrap_or(base.activity_level),
        fitness_goal: args.fitness_goal.unwrap_or(base.fitness_goal),
        target_calories: args.calories.or(base.target_calories),
        target_protein: args.protein.or(base.target_protein),
        target_carbs: args.carbs.or(base.target_carbs),
        target_fat: args.fat.or(base.target_fat),
        ..base
    }
}

pub(crate) async fn cmd_profile_set(
    svc: &FitnessService,
    user_id: &str,
    args: ProfileArgs,
    json: bool,
) -> Result<()> {
    if args.calories.is_some_and(|c| c <= 0) {
        bail!("Calorie target must be greater than 0");
    }
    for (label, value) in [
        ("protein", args.protein),
        ("carbs", args.carbs),
        ("fat", args.fat),
        ("height", args.height_cm),
        ("weight", args.weight_kg),
    ] {
        if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
            bail!("{label} must not be negative");
        }
    }

    let store = svc.store();
    let current = store.get_user_profile(user_id).await?;
    let profile = store
        .upsert_user_profile(merge_profile(user_id, current, args))
        .await?;

    if json {
        print_json(&profile)?;
    } else {
        println!("Profile updated");
        print_profile(&profile);
    }
    Ok(())
}

pub(crate) async fn cmd_profile_show(svc: &FitnessService, user_id: &str, json: bool) -> Result<()> {
    let Some(profile) = svc.store().get_user_profile(user_id).await? else {
        nothing_found(
            json,
            &format!("No profile for '{user_id}'. Use `liftlog profile set`"),
        );
    };

    if json {
        print_json(&profile)?;
    } else {
        print_profile(&profile);
    }
    Ok(())
}

fn print_profile(p: &UserProfile) {
    let show = |v: Option<f64>, unit: &str| v.map_or("-".to_string(), |v| format!("{v:.1}{unit}"));
    println!("  activity: {}", p.activity_level);
    println!("  goal:     {}", p.fitness_goal);
    println!("  age:      {}", p.age.map_or("-".to_string(), |a| a.to_string()));
    println!("  height:   {}", show(p.height_cm, " cm"));
    println!("  weight:   {}", show(p.weight_kg, " kg"));
    println!("  body fat: {}", show(p.body_fat_pct, "%"));
    if let Some(t) = p.targets() {
        let cal = t.calories.map_or("-".to_string(), |c| c.to_string());
        println!(
            "  targets:  {cal} kcal | P:{} C:{} F:{}",
            show(t.protein, "g"),
            show(t.carbs, "g"),
            show(t.fat, "g")
        );
    }
}
