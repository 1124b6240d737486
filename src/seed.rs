//! Seed facilities: the built-in demo graph and JSON seed files.

use std::path::Path;

use anyhow::{Context, Result};
use carewatch_types::{
    ActivityLevel, Facility, Meal, MealStatus, MealType, MovementHistory, Patient, Room,
};
use chrono::NaiveTime;

/// Load facilities from a JSON file holding an array of facility records.
pub fn load(path: &Path) -> Result<Vec<Facility>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file {}", path.display()))?;
    parse(&contents).with_context(|| format!("Invalid seed file {}", path.display()))
}

/// Parse facilities from JSON.
pub fn parse(json: &str) -> Result<Vec<Facility>> {
    let facilities: Vec<Facility> = serde_json::from_str(json)?;
    for patient in facilities.iter().flat_map(|f| f.patients.iter()) {
        patient.check_invariants()?;
    }
    Ok(facilities)
}

fn meal(meal_type: MealType, hour: u32, minute: u32, status: MealStatus) -> Meal {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default();
    Meal::new(meal_type, time, status)
}

fn history(pattern: &[ActivityLevel]) -> MovementHistory {
    let mut history = MovementHistory::default();
    for level in pattern.iter().cycle().take(history.len()) {
        history.push(*level);
    }
    history
}

/// The demo graph: one populated residence and one that is still empty.
pub fn demo() -> Vec<Facility> {
    use ActivityLevel::{Low, None as Still, Normal};

    let olivos = Facility::builder("res-olivos", "Residencia Los Olivos")
        .patient(
            Patient::builder("pat-9f8e7d6c", "María García")
                .age(84)
                .avatar("avatars/maria.png")
                .room(Room::LivingRoom)
                .moving(Normal)
                .movement_history(history(&[Normal, Normal, Low, Still, Low, Normal, Normal, Low]))
                .steps(1450, 3000)
                .past_week([2850, 3120, 2400, 3300, 2980, 2710])
                .last_meal(meal(MealType::Breakfast, 8, 30, MealStatus::Completed))
                .build(),
        )
        .patient(
            Patient::builder("pat-3b2a1c0d", "José Fernández")
                .age(79)
                .avatar("avatars/jose.png")
                .room(Room::Bedroom)
                .movement_history(history(&[Still, Still, Low, Still]))
                .steps(620, 2000)
                .past_week([1500, 1820, 900, 2100, 1750, 1300])
                .last_meal(meal(MealType::Breakfast, 9, 5, MealStatus::Skipped))
                .build(),
        )
        .patient(
            Patient::builder("pat-7e6d5c4b", "Carmen López")
                .age(91)
                .avatar("avatars/carmen.png")
                .room(Room::Kitchen)
                .moving(Low)
                .movement_history(history(&[Low, Low, Still, Normal]))
                .steps(2210, 2500)
                .past_week([2600, 2450, 2700, 2300, 2520, 2480])
                .last_meal(meal(MealType::Lunch, 13, 15, MealStatus::Completed))
                .build(),
        )
        .patient(
            Patient::builder("pat-1a2b3c4d", "Antonio Ruiz")
                .age(76)
                .avatar("avatars/antonio.png")
                .room(Room::Hallway)
                .moving(Normal)
                .movement_history(history(&[Normal, Normal, Normal, Low]))
                .steps(3400, 3500)
                .past_week([3600, 3550, 3800, 3420, 3900, 3510])
                .build(),
        )
        .build();

    vec![olivos, Facility::new("res-pinar", "Residencia El Pinar")]
}
