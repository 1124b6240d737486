//! Prompt construction for patient summaries.

use carewatch_types::Patient;

/// Build the text-generation prompt for a patient.
///
/// A detected fall must lead the summary as an urgent alert; otherwise the
/// model gives a general, reassuring status update.
pub fn build_prompt(patient: &Patient) -> String {
    let trend = patient
        .movement_history
        .iter()
        .map(|level| level.label())
        .collect::<Vec<_>>()
        .join(", ");

    let mut prompt = String::from(
        "Analyze the following data for an elderly patient and give a concise, \
         easy-to-understand summary of their current state and recent activity.\n\
         Use a kind and reassuring tone.\n\
         If a fall was detected, open the summary by flagging it as an urgent alert.\n\
         Otherwise, give a general status update.\n\
         Keep the summary to 2-3 sentences.\n\n\
         Patient data:\n",
    );

    prompt.push_str(&format!("- Name: {}, age {}\n", patient.name, patient.age));
    prompt.push_str(&format!("- Current room: {}\n", patient.location));
    prompt.push_str(&format!("- Moving: {}\n", patient.is_moving));
    prompt.push_str(&format!("- Current activity level: {}\n", patient.activity_level));
    prompt.push_str(&format!("- Fall detected: {}\n", patient.fall_detected()));
    if let Some(at) = patient.fall_timestamp {
        prompt.push_str(&format!("- Fall time: {}\n", at.to_rfc3339()));
    }
    prompt.push_str(&format!(
        "- Daily steps: {} of {} goal\n",
        patient.step_count, patient.step_goal
    ));
    prompt.push_str(&format!(
        "- Last meal: {} at {} ({:?})\n",
        patient.last_meal.meal_type.label(),
        patient.last_meal.time.format("%H:%M"),
        patient.last_meal.status
    ));
    prompt.push_str(&format!("- Activity trend over the last 24 readings: {}\n", trend));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use carewatch_types::{PatientUpdate, Room};

    fn patient() -> Patient {
        Patient::builder("pat-1", "Elena Vargas")
            .age(82)
            .room(Room::Kitchen)
            .steps(1450, 3000)
            .build()
    }

    #[test]
    fn prompt_includes_live_fields() {
        let prompt = build_prompt(&patient());
        assert!(prompt.contains("Current room: Kitchen"));
        assert!(prompt.contains("Daily steps: 1450 of 3000 goal"));
        assert!(prompt.contains("Fall detected: false"));
        assert!(!prompt.contains("Fall time"));
    }

    #[test]
    fn prompt_includes_fall_time_when_fallen() {
        let fallen = patient().merged(&PatientUpdate::raise_fall(chrono::Utc::now()));
        let prompt = build_prompt(&fallen);
        assert!(prompt.contains("Fall detected: true"));
        assert!(prompt.contains("Fall time: "));
    }

    #[test]
    fn trend_lists_all_readings() {
        let prompt = build_prompt(&patient());
        let trend_line = prompt.lines().find(|l| l.contains("Activity trend")).unwrap();
        assert_eq!(trend_line.matches("none").count(), 24);
    }
}
