//! Meal tracking.

use chrono::NaiveTime;

/// Which meal of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealType {
    /// The next meal in the daily cycle.
    pub fn next(self) -> Self {
        match self {
            MealType::Breakfast => MealType::Lunch,
            MealType::Lunch => MealType::Dinner,
            MealType::Dinner => MealType::Breakfast,
        }
    }

    /// Returns the display label for this meal.
    pub fn label(&self) -> &'static str {
        match self {
            MealType::Breakfast => "Breakfast",
            MealType::Lunch => "Lunch",
            MealType::Dinner => "Dinner",
        }
    }
}

/// Whether the patient ate the meal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MealStatus {
    Completed,
    Skipped,
    Pending,
}

/// The most recent meal recorded for a patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Meal {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub meal_type: MealType,
    pub time: NaiveTime,
    pub status: MealStatus,
}

impl Meal {
    /// Create a meal record.
    pub fn new(meal_type: MealType, time: NaiveTime, status: MealStatus) -> Self {
        Self {
            meal_type,
            time,
            status,
        }
    }

    /// The record for the next meal in the cycle.
    pub fn advance(&self, time: NaiveTime, status: MealStatus) -> Self {
        Self::new(self.meal_type.next(), time, status)
    }
}

impl Default for Meal {
    fn default() -> Self {
        Self {
            meal_type: MealType::Breakfast,
            time: NaiveTime::from_hms_opt(8, 30, 0).unwrap_or_default(),
            status: MealStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meal_cycle_wraps() {
        assert_eq!(MealType::Breakfast.next(), MealType::Lunch);
        assert_eq!(MealType::Lunch.next(), MealType::Dinner);
        assert_eq!(MealType::Dinner.next(), MealType::Breakfast);
    }

    #[test]
    fn advance_moves_to_next_meal() {
        let lunch_time = NaiveTime::from_hms_opt(13, 15, 0).unwrap();
        let meal = Meal::default().advance(lunch_time, MealStatus::Skipped);

        assert_eq!(meal.meal_type, MealType::Lunch);
        assert_eq!(meal.time, lunch_time);
        assert_eq!(meal.status, MealStatus::Skipped);
    }
}
