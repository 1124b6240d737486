//! The fixed set of rooms a patient can be in.

use core::fmt;

/// A room in a patient's residence.
///
/// Rooms form a fixed cycle (see [`Room::next`]) that the simulator walks
/// when a patient changes location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Room {
    #[default]
    LivingRoom,
    Kitchen,
    Bedroom,
    Bathroom,
    Hallway,
}

impl Room {
    /// Every room, in cycle order.
    pub const ALL: [Room; 5] = [
        Room::LivingRoom,
        Room::Kitchen,
        Room::Bedroom,
        Room::Bathroom,
        Room::Hallway,
    ];

    /// The next room in the cycle, wrapping at the end.
    pub fn next(self) -> Self {
        match self {
            Room::LivingRoom => Room::Kitchen,
            Room::Kitchen => Room::Bedroom,
            Room::Bedroom => Room::Bathroom,
            Room::Bathroom => Room::Hallway,
            Room::Hallway => Room::LivingRoom,
        }
    }

    /// Typical temperature of this room, in °C.
    pub fn baseline_temperature(&self) -> f64 {
        match self {
            Room::LivingRoom => 22.0,
            Room::Kitchen => 23.5,
            Room::Bedroom => 20.5,
            Room::Bathroom => 24.0,
            Room::Hallway => 19.5,
        }
    }

    /// Returns the display name for this room.
    pub fn name(&self) -> &'static str {
        match self {
            Room::LivingRoom => "Living room",
            Room::Kitchen => "Kitchen",
            Room::Bedroom => "Bedroom",
            Room::Bathroom => "Bathroom",
            Room::Hallway => "Hallway",
        }
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_visits_every_room_once() {
        let mut room = Room::LivingRoom;
        let mut seen = Vec::new();
        for _ in 0..Room::ALL.len() {
            seen.push(room);
            room = room.next();
        }
        assert_eq!(room, Room::LivingRoom);
        assert_eq!(seen, Room::ALL.to_vec());
    }

    #[test]
    fn baselines_are_within_temperature_bounds() {
        for room in Room::ALL {
            let t = room.baseline_temperature();
            assert!((crate::MIN_TEMPERATURE..=crate::MAX_TEMPERATURE).contains(&t));
        }
    }
}
