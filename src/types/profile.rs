//! User profile and the physiological multipliers derived from it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FitnessLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    #[default]
    Male,
    Female,
}

/// Immutable description of the person wearing the sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    height_cm: f64,
    weight_kg: f64,
    fitness_level: FitnessLevel,
    age: u32,
    gender: Gender,
}

impl UserProfile {
    pub const fn new(
        height_cm: f64,
        weight_kg: f64,
        fitness_level: FitnessLevel,
        age: u32,
        gender: Gender,
    ) -> Self {
        Self {
            height_cm,
            weight_kg,
            fitness_level,
            age,
            gender,
        }
    }

    pub const fn height_cm(&self) -> f64 {
        self.height_cm
    }

    pub const fn weight_kg(&self) -> f64 {
        self.weight_kg
    }

    pub const fn fitness_level(&self) -> FitnessLevel {
        self.fitness_level
    }

    pub const fn age(&self) -> u32 {
        self.age
    }

    pub const fn gender(&self) -> Gender {
        self.gender
    }

    /// Amplitude multiplier: fitter and male users move the sensor harder.
    pub fn strength_factor(&self) -> f64 {
        let mut factor = match self.fitness_level {
            FitnessLevel::Beginner => 0.7,
            FitnessLevel::Intermediate => 1.0,
            FitnessLevel::Advanced => 1.3,
        };
        if self.gender == Gender::Male {
            factor *= 1.15;
        }
        factor
    }

    /// Tempo multiplier applied to the archetype frequency.
    pub fn speed_factor(&self) -> f64 {
        let mut factor = match self.fitness_level {
            FitnessLevel::Beginner => 0.8,
            FitnessLevel::Intermediate => 1.0,
            FitnessLevel::Advanced => 1.2,
        };
        if self.age > 50 {
            factor *= 0.9;
        } else if self.age < 25 {
            factor *= 1.1;
        }
        factor
    }

    /// Five reference profiles used for dataset generation.
    pub fn reference_profiles() -> Vec<Self> {
        vec![
            Self::new(175.0, 70.0, FitnessLevel::Beginner, 25, Gender::Male),
            Self::new(165.0, 55.0, FitnessLevel::Intermediate, 30, Gender::Female),
            Self::new(180.0, 85.0, FitnessLevel::Advanced, 28, Gender::Male),
            Self::new(170.0, 65.0, FitnessLevel::Intermediate, 35, Gender::Female),
            Self::new(178.0, 78.0, FitnessLevel::Beginner, 22, Gender::Male),
        ]
    }
}

impl Default for UserProfile {
    fn default() -> Self {
        Self::new(175.0, 70.0, FitnessLevel::Intermediate, 25, Gender::Male)
    }
}
