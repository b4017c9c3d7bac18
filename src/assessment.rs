//! Derivation of grade, archetype and curriculum recommendations from the
//! five skill scores of an assessment.
//!
//! Everything here is pure: the same function backs the live preview
//! endpoint and the server-side write path, so a stored assessment always
//! carries the grade and archetype of its own scores.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::curriculum::{self, Level};
use crate::error::AppError;

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillParameter {
    Technique,
    Tactics,
    Power,
    Defense,
    Consistency,
}

impl SkillParameter {
    /// Declaration order doubles as the tie-break order.
    pub const ALL: [SkillParameter; 5] = [
        SkillParameter::Technique,
        SkillParameter::Tactics,
        SkillParameter::Power,
        SkillParameter::Defense,
        SkillParameter::Consistency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillParameter::Technique => "technique",
            SkillParameter::Tactics => "tactics",
            SkillParameter::Power => "power",
            SkillParameter::Defense => "defense",
            SkillParameter::Consistency => "consistency",
        }
    }

    /// Prefix used by curriculum module codes.
    pub fn code(&self) -> &'static str {
        match self {
            SkillParameter::Technique => "TEC",
            SkillParameter::Tactics => "TAC",
            SkillParameter::Power => "POW",
            SkillParameter::Defense => "DEF",
            SkillParameter::Consistency => "CON",
        }
    }
}

impl fmt::Display for SkillParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SkillScores {
    #[validate(range(min = 1, max = 10, message = "Technique must be between 1 and 10"))]
    pub technique: u8,
    #[validate(range(min = 1, max = 10, message = "Tactics must be between 1 and 10"))]
    pub tactics: u8,
    #[validate(range(min = 1, max = 10, message = "Power must be between 1 and 10"))]
    pub power: u8,
    #[validate(range(min = 1, max = 10, message = "Defense must be between 1 and 10"))]
    pub defense: u8,
    #[validate(range(min = 1, max = 10, message = "Consistency must be between 1 and 10"))]
    pub consistency: u8,
}

impl SkillScores {
    pub fn get(&self, parameter: SkillParameter) -> u8 {
        match parameter {
            SkillParameter::Technique => self.technique,
            SkillParameter::Tactics => self.tactics,
            SkillParameter::Power => self.power,
            SkillParameter::Defense => self.defense,
            SkillParameter::Consistency => self.consistency,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SkillParameter, u8)> + '_ {
        SkillParameter::ALL.iter().map(move |p| (*p, self.get(*p)))
    }

    pub fn total(&self) -> u32 {
        self.iter().map(|(_, score)| u32::from(score)).sum()
    }

    pub fn average(&self) -> f64 {
        f64::from(self.total()) / SkillParameter::ALL.len() as f64
    }

    /// Range check for callers that bypass request validation.
    pub fn check_range(&self) -> Result<(), AppError> {
        match self
            .iter()
            .find(|(_, score)| !(MIN_SCORE..=MAX_SCORE).contains(score))
        {
            Some((parameter, score)) => Err(AppError::Validation(format!(
                "{} score {} is outside {}..={}",
                parameter, score, MIN_SCORE, MAX_SCORE
            ))),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Beginner,
    Improver,
    Intermediate,
    Advanced,
    Competitor,
    Elite,
}

impl Grade {
    /// Bands over the score total (5..=50).
    pub fn from_total(total: u32) -> Self {
        match total {
            0..=14 => Grade::Beginner,
            15..=22 => Grade::Improver,
            23..=29 => Grade::Intermediate,
            30..=37 => Grade::Advanced,
            38..=44 => Grade::Competitor,
            _ => Grade::Elite,
        }
    }

    pub fn level(&self) -> Level {
        match self {
            Grade::Beginner | Grade::Improver => Level::Foundation,
            Grade::Intermediate | Grade::Advanced => Level::Development,
            Grade::Competitor | Grade::Elite => Level::Performance,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::Beginner => "beginner",
            Grade::Improver => "improver",
            Grade::Intermediate => "intermediate",
            Grade::Advanced => "advanced",
            Grade::Competitor => "competitor",
            Grade::Elite => "elite",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Grade::Beginner => "Beginner",
            Grade::Improver => "Improver",
            Grade::Intermediate => "Intermediate",
            Grade::Advanced => "Advanced",
            Grade::Competitor => "Competitor",
            Grade::Elite => "Elite",
        }
    }
}

impl FromStr for Grade {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(Grade::Beginner),
            "improver" => Ok(Grade::Improver),
            "intermediate" => Ok(Grade::Intermediate),
            "advanced" => Ok(Grade::Advanced),
            "competitor" => Ok(Grade::Competitor),
            "elite" => Ok(Grade::Elite),
            _ => Err(AppError::Internal(format!("Unknown grade: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    AllRounder,
    Technician,
    Strategist,
    PowerHitter,
    WallDefender,
    Grinder,
}

impl Archetype {
    pub fn for_strength(parameter: SkillParameter) -> Self {
        match parameter {
            SkillParameter::Technique => Archetype::Technician,
            SkillParameter::Tactics => Archetype::Strategist,
            SkillParameter::Power => Archetype::PowerHitter,
            SkillParameter::Defense => Archetype::WallDefender,
            SkillParameter::Consistency => Archetype::Grinder,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::AllRounder => "all_rounder",
            Archetype::Technician => "technician",
            Archetype::Strategist => "strategist",
            Archetype::PowerHitter => "power_hitter",
            Archetype::WallDefender => "wall_defender",
            Archetype::Grinder => "grinder",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Archetype::AllRounder => "All-Rounder",
            Archetype::Technician => "Technician",
            Archetype::Strategist => "Strategist",
            Archetype::PowerHitter => "Power Hitter",
            Archetype::WallDefender => "Wall Defender",
            Archetype::Grinder => "Grinder",
        }
    }
}

impl FromStr for Archetype {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all_rounder" => Ok(Archetype::AllRounder),
            "technician" => Ok(Archetype::Technician),
            "strategist" => Ok(Archetype::Strategist),
            "power_hitter" => Ok(Archetype::PowerHitter),
            "wall_defender" => Ok(Archetype::WallDefender),
            "grinder" => Ok(Archetype::Grinder),
            _ => Err(AppError::Internal(format!("Unknown archetype: {}", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleRecommendation {
    pub parameter: SkillParameter,
    pub score: u8,
    pub module_code: &'static str,
    pub module_title: &'static str,
    pub level: Level,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Derivation {
    pub total: u32,
    pub average: f64,
    pub grade: Grade,
    pub grade_label: &'static str,
    pub archetype: Archetype,
    pub archetype_label: &'static str,
    pub level: Level,
    pub strongest: SkillParameter,
    pub weakest: Vec<SkillParameter>,
    pub recommendations: Vec<ModuleRecommendation>,
}

const RECOMMENDED_PARAMETERS: usize = 2;

/// Highest score wins; earlier parameters win ties.
fn strongest(scores: &SkillScores) -> SkillParameter {
    scores
        .iter()
        .fold(None, |best: Option<(SkillParameter, u8)>, (p, s)| match best {
            Some((_, best_score)) if best_score >= s => best,
            _ => Some((p, s)),
        })
        .map(|(p, _)| p)
        .unwrap_or(SkillParameter::Technique)
}

fn weakest(scores: &SkillScores, count: usize) -> Vec<SkillParameter> {
    let mut ranked: Vec<(SkillParameter, u8)> = scores.iter().collect();
    // Stable sort keeps declaration order among equal scores.
    ranked.sort_by_key(|(_, score)| *score);
    ranked.into_iter().take(count).map(|(p, _)| p).collect()
}

pub fn archetype(scores: &SkillScores) -> Archetype {
    let max = scores.iter().map(|(_, s)| s).max().unwrap_or(MIN_SCORE);
    let min = scores.iter().map(|(_, s)| s).min().unwrap_or(MIN_SCORE);

    if max - min <= 1 {
        Archetype::AllRounder
    } else {
        Archetype::for_strength(strongest(scores))
    }
}

pub fn recommend(scores: &SkillScores, grade: Grade) -> Vec<ModuleRecommendation> {
    weakest(scores, RECOMMENDED_PARAMETERS)
        .into_iter()
        .filter_map(|parameter| {
            let score = scores.get(parameter);
            let level = grade.level().min(Level::for_score(score));
            curriculum::module_for(parameter, level).map(|module| ModuleRecommendation {
                parameter,
                score,
                module_code: module.code,
                module_title: module.title,
                level,
            })
        })
        .collect()
}

pub fn derive(scores: &SkillScores) -> Derivation {
    let total = scores.total();
    let grade = Grade::from_total(total);
    let archetype = archetype(scores);

    Derivation {
        total,
        average: scores.average(),
        grade,
        grade_label: grade.label(),
        archetype,
        archetype_label: archetype.label(),
        level: grade.level(),
        strongest: strongest(scores),
        weakest: weakest(scores, RECOMMENDED_PARAMETERS),
        recommendations: recommend(scores, grade),
    }
}
