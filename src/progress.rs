use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::assessment::{Archetype, Grade, SkillParameter};
use crate::curriculum::{self, Level};
use crate::models::{Assessment, DrillScore};

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ProgressPoint {
    pub assessed_at: DateTime<Utc>,
    pub score: u8,
}

#[derive(Debug, Serialize, Clone)]
pub struct ParameterSeries {
    pub parameter: SkillParameter,
    pub points: Vec<ProgressPoint>,
}

#[derive(Debug, Serialize, Clone)]
pub struct GradePoint {
    pub assessment_id: i64,
    pub assessed_at: DateTime<Utc>,
    pub grade: Grade,
    pub archetype: Archetype,
    pub total: u32,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ParameterDelta {
    pub parameter: SkillParameter,
    pub first: u8,
    pub latest: u8,
    pub change: i32,
}

#[derive(Debug, Serialize, Clone)]
pub struct ProgressDeltas {
    pub parameters: Vec<ParameterDelta>,
    pub total_change: i32,
    pub since: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ProgressReport {
    pub player_id: i64,
    pub assessments: usize,
    pub attended_sessions: i64,
    pub series: Vec<ParameterSeries>,
    pub grades: Vec<GradePoint>,
    pub deltas: Option<ProgressDeltas>,
}

impl ProgressReport {
    pub fn build(player_id: i64, assessments: &[Assessment], attended_sessions: i64) -> Self {
        let mut ordered: Vec<&Assessment> = assessments.iter().collect();
        ordered.sort_by_key(|a| (a.assessed_at, a.id));

        let series = SkillParameter::ALL
            .iter()
            .map(|parameter| ParameterSeries {
                parameter: *parameter,
                points: ordered
                    .iter()
                    .map(|a| ProgressPoint {
                        assessed_at: a.assessed_at,
                        score: a.scores.get(*parameter),
                    })
                    .collect(),
            })
            .collect();

        let grades = ordered
            .iter()
            .map(|a| GradePoint {
                assessment_id: a.id,
                assessed_at: a.assessed_at,
                grade: a.grade,
                archetype: a.archetype,
                total: a.scores.total(),
            })
            .collect();

        let deltas = match (ordered.first(), ordered.last()) {
            (Some(first), Some(latest)) => Some(ProgressDeltas {
                parameters: SkillParameter::ALL
                    .iter()
                    .map(|parameter| {
                        let from = first.scores.get(*parameter);
                        let to = latest.scores.get(*parameter);
                        ParameterDelta {
                            parameter: *parameter,
                            first: from,
                            latest: to,
                            change: i32::from(to) - i32::from(from),
                        }
                    })
                    .collect(),
                total_change: latest.scores.total() as i32 - first.scores.total() as i32,
                since: first.assessed_at,
            }),
            _ => None,
        };

        Self {
            player_id,
            assessments: ordered.len(),
            attended_sessions,
            series,
            grades,
            deltas,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct DrillProgress {
    pub drill_code: &'static str,
    pub name: &'static str,
    pub attempts: usize,
    pub latest_score: Option<u8>,
    pub best_score: Option<u8>,
    pub mastered: bool,
}

#[derive(Debug, Serialize, Clone)]
pub struct ModuleProgress {
    pub module_code: &'static str,
    pub title: &'static str,
    pub parameter: SkillParameter,
    pub level: Level,
    pub drills: Vec<DrillProgress>,
    pub average: Option<f64>,
    pub drills_mastered: usize,
    pub total_drills: usize,
    pub mastered: bool,
}

/// Per-module drill summary for every module with at least one recorded score.
pub fn module_progress(scores: &[DrillScore], mastery_threshold: u8) -> Vec<ModuleProgress> {
    let mut by_drill: HashMap<&str, Vec<&DrillScore>> = HashMap::new();
    for score in scores {
        by_drill.entry(score.drill_code.as_str()).or_default().push(score);
    }
    for attempts in by_drill.values_mut() {
        attempts.sort_by_key(|s| (s.recorded_at, s.id));
    }

    curriculum::all_modules()
        .iter()
        .filter(|module| {
            module
                .drills
                .iter()
                .any(|drill| by_drill.contains_key(drill.code))
        })
        .map(|module| {
            let drills: Vec<DrillProgress> = module
                .drills
                .iter()
                .map(|drill| {
                    let attempts = by_drill.get(drill.code).map(Vec::as_slice).unwrap_or(&[]);
                    let latest_score = attempts.last().map(|s| s.score);
                    DrillProgress {
                        drill_code: drill.code,
                        name: drill.name,
                        attempts: attempts.len(),
                        latest_score,
                        best_score: attempts.iter().map(|s| s.score).max(),
                        mastered: latest_score.is_some_and(|s| s >= mastery_threshold),
                    }
                })
                .collect();

            let latest: Vec<u8> = drills.iter().filter_map(|d| d.latest_score).collect();
            let average = if latest.is_empty() {
                None
            } else {
                Some(latest.iter().map(|s| f64::from(*s)).sum::<f64>() / latest.len() as f64)
            };
            let drills_mastered = drills.iter().filter(|d| d.mastered).count();
            let total_drills = drills.len();

            ModuleProgress {
                module_code: module.code,
                title: module.title,
                parameter: module.parameter,
                level: module.level,
                drills,
                average,
                drills_mastered,
                total_drills,
                mastered: drills_mastered == total_drills,
            }
        })
        .collect()
}
