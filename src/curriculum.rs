use serde::{Deserialize, Serialize};

use crate::assessment::SkillParameter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Foundation,
    Development,
    Performance,
}

impl Level {
    pub fn for_score(score: u8) -> Self {
        match score {
            0..=3 => Level::Foundation,
            4..=6 => Level::Development,
            _ => Level::Performance,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Level::Foundation => "F",
            Level::Development => "D",
            Level::Performance => "P",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Drill {
    pub code: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Module {
    pub code: &'static str,
    pub title: &'static str,
    pub parameter: SkillParameter,
    pub level: Level,
    pub summary: &'static str,
    pub drills: &'static [Drill],
}

macro_rules! drill {
    ($code:literal, $name:literal, $description:literal) => {
        Drill {
            code: $code,
            name: $name,
            description: $description,
        }
    };
}

pub static CURRICULUM: &[Module] = &[
    Module {
        code: "TEC-F",
        title: "Stroke Foundations",
        parameter: SkillParameter::Technique,
        level: Level::Foundation,
        summary: "Grips, groundstrokes and a reliable underhand serve.",
        drills: &[
            drill!(
                "TEC-F-1",
                "Groundstroke ladder",
                "Fed forehands and backhands to three depth targets."
            ),
            drill!(
                "TEC-F-2",
                "Continental volley wall",
                "Volley exchanges against the wall keeping a continental grip."
            ),
            drill!("TEC-F-3", "Serve targets", "Underhand serves to the T and to the side glass."),
        ],
    },
    Module {
        code: "TEC-D",
        title: "Net Game Toolkit",
        parameter: SkillParameter::Technique,
        level: Level::Development,
        summary: "Bandeja, low volleys and the chiquita.",
        drills: &[
            drill!(
                "TEC-D-1",
                "Bandeja depth control",
                "Bandejas landing beyond the service line without bouncing off the back glass."
            ),
            drill!(
                "TEC-D-2",
                "Low volley to the feet",
                "Blocked low volleys aimed at the incoming player's feet."
            ),
            drill!(
                "TEC-D-3",
                "Chiquita from the baseline",
                "Soft dipping returns that force a low volley."
            ),
        ],
    },
    Module {
        code: "TEC-P",
        title: "Finishing Shots",
        parameter: SkillParameter::Technique,
        level: Level::Performance,
        summary: "Vibora, drop volleys and off-the-court finishes.",
        drills: &[
            drill!(
                "TEC-P-1",
                "Vibora with side spin",
                "Sliced viboras that die against the side glass."
            ),
            drill!(
                "TEC-P-2",
                "Drop volley touch",
                "Drop volleys landing within a metre of the net."
            ),
            drill!("TEC-P-3", "Smash por tres", "Flat smashes exiting over the side wall."),
        ],
    },
    Module {
        code: "TAC-F",
        title: "Court Positioning",
        parameter: SkillParameter::Tactics,
        level: Level::Foundation,
        summary: "Partner spacing, net transitions and middle-ball calls.",
        drills: &[
            drill!(
                "TAC-F-1",
                "Partner distance shadowing",
                "Pairs move as a unit keeping a racket-length gap."
            ),
            drill!(
                "TAC-F-2",
                "Net transition on lob",
                "Follow your own lob to take the net together."
            ),
            drill!(
                "TAC-F-3",
                "Middle ball communication",
                "Called ownership of balls through the centre."
            ),
        ],
    },
    Module {
        code: "TAC-D",
        title: "Point Construction",
        parameter: SkillParameter::Tactics,
        level: Level::Development,
        summary: "Winning the net and building pressure through the middle.",
        drills: &[
            drill!(
                "TAC-D-1",
                "Lob to win the net",
                "Defensive lobs converted into a net position."
            ),
            drill!(
                "TAC-D-2",
                "Attack the middle",
                "Volley sequences that open the centre of the court."
            ),
            drill!(
                "TAC-D-3",
                "Pattern against left-side smashers",
                "Deny the forehand smash with lobs to the backhand corner."
            ),
        ],
    },
    Module {
        code: "TAC-P",
        title: "Match Strategy",
        parameter: SkillParameter::Tactics,
        level: Level::Performance,
        summary: "Targeting, risk management and formation changes.",
        drills: &[
            drill!(
                "TAC-P-1",
                "Target the weaker opponent",
                "Games where every third ball must go to a nominated player."
            ),
            drill!("TAC-P-2", "Score-based risk", "Shot selection constrained by the scoreboard."),
            drill!(
                "TAC-P-3",
                "Australian formation",
                "Serve from the australian formation and recover."
            ),
        ],
    },
    Module {
        code: "POW-F",
        title: "Kinetic Chain Basics",
        parameter: SkillParameter::Power,
        level: Level::Foundation,
        summary: "Loading, rotation and a first flat smash.",
        drills: &[
            drill!("POW-F-1", "Split-step and load", "Timed split-steps before each fed ball."),
            drill!(
                "POW-F-2",
                "Medicine ball rotations",
                "Rotational throws mirroring the groundstroke swing."
            ),
            drill!("POW-F-3", "Flat smash to the fence", "Fed smashes driven into the back fence."),
        ],
    },
    Module {
        code: "POW-D",
        title: "Overhead Power",
        parameter: SkillParameter::Power,
        level: Level::Development,
        summary: "Jump footwork and the topspin rulo.",
        drills: &[
            drill!(
                "POW-D-1",
                "Smash por tres exit",
                "Smashes that clear the side wall from the service box."
            ),
            drill!("POW-D-2", "Jump smash footwork", "Crossover steps into a jumping smash."),
            drill!(
                "POW-D-3",
                "Topspin rulo",
                "Heavy topspin smashes bouncing high off the back glass."
            ),
        ],
    },
    Module {
        code: "POW-P",
        title: "Explosive Finishing",
        parameter: SkillParameter::Power,
        level: Level::Performance,
        summary: "Por cuatro smashes and counter-attacks.",
        drills: &[
            drill!(
                "POW-P-1",
                "Smash por cuatro",
                "Smashes returning over the back wall to the attacker's side."
            ),
            drill!("POW-P-2", "Kill volley footwork", "Fast feet into a put-away volley."),
            drill!(
                "POW-P-3",
                "Back glass counter-attack",
                "Aggressive drives after a back glass rebound."
            ),
        ],
    },
    Module {
        code: "DEF-F",
        title: "Glass Fundamentals",
        parameter: SkillParameter::Defense,
        level: Level::Foundation,
        summary: "Reading rebounds and a safe defensive lob.",
        drills: &[
            drill!(
                "DEF-F-1",
                "Back glass rebound reading",
                "Let the ball pass and return it after the back glass."
            ),
            drill!("DEF-F-2", "Side glass exit", "Returns after a side glass rebound."),
            drill!(
                "DEF-F-3",
                "Defensive lob height",
                "Lobs that clear a raised racket at the net."
            ),
        ],
    },
    Module {
        code: "DEF-D",
        title: "Double-Wall Play",
        parameter: SkillParameter::Defense,
        level: Level::Development,
        summary: "Double-wall recovery and the contrapared.",
        drills: &[
            drill!(
                "DEF-D-1",
                "Doble pared recovery",
                "Returns after back-then-side glass rebounds."
            ),
            drill!(
                "DEF-D-2",
                "Contrapared",
                "Hitting into your own back glass to lob from a corner."
            ),
            drill!(
                "DEF-D-3",
                "Defending the bandeja",
                "Neutralise a bandeja without losing court position."
            ),
        ],
    },
    Module {
        code: "DEF-P",
        title: "Counter-Punching",
        parameter: SkillParameter::Defense,
        level: Level::Performance,
        summary: "Turning defence into attack under pressure.",
        drills: &[
            drill!(
                "DEF-P-1",
                "Bajada from the back glass",
                "Overhead drives after the ball rebounds high off the glass."
            ),
            drill!(
                "DEF-P-2",
                "Chiquita under pressure",
                "Low returns against a net pair hitting hard."
            ),
            drill!(
                "DEF-P-3",
                "Lob under smash pressure",
                "Repeated defensive lobs against continuous smashes."
            ),
        ],
    },
    Module {
        code: "CON-F",
        title: "Rally Building",
        parameter: SkillParameter::Consistency,
        level: Level::Foundation,
        summary: "Cooperative rallies and first-serve percentage.",
        drills: &[
            drill!(
                "CON-F-1",
                "Twenty-ball rally",
                "Cooperative rallies of twenty balls without an error."
            ),
            drill!("CON-F-2", "Crosscourt targets", "Crosscourt groundstrokes into a target zone."),
            drill!(
                "CON-F-3",
                "Serve percentage block",
                "Blocks of ten serves scored on first-serve percentage."
            ),
        ],
    },
    Module {
        code: "CON-D",
        title: "Pressure Tolerance",
        parameter: SkillParameter::Consistency,
        level: Level::Development,
        summary: "Keeping accuracy at tempo and under fatigue.",
        drills: &[
            drill!(
                "CON-D-1",
                "Volley rally at tempo",
                "Volley-to-volley exchanges at increasing pace."
            ),
            drill!("CON-D-2", "Targets under fatigue", "Target drills after a conditioning block."),
            drill!("CON-D-3", "Tie-break simulation", "Tie-breaks started at 4-4."),
        ],
    },
    Module {
        code: "CON-P",
        title: "Competition Routines",
        parameter: SkillParameter::Consistency,
        level: Level::Performance,
        summary: "Error-free games and between-point routines.",
        drills: &[
            drill!("CON-P-1", "Error-free games", "Games lost on the first unforced error."),
            drill!(
                "CON-P-2",
                "Between-point routine",
                "A fixed reset routine rehearsed between points."
            ),
            drill!(
                "CON-P-3",
                "Long-point endurance",
                "Points that must last beyond fifteen shots."
            ),
        ],
    },
];

pub fn all_modules() -> &'static [Module] {
    CURRICULUM
}

pub fn find_module(code: &str) -> Option<&'static Module> {
    CURRICULUM.iter().find(|module| module.code == code)
}

pub fn module_for(parameter: SkillParameter, level: Level) -> Option<&'static Module> {
    CURRICULUM
        .iter()
        .find(|module| module.parameter == parameter && module.level == level)
}

pub fn find_drill(code: &str) -> Option<(&'static Module, &'static Drill)> {
    CURRICULUM.iter().find_map(|module| {
        module
            .drills
            .iter()
            .find(|drill| drill.code == code)
            .map(|drill| (module, drill))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_parameter_has_every_level() {
        for parameter in SkillParameter::ALL {
            for level in [Level::Foundation, Level::Development, Level::Performance] {
                let module = module_for(parameter, level).expect("module exists");
                assert_eq!(
                    module.code,
                    format!("{}-{}", parameter.code(), level.code())
                );
            }
        }
        assert_eq!(CURRICULUM.len(), 15);
    }

    #[test]
    fn test_drill_codes_are_unique_and_prefixed() {
        let mut seen = HashSet::new();
        for module in CURRICULUM {
            assert_eq!(module.drills.len(), 3);
            for drill in module.drills {
                assert!(drill.code.starts_with(module.code));
                assert!(seen.insert(drill.code), "duplicate drill {}", drill.code);
            }
        }
    }

    #[test]
    fn test_lookups() {
        let (module, drill) = find_drill("DEF-D-2").unwrap();
        assert_eq!(module.code, "DEF-D");
        assert_eq!(drill.name, "Contrapared");
        assert!(find_drill("DEF-D-9").is_none());
        assert!(find_module("XYZ-F").is_none());
        assert_eq!(find_module("CON-P").unwrap().level, Level::Performance);
    }

    #[test]
    fn test_level_for_score() {
        assert_eq!(Level::for_score(1), Level::Foundation);
        assert_eq!(Level::for_score(3), Level::Foundation);
        assert_eq!(Level::for_score(4), Level::Development);
        assert_eq!(Level::for_score(6), Level::Development);
        assert_eq!(Level::for_score(7), Level::Performance);
        assert_eq!(Level::for_score(10), Level::Performance);
    }
}
