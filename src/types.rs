//! Shared types used across modules
//!
//! Concepts and mastery tiers are closed sets, so they are plain enums here
//! and every other module works with them instead of raw strings or floats.

use serde::{Deserialize, Serialize};

/// Numeric tolerance when matching a stored level against a sentinel value
const SENTINEL_EPSILON: f64 = 1e-6;

/// One of the five Flipped-Classroom concepts tracked per student
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Concept {
    #[serde(rename = "FC_DEFINICION")]
    Definition,
    #[serde(rename = "FC_ROLES")]
    Roles,
    #[serde(rename = "FC_TECNOLOGIA")]
    Technology,
    #[serde(rename = "FC_APLICACION")]
    Application,
    #[serde(rename = "FC_BENEFICIOS")]
    Benefits,
}

impl Concept {
    /// All concepts, in display and column order
    pub const ALL: [Concept; 5] = [
        Concept::Definition,
        Concept::Roles,
        Concept::Technology,
        Concept::Application,
        Concept::Benefits,
    ];

    /// Column / wire tag
    pub fn tag(&self) -> &'static str {
        match self {
            Concept::Definition => "FC_DEFINICION",
            Concept::Roles => "FC_ROLES",
            Concept::Technology => "FC_TECNOLOGIA",
            Concept::Application => "FC_APLICACION",
            Concept::Benefits => "FC_BENEFICIOS",
        }
    }

    /// Human-readable gloss used in prompts and headings
    pub fn gloss(&self) -> &'static str {
        match self {
            Concept::Definition => "the definition of the Flipped Classroom",
            Concept::Roles => "the roles of the student and the teacher in the Flipped Classroom",
            Concept::Technology => "the technology used in the Flipped Classroom",
            Concept::Application => "how to apply the Flipped Classroom",
            Concept::Benefits => "the benefits of the Flipped Classroom",
        }
    }

    /// Parse from a column tag (case-insensitive)
    pub fn from_tag(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.iter().copied().find(|c| c.tag().eq_ignore_ascii_case(s))
    }

    /// Position of this concept in `ALL`
    pub fn index(&self) -> usize {
        match self {
            Concept::Definition => 0,
            Concept::Roles => 1,
            Concept::Technology => 2,
            Concept::Application => 3,
            Concept::Benefits => 4,
        }
    }
}

impl std::fmt::Display for Concept {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl std::str::FromStr for Concept {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(|c| c.tag()).collect();
            anyhow::anyhow!("Unknown concept '{}'. Known concepts: {}", s, known.join(", "))
        })
    }
}

/// Discrete mastery level of a student for one concept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MasteryTier {
    Basic,
    Intermediate,
    Advanced,
}

impl MasteryTier {
    /// All tiers, lowest first
    pub const ALL: [MasteryTier; 3] = [
        MasteryTier::Basic,
        MasteryTier::Intermediate,
        MasteryTier::Advanced,
    ];

    /// Sentinel number stored in the durable table
    pub fn value(&self) -> f64 {
        match self {
            MasteryTier::Basic => 0.25,
            MasteryTier::Intermediate => 0.55,
            MasteryTier::Advanced => 0.85,
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            MasteryTier::Basic => "Basic",
            MasteryTier::Intermediate => "Intermediate",
            MasteryTier::Advanced => "Advanced",
        }
    }

    /// Map a stored number back to its tier; `None` for anything but a sentinel
    pub fn from_value(value: f64) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| (t.value() - value).abs() < SENTINEL_EPSILON)
    }

    /// Parse from a label (English or Spanish, case-insensitive) or a sentinel number
    pub fn from_label(s: &str) -> Option<Self> {
        let s = s.trim();
        match s.to_lowercase().as_str() {
            "basic" | "básico" | "basico" => Some(MasteryTier::Basic),
            "intermediate" | "intermedio" => Some(MasteryTier::Intermediate),
            "advanced" | "avanzado" => Some(MasteryTier::Advanced),
            other => other.parse::<f64>().ok().and_then(Self::from_value),
        }
    }
}

impl std::fmt::Display for MasteryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for MasteryTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown tier '{}'. Use basic, intermediate, advanced or 0.25/0.55/0.85",
                s
            )
        })
    }
}

/// A student row: identity plus one tier per concept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: u32,
    pub name: String,
    levels: [MasteryTier; 5],
}

impl StudentRecord {
    /// Create a record with every concept at the same tier
    pub fn new(id: u32, name: impl Into<String>, tier: MasteryTier) -> Self {
        Self {
            id,
            name: name.into(),
            levels: [tier; 5],
        }
    }

    /// Create a record from explicit per-concept tiers (in `Concept::ALL` order)
    pub fn with_levels(id: u32, name: impl Into<String>, levels: [MasteryTier; 5]) -> Self {
        Self {
            id,
            name: name.into(),
            levels,
        }
    }

    pub fn tier(&self, concept: Concept) -> MasteryTier {
        self.levels[concept.index()]
    }

    pub fn set_tier(&mut self, concept: Concept, tier: MasteryTier) {
        self.levels[concept.index()] = tier;
    }

    pub fn set_all(&mut self, tier: MasteryTier) {
        self.levels = [tier; 5];
    }

    /// (concept, tier) pairs in display order
    pub fn levels(&self) -> impl Iterator<Item = (Concept, MasteryTier)> + '_ {
        Concept::ALL.iter().map(move |c| (*c, self.tier(*c)))
    }
}

/// One bar of the per-student level chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub concept: Concept,
    pub tier: MasteryTier,
    pub label: &'static str,
    pub value: f64,
}

impl ChartPoint {
    pub fn series(record: &StudentRecord) -> Vec<ChartPoint> {
        record
            .levels()
            .map(|(concept, tier)| ChartPoint {
                concept,
                tier,
                label: tier.label(),
                value: tier.value(),
            })
            .collect()
    }
}
