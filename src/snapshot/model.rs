use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use tracing::debug;

/// Id prefix the backend uses for synthetic per-subject hub nodes.
pub const SUBJECT_ROOT_PREFIX: &str = "subject_root__";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum MasteryTier {
    Mastered,
    Learning,
    Struggling,
    Unexplored,
    SubjectRoot,
    /// Any tier string this viewer does not know about.
    Other(String),
}

impl MasteryTier {
    /// Tier the backend assigns to `score`.
    #[cfg(test)]
    pub fn for_score(score: f32) -> Self {
        if score >= 0.75 {
            Self::Mastered
        } else if score >= 0.45 {
            Self::Learning
        } else if score >= 0.1 {
            Self::Struggling
        } else {
            Self::Unexplored
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Mastered => "mastered",
            Self::Learning => "learning",
            Self::Struggling => "struggling",
            Self::Unexplored => "unexplored",
            Self::SubjectRoot => "subject_root",
            Self::Other(raw) => raw.as_str(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Mastered => "Mastered",
            Self::Learning => "Learning",
            Self::Struggling => "Struggling",
            Self::Unexplored => "Unexplored",
            Self::SubjectRoot => "Subject",
            Self::Other(raw) => raw.as_str(),
        }
    }
}

impl From<String> for MasteryTier {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "mastered" => Self::Mastered,
            "learning" => Self::Learning,
            "struggling" => Self::Struggling,
            "unexplored" => Self::Unexplored,
            "subject_root" => Self::SubjectRoot,
            _ => Self::Other(raw),
        }
    }
}

impl From<&str> for MasteryTier {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_owned())
    }
}

impl fmt::Display for MasteryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Node {
    pub id: String,
    pub concept_name: String,
    #[serde(default)]
    pub mastery_score: f32,
    pub mastery_tier: MasteryTier,
    #[serde(default, deserialize_with = "nullable_string")]
    pub subject: String,
    #[serde(default, deserialize_with = "nullable_count")]
    pub times_studied: u32,
    #[serde(default, deserialize_with = "nullable_timestamp")]
    pub last_studied_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_subject_root: bool,
}

impl Node {
    #[cfg(test)]
    pub fn new(
        id: impl Into<String>,
        concept_name: impl Into<String>,
        mastery_score: f32,
        mastery_tier: MasteryTier,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            concept_name: concept_name.into(),
            mastery_score,
            mastery_tier,
            subject: subject.into(),
            times_studied: 0,
            last_studied_at: None,
            is_subject_root: false,
        }
    }

    pub fn is_root(&self) -> bool {
        self.is_subject_root || self.mastery_tier == MasteryTier::SubjectRoot
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub strength: f32,
}

#[cfg(test)]
impl Edge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        strength: f32,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            strength,
        }
    }
}

/// One immutable (nodes, edges) pair as delivered by the data source.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Snapshot {
    /// Node ids are unique within a snapshot; the first occurrence of a repeated id wins.
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let mut seen = HashSet::with_capacity(nodes.len());
        let total = nodes.len();
        let nodes = nodes
            .into_iter()
            .filter(|node| seen.insert(node.id.clone()))
            .collect::<Vec<_>>();

        if nodes.len() < total {
            debug!(
                dropped = total - nodes.len(),
                "dropped duplicate node ids from snapshot"
            );
        }

        Self { nodes, edges }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

pub(super) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    // The backend writes naive UTC timestamps without an offset.
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

fn nullable_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn nullable_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or_default())
}
