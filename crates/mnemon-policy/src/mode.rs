//! Operating modes and the recall filters they imply.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use mnemon_types::MemoryKind;

/// The caller's current mode of operation.
///
/// Modes only shape the recall path; stored data is never mode-dependent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    /// Everything is recallable.
    #[default]
    Normal,
    /// Suppress episodic noise and low-salience items, surface task work.
    DeepFocus,
    /// Surface identity and insight material.
    Reflection,
    /// No filtering at all, for inspection.
    Debug,
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatingMode::Normal => write!(f, "normal"),
            OperatingMode::DeepFocus => write!(f, "deep_focus"),
            OperatingMode::Reflection => write!(f, "reflection"),
            OperatingMode::Debug => write!(f, "debug"),
        }
    }
}

impl FromStr for OperatingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(OperatingMode::Normal),
            "deep_focus" | "deep-focus" => Ok(OperatingMode::DeepFocus),
            "reflection" => Ok(OperatingMode::Reflection),
            "debug" => Ok(OperatingMode::Debug),
            other => Err(format!("unknown operating mode: {other}")),
        }
    }
}

/// How a mode shapes recall results.
#[derive(Debug, Clone, Default)]
pub struct ModeFilter {
    /// Kinds dropped from recall entirely.
    pub exclude_kinds: Vec<MemoryKind>,
    /// Hits below this salience are dropped.
    pub min_salience: Option<f64>,
    /// Tags whose hits get flagged as mode-relevant.
    pub boost_tags: Vec<String>,
}

impl OperatingMode {
    /// The recall filter this mode applies.
    pub fn filter(&self) -> ModeFilter {
        match self {
            OperatingMode::Normal | OperatingMode::Debug => ModeFilter::default(),
            OperatingMode::DeepFocus => ModeFilter {
                exclude_kinds: vec![MemoryKind::Episodic],
                min_salience: Some(0.4),
                boost_tags: vec!["task".to_string()],
            },
            OperatingMode::Reflection => ModeFilter {
                exclude_kinds: Vec::new(),
                min_salience: None,
                boost_tags: vec!["identity".to_string(), "insight".to_string()],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_parse_round_trip() {
        for mode in [
            OperatingMode::Normal,
            OperatingMode::DeepFocus,
            OperatingMode::Reflection,
            OperatingMode::Debug,
        ] {
            assert_eq!(mode.to_string().parse::<OperatingMode>().unwrap(), mode);
        }

        assert_eq!(
            "deep-focus".parse::<OperatingMode>().unwrap(),
            OperatingMode::DeepFocus
        );
        assert!("focus".parse::<OperatingMode>().is_err());
    }

    #[test]
    fn test_serde_names_match_display() {
        let json = serde_json::to_string(&OperatingMode::DeepFocus).unwrap();
        assert_eq!(json, "\"deep_focus\"");
    }

    #[test]
    fn test_filter_table() {
        let normal = OperatingMode::Normal.filter();
        assert!(normal.exclude_kinds.is_empty());
        assert!(normal.min_salience.is_none());

        let focus = OperatingMode::DeepFocus.filter();
        assert_eq!(focus.exclude_kinds, vec![MemoryKind::Episodic]);
        assert_eq!(focus.min_salience, Some(0.4));
        assert_eq!(focus.boost_tags, vec!["task"]);

        let reflection = OperatingMode::Reflection.filter();
        assert!(reflection.exclude_kinds.is_empty());
        assert_eq!(reflection.boost_tags, vec!["identity", "insight"]);

        assert!(OperatingMode::Debug.filter().exclude_kinds.is_empty());
    }
}
