//! Channel-type classification by name

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a channel in the analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelKind {
    /// Primary signal under analysis (cortical grid electrodes)
    SignalOfInterest,
    /// Reference or auxiliary physiological channel (ECG, ...)
    Secondary,
    /// Everything else
    Other,
}

/// Substring rule mapping matching channel names to a kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRule {
    /// Substring searched for in the channel name
    pub pattern: String,
    /// Kind assigned when the pattern matches
    pub kind: ChannelKind,
}

impl ChannelRule {
    pub fn new(pattern: &str, kind: ChannelKind) -> Self {
        Self {
            pattern: pattern.to_string(),
            kind,
        }
    }

    fn matches(&self, name: &str) -> bool {
        name.contains(self.pattern.as_str())
    }
}

/// Ordered rule set; the first matching rule wins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRules {
    pub rules: Vec<ChannelRule>,
    /// Kind for names no rule matches
    pub fallback: ChannelKind,
}

impl ChannelRules {
    /// Rules for clinical ECoG montages.
    ///
    /// `ECG` is checked before `GRID` so a name carrying both is treated as
    /// a secondary channel.
    pub fn ecog_default() -> Self {
        Self {
            rules: vec![
                ChannelRule::new("ECG", ChannelKind::Secondary),
                ChannelRule::new("GRID", ChannelKind::SignalOfInterest),
            ],
            fallback: ChannelKind::Other,
        }
    }

    /// Classify one channel name
    pub fn classify(&self, name: &str) -> ChannelKind {
        self.rules
            .iter()
            .find(|rule| rule.matches(name))
            .map(|rule| rule.kind)
            .unwrap_or(self.fallback)
    }

    /// Classify every channel, keeping the input order
    pub fn classify_all<S: AsRef<str>>(&self, names: &[S]) -> Vec<ChannelKind> {
        names.iter().map(|name| self.classify(name.as_ref())).collect()
    }

    /// Indices of channels of the requested kind
    pub fn picks<S: AsRef<str>>(&self, names: &[S], kind: ChannelKind) -> Vec<usize> {
        names
            .iter()
            .enumerate()
            .filter(|(_, name)| self.classify(name.as_ref()) == kind)
            .map(|(idx, _)| idx)
            .collect()
    }
}

impl Default for ChannelRules {
    fn default() -> Self {
        Self::ecog_default()
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::SignalOfInterest => write!(f, "signal-of-interest"),
            ChannelKind::Secondary => write!(f, "secondary"),
            ChannelKind::Other => write!(f, "other"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules() {
        let rules = ChannelRules::ecog_default();
        assert_eq!(rules.classify("GRID12"), ChannelKind::SignalOfInterest);
        assert_eq!(rules.classify("ECG1"), ChannelKind::Secondary);
        assert_eq!(rules.classify("C3-REF"), ChannelKind::Other);
    }

    #[test]
    fn test_first_rule_wins() {
        let rules = ChannelRules::ecog_default();
        assert_eq!(rules.classify("GRID-ECG"), ChannelKind::Secondary);
    }

    #[test]
    fn test_picks_keep_channel_order() {
        let rules = ChannelRules::ecog_default();
        let names = ["GRID1", "ECG", "GRID2", "EMG", "GRID3"];
        assert_eq!(rules.picks(&names, ChannelKind::SignalOfInterest), vec![0, 2, 4]);
        assert_eq!(rules.picks(&names, ChannelKind::Secondary), vec![1]);
    }

    #[test]
    fn test_custom_rule_set() {
        let rules = ChannelRules {
            rules: vec![ChannelRule::new("EEG", ChannelKind::SignalOfInterest)],
            fallback: ChannelKind::Secondary,
        };
        assert_eq!(
            rules.classify_all(&["EEG Fp1", "GRID1"]),
            vec![ChannelKind::SignalOfInterest, ChannelKind::Secondary]
        );
    }
}
