use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::gazetteer::Location;
use crate::location::LocationQuery;

/// A fixed score correction for a gazetteer ambiguity the generic ranking gets wrong.
///
/// When any input equals one of `trigger_aliases`, the candidate with id `location_id`
/// gets `bonus` extra points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRule {
    pub trigger_aliases: Vec<String>,
    pub location_id: String,
    pub bonus: u32,
    #[serde(default)]
    pub note: Option<String>,
}

impl OverrideRule {
    pub fn new(trigger_aliases: &[&str], location_id: &str, bonus: u32) -> Self {
        Self {
            trigger_aliases: trigger_aliases.iter().map(|a| a.to_string()).collect(),
            location_id: location_id.to_string(),
            bonus,
            note: None,
        }
    }

    pub fn with_note(mut self, note: &str) -> Self {
        self.note = Some(note.to_string());
        self
    }

    pub fn bonus_for(&self, query: &LocationQuery, candidate: &Location) -> u32 {
        let triggered = self.trigger_aliases.iter().any(|alias| query.mentions(alias));
        if triggered && candidate.id() == self.location_id {
            self.bonus
        } else {
            0
        }
    }
}

/// Corrections applied by every ranker unless replaced
pub static DEFAULT_OVERRIDES: Lazy<Vec<OverrideRule>> = Lazy::new(|| {
    vec![OverrideRule::new(&["Brussels"], "Q239", 3)
        .with_note("\"Brussels\" also names a first-level administrative region")]
});
