//! The closed set of domains the Coordinator knows how to route to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four domain subgraphs. This set is closed: the planner and
/// the Coordinator both reject any domain outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Contact,
    Calendar,
    Task,
    Workflow,
}

impl Domain {
    pub const ALL: [Domain; 4] = [Domain::Contact, Domain::Calendar, Domain::Task, Domain::Workflow];

    /// Namespace used for this domain's checkpoint sub-lineage.
    pub fn namespace(&self) -> String {
        format!("{}_subgraph", self.as_str())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Contact => "contact",
            Domain::Calendar => "calendar",
            Domain::Task => "task",
            Domain::Workflow => "workflow",
        }
    }

    /// Parse a domain from its lowercase name, returning `None` for anything
    /// outside the closed set (callers should warn, not error, per spec).
    pub fn parse(s: &str) -> Option<Domain> {
        match s {
            "contact" => Some(Domain::Contact),
            "calendar" => Some(Domain::Calendar),
            "task" => Some(Domain::Task),
            "workflow" => Some(Domain::Workflow),
            _ => None,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_is_suffixed() {
        assert_eq!(Domain::Calendar.namespace(), "calendar_subgraph");
    }

    #[test]
    fn parse_rejects_unknown_domains() {
        assert_eq!(Domain::parse("billing"), None);
        assert_eq!(Domain::parse("contact"), Some(Domain::Contact));
    }

    #[test]
    fn round_trips_through_str() {
        for d in Domain::ALL {
            assert_eq!(Domain::parse(d.as_str()), Some(d));
        }
    }
}
