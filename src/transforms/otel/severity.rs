use indexmap::IndexMap;

/// Severity number for levels the table does not know.
pub const UNKNOWN_SEVERITY: u8 = 9;

/// Maps level keywords to syslog severity numbers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeverityTable {
    keywords: IndexMap<String, u8>,
    fallback: u8,
}

impl Default for SeverityTable {
    /// Syslog keywords plus the level names the collector normalizes to.
    fn default() -> Self {
        Self::new(
            [
                ("emerg", 0),
                ("emergency", 0),
                ("alert", 1),
                ("crit", 2),
                ("critical", 2),
                ("err", 3),
                ("error", 3),
                ("warning", 4),
                ("warn", 4),
                ("notice", 5),
                ("info", 6),
                ("debug", 7),
                ("trace", 7),
            ],
            UNKNOWN_SEVERITY,
        )
    }
}

impl SeverityTable {
    pub fn new<I, S>(keywords: I, fallback: u8) -> Self
    where
        I: IntoIterator<Item = (S, u8)>,
        S: Into<String>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|(keyword, number)| (keyword.into().to_lowercase(), number))
                .collect(),
            fallback,
        }
    }

    /// Case-insensitive lookup, falling back for unknown levels.
    pub fn lookup(&self, level: &str) -> u8 {
        self.keywords
            .get(level.to_lowercase().as_str())
            .copied()
            .unwrap_or(self.fallback)
    }

    pub const fn fallback(&self) -> u8 {
        self.fallback
    }

    /// The table as a VRL object literal.
    pub fn to_vrl(&self) -> String {
        let entries: Vec<_> = self
            .keywords
            .iter()
            .map(|(keyword, number)| format!("{}: {}", crate::element::quote(keyword), number))
            .collect();
        format!("{{{}}}", entries.join(", "))
    }
}
