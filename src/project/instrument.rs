//! Instrument families a track can be voiced with.
//!
//! The audio engine builds one voice per instrument family; the MIDI
//! exporter maps each family onto a General MIDI program.

/// General MIDI program used for unknown instruments (Pad 2, "warm")
pub const FALLBACK_PROGRAM: u8 = 89;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentId {
    Keys,
    Pluck,
    Bass,
    Lead,
    Pad,
    Bell,
    /// Anything not recognised (e.g. from a project written by a newer build)
    #[cfg_attr(feature = "serde", serde(other))]
    Other,
}

impl InstrumentId {
    /// Order in which "add track" hands out instruments
    pub const DEFAULT_ORDER: [InstrumentId; 6] = [
        InstrumentId::Keys,
        InstrumentId::Bass,
        InstrumentId::Lead,
        InstrumentId::Pad,
        InstrumentId::Pluck,
        InstrumentId::Bell,
    ];

    /// Instrument assigned to the `n`th track ever created
    pub fn nth_default(n: usize) -> Self {
        Self::DEFAULT_ORDER[n % Self::DEFAULT_ORDER.len()]
    }

    /// General MIDI program number (0-based)
    pub fn midi_program(self) -> u8 {
        match self {
            InstrumentId::Keys => 4,   // Electric Piano 1
            InstrumentId::Pluck => 45, // Pizzicato Strings
            InstrumentId::Bass => 38,  // Synth Bass 1
            InstrumentId::Lead => 80,  // Lead 1 (square)
            InstrumentId::Pad => 88,   // Pad 1 (new age)
            InstrumentId::Bell => 14,  // Tubular Bells
            InstrumentId::Other => FALLBACK_PROGRAM,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InstrumentId::Keys => "keys",
            InstrumentId::Pluck => "pluck",
            InstrumentId::Bass => "bass",
            InstrumentId::Lead => "lead",
            InstrumentId::Pad => "pad",
            InstrumentId::Bell => "bell",
            InstrumentId::Other => "other",
        }
    }

    /// Next instrument in the default order (for cycling in the UI)
    pub fn next(self) -> Self {
        let index = Self::DEFAULT_ORDER
            .iter()
            .position(|id| *id == self)
            .map_or(0, |i| i + 1);
        Self::nth_default(index)
    }
}

impl std::str::FromStr for InstrumentId {
    type Err = std::convert::Infallible;

    /// Unknown names parse as [`InstrumentId::Other`]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::DEFAULT_ORDER
            .into_iter()
            .find(|id| id.name().eq_ignore_ascii_case(s))
            .unwrap_or(InstrumentId::Other))
    }
}

impl std::fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
