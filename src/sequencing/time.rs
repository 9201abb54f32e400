/// Fixed step grid: a step is one sixteenth note, four steps make a beat,
/// sixteen steps make a bar (4/4).
pub const STEPS_PER_BEAT: usize = 4;
pub const BEATS_PER_BAR: usize = 4;
pub const STEPS_PER_BAR: usize = STEPS_PER_BEAT * BEATS_PER_BAR;

/// A loop-relative position on the transport, in bars:beats:sixteenths.
///
/// This is the scheduling key handed to the audio engine's transport.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TransportTime {
    pub bar: u32,
    pub beat: u32,
    pub sixteenth: u32,
}

impl TransportTime {
    pub const ZERO: TransportTime = TransportTime {
        bar: 0,
        beat: 0,
        sixteenth: 0,
    };

    /// Map a grid step onto bars:beats:sixteenths
    pub fn from_step(step: usize) -> Self {
        Self {
            bar: (step / STEPS_PER_BAR) as u32,
            beat: ((step % STEPS_PER_BAR) / STEPS_PER_BEAT) as u32,
            sixteenth: (step % STEPS_PER_BEAT) as u32,
        }
    }

    /// Inverse of [`TransportTime::from_step`]
    pub fn to_step(self) -> usize {
        self.bar as usize * STEPS_PER_BAR
            + self.beat as usize * STEPS_PER_BEAT
            + self.sixteenth as usize
    }
}

impl std::fmt::Display for TransportTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.bar, self.beat, self.sixteenth)
    }
}

/// Tempo assumed when a caller passes zero, a negative or a non-finite value
const FALLBACK_TEMPO_BPM: f64 = 120.0;

/// Real-time length of one step (a sixteenth note) at the given tempo.
///
/// Tempos that are not positive and finite fall back to 120 BPM; vanishingly
/// small tempos saturate at [`Duration::MAX`](std::time::Duration::MAX).
pub fn sixteenth_duration(tempo_bpm: f64) -> std::time::Duration {
    let bpm = if tempo_bpm.is_finite() && tempo_bpm > 0.0 {
        tempo_bpm
    } else {
        FALLBACK_TEMPO_BPM
    };
    // quarter = 60 / bpm seconds, sixteenth = quarter / 4
    std::time::Duration::try_from_secs_f64(60.0 / bpm / STEPS_PER_BEAT as f64)
        .unwrap_or(std::time::Duration::MAX)
}

/// Number of whole bars needed to hold `total_steps` (rounded up)
pub fn loop_length_bars(total_steps: usize) -> usize {
    total_steps.div_ceil(STEPS_PER_BAR)
}
