/*
Pitch Labels
============

Rows of the grid are identified by scientific pitch labels such as "C4",
"F#3" or "Bb2". Middle C (C4) is MIDI note 60.

The MIDI formula: note_number = 12 * (octave + 1) + semitone
Where semitone: C=0, C#=1, D=2, D#=3, E=4, F=5, F#=6, G=7, G#=8, A=9, A#=10, B=11

Labels are carried through the event pipeline untouched; they are only
resolved to key numbers at the MIDI file boundary.
*/

/// Middle C
pub const C4: u8 = 60;
/// A440 tuning reference
pub const A4: u8 = 69;

const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Resolve a pitch label ("C4", "F#3", "Bb2", "C-1") to a MIDI key number.
///
/// Returns `None` for malformed labels or pitches outside 0..=127.
pub fn note_number(label: &str) -> Option<u8> {
    let mut chars = label.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let base: i32 = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let (accidental, octave) = match rest.as_bytes().first() {
        Some(b'#') => (1, &rest[1..]),
        Some(b'b') => (-1, &rest[1..]),
        _ => (0, rest),
    };

    let octave: i32 = octave.parse().ok()?;
    let number = 12 * (octave + 1) + base + accidental;
    u8::try_from(number).ok().filter(|n| *n <= 127)
}

/// Spell a MIDI key number as a sharp-based label ("C#4")
pub fn note_name(note: u8) -> String {
    let octave = (note / 12) as i32 - 1;
    format!("{}{}", SHARP_NAMES[(note % 12) as usize], octave)
}

/// Chromatic row layout from `high` down to `low` (both inclusive),
/// highest pitch first.
pub fn chromatic_rows(high: u8, low: u8) -> Vec<String> {
    (low..=high).rev().map(note_name).collect()
}

/// Default grid rows: one octave, C5 down to C4
pub fn default_rows() -> Vec<String> {
    chromatic_rows(C4 + 12, C4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_c_is_60() {
        assert_eq!(note_number("C4"), Some(C4));
    }

    #[test]
    fn a440_is_69() {
        assert_eq!(note_number("A4"), Some(A4));
    }

    #[test]
    fn sharps_and_flats_are_equal() {
        assert_eq!(note_number("C#4"), note_number("Db4"));
        assert_eq!(note_number("F#3"), Some(54));
        assert_eq!(note_number("Bb2"), Some(46));
    }

    #[test]
    fn lowest_and_highest() {
        assert_eq!(note_number("C-1"), Some(0));
        assert_eq!(note_number("G9"), Some(127));
        assert_eq!(note_number("G#9"), None);
        assert_eq!(note_number("Cb-1"), None);
    }

    #[test]
    fn malformed_labels() {
        assert_eq!(note_number(""), None);
        assert_eq!(note_number("H4"), None);
        assert_eq!(note_number("C"), None);
        assert_eq!(note_number("C#x"), None);
    }

    #[test]
    fn names_round_trip() {
        for n in 0..=127u8 {
            assert_eq!(note_number(&note_name(n)), Some(n));
        }
    }

    #[test]
    fn default_rows_run_high_to_low() {
        let rows = default_rows();
        assert_eq!(rows.len(), 13);
        assert_eq!(rows.first().map(String::as_str), Some("C5"));
        assert_eq!(rows.last().map(String::as_str), Some("C4"));
        assert_eq!(rows[1], "B4");
    }
}
