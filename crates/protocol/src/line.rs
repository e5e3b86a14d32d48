//! Line framing and checksum validation
//!
//! An NMEA 0183 line starts with `$` (talker sentence) or `!` (encapsulation,
//! typically AIS), and ends with `*` followed by a two-digit upper-case hex
//! checksum: the XOR of every byte strictly between the framing prefix and
//! the `*`.

use std::fmt;

/// Why a line was rejected by [`validate`]
///
/// Each class gets its own per-source counter; none of them is an error in
/// the failure sense, bad input is simply dropped and accounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reject {
    /// Line was empty
    Empty,
    /// First byte was neither `$` nor `!`
    NonNmea,
    /// No `*` checksum separator present
    NoChecksum,
    /// Checksum suffix did not match the computed value
    BadChecksum,
}

impl fmt::Display for Reject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Reject::Empty => "empty",
            Reject::NonNmea => "non-nmea",
            Reject::NoChecksum => "no-checksum",
            Reject::BadChecksum => "bad-checksum",
        };
        f.write_str(s)
    }
}

/// Compute the checksum over the inner bytes of a sentence (everything
/// between the framing prefix and the `*`), formatted as two upper-case hex
/// digits.
pub fn checksum(inner: &[u8]) -> String {
    let sum = inner.iter().fold(0u8, |acc, b| acc ^ b);
    format!("{sum:02X}")
}

/// Validate one line of input
///
/// Accepts only `$`/`!`-framed lines whose checksum suffix matches the XOR
/// of the inner bytes. The suffix comparison is byte-wise against the
/// upper-case rendering, matching the wire convention.
pub fn validate(line: &str) -> Result<(), Reject> {
    if line.is_empty() {
        return Err(Reject::Empty);
    }
    let bytes = line.as_bytes();
    match bytes[0] {
        b'$' | b'!' => {}
        _ => return Err(Reject::NonNmea),
    }
    let Some(star) = line.rfind('*') else {
        return Err(Reject::NoChecksum);
    };
    if checksum(&bytes[1..star]) != line[star + 1..] {
        return Err(Reject::BadChecksum);
    }
    Ok(())
}

#[cfg(test)]
#[path = "line_test.rs"]
mod line_test;
