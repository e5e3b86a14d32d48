//! Synthetic sentence composition
//!
//! The pipeline emits two sentences of its own: the `VRZDA` time stamp the
//! raw recorder interleaves with recorded data, and the proprietary `PSMT`
//! voltage solicitation the serial prober sends to an AIS transponder.

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::line::checksum;

/// Frame inner content as `$inner*CK`
pub fn frame(inner: &str) -> String {
    format!("${}*{}", inner, checksum(inner.as_bytes()))
}

/// Compose a `VRZDA` time stamp sentence for the given instant
///
/// Renders exactly `$VRZDA,HHMMSS.ss,DD,MM,YYYY,00,00*CK`: centisecond time,
/// two-digit day and month, four-digit year, hardcoded zero local-zone
/// fields.
pub fn vrzda(now: DateTime<Utc>) -> String {
    let centis = now.timestamp_subsec_millis() / 10;
    let inner = format!(
        "VRZDA,{:02}{:02}{:02}.{:02},{:02},{:02},{:04},00,00",
        now.hour(),
        now.minute(),
        now.second(),
        centis,
        now.day(),
        now.month(),
        now.year(),
    );
    frame(&inner)
}

/// Compose a `PSMT` voltage probe sentence with the given sequence counter
pub fn psmt_probe(counter: u32) -> String {
    frame(&format!("PSMT,0,0,0x00000000,1,vin,{counter}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::line::validate;

    #[test]
    fn vrzda_renders_known_instant() {
        let t = Utc.with_ymd_and_hms(1994, 3, 23, 12, 35, 19).unwrap();
        assert_eq!(vrzda(t), "$VRZDA,123519.00,23,03,1994,00,00*7F");
    }

    #[test]
    fn vrzda_carries_centiseconds() {
        let t = Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 5)
            .unwrap()
            .checked_add_signed(chrono::Duration::milliseconds(340))
            .unwrap();
        assert!(vrzda(t).starts_with("$VRZDA,000005.34,01,01,2024,00,00*"));
    }

    #[test]
    fn vrzda_validates() {
        validate(&vrzda(Utc::now())).unwrap();
    }

    #[test]
    fn psmt_probe_renders_counter() {
        assert_eq!(psmt_probe(1), "$PSMT,0,0,0x00000000,1,vin,1*23");
    }

    #[test]
    fn psmt_probe_validates() {
        for i in [0, 1, 42, 9999] {
            validate(&psmt_probe(i)).unwrap();
        }
    }
}
