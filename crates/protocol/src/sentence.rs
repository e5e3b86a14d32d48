//! The sentence vocabulary
//!
//! A tagged enum over the typed records the pipeline consumes. The talker
//! prefix is ignored; only the trailing three letters of the address token
//! select the type, except for the proprietary `PCDIN` encapsulation which is
//! keyed whole. Encapsulation sentences (`!AIVDM`/`!AIVDO`) parse to
//! [`Vdm`].
//!
//! Field indices follow the NMEA convention of counting from the first field
//! after the address token.

use chrono::{DateTime, TimeZone, Utc};

use crate::error::ParseError;

/// A parsed sentence
#[derive(Debug, Clone, PartialEq)]
pub enum Sentence {
    Rmc(Rmc),
    Gll(Gll),
    Dpt(Dpt),
    Hdg(Hdg),
    Mtw(Mtw),
    Mwv(Mwv),
    Vlw(Vlw),
    Vhw(Vhw),
    Xdr(Xdr),
    Pcdin(Pcdin),
    Vdm(Vdm),
}

/// Recommended minimum navigation data
#[derive(Debug, Clone, PartialEq)]
pub struct Rmc {
    /// Fix time and date combined, UTC
    pub when: DateTime<Utc>,
    /// `A` = valid, `V` = warning
    pub validity: String,
    /// Decimal degrees, south negative
    pub latitude: f64,
    /// Decimal degrees, west negative
    pub longitude: f64,
}

/// Geographic position, latitude / longitude
#[derive(Debug, Clone, PartialEq)]
pub struct Gll {
    pub latitude: f64,
    pub longitude: f64,
    /// `A` = valid, `V` = invalid
    pub validity: String,
}

/// Water depth below transducer, meters
#[derive(Debug, Clone, PartialEq)]
pub struct Dpt {
    pub depth: f64,
}

/// Magnetic heading, degrees
#[derive(Debug, Clone, PartialEq)]
pub struct Hdg {
    pub heading: f64,
}

/// Mean water temperature, degrees Celsius
#[derive(Debug, Clone, PartialEq)]
pub struct Mtw {
    pub temperature: f64,
}

/// Wind speed and angle
#[derive(Debug, Clone, PartialEq)]
pub struct Mwv {
    /// Degrees off the bow; angles over 180 are normalised to the negative
    /// (port) side at parse time
    pub angle: f64,
    /// `R` = relative (apparent), `T` = true
    pub reference: String,
    pub speed: f64,
    pub speed_unit: String,
    /// `A` = valid, `V` = invalid
    pub status: String,
}

impl Mwv {
    /// True for a valid apparent-wind reading
    pub fn is_valid_apparent(&self) -> bool {
        self.reference == "R" && self.status == "A"
    }
}

/// Distance travelled through water
#[derive(Debug, Clone, PartialEq)]
pub struct Vlw {
    /// Total cumulative distance, nautical miles
    pub total_distance_nm: f64,
}

/// Water speed and heading
#[derive(Debug, Clone, PartialEq)]
pub struct Vhw {
    pub speed_through_water_knots: f64,
}

/// Transducer measurements, repeating four-field tuples
#[derive(Debug, Clone, PartialEq)]
pub struct Xdr {
    pub measurements: Vec<XdrMeasurement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XdrMeasurement {
    pub transducer_type: String,
    pub value: f64,
    pub unit: String,
    pub name: String,
}

/// Proprietary SeaSmart encapsulation of an NMEA 2000 PGN
#[derive(Debug, Clone, PartialEq)]
pub struct Pcdin {
    pub pgn: u32,
    pub timestamp: u32,
    pub source: u32,
    pub data: Vec<u8>,
}

/// PGN carrying the DC voltage reading the prober solicits
const PGN_DC_DETAILED_STATUS: u32 = 0x1F214;

impl Pcdin {
    /// Battery voltage when this PGN carries one
    ///
    /// The reading is a little-endian unsigned 16-bit value at payload bytes
    /// [1, 3), scaled by 1/100.
    pub fn battery_voltage(&self) -> Option<f64> {
        if self.pgn != PGN_DC_DETAILED_STATUS || self.data.len() < 3 {
            return None;
        }
        let raw = u16::from_le_bytes([self.data[1], self.data[2]]);
        Some(f64::from(raw) / 100.0)
    }
}

/// AIS VHF data-link message (`!AIVDM` / `!AIVDO`)
#[derive(Debug, Clone, PartialEq)]
pub struct Vdm {
    pub num_fragments: u32,
    pub fragment_number: u32,
    pub channel: String,
    /// Six-bit armored payload, see [`crate::ais`]
    pub payload: String,
    pub fill_bits: u32,
}

impl Sentence {
    /// Parse a validated line into a typed sentence
    ///
    /// The line is expected to have passed [`crate::line::validate`]; the
    /// checksum suffix is stripped, not re-verified.
    pub fn parse(line: &str) -> Result<Sentence, ParseError> {
        if line.len() < 2 || !line.starts_with(['$', '!']) {
            return Err(ParseError::Malformed("missing framing prefix"));
        }
        let inner = match line.rfind('*') {
            Some(star) => &line[1..star],
            None => &line[1..],
        };
        let mut parts = inner.split(',');
        let token = parts.next().unwrap_or_default();
        let fields = Fields {
            fields: parts.collect(),
        };

        if line.starts_with('!') {
            return match tail3(token) {
                Some("VDM") | Some("VDO") => Ok(Sentence::Vdm(parse_vdm(&fields)?)),
                _ => Err(ParseError::Unsupported(token.to_string())),
            };
        }

        if token == "PCDIN" {
            return Ok(Sentence::Pcdin(parse_pcdin(&fields)?));
        }

        match tail3(token) {
            Some("RMC") => Ok(Sentence::Rmc(parse_rmc(&fields)?)),
            Some("GLL") => Ok(Sentence::Gll(parse_gll(&fields)?)),
            Some("DPT") => Ok(Sentence::Dpt(Dpt {
                depth: fields.f64(0, "depth")?,
            })),
            Some("HDG") => Ok(Sentence::Hdg(Hdg {
                heading: fields.f64(0, "heading")?,
            })),
            Some("MTW") => Ok(Sentence::Mtw(Mtw {
                temperature: fields.f64(0, "temperature")?,
            })),
            Some("MWV") => Ok(Sentence::Mwv(parse_mwv(&fields)?)),
            Some("VLW") => Ok(Sentence::Vlw(Vlw {
                total_distance_nm: fields.f64(0, "total distance")?,
            })),
            Some("VHW") => Ok(Sentence::Vhw(Vhw {
                speed_through_water_knots: fields.f64(4, "speed through water")?,
            })),
            Some("XDR") => Ok(Sentence::Xdr(parse_xdr(&fields)?)),
            _ => Err(ParseError::Unsupported(token.to_string())),
        }
    }
}

/// Last three characters of the address token, when it has them
fn tail3(token: &str) -> Option<&str> {
    (token.len() >= 3).then(|| &token[token.len() - 3..])
}

/// Indexed access to the data fields after the address token
struct Fields<'a> {
    fields: Vec<&'a str>,
}

impl<'a> Fields<'a> {
    fn str(&self, index: usize) -> &'a str {
        self.fields.get(index).copied().unwrap_or_default()
    }

    fn req(&self, index: usize, name: &'static str) -> Result<&'a str, ParseError> {
        match self.fields.get(index) {
            Some(s) if !s.is_empty() => Ok(s),
            _ => Err(ParseError::MissingField { name, index }),
        }
    }

    fn f64(&self, index: usize, name: &'static str) -> Result<f64, ParseError> {
        let s = self.req(index, name)?;
        s.parse().map_err(|_| ParseError::InvalidField {
            name,
            value: s.to_string(),
        })
    }

    fn u32(&self, index: usize, name: &'static str) -> Result<u32, ParseError> {
        let s = self.req(index, name)?;
        s.parse().map_err(|_| ParseError::InvalidField {
            name,
            value: s.to_string(),
        })
    }

    fn hex_u32(&self, index: usize, name: &'static str) -> Result<u32, ParseError> {
        let s = self.req(index, name)?;
        u32::from_str_radix(s, 16).map_err(|_| ParseError::InvalidField {
            name,
            value: s.to_string(),
        })
    }

    fn hex_bytes(&self, index: usize, name: &'static str) -> Result<Vec<u8>, ParseError> {
        let s = self.req(index, name)?;
        if s.len() % 2 != 0 {
            return Err(ParseError::InvalidField {
                name,
                value: s.to_string(),
            });
        }
        (0..s.len())
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| ParseError::InvalidField {
                    name,
                    value: s.to_string(),
                })
            })
            .collect()
    }

    /// Coordinate in ddmm.mmm form plus hemisphere field, as decimal degrees
    fn coordinate(
        &self,
        value_index: usize,
        hemi_index: usize,
        name: &'static str,
    ) -> Result<f64, ParseError> {
        let raw = self.f64(value_index, name)?;
        let degrees = (raw / 100.0).trunc();
        let minutes = raw - degrees * 100.0;
        let decimal = degrees + minutes / 60.0;
        match self.str(hemi_index) {
            "S" | "W" => Ok(-decimal),
            _ => Ok(decimal),
        }
    }
}

fn parse_rmc(f: &Fields<'_>) -> Result<Rmc, ParseError> {
    let time = f.req(0, "time")?;
    let date = f.req(8, "date")?;
    Ok(Rmc {
        when: fix_time(date, time)?,
        validity: f.str(1).to_string(),
        latitude: f.coordinate(2, 3, "latitude")?,
        longitude: f.coordinate(4, 5, "longitude")?,
    })
}

/// Combine ddmmyy and hhmmss.sss fields into a UTC instant
///
/// Two-digit years count from 2000, as the receivers this feed comes from
/// have no opinion about the 20th century.
fn fix_time(date: &str, time: &str) -> Result<DateTime<Utc>, ParseError> {
    let bad = |value: &str| ParseError::InvalidField {
        name: "date/time",
        value: value.to_string(),
    };
    if date.len() != 6 || time.len() < 6 {
        return Err(bad(date));
    }
    let num = |s: &str| s.parse::<u32>().map_err(|_| bad(s));
    let day = num(&date[0..2])?;
    let month = num(&date[2..4])?;
    let year = 2000 + num(&date[4..6])? as i32;
    let hour = num(&time[0..2])?;
    let minute = num(&time[2..4])?;
    let second = num(&time[4..6])?;
    let millis = match time.get(7..) {
        Some(frac) if !frac.is_empty() => {
            let frac = &frac[..frac.len().min(3)];
            num(frac)? * 10u32.pow(3 - frac.len() as u32)
        }
        _ => 0,
    };
    Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
        .single()
        .and_then(|t| t.checked_add_signed(chrono::Duration::milliseconds(millis.into())))
        .ok_or_else(|| bad(date))
}

fn parse_gll(f: &Fields<'_>) -> Result<Gll, ParseError> {
    Ok(Gll {
        latitude: f.coordinate(0, 1, "latitude")?,
        longitude: f.coordinate(2, 3, "longitude")?,
        validity: f.str(5).to_string(),
    })
}

fn parse_mwv(f: &Fields<'_>) -> Result<Mwv, ParseError> {
    let mut angle = f.f64(0, "angle")?;
    if angle > 180.0 {
        angle -= 360.0;
    }
    Ok(Mwv {
        angle,
        reference: f.str(1).to_string(),
        speed: f.f64(2, "speed")?,
        speed_unit: f.str(3).to_string(),
        status: f.str(4).to_string(),
    })
}

fn parse_xdr(f: &Fields<'_>) -> Result<Xdr, ParseError> {
    let mut measurements = Vec::with_capacity(f.fields.len() / 4);
    for i in (0..f.fields.len()).step_by(4) {
        measurements.push(XdrMeasurement {
            transducer_type: f.req(i, "transducer type")?.to_string(),
            value: f.f64(i + 1, "measurement")?,
            unit: f.str(i + 2).to_string(),
            name: f.req(i + 3, "transducer name")?.to_string(),
        });
    }
    Ok(Xdr { measurements })
}

fn parse_pcdin(f: &Fields<'_>) -> Result<Pcdin, ParseError> {
    Ok(Pcdin {
        pgn: f.hex_u32(0, "PGN")?,
        timestamp: f.hex_u32(1, "timestamp")?,
        source: f.hex_u32(2, "source")?,
        data: f.hex_bytes(3, "data")?,
    })
}

fn parse_vdm(f: &Fields<'_>) -> Result<Vdm, ParseError> {
    Ok(Vdm {
        num_fragments: f.u32(0, "fragment count")?,
        fragment_number: f.u32(1, "fragment number")?,
        channel: f.str(3).to_string(),
        payload: f.req(4, "payload")?.to_string(),
        fill_bits: f.u32(5, "fill bits")?,
    })
}

#[cfg(test)]
#[path = "sentence_test.rs"]
mod sentence_test;
