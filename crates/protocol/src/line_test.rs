use super::*;

#[test]
fn checksum_of_known_sentence() {
    // Inner bytes of a canonical RMC sentence
    let inner = b"GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W";
    assert_eq!(checksum(inner), "6A");
}

#[test]
fn checksum_is_upper_case_hex() {
    assert_eq!(checksum(b"PSMT,0,0,0x00000000,1,vin,1").len(), 2);
    for c in checksum(b"x").chars() {
        assert!(c.is_ascii_uppercase() || c.is_ascii_digit());
    }
}

#[test]
fn accepts_valid_talker_sentence() {
    let line = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";
    assert_eq!(validate(line), Ok(()));
}

#[test]
fn accepts_valid_encapsulation() {
    let line = "!AIVDM,1,1,,A,13u?etPv2;0n:dDPwUM1U1Cb069D,0*24";
    assert_eq!(validate(line), Ok(()));
}

#[test]
fn rejects_empty_line() {
    assert_eq!(validate(""), Err(Reject::Empty));
}

#[test]
fn rejects_non_nmea_prefix() {
    assert_eq!(validate("GPRMC,123519*00"), Err(Reject::NonNmea));
    assert_eq!(validate("#comment"), Err(Reject::NonNmea));
}

#[test]
fn rejects_missing_checksum() {
    assert_eq!(validate("$GPRMC,123519,A"), Err(Reject::NoChecksum));
}

#[test]
fn rejects_bad_checksum() {
    let line = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*XX";
    assert_eq!(validate(line), Err(Reject::BadChecksum));
}

#[test]
fn rejects_lower_case_checksum() {
    // The wire format is upper case; a lower-case suffix does not compare
    // equal and is treated as bad.
    let line = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6a";
    assert_eq!(validate(line), Err(Reject::BadChecksum));
}

#[test]
fn validator_accepted_line_round_trips_checksum() {
    let line = "$YDXDR,C,4.4,C,Air,P,98950,P,Baro,C,5.4,C,ENV_INSIDE_T*1E";
    validate(line).unwrap();
    let star = line.rfind('*').unwrap();
    assert_eq!(checksum(&line.as_bytes()[1..star]), line[star + 1..]);
}
