use chrono::{TimeZone, Utc};

use super::*;

fn parse(line: &str) -> Sentence {
    Sentence::parse(line).unwrap()
}

#[test]
fn parses_rmc() {
    let Sentence::Rmc(rmc) =
        parse("$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A")
    else {
        panic!("expected RMC")
    };
    assert_eq!(rmc.validity, "A");
    assert!((rmc.latitude - 48.1173).abs() < 1e-4);
    assert!((rmc.longitude - 11.5166).abs() < 1e-3);
    // Two-digit years count from 2000
    assert_eq!(
        rmc.when,
        Utc.with_ymd_and_hms(2094, 3, 23, 12, 35, 19).unwrap()
    );
}

#[test]
fn rmc_talker_prefix_is_ignored() {
    let a = parse("$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A");
    let b = parse("$GNRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A");
    assert_eq!(a, b);
}

#[test]
fn parses_gll_with_hemispheres() {
    let Sentence::Gll(gll) = parse("$GPGLL,5900.000,S,01800.000,W,123519,A*22") else {
        panic!("expected GLL")
    };
    assert!((gll.latitude + 59.0).abs() < 1e-9);
    assert!((gll.longitude + 18.0).abs() < 1e-9);
    assert_eq!(gll.validity, "A");
}

#[test]
fn parses_dpt_hdg_mtw() {
    let Sentence::Dpt(dpt) = parse("$SDDPT,3.2,0.0*00") else {
        panic!()
    };
    assert_eq!(dpt.depth, 3.2);

    let Sentence::Hdg(hdg) = parse("$IIHDG,271.5,,,5.1,W*00") else {
        panic!()
    };
    assert_eq!(hdg.heading, 271.5);

    let Sentence::Mtw(mtw) = parse("$IIMTW,18.5,C*00") else {
        panic!()
    };
    assert_eq!(mtw.temperature, 18.5);
}

#[test]
fn mwv_angle_over_180_normalises_negative() {
    let Sentence::Mwv(mwv) = parse("$IIMWV,271.0,R,4.3,M,A*00") else {
        panic!()
    };
    assert_eq!(mwv.angle, -89.0);
    assert!(mwv.is_valid_apparent());
}

#[test]
fn mwv_angle_at_180_is_unchanged() {
    let Sentence::Mwv(mwv) = parse("$IIMWV,180.0,R,4.3,M,A*00") else {
        panic!()
    };
    assert_eq!(mwv.angle, 180.0);
}

#[test]
fn mwv_true_reference_is_not_apparent() {
    let Sentence::Mwv(mwv) = parse("$IIMWV,10.0,T,4.3,M,A*00") else {
        panic!()
    };
    assert!(!mwv.is_valid_apparent());
}

#[test]
fn parses_vlw_and_vhw() {
    let Sentence::Vlw(vlw) = parse("$IIVLW,1234.5,N,12.3,N*00") else {
        panic!()
    };
    assert_eq!(vlw.total_distance_nm, 1234.5);

    let Sentence::Vhw(vhw) = parse("$IIVHW,,T,,M,6.2,N,11.5,K*00") else {
        panic!()
    };
    assert_eq!(vhw.speed_through_water_knots, 6.2);
}

#[test]
fn parses_xdr_tuples() {
    let Sentence::Xdr(xdr) = parse("$YDXDR,C,4.4,C,Air,P,98950,P,Baro,C,5.4,C,ENV_INSIDE_T*1E")
    else {
        panic!()
    };
    assert_eq!(xdr.measurements.len(), 3);
    assert_eq!(xdr.measurements[0].value, 4.4);
    assert_eq!(xdr.measurements[0].name, "Air");
    assert_eq!(xdr.measurements[1].value, 98950.0);
    assert_eq!(xdr.measurements[1].transducer_type, "P");
    assert_eq!(xdr.measurements[2].value, 5.4);
    assert_eq!(xdr.measurements[2].name, "ENV_INSIDE_T");
}

#[test]
fn parses_pcdin_battery_voltage() {
    let Sentence::Pcdin(din) = parse("$PCDIN,01F214,47B319FE,55,00C8040000FFFFC4*51") else {
        panic!()
    };
    assert_eq!(din.pgn, 0x1F214);
    assert_eq!(din.battery_voltage(), Some(12.24));
}

#[test]
fn pcdin_other_pgn_has_no_voltage() {
    let Sentence::Pcdin(din) = parse("$PCDIN,01F200,47B319FE,55,00C8040000FFFFC4*00") else {
        panic!()
    };
    assert_eq!(din.battery_voltage(), None);
}

#[test]
fn parses_vdm() {
    let Sentence::Vdm(vdm) = parse("!AIVDM,1,1,,A,13u?etPv2;0n:dDPwUM1U1Cb069D,0*24") else {
        panic!()
    };
    assert_eq!(vdm.num_fragments, 1);
    assert_eq!(vdm.fragment_number, 1);
    assert_eq!(vdm.channel, "A");
    assert_eq!(vdm.payload, "13u?etPv2;0n:dDPwUM1U1Cb069D");
    assert_eq!(vdm.fill_bits, 0);
}

#[test]
fn unknown_type_is_unsupported() {
    let err = Sentence::parse("$GPGSV,3,1,11,03,03,111,00*00").unwrap_err();
    assert!(err.is_unsupported());
}

#[test]
fn missing_required_field_is_an_error() {
    let err = Sentence::parse("$SDDPT,*00").unwrap_err();
    assert!(!err.is_unsupported());
}
