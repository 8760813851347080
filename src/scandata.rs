//! Scan-data codec.
//!
//! Translates between the byte sequence a barcode scanner emits (a `]Xn`
//! symbology identifier followed by data carrying GS separators) and the
//! encoder's canonical AI element string.
use log::{debug, trace};

use crate::aidata::{self, AiValue};
use crate::dluri::{self, DlExtract};
use crate::error::{Failure, Gs1Error};
use crate::primary::{check_and_normalise_primary_data, validate_parity};
use crate::symbology::{lookup_sym_and_mode, lookup_sym_id, AiMode, Symbology, CC_SYM_ID};
use crate::Options;

/// Ceiling on the data carried by one symbol. Inputs that reach it are
/// rejected rather than truncated.
pub const MAX_DATA: usize = 8191;

const GS: char = '\u{1d}';

// An EAN/UPC composite component continues in a new logical message.
const EAN_COMPOSITE_INTRO: &str = "|]e0";

/// Everything recovered from one scan.
#[derive(Debug)]
pub(crate) struct DecodeOutcome {
    pub sym: Symbology,
    pub data_str: String,
    pub ai_data: Vec<AiValue>,
    pub dl: Option<DlExtract>,
}

/// Parses scan data into a symbology and canonical data string.
///
/// Validation order is observable through the reported error: identifier
/// presence, identifier recognition, length ceiling, per-symbology
/// structure, digits, check digit, AI extraction, DL URI extraction.
pub(crate) fn process_scan_data(
    scan_data: &str,
    opts: &Options,
) -> Result<DecodeOutcome, Failure> {
    if scan_data.len() < 3 || !scan_data.starts_with(']') {
        return Err(Gs1Error::MissingSymbologyIdentifier.into());
    }
    let Some(id) = scan_data.get(1..3) else {
        return Err(Gs1Error::UnsupportedSymbologyIdentifier.into());
    };
    let (sym, mode) = lookup_sym_and_mode(id);
    if sym == Symbology::None {
        return Err(Gs1Error::UnsupportedSymbologyIdentifier.into());
    }
    let body = &scan_data[3..];
    if body.len() >= MAX_DATA {
        return Err(Gs1Error::DataTooLong(MAX_DATA - 1).into());
    }
    trace!("scan data: sym {:?}, mode {:?}, {} byte body", sym, mode, body.len());

    if matches!(sym, Symbology::Ean13 | Symbology::Ean8) {
        return decode_ean(sym, body, opts);
    }
    match mode {
        AiMode::Ai => decode_ai(sym, body, opts),
        AiMode::NonAi => decode_plain(sym, body, opts),
    }
}

fn decode_ean(sym: Symbology, body: &str, opts: &Options) -> Result<DecodeOutcome, Failure> {
    let primary_len = if sym == Symbology::Ean13 { 13 } else { 8 };
    let bytes = body.as_bytes();
    if bytes.len() < primary_len {
        return Err(Gs1Error::PrimaryScanDataTooShort.into());
    }
    let (primary, rest) = bytes.split_at(primary_len);
    if !rest.is_empty() && !rest.starts_with(EAN_COMPOSITE_INTRO.as_bytes()) {
        return Err(Gs1Error::PrimaryMessageTooLong.into());
    }
    if !primary.iter().all(|b| b.is_ascii_digit()) {
        return Err(Gs1Error::PrimaryMessageNotDigits.into());
    }
    let mut digits = primary.to_vec();
    if !validate_parity(&mut digits) {
        return Err(Gs1Error::PrimaryMessageCheckDigit.into());
    }
    // The primary stays in its short (un-zero-padded) form; only the
    // encoder knows the AI-01 rendering.
    let mut data_str = String::from_utf8_lossy(primary).into_owned();
    if rest.is_empty() {
        return Ok(DecodeOutcome {
            sym,
            data_str,
            ai_data: Vec::new(),
            dl: None,
        });
    }
    data_str.push('|');
    let ai_start = data_str.len();
    let payload = &body[primary_len + EAN_COMPOSITE_INTRO.len()..];
    append_ai_component(&mut data_str, payload)?;
    let ai_data = aidata::process_and_validate(
        &data_str[ai_start..],
        opts.permit_unknown_ais,
        &opts.validations,
    )?;
    Ok(DecodeOutcome {
        sym,
        data_str,
        ai_data,
        dl: None,
    })
}

fn decode_ai(sym: Symbology, body: &str, opts: &Options) -> Result<DecodeOutcome, Failure> {
    let mut data_str = String::with_capacity(body.len() + 1);
    append_ai_component(&mut data_str, body)?;
    let ai_data =
        aidata::process_and_validate(&data_str, opts.permit_unknown_ais, &opts.validations)?;
    Ok(DecodeOutcome {
        sym,
        data_str,
        ai_data,
        dl: None,
    })
}

fn decode_plain(sym: Symbology, body: &str, opts: &Options) -> Result<DecodeOutcome, Failure> {
    let mut data_str = String::with_capacity(body.len() + 1);
    // A literal leading caret (after any run of backslashes) gains one
    // escaping backslash so the stored form cannot be mistaken for FNC1.
    if body.trim_start_matches('\\').starts_with('^') {
        data_str.push('\\');
    }
    data_str.push_str(body);
    if !dluri::has_dl_scheme(&data_str) {
        return Ok(DecodeOutcome {
            sym,
            data_str,
            ai_data: Vec::new(),
            dl: None,
        });
    }
    let dl = dluri::parse_dl_uri(&data_str, opts.permit_zero_suppressed_gtin_in_dl_uris)?;
    let ai_data = aidata::process_and_validate(
        &dl.element_string,
        opts.permit_unknown_ais,
        &opts.validations,
    )?;
    debug!("scan data carried a DL URI with {} AIs", ai_data.len());
    Ok(DecodeOutcome {
        sym,
        data_str,
        ai_data,
        dl: Some(dl),
    })
}

// Writes `^` then the payload with every GS restored to `^`. A literal
// caret in scan data is reserved and rejected.
fn append_ai_component(data_str: &mut String, payload: &str) -> Result<(), Gs1Error> {
    if payload.contains('^') {
        return Err(Gs1Error::IllegalCarat);
    }
    data_str.push('^');
    for c in payload.chars() {
        data_str.push(if c == GS { '^' } else { c });
    }
    Ok(())
}

/// Formats a canonical data string as scan data for `sym`.
///
/// The data string is split at the first `|` into a linear component and an
/// optional composite component; the input itself is never modified.
pub(crate) fn generate_scan_data(
    sym: Symbology,
    data_str: &str,
    opts: &Options,
) -> Result<String, Gs1Error> {
    if sym != Symbology::None && data_str.is_empty() {
        return Err(Gs1Error::NoData);
    }
    let (linear, composite) = match data_str.split_once('|') {
        Some((linear, composite)) => (linear, Some(composite)),
        None => (data_str, None),
    };
    let mut out = String::with_capacity(data_str.len() + 4);
    match sym {
        Symbology::None => return Err(Gs1Error::NoSymbology),
        Symbology::Qr | Symbology::Dm | Symbology::DotCode => {
            // No composite support: a '|' stays literal in the body.
            let mode = if data_str.starts_with('^') {
                AiMode::Ai
            } else {
                AiMode::NonAi
            };
            out.push(']');
            out.push_str(sym_id(sym, mode)?);
            scancat(&mut out, data_str);
        }
        Symbology::Gs1_128Cca | Symbology::Gs1_128Ccc if composite.is_none() => {
            if !linear.starts_with('^') {
                return Err(Gs1Error::MissingFnc1InFirstPosition);
            }
            out.push_str("]C1");
            scancat(&mut out, linear);
        }
        Symbology::Gs1_128Cca | Symbology::Gs1_128Ccc | Symbology::DataBarExpanded => {
            if !linear.starts_with('^') {
                return Err(Gs1Error::MissingFnc1InFirstPosition);
            }
            out.push_str(CC_SYM_ID);
            scancat(&mut out, linear);
            if let Some(composite) = composite {
                if !composite.starts_with('^') {
                    return Err(Gs1Error::MissingFnc1InFirstPosition);
                }
                // A separator is only needed when the linear half ends on a
                // variable-length AI.
                if last_ai_is_variable(linear, opts)? {
                    out.push(GS);
                }
                scancat(&mut out, composite);
            }
        }
        Symbology::DataBarOmni
        | Symbology::DataBarTruncated
        | Symbology::DataBarStacked
        | Symbology::DataBarStackedOmni
        | Symbology::DataBarLimited => {
            let primary = linear.strip_prefix("^01").unwrap_or(linear);
            let normalised = check_and_normalise_primary_data(primary, 14, opts.add_check_digit)?;
            if sym == Symbology::DataBarLimited && normalised.as_bytes()[0] >= b'2' {
                return Err(Gs1Error::PrimaryDataTooLarge);
            }
            out.push_str(CC_SYM_ID);
            out.push_str("01");
            out.push_str(&normalised);
            if let Some(composite) = composite {
                if !composite.starts_with('^') {
                    return Err(Gs1Error::MissingFnc1InFirstPosition);
                }
                scancat(&mut out, composite);
            }
        }
        Symbology::Ean13 | Symbology::Ean8 | Symbology::UpcA | Symbology::UpcE => {
            let primary_len = match sym {
                Symbology::Ean13 => 13,
                Symbology::Ean8 => 8,
                _ => 12,
            };
            let mode = if linear.starts_with('^') {
                AiMode::Ai
            } else {
                AiMode::NonAi
            };
            let primary = strip_gtin_prefix(linear, primary_len);
            let normalised =
                check_and_normalise_primary_data(primary, primary_len, opts.add_check_digit)?;
            out.push(']');
            out.push_str(sym_id(sym, mode)?);
            if matches!(sym, Symbology::UpcA | Symbology::UpcE) {
                out.push('0');
            }
            out.push_str(&normalised);
            if let Some(composite) = composite {
                if !composite.starts_with('^') {
                    return Err(Gs1Error::MissingFnc1InFirstPosition);
                }
                out.push_str(EAN_COMPOSITE_INTRO);
                scancat(&mut out, composite);
            }
        }
    }
    Ok(out)
}

fn sym_id(sym: Symbology, mode: AiMode) -> Result<&'static str, Gs1Error> {
    lookup_sym_id(sym, mode).ok_or(Gs1Error::FailedToProcessScanData)
}

// "^01" plus the zero padding that lifts an EAN/UPC primary to GTIN-14.
fn strip_gtin_prefix(linear: &str, primary_len: usize) -> &str {
    let zeros = 14 - primary_len;
    match linear.strip_prefix("^01") {
        Some(rest) if rest.len() >= zeros && rest.bytes().take(zeros).all(|b| b == b'0') => {
            &rest[zeros..]
        }
        _ => linear,
    }
}

fn last_ai_is_variable(linear: &str, opts: &Options) -> Result<bool, Gs1Error> {
    let ais =
        aidata::process_ai_data(linear, opts.permit_unknown_ais).map_err(|failure| failure.err)?;
    Ok(ais.last().map_or(false, |ai| ai.fnc1))
}

/// Appends one component of the canonical form to scan-data output.
///
/// A leading `^` was already expressed by the symbology identifier and is
/// dropped; every later `^` becomes a GS. Plain data instead sheds one
/// escaping backslash from a leading `\…\^` sequence.
pub(crate) fn scancat(out: &mut String, component: &str) {
    if let Some(body) = component.strip_prefix('^') {
        for c in body.chars() {
            out.push(if c == '^' { GS } else { c });
        }
    } else {
        let backslashes = component.len() - component.trim_start_matches('\\').len();
        if backslashes > 0 && component[backslashes..].starts_with('^') {
            out.push_str(&component[1..]);
        } else {
            out.push_str(component);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Options;

    fn decode(scan: &str) -> DecodeOutcome {
        process_scan_data(scan, &Options::default()).unwrap()
    }

    fn decode_err(scan: &str) -> Gs1Error {
        process_scan_data(scan, &Options::default()).unwrap_err().err
    }

    fn encode(sym: Symbology, data: &str) -> String {
        generate_scan_data(sym, data, &Options::default()).unwrap()
    }

    fn encode_err(sym: Symbology, data: &str) -> Gs1Error {
        generate_scan_data(sym, data, &Options::default()).unwrap_err()
    }

    #[test]
    fn test_generate_qr_plain() {
        assert_eq!(encode(Symbology::Qr, "TESTING"), "]Q1TESTING");
    }

    #[test]
    fn test_generate_qr_unescapes_leading_caret() {
        assert_eq!(encode(Symbology::Qr, "\\^TESTING"), "]Q1^TESTING");
        assert_eq!(encode(Symbology::Qr, "\\\\^TESTING"), "]Q1\\^TESTING");
        assert_eq!(encode(Symbology::Qr, "\\TESTING"), "]Q1\\TESTING");
    }

    #[test]
    fn test_generate_dm_ai_data() {
        assert_eq!(
            encode(Symbology::Dm, "^011231231231233310ABC123^99TESTING"),
            "]d2011231231231233310ABC123\x1D99TESTING"
        );
    }

    #[test]
    fn test_generate_expanded_composite_variable_last_ai() {
        assert_eq!(
            encode(
                Symbology::DataBarExpanded,
                "^011231231231233310ABC123^99TESTING|^98COMPOSITE^97XYZ"
            ),
            "]e0011231231231233310ABC123\x1D99TESTING\x1D98COMPOSITE\x1D97XYZ"
        );
    }

    #[test]
    fn test_generate_expanded_composite_fixed_last_ai() {
        // AI 11 is fixed-length, so no separator precedes the composite.
        assert_eq!(
            encode(
                Symbology::DataBarExpanded,
                "^011231231231233310ABC123^11991225|^98COMPOSITE^97XYZ"
            ),
            "]e0011231231231233310ABC123\x1D1199122598COMPOSITE\x1D97XYZ"
        );
    }

    #[test]
    fn test_generate_keeps_trailing_fnc1() {
        assert_eq!(
            encode(Symbology::DataBarExpanded, "^0112312312312333^"),
            "]e00112312312312333\x1D"
        );
    }

    #[test]
    fn test_generate_gs1_128_linear() {
        assert_eq!(
            encode(Symbology::Gs1_128Cca, "^0112312312312333"),
            "]C10112312312312333"
        );
        assert_eq!(
            encode_err(Symbology::Gs1_128Cca, "PLAIN"),
            Gs1Error::MissingFnc1InFirstPosition
        );
    }

    #[test]
    fn test_generate_gs1_128_composite_switches_to_cc_message() {
        assert_eq!(
            encode(Symbology::Gs1_128Cca, "^10LOT|^99XYZ"),
            "]e010LOT\x1D99XYZ"
        );
    }

    #[test]
    fn test_generate_databar_gtin() {
        assert_eq!(
            encode(Symbology::DataBarOmni, "^0112312312312333"),
            "]e00112312312312333"
        );
        assert_eq!(
            encode(Symbology::DataBarOmni, "12312312312333"),
            "]e00112312312312333"
        );
    }

    #[test]
    fn test_generate_databar_composite_has_no_separator() {
        assert_eq!(
            encode(Symbology::DataBarStacked, "^0112312312312333|^99XYZ"),
            "]e0011231231231233399XYZ"
        );
    }

    #[test]
    fn test_generate_databar_limited_ceiling() {
        assert_eq!(
            encode(Symbology::DataBarLimited, "^0115012345678907"),
            "]e00115012345678907"
        );
        assert_eq!(
            encode_err(Symbology::DataBarLimited, "^0125012345678904"),
            Gs1Error::PrimaryDataTooLarge
        );
    }

    #[test]
    fn test_generate_ean13() {
        assert_eq!(encode(Symbology::Ean13, "2112345678900"), "]E02112345678900");
        assert_eq!(
            encode(Symbology::Ean13, "^0102112345678900"),
            "]E02112345678900"
        );
    }

    #[test]
    fn test_generate_ean8() {
        assert_eq!(encode(Symbology::Ean8, "12345670"), "]E412345670");
        assert_eq!(
            encode(Symbology::Ean8, "^0100000012345670"),
            "]E412345670"
        );
    }

    #[test]
    fn test_generate_upca_zero_pads() {
        assert_eq!(
            encode(Symbology::UpcA, "036000291452"),
            "]E00036000291452"
        );
        assert_eq!(
            encode(Symbology::UpcA, "^0100036000291452"),
            "]E00036000291452"
        );
    }

    #[test]
    fn test_generate_ean13_composite() {
        assert_eq!(
            encode(Symbology::Ean13, "2112345678900|^99COMPOSITE^98XYZ"),
            "]E02112345678900|]e099COMPOSITE\x1D98XYZ"
        );
    }

    #[test]
    fn test_generate_with_add_check_digit() {
        let opts = Options {
            add_check_digit: true,
            ..Default::default()
        };
        assert_eq!(
            generate_scan_data(Symbology::Ean13, "211234567890", &opts).unwrap(),
            "]E02112345678900"
        );
        assert_eq!(
            generate_scan_data(Symbology::Ean13, "2112345678900", &opts).unwrap_err(),
            Gs1Error::PrimaryDataWrongLengthWithoutCheckDigit(12)
        );
    }

    #[test]
    fn test_generate_matrix_treats_delimiter_as_literal() {
        assert_eq!(encode(Symbology::Qr, "AB|CD"), "]Q1AB|CD");
    }

    #[test]
    fn test_generate_without_symbology_or_data() {
        assert_eq!(encode_err(Symbology::None, "TEST"), Gs1Error::NoSymbology);
        assert_eq!(encode_err(Symbology::Qr, ""), Gs1Error::NoData);
    }

    #[test]
    fn test_decode_rejects_missing_or_unknown_identifier() {
        assert_eq!(decode_err("]"), Gs1Error::MissingSymbologyIdentifier);
        assert_eq!(decode_err("]X"), Gs1Error::MissingSymbologyIdentifier);
        assert_eq!(decode_err("]XX"), Gs1Error::UnsupportedSymbologyIdentifier);
        assert_eq!(decode_err("Q1DATA"), Gs1Error::MissingSymbologyIdentifier);
    }

    #[test]
    fn test_decode_length_ceiling() {
        let ok = format!("]Q1{}", "A".repeat(MAX_DATA - 1));
        assert_eq!(decode(&ok).data_str.len(), MAX_DATA - 1);
        let long = format!("]Q1{}", "A".repeat(MAX_DATA));
        assert_eq!(decode_err(&long), Gs1Error::DataTooLong(MAX_DATA - 1));
    }

    #[test]
    fn test_decode_plain_qr() {
        let out = decode("]Q1TESTING");
        assert_eq!(out.sym, Symbology::Qr);
        assert_eq!(out.data_str, "TESTING");
        assert!(out.ai_data.is_empty());
    }

    #[test]
    fn test_decode_escapes_leading_caret() {
        assert_eq!(decode("]Q1^TESTING").data_str, "\\^TESTING");
        assert_eq!(decode("]Q1\\^A").data_str, "\\\\^A");
        assert_eq!(decode("]Q1\\A").data_str, "\\A");
    }

    #[test]
    fn test_decode_ai_scan() {
        let out = decode("]e0011231231231233310ABC123\x1D99TESTING");
        assert_eq!(out.sym, Symbology::DataBarExpanded);
        assert_eq!(out.data_str, "^011231231231233310ABC123^99TESTING");
        assert_eq!(out.ai_data.len(), 3);
    }

    #[test]
    fn test_decode_rejects_literal_caret_in_ai_scan() {
        assert_eq!(decode_err("]d2ABC^DEF"), Gs1Error::IllegalCarat);
    }

    #[test]
    fn test_decode_empty_ai_scan() {
        assert_eq!(decode_err("]e0"), Gs1Error::EmptyAiData);
    }

    #[test]
    fn test_decode_ean13_with_composite() {
        let out = decode("]E02112345678900|]e099COMPOSITE\x1D98XYZ");
        assert_eq!(out.sym, Symbology::Ean13);
        assert_eq!(out.data_str, "2112345678900|^99COMPOSITE^98XYZ");
        assert_eq!(out.ai_data.len(), 2);
    }

    #[test]
    fn test_decode_ean13_primary_lengths() {
        assert_eq!(
            decode_err("]E0211234567890"),
            Gs1Error::PrimaryScanDataTooShort
        );
        assert_eq!(
            decode_err("]E021123456789001"),
            Gs1Error::PrimaryMessageTooLong
        );
        assert_eq!(
            decode_err("]E0211234567890A"),
            Gs1Error::PrimaryMessageNotDigits
        );
        assert_eq!(
            decode_err("]E02112345678901"),
            Gs1Error::PrimaryMessageCheckDigit
        );
    }

    #[test]
    fn test_decode_ean8() {
        let out = decode("]E412345670");
        assert_eq!(out.sym, Symbology::Ean8);
        assert_eq!(out.data_str, "12345670");
    }

    #[test]
    fn test_decode_dl_uri() {
        let out = decode("]Q1https://example.com/01/12312312312333?99=TEST");
        assert_eq!(out.sym, Symbology::Qr);
        assert_eq!(out.data_str, "https://example.com/01/12312312312333?99=TEST");
        let dl = out.dl.unwrap();
        assert_eq!(dl.element_string, "^011231231231233399TEST");
        assert_eq!(out.ai_data.len(), 2);
    }

    #[test]
    fn test_decode_mixed_case_scheme_is_stored_not_parsed() {
        // Only the fully upper or lower scheme spellings trigger DL
        // extraction; this asymmetry is pinned behavior.
        let out = decode("]Q1HtTps://example.com/01/123");
        assert_eq!(out.data_str, "HtTps://example.com/01/123");
        assert!(out.dl.is_none());

        let upper = decode("]Q1HTTPS://EXAMPLE.COM/01/12312312312333");
        assert!(upper.dl.is_some());
    }

    #[test]
    fn test_decode_bad_dl_uri_fails_scan() {
        assert_eq!(
            decode_err("]Q1https://example.com/99/TEST"),
            Gs1Error::DlMissingPrimaryKey
        );
    }

    #[test]
    fn test_round_trip_scan_to_scan() {
        let opts = Options::default();
        for scan in [
            "]Q1TESTING",
            "]Q1^TESTING",
            "]Q1\\^TESTING",
            "]d2011231231231233310ABC123\x1D99TESTING",
            "]e0011231231231233310ABC123\x1D99TESTING",
            "]E02112345678900",
            "]E412345670",
            "]E02112345678900|]e099COMPOSITE\x1D98XYZ",
            "]Q1https://example.com/01/12312312312333?99=TEST",
        ] {
            let out = process_scan_data(scan, &opts).unwrap();
            let back = generate_scan_data(out.sym, &out.data_str, &opts).unwrap();
            assert_eq!(back, scan, "round trip differs for {scan:?}");
        }
    }

    #[test]
    fn test_round_trip_data_to_data() {
        let opts = Options::default();
        let data = "2112345678900|^99COMPOSITE^98XYZ";
        let scan = generate_scan_data(Symbology::Ean13, data, &opts).unwrap();
        let out = process_scan_data(&scan, &opts).unwrap();
        assert_eq!(out.sym, Symbology::Ean13);
        assert_eq!(out.data_str, data);
    }
}
