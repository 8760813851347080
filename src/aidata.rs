//! Application Identifier element strings.
//!
//! The canonical internal form of GS1 data is an element string: a `^`
//! (logical FNC1) followed by AI tag/value pairs, with `^` separating a
//! variable-length value from the next tag. This module extracts AIs from
//! that form, applies the per-AI lint rules and cross-AI validations, and
//! converts to and from the human-readable bracketed syntax.
use serde::{Deserialize, Serialize};

use crate::error::{Failure, Gs1Error};
use crate::primary::check_digit;

/// One Application Identifier extracted from an element string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiValue {
    /// The AI tag, e.g. `01`.
    pub ai: String,
    /// The AI's value.
    pub value: String,
    /// Whether the AI is variable-length and needs an FNC1 separator when
    /// it is not the final element.
    pub fnc1: bool,
}

/// Cross-AI validation passes applied after extraction.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    #[serde(rename = "mutex_ais")]
    MutexAis,
    #[serde(rename = "requisite_ais")]
    RequisiteAis,
    #[serde(rename = "repeated_ais")]
    RepeatedAis,
    #[serde(rename = "unknown_ai_not_dl_attr")]
    UnknownAiNotDlAttr,
}

#[derive(Debug, Clone)]
pub(crate) struct Validations {
    mutex_ais: bool,
    requisite_ais: bool,
    repeated_ais: bool,
    unknown_ai_not_dl_attr: bool,
}

impl Default for Validations {
    fn default() -> Self {
        Validations {
            mutex_ais: true,
            requisite_ais: true,
            repeated_ais: true,
            unknown_ai_not_dl_attr: true,
        }
    }
}

impl Validations {
    pub fn enabled(&self, validation: Validation) -> bool {
        match validation {
            Validation::MutexAis => self.mutex_ais,
            Validation::RequisiteAis => self.requisite_ais,
            Validation::RepeatedAis => self.repeated_ais,
            Validation::UnknownAiNotDlAttr => self.unknown_ai_not_dl_attr,
        }
    }

    /// `RepeatedAis` is locked on: equal-value repeats are a hard rule of
    /// the element string syntax, not an optional lint.
    pub fn set(&mut self, validation: Validation, enabled: bool) -> Result<(), Gs1Error> {
        if validation == Validation::RepeatedAis && !enabled {
            return Err(Gs1Error::ValidationLocked);
        }
        match validation {
            Validation::MutexAis => self.mutex_ais = enabled,
            Validation::RequisiteAis => self.requisite_ais = enabled,
            Validation::RepeatedAis => self.repeated_ais = enabled,
            Validation::UnknownAiNotDlAttr => self.unknown_ai_not_dl_attr = enabled,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AiKind {
    Numeric,
    Cset82,
}

/// One row of the embedded AI dictionary.
pub(crate) struct AiEntry {
    pub ai: &'static str,
    pub fnc1: bool,
    pub min: usize,
    pub max: usize,
    pub kind: AiKind,
    pub csum: bool,
    pub title: &'static str,
}

const fn fixed(
    ai: &'static str,
    len: usize,
    kind: AiKind,
    csum: bool,
    title: &'static str,
) -> AiEntry {
    AiEntry {
        ai,
        fnc1: false,
        min: len,
        max: len,
        kind,
        csum,
        title,
    }
}

const fn variable(
    ai: &'static str,
    min: usize,
    max: usize,
    kind: AiKind,
    title: &'static str,
) -> AiEntry {
    AiEntry {
        ai,
        fnc1: true,
        min,
        max,
        kind,
        csum: false,
        title,
    }
}

/// Compact AI dictionary: tag, length rule, charset, check digit rule and
/// data title for the commonly carried AIs.
pub(crate) const AI_DICTIONARY: &[AiEntry] = &[
    fixed("00", 18, AiKind::Numeric, true, "SSCC"),
    fixed("01", 14, AiKind::Numeric, true, "GTIN"),
    fixed("02", 14, AiKind::Numeric, true, "CONTENT"),
    variable("10", 1, 20, AiKind::Cset82, "BATCH/LOT"),
    fixed("11", 6, AiKind::Numeric, false, "PROD DATE"),
    fixed("12", 6, AiKind::Numeric, false, "DUE DATE"),
    fixed("13", 6, AiKind::Numeric, false, "PACK DATE"),
    fixed("15", 6, AiKind::Numeric, false, "BEST BEFORE or BEST BY"),
    fixed("16", 6, AiKind::Numeric, false, "SELL BY"),
    fixed("17", 6, AiKind::Numeric, false, "USE BY OR EXPIRY"),
    fixed("20", 2, AiKind::Numeric, false, "VARIANT"),
    variable("21", 1, 20, AiKind::Cset82, "SERIAL"),
    variable("22", 1, 20, AiKind::Cset82, "CPV"),
    variable("30", 1, 8, AiKind::Numeric, "VAR COUNT"),
    variable("37", 1, 8, AiKind::Numeric, "COUNT"),
    variable("90", 1, 30, AiKind::Cset82, "INTERNAL"),
    variable("91", 1, 90, AiKind::Cset82, "INTERNAL"),
    variable("92", 1, 90, AiKind::Cset82, "INTERNAL"),
    variable("93", 1, 90, AiKind::Cset82, "INTERNAL"),
    variable("94", 1, 90, AiKind::Cset82, "INTERNAL"),
    variable("95", 1, 90, AiKind::Cset82, "INTERNAL"),
    variable("96", 1, 90, AiKind::Cset82, "INTERNAL"),
    variable("97", 1, 90, AiKind::Cset82, "INTERNAL"),
    variable("98", 1, 90, AiKind::Cset82, "INTERNAL"),
    variable("99", 1, 90, AiKind::Cset82, "INTERNAL"),
    variable("235", 1, 28, AiKind::Cset82, "TPX"),
    variable("240", 1, 30, AiKind::Cset82, "ADDITIONAL ID"),
    variable("241", 1, 30, AiKind::Cset82, "CUST. PART No."),
    variable("250", 1, 30, AiKind::Cset82, "SECONDARY SERIAL"),
    variable("251", 1, 30, AiKind::Cset82, "REF. TO SOURCE"),
    variable("253", 14, 30, AiKind::Cset82, "GDTI"),
    variable("254", 1, 20, AiKind::Cset82, "GLN EXTENSION COMPONENT"),
    variable("255", 14, 25, AiKind::Numeric, "GCN"),
    variable("400", 1, 30, AiKind::Cset82, "ORDER NUMBER"),
    variable("401", 1, 30, AiKind::Cset82, "GINC"),
    fixed("402", 17, AiKind::Numeric, true, "GSIN"),
    variable("403", 1, 30, AiKind::Cset82, "ROUTE"),
    fixed("410", 13, AiKind::Numeric, true, "SHIP TO LOC"),
    fixed("411", 13, AiKind::Numeric, true, "BILL TO"),
    fixed("412", 13, AiKind::Numeric, true, "PURCHASE FROM"),
    fixed("413", 13, AiKind::Numeric, true, "SHIP FOR LOC"),
    fixed("414", 13, AiKind::Numeric, true, "LOC No."),
    fixed("415", 13, AiKind::Numeric, true, "PAY TO"),
    fixed("416", 13, AiKind::Numeric, true, "PROD/SERV LOC"),
    fixed("417", 13, AiKind::Numeric, true, "PARTY"),
    variable("420", 1, 20, AiKind::Cset82, "SHIP TO POST"),
    variable("8003", 14, 30, AiKind::Cset82, "GRAI"),
    variable("8004", 1, 30, AiKind::Cset82, "GIAI"),
    fixed("8006", 18, AiKind::Numeric, false, "ITIP"),
    variable("8010", 1, 30, AiKind::Cset82, "CPID"),
    variable("8013", 1, 25, AiKind::Cset82, "GMN"),
    fixed("8017", 18, AiKind::Numeric, true, "GSRN - PROVIDER"),
    fixed("8018", 18, AiKind::Numeric, true, "GSRN - RECIPIENT"),
    variable("8020", 1, 25, AiKind::Cset82, "REF No."),
];

/// AIs that may only appear alongside at least one of the listed AIs.
const REQUISITE_AIS: &[(&str, &[&str])] = &[
    ("02", &["37"]),
    ("37", &["02"]),
    ("20", &["01", "02"]),
    ("21", &["01", "8006"]),
    ("22", &["01"]),
    ("235", &["01"]),
    ("250", &["01"]),
    ("251", &["01"]),
    ("254", &["414"]),
];

/// AI pairs that may not appear together.
const MUTEX_AIS: &[(&str, &str)] = &[("01", "8006")];

pub(crate) fn lookup_ai(ai: &str) -> Option<&'static AiEntry> {
    AI_DICTIONARY.iter().find(|entry| entry.ai == ai)
}

/// Whether `ai` needs an FNC1 separator after its value. Unknown AIs are
/// treated as variable-length.
pub(crate) fn ai_is_variable(ai: &str) -> bool {
    lookup_ai(ai).map_or(true, |entry| entry.fnc1)
}

// CSET 82, the character set permitted in alphanumeric AI values.
fn in_cset82(b: u8) -> bool {
    matches!(b, b'!' | b'"' | b'%'..=b'?' | b'A'..=b'Z' | b'_' | b'a'..=b'z')
}

/// Extracts the AIs from an element string beginning with `^`.
///
/// A `|` at an element boundary introduces a composite component, which must
/// itself begin with `^`. An optional `^` after a fixed-length value is
/// tolerated, as is a trailing FNC1.
pub(crate) fn process_ai_data(
    data: &str,
    permit_unknown_ais: bool,
) -> Result<Vec<AiValue>, Failure> {
    let bytes = data.as_bytes();
    if bytes.first() != Some(&b'^') {
        return Err(Gs1Error::MissingFnc1InFirstPosition.into());
    }
    if bytes.len() == 1 {
        return Err(Gs1Error::EmptyAiData.into());
    }
    let mut ais = Vec::new();
    let mut pos = 1;
    while pos < bytes.len() {
        if bytes[pos] == b'|' {
            // Composite component boundary; what follows is a complete
            // element string of its own.
            if bytes.get(pos + 1) != Some(&b'^') {
                return Err(Gs1Error::MissingFnc1InFirstPosition.into());
            }
            if pos + 2 >= bytes.len() {
                return Err(Gs1Error::EmptyAiData.into());
            }
            pos += 2;
            continue;
        }
        let (ai, entry) = match_ai(data, pos, permit_unknown_ais)?;
        pos += ai.len();
        let vstart = pos;
        let vend = match entry {
            Some(entry) if !entry.fnc1 => {
                let vend = vstart + entry.max;
                if vend > bytes.len()
                    || bytes[vstart..vend].iter().any(|&b| b == b'^' || b == b'|')
                {
                    return Err(Gs1Error::AiValueTooShort(ai).into());
                }
                vend
            }
            _ => {
                let mut vend = vstart;
                while vend < bytes.len() && bytes[vend] != b'^' && bytes[vend] != b'|' {
                    vend += 1;
                }
                vend
            }
        };
        let value = &bytes[vstart..vend];
        if let Some(entry) = entry {
            lint_value(data, &ai, entry, value, vstart, vend)?;
        }
        ais.push(AiValue {
            fnc1: entry.map_or(true, |e| e.fnc1),
            value: String::from_utf8_lossy(value).into_owned(),
            ai,
        });
        pos = vend;
        if bytes.get(pos) == Some(&b'^') {
            pos += 1;
        }
    }
    Ok(ais)
}

/// Extraction plus the enabled cross-AI validations.
pub(crate) fn process_and_validate(
    data: &str,
    permit_unknown_ais: bool,
    validations: &Validations,
) -> Result<Vec<AiValue>, Failure> {
    let ais = process_ai_data(data, permit_unknown_ais)?;
    validate_ai_associations(&ais, validations)?;
    Ok(ais)
}

fn match_ai(
    data: &str,
    pos: usize,
    permit_unknown: bool,
) -> Result<(String, Option<&'static AiEntry>), Failure> {
    let bytes = data.as_bytes();
    // Longest dictionary tag wins, so a three-digit AI is never split into
    // a two-digit AI plus a digit of value.
    for len in [4, 3, 2] {
        let end = pos + len;
        if end > bytes.len() || !bytes[pos..end].iter().all(|b| b.is_ascii_digit()) {
            continue;
        }
        if let Some(entry) = lookup_ai(&data[pos..end]) {
            return Ok((data[pos..end].to_string(), Some(entry)));
        }
    }
    if permit_unknown
        && pos + 2 <= bytes.len()
        && bytes[pos..pos + 2].iter().all(|b| b.is_ascii_digit())
    {
        return Ok((data[pos..pos + 2].to_string(), None));
    }
    let end = (pos + 4).min(bytes.len());
    let shown = String::from_utf8_lossy(&bytes[pos..end]).into_owned();
    Err(Gs1Error::UnrecognisedAi(shown).into())
}

fn lint_value(
    data: &str,
    ai: &str,
    entry: &AiEntry,
    value: &[u8],
    vstart: usize,
    vend: usize,
) -> Result<(), Failure> {
    if entry.fnc1 {
        if value.len() < entry.min {
            return Err(Gs1Error::AiValueTooShort(ai.to_string()).into());
        }
        if value.len() > entry.max {
            return Err(Gs1Error::AiValueTooLong(ai.to_string()).into());
        }
    }
    let charset_ok = match entry.kind {
        AiKind::Numeric => value.iter().all(|b| b.is_ascii_digit()),
        AiKind::Cset82 => value.iter().all(|&b| in_cset82(b)),
    };
    if !charset_ok {
        return Err(marked(
            data,
            vstart,
            vend,
            Gs1Error::InvalidAiCharacter(ai.to_string()),
        ));
    }
    if entry.csum {
        let bad = value
            .split_last()
            .map_or(true, |(last, payload)| *last != check_digit(payload));
        if bad {
            return Err(marked(
                data,
                vstart,
                vend,
                Gs1Error::AiCheckDigit(ai.to_string()),
            ));
        }
    }
    Ok(())
}

// Markup delimits the offending value with '|' so callers can highlight it.
fn marked(data: &str, vstart: usize, vend: usize, err: Gs1Error) -> Failure {
    let bytes = data.as_bytes();
    let markup = format!(
        "{}|{}|{}",
        String::from_utf8_lossy(&bytes[..vstart]),
        String::from_utf8_lossy(&bytes[vstart..vend]),
        String::from_utf8_lossy(&bytes[vend..])
    );
    Failure {
        err,
        markup: Some(markup),
    }
}

pub(crate) fn validate_ai_associations(
    ais: &[AiValue],
    validations: &Validations,
) -> Result<(), Gs1Error> {
    if validations.enabled(Validation::RepeatedAis) {
        for (i, a) in ais.iter().enumerate() {
            if ais[..i].iter().any(|b| b.ai == a.ai && b.value != a.value) {
                return Err(Gs1Error::RepeatedAiMismatch(a.ai.clone()));
            }
        }
    }
    if validations.enabled(Validation::MutexAis) {
        for &(a, b) in MUTEX_AIS {
            if ais.iter().any(|v| v.ai == a) && ais.iter().any(|v| v.ai == b) {
                return Err(Gs1Error::ExclusiveAis(a.to_string(), b.to_string()));
            }
        }
    }
    if validations.enabled(Validation::RequisiteAis) {
        for v in ais {
            if let Some((_, required)) = REQUISITE_AIS.iter().find(|(ai, _)| *ai == v.ai) {
                if !required.iter().any(|r| ais.iter().any(|w| w.ai == *r)) {
                    return Err(Gs1Error::RequisitesNotSatisfied(v.ai.clone()));
                }
            }
        }
    }
    Ok(())
}

/// Converts bracketed AI syntax, `(nn)value(mm)value…`, to an element
/// string. A `(` inside a value is escaped as `\(`.
pub(crate) fn bracketed_to_element_string(data: &str) -> Result<String, Gs1Error> {
    let mut out = String::with_capacity(data.len());
    out.push('^');
    let mut rest = data;
    let mut pending_sep = false;
    while !rest.is_empty() {
        let Some(stripped) = rest.strip_prefix('(') else {
            return Err(Gs1Error::UnrecognisedAi(
                rest.chars().take(4).collect::<String>(),
            ));
        };
        let Some(close) = stripped.find(')') else {
            return Err(Gs1Error::UnrecognisedAi(
                stripped.chars().take(4).collect::<String>(),
            ));
        };
        let ai = &stripped[..close];
        if ai.len() < 2 || ai.len() > 4 || !ai.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Gs1Error::UnrecognisedAi(ai.to_string()));
        }
        let tail = &stripped[close + 1..];
        let mut value = String::new();
        let mut next_ai = tail.len();
        let mut iter = tail.char_indices().peekable();
        while let Some((i, c)) = iter.next() {
            match c {
                '\\' => {
                    if let Some(&(_, escaped)) = iter.peek() {
                        if escaped == '(' || escaped == '\\' {
                            iter.next();
                            value.push(escaped);
                            continue;
                        }
                    }
                    value.push('\\');
                }
                '(' => {
                    next_ai = i;
                    break;
                }
                _ => value.push(c),
            }
        }
        if pending_sep {
            out.push('^');
        }
        out.push_str(ai);
        out.push_str(&value);
        pending_sep = ai_is_variable(ai);
        rest = &tail[next_ai..];
    }
    if out.len() == 1 {
        return Err(Gs1Error::EmptyAiData);
    }
    Ok(out)
}

/// Renders extracted AIs in bracketed syntax.
pub(crate) fn element_to_bracketed(ais: &[AiValue]) -> String {
    let mut out = String::new();
    for v in ais {
        out.push('(');
        out.push_str(&v.ai);
        out.push(')');
        for c in v.value.chars() {
            if c == '(' {
                out.push('\\');
            }
            out.push(c);
        }
    }
    out
}

/// HRI text, one `"(ai) value"` line per AI, with the dictionary data title
/// prefixed when requested and known.
pub(crate) fn hri_lines(ais: &[AiValue], include_titles: bool) -> Vec<String> {
    ais.iter()
        .map(|v| {
            let title = if include_titles {
                lookup_ai(&v.ai).map(|entry| entry.title)
            } else {
                None
            };
            match title {
                Some(title) => format!("{} ({}) {}", title, v.ai, v.value),
                None => format!("({}) {}", v.ai, v.value),
            }
        })
        .collect()
}
