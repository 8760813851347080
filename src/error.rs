//! Error types.
use thiserror::Error;

/// Errors reported by the syntax engine.
///
/// Every failure aborts the current call; nothing is retried. The `Display`
/// strings are the canonical renderings returned by
/// [`crate::Gs1Encoder::err_msg`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Gs1Error {
    #[error("No symbology selected")]
    NoSymbology,
    #[error("No data")]
    NoData,
    #[error("Missing symbology identifier")]
    MissingSymbologyIdentifier,
    #[error("Unsupported symbology identifier")]
    UnsupportedSymbologyIdentifier,
    #[error("Maximum data length is {0} characters")]
    DataTooLong(usize),
    #[error("Primary scan data is too short")]
    PrimaryScanDataTooShort,
    #[error("Primary message is too long")]
    PrimaryMessageTooLong,
    #[error("Primary message may only contain digits")]
    PrimaryMessageNotDigits,
    #[error("Primary message check digit is incorrect")]
    PrimaryMessageCheckDigit,
    #[error("Scan data contains illegal ^ character")]
    IllegalCarat,
    #[error("Failed to process scan data")]
    FailedToProcessScanData,
    #[error("Primary data must be {0} digits")]
    PrimaryDataWrongLength(usize),
    #[error("Primary data must be {0} digits without check digit")]
    PrimaryDataWrongLengthWithoutCheckDigit(usize),
    #[error("Primary data must be all digits")]
    PrimaryDataNotDigits,
    #[error("Primary data check digit is incorrect")]
    PrimaryDataCheckDigit,
    #[error("Primary data is too large")]
    PrimaryDataTooLarge,

    #[error("The AI data is empty")]
    EmptyAiData,
    #[error("AI data must start with the FNC1 character")]
    MissingFnc1InFirstPosition,
    #[error("Unrecognised AI: ({0})")]
    UnrecognisedAi(String),
    #[error("AI ({0}) value is too short")]
    AiValueTooShort(String),
    #[error("AI ({0}) value is too long")]
    AiValueTooLong(String),
    #[error("AI ({0}) contains an invalid character")]
    InvalidAiCharacter(String),
    #[error("AI ({0}) data has incorrect check digit")]
    AiCheckDigit(String),
    #[error("Required AIs for AI ({0}) are not satisfied")]
    RequisitesNotSatisfied(String),
    #[error("Repeated AI ({0}) instances must have equal values")]
    RepeatedAiMismatch(String),
    #[error("AIs ({0}) and ({1}) are mutually exclusive")]
    ExclusiveAis(String, String),
    #[error("This validation cannot be disabled")]
    ValidationLocked,

    #[error("Invalid DL URI: {0}")]
    DlUriSyntax(#[from] url::ParseError),
    #[error("A DL URI must contain a primary key AI")]
    DlMissingPrimaryKey,
    #[error("A GTIN in a DL URI must be 14 digits")]
    DlGtinNotFourteenDigits,
    #[error("Cannot create a DL URI without a primary key AI")]
    DlNoPrimaryKeyAi,
    #[error("Unknown AI ({0}) cannot be used as a DL URI attribute")]
    UnknownAiNotDlAttribute(String),
}

/// A failure together with a marked-up copy of the offending data, when the
/// failing stage can point at the exact span.
#[derive(Debug, Clone)]
pub(crate) struct Failure {
    pub err: Gs1Error,
    pub markup: Option<String>,
}

impl From<Gs1Error> for Failure {
    fn from(err: Gs1Error) -> Self {
        Failure { err, markup: None }
    }
}

impl From<url::ParseError> for Failure {
    fn from(err: url::ParseError) -> Self {
        Gs1Error::from(err).into()
    }
}
