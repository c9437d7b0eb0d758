//! Normalized operation results and the composite operation log.
//!
//! Every directory primitive resolves to a [`SubOperation`], and logical
//! actions that issue several primitives collect them in an
//! [`OperationLog`]. Both are plain serializable data: failure travels
//! in-band as a normalized [`OperationError`], never as `Err`.

use serde::Serialize;

/// Classification of a failed directory operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Input rejected locally before any remote call was made.
    Validation,
    /// Authentication failed.
    Bind,
    /// The target entry does not exist.
    NotFound,
    /// The entry being added already exists.
    AlreadyExists,
    /// The server rejected the change as a schema or attribute-rule violation.
    Constraint,
    /// The server could not be reached, or the connection broke mid-operation.
    Transport,
    /// Any other protocol-level rejection.
    Other,
}

impl ErrorKind {
    /// Classifies a protocol result code.
    #[must_use]
    pub const fn from_result_code(code: u32) -> Self {
        match code {
            32 => Self::NotFound,
            48 | 49 => Self::Bind,
            68 => Self::AlreadyExists,
            16 | 19 | 20 | 21 | 64 | 65 | 67 | 69 => Self::Constraint,
            _ => Self::Other,
        }
    }

    /// Stable lower-camel-case name matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Bind => "bind",
            Self::NotFound => "notFound",
            Self::AlreadyExists => "alreadyExists",
            Self::Constraint => "constraint",
            Self::Transport => "transport",
            Self::Other => "other",
        }
    }
}

/// Standard name assigned to a protocol result code, `unknown` otherwise.
#[must_use]
pub const fn result_code_name(code: u32) -> &'static str {
    match code {
        0 => "success",
        1 => "operationsError",
        2 => "protocolError",
        3 => "timeLimitExceeded",
        4 => "sizeLimitExceeded",
        5 => "compareFalse",
        6 => "compareTrue",
        7 => "authMethodNotSupported",
        8 => "strongerAuthRequired",
        10 => "referral",
        11 => "adminLimitExceeded",
        12 => "unavailableCriticalExtension",
        13 => "confidentialityRequired",
        14 => "saslBindInProgress",
        16 => "noSuchAttribute",
        17 => "undefinedAttributeType",
        18 => "inappropriateMatching",
        19 => "constraintViolation",
        20 => "attributeOrValueExists",
        21 => "invalidAttributeSyntax",
        32 => "noSuchObject",
        33 => "aliasProblem",
        34 => "invalidDNSyntax",
        36 => "aliasDereferencingProblem",
        48 => "inappropriateAuthentication",
        49 => "invalidCredentials",
        50 => "insufficientAccessRights",
        51 => "busy",
        52 => "unavailable",
        53 => "unwillingToPerform",
        54 => "loopDetect",
        64 => "namingViolation",
        65 => "objectClassViolation",
        66 => "notAllowedOnNonLeaf",
        67 => "notAllowedOnRDN",
        68 => "entryAlreadyExists",
        69 => "objectClassModsProhibited",
        71 => "affectsMultipleDSAs",
        80 => "other",
        _ => "unknown",
    }
}

/// Normalized error carried by a failed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationError {
    /// Failure classification.
    pub kind: ErrorKind,
    /// Protocol result code, when the failure came from the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
    /// Short stable error name.
    pub name: String,
    /// Human-readable message.
    pub message: String,
}

impl OperationError {
    /// Builds an error from a protocol result code and its diagnostic text.
    ///
    /// An empty diagnostic (common for bind failures) falls back to the
    /// result-code name so the message is never blank.
    #[must_use]
    pub fn from_result_code(code: u32, message: impl Into<String>) -> Self {
        let name = result_code_name(code);
        let mut message = message.into();
        if message.is_empty() {
            message = name.to_string();
        }

        Self {
            kind: ErrorKind::from_result_code(code),
            code: Some(code),
            name: name.to_string(),
            message,
        }
    }

    /// An error for input rejected before anything was sent to the server.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            code: None,
            name: "validationError".to_string(),
            message: message.into(),
        }
    }

    /// A domain-level not-found error (no protocol code attached).
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            code: None,
            name: "notFound".to_string(),
            message: message.into(),
        }
    }

    /// A transport-level failure such as a broken connection or a timeout.
    #[must_use]
    pub fn transport(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Transport,
            code: None,
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Result of one directory primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubOperation {
    /// Operation label, e.g. `bind uid=alice,ou=people,dc=example,dc=org`.
    pub op: String,
    /// Whether the operation succeeded.
    pub ok: bool,
    /// The failure, present exactly when `ok` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationError>,
}

impl SubOperation {
    /// A successful result.
    #[must_use]
    pub fn succeeded(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            ok: true,
            error: None,
        }
    }

    /// A failed result carrying its error.
    #[must_use]
    pub fn failed(op: impl Into<String>, error: OperationError) -> Self {
        Self {
            op: op.into(),
            ok: false,
            error: Some(error),
        }
    }
}

/// Ordered record of the primitives issued for one logical action.
///
/// `ok` starts true and latches false at the first failure; it never goes
/// back up. Every failure's error is kept in push order, so multi-step
/// actions report everything that went wrong rather than only the first
/// thing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationLog {
    op: String,
    ok: bool,
    subops: Vec<SubOperation>,
    errors: Vec<OperationError>,
}

impl OperationLog {
    /// Starts an empty, successful log for the named action.
    #[must_use]
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            ok: true,
            subops: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Records a sub-operation result, returning whether it succeeded.
    pub fn push(&mut self, subop: SubOperation) -> bool {
        let succeeded = subop.ok;
        if !succeeded {
            self.ok = false;
            if let Some(error) = &subop.error {
                self.errors.push(error.clone());
            }
        }
        self.subops.push(subop);
        succeeded
    }

    /// Records a failure that did not come from a directory primitive,
    /// such as a local validation rejection.
    pub fn fail(&mut self, error: OperationError) {
        self.ok = false;
        self.errors.push(error);
    }

    /// The action label.
    #[must_use]
    pub fn op(&self) -> &str {
        &self.op
    }

    /// Whether every step of the action succeeded so far.
    #[must_use]
    pub const fn ok(&self) -> bool {
        self.ok
    }

    /// The recorded sub-operations, in issue order.
    #[must_use]
    pub fn subops(&self) -> &[SubOperation] {
        &self.subops
    }

    /// The errors of every failed step, in the order they occurred.
    #[must_use]
    pub fn errors(&self) -> &[OperationError] {
        &self.errors
    }

    /// The first error, when any step failed.
    #[must_use]
    pub fn first_error(&self) -> Option<&OperationError> {
        self.errors.first()
    }
}
