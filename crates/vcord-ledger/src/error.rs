//! Ledger error types.

/// Errors from a [`LedgerRpc`](crate::LedgerRpc) call.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The request never produced an HTTP response.
    #[error("{method}: transport failure: {source}")]
    Transport {
        /// RPC method being called.
        method: String,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The request exceeded the configured timeout.
    #[error("{method}: request timed out")]
    Timeout {
        /// RPC method being called.
        method: String,
    },

    /// The node rejected the RPC credentials.
    #[error("ledger node rejected RPC credentials")]
    Unauthorized,

    /// Non-success HTTP status without a JSON-RPC error body.
    #[error("{method}: HTTP {status}: {body}")]
    Http {
        /// RPC method being called.
        method: String,
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The node returned a JSON-RPC error object.
    #[error("{method}: RPC error {code}: {message}")]
    Rpc {
        /// RPC method being called.
        method: String,
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },

    /// The ledger refused to accept a transaction.
    #[error("transaction rejected ({code}): {message}")]
    Rejected {
        /// Node rejection code.
        code: i64,
        /// Node rejection reason.
        message: String,
    },

    /// The transaction spends an output that is already spent or unknown.
    #[error("double-spend conflict: {message}")]
    DoubleSpend {
        /// Node rejection reason.
        message: String,
    },

    /// The response did not have the expected shape.
    #[error("{method}: invalid response: {reason}")]
    InvalidResponse {
        /// RPC method being called.
        method: String,
        /// What was wrong with it.
        reason: String,
    },
}

/// Rejection reasons that mean an input is spent, conflicting, or unknown.
const CONFLICT_MARKERS: [&str; 4] = [
    "txn-mempool-conflict",
    "bad-txns-inputs-missingorspent",
    "missing-inputs",
    "insufficient fee, rejecting replacement",
];

impl LedgerError {
    /// Classify a broadcast rejection as a double-spend or plain rejection.
    pub fn from_broadcast_rejection(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        if CONFLICT_MARKERS.iter().any(|m| message.contains(m)) {
            Self::DoubleSpend { message }
        } else {
            Self::Rejected { code, message }
        }
    }
}
