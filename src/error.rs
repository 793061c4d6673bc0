use thiserror::Error;

/// Why a single resolution attempt failed.
///
/// All variants are local to one attempt: they mark that attempt as failed
/// and never abort the run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
	#[error("connection failed: {0}")]
	Connect(String),

	#[error("timed out")]
	Timeout,

	#[error("TLS handshake failed: {0}")]
	Handshake(String),

	#[error("response code {0}")]
	Rcode(String),

	#[error("no A records in answer")]
	EmptyAnswer,

	#[error("HTTP status {0}")]
	HttpStatus(u16),

	#[error("HTTP request failed: {0}")]
	Http(String),

	#[error("unsupported protocol: {0}")]
	UnsupportedProtocol(String),

	#[error("malformed message: {0}")]
	Malformed(String),

	/// The attempt's task died before reporting, e.g. it panicked
	#[error("query task failed: {0}")]
	TaskFailed(String),
}
