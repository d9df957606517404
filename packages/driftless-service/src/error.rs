pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid weights: {message}")]
	InvalidWeights { message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Internal error: {message}")]
	Internal { message: String },
}
