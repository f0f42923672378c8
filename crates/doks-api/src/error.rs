use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("access token is required")]
	MissingToken,

	#[error("invalid API URL `{url}`: {reason}")]
	InvalidUrl { url: String, reason: String },

	#[error("cluster ID cannot be empty")]
	EmptyClusterId,

	#[error("no account can access cluster `{0}`")]
	UnknownCluster(String),

	#[error("{what}: {source}")]
	Request {
		what: String,
		#[source]
		source: reqwest::Error,
	},

	#[error("{what}: {status}: {message}")]
	Api {
		what: String,
		status: StatusCode,
		message: String,
	},
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
