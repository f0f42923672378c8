//! The parts of the DigitalOcean API v2 needed to find clusters and fetch their credentials.

use doks_kubeconfig::ClusterDescriptor;
use reqwest::{Response, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::{Error, Result};

pub const DEFAULT_API_URL: &str = "https://api.digitalocean.com/";
const PER_PAGE: u32 = 200;

#[derive(Deserialize)]
struct ClusterPage {
	#[serde(default)]
	kubernetes_clusters: Vec<ApiCluster>,
	#[serde(default)]
	links: Links,
}

#[derive(Deserialize)]
struct ApiCluster {
	id: String,
	name: String,
	region: String,
}

impl From<ApiCluster> for ClusterDescriptor {
	fn from(c: ApiCluster) -> Self {
		Self {
			id: c.id,
			name: c.name,
			region: c.region,
		}
	}
}

#[derive(Default, Deserialize)]
struct Links {
	#[serde(default)]
	pages: Option<Pages>,
}

#[derive(Default, Deserialize)]
struct Pages {
	next: Option<String>,
}

/// Error body returned by the API, e.g. `{"id": "not_found", "message": "..."}`.
#[derive(Deserialize)]
struct ApiError {
	message: String,
}

/// A client for one account, authenticated with a personal access token.
#[derive(Debug, Clone)]
pub struct Client {
	http: reqwest::Client,
	base: Url,
	token: String,
}

impl Client {
	/// `api_url` overrides [`DEFAULT_API_URL`]; an empty override is ignored.
	pub fn new(token: impl Into<String>, api_url: Option<&str>) -> Result<Self> {
		let token = token.into();
		if token.trim().is_empty() {
			return Err(Error::MissingToken);
		}
		let base = parse_base(api_url.filter(|u| !u.is_empty()).unwrap_or(DEFAULT_API_URL))?;
		let http = reqwest::Client::builder()
			.user_agent(concat!("kubectl-doks/", env!("CARGO_PKG_VERSION")))
			.build()
			.map_err(|source| Error::Request {
				what: "building HTTP client".into(),
				source,
			})?;
		Ok(Self { http, base, token })
	}

	/// Every Kubernetes cluster in the account, across all result pages.
	#[instrument(skip_all, fields(base = %self.base))]
	pub async fn list_clusters(&self) -> Result<Vec<ClusterDescriptor>> {
		let url = self.endpoint(&["v2", "kubernetes", "clusters"])?;
		let mut clusters = Vec::new();

		for page in 1u32.. {
			let what = format!("listing clusters (page {page})");
			let response = self
				.http
				.get(url.clone())
				.bearer_auth(&self.token)
				.query(&[("page", page), ("per_page", PER_PAGE)])
				.send()
				.await
				.map_err(|source| request_error(&what, source))?;
			let body: ClusterPage = check(response, &what)
				.await?
				.json()
				.await
				.map_err(|source| request_error(&what, source))?;

			debug!(page, count = body.kubernetes_clusters.len(), "listed clusters");
			let last = body.kubernetes_clusters.is_empty()
				|| body.links.pages.and_then(|p| p.next).is_none();
			clusters.extend(body.kubernetes_clusters.into_iter().map(Into::into));
			if last {
				break;
			}
		}

		Ok(clusters)
	}

	/// The admin kubeconfig of a cluster, as the raw YAML the API returns.
	///
	/// With `expiry_seconds` of `None` the API hands out credentials that do not expire.
	#[instrument(skip(self))]
	pub async fn kubeconfig(&self, cluster_id: &str, expiry_seconds: Option<u64>) -> Result<Vec<u8>> {
		if cluster_id.trim().is_empty() {
			return Err(Error::EmptyClusterId);
		}
		let url = self.endpoint(&["v2", "kubernetes", "clusters", cluster_id, "kubeconfig"])?;
		let what = format!("fetching kubeconfig for cluster {cluster_id}");

		let mut request = self.http.get(url).bearer_auth(&self.token);
		if let Some(seconds) = expiry_seconds {
			request = request.query(&[("expiry_seconds", seconds)]);
		}
		let response = request
			.send()
			.await
			.map_err(|source| request_error(&what, source))?;
		let body = check(response, &what)
			.await?
			.bytes()
			.await
			.map_err(|source| request_error(&what, source))?;
		Ok(body.to_vec())
	}

	fn endpoint(&self, segments: &[&str]) -> Result<Url> {
		let mut url = self.base.clone();
		url.path_segments_mut()
			.map_err(|()| Error::InvalidUrl {
				url: self.base.to_string(),
				reason: "not a base URL".into(),
			})?
			.pop_if_empty()
			.extend(segments);
		Ok(url)
	}
}

fn parse_base(url: &str) -> Result<Url> {
	let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl {
		url: url.to_owned(),
		reason: e.to_string(),
	})?;
	if parsed.cannot_be_a_base() {
		return Err(Error::InvalidUrl {
			url: url.to_owned(),
			reason: "not a base URL".into(),
		});
	}
	Ok(parsed)
}

fn request_error(what: &str, source: reqwest::Error) -> Error {
	Error::Request {
		what: what.to_owned(),
		source,
	}
}

/// Turn a non-2xx response into [`Error::Api`], preferring the message from the error body.
async fn check(response: Response, what: &str) -> Result<Response> {
	let status = response.status();
	if status.is_success() {
		return Ok(response);
	}
	let body = response.bytes().await.unwrap_or_default();
	let message = serde_json::from_slice::<ApiError>(&body).map_or_else(
		|_| String::from_utf8_lossy(&body).trim().to_owned(),
		|e| e.message,
	);
	let message = if message.is_empty() {
		status.canonical_reason().unwrap_or("request failed").to_owned()
	} else {
		message
	};
	Err(Error::Api {
		what: what.to_owned(),
		status,
		message,
	})
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case("")]
	#[case("   ")]
	fn test_empty_token_rejected(#[case] token: &str) {
		assert_matches!(Client::new(token, None), Err(Error::MissingToken));
	}

	#[rstest]
	#[case(None, "https://api.digitalocean.com/v2/kubernetes/clusters")]
	#[case(Some(""), "https://api.digitalocean.com/v2/kubernetes/clusters")]
	#[case(Some("http://localhost:8080"), "http://localhost:8080/v2/kubernetes/clusters")]
	#[case(Some("http://proxy/do/"), "http://proxy/do/v2/kubernetes/clusters")]
	fn test_endpoint(#[case] api_url: Option<&str>, #[case] expected: &str) {
		let client = Client::new("token", api_url).unwrap();
		let url = client.endpoint(&["v2", "kubernetes", "clusters"]).unwrap();
		assert_eq!(url.as_str(), expected);
	}

	#[rstest]
	#[case("not a url")]
	#[case("mailto:ops@example.com")]
	fn test_invalid_api_url(#[case] api_url: &str) {
		assert_matches!(
			Client::new("token", Some(api_url)),
			Err(Error::InvalidUrl { .. })
		);
	}
}
