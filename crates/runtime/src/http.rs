//! reqwest-backed sessions against the live site.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};
use thsr::protocol::FormParams;
use thsr::{Page, Session, SessionFactory, TransportError};
use tracing::debug;
use url::Url;

use crate::endpoint::{BASE_URL, BOOKING_PAGE_URL, FormListener, USER_AGENT};
use crate::html::captcha_image_path;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const SESSION_COOKIE: &str = "JSESSIONID";

#[derive(Debug, Clone)]
pub struct HttpConfig {
	/// Whole-request timeout; expiry surfaces as a transport error.
	pub timeout: Duration,
	pub user_agent: String,
}

impl Default for HttpConfig {
	fn default() -> Self {
		Self {
			timeout: DEFAULT_TIMEOUT,
			user_agent: USER_AGENT.to_string(),
		}
	}
}

/// Hands out sessions with independent cookie jars.
#[derive(Debug, Clone, Default)]
pub struct HttpSessionFactory {
	config: HttpConfig,
}

impl HttpSessionFactory {
	pub fn new(config: HttpConfig) -> Self {
		Self { config }
	}
}

impl SessionFactory for HttpSessionFactory {
	fn create(&self) -> Result<Box<dyn Session>, TransportError> {
		Ok(Box::new(HttpSession::new(&self.config)?))
	}
}

pub struct HttpSession {
	client: Client,
	jar: Arc<Jar>,
	base: Url,
}

fn request_error(url: &str, error: &reqwest::Error) -> TransportError {
	TransportError::Request {
		url: url.to_string(),
		message: error.to_string(),
	}
}

impl HttpSession {
	pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
		let jar = Arc::new(Jar::default());
		let mut headers = HeaderMap::new();
		headers.insert(ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"));
		headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("zh-TW,zh;q=0.8,en-US;q=0.5,en;q=0.3"));

		let client = Client::builder()
			.cookie_provider(jar.clone())
			.default_headers(headers)
			.user_agent(config.user_agent.clone())
			.timeout(config.timeout)
			.build()
			.map_err(|e| request_error(BASE_URL, &e))?;
		let base = Url::parse(&format!("{BASE_URL}/IMINT/")).map_err(|e| TransportError::MalformedPage(format!("bad base url: {e}")))?;

		Ok(Self { client, jar, base })
	}

	/// The `JSESSIONID` the site set on the first page.
	fn session_id(&self) -> Result<String, TransportError> {
		let missing = || TransportError::MalformedPage(format!("{SESSION_COOKIE} cookie not set"));
		let header = self.jar.cookies(&self.base).ok_or_else(missing)?;
		let cookies = header.to_str().map_err(|_| missing())?;
		cookies
			.split(';')
			.filter_map(|pair| pair.trim().split_once('='))
			.find(|(name, _)| *name == SESSION_COOKIE)
			.map(|(_, value)| value.to_string())
			.ok_or_else(missing)
	}

	async fn send(&self, request: RequestBuilder, url: &str) -> Result<Page, TransportError> {
		let response = request.send().await.map_err(|e| request_error(url, &e))?;
		let status = response.status();
		if !status.is_success() {
			return Err(TransportError::Status {
				url: url.to_string(),
				status: status.as_u16(),
			});
		}
		let final_url = response.url().to_string();
		let body = response.bytes().await.map_err(|e| request_error(url, &e))?;
		debug!(target = "thsr.http", url = %final_url, status = status.as_u16(), bytes = body.len(), "response received");
		Ok(Page::new(final_url, body.to_vec()))
	}

	async fn submit(&self, listener: FormListener, params: &FormParams) -> Result<Page, TransportError> {
		let url = listener.url(&self.session_id()?);
		debug!(target = "thsr.http", ?listener, fields = params.len(), "posting form");
		self.send(self.client.post(&url).form(params.as_pairs()), &url).await
	}
}

#[async_trait]
impl Session for HttpSession {
	async fn fetch_booking_page(&mut self) -> Result<Page, TransportError> {
		self.send(self.client.get(BOOKING_PAGE_URL), BOOKING_PAGE_URL).await
	}

	async fn fetch_captcha_image(&mut self, page: &Page) -> Result<Vec<u8>, TransportError> {
		let path = captcha_image_path(&page.text()).ok_or_else(|| TransportError::MalformedPage("captcha image not found".to_string()))?;
		let url = self
			.base
			.join(&path)
			.map_err(|e| TransportError::MalformedPage(format!("bad captcha url {path}: {e}")))?;
		Ok(self.send(self.client.get(url.clone()), url.as_str()).await?.body)
	}

	async fn submit_booking_form(&mut self, params: &FormParams) -> Result<Page, TransportError> {
		self.submit(FormListener::Booking, params).await
	}

	async fn submit_train_selection(&mut self, params: &FormParams) -> Result<Page, TransportError> {
		self.submit(FormListener::TrainSelection, params).await
	}

	async fn submit_passenger_info(&mut self, params: &FormParams) -> Result<Page, TransportError> {
		self.submit(FormListener::Passenger, params).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn session_id_comes_from_the_cookie_jar() {
		let session = HttpSession::new(&HttpConfig::default()).unwrap();
		assert!(matches!(session.session_id(), Err(TransportError::MalformedPage(_))));

		let url = Url::parse(BOOKING_PAGE_URL).unwrap();
		session.jar.add_cookie_str("IRS-SESSION=xyz; Path=/", &url);
		session.jar.add_cookie_str("JSESSIONID=5C0FFEE; Path=/IMINT", &url);
		assert_eq!(session.session_id().unwrap(), "5C0FFEE");
	}

	#[tokio::test]
	async fn booking_submit_needs_a_session_cookie() {
		let mut session = HttpSession::new(&HttpConfig::default()).unwrap();
		let result = session.submit_booking_form(&FormParams::default()).await;
		assert!(matches!(result, Err(TransportError::MalformedPage(_))));
	}
}
