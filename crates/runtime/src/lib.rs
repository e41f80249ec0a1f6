//! Live-site collaborators for the booking flow in `thsr-core`.
//!
//! * [`http`] - reqwest sessions, one cookie jar per session
//! * [`html`] - the page parser
//! * [`history`] / [`samples`] - JSON history and captcha sample stores
//! * [`solver`] - captcha recognition through an external program

pub mod endpoint;
pub mod history;
pub mod html;
pub mod http;
pub mod samples;
pub mod solver;

pub use history::JsonHistoryStore;
pub use html::HtmlParser;
pub use http::{HttpConfig, HttpSession, HttpSessionFactory};
pub use samples::DirSampleStore;
pub use solver::CommandCaptchaSolver;
