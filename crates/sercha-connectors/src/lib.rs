//! Provider adapters
//!
//! One [`sercha_core::connector::Connector`] implementation per provider
//! family (code-host, mail, drive, calendar), sharing the HTTP plumbing
//! in [`http`] and the OAuth token cache in [`token`]. [`registry`] maps
//! a source's provider type tag to a constructed connector.

pub mod calendar;
pub mod codehost;
pub mod drive;
pub mod http;
pub mod mail;
pub mod registry;
pub mod token;

pub use http::ProviderClient;
pub use registry::build_connector;
pub use token::OAuthTokenProvider;
