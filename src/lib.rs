//! Client for the HP ISEE registration and entitlement SOAP services.
//!
//! Registers a client identity, keeps the returned GDID and registration
//! token in a side file, and looks up warranty/entitlement status for
//! (serial, product, country) tuples.
//!
//! # Pipeline
//!
//! Each operation is a static [`operation::OperationDescriptor`]: two XML
//! templates and ordered lists of steps from [`hooks`]. The driver in
//! [`client`] loads the payload template, runs the payload mutators, loads
//! the envelope template, runs the envelope composers, POSTs the envelope and
//! runs the response extractors on the reply.
//!
//! # Example
//!
//! ```ignore
//! use isee_client::{ClientConfig, CredentialStore, EntitlementQuery, IseeClient, Session};
//!
//! let config = ClientConfig::default();
//! let client = IseeClient::from_config(&config)?;
//! let mut session = Session::open(CredentialStore::new(config.auth.file_path()))?;
//! client.ensure_registered(&mut session)?;
//!
//! let queries = [EntitlementQuery::new("CZ10130050", "519841-425", Some("ES"))];
//! for document in client.lookup(&queries, &mut session)? {
//!     println!("{}", document.to_pretty_xml()?);
//! }
//! ```

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod hooks;
pub mod operation;
pub mod query;
pub mod session;
pub mod template;
pub mod transport;
pub mod xml;

pub use client::IseeClient;
pub use config::ClientConfig;
pub use credentials::{CredentialStore, Credentials};
pub use error::{IseeError, Result};
pub use query::EntitlementQuery;
pub use session::Session;
pub use xml::Element;
