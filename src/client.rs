//! Pipeline driver.
//!
//! Runs an [`OperationDescriptor`] end to end: template load, payload
//! mutators, envelope composers, one POST, then response extractors.

use crate::config::ClientConfig;
use crate::error::{IseeError, Result};
use crate::hooks::RequestContext;
use crate::operation::{OperationDescriptor, REGISTER, WARRANTY};
use crate::query::EntitlementQuery;
use crate::session::Session;
use crate::template::TemplateStore;
use crate::transport::{HttpTransport, SoapRequest, Transport};
use crate::xml::{soap_fault, Element};
use chrono::Utc;
use tracing::{debug, info, warn};

/// ISEE client over a transport.
pub struct IseeClient<T = HttpTransport> {
    host: String,
    templates: TemplateStore,
    transport: T,
}

impl IseeClient<HttpTransport> {
    /// Client using the HTTP transport and templates described by `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(
            config.http.host.clone(),
            TemplateStore::from_dir(config.templates.dir.clone()),
            HttpTransport::new(&config.http)?,
        ))
    }
}

impl<T: Transport> IseeClient<T> {
    pub fn new(host: impl Into<String>, templates: TemplateStore, transport: T) -> Self {
        let host = host.into().trim_end_matches('/').to_string();
        Self {
            host,
            templates,
            transport,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run one operation and return the documents its extractors produced.
    pub fn execute(
        &self,
        operation: &OperationDescriptor,
        queries: &[EntitlementQuery],
        session: &mut Session,
    ) -> Result<Vec<Element>> {
        debug!(operation = operation.name, queries = queries.len(), "Executing operation");

        let body = {
            let ctx = RequestContext {
                queries,
                credentials: session.credentials(),
                timestamp: Utc::now(),
            };

            let mut payload = self.templates.load(operation.payload_template)?;
            for mutator in operation.payload_mutators {
                mutator.apply(&mut payload, &ctx)?;
            }

            let mut envelope = self.templates.load(operation.envelope_template)?;
            for composer in operation.envelope_composers {
                composer.apply(&mut envelope, &payload, &ctx)?;
            }
            envelope.to_xml()?
        };

        let request = SoapRequest {
            url: format!("{}{}", self.host, operation.path),
            soap_action: operation.soap_action,
            body,
        };
        let response = self.transport.post(&request)?;

        let envelope = match Element::parse(&response.body) {
            Ok(envelope) => envelope,
            Err(_) if !response.is_success() => {
                return Err(IseeError::Transport(format!(
                    "{} returned HTTP {}: {}",
                    request.url,
                    response.status,
                    excerpt(&response.body)
                )));
            }
            Err(e) => return Err(e),
        };
        if let Some(fault) = soap_fault(&envelope) {
            warn!(operation = operation.name, status = response.status, fault = %fault, "SOAP fault");
            return Err(IseeError::Protocol(fault));
        }
        if !response.is_success() {
            return Err(IseeError::Transport(format!(
                "{} returned HTTP {}",
                request.url, response.status
            )));
        }

        let mut results = Vec::new();
        for extractor in operation.response_extractors {
            if let Some(document) = extractor.apply(&envelope, session)? {
                results.push(document);
            }
        }
        debug!(operation = operation.name, results = results.len(), "Operation complete");
        Ok(results)
    }

    /// Register a new client identity and store it in the session.
    pub fn register(&self, session: &mut Session) -> Result<()> {
        info!("Registering new client");
        self.execute(&REGISTER, &[], session)?;
        Ok(())
    }

    /// Register only if the session holds no credentials yet.
    pub fn ensure_registered(&self, session: &mut Session) -> Result<()> {
        if session.is_registered() {
            return Ok(());
        }
        self.register(session)
    }

    /// Look up entitlement information for a batch of queries.
    pub fn lookup(&self, queries: &[EntitlementQuery], session: &mut Session) -> Result<Vec<Element>> {
        info!(queries = queries.len(), "Looking up entitlement info");
        self.execute(&WARRANTY, queries, session)
    }
}

fn excerpt(body: &str) -> &str {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body;
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
