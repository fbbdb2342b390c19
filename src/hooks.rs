//! Pipeline steps.
//!
//! Each operation is a fixed, ordered list of steps drawn from three closed
//! sets: payload mutators run on the request payload, envelope composers
//! build the SOAP envelope around it, and response extractors turn the reply
//! into results or session updates.

use crate::credentials::Credentials;
use crate::error::{IseeError, Result};
use crate::query::EntitlementQuery;
use crate::session::Session;
use crate::xml::{describe_path, Element, Step, SOAP_11_NS};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// ISEE web service namespace (SOAP operations and headers).
pub const WEBSERVICES_NS: &str = "http://www.hp.com/isee/webservices/";
/// Registration event payload namespace.
pub const EVENT_NS: &str = "http://www.hp.com/schemas/isee/5.00/event";
/// Entitlement request payload namespace.
pub const ENTITLEMENT_NS: &str = "http://www.hp.com/schemas/isee/5.00/entitlement";

/// Format of the registration timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S %Z";

const OSID_TIMESTAMP: &[Step] = &[
    Step::ns(EVENT_NS, "ISEE-Registration"),
    Step::local("RegistrationSource"),
    Step::local("HP_OOSIdentifiers"),
    Step::local("OSID"),
    Step::local("Section"),
    Step::local("Property").with_attribute("name", "TimestampGenerated"),
];
const CSID_TIMESTAMP: &[Step] = &[
    Step::ns(EVENT_NS, "ISEE-Registration"),
    Step::local("RegistrationSource"),
    Step::local("HP_OOSIdentifiers"),
    Step::local("CSID"),
    Step::local("Section"),
    Step::local("Property").with_attribute("name", "TimestampGenerated"),
];
const ENTITLEMENT_REQUEST: &[Step] = &[Step::ns(ENTITLEMENT_NS, "ISEE-GetOOSEntitlementInfoRequest")];

/// Request node of the registration envelope.
pub const REGISTER_REQUEST: &[Step] = &[
    Step::ns(SOAP_11_NS, "Envelope"),
    Step::ns(SOAP_11_NS, "Body"),
    Step::ns(WEBSERVICES_NS, "RegisterClient2"),
    Step::ns(WEBSERVICES_NS, "request"),
];
/// Request node of the entitlement envelope.
pub const WARRANTY_REQUEST: &[Step] = &[
    Step::ns(SOAP_11_NS, "Envelope"),
    Step::ns(SOAP_11_NS, "Body"),
    Step::ns(WEBSERVICES_NS, "GetOOSEntitlementList2"),
    Step::ns(WEBSERVICES_NS, "request"),
];
const GDID_HEADER: &[Step] = &[
    Step::ns(SOAP_11_NS, "Envelope"),
    Step::ns(SOAP_11_NS, "Header"),
    Step::ns(WEBSERVICES_NS, "IseeWebServicesHeader"),
    Step::ns(WEBSERVICES_NS, "GDID"),
];
const TOKEN_HEADER: &[Step] = &[
    Step::ns(SOAP_11_NS, "Envelope"),
    Step::ns(SOAP_11_NS, "Header"),
    Step::ns(WEBSERVICES_NS, "IseeWebServicesHeader"),
    Step::ns(WEBSERVICES_NS, "registrationToken"),
];

const REGISTER_RESULT: &[Step] = &[
    Step::ns(SOAP_11_NS, "Envelope"),
    Step::ns(SOAP_11_NS, "Body"),
    Step::ns(WEBSERVICES_NS, "RegisterClient2Response"),
    Step::ns(WEBSERVICES_NS, "RegisterClient2Result"),
];
const ENTITLEMENT_RESPONSE: &[Step] = &[
    Step::ns(SOAP_11_NS, "Envelope"),
    Step::ns(SOAP_11_NS, "Body"),
    Step::ns(WEBSERVICES_NS, "GetOOSEntitlementList2Response"),
    Step::ns(WEBSERVICES_NS, "GetOOSEntitlementList2Result"),
    Step::ns(WEBSERVICES_NS, "Response"),
];

/// Inputs available to request-side steps.
#[derive(Debug, Clone)]
pub struct RequestContext<'a> {
    /// Lookups for this request, in output order
    pub queries: &'a [EntitlementQuery],
    /// Credentials known when the request is built
    pub credentials: Option<&'a Credentials>,
    /// Time the request is built
    pub timestamp: DateTime<Utc>,
}

/// Step applied to the payload template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadMutator {
    /// Stamp the OSID and CSID `TimestampGenerated` properties.
    RegistrationTimestamp,
    /// Append one `HP_ISEEEntitlementParameters` block per query.
    EntitlementPopulate,
}

impl PayloadMutator {
    pub fn apply(&self, payload: &mut Element, ctx: &RequestContext<'_>) -> Result<()> {
        match self {
            Self::RegistrationTimestamp => {
                let stamp = ctx.timestamp.format(TIMESTAMP_FORMAT).to_string();
                for path in [OSID_TIMESTAMP, CSID_TIMESTAMP] {
                    require_mut(payload, path)?.set_attribute("value", stamp.as_str());
                }
                debug!(timestamp = %stamp, "Stamped registration payload");
                Ok(())
            }
            Self::EntitlementPopulate => {
                let request = require_mut(payload, ENTITLEMENT_REQUEST)?;
                for query in ctx.queries {
                    if query.serial_number().is_empty() {
                        return Err(IseeError::InvalidEntitlementInput(
                            "serial number must not be empty".to_string(),
                        ));
                    }
                    let params = request.append_child(Element::new("HP_ISEEEntitlementParameters"));
                    params.append_text_child("CountryCode", query.country_code());
                    params.append_text_child("SerialNumber", query.serial_number());
                    params.append_text_child("ProductNumber", query.product_number());
                    // Required by the server even though they stay empty.
                    params.append_child(Element::new("EntitlementType"));
                    params.append_child(Element::new("EntitlementId"));
                    params.append_child(Element::new("ObligationId"));
                }
                debug!(queries = ctx.queries.len(), "Populated entitlement payload");
                Ok(())
            }
        }
    }
}

/// Step applied to the envelope template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeComposer {
    /// Serialize the payload into the text of the node at this path.
    EmbedPayload(&'static [Step]),
    /// Fill the GDID and registration token headers.
    AuthHeaders,
}

impl EnvelopeComposer {
    pub fn apply(&self, envelope: &mut Element, payload: &Element, ctx: &RequestContext<'_>) -> Result<()> {
        match self {
            Self::EmbedPayload(path) => {
                let serialized = payload.to_xml()?;
                require_mut(envelope, path)?.set_text(serialized);
                Ok(())
            }
            Self::AuthHeaders => {
                let credentials = ctx.credentials.ok_or(IseeError::MissingCredentials)?;
                require_mut(envelope, GDID_HEADER)?.set_text(credentials.gdid.as_str());
                require_mut(envelope, TOKEN_HEADER)?.set_text(credentials.registration_token.as_str());
                Ok(())
            }
        }
    }
}

/// Step applied to the parsed response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseExtractor {
    /// Check `IsSuccess` and adopt the returned GDID and token.
    RegistrationCredentials,
    /// Parse the XML document carried as text in `Response`.
    EntitlementDocument,
}

impl ResponseExtractor {
    pub fn apply(&self, response: &Element, session: &mut Session) -> Result<Option<Element>> {
        match self {
            Self::RegistrationCredentials => {
                let credentials = registration_credentials(response)?;
                info!(gdid = %credentials.gdid, "Client registered");
                session.update_credentials(credentials);
                Ok(None)
            }
            Self::EntitlementDocument => {
                // Entitlement-level errors are not inspected; they come back
                // inside the returned document.
                let payload = require(response, ENTITLEMENT_RESPONSE)?.text();
                if payload.is_empty() {
                    return Err(IseeError::Protocol("Entitlement response is empty".to_string()));
                }
                Element::parse(&payload).map(Some)
            }
        }
    }
}

fn registration_credentials(response: &Element) -> Result<Credentials> {
    let result = require(response, REGISTER_RESULT)?;
    let field = |name: &'static str| result.child(&Step::ns(WEBSERVICES_NS, name));

    let success = field("IsSuccess")
        .ok_or_else(|| IseeError::Protocol("Registration response has no IsSuccess".to_string()))?
        .text();
    if !success.trim().eq_ignore_ascii_case("true") {
        let message = match field("Error") {
            Some(error) if error.child_elements().next().is_some() => error.to_pretty_xml()?,
            Some(error) if !error.text().is_empty() => error.text(),
            _ => "Registration rejected without an error message".to_string(),
        };
        warn!(error = %message, "Registration failed");
        return Err(IseeError::Protocol(message));
    }

    let gdid = field("Gdid").map(Element::text).unwrap_or_default();
    let token = field("RegistrationToken").map(Element::text).unwrap_or_default();
    if gdid.is_empty() || token.is_empty() {
        return Err(IseeError::Protocol(
            "Registration succeeded without a GDID and token".to_string(),
        ));
    }
    Ok(Credentials::new(gdid, token))
}

fn require<'a>(root: &'a Element, path: &[Step]) -> Result<&'a Element> {
    root.find(path)
        .ok_or_else(|| IseeError::Protocol(format!("Response has no {}", describe_path(path))))
}

fn require_mut<'a>(root: &'a mut Element, path: &[Step]) -> Result<&'a mut Element> {
    root.find_mut(path)
        .ok_or_else(|| IseeError::MalformedTemplate(format!("No {} in <{}>", describe_path(path), root_name(path))))
}

fn root_name(path: &[Step]) -> &'static str {
    path.first().map_or("", |step| step.local_name)
}
