//! Operation table.
//!
//! Every ISEE call the client makes is described by a static
//! [`OperationDescriptor`]. The pipeline driver knows nothing about
//! registration or entitlement lookups beyond what is listed here.

use crate::error::{IseeError, Result};
use crate::hooks::{EnvelopeComposer, PayloadMutator, ResponseExtractor, REGISTER_REQUEST, WARRANTY_REQUEST};
use std::fmt;
use std::str::FromStr;

/// Static description of one SOAP operation.
#[derive(Debug, PartialEq, Eq)]
pub struct OperationDescriptor {
    /// Operation name
    pub name: &'static str,
    /// Path appended to the configured host
    pub path: &'static str,
    /// SOAPAction header value, quotes included
    pub soap_action: &'static str,
    /// Envelope template name
    pub envelope_template: &'static str,
    /// Payload template name
    pub payload_template: &'static str,
    /// Run in order on the payload
    pub payload_mutators: &'static [PayloadMutator],
    /// Run in order on the envelope, after the payload is complete
    pub envelope_composers: &'static [EnvelopeComposer],
    /// Run in order on the response envelope
    pub response_extractors: &'static [ResponseExtractor],
}

pub static REGISTER: OperationDescriptor = OperationDescriptor {
    name: "register",
    path: "/ClientRegistration/ClientRegistrationService.asmx",
    soap_action: "\"http://www.hp.com/isee/webservices/RegisterClient2\"",
    envelope_template: "register_soapenv.xml",
    payload_template: "register_payload.xml",
    payload_mutators: &[PayloadMutator::RegistrationTimestamp],
    envelope_composers: &[EnvelopeComposer::EmbedPayload(REGISTER_REQUEST)],
    response_extractors: &[ResponseExtractor::RegistrationCredentials],
};

pub static WARRANTY: OperationDescriptor = OperationDescriptor {
    name: "warranty",
    path: "/EntitlementCheck/EntitlementCheckService.asmx",
    soap_action: "\"http://www.hp.com/isee/webservices/GetOOSEntitlementList2\"",
    envelope_template: "warranty_soapenv.xml",
    payload_template: "warranty_payload.xml",
    payload_mutators: &[PayloadMutator::EntitlementPopulate],
    envelope_composers: &[
        EnvelopeComposer::AuthHeaders,
        EnvelopeComposer::EmbedPayload(WARRANTY_REQUEST),
    ],
    response_extractors: &[ResponseExtractor::EntitlementDocument],
};

/// Operations the client supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Register,
    Warranty,
}

impl Operation {
    pub const ALL: [Operation; 2] = [Operation::Register, Operation::Warranty];

    pub fn descriptor(self) -> &'static OperationDescriptor {
        match self {
            Self::Register => &REGISTER,
            Self::Warranty => &WARRANTY,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.descriptor().name
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = IseeError;

    fn from_str(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == name)
            .ok_or_else(|| IseeError::UnknownOperation(name.to_string()))
    }
}

/// Look up an operation descriptor by name.
pub fn lookup(name: &str) -> Result<&'static OperationDescriptor> {
    name.parse::<Operation>().map(Operation::descriptor)
}
