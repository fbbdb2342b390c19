//! Integration tests for the isee-client crate.
//!
//! These drive the full request/response pipeline against a recording fake
//! transport that replays canned server responses.

use isee_client::hooks::{ENTITLEMENT_NS, EVENT_NS, WEBSERVICES_NS};
use isee_client::operation::{self, Operation};
use isee_client::query::parse_batch;
use isee_client::template::TemplateStore;
use isee_client::transport::{SoapRequest, SoapResponse, Transport};
use isee_client::xml::{Step, SOAP_11_NS};
use isee_client::{CredentialStore, Credentials, Element, EntitlementQuery, IseeClient, IseeError, Session};
use std::cell::RefCell;
use std::collections::VecDeque;

const REGISTER_SUCCESS: &str = include_str!("fixtures/register_success.xml");
const REGISTER_FAILURE: &str = include_str!("fixtures/register_failure.xml");
const WARRANTY_SUCCESS: &str = include_str!("fixtures/warranty_success.xml");
const WARRANTY_ERROR: &str = include_str!("fixtures/warranty_error.xml");
const SOAP_FAULT: &str = include_str!("fixtures/soap_fault.xml");

const HOST: &str = "https://isee.example.test";

// ============================================================================
// Helper: transport that records requests and replays queued responses
// ============================================================================

#[derive(Default)]
struct FakeTransport {
    requests: RefCell<Vec<SoapRequest>>,
    responses: RefCell<VecDeque<SoapResponse>>,
}

impl FakeTransport {
    fn replying(responses: &[(u16, &str)]) -> Self {
        Self {
            requests: RefCell::default(),
            responses: RefCell::new(
                responses
                    .iter()
                    .map(|(status, body)| SoapResponse {
                        status: *status,
                        body: body.to_string(),
                    })
                    .collect(),
            ),
        }
    }

    fn requests(&self) -> Vec<SoapRequest> {
        self.requests.borrow().clone()
    }
}

impl Transport for FakeTransport {
    fn post(&self, request: &SoapRequest) -> isee_client::Result<SoapResponse> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| IseeError::Transport("no response queued".to_string()))
    }
}

fn client(responses: &[(u16, &str)]) -> IseeClient<FakeTransport> {
    IseeClient::new(HOST, TemplateStore::Bundled, FakeTransport::replying(responses))
}

/// Payload embedded as text in a request envelope.
fn embedded_payload(body: &str, operation: &'static str) -> Element {
    let envelope = Element::parse(body).unwrap();
    let request = envelope
        .find(&[
            Step::ns(SOAP_11_NS, "Envelope"),
            Step::ns(SOAP_11_NS, "Body"),
            Step::ns(WEBSERVICES_NS, operation),
            Step::ns(WEBSERVICES_NS, "request"),
        ])
        .expect("request node");
    Element::parse(&request.text()).unwrap()
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn test_register_success_updates_session_and_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::new(dir.path().join(".hpiseeauth"));
    let mut session = Session::open(store.clone()).unwrap();

    let client = client(&[(200, REGISTER_SUCCESS)]);
    client.register(&mut session).unwrap();

    let expected = Credentials::new("ABC123", "XYZ789");
    assert_eq!(session.credentials(), Some(&expected));
    assert_eq!(store.load().unwrap(), Some(expected));
}

#[test]
fn test_register_request_shape() {
    let client = client(&[(200, REGISTER_SUCCESS)]);
    client.register(&mut Session::new()).unwrap();

    let requests = client.transport().requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(
        request.url,
        "https://isee.example.test/ClientRegistration/ClientRegistrationService.asmx"
    );
    assert_eq!(
        request.soap_action,
        "\"http://www.hp.com/isee/webservices/RegisterClient2\""
    );
    assert!(request.body.starts_with("<SOAP-ENV:Envelope"));

    let payload = embedded_payload(&request.body, "RegisterClient2");
    assert_eq!(payload.namespace(), Some(EVENT_NS));
    for id in ["OSID", "CSID"] {
        let stamp = payload
            .find(&[
                Step::ns(EVENT_NS, "ISEE-Registration"),
                Step::local("RegistrationSource"),
                Step::local("HP_OOSIdentifiers"),
                Step::local(id),
                Step::local("Section"),
                Step::local("Property").with_attribute("name", "TimestampGenerated"),
            ])
            .and_then(|p| p.attribute("value"))
            .unwrap();
        // YYYY/MM/DD hh:mm:ss TZ
        assert_eq!(stamp.len(), "2013/05/01 12:30:00 UTC".len(), "{} stamp {}", id, stamp);
        assert_eq!(&stamp[4..5], "/");
        assert!(stamp.ends_with(" UTC"));
    }
}

#[test]
fn test_register_failure_is_protocol_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::new(dir.path().join(".hpiseeauth"));
    let mut session = Session::open(store.clone()).unwrap();

    let client = client(&[(200, REGISTER_FAILURE)]);
    let err = client.register(&mut session).unwrap_err();

    assert!(matches!(err, IseeError::Protocol(ref message) if message == "Quota exceeded"));
    assert!(!session.is_registered());
    assert_eq!(store.load().unwrap(), None);
}

#[test]
fn test_ensure_registered_skips_when_credentials_loaded() {
    let client = client(&[]);
    let mut session = Session::with_credentials(Credentials::new("g", "t"));
    client.ensure_registered(&mut session).unwrap();
    assert!(client.transport().requests().is_empty());
}

// ============================================================================
// Entitlement lookup
// ============================================================================

#[test]
fn test_lookup_returns_unescaped_document() {
    let client = client(&[(200, WARRANTY_SUCCESS)]);
    let mut session = Session::with_credentials(Credentials::new("ABC123", "XYZ789"));
    let queries = [EntitlementQuery::new("CZ10130050", "519841-425", Some("ES"))];

    let documents = client.lookup(&queries, &mut session).unwrap();

    let expected = Element::parse(
        r#"<ISEE-GetOOSEntitlementInfoResponse xmlns:isee="http://www.hp.com/schemas/isee/5.00/entitlement"><Data><EsReply><CombinedUnitEntitlement><OverallEntitlementStartDate>2010-03-01</OverallEntitlementStartDate><OverallEntitlementEndDate>2013-05-31</OverallEntitlementEndDate><Product><ProductNumber>519841-425</ProductNumber><SerialNumber>CZ10130050</SerialNumber><ProductDescription>HP ProLiant DL160 G6 &amp; rails</ProductDescription></Product></CombinedUnitEntitlement></EsReply></Data></ISEE-GetOOSEntitlementInfoResponse>"#,
    )
    .unwrap();
    assert_eq!(documents, vec![expected]);

    let description = documents[0]
        .find(&[
            Step::local("ISEE-GetOOSEntitlementInfoResponse"),
            Step::local("Data"),
            Step::local("EsReply"),
            Step::local("CombinedUnitEntitlement"),
            Step::local("Product"),
            Step::local("ProductDescription"),
        ])
        .unwrap();
    assert_eq!(description.text(), "HP ProLiant DL160 G6 & rails");
}

#[test]
fn test_lookup_request_shape() {
    let client = client(&[(200, WARRANTY_SUCCESS)]);
    let mut session = Session::with_credentials(Credentials::new("ABC123", "XYZ789"));
    let queries = parse_batch(&["CZ1,P1,ES", "onlyone", "CZ2,P2"]);

    client.lookup(&queries, &mut session).unwrap();

    let requests = client.transport().requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(
        request.url,
        "https://isee.example.test/EntitlementCheck/EntitlementCheckService.asmx"
    );
    assert_eq!(
        request.soap_action,
        "\"http://www.hp.com/isee/webservices/GetOOSEntitlementList2\""
    );

    let envelope = Element::parse(&request.body).unwrap();
    let header = [
        Step::ns(SOAP_11_NS, "Envelope"),
        Step::ns(SOAP_11_NS, "Header"),
        Step::ns(WEBSERVICES_NS, "IseeWebServicesHeader"),
    ];
    let header = envelope.find(&header).unwrap();
    assert_eq!(header.child(&Step::ns(WEBSERVICES_NS, "GDID")).unwrap().text(), "ABC123");
    assert_eq!(
        header
            .child(&Step::ns(WEBSERVICES_NS, "registrationToken"))
            .unwrap()
            .text(),
        "XYZ789"
    );

    let payload = embedded_payload(&request.body, "GetOOSEntitlementList2");
    assert_eq!(payload.namespace(), Some(ENTITLEMENT_NS));
    let blocks: Vec<Vec<String>> = payload
        .child_elements()
        .map(|block| {
            assert_eq!(block.name(), "HP_ISEEEntitlementParameters");
            block.child_elements().map(Element::text).collect()
        })
        .collect();
    assert_eq!(
        blocks,
        vec![
            vec!["ES", "CZ1", "P1", "", "", ""],
            vec!["US", "CZ2", "P2", "", "", ""],
        ]
    );
}

#[test]
fn test_lookup_without_credentials_makes_no_request() {
    let client = client(&[(200, WARRANTY_SUCCESS)]);
    let queries = [EntitlementQuery::new("CZ10130050", "519841-425", None)];

    let err = client.lookup(&queries, &mut Session::new()).unwrap_err();

    assert!(matches!(err, IseeError::MissingCredentials));
    assert!(client.transport().requests().is_empty());
}

#[test]
fn test_lookup_passes_entitlement_errors_through() {
    // Entitlement-level errors are not checked; they arrive in the document.
    let client = client(&[(200, WARRANTY_ERROR)]);
    let mut session = Session::with_credentials(Credentials::new("g", "t"));
    let queries = [EntitlementQuery::new("CZ10130050", "bogus", None)];

    let documents = client.lookup(&queries, &mut session).unwrap();
    let text = documents[0]
        .find(&[
            Step::local("ISEE-GetOOSEntitlementInfoResponse"),
            Step::local("Data"),
            Step::local("EsReply"),
            Step::local("Error"),
            Step::local("Text"),
        ])
        .unwrap()
        .text();
    assert_eq!(text, "  Invalid product number  ");
}

#[test]
fn test_register_then_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::open(CredentialStore::new(dir.path().join("auth.json"))).unwrap();
    let client = client(&[(200, REGISTER_SUCCESS), (200, WARRANTY_SUCCESS)]);

    client.ensure_registered(&mut session).unwrap();
    let documents = client
        .lookup(&[EntitlementQuery::new("CZ10130050", "519841-425", None)], &mut session)
        .unwrap();

    assert_eq!(documents.len(), 1);
    let requests = client.transport().requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].body.contains("<isee:GDID>ABC123</isee:GDID>"));
}

// ============================================================================
// Failure paths
// ============================================================================

#[test]
fn test_soap_fault_is_protocol_error() {
    let client = client(&[(500, SOAP_FAULT)]);
    let err = client.register(&mut Session::new()).unwrap_err();
    match err {
        IseeError::Protocol(message) => {
            assert!(message.starts_with("soap:Client: "));
            assert!(message.contains("SOAPAction"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_http_error_without_soap_body() {
    let client = client(&[(503, "Service Unavailable")]);
    let err = client.register(&mut Session::new()).unwrap_err();
    assert!(matches!(err, IseeError::Transport(ref m) if m.contains("503")));
}

#[test]
fn test_unparseable_success_response() {
    let client = client(&[(200, "<html><body>maintenance</body>")]);
    let err = client.register(&mut Session::new()).unwrap_err();
    assert!(matches!(err, IseeError::XmlParse(_)));
}

#[test]
fn test_missing_template_directory() {
    let dir = tempfile::tempdir().unwrap();
    let client = IseeClient::new(
        HOST,
        TemplateStore::Directory(dir.path().to_path_buf()),
        FakeTransport::default(),
    );
    let err = client.register(&mut Session::new()).unwrap_err();
    assert!(matches!(err, IseeError::TemplateLoad { ref name, .. } if name == "register_payload.xml"));
    assert!(client.transport().requests().is_empty());
}

#[test]
fn test_execute_by_operation_name() {
    let client = client(&[(200, REGISTER_SUCCESS)]);
    let mut session = Session::new();
    let descriptor = operation::lookup("register").unwrap();
    assert_eq!(descriptor, Operation::Register.descriptor());

    let results = client.execute(descriptor, &[], &mut session).unwrap();
    assert!(results.is_empty());
    assert!(session.is_registered());
}
