use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use url::Url;
use xmltree::{Element, EmitterConfig, XMLNode};

use super::{
    BoxError, BoxFuture, CallOptions, Connector, DeliverCall, DeliverList, DeliverReply,
    GatewayService, OneOrMany, SendCall, SendReply,
};

/// Namespace the gateway's web service is published under.
pub const DEFAULT_NAMESPACE: &str = "http://tempuri.org/";

const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const WSDL_SOAP11_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap/";

#[derive(Debug, thiserror::Error)]
pub enum SoapError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status: {status}")]
    HttpStatus { status: u16, body: Option<String> },

    #[error("invalid XML: {0}")]
    Xml(#[from] xmltree::ParseError),

    #[error("failed to write SOAP request: {0}")]
    Emit(#[from] xmltree::Error),

    #[error("SOAP request is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("SOAP fault {code}: {message}")]
    Fault { code: String, message: String },

    #[error("missing SOAP Body")]
    MissingBody,

    #[error("WSDL does not declare a SOAP address")]
    MissingAddress,

    #[error("invalid service location: {0}")]
    InvalidLocation(#[from] url::ParseError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Where the gateway lives.
pub enum Endpoint {
    /// Download the WSDL on connect and read the service address from it.
    Wsdl(Url),
    /// Call a known service address directly.
    Service { location: Url, namespace: String },
}

impl Endpoint {
    pub fn wsdl(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::Wsdl(Url::parse(url)?))
    }

    pub fn service(location: &str) -> Result<Self, url::ParseError> {
        Ok(Self::Service {
            location: Url::parse(location)?,
            namespace: DEFAULT_NAMESPACE.to_owned(),
        })
    }
}

#[derive(Debug, Clone)]
/// [`Connector`] speaking SOAP 1.1 over HTTP.
///
/// The proxy is fixed when the connector is built; the timeout applies to the WSDL download
/// and, through [`CallOptions`], to every call.
pub struct SoapConnector {
    http: reqwest::Client,
    endpoint: Endpoint,
    timeout: Option<Duration>,
}

impl SoapConnector {
    pub fn new(
        endpoint: Endpoint,
        proxy: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Self, SoapError> {
        let mut builder = reqwest::Client::builder();
        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            http: builder.build()?,
            endpoint,
            timeout,
        })
    }
}

impl Connector for SoapConnector {
    fn connect(&self) -> BoxFuture<'static, Result<Arc<dyn GatewayService>, BoxError>> {
        let http = self.http.clone();
        let endpoint = self.endpoint.clone();
        let timeout = self.timeout;

        Box::pin(async move {
            let service = match endpoint {
                Endpoint::Service {
                    location,
                    namespace,
                } => SoapService {
                    http,
                    location,
                    namespace,
                },
                Endpoint::Wsdl(url) => {
                    let mut request = http.get(url.clone());
                    if let Some(timeout) = timeout {
                        request = request.timeout(timeout);
                    }
                    let response = request.send().await.map_err(SoapError::from)?;
                    let status = response.status();
                    let body = response.text().await.map_err(SoapError::from)?;
                    if !status.is_success() {
                        return Err(http_status_error(status.as_u16(), body).into());
                    }

                    let (location, namespace) = parse_wsdl(&url, &body)?;
                    SoapService {
                        http,
                        location,
                        namespace,
                    }
                }
            };
            Ok(Arc::new(service) as Arc<dyn GatewayService>)
        })
    }
}

#[derive(Debug, Clone)]
/// A connected SOAP endpoint.
pub struct SoapService {
    http: reqwest::Client,
    location: Url,
    namespace: String,
}

impl SoapService {
    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn call(
        &self,
        action: &str,
        params: &[(&'static str, String)],
        options: &CallOptions,
    ) -> Result<Option<Element>, SoapError> {
        let body = build_envelope(&self.namespace, action, params)?;

        let mut request = self
            .http
            .post(self.location.clone())
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", soap_action(&self.namespace, action))
            .body(body);
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        // Faults arrive with HTTP 500, so look for one before judging the status.
        let parsed = parse_response(&text);
        if !status.is_success() && !matches!(parsed, Err(SoapError::Fault { .. })) {
            return Err(http_status_error(status.as_u16(), text));
        }
        parsed
    }
}

impl GatewayService for SoapService {
    fn send<'a>(
        &'a self,
        call: SendCall,
        options: &'a CallOptions,
    ) -> BoxFuture<'a, Result<Option<OneOrMany<SendReply>>, BoxError>> {
        Box::pin(async move {
            let response = self
                .call(SendCall::ACTION, &call.params(), options)
                .await?;
            Ok(response.map(|element| OneOrMany::One(decode_send_element(&element))))
        })
    }

    fn get_deliveries<'a>(
        &'a self,
        call: DeliverCall,
        options: &'a CallOptions,
    ) -> BoxFuture<'a, Result<Option<DeliverReply>, BoxError>> {
        Box::pin(async move {
            let response = self
                .call(DeliverCall::ACTION, &call.params(), options)
                .await?;
            Ok(response.map(|element| decode_deliver_element(&element)))
        })
    }
}

fn http_status_error(status: u16, body: String) -> SoapError {
    let body = if body.trim().is_empty() {
        None
    } else {
        Some(body)
    };
    SoapError::HttpStatus { status, body }
}

fn soap_action(namespace: &str, action: &str) -> String {
    if namespace.ends_with('/') {
        format!(r#""{namespace}{action}""#)
    } else {
        format!(r#""{namespace}/{action}""#)
    }
}

fn build_envelope(
    namespace: &str,
    action: &str,
    params: &[(&'static str, String)],
) -> Result<String, SoapError> {
    let mut call = Element::new(action);
    call.attributes
        .insert("xmlns".to_string(), namespace.to_string());
    for (name, value) in params {
        let mut child = Element::new(name);
        child.children.push(XMLNode::Text(value.clone()));
        call.children.push(XMLNode::Element(child));
    }

    let mut body = Element::new("soap:Body");
    body.children.push(XMLNode::Element(call));

    let mut envelope = Element::new("soap:Envelope");
    envelope
        .attributes
        .insert("xmlns:soap".to_string(), SOAP_ENVELOPE_NS.to_string());
    envelope.children.push(XMLNode::Element(body));

    let mut buf = Vec::new();
    let config = EmitterConfig::new()
        .write_document_declaration(true)
        .perform_indent(false);
    envelope.write_with_config(&mut buf, config)?;

    Ok(String::from_utf8(buf)?)
}

fn child_elements(element: &Element) -> impl Iterator<Item = &Element> {
    element.children.iter().filter_map(XMLNode::as_element)
}

fn text_of(element: &Element) -> String {
    element
        .get_text()
        .map(|text| text.trim().to_owned())
        .unwrap_or_default()
}

/// Return the `<...Response>` element of the body, or `None` for an empty body.
fn parse_response(xml: &str) -> Result<Option<Element>, SoapError> {
    let root = Element::parse(xml.as_bytes())?;
    let body = child_elements(&root)
        .find(|e| e.name == "Body")
        .ok_or(SoapError::MissingBody)?;

    let Some(first) = child_elements(body).next() else {
        return Ok(None);
    };

    if first.name == "Fault" {
        let field = |name: &str| {
            child_elements(first)
                .find(|e| e.name == name)
                .map(text_of)
                .unwrap_or_default()
        };
        return Err(SoapError::Fault {
            code: field("faultcode"),
            message: field("faultstring"),
        });
    }

    Ok(Some(first.clone()))
}

fn decode_send_element(response: &Element) -> SendReply {
    SendReply {
        result: child_elements(response)
            .find(|e| e.name == "MongateCsSpSendSmsNewResult")
            .map(text_of),
    }
}

fn decode_deliver_element(response: &Element) -> DeliverReply {
    let Some(result) = child_elements(response).find(|e| e.name == "MongateGetDeliverResult")
    else {
        return DeliverReply::missing();
    };

    let nil = result
        .attributes
        .iter()
        .any(|(name, value)| name.ends_with("nil") && value == "true");
    if nil {
        return DeliverReply::null();
    }

    let records = child_elements(result)
        .filter(|e| e.name == "string")
        .map(text_of)
        .collect::<Vec<_>>();
    if records.is_empty() {
        return DeliverReply {
            result: Some(Some(DeliverList { string: None })),
        };
    }
    DeliverReply::records(records)
}

/// Read the SOAP 1.1 address and target namespace out of a WSDL document.
fn parse_wsdl(base: &Url, xml: &str) -> Result<(Url, String), SoapError> {
    let root = Element::parse(xml.as_bytes())?;
    let namespace = root
        .attributes
        .get("targetNamespace")
        .cloned()
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_owned());

    let addresses = child_elements(&root)
        .filter(|e| e.name == "service")
        .flat_map(child_elements)
        .filter(|e| e.name == "port")
        .flat_map(child_elements)
        .filter(|e| e.name == "address")
        .collect::<Vec<_>>();

    let address = addresses
        .iter()
        .find(|e| e.namespace.as_deref() == Some(WSDL_SOAP11_NS))
        .or_else(|| addresses.first())
        .ok_or(SoapError::MissingAddress)?;
    let location = address
        .attributes
        .get("location")
        .ok_or(SoapError::MissingAddress)?;

    Ok((base.join(location)?, namespace))
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use super::*;
    use crate::domain::{Password, UserId};
    use crate::transport::deliver::encode_deliver_call;

    #[test]
    fn envelope_carries_action_and_arguments() {
        let xml = build_envelope(
            DEFAULT_NAMESPACE,
            "MongateGetDeliver",
            &[("userId", "J10001".to_owned()), ("iReqType", "2".to_owned())],
        )
        .unwrap();

        assert!(xml.contains("xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\""));
        assert!(xml.contains("<MongateGetDeliver xmlns=\"http://tempuri.org/\">"));
        assert!(xml.contains("<userId>J10001</userId>"));
        assert!(xml.contains("<iReqType>2</iReqType>"));
    }

    #[test]
    fn soap_action_joins_namespace_and_action() {
        assert_eq!(
            soap_action("http://tempuri.org/", "MongateGetDeliver"),
            "\"http://tempuri.org/MongateGetDeliver\""
        );
        assert_eq!(
            soap_action("urn:mongate", "MongateGetDeliver"),
            "\"urn:mongate/MongateGetDeliver\""
        );
    }

    #[test]
    fn send_response_yields_result_code() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <MongateCsSpSendSmsNewResponse xmlns="http://tempuri.org/">
      <MongateCsSpSendSmsNewResult>-10004</MongateCsSpSendSmsNewResult>
    </MongateCsSpSendSmsNewResponse>
  </soap:Body>
</soap:Envelope>"#;

        let response = parse_response(xml).unwrap().unwrap();
        assert_eq!(decode_send_element(&response), SendReply::new("-10004"));
    }

    #[test]
    fn deliver_response_collects_records() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <MongateGetDeliverResponse xmlns="http://tempuri.org/">
      <MongateGetDeliverResult>
        <string>a,t1,id1,b,m1,c,d,0,DELIVRD</string>
        <string>a,t2,id2,b,m2,c,d,0,DELIVRD</string>
      </MongateGetDeliverResult>
    </MongateGetDeliverResponse>
  </soap:Body>
</soap:Envelope>"#;

        let response = parse_response(xml).unwrap().unwrap();
        assert_eq!(
            decode_deliver_element(&response),
            DeliverReply::records(vec![
                "a,t1,id1,b,m1,c,d,0,DELIVRD".to_owned(),
                "a,t2,id2,b,m2,c,d,0,DELIVRD".to_owned(),
            ])
        );
    }

    #[test]
    fn deliver_response_without_result_is_missing() {
        let xml = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <MongateGetDeliverResponse xmlns="http://tempuri.org/"/>
  </soap:Body>
</soap:Envelope>"#;

        let response = parse_response(xml).unwrap().unwrap();
        assert_eq!(decode_deliver_element(&response), DeliverReply::missing());
    }

    #[test]
    fn empty_body_is_no_reply() {
        let xml = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body/>
</soap:Envelope>"#;
        assert!(parse_response(xml).unwrap().is_none());
    }

    #[test]
    fn fault_is_reported() {
        let xml = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <soap:Fault>
      <faultcode>soap:Server</faultcode>
      <faultstring>Server was unable to process request.</faultstring>
    </soap:Fault>
  </soap:Body>
</soap:Envelope>"#;

        match parse_response(xml) {
            Err(SoapError::Fault { code, message }) => {
                assert_eq!(code, "soap:Server");
                assert_eq!(message, "Server was unable to process request.");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn wsdl_address_is_resolved() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<wsdl:definitions xmlns:wsdl="http://schemas.xmlsoap.org/wsdl/"
    xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/"
    xmlns:soap12="http://schemas.xmlsoap.org/wsdl/soap12/"
    targetNamespace="http://tempuri.org/">
  <wsdl:service name="wmgw">
    <wsdl:port name="wmgwSoap12" binding="tns:wmgwSoap12">
      <soap12:address location="http://gw.example.invalid/soap12" />
    </wsdl:port>
    <wsdl:port name="wmgwSoap" binding="tns:wmgwSoap">
      <soap:address location="/MWGate/wmgw.asmx" />
    </wsdl:port>
  </wsdl:service>
</wsdl:definitions>"#;

        let base = Url::parse("http://gw.example.invalid/MWGate/wmgw.asmx?wsdl").unwrap();
        let (location, namespace) = parse_wsdl(&base, xml).unwrap();
        assert_eq!(location.as_str(), "http://gw.example.invalid/MWGate/wmgw.asmx");
        assert_eq!(namespace, "http://tempuri.org/");
    }

    #[test]
    fn wsdl_without_address_is_rejected() {
        let xml = r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/"/>"#;
        let base = Url::parse("http://gw.example.invalid/?wsdl").unwrap();
        assert!(matches!(
            parse_wsdl(&base, xml),
            Err(SoapError::MissingAddress)
        ));
    }

    #[test]
    fn endpoint_constructors_validate_urls() {
        assert!(Endpoint::wsdl("not a url").is_err());
        let endpoint = Endpoint::service("http://gw.example.invalid/MWGate/wmgw.asmx").unwrap();
        assert!(matches!(
            endpoint,
            Endpoint::Service { namespace, .. } if namespace == DEFAULT_NAMESPACE
        ));
    }

    const FAULT_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <soap:Fault>
      <faultcode>soap:Client</faultcode>
      <faultstring>Login failed.</faultstring>
    </soap:Fault>
  </soap:Body>
</soap:Envelope>"#;

    const DELIVER_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <MongateGetDeliverResponse xmlns="http://tempuri.org/">
      <MongateGetDeliverResult>
        <string>a,t1,id1,b,m1,c,d,0,DELIVRD</string>
      </MongateGetDeliverResult>
    </MongateGetDeliverResponse>
  </soap:Body>
</soap:Envelope>"#;

    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8(buf).unwrap()
    }

    /// Accept one request, answer it with `status` and `body`, hand back the raw request.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (SoapService, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: text/xml; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            request
        });
        (local_service(addr), server)
    }

    fn local_service(addr: std::net::SocketAddr) -> SoapService {
        SoapService {
            http: reqwest::Client::builder().no_proxy().build().unwrap(),
            location: Url::parse(&format!("http://{addr}/MWGate/wmgw.asmx")).unwrap(),
            namespace: DEFAULT_NAMESPACE.to_owned(),
        }
    }

    fn deliver_call() -> DeliverCall {
        encode_deliver_call(
            &UserId::new("J10001").unwrap(),
            &Password::new("secret").unwrap(),
        )
    }

    #[tokio::test]
    async fn call_posts_envelope_with_soap_headers() {
        let (service, server) = serve_once("200 OK", DELIVER_BODY).await;

        let reply = service
            .get_deliveries(deliver_call(), &CallOptions::default())
            .await
            .unwrap();
        assert_eq!(
            reply,
            Some(DeliverReply::records(vec![
                "a,t1,id1,b,m1,c,d,0,DELIVRD".to_owned()
            ]))
        );

        let request = server.await.unwrap();
        let lower = request.to_ascii_lowercase();
        assert!(request.starts_with("POST /MWGate/wmgw.asmx HTTP/1.1\r\n"));
        assert!(lower.contains("content-type: text/xml; charset=utf-8\r\n"));
        assert!(lower.contains("soapaction: \"http://tempuri.org/mongategetdeliver\"\r\n"));
        assert!(request.contains("<MongateGetDeliver xmlns=\"http://tempuri.org/\">"));
        assert!(request.contains("<userId>J10001</userId>"));
        assert!(request.contains("<iReqType>2</iReqType>"));
    }

    #[tokio::test]
    async fn fault_with_server_error_status_is_a_fault() {
        let (service, server) = serve_once("500 Internal Server Error", FAULT_BODY).await;

        let err = service
            .get_deliveries(deliver_call(), &CallOptions::default())
            .await
            .unwrap_err();
        match err.downcast_ref::<SoapError>() {
            Some(SoapError::Fault { code, message }) => {
                assert_eq!(code, "soap:Client");
                assert_eq!(message, "Login failed.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn non_fault_error_body_keeps_http_status() {
        let (service, server) = serve_once(
            "500 Internal Server Error",
            "<html><body>Internal error</body></html>",
        )
        .await;

        let err = service
            .get_deliveries(deliver_call(), &CallOptions::default())
            .await
            .unwrap_err();
        match err.downcast_ref::<SoapError>() {
            Some(SoapError::HttpStatus { status, body }) => {
                assert_eq!(*status, 500);
                assert_eq!(
                    body.as_deref(),
                    Some("<html><body>Internal error</body></html>")
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn call_timeout_applies_per_request() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_request(&mut stream).await;
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let options = CallOptions {
            proxy: None,
            timeout: Some(Duration::from_millis(100)),
        };
        let err = local_service(addr)
            .get_deliveries(deliver_call(), &options)
            .await
            .unwrap_err();
        match err.downcast_ref::<SoapError>() {
            Some(SoapError::Http(err)) => assert!(err.is_timeout()),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
