//! Typed Rust client for the Mengwang (Mongate) SOAP SMS gateway.
//!
//! The design keeps three layers apart: a domain layer of strong types, a transport layer
//! for the SOAP wire format, and a small client layer orchestrating calls and turning
//! gateway result codes into errors.
//!
//! ```rust,no_run
//! use mengwang::{Credentials, Endpoint, MengwangClient, SubPort};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MengwangClient::builder(Credentials::new("J10001", "...")?, SubPort::any())
//!         .endpoint(Endpoint::wsdl("http://gateway.example/MWGate/wmgw.asmx?wsdl")?)
//!         .build()?;
//!
//!     let sent = client.send_text(["13800138000"], "hello").await?;
//!     println!("message id: {}", sent.message_id);
//!
//!     for report in client.query_report().await?.reports {
//!         println!("{} {} {}", report.message_id, report.mobile, report.status);
//!     }
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]

pub mod client;
pub mod domain;
pub mod transport;

pub use client::{
    ConnectionState, Credentials, FORMAT_ERROR_CODE, LogSink, MengwangClient,
    MengwangClientBuilder, MengwangError,
};
pub use domain::{
    DeliveryReport, KnownResultCode, MessageId, MessageText, MobileNumber, Mobiles, Outcome,
    Password, PhoneNumber, QueryReportResponse, ResultCode, SEND_SMS_MAX_MOBILES, SendSms,
    SendSmsResponse, SubPort, UNKNOWN_ERROR, UserId, ValidationError,
};
pub use transport::{Endpoint, SoapConnector};
