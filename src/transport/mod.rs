//! Transport layer: the remote service seam and wire-format details.
//!
//! The client only talks to [`Connector`] and [`GatewayService`]. [`SoapConnector`] is the
//! bundled implementation; anything else that can reach the two gateway operations can be
//! plugged in instead.

mod deliver;
mod send_sms;
mod soap;

use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

pub(crate) use deliver::{decode_deliver_reply, encode_deliver_call};
pub(crate) use send_sms::{decode_send_reply, encode_send_call};
pub use soap::{DEFAULT_NAMESPACE, Endpoint, SoapConnector, SoapError, SoapService};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Establishes the connection to the gateway.
pub trait Connector: Send + Sync {
    fn connect(&self) -> BoxFuture<'static, Result<Arc<dyn GatewayService>, BoxError>>;
}

impl std::fmt::Debug for dyn Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Connector")
    }
}

/// The two remote operations exposed by the gateway.
pub trait GatewayService: Send + Sync {
    /// `MongateCsSpSendSmsNew`. `None` means the gateway sent an empty reply.
    fn send<'a>(
        &'a self,
        call: SendCall,
        options: &'a CallOptions,
    ) -> BoxFuture<'a, Result<Option<OneOrMany<SendReply>>, BoxError>>;

    /// `MongateGetDeliver`. `None` means the gateway sent an empty reply.
    fn get_deliveries<'a>(
        &'a self,
        call: DeliverCall,
        options: &'a CallOptions,
    ) -> BoxFuture<'a, Result<Option<DeliverReply>, BoxError>>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Per-call transport settings.
///
/// Enforcing the timeout is up to the transport.
pub struct CallOptions {
    pub proxy: Option<String>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Arguments of `MongateCsSpSendSmsNew`.
pub struct SendCall {
    pub user_id: String,
    pub password: String,
    /// Comma-joined mobile numbers, in caller order.
    pub mobiles: String,
    pub message: String,
    pub mobile_count: usize,
    pub sub_port: String,
}

impl SendCall {
    pub const ACTION: &'static str = "MongateCsSpSendSmsNew";

    /// SOAP arguments in the order the gateway declares them.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("userId", self.user_id.clone()),
            ("password", self.password.clone()),
            ("pszMobis", self.mobiles.clone()),
            ("pszMsg", self.message.clone()),
            ("iMobiCount", self.mobile_count.to_string()),
            ("pszSubPort", self.sub_port.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Arguments of `MongateGetDeliver`.
pub struct DeliverCall {
    pub user_id: String,
    pub password: String,
    pub request_type: i32,
}

impl DeliverCall {
    pub const ACTION: &'static str = "MongateGetDeliver";
    /// Request type asking for delivery reports (as opposed to inbound messages).
    pub const REPORTS: i32 = 2;

    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("userId", self.user_id.clone()),
            ("password", self.password.clone()),
            ("iReqType", self.request_type.to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
/// A value the gateway may send either bare or wrapped in a sequence.
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn first(self) -> Option<T> {
        match self {
            Self::One(value) => Some(value),
            Self::Many(values) => values.into_iter().next(),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct SendReply {
    #[serde(rename = "MongateCsSpSendSmsNewResult", default)]
    pub result: Option<String>,
}

impl SendReply {
    pub fn new(result: impl Into<String>) -> Self {
        Self {
            result: Some(result.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
/// Reply of `MongateGetDeliver`.
///
/// `result` is `None` when the field is missing altogether and `Some(None)` when the gateway
/// sent it as null.
pub struct DeliverReply {
    #[serde(
        rename = "MongateGetDeliverResult",
        default,
        deserialize_with = "deserialize_present"
    )]
    pub result: Option<Option<DeliverList>>,
}

impl DeliverReply {
    pub fn missing() -> Self {
        Self { result: None }
    }

    pub fn null() -> Self {
        Self { result: Some(None) }
    }

    pub fn records(records: Vec<String>) -> Self {
        let string = match records.len() {
            0 => None,
            1 => records.into_iter().next().map(OneOrMany::One),
            _ => Some(OneOrMany::Many(records)),
        };
        Self {
            result: Some(Some(DeliverList { string })),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
/// The `ArrayOfString` wrapper around raw report records.
pub struct DeliverList {
    #[serde(default)]
    pub string: Option<OneOrMany<String>>,
}

fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
