//! Client layer: orchestrates gateway calls and maps transport ↔ domain.

mod connection;
mod logging;

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use connection::ConnectionState;
pub use logging::{DEBUG_ENV, LogSink};

use connection::Connection;
use logging::GatewayLog;

use crate::domain::{
    Mobiles, Outcome, Password, QueryReportResponse, ResultCode, SendSms, SendSmsResponse,
    SubPort, UserId, ValidationError,
};
use crate::transport::{
    BoxError, CallOptions, Connector, Endpoint, GatewayService, SoapConnector,
    decode_deliver_reply, decode_send_reply, encode_deliver_call, encode_send_call,
};

/// Code carried by [`MengwangError::Format`].
pub const FORMAT_ERROR_CODE: u16 = 601;

#[derive(Debug, Clone)]
/// Gateway account credentials, sent with every call.
pub struct Credentials {
    user_id: UserId,
    password: Password,
}

impl Credentials {
    /// Validate that both parts are non-empty.
    pub fn new(
        user_id: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            user_id: UserId::new(user_id)?,
            password: Password::new(password)?,
        })
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }
}

#[derive(Debug, thiserror::Error)]
/// Errors returned by [`MengwangClient`].
///
/// Connection and transport failures are passed through untouched; only result codes
/// the gateway answered with become [`MengwangError::Gateway`].
pub enum MengwangError {
    /// One of the domain constructors rejected an invalid value. Nothing was sent.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The client could not be configured (bad proxy, HTTP client setup).
    #[error("configuration error: {0}")]
    Config(#[source] BoxError),

    /// The connection could not be established. Every later call returns the same error.
    #[error("connection error: {0}")]
    Connection(#[source] Arc<dyn StdError + Send + Sync>),

    /// A remote call failed at the network or protocol level.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// The reply lacks a field it must have.
    #[error("format error {code}: {message}")]
    Format { code: u16, message: String },

    /// The gateway answered with a failure code.
    #[error("gateway error {code}: {description}")]
    Gateway {
        code: ResultCode,
        description: &'static str,
    },
}

#[derive(Debug, Clone)]
/// Builder for [`MengwangClient`].
pub struct MengwangClientBuilder {
    credentials: Credentials,
    sub_port: SubPort,
    endpoint: Option<Endpoint>,
    connector: Option<Arc<dyn Connector>>,
    proxy: Option<String>,
    timeout: Option<Duration>,
    debug: bool,
    logger: LogSink,
}

impl MengwangClientBuilder {
    /// Debug defaults to the [`DEBUG_ENV`] environment variable; the sink defaults to no-op.
    pub fn new(credentials: Credentials, sub_port: SubPort) -> Self {
        Self {
            credentials,
            sub_port,
            endpoint: None,
            connector: None,
            proxy: None,
            timeout: None,
            debug: logging::debug_from_env(),
            logger: LogSink::noop(),
        }
    }

    /// Where the SOAP service lives. Required unless [`Self::connector`] is set.
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Use a custom transport instead of the bundled SOAP one.
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Route every request through this proxy URL.
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Timeout handed to the transport for connecting and for each call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Echo request details and results in log lines.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn logger(mut self, logger: LogSink) -> Self {
        self.logger = logger;
        self
    }

    /// Build a [`MengwangClient`] and start connecting.
    ///
    /// Inside a Tokio runtime the connection is established in the background right away;
    /// elsewhere it is established by the first call.
    pub fn build(self) -> Result<MengwangClient, MengwangError> {
        let connector: Arc<dyn Connector> = match (self.connector, self.endpoint) {
            (Some(connector), _) => connector,
            (None, Some(endpoint)) => Arc::new(
                SoapConnector::new(endpoint, self.proxy.as_deref(), self.timeout)
                    .map_err(|err| MengwangError::Config(Box::new(err)))?,
            ),
            (None, None) => {
                return Err(ValidationError::Empty { field: "endpoint" }.into());
            }
        };

        let log = GatewayLog::new(self.logger, self.debug);
        Ok(MengwangClient {
            credentials: self.credentials,
            sub_port: self.sub_port,
            call_options: CallOptions {
                proxy: self.proxy,
                timeout: self.timeout,
            },
            connection: Connection::establish(connector, log.clone()),
            log,
        })
    }
}

#[derive(Clone)]
/// High-level gateway client.
///
/// All clones share one connection. Calls may run concurrently; nothing is retried.
pub struct MengwangClient {
    credentials: Credentials,
    sub_port: SubPort,
    call_options: CallOptions,
    connection: Connection,
    log: GatewayLog,
}

impl MengwangClient {
    pub fn builder(credentials: Credentials, sub_port: SubPort) -> MengwangClientBuilder {
        MengwangClientBuilder::new(credentials, sub_port)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Send `content` to one number or a batch, validating both first.
    ///
    /// Invalid input is rejected before the connection is awaited.
    pub async fn send_text(
        &self,
        mobiles: impl Into<Mobiles>,
        content: impl Into<String>,
    ) -> Result<SendSmsResponse, MengwangError> {
        let request = SendSms::from_raw(mobiles.into().into_vec(), content)?;
        self.send_sms(request).await
    }

    /// Send one message to every number of the request in a single call.
    ///
    /// Errors:
    /// - [`MengwangError::Connection`] when the connection could not be established,
    /// - [`MengwangError::Transport`] when the call itself failed,
    /// - [`MengwangError::Gateway`] when the gateway answered with a failure code.
    pub async fn send_sms(&self, request: SendSms) -> Result<SendSmsResponse, MengwangError> {
        let mut echo = self.log.echo_request(&request);
        let service = self.service(&echo).await?;

        self.log.info(&format!("Call sendSms.{echo}"));
        let call = encode_send_call(
            &self.credentials.user_id,
            &self.credentials.password,
            &self.sub_port,
            &request,
        );
        let started = Instant::now();
        let reply = service.send(call, &self.call_options).await;
        self.log.elapsed("sendSms", started.elapsed(), &echo);

        let reply = reply.map_err(|err| {
            self.log
                .warn(&format!("Call sendSms failed. err[{err}]{echo}"));
            MengwangError::Transport(err)
        })?;

        let code = decode_send_reply(reply);
        if self.log.debug_enabled() {
            echo.push_str(&format!(" result[{code}]"));
        }

        match code.classify() {
            Outcome::Accepted(message_id) => {
                self.log.info(&format!("Call sendSms succ.{echo}"));
                Ok(SendSmsResponse { message_id })
            }
            Outcome::Rejected { description } => {
                self.log
                    .warn(&format!("Call sendSms err. err[{description}]{echo}"));
                Err(MengwangError::Gateway { code, description })
            }
        }
    }

    /// Fetch pending delivery reports.
    ///
    /// An empty or null report list is an empty response. Records too short to parse are
    /// returned in [`QueryReportResponse::malformed`].
    ///
    /// Errors:
    /// - [`MengwangError::Connection`] / [`MengwangError::Transport`] as for `send_sms`,
    /// - [`MengwangError::Format`] when the reply lacks the result field.
    pub async fn query_report(&self) -> Result<QueryReportResponse, MengwangError> {
        let service = self.service("").await?;

        self.log.info("Call queryReport.");
        let call = encode_deliver_call(&self.credentials.user_id, &self.credentials.password);
        let started = Instant::now();
        let reply = service.get_deliveries(call, &self.call_options).await;
        self.log.elapsed("queryReport", started.elapsed(), "");

        let reply = reply.map_err(|err| {
            self.log.warn(&format!("Call queryReport failed. err[{err}]"));
            MengwangError::Transport(err)
        })?;

        let response = decode_deliver_reply(reply).map_err(|err| {
            self.log.warn(&format!("Call queryReport failed. err[{err}]"));
            MengwangError::Format {
                code: FORMAT_ERROR_CODE,
                message: err.to_string(),
            }
        })?;

        for record in &response.malformed {
            self.log
                .warn(&format!("Skipped malformed report. record[{record}]"));
        }
        Ok(response)
    }

    async fn service(&self, echo: &str) -> Result<Arc<dyn GatewayService>, MengwangError> {
        self.connection.get().await.map_err(|err| {
            self.log
                .warn(&format!("Get gateway connection failed. err[{err}]{echo}"));
            MengwangError::Connection(err)
        })
    }
}
