//! One-shot shared connection: established once, awaited by every operation.

use std::error::Error as StdError;
use std::sync::{Arc, OnceLock};

use futures::FutureExt;
use futures::future::Shared;

use super::logging::GatewayLog;
use crate::transport::{BoxFuture, Connector, GatewayService};

pub(crate) type SharedError = Arc<dyn StdError + Send + Sync>;

type Established = Result<Arc<dyn GatewayService>, SharedError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Lifecycle of the client's connection. There is no way back to `Pending`.
pub enum ConnectionState {
    Pending,
    Ready,
    Failed,
}

#[derive(Clone)]
pub(crate) struct Connection {
    shared: Shared<BoxFuture<'static, Established>>,
    state: Arc<OnceLock<ConnectionState>>,
}

impl Connection {
    /// Start connecting right away when a Tokio runtime is around, otherwise on first use.
    pub(crate) fn establish(connector: Arc<dyn Connector>, log: GatewayLog) -> Self {
        let state = Arc::new(OnceLock::new());
        let settled = state.clone();
        let aborted = state.clone();
        let abort_log = log.clone();

        let connecting: BoxFuture<'static, Established> = Box::pin(async move {
            let outcome = connector.connect().await;
            match outcome {
                Ok(service) => {
                    let _ = settled.set(ConnectionState::Ready);
                    Ok(service)
                }
                Err(err) => {
                    log.warn(&format!("Create client failed. err[{err}]"));
                    let _ = settled.set(ConnectionState::Failed);
                    Err(SharedError::from(err))
                }
            }
        });

        let connecting: BoxFuture<'static, Established> =
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let task = handle.spawn(connecting);
                    Box::pin(async move {
                        task.await.unwrap_or_else(|err| {
                            abort_log.warn(&format!("Create client failed. err[{err}]"));
                            let _ = aborted.set(ConnectionState::Failed);
                            Err(Arc::new(err) as SharedError)
                        })
                    })
                }
                Err(_) => connecting,
            };

        Self {
            shared: connecting.shared(),
            state,
        }
    }

    pub(crate) async fn get(&self) -> Established {
        self.shared.clone().await
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state.get().copied().unwrap_or(ConnectionState::Pending)
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::transport::{
        BoxError, CallOptions, DeliverCall, DeliverReply, OneOrMany, SendCall, SendReply,
    };

    struct NullService;

    impl GatewayService for NullService {
        fn send<'a>(
            &'a self,
            _call: SendCall,
            _options: &'a CallOptions,
        ) -> BoxFuture<'a, Result<Option<OneOrMany<SendReply>>, BoxError>> {
            Box::pin(async { Ok(None) })
        }

        fn get_deliveries<'a>(
            &'a self,
            _call: DeliverCall,
            _options: &'a CallOptions,
        ) -> BoxFuture<'a, Result<Option<DeliverReply>, BoxError>> {
            Box::pin(async { Ok(None) })
        }
    }

    struct CountingConnector {
        connects: Arc<AtomicUsize>,
        fail: bool,
    }

    impl Connector for CountingConnector {
        fn connect(&self) -> BoxFuture<'static, Result<Arc<dyn GatewayService>, BoxError>> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let fail = self.fail;
            Box::pin(async move {
                if fail {
                    Err(Box::new(io::Error::other("refused")) as BoxError)
                } else {
                    Ok(Arc::new(NullService) as Arc<dyn GatewayService>)
                }
            })
        }
    }

    #[tokio::test]
    async fn concurrent_waiters_share_one_connect() {
        let connects = Arc::new(AtomicUsize::new(0));
        let connection = Connection::establish(
            Arc::new(CountingConnector {
                connects: connects.clone(),
                fail: false,
            }),
            GatewayLog::default(),
        );

        let other = connection.clone();
        let (a, b) = tokio::join!(connection.get(), other.get());
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(connection.state(), ConnectionState::Ready);
    }

    #[tokio::test]
    async fn failure_is_permanent() {
        let connects = Arc::new(AtomicUsize::new(0));
        let connection = Connection::establish(
            Arc::new(CountingConnector {
                connects: connects.clone(),
                fail: true,
            }),
            GatewayLog::default(),
        );

        let first = connection.get().await.err().unwrap();
        let second = connection.get().await.err().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.to_string(), "refused");
        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(connection.state(), ConnectionState::Failed);
    }

    struct StalledConnector;

    impl Connector for StalledConnector {
        fn connect(&self) -> BoxFuture<'static, Result<Arc<dyn GatewayService>, BoxError>> {
            Box::pin(futures::future::pending())
        }
    }

    #[test]
    fn cancelled_connect_task_settles_as_failed() {
        let first = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let connection = {
            let _guard = first.enter();
            Connection::establish(Arc::new(StalledConnector), GatewayLog::default())
        };
        drop(first);

        let second = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let err = second.block_on(connection.get()).err().unwrap();
        assert!(err.to_string().contains("cancelled"));
        assert_eq!(connection.state(), ConnectionState::Failed);
        assert!(second.block_on(connection.get()).is_err());
    }

    #[test]
    fn without_runtime_connect_waits_for_first_use() {
        let connects = Arc::new(AtomicUsize::new(0));
        let connection = Connection::establish(
            Arc::new(CountingConnector {
                connects: connects.clone(),
                fail: false,
            }),
            GatewayLog::default(),
        );
        assert_eq!(connection.state(), ConnectionState::Pending);

        let service = futures::executor::block_on(connection.get());
        assert!(service.is_ok());
        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(connection.state(), ConnectionState::Ready);
    }
}
