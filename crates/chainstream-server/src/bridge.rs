//! Fan-out bridge: one new-only subscription and one relay per subscriber.

use bytes::Bytes;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use chainstream_core::config::ServerConfig;
use chainstream_core::{Resolution, StreamDirectory, Subject};
use chainstream_log::{DeliverPolicy, DurableLog, Subscription as LogSubscription};

use crate::error::BridgeError;

/// Per-connection subscription record. Lives exactly as long as its relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// The logical name the subscriber asked for.
    pub requested: String,
    /// The subject it resolved to.
    pub subject: Subject,
    /// `true` if `requested` was unknown and the default stream was used.
    pub fallback: bool,
    /// Always [`DeliverPolicy::New`]: a subscriber never sees messages
    /// published before it connected.
    pub policy: DeliverPolicy,
}

/// One message on its way to a subscriber's transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub subject: Subject,
    pub sequence: u64,
    /// Payload JSON exactly as committed to the log.
    pub data: Bytes,
}

/// Why a relay stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayExit {
    /// The subscriber's transport went away.
    Disconnected,
    Shutdown,
    /// The log ended the subscription or failed to read from it.
    LogClosed,
}

/// Resolves logical stream names and opens relays.
pub struct FanoutBridge {
    log: Arc<dyn DurableLog>,
    directory: StreamDirectory,
    shutdown: CancellationToken,
    strict: bool,
    ack_timeout: Duration,
}

impl FanoutBridge {
    pub fn new(log: Arc<dyn DurableLog>, shutdown: CancellationToken) -> Self {
        Self {
            log,
            directory: StreamDirectory::new(),
            shutdown,
            strict: false,
            ack_timeout: Duration::from_secs(5),
        }
    }

    pub fn from_config(
        config: &ServerConfig,
        log: Arc<dyn DurableLog>,
        shutdown: CancellationToken,
    ) -> Self {
        Self::new(log, shutdown)
            .with_strict_names(config.strict_stream_names)
            .with_ack_timeout(Duration::from_millis(config.ack_timeout_ms))
    }

    /// Reject unknown names instead of falling back to the default stream.
    pub fn with_strict_names(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    pub fn directory(&self) -> &StreamDirectory {
        &self.directory
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Resolve `name` and open a new-only subscription on its subject.
    ///
    /// The subscription is positioned when this returns; anything published
    /// afterwards reaches the relay.
    pub async fn open(&self, name: &str) -> Result<Relay, BridgeError> {
        let Resolution { subject, fallback } = self.directory.resolve(name);
        if fallback {
            if self.strict {
                return Err(BridgeError::UnknownStream(name.to_string()));
            }
            tracing::debug!(stream = name, "unknown stream name; using default");
        }

        let inner = self.log.subscribe(&subject, DeliverPolicy::New).await?;
        tracing::info!(stream = name, subject = %subject, fallback, "subscriber connected");

        Ok(Relay {
            subscription: Subscription {
                requested: name.to_string(),
                subject,
                fallback,
                policy: DeliverPolicy::New,
            },
            inner,
            shutdown: self.shutdown.child_token(),
            ack_timeout: self.ack_timeout,
            delivered: 0,
        })
    }
}

/// Moves messages from one log subscription to one subscriber, in order.
pub struct Relay {
    subscription: Subscription,
    inner: LogSubscription,
    shutdown: CancellationToken,
    ack_timeout: Duration,
    delivered: u64,
}

impl Relay {
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Relay until the subscriber disconnects, the server shuts down or the
    /// log ends the subscription. Each message is acked after it has been
    /// handed to `sink`. Dropping the relay releases the log subscription.
    pub async fn run(mut self, sink: mpsc::Sender<Frame>) -> RelayExit {
        let exit = self.pump(&sink).await;
        tracing::info!(
            stream = %self.subscription.requested,
            subject = %self.subscription.subject,
            delivered = self.delivered,
            ?exit,
            "subscriber released"
        );
        exit
    }

    async fn pump(&mut self, sink: &mpsc::Sender<Frame>) -> RelayExit {
        loop {
            let delivery = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return RelayExit::Shutdown,
                _ = sink.closed() => return RelayExit::Disconnected,
                next = self.inner.next() => match next {
                    Some(Ok(delivery)) => delivery,
                    Some(Err(e)) => {
                        tracing::warn!(
                            subject = %self.subscription.subject,
                            error = %e,
                            "subscription failed"
                        );
                        return RelayExit::LogClosed;
                    }
                    None => return RelayExit::LogClosed,
                },
            };

            let frame = Frame {
                subject: delivery.subject.clone(),
                sequence: delivery.sequence,
                data: delivery.payload.clone(),
            };
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return RelayExit::Shutdown,
                sent = sink.send(frame) => {
                    if sent.is_err() {
                        return RelayExit::Disconnected;
                    }
                }
            }
            self.delivered += 1;

            let sequence = delivery.sequence;
            match tokio::time::timeout(self.ack_timeout, delivery.ack()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(
                        subject = %self.subscription.subject,
                        sequence,
                        error = %e,
                        "ack failed"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        subject = %self.subscription.subject,
                        sequence,
                        "ack timed out"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainstream_log::MemoryLog;

    fn bridge(log: &Arc<MemoryLog>) -> FanoutBridge {
        FanoutBridge::new(log.clone(), CancellationToken::new())
    }

    async fn publish(log: &MemoryLog, subject: &Subject, body: &'static str) {
        log.publish(subject, Bytes::from_static(body.as_bytes()))
            .await
            .unwrap();
    }

    async fn recv(rx: &mut mpsc::Receiver<Frame>) -> Frame {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out")
            .expect("relay ended")
    }

    #[tokio::test]
    async fn subscriber_sees_only_messages_after_connect() {
        let log = Arc::new(MemoryLog::default());
        let subject = Subject::blocks_full();
        publish(&log, &subject, r#"{"n":1}"#).await;
        publish(&log, &subject, r#"{"n":2}"#).await;

        let relay = bridge(&log).open("blocks").await.unwrap();
        let (tx, mut rx) = mpsc::channel(8);
        tokio::spawn(relay.run(tx));

        publish(&log, &subject, r#"{"n":3}"#).await;
        publish(&log, &subject, r#"{"n":4}"#).await;

        let f3 = recv(&mut rx).await;
        let f4 = recv(&mut rx).await;
        assert_eq!((f3.sequence, f4.sequence), (3, 4));
        assert_eq!(f3.data.as_ref(), br#"{"n":3}"#);
    }

    #[tokio::test]
    async fn stalled_subscriber_does_not_delay_another() {
        let log = Arc::new(MemoryLog::default());
        let subject = Subject::gas_price();
        let bridge = bridge(&log);

        let (stalled_tx, _stalled_rx) = mpsc::channel(1);
        tokio::spawn(bridge.open("gasPrice").await.unwrap().run(stalled_tx));
        let (tx, mut rx) = mpsc::channel(1);
        tokio::spawn(bridge.open("gas").await.unwrap().run(tx));

        for _ in 0..20 {
            publish(&log, &subject, "{}").await;
        }
        for expected in 1..=20 {
            assert_eq!(recv(&mut rx).await.sequence, expected);
        }
    }

    #[tokio::test]
    async fn unknown_name_falls_back_to_blocks() {
        let log = Arc::new(MemoryLog::default());
        let relay = bridge(&log).open("nope").await.unwrap();
        assert_eq!(relay.subscription().subject, Subject::blocks_full());
        assert!(relay.subscription().fallback);
        assert_eq!(relay.subscription().requested, "nope");
    }

    #[tokio::test]
    async fn relay_records_the_directory_resolution() {
        let log = Arc::new(MemoryLog::default());
        let bridge = bridge(&log).with_strict_names(true);
        for name in ["gas", "gasPrice", "blocks-simple", "nope"] {
            let expected = bridge.directory().resolve(name);
            match bridge.open(name).await {
                Ok(relay) => {
                    assert!(!expected.fallback);
                    assert_eq!(relay.subscription().subject, expected.subject);
                    assert!(!relay.subscription().fallback);
                }
                Err(BridgeError::UnknownStream(_)) => assert!(expected.fallback),
                Err(other) => panic!("unexpected {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn strict_mode_rejects_unknown_names() {
        let log = Arc::new(MemoryLog::default());
        let bridge = bridge(&log).with_strict_names(true);
        assert!(matches!(
            bridge.open("nope").await,
            Err(BridgeError::UnknownStream(name)) if name == "nope"
        ));
        assert!(bridge.open("logs").await.is_ok());
    }

    #[tokio::test]
    async fn relay_ends_when_subscriber_leaves() {
        let log = Arc::new(MemoryLog::default());
        let relay = bridge(&log).open("pending").await.unwrap();
        let (tx, rx) = mpsc::channel(1);
        let task = tokio::spawn(relay.run(tx));

        drop(rx);
        let exit = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exit, RelayExit::Disconnected);
    }

    #[tokio::test]
    async fn relay_ends_on_shutdown() {
        let log = Arc::new(MemoryLog::default());
        let shutdown = CancellationToken::new();
        let bridge = FanoutBridge::new(log.clone(), shutdown.clone());
        let relay = bridge.open("network").await.unwrap();
        let (tx, _rx) = mpsc::channel(1);
        let task = tokio::spawn(relay.run(tx));

        shutdown.cancel();
        assert_eq!(task.await.unwrap(), RelayExit::Shutdown);
    }
}
