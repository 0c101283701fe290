//! Event stream of a transaction lifecycle.
//!
//! Progress is reported on its own channel, separate from the terminal outcome. A
//! successful send yields exactly one `TransactionHash` event, followed by zero or more
//! `Confirmation` events from the monitor. A failed send yields no events at all.

use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Progress events of a transaction.
///
/// Serializes to `{"transactionHash": "<hash>"}` and `{"confirmation": <count>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionEvent {
	/// The transaction was accepted by a provider under this hash
	TransactionHash(String),
	/// Latest confirmation depth reported by the providers
	Confirmation(u64),
}

pub(crate) type EventSender = mpsc::UnboundedSender<TransactionEvent>;

pub(crate) fn event_channel() -> (EventSender, TransactionEvents) {
	let (tx, rx) = mpsc::unbounded_channel();
	(tx, TransactionEvents { rx })
}

/// Receiving half of a transaction's event stream.
///
/// Dropping it stops the confirmation monitor at its next tick.
#[derive(Debug)]
pub struct TransactionEvents {
	rx: mpsc::UnboundedReceiver<TransactionEvent>,
}

impl TransactionEvents {
	/// Next event, or `None` once the lifecycle and monitor are both done.
	pub async fn next(&mut self) -> Option<TransactionEvent> {
		self.rx.recv().await
	}

	/// Next event if one is already queued.
	pub fn try_next(&mut self) -> Option<TransactionEvent> {
		self.rx.try_recv().ok()
	}
}

impl Stream for TransactionEvents {
	type Item = TransactionEvent;

	fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		self.rx.poll_recv(cx)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::StreamExt;

	#[test]
	fn test_event_json_shape() {
		let hash = serde_json::to_string(&TransactionEvent::TransactionHash("ab12".into())).unwrap();
		assert_eq!(hash, r#"{"transactionHash":"ab12"}"#);

		let confirmation = serde_json::to_string(&TransactionEvent::Confirmation(3)).unwrap();
		assert_eq!(confirmation, r#"{"confirmation":3}"#);

		let parsed: TransactionEvent = serde_json::from_str(r#"{"confirmation":7}"#).unwrap();
		assert_eq!(parsed, TransactionEvent::Confirmation(7));
	}

	#[tokio::test]
	async fn test_stream_ends_when_sender_dropped() {
		let (tx, events) = event_channel();
		tx.send(TransactionEvent::TransactionHash("h".into())).unwrap();
		tx.send(TransactionEvent::Confirmation(1)).unwrap();
		drop(tx);

		let collected: Vec<_> = events.collect().await;
		assert_eq!(
			collected,
			vec![
				TransactionEvent::TransactionHash("h".into()),
				TransactionEvent::Confirmation(1)
			]
		);
	}
}
