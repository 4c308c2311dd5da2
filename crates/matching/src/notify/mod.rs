// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod worker;

use crossbeam::channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hemolink_sdk::DonorId;
pub use worker::NotifyWorker;

/// A donor notification produced after a fulfillment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
	/// Unique notification id (auditing/log correlation)
	pub id: Uuid,
	/// Donor the message is addressed to; the external sender resolves
	/// the actual contact address
	pub recipient: DonorId,
	/// Message subject
	pub subject: String,
	/// Message body
	pub body: String,
}

/// Error types for notification delivery
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
	#[error("Failed to send notification: {0}")]
	Send(String),
}

/// Notification sender boundary contract (external collaborator)
///
/// Implemented by the actual transport outside the core. Delivery is
/// best-effort: a failed send is logged by the worker and never affects
/// matching or sweep results, since inventory state has already changed.
pub trait Notifier: Send {
	fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Notifier that only logs the message (development stand-in for SMTP)
pub struct LogNotifier;

impl Notifier for LogNotifier {
	fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
		tracing::info!(
			target: "notify",
			id = %notification.id,
			recipient = notification.recipient,
			subject = %notification.subject,
			"Notification sent"
		);
		Ok(())
	}
}

/// Bounded notification queue between matching logic and the worker
///
/// Decouples fulfillment from notification delivery so neither the
/// matching engine nor the sweeper ever blocks on the transport.
///
/// Properties:
/// - Multiple Producers (engine calls, sweeper)
/// - Single Consumer (notify worker)
/// - Bounded capacity; a full queue drops the message with a warning
///   rather than blocking the fulfillment path
pub struct NotifyQueue {
	sender: Sender<Notification>,
	receiver: Receiver<Notification>,
}

impl NotifyQueue {
	pub fn new(capacity: usize) -> Self {
		let (sender, receiver) = bounded(capacity);
		Self { sender, receiver }
	}

	/// Split the queue into sender and receiver ends
	///
	/// The sender can be cloned across producers; the receiver belongs to
	/// the single worker loop.
	pub fn split(self) -> (NotifySender, NotifyReceiver) {
		(
			NotifySender {
				sender: self.sender,
			},
			NotifyReceiver {
				receiver: self.receiver,
			},
		)
	}
}

/// Sender end of the notification queue
#[derive(Clone)]
pub struct NotifySender {
	sender: Sender<Notification>,
}

impl NotifySender {
	/// Try to enqueue a notification (non-blocking)
	pub fn try_send(&self, notification: Notification) -> Result<(), NotifyQueueError> {
		self.sender.try_send(notification).map_err(|e| match e {
			TrySendError::Full(_) => NotifyQueueError::Full,
			TrySendError::Disconnected(_) => NotifyQueueError::Disconnected,
		})
	}
}

/// Receiver end of the notification queue (worker only)
pub struct NotifyReceiver {
	receiver: Receiver<Notification>,
}

impl NotifyReceiver {
	pub fn try_recv(&self) -> Result<Notification, NotifyQueueError> {
		self.receiver.try_recv().map_err(|e| match e {
			TryRecvError::Empty => NotifyQueueError::Empty,
			TryRecvError::Disconnected => NotifyQueueError::Disconnected,
		})
	}
}

/// Errors that can occur when interacting with the notification queue
#[derive(Debug, thiserror::Error)]
pub enum NotifyQueueError {
	#[error("Notification queue is full")]
	Full,
	#[error("Notification queue is empty")]
	Empty,
	#[error("Notification queue disconnected")]
	Disconnected,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn notification(recipient: DonorId) -> Notification {
		Notification {
			id: Uuid::new_v4(),
			recipient,
			subject: "Blood donation matched".to_string(),
			body: "2 units of A+ were issued to branch 1".to_string(),
		}
	}

	#[test]
	fn test_send_and_recv() {
		let (sender, receiver) = NotifyQueue::new(10).split();

		sender.try_send(notification(100)).unwrap();

		let received = receiver.try_recv().unwrap();
		assert_eq!(received.recipient, 100);
	}

	#[test]
	fn test_queue_full_does_not_block() {
		let (sender, _receiver) = NotifyQueue::new(1).split();

		sender.try_send(notification(100)).unwrap();
		let result = sender.try_send(notification(101));
		assert!(matches!(result, Err(NotifyQueueError::Full)));
	}

	#[test]
	fn test_multiple_senders() {
		let (sender, receiver) = NotifyQueue::new(10).split();

		let cloned = sender.clone();
		sender.try_send(notification(100)).unwrap();
		cloned.try_send(notification(101)).unwrap();

		assert!(receiver.try_recv().is_ok());
		assert!(receiver.try_recv().is_ok());
		assert!(matches!(receiver.try_recv(), Err(NotifyQueueError::Empty)));
	}
}
