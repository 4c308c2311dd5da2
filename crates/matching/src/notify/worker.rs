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

use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	thread::{self, JoinHandle},
	time::Duration,
};

use tracing::{error, info, warn};

use super::{Notifier, NotifyQueueError, NotifyReceiver};

/// Notify Worker - consumes queued notifications and hands them to the sender
///
/// Runs in its own thread so fulfillment never waits on the transport.
/// Delivery failures are logged and dropped: by the time a notification
/// exists, inventory has already been decremented and must not be
/// reverted for a downstream delivery problem.
pub struct NotifyWorker {
	thread_handle: Option<JoinHandle<()>>,
	shutdown: Arc<AtomicBool>,
}

impl NotifyWorker {
	/// Start the worker consuming from the queue's receiver end
	pub fn start(receiver: NotifyReceiver, notifier: Box<dyn Notifier>) -> Self {
		let shutdown = Arc::new(AtomicBool::new(false));
		let shutdown_clone = shutdown.clone();

		let thread_handle = thread::Builder::new()
			.name("notify-worker".to_string())
			.spawn(move || {
				info!(target: "notify", "Notify worker started");
				Self::run_worker_loop(&receiver, notifier.as_ref(), &shutdown_clone);
				info!(target: "notify", "Notify worker stopped");
			})
			.expect("Failed to spawn notify worker thread");

		Self {
			thread_handle: Some(thread_handle),
			shutdown,
		}
	}

	fn run_worker_loop(
		receiver: &NotifyReceiver,
		notifier: &dyn Notifier,
		shutdown: &Arc<AtomicBool>,
	) {
		loop {
			if shutdown.load(Ordering::Relaxed) {
				// Drain whatever is still queued before stopping
				while let Ok(notification) = receiver.try_recv() {
					Self::deliver(notifier, &notification);
				}
				break;
			}

			match receiver.try_recv() {
				Ok(notification) => Self::deliver(notifier, &notification),
				Err(NotifyQueueError::Empty) => {
					thread::sleep(Duration::from_millis(10));
				}
				Err(NotifyQueueError::Disconnected) => {
					error!(target: "notify", "Notification queue disconnected");
					break;
				}
				Err(NotifyQueueError::Full) => {
					// Cannot happen on try_recv
					continue;
				}
			}
		}
	}

	fn deliver(notifier: &dyn Notifier, notification: &super::Notification) {
		if let Err(e) = notifier.send(notification) {
			// Best-effort contract: log and move on
			error!(
				target: "notify",
				id = %notification.id,
				recipient = notification.recipient,
				error = %e,
				"Notification delivery failed"
			);
		}
	}

	/// Shutdown the worker gracefully, draining queued notifications
	pub fn shutdown(mut self) {
		info!(target: "notify", "Shutting down notify worker");
		self.shutdown.store(true, Ordering::Relaxed);

		if let Some(handle) = self.thread_handle.take()
			&& let Err(e) = handle.join()
		{
			warn!(target: "notify", error = ?e, "Notify worker thread panicked");
		}
	}
}

impl Drop for NotifyWorker {
	fn drop(&mut self) {
		self.shutdown.store(true, Ordering::Relaxed);
		if let Some(handle) = self.thread_handle.take() {
			let _ = handle.join();
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Mutex;

	use uuid::Uuid;

	use super::*;
	use crate::notify::{Notification, NotifyError, NotifyQueue};

	struct RecordingNotifier {
		sent: Arc<Mutex<Vec<Notification>>>,
		fail: bool,
	}

	impl Notifier for RecordingNotifier {
		fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
			if self.fail {
				return Err(NotifyError::Send("smtp unreachable".to_string()));
			}
			self.sent.lock().unwrap().push(notification.clone());
			Ok(())
		}
	}

	fn notification(recipient: u32) -> Notification {
		Notification {
			id: Uuid::new_v4(),
			recipient,
			subject: "Blood donation matched".to_string(),
			body: String::new(),
		}
	}

	#[test]
	fn test_worker_delivers_queued_notifications() {
		let (sender, receiver) = NotifyQueue::new(16).split();
		let sent = Arc::new(Mutex::new(Vec::new()));
		let worker = NotifyWorker::start(
			receiver,
			Box::new(RecordingNotifier {
				sent: sent.clone(),
				fail: false,
			}),
		);

		for recipient in 0..5 {
			sender.try_send(notification(recipient)).unwrap();
		}

		worker.shutdown();
		assert_eq!(sent.lock().unwrap().len(), 5);
	}

	#[test]
	fn test_delivery_failure_does_not_stop_worker() {
		let (sender, receiver) = NotifyQueue::new(16).split();
		let worker = NotifyWorker::start(
			receiver,
			Box::new(RecordingNotifier {
				sent: Arc::new(Mutex::new(Vec::new())),
				fail: true,
			}),
		);

		sender.try_send(notification(1)).unwrap();
		sender.try_send(notification(2)).unwrap();

		// Shutdown drains and the failing sends are only logged
		worker.shutdown();
	}
}
