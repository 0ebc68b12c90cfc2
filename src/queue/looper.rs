//! # Looper: the single-threaded pump behind every queue.
//!
//! A [`Looper`] owns the receiving end of a queue's channel and runs its work
//! on whatever thread calls [`Looper::run`]. The sending end is a cloneable
//! [`LooperHandle`].
//!
//! Background queues spawn a thread that runs the looper. The host's main
//! looper is created by the host, which runs it on its own main thread and
//! hands the [`LooperHandle`] to [`QueueConfiguration`](crate::QueueConfiguration).
//!
//! ## Architecture
//! ```text
//! submit()         ──► Message::Run(job)          ──┐
//! submit_delayed() ──► Message::RunAt(deadline)   ──┼──► [unbounded FIFO] ──► Looper::pump()
//! quit()           ──► Message::Quit               ──┘                           │
//!                                                                               ├─► run job (catch_unwind)
//!                                                                               ├─► park delayed job in timer heap
//!                                                                               └─► due timers run before new messages
//! ```
//!
//! ## Rules
//! - **FIFO**: messages run in arrival order; there is exactly one consumer.
//! - **Serialized**: jobs never overlap; a job runs to completion before the next.
//! - **Discard**: when the discard flag is set, dequeued jobs are dropped unrun.
//! - **Drain**: on quit the channel is closed, and every job accepted before the
//!   close still runs; later sends fail.
//! - Timers still pending when the looper stops are dropped.
//!
//! Jobs run inside a current-thread tokio runtime (used only for timers).
//! Jobs must not block on that runtime (`Handle::block_on`, `blocking_recv`).

use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::panic_message;

/// Unit of work carried by a looper.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

pub(crate) enum Message {
    Run(Job),
    RunAt { deadline: Instant, job: Job },
    Quit,
}

/// State shared between a looper and its handles.
#[derive(Debug)]
struct Shared {
    name: Arc<str>,
    thread: OnceLock<ThreadId>,
    alive: AtomicBool,
    discarding: AtomicBool,
}

/// Sending side of a looper. Cheap to clone.
#[derive(Clone, Debug)]
pub struct LooperHandle {
    tx: mpsc::UnboundedSender<Message>,
    shared: Arc<Shared>,
}

/// Receiving side of a looper; call [`run`](Looper::run) on the thread that should execute the work.
pub struct Looper {
    rx: mpsc::UnboundedReceiver<Message>,
    shared: Arc<Shared>,
}

impl Looper {
    /// Creates a looper and its handle.
    ///
    /// ## Example
    /// ```rust
    /// use bridgevisor::Looper;
    ///
    /// let (looper, main) = Looper::new("main_ui");
    /// let worker = std::thread::spawn(move || looper.run());
    /// main.quit();
    /// worker.join().unwrap();
    /// ```
    pub fn new(name: impl Into<Arc<str>>) -> (Looper, LooperHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            name: name.into(),
            thread: OnceLock::new(),
            alive: AtomicBool::new(true),
            discarding: AtomicBool::new(false),
        });
        (
            Looper {
                rx,
                shared: Arc::clone(&shared),
            },
            LooperHandle { tx, shared },
        )
    }

    /// Runs the looper on the current thread until it is quit or every handle is dropped.
    pub fn run(mut self) {
        let _ = self.shared.thread.set(thread::current().id());

        let rt = match tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!(queue = %self.shared.name, error = %e, "looper runtime failed to start");
                self.shared.alive.store(false, Ordering::SeqCst);
                return;
            }
        };

        tracing::debug!(queue = %self.shared.name, "looper started");
        rt.block_on(self.pump());
        self.shared.alive.store(false, Ordering::SeqCst);
        tracing::debug!(queue = %self.shared.name, "looper stopped");
    }

    async fn pump(&mut self) {
        let mut timers: BinaryHeap<Reverse<Delayed>> = BinaryHeap::new();
        let mut seq: u64 = 0;

        loop {
            let next_deadline = timers.peek().map(|Reverse(d)| d.deadline);

            tokio::select! {
                biased;

                _ = sleep_until(next_deadline) => {
                    let now = Instant::now();
                    while timers.peek().is_some_and(|Reverse(d)| d.deadline <= now) {
                        if let Some(Reverse(due)) = timers.pop() {
                            self.dispatch(due.job);
                        }
                    }
                }
                msg = self.rx.recv() => match msg {
                    Some(Message::Run(job)) => self.dispatch(job),
                    Some(Message::RunAt { deadline, job }) => {
                        seq += 1;
                        timers.push(Reverse(Delayed { deadline, seq, job }));
                    }
                    Some(Message::Quit) => {
                        self.drain_closed().await;
                        break;
                    }
                    None => break,
                }
            }
        }

        if !timers.is_empty() {
            tracing::debug!(queue = %self.shared.name, dropped = timers.len(), "discarding pending timers");
        }
    }

    /// Closes the channel and runs what senders got in before the close.
    ///
    /// A sender may pass the liveness check just before `stop` and enqueue
    /// behind `Quit`; `recv` keeps yielding until every accepted message is taken.
    async fn drain_closed(&mut self) {
        self.rx.close();
        let mut late_timers = 0usize;
        while let Some(msg) = self.rx.recv().await {
            match msg {
                Message::Run(job) => self.dispatch(job),
                Message::RunAt { .. } => late_timers += 1,
                Message::Quit => {}
            }
        }
        if late_timers > 0 {
            tracing::debug!(queue = %self.shared.name, dropped = late_timers, "discarding timers queued behind quit");
        }
    }

    fn dispatch(&self, job: Job) {
        if self.shared.discarding.load(Ordering::SeqCst) {
            return;
        }
        // Jobs arrive pre-wrapped with the queue's fault routing; this only keeps
        // the pump alive if the exception handler itself panics.
        if let Err(payload) = catch_unwind(AssertUnwindSafe(job)) {
            tracing::error!(
                queue = %self.shared.name,
                panic = %panic_message(payload.as_ref()),
                "job escaped its fault handler"
            );
        }
    }
}

impl LooperHandle {
    /// Name of the looper.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub(crate) fn name_arc(&self) -> &Arc<str> {
        &self.shared.name
    }

    /// Returns `true` if the caller is running on this looper's thread.
    pub fn is_on_thread(&self) -> bool {
        self.shared.thread.get() == Some(&thread::current().id())
    }

    /// Returns `true` while the looper accepts work.
    pub fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::SeqCst) && !self.tx.is_closed()
    }

    /// Stops the looper after the work already queued (host-side shutdown).
    ///
    /// Returns `false` if it was already stopping.
    pub fn quit(&self) -> bool {
        self.stop(false)
    }

    /// Marks the looper not-live and asks it to stop; `discard` drops queued work.
    pub(crate) fn stop(&self, discard: bool) -> bool {
        if !self.shared.alive.swap(false, Ordering::SeqCst) {
            return false;
        }
        if discard {
            self.shared.discarding.store(true, Ordering::SeqCst);
        }
        let _ = self.tx.send(Message::Quit);
        true
    }

    /// Queues `job`; returns `false` (dropping it) if the looper no longer accepts work.
    pub(crate) fn send(&self, job: Job) -> bool {
        self.shared.alive.load(Ordering::SeqCst) && self.tx.send(Message::Run(job)).is_ok()
    }

    /// Parks `job` until `delay` has elapsed; same acceptance rule as [`send`](Self::send).
    pub(crate) fn send_delayed(&self, delay: Duration, job: Job) -> bool {
        if !self.shared.alive.load(Ordering::SeqCst) {
            return false;
        }
        let deadline = Instant::now() + delay;
        self.tx.send(Message::RunAt { deadline, job }).is_ok()
    }

    /// Returns `true` if both handles drive the same looper.
    pub fn same_looper(&self, other: &LooperHandle) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

/// A job parked until its deadline; ordered by `(deadline, seq)`.
struct Delayed {
    deadline: Instant,
    seq: u64,
    job: Job,
}

impl PartialEq for Delayed {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for Delayed {}

impl PartialOrd for Delayed {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Delayed {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.deadline
            .cmp(&other.deadline)
            .then(self.seq.cmp(&other.seq))
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc as std_mpsc;
    use std::sync::Mutex;

    #[test]
    fn runs_jobs_in_order_on_its_thread() {
        let (looper, handle) = Looper::new("t");
        let worker = thread::spawn(move || looper.run());
        let worker_id = worker.thread().id();

        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..5 {
            let seen = Arc::clone(&seen);
            let job: Job = Box::new(move || {
                seen.lock().unwrap().push((i, thread::current().id()));
            });
            assert!(handle.send(job));
        }
        handle.quit();
        worker.join().unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        assert!(seen.iter().all(|(_, id)| *id == worker_id));
    }

    #[test]
    fn delayed_jobs_fire_in_deadline_order() {
        let (looper, handle) = Looper::new("t");
        let worker = thread::spawn(move || looper.run());
        let (tx, rx) = std_mpsc::channel();

        let tx_late = tx.clone();
        let late: Job = Box::new(move || tx_late.send("late").unwrap());
        let early: Job = Box::new(move || tx.send("early").unwrap());
        assert!(handle.send_delayed(Duration::from_millis(60), late));
        assert!(handle.send_delayed(Duration::from_millis(10), early));

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), "early");
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), "late");

        handle.quit();
        worker.join().unwrap();
    }

    #[test]
    fn quit_drops_pending_timers_and_rejects_work() {
        let (looper, handle) = Looper::new("t");
        let worker = thread::spawn(move || looper.run());
        let (tx, rx) = std_mpsc::channel::<()>();

        let job: Job = Box::new(move || tx.send(()).unwrap());
        assert!(handle.send_delayed(Duration::from_secs(30), job));
        assert!(handle.quit());
        assert!(!handle.quit());
        worker.join().unwrap();

        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        assert!(!handle.is_alive());
        assert!(!handle.send(Box::new(|| {})));
    }

    #[test]
    fn quit_racing_with_send_never_loses_accepted_jobs() {
        use std::sync::atomic::AtomicUsize;

        for _ in 0..200 {
            let (looper, handle) = Looper::new("t");
            let worker = thread::spawn(move || looper.run());
            let ran = Arc::new(AtomicUsize::new(0));

            let producer = {
                let handle = handle.clone();
                let ran = Arc::clone(&ran);
                thread::spawn(move || {
                    let mut accepted = 0usize;
                    for _ in 0..2000 {
                        let ran = Arc::clone(&ran);
                        let job: Job = Box::new(move || {
                            ran.fetch_add(1, Ordering::SeqCst);
                        });
                        if handle.send(job) {
                            accepted += 1;
                        }
                    }
                    accepted
                })
            };

            thread::yield_now();
            handle.quit();
            let accepted = producer.join().unwrap();
            worker.join().unwrap();

            assert_eq!(accepted, ran.load(Ordering::SeqCst));
            assert!(!handle.send(Box::new(|| {})));
        }
    }

    #[test]
    fn survives_a_panicking_job() {
        let (looper, handle) = Looper::new("t");
        let worker = thread::spawn(move || looper.run());
        let (tx, rx) = std_mpsc::channel();

        assert!(handle.send(Box::new(|| panic!("boom"))));
        assert!(handle.send(Box::new(move || tx.send(7).unwrap())));
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 7);

        handle.quit();
        worker.join().unwrap();
    }
}
