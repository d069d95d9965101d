//! Background generation with main-thread delivery.
//!
//! Producers run on a shared worker pool and push their output onto a locked
//! completion list. The owner of a [`DispatchQueue`] calls [`DispatchQueue::drain`]
//! once per tick; that call takes everything completed so far and runs the
//! matching continuations on the calling thread, oldest completion first.

use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::api::Result;

/// Worker threads shared by every dispatch queue of a generator.
pub struct WorkerPool {
    pool: ThreadPool,
    num_threads: usize,
}

impl WorkerPool {
    /// `0` picks one thread per logical CPU.
    pub fn new(num_threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("terrain-worker-{i}"))
            .build()?;
        let num_threads = pool.current_num_threads();
        log::info!("terrain worker pool started with {} threads", num_threads);
        Ok(Self { pool, num_threads })
    }

    pub fn num_threads(&self) -> usize { self.num_threads }

    pub fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(f);
    }
}

/// Handle of one request, unique within its queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

type Producer<I, O> = dyn Fn(I) -> O + Send + Sync;
type Continuation<O> = Box<dyn FnOnce(O)>;

/// `None` marks a producer that panicked.
type Completed<O> = VecDeque<(Ticket, Option<O>)>;

pub struct DispatchQueue<I, O> {
    pool: Arc<WorkerPool>,
    producer: Arc<Producer<I, O>>,
    completed: Arc<Mutex<Completed<O>>>,
    // continuations never leave the owning thread
    pending: HashMap<Ticket, Continuation<O>>,
    next_ticket: u64,
    name: &'static str,
}

impl<I, O> DispatchQueue<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn new<F>(name: &'static str, pool: Arc<WorkerPool>, producer: F) -> Self
    where
        F: Fn(I) -> O + Send + Sync + 'static,
    {
        Self {
            pool,
            producer: Arc::new(producer),
            completed: Arc::new(Mutex::new(VecDeque::new())),
            pending: HashMap::new(),
            next_ticket: 0,
            name,
        }
    }

    /// Starts `producer(input)` in the background. `continuation` receives the
    /// output during a later [`drain`](Self::drain) on this thread.
    pub fn request<C>(&mut self, input: I, continuation: C) -> Ticket
    where
        C: FnOnce(O) + 'static,
    {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.pending.insert(ticket, Box::new(continuation));

        let producer = Arc::clone(&self.producer);
        let completed = Arc::clone(&self.completed);
        let name = self.name;
        self.pool.spawn(move || {
            let output = match catch_unwind(AssertUnwindSafe(|| producer(input))) {
                Ok(output) => Some(output),
                Err(_) => {
                    log::error!("{name} producer panicked for request {:?}", ticket);
                    None
                }
            };
            completed.lock().push_back((ticket, output));
        });

        ticket
    }

    /// Delivers every result completed before this call, in completion order.
    ///
    /// Results that land while the continuations run wait for the next drain.
    /// Returns the number of continuations invoked.
    pub fn drain(&mut self) -> usize {
        let ready = std::mem::take(&mut *self.completed.lock());
        if ready.is_empty() {
            return 0;
        }

        let mut delivered = 0;
        for (ticket, output) in ready {
            let Some(continuation) = self.pending.remove(&ticket) else {
                continue;
            };
            match output {
                Some(output) => {
                    continuation(output);
                    delivered += 1;
                }
                None => log::warn!("{} request {:?} dropped after producer panic", self.name, ticket),
            }
        }
        log::trace!("{} drained {} results, {} still in flight", self.name, delivered, self.pending.len());
        delivered
    }

    /// Requests whose continuation has not run yet.
    pub fn in_flight(&self) -> usize { self.pending.len() }

    pub fn is_idle(&self) -> bool { self.pending.is_empty() }
}
