//! Execution contexts for listener callbacks.

use std::fmt;
use std::io;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use tracing::warn;

/// Unit of work handed to an [`Executor`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Something that can run a task, now or later.
///
/// Implementations must eventually run every task they accept. Ordering
/// between tasks is not required: each listener queue submits at most one
/// drain task at a time.
pub trait Executor: Send + Sync {
    fn execute(&self, task: Task);
}

/// Runs tasks immediately on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectExecutor;

impl Executor for DirectExecutor {
    fn execute(&self, task: Task) {
        task();
    }
}

/// Runs tasks in submission order on one dedicated worker thread.
///
/// The worker exits once the executor and every clone of its context are
/// dropped.
pub struct ThreadExecutor {
    name: String,
    sender: Mutex<Sender<Task>>,
}

impl ThreadExecutor {
    pub fn spawn(name: impl Into<String>) -> io::Result<Self> {
        let name = name.into();
        let (sender, receiver) = mpsc::channel::<Task>();
        thread::Builder::new().name(name.clone()).spawn(move || {
            for task in receiver {
                task();
            }
        })?;
        Ok(Self {
            name,
            sender: Mutex::new(sender),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Executor for ThreadExecutor {
    fn execute(&self, task: Task) {
        let sent = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send(task);
        if let Err(mpsc::SendError(task)) = sent {
            warn!(executor = %self.name, "worker thread is gone, running task inline");
            task();
        }
    }
}

impl fmt::Debug for ThreadExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadExecutor")
            .field("name", &self.name)
            .finish()
    }
}

/// Listener callbacks are synchronous code, so they go to the blocking pool.
impl Executor for tokio::runtime::Handle {
    fn execute(&self, task: Task) {
        drop(self.spawn_blocking(task));
    }
}

/// Where a listener's callbacks run.
///
/// # Example
///
/// ```rust
/// use lifecycle_guard::ExecutionContext;
///
/// let inline = ExecutionContext::inline();
/// assert!(inline.is_inline());
///
/// let worker = ExecutionContext::dedicated_thread("audit-listener").unwrap();
/// assert!(!worker.is_inline());
/// ```
#[derive(Clone)]
pub struct ExecutionContext {
    executor: Arc<dyn Executor>,
    label: &'static str,
    inline: bool,
}

impl ExecutionContext {
    /// Callbacks run on the thread performing the transition, before the
    /// transitioning call returns (unless another thread is already
    /// delivering to the same listener).
    pub fn inline() -> Self {
        Self {
            executor: Arc::new(DirectExecutor),
            label: "inline",
            inline: true,
        }
    }

    /// Callbacks are queued to a new worker thread owned by this context.
    pub fn dedicated_thread(name: impl Into<String>) -> io::Result<Self> {
        Ok(Self {
            executor: Arc::new(ThreadExecutor::spawn(name)?),
            label: "dedicated-thread",
            inline: false,
        })
    }

    /// Callbacks are queued to the blocking pool of a tokio runtime.
    ///
    /// The runtime must outlive the service. Once it shuts down, queued
    /// callbacks are dropped undelivered; each later transition retries.
    pub fn tokio(handle: tokio::runtime::Handle) -> Self {
        Self {
            executor: Arc::new(handle),
            label: "tokio",
            inline: false,
        }
    }

    /// Callbacks are queued to a caller-provided executor.
    pub fn from_executor(executor: Arc<dyn Executor>) -> Self {
        Self {
            executor,
            label: "custom",
            inline: false,
        }
    }

    pub fn is_inline(&self) -> bool {
        self.inline
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub(crate) fn execute(&self, task: Task) {
        self.executor.execute(task);
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::inline()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("label", &self.label)
            .finish()
    }
}
