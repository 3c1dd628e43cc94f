// ABOUTME: Debouncing for user lookups so the directory is queried once typing settles
// ABOUTME: Each new input aborts the pending timer; results are published on a watch channel

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use sitetree_logging::{debug, warn};
use sitetree_types::User;

use crate::services::UserDirectory;

/// Quiet period before a lookup fires
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Inputs shorter than this clear the options instead of querying
pub const DEFAULT_MIN_LOOKUP_LEN: usize = 2;

/// Runs only the last of a burst of inputs, once `quiet_period` has passed.
///
/// Must be used from within a tokio runtime. Dropping the debouncer cancels
/// whatever is pending.
#[derive(Debug)]
pub struct Debouncer<T> {
    quiet_period: Duration,
    pending: Option<JoinHandle<()>>,
    _input: std::marker::PhantomData<T>,
}

impl<T> Debouncer<T>
where
    T: Send + 'static,
{
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            pending: None,
            _input: std::marker::PhantomData,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Schedule `handler(input)`, superseding anything still pending
    pub fn schedule<F, Fut>(&mut self, input: T, handler: F)
    where
        F: FnOnce(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let quiet_period = self.quiet_period;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            handler(input).await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| !pending.is_finished())
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

/// Current owner/reviewer suggestions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupOptions {
    /// Input the users were looked up for
    pub query: String,
    pub users: Vec<User>,
}

/// Debounced search of the user directory for owner and reviewer pickers
pub struct UserLookup {
    directory: Arc<dyn UserDirectory>,
    debouncer: Debouncer<String>,
    min_query_len: usize,
    options: watch::Sender<LookupOptions>,
}

impl UserLookup {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self::with_settings(directory, DEFAULT_QUIET_PERIOD, DEFAULT_MIN_LOOKUP_LEN)
    }

    /// Quiet periods shorter than 500ms are raised to 500ms
    pub fn with_settings(
        directory: Arc<dyn UserDirectory>,
        quiet_period: Duration,
        min_query_len: usize,
    ) -> Self {
        let (options, _) = watch::channel(LookupOptions::default());
        Self {
            directory,
            debouncer: Debouncer::new(quiet_period.max(DEFAULT_QUIET_PERIOD)),
            min_query_len,
            options,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<LookupOptions> {
        self.options.subscribe()
    }

    pub fn options(&self) -> LookupOptions {
        self.options.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Feed the latest text of the lookup field
    pub fn on_input(&mut self, input: &str) {
        let query = input.trim().to_string();
        if query.chars().count() < self.min_query_len {
            self.debouncer.cancel();
            self.options.send_replace(LookupOptions {
                query,
                users: Vec::new(),
            });
            return;
        }

        let directory = self.directory.clone();
        let options = self.options.clone();
        self.debouncer.schedule(query, move |query| async move {
            debug!(query = %query, "Looking up users");
            let users = match directory.lookup_users(&query).await {
                Ok(users) => users,
                Err(error) => {
                    warn!(query = %query, %error, "User lookup failed");
                    Vec::new()
                }
            };
            options.send_replace(LookupOptions { query, users });
        });
    }

    /// Drop pending lookups and suggestions, e.g. once a user was picked
    pub fn clear(&mut self) {
        self.debouncer.cancel();
        self.options.send_replace(LookupOptions::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_runs_only_last_input() {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let mut debouncer = Debouncer::new(Duration::from_millis(500));

        for input in [1, 2, 3] {
            let fired = fired.clone();
            debouncer.schedule(input, move |value| async move {
                fired.lock().push(value);
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(450)).await;
        assert_eq!(*fired.lock(), vec![3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending() {
        let fired = Arc::new(Mutex::new(0));
        {
            let mut debouncer = Debouncer::new(Duration::from_millis(50));
            let fired = fired.clone();
            debouncer.schedule((), move |_| async move {
                *fired.lock() += 1;
            });
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*fired.lock(), 0);
    }
}
