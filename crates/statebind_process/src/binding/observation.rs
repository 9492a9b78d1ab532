use std::fmt;
use std::future::Future;
use std::rc::Rc;

use serde_json::Value;
use statebind_core::error::Result;
use statebind_core::fields::Fields;
use statebind_core::latch::StopLatch;
use statebind_core::store::Store;
use tokio::sync::mpsc;
use tracing::trace;

use crate::StateContext;

/// Pull-style sequence over the values of a field set.
///
/// The store subscription is made on the first `next()`. The sequence ends
/// (returns `None` for good) once the owning state deactivates, `cancel()` is
/// called, or the handle is dropped, whichever comes first; no value produced
/// after that point is yielded.
pub struct Observation {
    source: Option<(Rc<dyn Store>, Fields)>,
    latch: Rc<StopLatch>,
    rx: Option<mpsc::UnboundedReceiver<Value>>,
}

impl Observation {
    fn new(store: Rc<dyn Store>, fields: Fields, latch: Rc<StopLatch>) -> Self {
        Self {
            source: Some((store, fields)),
            latch,
            rx: None,
        }
    }

    /// Next value, or `None` once the sequence has ended.
    pub async fn next(&mut self) -> Option<Value> {
        if self.latch.is_terminated() {
            self.rx = None;
            return None;
        }
        self.establish();

        let value = self.rx.as_mut()?.recv().await;
        if self.latch.is_terminated() {
            self.rx = None;
            return None;
        }
        value
    }

    /// End the sequence. Idempotent.
    pub fn cancel(&self) {
        self.latch.terminate();
    }

    pub fn is_terminated(&self) -> bool {
        self.latch.is_terminated()
    }

    /// Apply an async, fallible transform to each value as it is pulled.
    ///
    /// A transform error is yielded as an item; the sequence keeps going.
    pub fn map<F, Fut, T, E>(self, transform: F) -> Mapped<F>
    where
        F: FnMut(Value) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        Mapped {
            inner: self,
            transform,
        }
    }

    fn establish(&mut self) {
        let Some((store, fields)) = self.source.take() else {
            return;
        };
        let (tx, rx) = mpsc::unbounded_channel();
        trace!(fields = ?fields.names(), "observation subscribing");
        let stop = store.subscribe(
            &fields,
            Box::new(move |value| {
                // The receiver only goes away with the handle, which terminates
                // the latch and with it this subscription.
                let _ = tx.send(value);
            }),
        );
        self.rx = Some(rx);
        self.latch.arm(move || stop.run());
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        self.latch.terminate();
    }
}

impl fmt::Debug for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observation")
            .field("subscribed", &self.rx.is_some())
            .field("latch", &self.latch)
            .finish()
    }
}

/// `Observation` with a transform applied, see `Observation::map`.
pub struct Mapped<F> {
    inner: Observation,
    transform: F,
}

impl<F> Mapped<F> {
    pub async fn next<Fut, T, E>(&mut self) -> Option<std::result::Result<T, E>>
    where
        F: FnMut(Value) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let value = self.inner.next().await?;
        Some((self.transform)(value).await)
    }

    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_terminated(&self) -> bool {
        self.inner.is_terminated()
    }
}

impl<F> fmt::Debug for Mapped<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapped").field("inner", &self.inner).finish()
    }
}

impl StateContext {
    /// Observe `fields` as an async sequence that ends when this state deactivates.
    ///
    /// The handle may be moved into a detached local task.
    pub fn observe_data(&self, fields: impl Into<Fields>) -> Result<Observation> {
        let store = self.process().store()?;
        let latch = Rc::new(StopLatch::new());

        let on_deactivate = Rc::clone(&latch);
        self.scope().on_deactivate(move || on_deactivate.terminate());

        Ok(Observation::new(store, fields.into(), latch))
    }
}
