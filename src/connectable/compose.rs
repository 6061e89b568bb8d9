//! Connectable composition
//!
//! Each adapter wraps `connect()` and forwards through a transformed
//! consumer or input function; none of them hold extra state.

use super::{Connectable, Connection, Consumer};
use crate::error::LoopError;
use std::marker::PhantomData;
use std::sync::Arc;

pub trait ConnectableExt<I, O>: Connectable<I, O> + Sized {
    /// Transform every output before it reaches the consumer.
    fn map<O2, F>(self, f: F) -> MapOutput<Self, F, O>
    where
        F: Fn(O) -> O2 + Send + Sync + 'static,
    {
        MapOutput {
            inner: self,
            f: Arc::new(f),
            _output: PhantomData,
        }
    }

    /// Transform every input before the wrapped connection sees it.
    fn contramap<I2, F>(self, f: F) -> Contramap<Self, F, I>
    where
        F: Fn(I2) -> I + Send + Sync + 'static,
    {
        Contramap {
            inner: self,
            f: Arc::new(f),
            _input: PhantomData,
        }
    }

    /// Transform outputs, dropping those mapped to `None`.
    fn filter_map<O2, F>(self, f: F) -> FilterMapOutput<Self, F, O>
    where
        F: Fn(O) -> Option<O2> + Send + Sync + 'static,
    {
        FilterMapOutput {
            inner: self,
            f: Arc::new(f),
            _output: PhantomData,
        }
    }
}

impl<I, O, C: Connectable<I, O>> ConnectableExt<I, O> for C {}

pub struct MapOutput<C, F, O> {
    inner: C,
    f: Arc<F>,
    _output: PhantomData<fn(O)>,
}

impl<I, O, O2, C, F> Connectable<I, O2> for MapOutput<C, F, O>
where
    C: Connectable<I, O>,
    F: Fn(O) -> O2 + Send + Sync + 'static,
    O: 'static,
    O2: 'static,
{
    fn connect(&self, output: Consumer<O2>) -> Result<Box<dyn Connection<I>>, LoopError> {
        let f = self.f.clone();
        self.inner.connect(Arc::new(move |value: O| output(f(value))))
    }
}

pub struct FilterMapOutput<C, F, O> {
    inner: C,
    f: Arc<F>,
    _output: PhantomData<fn(O)>,
}

impl<I, O, O2, C, F> Connectable<I, O2> for FilterMapOutput<C, F, O>
where
    C: Connectable<I, O>,
    F: Fn(O) -> Option<O2> + Send + Sync + 'static,
    O: 'static,
    O2: 'static,
{
    fn connect(&self, output: Consumer<O2>) -> Result<Box<dyn Connection<I>>, LoopError> {
        let f = self.f.clone();
        self.inner.connect(Arc::new(move |value: O| {
            if let Some(mapped) = f(value) {
                output(mapped);
            }
        }))
    }
}

pub struct Contramap<C, F, I> {
    inner: C,
    f: Arc<F>,
    _input: PhantomData<fn(I)>,
}

impl<I, I2, O, C, F> Connectable<I2, O> for Contramap<C, F, I>
where
    C: Connectable<I, O>,
    F: Fn(I2) -> I + Send + Sync + 'static,
    I: 'static,
    I2: 'static,
{
    fn connect(&self, output: Consumer<O>) -> Result<Box<dyn Connection<I2>>, LoopError> {
        let inner = self.inner.connect(output)?;
        Ok(Box::new(ContramapConnection {
            inner,
            f: self.f.clone(),
        }))
    }
}

struct ContramapConnection<F, I> {
    inner: Box<dyn Connection<I>>,
    f: Arc<F>,
}

impl<I, I2, F> Connection<I2> for ContramapConnection<F, I>
where
    F: Fn(I2) -> I + Send + Sync,
{
    fn accept(&self, input: I2) {
        self.inner.accept((self.f)(input));
    }

    fn dispose(&self) {
        self.inner.dispose();
    }
}
