//! Keeps inflated targets in sync with their fragments.
//!
//! A [`ReactiveInflator`] runs a new pass whenever something a previous pass
//! read changes. The [`Runtime`] drives one from a channel of [`Event`]s, so a
//! watcher on another part of the program can swap in a reloaded fragment.
use flume::{Receiver, TryRecvError};
use trellis_core::error::Result;

pub use self::events::{Event, ResourceNotifier};
pub use self::meta::{Meta, Timings};
pub use self::reactive::ReactiveInflator;
pub use self::template::Template;

pub mod events;
mod meta;
mod reactive;
mod template;

pub struct Runtime {
    inflator: ReactiveInflator,
    events: Receiver<Event>,
}

impl Runtime {
    pub fn new(inflator: ReactiveInflator) -> (Self, ResourceNotifier) {
        let (sender, events) = flume::unbounded();
        let runtime = Self { inflator, events };
        (runtime, ResourceNotifier { sender })
    }

    pub fn inflator(&self) -> &ReactiveInflator {
        &self.inflator
    }

    /// Handle the pending events without blocking.
    ///
    /// Returns `false` once the runtime was asked to quit, or every notifier is gone.
    pub fn poll(&mut self) -> Result<bool> {
        loop {
            match self.events.try_recv() {
                Ok(Event::Quit) | Err(TryRecvError::Disconnected) => break Ok(false),
                Ok(event) => self.handle(event)?,
                Err(TryRecvError::Empty) => break Ok(true),
            }
        }
    }

    /// Inflate once, then keep handling events until asked to quit.
    ///
    /// Only the first pass is fatal. Later failures are logged and the
    /// target keeps whatever the last good pass left on it.
    pub fn run(self) -> Result<()> {
        self.inflator.inflate()?;

        while let Ok(event) = self.events.recv() {
            if let Event::Quit = event {
                break;
            }

            if let Err(err) = self.handle(event) {
                log::error!("{err}");
            }
        }

        log::debug!("runtime stopped after {} passes", self.inflator.meta().passes);
        Ok(())
    }

    fn handle(&self, event: Event) -> Result<()> {
        match event {
            Event::ResourceChanged(fragment) => {
                log::debug!("reloading fragment from {}", fragment.location());
                self.inflator.change_fragment_and_inflate(fragment)
            }
            Event::Refresh => self.inflator.inflate(),
            Event::Quit => Ok(()),
        }
    }
}
