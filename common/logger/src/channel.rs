use crate::level::{LevelRegistry, Rank, NOTSET};
use crate::sink::SinkHandle;
use crate::LoggerError;
use lazy_static::lazy_static;
use log::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

struct Channel {
    floor: Rank,
    sinks: Vec<Arc<SinkHandle>>,
}

impl Default for Channel {
    fn default() -> Self {
        Self { floor: NOTSET, sinks: vec![] }
    }
}

lazy_static! {
    // Channels outlive the objects that configure them: sinks stay attached to a
    // name until they are explicitly detached.
    static ref CHANNELS: Mutex<HashMap<String, Channel>> = Mutex::new(HashMap::new());
}

fn channels() -> MutexGuard<'static, HashMap<String, Channel>> {
    CHANNELS.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A handle to a process-wide severity channel, keyed by name.
///
/// Two instances with the same name share floor and sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerInstance {
    name: String,
}

impl LoggerInstance {
    pub fn get(name: &str) -> Self {
        channels().entry(name.to_owned()).or_default();
        Self { name: name.to_owned() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn floor(&self) -> Rank {
        channels().get(&self.name).map(|channel| channel.floor).unwrap_or(NOTSET)
    }

    pub fn set_floor(&self, floor: Rank) {
        debug!(
            "LoggerInstance - channel [{}] floor set to {}",
            self.name,
            LevelRegistry::display_name(floor)
        );
        channels().entry(self.name.clone()).or_default().floor = floor;
    }

    pub fn is_enabled_for(&self, rank: Rank) -> bool {
        rank >= self.floor()
    }

    pub fn sink_count(&self) -> usize {
        channels().get(&self.name).map(|channel| channel.sinks.len()).unwrap_or(0)
    }

    /// Writes `message` to every sink of the channel that admits `rank`.
    ///
    /// A failing sink does not prevent the others from receiving the line.
    pub fn dispatch(&self, rank: Rank, message: &str) {
        let sinks = match channels().get(&self.name) {
            Some(channel) if rank >= channel.floor => channel.sinks.clone(),
            _ => return,
        };
        for sink in sinks.iter().filter(|sink| sink.admits(rank)) {
            if let Err(err) = sink.emit(rank, message) {
                warn!("LoggerInstance - cannot write to sink {:?}. err: {}", sink, err);
            }
        }
    }

    pub fn flush(&self) {
        let sinks = channels().get(&self.name).map(|channel| channel.sinks.clone());
        for sink in sinks.unwrap_or_default() {
            if let Err(err) = sink.flush() {
                warn!("LoggerInstance - cannot flush sink {:?}. err: {}", sink, err);
            }
        }
    }

    fn add_sink(&self, sink: Arc<SinkHandle>) {
        channels().entry(self.name.clone()).or_default().sinks.push(sink);
    }

    fn remove_sink(&self, sink: &SinkHandle) -> bool {
        match channels().get_mut(&self.name) {
            Some(channel) => {
                let before = channel.sinks.len();
                channel.sinks.retain(|attached| attached.id() != sink.id());
                before != channel.sinks.len()
            }
            None => false,
        }
    }
}

/// Tracks the sinks one owner attached to a channel so that exactly those
/// can be detached and closed again.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    attached: Vec<Arc<SinkHandle>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn attach(&mut self, instance: &LoggerInstance, sink: SinkHandle) -> Arc<SinkHandle> {
        debug!("HandlerRegistry - attaching {:?} to channel [{}]", sink, instance.name());
        let sink = Arc::new(sink);
        instance.add_sink(sink.clone());
        self.attached.push(sink.clone());
        sink
    }

    /// Removes every tracked sink from the channel and closes it.
    /// Safe to call repeatedly; every sink is closed even if one of them fails,
    /// the first failure is returned.
    pub fn detach_all(&mut self, instance: &LoggerInstance) -> Result<(), LoggerError> {
        let mut result = Ok(());
        for sink in self.attached.drain(..) {
            if !instance.remove_sink(&sink) {
                debug!(
                    "HandlerRegistry - sink [{}] was not attached to channel [{}]",
                    sink.id(),
                    instance.name()
                );
            }
            if let Err(err) = sink.close() {
                warn!("HandlerRegistry - cannot close sink {:?}. err: {}", sink, err);
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
        result
    }

    pub fn sinks(&self) -> &[Arc<SinkHandle>] {
        &self.attached
    }

    pub fn len(&self) -> usize {
        self.attached.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attached.is_empty()
    }
}
