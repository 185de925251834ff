use std::ops::{Deref, DerefMut};

use tracing::{debug, warn};

use crate::{
    backend::{Backends, Connection, Engine},
    error::{ConfigurationError, ExecutionError},
    options::Options,
};

#[derive(Debug, Clone)]
pub struct ConnectionSpec {
    pub connection_string: String,
    pub engine_options: Options,
}

/// Owns the engine for one run. The engine is disposed when this is dropped,
/// and a [`Session`] borrows the manager, so the connection always goes first.
pub struct ConnectionManager {
    engine: Box<dyn Engine>,
}

impl ConnectionManager {
    pub fn open(spec: &ConnectionSpec, backends: &Backends) -> Result<Self, ConfigurationError> {
        let engine = backends.create_engine(&spec.connection_string, &spec.engine_options)?;
        debug!(options = spec.engine_options.len(), "engine created");
        Ok(Self { engine })
    }

    pub fn connect(&self) -> Result<Session<'_>, ExecutionError> {
        let connection = self.engine.connect()?;
        debug!("connection opened");
        Ok(Session { connection })
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.engine.dispose();
        debug!("engine disposed");
    }
}

/// The single live connection of a run; closed on drop.
pub struct Session<'e> {
    connection: Box<dyn Connection + 'e>,
}

impl<'e> Deref for Session<'e> {
    type Target = dyn Connection + 'e;
    fn deref(&self) -> &Self::Target {
        self.connection.as_ref()
    }
}

impl DerefMut for Session<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection.as_mut()
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        match self.connection.close() {
            Ok(()) => debug!("connection closed"),
            Err(err) => warn!(%err, "failed to close connection"),
        }
    }
}
