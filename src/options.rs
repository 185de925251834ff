use std::collections::BTreeMap;

use crate::{error::ConfigurationError, value::Value};

pub type Options = BTreeMap<String, Value>;

/// Turns `KEY VALUE` pairs into typed options. A repeated key keeps its last value.
pub fn coerce<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Options
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.as_ref().to_string(), Value::from(value.as_ref())))
        .collect()
}

pub const NO_PARAMETERS: &str = "no_parameters";
pub const STREAM_RESULTS: &str = "stream_results";
pub const YIELD_PER: &str = "yield_per";

/// The options applied to a connection before the statement runs.
pub fn default_execution_options() -> Options {
    let mut options = Options::new();
    options.insert(NO_PARAMETERS.to_string(), Value::Bool(true));
    options.insert(STREAM_RESULTS.to_string(), Value::Bool(true));
    options
}

/// Layers user supplied pairs over [`default_execution_options`].
pub fn execution_options_with<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Options
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut options = default_execution_options();
    options.extend(coerce(pairs));
    options
}

/// The untyped execution options of a run, defaults included.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionSpec {
    pub options: Options,
}

impl Default for ExecutionSpec {
    fn default() -> Self {
        Self {
            options: default_execution_options(),
        }
    }
}

impl ExecutionSpec {
    pub fn with_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self {
            options: execution_options_with(pairs),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOptions {
    pub no_parameters: bool,
    pub stream_results: bool,
    pub yield_per: Option<u64>,
    /// Keys no driver here understands; kept so they can be reported.
    pub extra: Options,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            no_parameters: true,
            stream_results: true,
            yield_per: None,
            extra: Options::new(),
        }
    }
}

impl TryFrom<&Options> for ExecutionOptions {
    type Error = ConfigurationError;
    fn try_from(options: &Options) -> Result<Self, Self::Error> {
        let mut execution = ExecutionOptions {
            no_parameters: false,
            stream_results: false,
            ..Default::default()
        };
        for (key, value) in options {
            match key.as_str() {
                NO_PARAMETERS => execution.no_parameters = expect_bool(key, value)?,
                STREAM_RESULTS => execution.stream_results = expect_bool(key, value)?,
                YIELD_PER => {
                    let size = value
                        .as_int()
                        .and_then(|i| u64::try_from(i).ok())
                        .filter(|i| *i > 0)
                        .ok_or_else(|| invalid_execution_option(key, value))?;
                    execution.yield_per = Some(size);
                    // yield_per implies a streamed cursor.
                    execution.stream_results = true;
                }
                _ => {
                    execution.extra.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(execution)
    }
}

fn expect_bool(key: &str, value: &Value) -> Result<bool, ConfigurationError> {
    value
        .as_bool()
        .ok_or_else(|| invalid_execution_option(key, value))
}

fn invalid_execution_option(key: &str, value: &Value) -> ConfigurationError {
    ConfigurationError::InvalidExecutionOption {
        key: key.to_string(),
        value: value.to_string(),
    }
}
