use crate::error::{Error, Result};
use crate::exclude::ExcludedRanges;
use core::fmt;
use std::collections::BTreeMap;

/// Parameter key for the logical sequence name. Required.
pub const SEQUENCE_PARAM: &str = "sequence_name";
/// Parameter key for the optional namespace/schema qualifier.
pub const SCHEMA_PARAM: &str = "schema";
/// Parameter key for the pooled allocator's batch size.
pub const POOL_SIZE_PARAM: &str = "pool_size";
/// Parameter key for the non-pooled allocator's increment size.
pub const INCREMENT_PARAM: &str = "increment_size";
/// Parameter key for the starting counter value of the backing sequence.
pub const INITIAL_PARAM: &str = "initial_value";
/// Parameter key for a single excluded range (pooled allocator).
pub const EXCLUDE_RANGE_PARAM: &str = "exclude_range";
/// Parameter key for space-separated excluded ranges (non-pooled allocator).
pub const EXCLUDE_RANGES_PARAM: &str = "exclude_ranges";

/// Default batch size for a [`PooledSequenceConfig`].
pub const DEFAULT_POOL_SIZE: usize = 50;
/// Default increment size for a [`SequenceConfig`].
pub const DEFAULT_INCREMENT_SIZE: usize = 100;
/// Default starting counter value.
pub const DEFAULT_INITIAL_VALUE: i64 = 1;

const MAX_INCREMENT_SIZE: usize = 200;

/// The identity of a logical sequence: its name plus an optional
/// namespace/schema qualifier.
///
/// Immutable once an allocator is constructed; scopes pools in the
/// [`PoolRegistry`] and prefixes diagnostic messages.
///
/// [`PoolRegistry`]: crate::PoolRegistry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SequenceName {
    schema: Option<String>,
    name: String,
}

impl SequenceName {
    /// An unqualified sequence name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// A schema-qualified sequence name.
    pub fn with_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// Splits a dotted name (`schema.name`) into its qualifier and object
    /// name; a name without a dot stays unqualified.
    pub fn parse(qualified: &str) -> Self {
        match qualified.rsplit_once('.') {
            Some((schema, name)) => Self::with_schema(schema, name),
            None => Self::new(qualified),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }
}

impl fmt::Display for SequenceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// String key/value generator parameters, as handed over by a host
/// persistence framework's configuration mechanism.
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: BTreeMap<String, String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<i64>().map(Some).map_err(|err| {
                Error::Configuration(format!(
                    "invalid value for the '{key}' parameter: {err} (found '{raw}')"
                ))
            }),
        }
    }

    fn get_usize(&self, key: &str) -> Result<Option<usize>> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<usize>().map(Some).map_err(|err| {
                Error::Configuration(format!(
                    "invalid value for the '{key}' parameter: {err} (found '{raw}')"
                ))
            }),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn determine_sequence_name(params: &Params) -> Result<SequenceName> {
    let Some(raw) = params.get(SEQUENCE_PARAM) else {
        return Err(Error::Configuration("no sequence name specified".into()));
    };
    if raw.contains('.') {
        return Ok(SequenceName::parse(raw));
    }
    Ok(match params.get(SCHEMA_PARAM) {
        Some(schema) if !schema.is_empty() => SequenceName::with_schema(schema, raw),
        _ => SequenceName::new(raw),
    })
}

fn determine_initial_value(params: &Params) -> Result<i64> {
    let initial_value = params.get_i64(INITIAL_PARAM)?.unwrap_or(DEFAULT_INITIAL_VALUE);
    if initial_value <= 0 {
        return Err(Error::Configuration("initial value must be positive".into()));
    }
    Ok(initial_value)
}

/// Configuration for the pooled allocator: one sequence, one batch size,
/// at most one excluded range.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PooledSequenceConfig {
    name: SequenceName,
    pool_size: usize,
    initial_value: i64,
    excluded: ExcludedRanges,
}

impl PooledSequenceConfig {
    /// Builds the configuration from host-framework parameters.
    ///
    /// Recognized keys: [`SEQUENCE_PARAM`] (required), [`SCHEMA_PARAM`],
    /// [`POOL_SIZE_PARAM`], [`INITIAL_PARAM`], and the single-range
    /// [`EXCLUDE_RANGE_PARAM`]. Every parse failure is fatal here, at
    /// construction time.
    pub fn from_params(params: &Params) -> Result<Self> {
        let name = determine_sequence_name(params)?;
        let pool_size = params.get_usize(POOL_SIZE_PARAM)?.unwrap_or(DEFAULT_POOL_SIZE);
        if pool_size == 0 {
            return Err(Error::Configuration("pool size must be positive".into()));
        }
        let initial_value = determine_initial_value(params)?;
        let excluded = ExcludedRanges::parse_single(
            name.name(),
            params.get(EXCLUDE_RANGE_PARAM).unwrap_or(""),
        )?;
        Ok(Self {
            name,
            pool_size,
            initial_value,
            excluded,
        })
    }

    pub fn name(&self) -> &SequenceName {
        &self.name
    }

    /// Number of raw values fetched per refill round trip.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Starting counter value of the backing sequence. Consumed by the DDL
    /// layer that creates the sequence; the allocator itself only records it.
    pub fn initial_value(&self) -> i64 {
        self.initial_value
    }

    pub fn excluded(&self) -> &ExcludedRanges {
        &self.excluded
    }
}

/// Configuration for the non-pooled allocator: one sequence, an increment
/// size, and any number of excluded ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SequenceConfig {
    name: SequenceName,
    increment_size: usize,
    initial_value: i64,
    excluded: ExcludedRanges,
}

impl SequenceConfig {
    /// Builds the configuration from host-framework parameters.
    ///
    /// Recognized keys: [`SEQUENCE_PARAM`] (required), [`SCHEMA_PARAM`],
    /// [`INCREMENT_PARAM`], [`INITIAL_PARAM`], [`EXCLUDE_RANGES_PARAM`] and
    /// [`EXCLUDE_RANGE_PARAM`]. Both exclusion keys are accepted and
    /// combined, so configurations written for the pooled allocator keep
    /// working when switched to this variant.
    pub fn from_params(params: &Params) -> Result<Self> {
        let name = determine_sequence_name(params)?;
        let increment_size = params
            .get_usize(INCREMENT_PARAM)?
            .unwrap_or(DEFAULT_INCREMENT_SIZE);
        if increment_size == 0 {
            return Err(Error::Configuration("increment size must be positive".into()));
        }
        if increment_size > MAX_INCREMENT_SIZE {
            return Err(Error::Configuration(format!(
                "increment size must be <= {MAX_INCREMENT_SIZE}"
            )));
        }
        let initial_value = determine_initial_value(params)?;
        let mut excluded = ExcludedRanges::parse(
            name.name(),
            params.get(EXCLUDE_RANGES_PARAM).unwrap_or(""),
        )?;
        let single = ExcludedRanges::parse(
            name.name(),
            params.get(EXCLUDE_RANGE_PARAM).unwrap_or(""),
        )?;
        excluded = excluded.concat(single);
        Ok(Self {
            name,
            increment_size,
            initial_value,
            excluded,
        })
    }

    pub fn name(&self) -> &SequenceName {
        &self.name
    }

    /// Configured increment size. Validated here; round-trip amortization is
    /// the pooled allocator's job.
    pub fn increment_size(&self) -> usize {
        self.increment_size
    }

    /// Starting counter value of the backing sequence. Consumed by the DDL
    /// layer that creates the sequence; the allocator itself only records it.
    pub fn initial_value(&self) -> i64 {
        self.initial_value
    }

    pub fn excluded(&self) -> &ExcludedRanges {
        &self.excluded
    }
}
