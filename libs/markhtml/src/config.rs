//! Pool sizing, with env var overrides.

use std::env::VarError;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use chj_util::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Items kept per pool; further returned items are dropped.
    pub max_pooled: usize,
    /// Frames an ending stack keeps when returned.
    pub max_stack_frames: usize,
    /// Capacity a frame keeps when returned.
    pub max_frame_capacity: usize,
    /// Capacity a response output buffer keeps when returned.
    pub max_output_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism().map_or(1, |n| n.get());
        PoolConfig {
            max_pooled: 4 * cpus,
            max_stack_frames: 2,
            max_frame_capacity: 2,
            max_output_capacity: 50_000,
        }
    }
}

pub fn getenv(name: &str) -> Result<Option<String>> {
    match std::env::var(name) {
        Ok(s) => Ok(Some(s)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => bail!("{name:?} env var is not unicode"),
    }
}

fn parse_var<T>(
    getvar: &impl Fn(&str) -> Result<Option<String>>, name: &str, default: T,
) -> Result<T>
where T: FromStr,
      T::Err: std::error::Error + Send + Sync + 'static
{
    match getvar(name)? {
        Some(s) => s.trim().parse().with_context(|| format!("parsing env var {name:?}")),
        None => Ok(default),
    }
}

impl PoolConfig {
    pub fn from_vars(getvar: impl Fn(&str) -> Result<Option<String>>) -> Result<Self> {
        let d = PoolConfig::default();
        Ok(PoolConfig {
            max_pooled: parse_var(&getvar, "MARKHTML_POOL_SIZE", d.max_pooled)?,
            max_stack_frames: parse_var(&getvar, "MARKHTML_MAX_STACK_FRAMES", d.max_stack_frames)?,
            max_frame_capacity: parse_var(
                &getvar, "MARKHTML_MAX_FRAME_CAPACITY", d.max_frame_capacity)?,
            max_output_capacity: parse_var(
                &getvar, "MARKHTML_MAX_OUTPUT_CAPACITY", d.max_output_capacity)?,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_vars(getenv)
    }

    /// `from_env`, falling back to the defaults (with a warning) on
    /// invalid settings.
    pub fn from_env_or_default() -> Self {
        match Self::from_env() {
            Ok(c) => c,
            Err(e) => {
                warn!("ignoring pool configuration: {e:#}");
                PoolConfig::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&'static str, &'static str)])
            -> impl Fn(&str) -> Result<Option<String>> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |name: &str| Ok(map.get(name).map(|s| s.to_string()))
    }

    #[test]
    fn t_from_vars() {
        let c = PoolConfig::from_vars(vars(&[("MARKHTML_POOL_SIZE", " 7"),
                                             ("MARKHTML_MAX_OUTPUT_CAPACITY", "1000")]))
            .unwrap();
        assert_eq!(c.max_pooled, 7);
        assert_eq!(c.max_output_capacity, 1000);
        assert_eq!(c.max_stack_frames, 2);
        assert_eq!(c.max_frame_capacity, 2);
        assert_eq!(PoolConfig::from_vars(vars(&[])).unwrap(), PoolConfig::default());

        let e = PoolConfig::from_vars(vars(&[("MARKHTML_MAX_STACK_FRAMES", "many")]))
            .unwrap_err();
        assert!(format!("{e:#}").contains("MARKHTML_MAX_STACK_FRAMES"));
    }
}
