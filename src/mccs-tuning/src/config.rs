use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::comm::{CommShape, ComputeCapRange};
use crate::topo::AlgoGraphs;

pub const ENV_NTHREADS: &str = "MCCS_NTHREADS";
pub const ENV_LL128_NTHREADS: &str = "MCCS_LL128_NTHREADS";
pub const ENV_PROTO: &str = "MCCS_PROTO";
pub const ENV_ALGO: &str = "MCCS_ALGO";
pub const ENV_THREAD_THRESHOLDS: &str = "MCCS_THREAD_THRESHOLDS";

// unset integer knob
pub const KNOB_UNSET: i64 = -2;
// LL128 is only enabled by default on Volta
pub const DEFAULT_LL128_COMPUTE_CAP: u32 = 70;

/// Tuning knobs loaded once before the tables are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuningEnv {
    pub nthreads: i64,
    pub ll128_nthreads: i64,
    pub proto: Option<String>,
    pub algo: Option<String>,
    pub thread_thresholds: Option<String>,
    pub ll128_compute_cap: u32,
}

impl Default for TuningEnv {
    fn default() -> Self {
        TuningEnv {
            nthreads: KNOB_UNSET,
            ll128_nthreads: KNOB_UNSET,
            proto: None,
            algo: None,
            thread_thresholds: None,
            ll128_compute_cap: DEFAULT_LL128_COMPUTE_CAP,
        }
    }
}

impl TuningEnv {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let int_knob = |key: &str| {
            lookup(key)
                .map(|value| parse_int_knob(key, &value))
                .unwrap_or(KNOB_UNSET)
        };
        TuningEnv {
            nthreads: int_knob(ENV_NTHREADS),
            ll128_nthreads: int_knob(ENV_LL128_NTHREADS),
            proto: lookup(ENV_PROTO),
            algo: lookup(ENV_ALGO),
            thread_thresholds: lookup(ENV_THREAD_THRESHOLDS),
            ..Default::default()
        }
    }

    /// Entries set in the config file take precedence over the environment.
    pub fn apply(&mut self, section: &TuningSection) {
        if let Some(nt) = section.nthreads {
            self.nthreads = nt;
        }
        if let Some(nt) = section.ll128_nthreads {
            self.ll128_nthreads = nt;
        }
        if let Some(proto) = &section.proto {
            self.proto = Some(proto.clone());
        }
        if let Some(algo) = &section.algo {
            self.algo = Some(algo.clone());
        }
        if let Some(thresholds) = &section.thread_thresholds {
            self.thread_thresholds = Some(thresholds.clone());
        }
        if let Some(cap) = section.ll128_compute_cap {
            self.ll128_compute_cap = cap;
        }
    }
}

fn parse_int_knob(key: &str, value: &str) -> i64 {
    match value.trim().parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            log::warn!("Invalid value {} for {}, using default", value, key);
            KNOB_UNSET
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TuningSection {
    pub nthreads: Option<i64>,
    pub ll128_nthreads: Option<i64>,
    pub proto: Option<String>,
    pub algo: Option<String>,
    pub thread_thresholds: Option<String>,
    pub ll128_compute_cap: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub comm: CommShape,
    pub compute_cap: ComputeCapRange,
    pub graphs: AlgoGraphs,
    #[serde(default)]
    pub tuning: TuningSection,
}

impl Config {
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Environment knobs with this file's `[tuning]` entries applied on top.
    pub fn tuning_env(&self) -> TuningEnv {
        let mut env = TuningEnv::from_env();
        env.apply(&self.tuning);
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    use crate::topo::LinkType;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn empty_lookup_is_default() {
        assert_eq!(TuningEnv::from_lookup(|_| None), TuningEnv::default());
    }

    #[test]
    fn reads_every_knob() {
        let env = TuningEnv::from_lookup(lookup_from(&[
            (ENV_NTHREADS, "256"),
            (ENV_LL128_NTHREADS, " 320 "),
            (ENV_PROTO, "^LL128"),
            (ENV_ALGO, "Ring"),
            (ENV_THREAD_THRESHOLDS, "1 2 3 4 5 6"),
        ]));
        assert_eq!(env.nthreads, 256);
        assert_eq!(env.ll128_nthreads, 320);
        assert_eq!(env.proto.as_deref(), Some("^LL128"));
        assert_eq!(env.algo.as_deref(), Some("Ring"));
        assert_eq!(env.thread_thresholds.as_deref(), Some("1 2 3 4 5 6"));
        assert_eq!(env.ll128_compute_cap, DEFAULT_LL128_COMPUTE_CAP);
    }

    #[test]
    fn invalid_integer_is_unset() {
        let env = TuningEnv::from_lookup(lookup_from(&[(ENV_NTHREADS, "lots")]));
        assert_eq!(env.nthreads, KNOB_UNSET);
    }

    #[test]
    fn section_overrides_env() {
        let mut env = TuningEnv::from_lookup(lookup_from(&[(ENV_PROTO, "LL"), (ENV_NTHREADS, "128")]));
        env.apply(&TuningSection {
            proto: Some("Simple".to_string()),
            ll128_compute_cap: Some(80),
            ..Default::default()
        });
        assert_eq!(env.proto.as_deref(), Some("Simple"));
        assert_eq!(env.nthreads, 128);
        assert_eq!(env.ll128_compute_cap, 80);
    }

    #[test]
    fn config_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[comm]
rank = 0
num_ranks = 16
num_nodes = 2

[compute_cap]
min = 80
max = 80

[graphs.tree]
num_channels = 2
speed_intra = 20.0
speed_inter = 12.0
type_intra = "nvlink"
type_inter = "net"

[graphs.ring]
num_channels = 2
speed_intra = 20.0
speed_inter = 12.0
type_intra = "nvlink"
type_inter = "net"
same_channels = true

[graphs.collnet]
num_channels = 1
speed_intra = 20.0
speed_inter = 12.0
type_intra = "nvlink"
type_inter = "net"

[tuning]
proto = "^LL128"
"#
        )
        .unwrap();

        let config = Config::from_path(file.path()).unwrap();
        assert_eq!(config.comm, CommShape::new(0, 16, 2));
        assert_eq!(config.compute_cap.min, 80);
        assert_eq!(config.graphs.ring.type_inter, LinkType::Net);
        assert!(config.graphs.ring.same_channels);
        assert!(!config.graphs.tree.same_channels);
        assert_eq!(config.tuning.proto.as_deref(), Some("^LL128"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[comm]\nrank = 0\nnum_ranks = 1\nnum_nodes = 1\nbogus = 3\n").unwrap();
        assert!(Config::from_path(file.path()).is_err());
    }
}
