use std::fmt;

use strum::IntoEnumIterator;

use super::{PerformanceTables, TaskAlgorithm, TaskFuncType, TaskProtocol};

/// Latency/bandwidth grid of built tables, one row per collective.
pub struct TuningReport<'a>(pub &'a PerformanceTables);

impl fmt::Display for TuningReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = self.0;
        write!(f, "Latency/AlgBw |")?;
        for algo in TaskAlgorithm::iter() {
            for proto in TaskProtocol::iter() {
                write!(f, " {:>7}/{:>6} |", algo.name(), proto.name())?;
            }
        }
        writeln!(f)?;
        write!(f, " Max NThreads |")?;
        for algo in TaskAlgorithm::iter() {
            for proto in TaskProtocol::iter() {
                write!(f, " {:>14} |", tables.max_threads(algo, proto))?;
            }
        }
        for func in TaskFuncType::iter() {
            writeln!(f)?;
            write!(f, "{:>13} |", func.name())?;
            for algo in TaskAlgorithm::iter() {
                for proto in TaskProtocol::iter() {
                    write!(
                        f,
                        "{:8.1}/{:6.1} |",
                        tables.latency(func, algo, proto),
                        tables.bandwidth(func, algo, proto)
                    )?;
                }
            }
        }
        Ok(())
    }
}

pub fn thread_thresholds_line(tables: &PerformanceTables) -> String {
    let rows: Vec<String> = tables
        .thread_thresholds
        .iter()
        .map(|row| format!("{}/{}/{}", row[0], row[1], row[2]))
        .collect();
    format!("threadThresholds {}", rows.join(" | "))
}

/// Log the tuning grid on rank 0 and the thread thresholds on every rank.
pub fn log_tuning_summary(tables: &PerformanceTables, rank: usize) {
    if rank == 0 {
        for line in TuningReport(tables).to_string().lines() {
            log::info!("{}", line);
        }
    }
    log::info!("{}", thread_thresholds_line(tables));
}
