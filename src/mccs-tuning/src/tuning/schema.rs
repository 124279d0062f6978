use strum::IntoEnumIterator;

use super::estimate::{estimate_time, CollInfo};
use super::{TaskAlgorithm, TaskFuncType, TaskProtocol, TuningError, WARP_SIZE};

/// Launch shape chosen for one collective.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskSchema {
    pub algorithm: TaskAlgorithm,
    pub protocol: TaskProtocol,
    pub coll_func: TaskFuncType,
    pub num_channels: u32,
    pub num_threads: u32,
}

/// Pick the (algorithm, protocol) pair with the smallest predicted time.
/// Ties keep the pair enumerated first.
pub fn select_algorithm(
    info: &CollInfo<'_>,
) -> Result<(TaskAlgorithm, TaskProtocol, f32), TuningError> {
    let mut best: Option<(TaskAlgorithm, TaskProtocol, f32)> = None;
    for algo in TaskAlgorithm::iter() {
        for proto in TaskProtocol::iter() {
            let Some(time) = estimate_time(info, algo, proto) else {
                continue;
            };
            if best.map_or(true, |(_, _, min_time)| time < min_time) {
                best = Some((algo, proto, time));
            }
        }
    }
    best.ok_or(TuningError::NoAlgorithm {
        func: info.func,
        bytes: info.num_bytes,
    })
}

/// Select an algorithm and shrink channels, then threads, while each thread
/// would get less work than the threshold.
///
/// Simple adds sync warps on top of the thread ceiling, so the launch block
/// must hold up to `max_threads + 2 * WARP_SIZE` threads.
pub fn get_task_schema(info: &CollInfo<'_>, num_channels: u32) -> Result<TaskSchema, TuningError> {
    let (algorithm, protocol, time) = select_algorithm(info)?;
    log::debug!(
        "{:?} {} bytes -> {}/{} ({:.1} us)",
        info.func,
        info.num_bytes,
        algorithm.name(),
        protocol.name(),
        time
    );

    let tables = info.tables;
    let thread_th = tables.thread_threshold(algorithm, protocol);
    let mut nc = num_channels.max(1) as u64;
    let mut nt = tables.max_threads(algorithm, protocol) as u64;
    // a huge threshold saturates and keeps shrinking
    while (info.num_bytes as u64) < nc.saturating_mul(nt).saturating_mul(thread_th) {
        if nc >= 2 {
            nc -= 1;
        } else if nt % 128 == 0 {
            nt /= 2;
        } else {
            break;
        }
    }
    let mut nt = nt as u32;
    if protocol == TaskProtocol::Simple {
        // extra warp for sync
        nt += WARP_SIZE;
        if algorithm == TaskAlgorithm::Tree {
            nt += WARP_SIZE;
        }
    }

    Ok(TaskSchema {
        algorithm,
        protocol,
        coll_func: info.func,
        num_channels: nc as u32,
        num_threads: nt,
    })
}
