use super::tables::correction_factor;
use super::{log2i, PerformanceTables, TaskAlgorithm, TaskFuncType, TaskProtocol};

/// One collective call being dispatched.
#[derive(Clone, Copy, Debug)]
pub struct CollInfo<'a> {
    pub tables: &'a PerformanceTables,
    pub func: TaskFuncType,
    pub num_bytes: usize,
}

impl<'a> CollInfo<'a> {
    pub fn new(tables: &'a PerformanceTables, func: TaskFuncType, num_bytes: usize) -> Self {
        CollInfo {
            tables,
            func,
            num_bytes,
        }
    }
}

/// Correction bucket of a message: log2 of its size in 64 B units.
#[inline]
pub fn size_bucket(num_bytes: usize) -> usize {
    log2i(num_bytes >> 6) as usize
}

/// Predicted completion time in microseconds, `None` when the combination is
/// disabled and must not be selected.
pub fn estimate_time(info: &CollInfo<'_>, algo: TaskAlgorithm, proto: TaskProtocol) -> Option<f32> {
    let mut bw = info.tables.bandwidth(info.func, algo, proto);
    if bw == 0.0 {
        return None;
    }
    if let Some(factor) = correction_factor(algo, proto, size_bucket(info.num_bytes)) {
        bw *= factor;
    }
    // us + bytes / (GB/s * 1000)
    Some(info.tables.latency(info.func, algo, proto) + info.num_bytes as f32 / (1000.0 * bw))
}
