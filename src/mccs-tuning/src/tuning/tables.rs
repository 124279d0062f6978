use super::{TaskAlgorithm, TaskProtocol, NUM_ALGORITHMS, NUM_FUNCTIONS, NUM_PROTOCOLS};

/// Hardware class of the links an algorithm crosses, selects the latency row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HwClass {
    NvLink = 0,
    Pci = 1,
    Net = 2,
}

pub const NUM_HW_CLASSES: usize = 3;

// Latencies in us, Bandwidths in GB/s
// Tree { LL, LL128, Simple }, Ring { LL, LL128, Simple }, CollNet { LL, LL128, Simple }
pub const BASE_LAT: [[f32; NUM_PROTOCOLS]; NUM_ALGORITHMS] = [
    [37.9, 37.9, 40.4],
    [20.5, 20.5, 27.9],
    [37.9, 37.9, 40.4],
];

// Tree/Simple is the latency of a 256kB chunk, which is ~ base lat + 256k/12GB/s
// (+ 256k/12GB/s for the network).
pub const HW_LAT: [[[f32; NUM_PROTOCOLS]; NUM_ALGORITHMS]; NUM_HW_CLASSES] = [
    // NVLink
    [[1.2, 1.2, 3.8], [2.3, 2.3, 2.7], [1.2, 1.2, 3.8]],
    // PCI
    [[2.2, 2.2, 5.7], [1.3, 1.3, 1.9], [2.2, 2.2, 5.7]],
    // Network
    [[9.8, 9.8, 19.5], [2.0, 2.0, 4.5], [9.8, 9.8, 19.5]],
];

// LL128 max bus bandwidth for each collective
pub const LL128_MAX_BW: [f32; NUM_FUNCTIONS] = [113.0, 72.0, 110.0, 91.0, 100.0];

/// Number of size buckets covered by the correction factors: powers of two
/// from 64 B to 128 MB.
pub const CORRECTION_BUCKETS: usize = 22;

// Trees are not perfectly sticking to the model for medium sizes. A static correction
// factor per size bucket works well enough.
pub const TREE_CORRECTION_FACTOR: [[f32; CORRECTION_BUCKETS]; NUM_PROTOCOLS] = [
    [
        1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.84, 0.49, 0.42, 0.60, 0.75, 0.87, 0.94, 0.94, 0.99,
        1.0, 1.0, 1.0, 1.0, 1.0, 1.0,
    ],
    [
        1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.84, 0.49, 0.42, 0.60, 0.75, 0.87, 0.94, 0.94, 0.99,
        1.0, 1.0, 1.0, 1.0, 1.0, 1.0,
    ],
    [
        1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.41, 0.27, 0.25, 0.39, 0.46, 0.72, 0.76, 0.87, 0.92, 0.97,
        1.0, 1.0, 1.0, 1.0, 1.0, 1.0,
    ],
];

pub const RING_CORRECTION_FACTOR: [[f32; CORRECTION_BUCKETS]; NUM_PROTOCOLS] = [
    [
        1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.25, 0.41, 0.55, 0.56, 0.78, 0.94, 1.0, 1.0, 1.0, 1.0, 1.0,
        1.0, 1.0, 1.0, 1.0, 1.0,
    ],
    [
        1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.25, 0.41, 0.55, 0.56, 0.78, 0.94, 1.0, 1.0, 1.0, 1.0, 1.0,
        1.0, 1.0, 1.0, 1.0, 1.0,
    ],
    [
        1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.04, 0.08, 0.09, 0.09, 0.11, 0.13, 0.25, 0.40, 0.59, 0.76,
        0.86, 1.0, 1.0, 1.0, 1.0, 1.0,
    ],
];

#[inline]
pub fn hw_latency(hw: HwClass, algo: TaskAlgorithm, proto: TaskProtocol) -> f32 {
    HW_LAT[hw as usize][algo.index()][proto.index()]
}

/// Bandwidth correction for a size bucket, `None` when the model is used as is.
#[inline]
pub fn correction_factor(algo: TaskAlgorithm, proto: TaskProtocol, bucket: usize) -> Option<f32> {
    let table = match algo {
        TaskAlgorithm::Tree => &TREE_CORRECTION_FACTOR,
        TaskAlgorithm::Ring => &RING_CORRECTION_FACTOR,
        TaskAlgorithm::CollNet => return None,
    };
    table[proto.index()].get(bucket).copied()
}
