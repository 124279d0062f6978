use strum::IntoEnumIterator;

use super::list::parse_list;
use super::tables::{hw_latency, HwClass, BASE_LAT, LL128_MAX_BW};
use super::threads::resolve_num_threads;
use super::{
    log2i, PerformanceTables, TaskAlgorithm, TaskFuncType, TaskProtocol, TuningError,
    ALGORITHM_NAMES, LL128_MAX_NTHREADS, LL128_THREAD_THRESHOLD, LL_THREAD_THRESHOLD,
    MAX_NTHREADS, NUM_ALGORITHMS, NUM_PROTOCOLS, PCI_WIDTH, PROTOCOL_NAMES, REDUCED_NTHREADS,
    SIMPLE_THREAD_THRESHOLD, WARP_SIZE,
};
use crate::comm::CommShape;
use crate::config::{TuningEnv, ENV_LL128_NTHREADS, ENV_NTHREADS};
use crate::topo::{AlgoGraphs, LinkType, TopoGraph};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ProtoEnable {
    Off,
    On,
    // decided per algorithm from the topology
    Auto,
}

impl From<bool> for ProtoEnable {
    fn from(enabled: bool) -> Self {
        if enabled {
            ProtoEnable::On
        } else {
            ProtoEnable::Off
        }
    }
}

// LL, LL128, Simple
const DEFAULT_PROTO_ENABLE: [ProtoEnable; NUM_PROTOCOLS] =
    [ProtoEnable::On, ProtoEnable::Auto, ProtoEnable::On];

const ALGORITHMS: [TaskAlgorithm; NUM_ALGORITHMS] =
    [TaskAlgorithm::Tree, TaskAlgorithm::Ring, TaskAlgorithm::CollNet];

// Tree LL/LL128/Simple, then Ring LL/LL128/Simple
const NUM_THRESHOLD_OVERRIDES: usize = 2 * NUM_PROTOCOLS;

/// Fill `tables` with the bandwidth/latency model of every collective,
/// algorithm and protocol, plus the thread ceilings and thresholds.
///
/// Must complete before the communicator issues any collective. Invalid
/// knobs in `env` degrade to defaults; the only error is failing to allocate
/// while parsing the enable lists.
pub fn build_thresholds(
    tables: &mut PerformanceTables,
    shape: &CommShape,
    env: &TuningEnv,
    min_comp_cap: u32,
    max_comp_cap: u32,
    graphs: &AlgoGraphs,
) -> Result<(), TuningError> {
    set_max_threads(tables, env, &graphs.ring);

    if shape.num_ranks <= 1 {
        return Ok(());
    }

    let hw_intra: [HwClass; NUM_ALGORITHMS] = ALGORITHMS.map(|algo| {
        if graphs.get(algo).type_intra == LinkType::NvLink {
            HwClass::NvLink
        } else {
            HwClass::Pci
        }
    });
    let hw = hw_intra.map(|intra| if shape.num_nodes == 1 { intra } else { HwClass::Net });

    for func in TaskFuncType::iter() {
        let num_steps = func.num_steps(shape.num_ranks);
        for algo in TaskAlgorithm::iter() {
            if !func.supports(algo) {
                continue;
            }
            let graph = graphs.get(algo);
            for proto in TaskProtocol::iter() {
                let bus_bw = bus_bandwidth(func, algo, proto, graph, shape.num_nodes);
                // Convert bus BW to algorithm BW
                let ratio = match algo {
                    TaskAlgorithm::Ring => shape.num_ranks as f32 / num_steps as f32,
                    _ => 0.5,
                };
                let (f, a, p) = (func.index(), algo.index(), proto.index());
                tables.bandwidths[f][a][p] = bus_bw * ratio;

                let base = BASE_LAT[a][p];
                tables.latencies[f][a][p] = match algo {
                    TaskAlgorithm::Ring => {
                        base + ring_latency(func, proto, hw[a], graphs.ring.same_channels, num_steps)
                    }
                    TaskAlgorithm::Tree => {
                        let intra_lat = hw_latency(hw_intra[a], algo, proto);
                        let inter_lat = hw_latency(HwClass::Net, algo, proto);
                        base + 2.0
                            * ((shape.ranks_per_node() as f32 - 1.0) * intra_lat
                                + log2i(shape.num_nodes) as f32 * inter_lat)
                    }
                    TaskAlgorithm::CollNet => {
                        let intra_lat = hw_latency(hw_intra[a], algo, proto);
                        let inter_lat = hw_latency(HwClass::Net, algo, proto);
                        base + 2.0 * (shape.ranks_per_node() as f32 - 1.0) * intra_lat + inter_lat
                    }
                };
            }
        }
    }

    apply_enable_policy(tables, env, min_comp_cap, max_comp_cap, graphs)?;
    set_thread_thresholds(tables, env, shape.num_ranks);
    Ok(())
}

fn set_max_threads(tables: &mut PerformanceTables, env: &TuningEnv, ring: &TopoGraph) {
    let ring_simple_default = if ring.speed_intra * ring.num_channels as f32 <= PCI_WIDTH {
        REDUCED_NTHREADS
    } else {
        MAX_NTHREADS
    };
    let min_threads = 4 * WARP_SIZE;
    let ring_simple = resolve_num_threads(
        ENV_NTHREADS,
        env.nthreads,
        min_threads,
        MAX_NTHREADS,
        ring_simple_default,
    );
    let general = resolve_num_threads(
        ENV_NTHREADS,
        env.nthreads,
        min_threads,
        MAX_NTHREADS,
        MAX_NTHREADS,
    );
    let ll128 = resolve_num_threads(
        ENV_LL128_NTHREADS,
        env.ll128_nthreads,
        LL128_MAX_NTHREADS / 4,
        LL128_MAX_NTHREADS,
        LL128_MAX_NTHREADS,
    );

    for algo in TaskAlgorithm::iter() {
        let simple = if algo == TaskAlgorithm::Ring {
            ring_simple
        } else {
            general
        };
        tables.max_threads[algo.index()] = [general, ll128, simple];
    }
}

fn bus_bandwidth(
    func: TaskFuncType,
    algo: TaskAlgorithm,
    proto: TaskProtocol,
    graph: &TopoGraph,
    num_nodes: usize,
) -> f32 {
    let speed = if num_nodes <= 2 || algo == TaskAlgorithm::CollNet {
        graph.speed_intra
    } else {
        graph.speed_inter
    };
    let bus_bw = graph.num_channels as f32 * speed;

    // Empirical refinements of the linear model
    match algo {
        TaskAlgorithm::Ring => match proto {
            TaskProtocol::Ll => bus_bw * (1.0 / 5.0),
            TaskProtocol::Ll128 => (bus_bw * 120.0 / 128.0).min(LL128_MAX_BW[func.index()]),
            TaskProtocol::Simple => bus_bw,
        },
        TaskAlgorithm::Tree => {
            let bus_bw = (bus_bw * 0.27).min(if num_nodes > 1 { 70.0 } else { 90.0 });
            match proto {
                TaskProtocol::Ll => bus_bw * (1.0 / 2.3),
                TaskProtocol::Ll128 => bus_bw * (7.0 / 9.0),
                TaskProtocol::Simple => bus_bw,
            }
        }
        TaskAlgorithm::CollNet => {
            let bus_bw = bus_bw * 0.9;
            match proto {
                // GDR read is disabled on both sides
                TaskProtocol::Ll => bus_bw * (1.0 / 6.0),
                // CollNet has no LL128 implementation
                TaskProtocol::Ll128 => 0.0,
                TaskProtocol::Simple => bus_bw,
            }
        }
    }
}

fn ring_latency(
    func: TaskFuncType,
    proto: TaskProtocol,
    hw: HwClass,
    same_channels: bool,
    num_steps: usize,
) -> f32 {
    let lat = hw_latency(hw, TaskAlgorithm::Ring, proto);
    match func {
        TaskFuncType::Broadcast | TaskFuncType::Reduce if same_channels => lat,
        TaskFuncType::Broadcast | TaskFuncType::Reduce => {
            // charge a chunk latency until chunks are modeled properly
            let lat = if proto == TaskProtocol::Simple {
                hw_latency(hw, TaskAlgorithm::Tree, proto)
            } else {
                lat
            };
            num_steps as f32 * lat
        }
        _ => num_steps as f32 * lat,
    }
}

fn apply_enable_policy(
    tables: &mut PerformanceTables,
    env: &TuningEnv,
    min_comp_cap: u32,
    max_comp_cap: u32,
    graphs: &AlgoGraphs,
) -> Result<(), TuningError> {
    let proto_enable = match env.proto.as_deref() {
        Some(list) => parse_list(list, &PROTOCOL_NAMES)?.map(ProtoEnable::from),
        None => DEFAULT_PROTO_ENABLE,
    };
    let algo_enable = match env.algo.as_deref() {
        Some(list) => parse_list(list, &ALGORITHM_NAMES)?,
        None => [true; NUM_ALGORITHMS],
    };

    for algo in TaskAlgorithm::iter() {
        let graph = graphs.get(algo);
        for proto in TaskProtocol::iter() {
            let enabled = match proto_enable[proto.index()] {
                ProtoEnable::On => true,
                ProtoEnable::Off => false,
                // Other configurations are not tested and may cause silent data corruption.
                ProtoEnable::Auto => {
                    graph.type_inter <= LinkType::Pci
                        && graph.type_intra == LinkType::NvLink
                        && min_comp_cap == env.ll128_compute_cap
                        && max_comp_cap == env.ll128_compute_cap
                }
            };
            if !enabled || !algo_enable[algo.index()] {
                for func in TaskFuncType::iter() {
                    tables.bandwidths[func.index()][algo.index()][proto.index()] = 0.0;
                }
            }
        }
    }
    Ok(())
}

fn set_thread_thresholds(tables: &mut PerformanceTables, env: &TuningEnv, num_ranks: usize) {
    for row in tables.thread_thresholds.iter_mut() {
        *row = [
            LL_THREAD_THRESHOLD,
            LL128_THREAD_THRESHOLD,
            SIMPLE_THREAD_THRESHOLD,
        ];
    }
    tables.thread_thresholds[TaskAlgorithm::Ring.index()][TaskProtocol::Ll.index()] *=
        num_ranks as u64;

    if let Some(list) = env.thread_thresholds.as_deref() {
        let overrides = parse_thread_thresholds(list);
        let algos = [TaskAlgorithm::Tree, TaskAlgorithm::Ring];
        for (algo, row) in algos.iter().zip(overrides.chunks(NUM_PROTOCOLS)) {
            for (threshold, &value) in tables.thread_thresholds[algo.index()]
                .iter_mut()
                .zip(row)
            {
                if value >= 0 {
                    *threshold = value as u64;
                }
            }
        }
    }
}

/// Scan up to six integers the way `sscanf("%ld %ld ...")` does: whitespace
/// between values is optional, and scanning stops at the first position that
/// does not start an integer. Unscanned entries are left at -2.
fn parse_thread_thresholds(list: &str) -> [i64; NUM_THRESHOLD_OVERRIDES] {
    let mut values = [-2; NUM_THRESHOLD_OVERRIDES];
    let mut rest = list;
    for slot in values.iter_mut() {
        let trimmed = rest.trim_start();
        let sign_len = usize::from(trimmed.starts_with(|c| c == '+' || c == '-'));
        let digits = trimmed[sign_len..]
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len() - sign_len);
        if digits == 0 {
            break;
        }
        let end = sign_len + digits;
        match trimmed[..end].parse() {
            Ok(v) => *slot = v,
            // out of range for i64
            Err(_) => break,
        }
        rest = &trimmed[end..];
    }
    values
}
