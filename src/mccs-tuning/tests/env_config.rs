//! Loading tuning knobs from the process environment.
//!
//! Every test mutates process-wide variables, so they run serially.

use mccs_tuning::comm::CommShape;
use mccs_tuning::config::{
    TuningEnv, ENV_ALGO, ENV_LL128_NTHREADS, ENV_NTHREADS, ENV_PROTO, ENV_THREAD_THRESHOLDS,
    KNOB_UNSET,
};
use mccs_tuning::topo::{AlgoGraphs, LinkType, TopoGraph};
use mccs_tuning::tuning::{
    build_thresholds, PerformanceTables, TaskAlgorithm, TaskFuncType, TaskProtocol,
};
use serial_test::serial;
use temp_env::{with_vars, with_vars_unset};

const ALL_VARS: [&str; 5] = [
    ENV_NTHREADS,
    ENV_LL128_NTHREADS,
    ENV_PROTO,
    ENV_ALGO,
    ENV_THREAD_THRESHOLDS,
];

#[test]
#[serial(mccs_env)]
fn unset_environment_is_default() {
    with_vars_unset(ALL_VARS, || {
        assert_eq!(TuningEnv::from_env(), TuningEnv::default());
    });
}

#[test]
#[serial(mccs_env)]
fn environment_knobs_are_loaded() {
    with_vars(
        [
            (ENV_NTHREADS, Some("256")),
            (ENV_LL128_NTHREADS, Some("not-a-number")),
            (ENV_PROTO, Some("^LL128")),
            (ENV_ALGO, Some("ring,tree")),
            (ENV_THREAD_THRESHOLDS, Some("1000 2000 3000 4000 5000 6000")),
        ],
        || {
            let env = TuningEnv::from_env();
            assert_eq!(env.nthreads, 256);
            assert_eq!(env.ll128_nthreads, KNOB_UNSET);
            assert_eq!(env.proto.as_deref(), Some("^LL128"));
            assert_eq!(env.algo.as_deref(), Some("ring,tree"));
        },
    );
}

#[test]
#[serial(mccs_env)]
fn environment_drives_table_construction() {
    let graph = TopoGraph {
        num_channels: 2,
        speed_intra: 20.0,
        speed_inter: 12.0,
        type_intra: LinkType::NvLink,
        type_inter: LinkType::Net,
        same_channels: true,
    };
    let graphs = AlgoGraphs {
        tree: graph.clone(),
        ring: graph.clone(),
        collnet: graph,
    };
    with_vars(
        [
            (ENV_NTHREADS, Some("256")),
            (ENV_LL128_NTHREADS, None),
            (ENV_PROTO, None),
            (ENV_ALGO, Some("Ring")),
            (ENV_THREAD_THRESHOLDS, None),
        ],
        || {
            let env = TuningEnv::from_env();
            let mut tables = PerformanceTables::default();
            build_thresholds(&mut tables, &CommShape::new(0, 16, 2), &env, 80, 80, &graphs)
                .unwrap();
            assert_eq!(tables.max_threads(TaskAlgorithm::Ring, TaskProtocol::Simple), 256);
            assert_eq!(
                tables.bandwidth(TaskFuncType::AllReduce, TaskAlgorithm::Tree, TaskProtocol::Simple),
                0.0
            );
            assert!(
                tables.bandwidth(TaskFuncType::AllReduce, TaskAlgorithm::Ring, TaskProtocol::Simple)
                    > 0.0
            );
        },
    );
}
