use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use structopt::StructOpt;

use mccs_tuning::config::Config;
use mccs_tuning::tuning::{
    build_thresholds, get_task_schema, log_tuning_summary, CollInfo, PerformanceTables,
    TaskFuncType,
};

use chrono::Timelike;
use env_logger::fmt::Color;

#[derive(Debug, Clone, StructOpt)]
#[structopt(name = "mCCS Tuning")]
struct Opts {
    /// Cluster description path
    #[structopt(short, long, default_value = "mccs-tuning.toml")]
    config: PathBuf,
    /// Collective to select an algorithm for, e.g. allreduce
    #[structopt(short, long)]
    func: Option<TaskFuncType>,
    /// Message size in bytes
    #[structopt(short, long, default_value = "1048576")]
    bytes: usize,
    /// Channels available to the collective, defaults to the ring channel count
    #[structopt(long)]
    channels: Option<u32>,
}

fn main() -> Result<()> {
    better_panic::install();
    let opts = Opts::from_args();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let time = chrono::Local::now();
            let style = buf
                .style()
                .set_color(Color::Black)
                .set_intense(true)
                .clone();
            let time = format!(
                "{:02}:{:02}:{:02}.{:03}",
                time.hour() % 24,
                time.minute(),
                time.second(),
                time.timestamp_subsec_millis()
            );
            writeln!(
                buf,
                "{}{} {} {}{} {}",
                style.value("["),
                time,
                buf.default_styled_level(record.level()),
                record.module_path().unwrap_or(""),
                style.value("]"),
                record.args()
            )
        })
        .init();

    let config = Config::from_path(&opts.config)?;
    let env = config.tuning_env();
    let shape = config.comm;

    let mut tables = PerformanceTables::default();
    build_thresholds(
        &mut tables,
        &shape,
        &env,
        config.compute_cap.min,
        config.compute_cap.max,
        &config.graphs,
    )?;
    log_tuning_summary(&tables, shape.rank);

    if let Some(func) = opts.func {
        let info = CollInfo::new(&tables, func, opts.bytes);
        let channels = opts
            .channels
            .unwrap_or(config.graphs.ring.num_channels);
        let schema = get_task_schema(&info, channels)?;
        println!(
            "{:?} {} bytes: {}/{} channels={} threads={}",
            func,
            opts.bytes,
            schema.algorithm.name(),
            schema.protocol.name(),
            schema.num_channels,
            schema.num_threads
        );
    }
    Ok(())
}
