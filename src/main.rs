use devsim::{
    Architecture, CoupledDescriptor, DevsResult, EventSink, EventSource, RecorderModel,
    RunParameters, SimTime, TicModel, TimeUnit,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("═══════════════════════════════════════════════════════");
    println!("  devsim: hierarchical DEVS Kernel");
    println!("  Tic / recorder demo with replay verification");
    println!("═══════════════════════════════════════════════════════");
    println!();

    let run1 = match run_simulation("Run 1") {
        Ok(trace) => trace,
        Err(e) => {
            eprintln!("  ✗ Run 1 failed: {}", e);
            std::process::exit(1);
        }
    };
    let run2 = match run_simulation("Run 2") {
        Ok(trace) => trace,
        Err(e) => {
            eprintln!("  ✗ Run 2 failed: {}", e);
            std::process::exit(1);
        }
    };

    println!("  Verification:");
    if run1 == run2 {
        println!("    ✓ Traces are IDENTICAL ({} transitions).", run1.len());
    } else {
        println!("    ✗ MISMATCH: determinism violation detected!");
    }
}

fn build() -> DevsResult<Architecture> {
    let mut arch = Architecture::with_time_unit(TimeUnit::Seconds);
    arch.add_coupled_model_as_root(
        CoupledDescriptor::new("demo")
            .with_submodel("fast")
            .with_submodel("slow")
            .with_submodel("sink")
            .connect(EventSource::new("fast", "tic"), EventSink::new("sink", "fast_tic"))
            .connect(EventSource::new("slow", "tic"), EventSink::new("sink", "slow_tic")),
    )?;
    arch.add_atomic_model(TicModel::descriptor("fast", TimeUnit::Seconds))?;
    arch.add_atomic_model(TicModel::descriptor("slow", TimeUnit::Seconds))?;
    arch.add_atomic_model(RecorderModel::descriptor(
        "sink",
        TimeUnit::Seconds,
        ["fast_tic", "slow_tic"],
    ))?;
    arch.declare_priority("slow_tic", "fast_tic");
    Ok(arch)
}

fn run_simulation(label: &str) -> DevsResult<Vec<String>> {
    let arch = build()?;
    let mut sim = arch.construct_simulator()?;
    sim.set_run_parameters(&RunParameters::new().with("slow", "period", 3i64))?;
    let report = sim.run_standalone(SimTime::ZERO, SimTime::new(9))?;

    println!("  {}: {} steps, {} transitions", label, sim.steps(), sim.trace().len());
    for entry in sim.trace() {
        println!("    {}", entry);
    }
    println!("  Final report:");
    for line in report.to_string().lines() {
        println!("    {}", line);
    }
    println!();

    Ok(sim.trace().iter().map(ToString::to_string).collect())
}
