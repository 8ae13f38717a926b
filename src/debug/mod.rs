use crate::cpu::Cpu;
use tracing_subscriber::EnvFilter;

pub fn trace(cpu: &Cpu, inst: u32) {
    tracing::trace!(
        "[{:08}] pc=0x{:08x} inst=0x{:08x} ra=0x{:08x} sp=0x{:08x} a0=0x{:08x} a1=0x{:08x}",
        cpu.ticks,
        cpu.prev_pc,
        inst,
        cpu.regs.read(1),
        cpu.regs.read(2),
        cpu.regs.read(10),
        cpu.regs.read(11)
    );
}

/// Install a stderr subscriber. `RUST_LOG` wins unless `trace` forces the
/// simulator's own events to the `trace` level.
pub fn logging_setup(trace: bool) {
    let filter = if trace {
        EnvFilter::new("rv32i_sim=trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
