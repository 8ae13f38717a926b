use clap::Parser;
use rv32i_sim::config::{self, CsrClearMode, MachineConfig};
use rv32i_sim::{Machine, debug, loader};
use std::io::Write;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(version, about = "RV32I instruction-set simulator")]
struct Args {
    /// Program image: a flat binary or a 32-bit RISC-V ELF
    image: String,

    /// DRAM size in bytes
    #[arg(long, default_value_t = config::DEFAULT_DRAM_SIZE)]
    dram_size: u32,

    /// DRAM base address
    #[arg(long, value_parser = parse_addr, default_value = "0x80000000")]
    dram_base: u32,

    /// UART output address
    #[arg(long, value_parser = parse_addr, default_value = "0x10000000")]
    uart_addr: u32,

    /// Instructions per batch between output flushes
    #[arg(long, default_value_t = config::DEFAULT_BATCH_SIZE)]
    batch_size: u32,

    /// Stop after N instructions (0 = run forever)
    #[arg(long, default_value_t = 0)]
    max_ticks: u64,

    /// Make csrrc/csrrci clear bits (AND-NOT) instead of ANDing them
    #[arg(long, default_value_t = false)]
    standard_csrrc: bool,

    /// Bytes the guest can read back from the UART address
    #[arg(long)]
    input: Option<String>,

    /// Enable instruction trace
    #[arg(long, default_value_t = false)]
    trace: bool,
}

fn parse_addr(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address {s:?}: {e}"))
}

/// Print every UART line completed since the last flush.
/// Print the lines the guest finished since the last call. When the run is over the
/// open line is printed too, unless nothing was written to it.
fn flush_lines(machine: &mut Machine, finished: bool) -> std::io::Result<()> {
    let uart = machine.uart_mut();
    let mut lines = uart.take_completed();
    if finished && !uart.open_line().is_empty() {
        lines.push(uart.open_line().to_owned());
    }
    let mut out = std::io::stdout().lock();
    for line in &lines {
        writeln!(out, "{line}")?;
    }
    out.flush()
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();
    debug::logging_setup(args.trace);

    let config = MachineConfig {
        dram_base: args.dram_base,
        dram_size: args.dram_size,
        uart_addr: args.uart_addr,
        batch_size: args.batch_size,
        csrrc_mode: if args.standard_csrrc {
            CsrClearMode::Standard
        } else {
            CsrClearMode::Literal
        },
    };
    config.validate()?;

    let image = loader::load_image(&args.image, &config)?;
    let mut machine = Machine::new(config, image)?;
    if let Some(input) = &args.input {
        machine.uart_mut().push_input(input.as_bytes());
    }

    loop {
        let result = match args.max_ticks {
            0 => machine.run_batch_default(),
            max => {
                let left = max.saturating_sub(machine.ticks());
                if left == 0 {
                    flush_lines(&mut machine, true)?;
                    tracing::info!("stopped after {} ticks", machine.ticks());
                    return Ok(ExitCode::SUCCESS);
                }
                machine.run_batch(left.min(machine.config().batch_size as u64) as u32)
            }
        };

        match result {
            Ok(_) => flush_lines(&mut machine, false)?,
            Err(trap) => {
                flush_lines(&mut machine, true)?;
                eprintln!("CPU halted: {trap}");
                return Ok(ExitCode::FAILURE);
            }
        }
    }
}
