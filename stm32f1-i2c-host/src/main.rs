use clap::{Parser, Subcommand, ValueEnum};
use embedded_hal::i2c::{Error as _, ErrorKind, I2c};
use i2c_sim::{Fault, RegisterFile, SimPeripheral};
use stm32f1_i2c::{DEFAULT_RETRIES, I2cMaster, I2cMasterBuilder, I2cResult, Instance, Speed};

/// Run the STM32F1 I2C master against a simulated peripheral with one register-file slave
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Bus speed class
    #[arg(short, long, value_enum, default_value_t = BusSpeed::Standard)]
    speed: BusSpeed,
    /// Peripheral input clock (PCLK1) in MHz
    #[arg(long, default_value_t = 8)]
    pclk1_mhz: u8,
    /// I2C instance
    #[arg(long, value_enum, default_value_t = Port::I2c1)]
    port: Port,
    /// 7-bit address of the simulated slave
    #[arg(short, long, default_value = "0x50", value_parser = parse_u8)]
    device: u8,
    /// 7-bit address the transfers go to (defaults to the slave's)
    #[arg(short, long, value_parser = parse_u8)]
    address: Option<u8>,
    /// Preload the slave with `fill + n` in register n
    #[arg(long, value_parser = parse_u8)]
    fill: Option<u8>,
    /// SR1 reads before a raised flag becomes visible
    #[arg(long, default_value_t = 0)]
    latency: u32,
    /// Make the simulated bus misbehave
    #[arg(long, value_enum)]
    fault: Option<FaultKind>,
    /// Status polls after the first before a wait times out
    #[arg(short, long, default_value_t = DEFAULT_RETRIES)]
    retries: u32,
    /// Print the bus conditions seen by the simulator
    #[arg(long)]
    trace: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write one register
    Write {
        #[arg(value_parser = parse_u8)]
        register: u8,
        #[arg(value_parser = parse_u8)]
        value: u8,
    },
    /// Read consecutive registers
    Read {
        #[arg(value_parser = parse_u8)]
        register: u8,
        #[arg(default_value_t = 1)]
        count: usize,
    },
    /// Read all 256 registers
    Dump,
    /// List the addresses that acknowledge
    Scan,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum BusSpeed {
    Standard,
    Fast,
}

impl From<BusSpeed> for Speed {
    fn from(value: BusSpeed) -> Self {
        match value {
            BusSpeed::Standard => Speed::Standard,
            BusSpeed::Fast => Speed::Fast,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Port {
    I2c1,
    I2c2,
}

impl From<Port> for Instance {
    fn from(value: Port) -> Self {
        match value {
            Port::I2c1 => Instance::I2c1,
            Port::I2c2 => Instance::I2c2,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FaultKind {
    NoStart,
    AddressStall,
    DataStall,
    ArbitrationLoss,
}

impl From<FaultKind> for Fault {
    fn from(value: FaultKind) -> Self {
        match value {
            FaultKind::NoStart => Fault::NoStart,
            FaultKind::AddressStall => Fault::AddressStall,
            FaultKind::DataStall => Fault::DataStall,
            FaultKind::ArbitrationLoss => Fault::ArbitrationLoss,
        }
    }
}

fn parse_u8(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("{s}: {e}"))
}

type Master<'a> = I2cMaster<&'a mut SimPeripheral, linux_embedded_hal::Delay>;

fn run(dev: &mut Master<'_>, address: u8, command: &Command) -> I2cResult<()> {
    match *command {
        Command::Write { register, value } => {
            dev.write_register(address, register, value)?;
            log::info!("{:#04x}[{:#04x}] <- {:#04x}", address, register, value);
        }
        Command::Read { register, count } => {
            let mut buf = vec![0u8; count];
            let n = dev.read_registers(address, register, count, &mut buf)?;
            for (offset, value) in buf[..n].iter().enumerate() {
                println!(
                    "{:#04x}: {:#04x}",
                    register.wrapping_add(offset as u8),
                    value
                );
            }
        }
        Command::Dump => {
            let mut row = [0u8; 16];
            for start in (0..=0xf0u8).step_by(16) {
                dev.read_registers(address, start, row.len(), &mut row)?;
                let hex: Vec<String> = row.iter().map(|b| format!("{b:02x}")).collect();
                println!("{:02x}: {}", start, hex.join(" "));
            }
        }
        Command::Scan => {
            for candidate in 0x08..0x78 {
                match dev.write(candidate, &[]) {
                    Ok(()) => println!("{:#04x}", candidate),
                    Err(e) if matches!(e.kind(), ErrorKind::NoAcknowledge(_)) => {
                        log::debug!("{:#04x}: no answer", candidate)
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }
    Ok(())
}

fn main() {
    // Initialize the logger
    env_logger::init();
    // Parse command line arguments
    let args = Args::parse();
    // Simulated peripheral with a single register-file slave
    let mut slave = RegisterFile::new(args.device);
    if let Some(fill) = args.fill {
        let contents: Vec<u8> = (0..=255u8).map(|n| fill.wrapping_add(n)).collect();
        slave = slave.with_contents(0, &contents);
    }
    let mut sim = SimPeripheral::new(args.port.into())
        .with_target(slave)
        .with_latency(args.latency);
    sim.set_fault(args.fault.map(Fault::from));

    let result = I2cMasterBuilder::default()
        .with_speed(args.speed.into())
        .with_input_clock_mhz(args.pclk1_mhz)
        .with_retries(args.retries)
        .with_instance(args.port.into())
        .build(&mut sim, linux_embedded_hal::Delay)
        .and_then(|mut dev| {
            log::info!("Bus timing: {:?}", dev.timing());
            run(&mut dev, args.address.unwrap_or(args.device), &args.command)
        });

    if args.trace {
        for event in sim.events() {
            println!("{:?}", event);
        }
    }
    if let Err(e) = result {
        log::error!("{:?}", e);
        std::process::exit(1);
    }
}
