//! Command line light source simulator
#![forbid(unsafe_code)]

use {
    clap::Parser,
    std::{
        io::{ErrorKind, IsTerminal, Write as _},
        time::Instant,
    },
    tracing_subscriber::EnvFilter,
    varistar::{
        CHANNEL_COUNT, Lightbox, Registry, TICK_SECONDS,
        entropy::{ClockSkewMixer, DEFAULT_SEED, EntropySource, SeededEntropy},
        hw::{MemoryStore, PwmBoard},
        link::{self, FrameParser, PacketKind, Reply, SelectPayload},
    },
};

#[derive(clap::Parser)]
struct Args {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(clap::Subcommand)]
enum Cmd {
    /// List the built-in profiles
    List,
    /// Run a profile, writing the PWM compare values of every tick to stdout
    Run {
        /// 1-based profile index (out of range selects profile 1)
        index: u8,
        /// Number of ticks to run
        #[arg(short = 'n', long, default_value = "1000")]
        ticks: u32,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Csv)]
        format: Format,
        /// Where cloud randomness comes from
        #[arg(short, long, value_enum, default_value_t = Source::Seeded)]
        entropy: Source,
        /// Seed for the seeded entropy source
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
    },
    /// Talk to a simulated device over the serial link: list its profiles, optionally select one
    Query {
        /// Profile to select after listing
        #[arg(short, long)]
        select: Option<u8>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Format {
    /// One line of comma separated values per tick
    Csv,
    /// Little endian u16 compare values, 4 per tick
    Raw,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Source {
    /// Reproducible pseudo-random sequence
    Seeded,
    /// Skew between the tick loop and the host's monotonic clock
    ClockSkew,
}

type Device<E> = Lightbox<E, PwmBoard, MemoryStore>;

fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    let registry = Registry::builtin().map_err(std::io::Error::other)?;
    match args.cmd {
        Cmd::List => list(&registry),
        Cmd::Run {
            index,
            ticks,
            format,
            entropy,
            seed,
        } => match entropy {
            Source::Seeded => {
                let mut dev = device(registry, SeededEntropy::new(seed));
                run(&mut dev, index, ticks, format, || {})
            }
            Source::ClockSkew => {
                let mixer = ClockSkewMixer::new();
                let start = Instant::now();
                let mut dev = device(registry, &mixer);
                run(&mut dev, index, ticks, format, || {
                    mixer.harvest(start.elapsed().subsec_nanos().to_le_bytes()[0]);
                })
            }
        },
        Cmd::Query { select } => query(registry, select),
    }
}

fn device<E: EntropySource>(registry: Registry, entropy: E) -> Device<E> {
    Lightbox::new(registry, entropy, PwmBoard::default(), MemoryStore::default())
}

fn list(registry: &Registry) -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();
    for (id, profile) in registry.iter() {
        writeln!(out, "{id}: {} ({} ms)", profile.name, profile.exptime_ms)?;
        writeln!(out, "    {}", profile.desc)?;
    }
    Ok(())
}

fn run<E: EntropySource>(
    dev: &mut Device<E>,
    index: u8,
    ticks: u32,
    format: Format,
    mut harvest: impl FnMut(),
) -> std::io::Result<()> {
    let mut writer = std::io::stdout().lock();
    if matches!(format, Format::Raw) && writer.is_terminal() {
        return Err(std::io::Error::other(
            "Refusing to write raw compare values to a terminal",
        ));
    }
    let selected = dev.select(index);
    tracing::debug!(requested = index, selected, ticks, "starting run");
    let mut stderr = std::io::stderr().lock();
    if let Some(profile) = dev.registry().get(selected) {
        writeln!(stderr, "Running profile {selected}: {}", profile.name)?;
    }
    if matches!(format, Format::Csv) {
        write!(writer, "tick,time")?;
        for ch in 0..CHANNEL_COUNT {
            write!(writer, ",ch{ch}")?;
        }
        writeln!(writer)?;
    }
    for tick in 1..=ticks {
        harvest();
        dev.tick();
        let result = match format {
            Format::Csv => write_csv(&mut writer, tick, &dev.hw.compare),
            Format::Raw => writer.write_all(bytemuck::cast_slice(&dev.hw.compare[..])),
        };
        if let Err(e) = result {
            match e.kind() {
                ErrorKind::BrokenPipe => break,
                _ => return Err(e),
            }
        }
    }
    writer.flush()
}

fn write_csv(
    writer: &mut impl std::io::Write,
    tick: u32,
    compare: &[u16; CHANNEL_COUNT],
) -> std::io::Result<()> {
    write!(writer, "{tick},{:.5}", f64::from(tick) * TICK_SECONDS)?;
    for c in compare {
        write!(writer, ",{c}")?;
    }
    writeln!(writer)
}

fn query(registry: Registry, select: Option<u8>) -> std::io::Result<()> {
    let mut dev = device(registry, SeededEntropy::default());
    dev.boot();
    // The boot notification isn't part of the conversation
    dev.take_output();

    let mut request = Vec::new();
    link::encode_frame(PacketKind::RequestProfiles, &[], &mut request);
    if let Some(id) = select {
        link::encode_frame(
            PacketKind::SetProfile,
            bytemuck::bytes_of(&SelectPayload { id }),
            &mut request,
        );
    }
    dev.receive(&request);

    let mut out = std::io::stdout().lock();
    let mut parser = FrameParser::default();
    for b in dev.take_output() {
        let Some(frame) = parser.push(b) else {
            continue;
        };
        match frame.and_then(|f| f.decode()) {
            Ok(Reply::Message(text)) => writeln!(out, "Message: {text}")?,
            Ok(Reply::Count(count)) => writeln!(
                out,
                "Device has {} profiles. Profile {} is active",
                count.total, count.active
            )?,
            Ok(Reply::Descriptor(d)) => {
                writeln!(out, "Profile {}: {}", d.id, d.name)?;
                writeln!(out, "    Exposure time: {} ms", d.exptime_ms)?;
                writeln!(out, "    {}", d.desc)?;
            }
            Ok(Reply::Selected(id)) => writeln!(out, "Selected profile {id}")?,
            Ok(other) => writeln!(out, "Unexpected reply: {other:?}")?,
            Err(e) => writeln!(out, "Error: {e}")?,
        }
    }
    Ok(())
}
