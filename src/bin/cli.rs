use clap::{App, Arg, SubCommand};
use knx_msgbuf::{
    buffers::{MessagePool, MessagePoolConfig, SLOT_RECORD_LEN},
    error::MsgError,
    frame::{Frame, FrameKind, PollingFrame, PropertyFrame, StandardFrame, MSG_LEN},
    Result,
};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Barrier,
    },
    thread,
    time::{Duration, Instant},
};

fn main() -> Result<()> {
    env_logger::init();

    let matches = App::new("knxmsg-cli")
        .version(env!("CARGO_PKG_VERSION"))
        .about("KNX message buffer pool inspection tool")
        .subcommand(
            SubCommand::with_name("demo")
                .about("Run an allocate/post/get/release cycle and dump the pool")
                .arg(
                    Arg::with_name("sap")
                        .short("s")
                        .long("sap")
                        .value_name("SAP")
                        .help("Service access point to post to")
                        .default_value("2")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("count")
                        .short("c")
                        .long("count")
                        .value_name("COUNT")
                        .help("Number of buffers to post")
                        .default_value("3")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("layout")
                .about("Show the byte layout of the frame variants")
                .arg(
                    Arg::with_name("kind")
                        .short("k")
                        .long("kind")
                        .value_name("KIND")
                        .help("standard, property or polling")
                        .default_value("standard")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("stress")
                .about("Hammer one pool from several threads")
                .arg(
                    Arg::with_name("threads")
                        .short("t")
                        .long("threads")
                        .value_name("THREADS")
                        .help("Number of worker threads")
                        .default_value("8")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("operations")
                        .short("o")
                        .long("operations")
                        .value_name("OPS")
                        .help("Allocate/release cycles per thread")
                        .default_value("10000")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("timeout")
                        .long("timeout-ms")
                        .value_name("MS")
                        .help("Blocking allocation timeout")
                        .default_value("100")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("info")
                .about("Show version and build information"),
        )
        .get_matches();

    match matches.subcommand() {
        ("demo", Some(demo_matches)) => run_demo(demo_matches),
        ("layout", Some(layout_matches)) => show_layout(layout_matches),
        ("stress", Some(stress_matches)) => run_stress(stress_matches),
        ("info", Some(_)) => show_info(),
        _ => {
            println!("Use --help for usage information");
            Ok(())
        }
    }
}

fn parse_arg<T: std::str::FromStr>(matches: &clap::ArgMatches, name: &str) -> Result<T> {
    matches
        .value_of(name)
        .unwrap_or_default()
        .parse()
        .map_err(|_| MsgError::invalid_parameter(name, "Invalid number"))
}

fn run_demo(matches: &clap::ArgMatches) -> Result<()> {
    let sap: u8 = parse_arg(matches, "sap")?;
    let count: usize = parse_arg(matches, "count")?;

    let pool = MessagePool::new(MessagePoolConfig::new("demo"))?;
    pool.init();

    let mut posted = 0;
    for i in 0..count {
        let buffer = match pool.allocate() {
            Ok(buffer) => buffer,
            Err(e) => {
                println!("allocate #{}: {}", i, e);
                break;
            }
        };
        let frame = StandardFrame::new(0xbc, 0x1101, 0x0900 + i as u16)
            .with_control(0xe1, 0x00, 0x80)
            .with_data(&[i as u8])?;
        pool.write_frame(buffer, &Frame::from(frame))?;
        pool.set_sap(buffer, sap)?;
        pool.set_len(buffer, 9);
        pool.set_routing_count(buffer);
        pool.post(buffer)?;
        posted += 1;
    }

    let counters = pool.counters();
    println!("Posted {} buffers (free: {}, used: {})", posted, counters.free, counters.used);
    print_dump(&pool);

    while let Some(buffer) = pool.get(sap) {
        if let Frame::Standard(frame) = pool.read_frame(buffer, FrameKind::Standard)? {
            println!(
                "  got slot {}: {:04x} -> {:04x} data[0]={:02x} hops={}",
                buffer.slot(),
                frame.source,
                frame.dest,
                frame.data[0],
                pool.routing_count(buffer).unwrap_or_default()
            );
        }
        pool.release(buffer)?;
    }

    println!("\n{}", pool.stats().summary());
    pool.deinit();
    Ok(())
}

fn print_dump(pool: &MessagePool) {
    let dump = pool.dump();
    println!("Slots (free head: {:#04x}, posted: {:?}):", dump.free_head, dump.posted);
    for (idx, slot) in dump.slots.iter().enumerate() {
        let record = slot.to_bytes();
        let hex: Vec<String> = record.iter().map(|b| format!("{:02x}", b)).collect();
        println!("  [{}] {:<9} {}", idx, format!("{:?}", slot.state), hex.join(" "));
    }
}

fn show_layout(matches: &clap::ArgMatches) -> Result<()> {
    let kind = matches.value_of("kind").unwrap_or("standard");
    let frame: Frame = match kind {
        "standard" => StandardFrame::new(0xbc, 0x1102, 0x0a0b)
            .with_control(0xe3, 0x00, 0x80)
            .with_data(&[0x01, 0x02, 0x03])?
            .into(),
        "property" => PropertyFrame::new(0xb0, 0x1101, 0x1102)
            .with_control(0x65, 0x42, 0xd5)
            .with_property(0x00, 0x0e, 0x10, 0x01)
            .with_data(&[0xaa, 0xbb])?
            .into(),
        "polling" => PollingFrame::new(0xf0, 0x1101, 0x1234)
            .with_slots(&[0x01, 0x02])?
            .into(),
        other => {
            return Err(MsgError::invalid_parameter(
                "kind",
                format!("Unknown frame kind '{}'", other),
            ))
        }
    };

    let raw = frame.to_raw();
    println!("{:?} frame ({} bytes, slot record {} bytes):", frame.kind(), MSG_LEN, SLOT_RECORD_LEN);
    for (offset, byte) in raw.as_bytes().iter().enumerate() {
        println!("  {:2}: {:02x}", offset, byte);
    }
    println!("{:#?}", frame);
    Ok(())
}

fn run_stress(matches: &clap::ArgMatches) -> Result<()> {
    let threads: usize = parse_arg(matches, "threads")?;
    let operations: usize = parse_arg(matches, "operations")?;
    let timeout_ms: u64 = parse_arg(matches, "timeout")?;

    let config = MessagePoolConfig::new("stress")
        .with_timeout(Some(Duration::from_millis(timeout_ms)));
    let pool = Arc::new(MessagePool::new(config)?);
    pool.init();

    println!("Stressing pool with {} threads x {} operations...", threads, operations);

    let barrier = Arc::new(Barrier::new(threads));
    let timeouts = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let barrier = Arc::clone(&barrier);
            let timeouts = Arc::clone(&timeouts);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..operations {
                    match pool.allocate_blocking() {
                        Some(buffer) => {
                            let _ = pool.release(buffer);
                        }
                        None => {
                            timeouts.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        if handle.join().is_err() {
            return Err(MsgError::invalid_parameter("threads", "Worker thread panicked"));
        }
    }

    let elapsed = start.elapsed();
    pool.verify();
    let total = threads * operations;
    println!("\nResults:");
    println!("  Total time: {}ms", elapsed.as_millis());
    println!("  Operations/sec: {:.0}", total as f64 / elapsed.as_secs_f64());
    println!("  Timeouts: {}", timeouts.load(Ordering::Relaxed));
    println!("  {}", pool.stats().summary());
    Ok(())
}

fn show_info() -> Result<()> {
    println!("knx-msgbuf v{}", knx_msgbuf::VERSION);
    println!("Buffers per pool: {}", knx_msgbuf::NUM_BUFFERS);
    println!("Frame payload: {} bytes", MSG_LEN);
    println!("Slot record: {} bytes", SLOT_RECORD_LEN);

    #[cfg(feature = "c-api")]
    println!("C API: enabled");
    #[cfg(not(feature = "c-api"))]
    println!("C API: disabled");

    Ok(())
}
