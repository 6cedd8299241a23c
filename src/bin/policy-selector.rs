//! Query the device-aware policy selector from the shell.
//!
//! Grounded on `policy_selector_cli.cpp`: parse a workload and a storage
//! class, print the recommended policy and build config, or dump the
//! whole decision matrix with `--print-matrix`.

use clap::Parser;
use treecache::{select_policy, StorageDeviceType, WorkloadType};

/// Print the cache policy recommended for a given workload/storage pair.
#[derive(Parser, Debug)]
#[command(name = "policy-selector", version, about)]
struct Args {
    /// YCSB workload type (ycsb_a, ycsb_b, ycsb_c, ycsb_d, ycsb_e, ycsb_f)
    #[arg(long)]
    workload: Option<String>,

    /// Storage device type (VolatileStorage, PMemStorage, FileStorage, IOURingStorage)
    #[arg(long)]
    storage: Option<String>,

    /// Print detailed information including rationale and config flags
    #[arg(short, long)]
    verbose: bool,

    /// Print the entire decision matrix and exit
    #[arg(long)]
    print_matrix: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if args.print_matrix {
        print!("{}", treecache::selector::render_decision_matrix());
        return;
    }

    let (Some(workload_str), Some(storage_str)) = (&args.workload, &args.storage) else {
        eprintln!("Error: both --workload and --storage are required (or pass --print-matrix)");
        std::process::exit(1);
    };

    let workload: WorkloadType = workload_str.parse().unwrap_or(WorkloadType::Unknown);
    let storage: StorageDeviceType = storage_str.parse().unwrap_or(StorageDeviceType::Unknown);

    if workload == WorkloadType::Unknown {
        eprintln!("Error: unknown workload type: {workload_str}");
        eprintln!("Valid types: ycsb_a, ycsb_b, ycsb_c, ycsb_d, ycsb_e, ycsb_f");
        std::process::exit(1);
    }
    if storage == StorageDeviceType::Unknown {
        eprintln!("Error: unknown storage type: {storage_str}");
        eprintln!("Valid types: VolatileStorage, PMemStorage, FileStorage, IOURingStorage");
        std::process::exit(1);
    }

    let config = select_policy(workload, storage);

    if args.verbose {
        println!("Workload: {workload}");
        println!("Storage: {storage}");
        println!("Policy: {}", config.policy_name());
        println!("Config: {}", config.build_config);
        println!("Rationale: {}", config.selection_rationale);
        println!();
        println!("Configuration Flags:");
        println!("  Concurrent: {}", yes_no(config.enable_concurrent));
        println!("  Selective Update: {}", yes_no(config.enable_selective_update));
        println!("  Update In Order: {}", yes_no(config.enable_update_in_order));
        println!("  Manage Ghost Queue: {}", yes_no(config.enable_manage_ghost_q));
        println!("  CLOCK with Buffer: {}", yes_no(config.enable_clock_with_buffer));
    } else {
        println!("{},{}", config.policy_name(), config.build_config);
    }
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}
