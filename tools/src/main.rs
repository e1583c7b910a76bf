//! sim-runner: headless simulation runner for the realm resource core.
//!
//! Usage:
//!   sim-runner --seed 12345 --ticks 60 --db run.db
//!   sim-runner --seed 12345 --ipc-mode

use anyhow::Result;
use realm_core::{
    command::PlayerCommand,
    config::SimConfig,
    engine::SimEngine,
    gateway::QueuedGateway,
    query::{RealmHolding, ResourceQueryService},
    store::{SimStore, SubmissionStatus},
    types::{resource_ids, Tick},
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Tick {
        count: u64,
    },
    Command {
        command: PlayerCommand,
    },
    Quit,
}

#[derive(serde::Serialize)]
struct UiState {
    tick: Tick,
    paused: bool,
    realms: usize,
    caravans: usize,
    pending_offloads: i64,
    settled_offloads: i64,
    rejected_offloads: i64,
    wheat_holders: Vec<RealmHolding>,
    stale_subscriptions: usize,
}

#[derive(serde::Serialize)]
struct Submitted {
    handle: String,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let ticks = parse_arg(&args, "--ticks", 60u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = str_arg(&args, "--db").unwrap_or(":memory:");
    let data_dir = str_arg(&args, "--data-dir").unwrap_or("./data");

    if !ipc_mode {
        println!("realm sim-runner");
        println!("  seed:      {seed}");
        println!("  ticks:     {ticks}");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!();
    }

    let config = SimConfig::load(data_dir).unwrap_or_else(|e| {
        log::warn!("{e}; using default configuration");
        SimConfig::default()
    });

    let store = if db == ":memory:" {
        SimStore::in_memory()?
    } else {
        SimStore::open(db)?
    };
    store.migrate()?;

    let run_id = format!("run-{seed}-{}", chrono::Utc::now().format("%Y%m%dT%H%M%S"));
    store.insert_run(&run_id, seed, env!("CARGO_PKG_VERSION"))?;

    let mut engine = SimEngine::build(run_id.clone(), seed, store, &config);

    if ipc_mode {
        run_ipc_loop(&mut engine, &run_id)?;
    } else {
        engine.run_ticks(ticks)?;
        print_summary(&engine, &run_id, ticks)?;
    }

    Ok(())
}

fn run_ipc_loop(engine: &mut SimEngine, run_id: &str) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Tick { count } => {
                engine.run_ticks(count)?;
                let state = build_ui_state(engine, run_id)?;
                writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
            }
            IpcCommand::GetState => {
                let state = build_ui_state(engine, run_id)?;
                writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
            }
            IpcCommand::Command { command } => {
                match handle_command(engine, run_id, command) {
                    Ok(Some(submitted)) => {
                        writeln!(stdout, "{}", serde_json::to_string(&submitted)?)?
                    }
                    Ok(None) => {
                        let state = build_ui_state(engine, run_id)?;
                        writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
                    }
                    Err(e) => {
                        let err_json = serde_json::json!({ "error": e.to_string() });
                        writeln!(stdout, "{}", err_json)?;
                    }
                }
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(
    engine: &mut SimEngine,
    run_id: &str,
    command: PlayerCommand,
) -> Result<Option<Submitted>> {
    match command {
        PlayerCommand::Pause => engine.clock.pause(),
        PlayerCommand::Resume => engine.clock.resume(),
        PlayerCommand::SetSpeed { speed } => engine.clock.set_speed(speed),
        PlayerCommand::RequestOffload { signer, receiver, sender, indices } => {
            let gateway = QueuedGateway::new(engine.store(), run_id.to_string());
            let service = ResourceQueryService::new(engine.store(), &gateway);
            let handle = service.request_offload(&signer, receiver, sender, &indices)?;
            return Ok(Some(Submitted { handle: handle.0 }));
        }
    }
    Ok(None)
}

fn build_ui_state(engine: &SimEngine, run_id: &str) -> Result<UiState> {
    let store = engine.store();
    let gateway = QueuedGateway::new(store, run_id.to_string());
    let service = ResourceQueryService::new(store, &gateway);
    let (realms, caravans) = engine
        .seeded_world()
        .map_or((0, 0), |w| (w.realms.len(), w.caravans.len()));

    Ok(UiState {
        tick: engine.clock.current_tick,
        paused: engine.clock.paused,
        realms,
        caravans,
        pending_offloads: store.submission_count(run_id, SubmissionStatus::Pending)?,
        settled_offloads: store.submission_count(run_id, SubmissionStatus::Settled)?,
        rejected_offloads: store.submission_count(run_id, SubmissionStatus::Rejected)?,
        wheat_holders: service.realms_above_threshold(
            resource_ids::WHEAT,
            0,
            engine.clock.current_tick,
        )?,
        stale_subscriptions: engine.stale_subscriptions().len(),
    })
}

fn print_summary(engine: &SimEngine, run_id: &str, ticks: u64) -> Result<()> {
    let store = engine.store();
    let tick = engine.clock.current_tick;
    let gateway = QueuedGateway::new(store, run_id.to_string());
    let service = ResourceQueryService::new(store, &gateway);

    println!("=== RUN SUMMARY ===");
    println!("  run_id:         {run_id}");
    println!("  ticks run:      {ticks}");
    println!("  final tick:     {tick}");
    if let Some(world) = engine.seeded_world() {
        println!("  realms:         {}", world.realms.len());
        println!("  banks:          {}", world.banks.len());
        println!("  caravans:       {}", world.caravans.len());
    }
    println!(
        "  offloads:       {} settled, {} rejected, {} pending",
        store.submission_count(run_id, SubmissionStatus::Settled)?,
        store.submission_count(run_id, SubmissionStatus::Rejected)?,
        store.submission_count(run_id, SubmissionStatus::Pending)?,
    );
    println!("  chests packed:  {}", store.event_count(run_id, "chest_packed")?);
    println!("  chests emptied: {}", store.event_count(run_id, "chest_offloaded")?);

    println!();
    println!("=== FOOD BY REALM (tick {tick}) ===");
    let Some(world) = engine.seeded_world() else {
        println!("  (no world seeded)");
        return Ok(());
    };
    for &realm in &world.realms {
        let [wheat, fish] = service.food_balances(realm, tick)?;
        println!("  {realm:>40} | wheat {:>8} | fish {:>8}", wheat.amount, fish.amount);
    }
    Ok(())
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    str_arg(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
