//! Combat simulator CLI.
//!
//! Runs the built-in demo loadout (a fire caster with a nuke, a cooldown
//! blast, and a crit-driven rollover burn) through the Monte Carlo harness.
//!
//! Usage:
//!   cargo run --bin simulate -- [OPTIONS]
//!
//! Examples:
//!   cargo run --bin simulate                    # Default: 1000 iterations, 60s
//!   cargo run --bin simulate -- -n 100 -d 120   # 100 iterations of 120s
//!   cargo run --bin simulate -- --seed 42 --log # Reproducible run with a log

use std::env;
use std::rc::Rc;

use raidsim::core::{
    ActionId, AuraConfig, CastConfig, Cooldown, DotConfig, OutcomeFilter, OutcomeRule,
    ProcCallback, ProcTriggerConfig, SchoolMask, SimTime, Simulation, SpellConfig, SpellFlags,
    StatBlock, UnitConfig, GCD_DEFAULT,
};
use raidsim::simulator::{run_simulation, SimConfig, SimReport};

fn main() {
    let args: Vec<String> = env::args().collect();
    let config = parse_args(&args);

    println!("╔═══════════════════════════════════════════════════════════════╗");
    println!("║                    RAIDSIM COMBAT SIMULATOR                   ║");
    println!("╚═══════════════════════════════════════════════════════════════╝");
    println!();
    println!("Configuration:");
    println!("  Iterations:     {}", config.iterations);
    println!("  Duration:       {:.0}s", config.duration_secs);
    println!("  Targets:        {}", config.num_targets);
    println!("  Seed:           {}", config.seed);
    println!();
    println!("Running simulation...");
    println!();

    let result = run_simulation(&config, &demo_loadout);
    if let Some(error) = &result.error {
        eprintln!("Simulation failed: {error}");
        std::process::exit(1);
    }

    let report = SimReport::from_result(&config, &result);
    println!("{}", report.to_text());

    if config.log_enabled {
        println!("── COMBAT LOG (last iteration) ─────────────────────────────────");
        for line in &result.logs {
            println!("{line}");
        }
    }

    if args.iter().any(|a| a == "--json") {
        match report.to_json() {
            Ok(json) => {
                let filename = "sim_report.json";
                if let Err(e) = std::fs::write(filename, json) {
                    eprintln!("Failed to write JSON report: {e}");
                } else {
                    println!("JSON report saved to: {filename}");
                }
            }
            Err(e) => eprintln!("{e}"),
        }
    }
}

/// A self-contained fire-caster build exercising most of the engine: a cast
/// time nuke, a cooldown-gated instant, and a crit-triggered periodic whose
/// refresh rolls undelivered damage forward.
fn demo_loadout(sim: &mut Simulation) {
    let player = sim.add_player(UnitConfig {
        name: "Pyromancer".into(),
        base_mana: 20_000.0,
        stats: StatBlock {
            spell_power: 2500.0,
            spell_crit: 0.25,
            cast_speed: 1.1,
            ..Default::default()
        },
        ..Default::default()
    });

    let burn = sim.register_spell(
        player,
        SpellConfig {
            action_id: ActionId::new(3),
            name: "Searing Burn".into(),
            school: SchoolMask::FIRE,
            flags: SpellFlags::IGNORE_MODIFIERS,
            dot: Some(DotConfig::new(
                AuraConfig::new("Searing Burn"),
                2,
                SimTime::from_secs(2),
            )),
            ..Default::default()
        },
    );

    let fireball = sim.register_spell(
        player,
        SpellConfig {
            action_id: ActionId::new(1),
            name: "Fireball".into(),
            school: SchoolMask::FIRE,
            mana_cost: 0.09,
            cast: CastConfig {
                gcd: GCD_DEFAULT,
                cast_time: SimTime::from_millis(2500),
                ..Default::default()
            },
            bonus_coefficient: 1.0,
            apply_effects: Some(Rc::new(|sim, target, spell| {
                let base = sim.roll(900.0, 1100.0, "Fireball");
                sim.calc_and_deal_damage(spell, target, base, OutcomeRule::MagicHitAndCrit);
            })),
            ..Default::default()
        },
    );

    let blast_timer = sim.new_timer(player);
    let fire_blast = sim.register_spell(
        player,
        SpellConfig {
            action_id: ActionId::new(2),
            name: "Fire Blast".into(),
            school: SchoolMask::FIRE,
            mana_cost: 0.07,
            cast: CastConfig {
                gcd: GCD_DEFAULT,
                cooldown: Some(Cooldown {
                    timer: blast_timer,
                    duration: SimTime::from_secs(8),
                }),
                ..Default::default()
            },
            bonus_coefficient: 0.4,
            apply_effects: Some(Rc::new(|sim, target, spell| {
                let base = sim.roll(750.0, 950.0, "Fire Blast");
                sim.calc_and_deal_damage(spell, target, base, OutcomeRule::MagicHitAndCrit);
            })),
            ..Default::default()
        },
    );

    // Crits roll 40% of their damage into the burn.
    sim.make_proc_trigger_aura(
        player,
        ProcTriggerConfig {
            outcome: OutcomeFilter::Crit,
            ..ProcTriggerConfig::new(
                "Searing Flames",
                ProcCallback::SPELL_HIT_DEALT,
                Rc::new(move |sim, _spell, result| {
                    if let Some(result) = result {
                        sim.dot_refresh_with_damage(burn, result.target, result.damage * 0.4);
                    }
                }),
            )
        },
    );

    sim.set_rotation(
        player,
        Rc::new(move |sim, _unit| {
            let target = sim.primary_target();
            if sim.cast(fire_blast, target) {
                return None;
            }
            sim.cast(fireball, target);
            None
        }),
    );
}

fn parse_args(args: &[String]) -> SimConfig {
    let mut config = SimConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-n" | "--iterations" => {
                if i + 1 < args.len() {
                    config.iterations = args[i + 1].parse().unwrap_or(1000);
                    i += 1;
                }
            }
            "-d" | "--duration" => {
                if i + 1 < args.len() {
                    config.duration_secs = args[i + 1].parse().unwrap_or(60.0);
                    i += 1;
                }
            }
            "-t" | "--targets" => {
                if i + 1 < args.len() {
                    config.num_targets = args[i + 1].parse().unwrap_or(1);
                    i += 1;
                }
            }
            "-s" | "--seed" => {
                if i + 1 < args.len() {
                    config.seed = args[i + 1].parse().unwrap_or(1);
                    i += 1;
                }
            }
            "--miss" => {
                if i + 1 < args.len() {
                    config.target_miss_chance = args[i + 1].parse().unwrap_or(0.0);
                    i += 1;
                }
            }
            "--log" => config.log_enabled = true,
            "--json" => {}
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown option: {other}");
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }
    config
}

fn print_help() {
    println!("Usage: simulate [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -n, --iterations <N>   Number of iterations (default 1000)");
    println!("  -d, --duration <SECS>  Encounter length in seconds (default 60)");
    println!("  -t, --targets <N>      Number of enemy targets (default 1)");
    println!("  -s, --seed <N>         Base random seed (default 1)");
    println!("      --miss <FRAC>      Spell miss chance against targets");
    println!("      --log              Print the last iteration's combat log");
    println!("      --json             Also write sim_report.json");
}
