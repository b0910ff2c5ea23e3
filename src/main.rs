//! Bubble Pop entry point
//!
//! Natively this is a headless autoplay runner: the idle AI plays a seeded
//! session and the final stats are printed. The browser build is driven
//! through the exports in `bubble_pop::wasm`.

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::path::PathBuf;

    use anyhow::{Context, Result};
    use clap::Parser;

    use bubble_pop::consts::SIM_DT;
    use bubble_pop::sim::{GameEvent, GamePhase, GameState, GameStats, TickInput, tick};
    use bubble_pop::{Difficulty, Settings};

    /// Play a seeded Bubble Pop session with the autoplay AI
    #[derive(Parser, Debug)]
    #[command(name = "bubble-pop", version, about)]
    pub struct Args {
        /// Run seed (random if omitted)
        #[arg(long)]
        pub seed: Option<u64>,

        /// Settings JSON file
        #[arg(long)]
        pub config: Option<PathBuf>,

        /// Difficulty preset, applied on top of the config file
        #[arg(long)]
        pub difficulty: Option<String>,

        /// Stop after this many shots have resolved
        #[arg(long, default_value_t = 200)]
        pub shots: u32,

        /// Print final stats as JSON
        #[arg(long)]
        pub json: bool,
    }

    fn load_settings(args: &Args) -> Result<Settings> {
        let mut settings = match &args.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                Settings::from_json(&text).with_context(|| format!("parsing {}", path.display()))?
            }
            None => Settings::default(),
        };
        if let Some(name) = &args.difficulty {
            let preset = Difficulty::from_str(name)
                .with_context(|| format!("unknown difficulty '{name}' (easy, normal, hard)"))?;
            settings.apply_preset(preset);
        }
        Ok(settings)
    }

    /// Run until the shot budget is spent or the session ends
    pub fn play(seed: u64, settings: Settings, shots: u32) -> GameStats {
        let mut state = GameState::with_settings(seed, settings);
        let input = TickInput {
            idle_mode: true,
            ..Default::default()
        };
        // Generous cap so a stuck projectile cannot spin forever
        let max_ticks = u64::from(shots.max(1)) * 60 * 60;

        while state.time_ticks < max_ticks {
            if state.stats.shots_fired >= shots && state.phase != GamePhase::Shooting {
                break;
            }
            tick(&mut state, &input, SIM_DT);
            for event in state.drain_events() {
                match &event {
                    GameEvent::GameOver { reason, .. } => log::info!("Game over: {reason:?}"),
                    GameEvent::Victory { .. } => log::info!("Perfect clear!"),
                    GameEvent::FeverChange { level, .. } => log::info!("Fever level {level}"),
                    other => log::debug!("{other:?}"),
                }
            }
            if state.phase == GamePhase::GameOver {
                break;
            }
        }
        state.current_stats()
    }

    pub fn run() -> Result<()> {
        env_logger::init();
        let args = Args::parse();
        let settings = load_settings(&args)?;
        let seed = args.seed.unwrap_or_else(rand::random);

        log::info!(
            "Bubble Pop (headless) seed={seed} difficulty={} shots={}",
            settings.difficulty.as_str(),
            args.shots
        );

        let stats = play(seed, settings, args.shots);

        if args.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("seed            {seed}");
            println!("score           {}", stats.score);
            println!("shots           {}", stats.shots_fired);
            println!("popped          {}", stats.bubbles_popped);
            println!("orphans         {}", stats.orphans_dropped);
            println!("max combo       {}", stats.max_combo);
            println!("fever level     {}", stats.fever_level);
            println!("power-ups       {}", stats.power_ups_triggered);
            println!("perfect clears  {}", stats.perfect_clears);
            println!("rows descended  {}", stats.rows_descended);
            println!("time            {:.1}s", stats.elapsed);
        }
        Ok(())
    }

}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    headless::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry points are the exports in bubble_pop::wasm
}
