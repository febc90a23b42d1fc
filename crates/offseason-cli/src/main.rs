// Offseason simulator entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file)
// 2. Load config (copying defaults into config/ on first run)
// 3. Load the player catalog, free-agent list, and season history
// 4. Load trained models (fatal on any failure)
// 5. Build the session and simulator
// 6. Run the requested command

mod league;
mod plan;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use offseason_core::catalog::{self, FreeAgentPool, PlayerCatalog};
use offseason_core::config::{self, Config};
use offseason_core::history;
use offseason_core::session::Session;
use offseason_sim::forecast::{AgingForecaster, ForecastParams, ProjectionResult};
use offseason_sim::models::{self, AgingModels};
use offseason_sim::season::{SeasonForecast, SeasonSimulator};

const USAGE: &str = "\
usage: offseason <command>

commands:
  plan <file>        apply an offseason plan, then simulate that team
  simulate <team>    simulate a team's unchanged roster
  league [<file>]    simulate every team, optionally after applying a plan
  roster <team>      show a team's roster and payroll
  project <player>   project one player's next season (name or PLAYER_ID)
  free-agents        list available free agents

options:
  --seed <n>         override the configured random seed
  --json             print forecasts as JSON";

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Plan(PathBuf),
    Simulate(String),
    League(Option<PathBuf>),
    Roster(String),
    Project(String),
    FreeAgents,
}

#[derive(Debug, Clone, PartialEq)]
struct Args {
    command: Command,
    seed: Option<u64>,
    json: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> anyhow::Result<Args> {
    let mut positional = Vec::new();
    let mut seed = None;
    let mut json = false;
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if arg == "--seed" {
            let value = iter.next().context("--seed needs a value")?;
            seed = Some(value.parse().with_context(|| format!("invalid seed: {value}"))?);
        } else if arg == "--json" {
            json = true;
        } else {
            positional.push(arg);
        }
    }

    let command = match positional.as_slice() {
        [cmd, file] if cmd == "plan" => Command::Plan(PathBuf::from(file)),
        [cmd, team] if cmd == "simulate" => Command::Simulate(team.clone()),
        [cmd] if cmd == "league" => Command::League(None),
        [cmd, file] if cmd == "league" => Command::League(Some(PathBuf::from(file))),
        [cmd, team] if cmd == "roster" => Command::Roster(team.clone()),
        [cmd, player] if cmd == "project" => Command::Project(player.clone()),
        [cmd] if cmd == "free-agents" => Command::FreeAgents,
        _ => bail!("{USAGE}"),
    };
    Ok(Args {
        command,
        seed,
        json,
    })
}

/// Everything loaded at startup.
struct Runtime {
    config: Config,
    catalog: Arc<PlayerCatalog>,
    free_agents: FreeAgentPool,
    simulator: Arc<SeasonSimulator>,
    seed: u64,
    json: bool,
}

impl Runtime {
    fn session(&self) -> Session {
        Session::new(Arc::clone(&self.catalog), &self.free_agents, &self.config.league)
    }

    fn resolve_team(&self, name: &str) -> anyhow::Result<String> {
        match self.config.league.resolve_team(name) {
            Some(abbr) => Ok(abbr),
            None => bail!("unknown team: {name}"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1))?;

    // 1. Initialize tracing
    init_tracing()?;
    info!("Offseason simulator starting up");

    // 2. Load config
    let base = config::base_dir().context("failed to locate project directory")?;
    config::ensure_config_files(&base).context("failed to initialize config files")?;
    let config = config::load_config_from(&base).context("failed to load configuration")?;
    info!(
        "Config loaded: {} {} -> {}, {} teams, cap {}, second apron {}",
        config.league.name,
        config.league.season,
        config.league.next_season,
        config.league.teams.len(),
        config.league.salary_cap,
        config.league.second_apron
    );

    // 3. Load data
    let catalog_path = resolve(&base, &config.data_paths.catalog);
    let catalog = catalog::load_catalog(&catalog_path)
        .with_context(|| format!("failed to load player catalog {}", catalog_path.display()))?;
    info!("Loaded {} catalog rows", catalog.len());

    let fa_path = resolve(&base, &config.data_paths.free_agents);
    let free_agents = catalog::load_free_agents(&fa_path)
        .with_context(|| format!("failed to load free agents {}", fa_path.display()))?;
    info!("Loaded {} free agents", free_agents.len());

    let history_paths: Vec<PathBuf> = config
        .data_paths
        .history
        .iter()
        .map(|p| resolve(&base, p))
        .collect();
    let history = history::load_history(&history_paths).context("failed to load season history")?;

    // 4. Load models
    let models_dir = resolve(&base, &config.models.dir);
    let aging = AgingModels::load(&models_dir).context("failed to load aging models")?;
    let predictor = models::load_win_predictor(&models_dir).context("failed to load win predictor")?;

    // 5. Build the simulator
    let params = ForecastParams::from_config(&config.forecast, config.league.season_games);
    let forecaster = AgingForecaster::new(Arc::new(aging), Arc::new(history), params);
    let simulator = SeasonSimulator::new(
        Arc::new(forecaster),
        predictor,
        config.simulation.minutes_budget,
        config.league.season_games,
    );
    let seed = args
        .seed
        .or(config.simulation.seed)
        .unwrap_or_else(rand::random);
    info!("Random seed: {}", seed);

    let runtime = Runtime {
        config,
        catalog: Arc::new(catalog),
        free_agents,
        simulator: Arc::new(simulator),
        seed,
        json: args.json,
    };

    // 6. Run the command
    match args.command {
        Command::Plan(path) => run_plan(&runtime, &path),
        Command::Simulate(team) => run_simulate(&runtime, &team),
        Command::League(plan) => run_league(&runtime, plan.as_deref()).await,
        Command::Roster(team) => run_roster(&runtime, &team),
        Command::Project(query) => run_project(&runtime, &query),
        Command::FreeAgents => {
            for name in runtime.free_agents.names() {
                println!("{name}");
            }
            Ok(())
        }
    }
}

fn resolve(base: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

/// Apply a plan file to a fresh session, printing each move's messages.
fn apply_plan_file(runtime: &Runtime, session: &mut Session, path: &Path) -> anyhow::Result<String> {
    let plan = plan::Plan::load(path)?;
    let team = plan.team(&runtime.config.league)?;
    let requests = plan.requests(&runtime.config.league)?;
    println!("{} payroll before moves: {}", team, session.payroll(&team)?);
    for (i, outcome) in plan::apply(session, requests).into_iter().enumerate() {
        println!("[{}] {}", i + 1, outcome.request);
        match outcome.result {
            Ok(report) => {
                for line in report.lines() {
                    println!("  [{}] {}", i + 1, line);
                }
            }
            Err(e) => println!("  [{}] {}", i + 1, e),
        }
    }
    println!("{} payroll after moves: {}\n", team, session.payroll(&team)?);
    Ok(team)
}

fn run_plan(runtime: &Runtime, path: &Path) -> anyhow::Result<()> {
    let mut session = runtime.session();
    let team = apply_plan_file(runtime, &mut session, path)?;
    let abbreviations = runtime.config.league.abbreviations();
    let forecast = league::simulate_team(
        &runtime.simulator,
        session.roster(&team)?,
        runtime.seed,
        &abbreviations,
    );
    report_forecast(runtime, &forecast)
}

fn run_simulate(runtime: &Runtime, team: &str) -> anyhow::Result<()> {
    let team = runtime.resolve_team(team)?;
    let session = runtime.session();
    let abbreviations = runtime.config.league.abbreviations();
    let forecast = league::simulate_team(
        &runtime.simulator,
        session.roster(&team)?,
        runtime.seed,
        &abbreviations,
    );
    report_forecast(runtime, &forecast)
}

async fn run_league(runtime: &Runtime, plan: Option<&Path>) -> anyhow::Result<()> {
    let mut session = runtime.session();
    if let Some(path) = plan {
        apply_plan_file(runtime, &mut session, path)?;
    }
    let rosters = session.rosters().cloned().collect();
    let forecasts =
        league::simulate_league(Arc::clone(&runtime.simulator), rosters, runtime.seed).await?;

    if runtime.json {
        println!("{}", serde_json::to_string_pretty(&forecasts)?);
        return Ok(());
    }

    println!("Projected {} standings", runtime.config.league.next_season);
    for (rank, f) in league::standings(&forecasts).iter().enumerate() {
        println!(
            "{:>3}. {:<4} {:>3}-{:<3} ({:.1})",
            rank + 1,
            f.team,
            f.whole_wins(runtime.simulator.season_games()),
            f.losses,
            f.wins
        );
    }
    Ok(())
}

fn run_roster(runtime: &Runtime, team: &str) -> anyhow::Result<()> {
    let team = runtime.resolve_team(team)?;
    let session = runtime.session();
    let roster = session.roster(&team)?;
    let rules = runtime.config.league.cap_rules();
    println!("{} ({} players)", team, roster.len());
    for p in roster.players() {
        println!(
            "  {:<28} {:>3} {:>6.1} ppg {:>8}",
            p.name,
            p.age,
            p.stats.points_per_game(),
            p.salary.to_string()
        );
    }
    let payroll = roster.salary();
    println!(
        "Payroll {} ({} the {} cap)",
        payroll,
        if rules.is_under_cap(payroll) { "under" } else { "over" },
        rules.salary_cap
    );
    Ok(())
}

fn report_forecast(runtime: &Runtime, forecast: &SeasonForecast) -> anyhow::Result<()> {
    if runtime.json {
        println!("{}", serde_json::to_string_pretty(forecast)?);
    } else {
        print_forecast(
            forecast,
            &runtime.config.league.next_season,
            runtime.config.league.season_games,
        );
    }
    Ok(())
}

/// Project one catalog player, looked up by name or `PLAYER_ID`.
fn project_player(
    catalog: &PlayerCatalog,
    forecaster: &AgingForecaster,
    query: &str,
    seed: u64,
) -> anyhow::Result<ProjectionResult> {
    let Some(player) = catalog.find_by_name_or_id(query) else {
        bail!("no player matching {query}");
    };
    let mut rng = StdRng::seed_from_u64(seed);
    Ok(forecaster.project(player, &mut rng))
}

fn run_project(runtime: &Runtime, query: &str) -> anyhow::Result<()> {
    let p = project_player(&runtime.catalog, runtime.simulator.forecaster(), query, runtime.seed)?;
    if runtime.json {
        println!("{}", serde_json::to_string_pretty(&p)?);
        return Ok(());
    }
    println!(
        "{} ({}, age {}) {} projection",
        p.name, p.team, p.age, runtime.config.league.next_season
    );
    println!(
        "  {:>4} gp {:>5.1} min {:>5.1} pts {:>5.1} reb {:>5.1} ast {:>4.1} stl {:>4.1} blk",
        p.games_played, p.minutes, p.points, p.rebounds, p.assists, p.steals, p.blocks
    );
    println!(
        "  FG {:.2}  3P {:.2} ({:.1} made)  FT {:.2}  +/- {:.1}",
        p.fg_pct, p.fg3_pct, p.threes_made, p.ft_pct, p.plus_minus
    );
    Ok(())
}

fn print_forecast(forecast: &SeasonForecast, season: &str, season_games: u32) {
    println!(
        "{} {}: {}-{} (predicted {:.1} wins)",
        forecast.team,
        season,
        forecast.whole_wins(season_games),
        forecast.losses,
        forecast.wins
    );
    println!(
        "  {:<28} {:>5} {:>5} {:>5} {:>5} {:>4} {:>3}",
        "player", "pts", "reb", "ast", "min", "gp", "age"
    );
    for p in &forecast.top_players {
        println!(
            "  {:<28} {:>5.1} {:>5.1} {:>5.1} {:>5.1} {:>4} {:>3}",
            p.name, p.points, p.rebounds, p.assists, p.minutes, p.games_played, p.age
        );
    }
}

/// Initialize tracing to log to a file under `logs/`.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("offseason.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("offseason=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
