//! Queue Simulator CLI Tool
//!
//! Drives the matchmaking core in-process with simulated players, so queue
//! admission, acceptance, rollback and captain selection can be watched
//! without a deployment.
//!
//! Usage:
//!   cargo run --bin queue-simulator -- --help
//!   cargo run --bin queue-simulator run --players 40 --decline-rate 0.1
//!   cargo run --bin queue-simulator run --profile 1v1 --balancing skill_balanced
//!   cargo run --bin queue-simulator scenario --name decline

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rand::seq::SliceRandom;
use rand::Rng;
use scrim_room::config::{MatchmakingSettings, TeamBalancing};
use scrim_room::events::{event_name, RecordingEventPublisher};
use scrim_room::metrics::MetricsCollector;
use scrim_room::room::teams::next_drafting_team;
use scrim_room::service::Matchmaker;
use scrim_room::{CaptainSelectionMethod, Match, MatchStatus, MatchmakingError};

#[derive(Parser)]
#[command(name = "queue-simulator")]
#[command(about = "In-process simulation of the scrim-room matchmaking flow")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Match profile (5v5, 1v1)
    #[arg(long, global = true, default_value = "5v5")]
    profile: String,

    /// Team formation strategy (captain_draft, skill_balanced)
    #[arg(long, global = true)]
    balancing: Option<String>,

    /// Print every published event as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Queue simulated players and play every room through
    Run {
        /// Number of players to queue
        #[arg(short, long, default_value = "20")]
        players: usize,
        /// Probability that a player declines a found match
        #[arg(short, long, default_value = "0.0")]
        decline_rate: f64,
        /// Captain selection method for ready rooms
        #[arg(short, long, value_enum, default_value = "random")]
        method: MethodArg,
    },
    /// Run a scripted scenario
    Scenario {
        /// Scenario to run
        #[arg(short, long, value_enum)]
        name: ScenarioName,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Random,
    Voting,
}

impl From<MethodArg> for CaptainSelectionMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Random => CaptainSelectionMethod::Random,
            MethodArg::Voting => CaptainSelectionMethod::Voting,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ScenarioName {
    /// Everyone accepts and the room becomes ready
    Accept,
    /// One player declines and the rest are requeued
    Decline,
    /// Nobody answers before the window closes
    Expire,
    /// Players vote for captains
    Vote,
}

struct Simulation {
    matchmaker: Matchmaker,
    publisher: Arc<RecordingEventPublisher>,
}

impl Simulation {
    fn new(settings: MatchmakingSettings) -> Result<Self> {
        let publisher = Arc::new(RecordingEventPublisher::new());
        let metrics = Arc::new(MetricsCollector::new()?);
        Ok(Self {
            matchmaker: Matchmaker::new(settings, publisher.clone(), metrics),
            publisher,
        })
    }

    fn capacity(&self) -> usize {
        self.matchmaker.settings().queue_capacity
    }

    /// Queue one player; returns the room their join created, if any
    async fn queue_player(&self, index: usize, rating: i32) -> Result<Option<Match>> {
        let user_id = format!("player-{:03}", index);
        let outcome = self
            .matchmaker
            .join_queue(&user_id, &format!("Player {}", index), rating)
            .await?;
        Ok(outcome.room)
    }

    /// Have every player answer the acceptance prompt
    async fn answer(&self, room: &Match, decline_rate: f64) -> Result<Match> {
        let mut ids = room.player_ids();
        ids.shuffle(&mut rand::thread_rng());

        let mut current = room.clone();
        for user_id in ids {
            let declines = rand::thread_rng().gen_bool(decline_rate.clamp(0.0, 1.0));
            if declines {
                println!("   ✋ {} declined", user_id);
                return Ok(self.matchmaker.decline(room.id, &user_id).await?);
            }
            current = self.matchmaker.accept(room.id, &user_id).await?;
        }
        Ok(current)
    }

    /// Pick captains and form teams in a ready room
    async fn form_teams(&self, room: &Match, method: CaptainSelectionMethod) -> Result<Match> {
        let mut current = self
            .matchmaker
            .set_captain_selection_method(room.id, method)
            .await?;

        if current.status == MatchStatus::CaptainVoting {
            let candidates = current.captain_candidates.clone();
            for voter in current.player_ids() {
                let candidate = candidates
                    .choose(&mut rand::thread_rng())
                    .ok_or_else(|| anyhow!("room {} has no candidates", room.id))?;
                current = self
                    .matchmaker
                    .vote_for_captain(room.id, &voter, candidate)
                    .await?;
            }
        }

        // Captains take turns picking the strongest player left
        while current.status == MatchStatus::TeamDraft {
            let captain = current
                .captain_of(next_drafting_team(&current))
                .cloned()
                .ok_or_else(|| anyhow!("room {} is drafting without captains", room.id))?;
            let pick = current
                .unassigned_players()
                .max_by_key(|p| p.skill_rating)
                .map(|p| p.user_id.clone())
                .ok_or_else(|| anyhow!("room {} has nobody left to draft", room.id))?;
            current = self.matchmaker.draft_pick(room.id, &captain, &pick).await?;
        }

        Ok(current)
    }

    fn print_events(&self, json: bool) -> Result<()> {
        let events = self.publisher.events();
        println!("\n📨 {} events published", events.len());
        for event in &events {
            if json {
                println!("{}", serde_json::to_string(event)?);
            } else {
                println!("   - {}", event_name(event));
            }
        }
        Ok(())
    }
}

fn print_room(room: &Match) {
    println!("   Room {} - status: {}", room.id, room.status);
    if let (Some(c1), Some(c2)) = (&room.captain1, &room.captain2) {
        println!("   Captains: {} vs {}", c1, c2);
    }
    if !room.team_a.is_empty() || !room.team_b.is_empty() {
        println!("   Team A: {:?}", room.team_a);
        println!("   Team B: {:?}", room.team_b);
    }
}

async fn run(
    sim: &Simulation,
    players: usize,
    decline_rate: f64,
    method: CaptainSelectionMethod,
) -> Result<()> {
    println!(
        "🎮 Queueing {} players (capacity {}, decline rate {:.0}%)",
        players,
        sim.capacity(),
        decline_rate * 100.0
    );

    let rng_rating = || rand::thread_rng().gen_range(800..=2200);
    let mut next_index = 0;
    let mut pending = Vec::new();

    while next_index < players || !pending.is_empty() {
        // Fill the queue until a room pops or we run out of players
        while next_index < players && pending.is_empty() {
            match sim.queue_player(next_index, rng_rating()).await {
                Ok(Some(room)) => pending.push(room),
                Ok(None) => {}
                Err(e) => println!("   ⚠️  player-{:03} not queued: {}", next_index, e),
            }
            next_index += 1;
        }

        let Some(room) = pending.pop() else {
            break;
        };

        println!("\n🔔 Match found: {}", room.id);
        let answered = sim.answer(&room, decline_rate).await?;
        match answered.status {
            MatchStatus::Ready => {
                let formed = sim.form_teams(&answered, method).await?;
                print_room(&formed);
            }
            MatchStatus::Cancelled => {
                println!("   Room cancelled, players returned to the queue");
                // Returned players may have filled the queue and opened a room
                let reopened = sim
                    .matchmaker
                    .list_active_rooms()?
                    .into_iter()
                    .find(|room| room.status == MatchStatus::Pending);
                match reopened {
                    Some(room) => pending.push(room),
                    None if !sim.matchmaker.settings().auto_create_rooms => {
                        match sim.matchmaker.create_room().await {
                            Ok(room) => pending.push(room),
                            Err(MatchmakingError::InsufficientPlayers { .. }) => {}
                            Err(e) => return Err(e.into()),
                        }
                    }
                    None => {}
                }
            }
            other => println!("   Room left in {}", other),
        }
    }

    let stats = sim.matchmaker.stats()?;
    println!("\n📊 Final statistics");
    println!("   Rooms created: {}", stats.rooms_created);
    println!("   Rooms ready: {}", stats.rooms_ready);
    println!("   Rooms cancelled: {}", stats.rooms_cancelled);
    println!("   Players returned: {}", stats.players_returned);
    println!("   Players still waiting: {}", stats.players_waiting);
    Ok(())
}

async fn scenario(sim: &Simulation, name: ScenarioName) -> Result<()> {
    let capacity = sim.capacity();
    let mut room = None;
    for i in 0..capacity {
        room = sim.queue_player(i, 1000 + (i as i32) * 50).await?.or(room);
    }
    let room = match room {
        Some(room) => room,
        None => sim.matchmaker.create_room().await?,
    };
    println!("🔔 Match found: {} ({} players)", room.id, room.players.len());

    match name {
        ScenarioName::Accept => {
            let room = sim.answer(&room, 0.0).await?;
            print_room(&room);
        }
        ScenarioName::Decline => {
            let decliner = room.player_ids().pop().ok_or_else(|| anyhow!("empty room"))?;
            let room = sim.matchmaker.decline(room.id, &decliner).await?;
            print_room(&room);
            let status = sim.matchmaker.queue_status()?;
            println!("   Queue now holds {} players", status.count);
            for room in sim.matchmaker.list_active_rooms()? {
                println!("   Reopened as room {}", room.id);
            }
        }
        ScenarioName::Expire => {
            let wait = sim.matchmaker.settings().acceptance_window() + Duration::from_millis(50);
            println!("   Waiting {}ms for the window to close...", wait.as_millis());
            tokio::time::sleep(wait).await;
            let swept = sim.matchmaker.acceptance().sweep_expired().await?;
            println!("   Sweep cancelled {} room(s)", swept);
            print_room(&sim.matchmaker.get_room(room.id)?);
        }
        ScenarioName::Vote => {
            let room = sim.answer(&room, 0.0).await?;
            let room = sim
                .form_teams(&room, CaptainSelectionMethod::Voting)
                .await?;
            print_room(&room);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut settings = MatchmakingSettings::profile(&cli.profile)
        .ok_or_else(|| anyhow!("Unknown match profile: {}", cli.profile))?;
    if let Some(balancing) = &cli.balancing {
        settings.team_balancing = balancing.parse::<TeamBalancing>().map_err(|e| anyhow!(e))?;
    }

    let command = cli.command;
    if matches!(
        command,
        Commands::Scenario {
            name: ScenarioName::Expire
        }
    ) {
        // Keep the expiry scenario short
        settings.acceptance_window_ms = 500;
    }

    let sim = Simulation::new(settings)?;

    match command {
        Commands::Run {
            players,
            decline_rate,
            method,
        } => run(&sim, players, decline_rate, method.into()).await?,
        Commands::Scenario { name } => scenario(&sim, name).await?,
    }

    sim.print_events(cli.json)?;
    Ok(())
}
