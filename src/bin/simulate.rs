use chrono::{SecondsFormat, Utc};
use clap::Parser;
use log::debug;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use zombie_field_core::config::{EngineOptions, GameSettings};
use zombie_field_core::engine::GameEngine;
use zombie_field_core::render::render_field;
use zombie_field_core::rng::Rng;
use zombie_field_core::types::{
    Direction, MoveRejection, PlayerView, RuntimeEvent, SessionState, Snapshot, StartPlayer, Vec2,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    players: Option<usize>,
    #[arg(long)]
    levels: Option<u32>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    max_moves: Option<u64>,
    #[arg(long)]
    run_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    players: usize,
    levels: u32,
    #[serde(rename = "maxMoves")]
    max_moves: u64,
    seed: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum RunOutcome {
    Cleared,
    GameOver,
    Stalled,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    players: usize,
    outcome: RunOutcome,
    #[serde(rename = "finalLevel")]
    final_level: u32,
    #[serde(rename = "levelsCompleted")]
    levels_completed: u32,
    #[serde(rename = "movesAttempted")]
    moves_attempted: u64,
    #[serde(rename = "movesAccepted")]
    moves_accepted: u64,
    #[serde(rename = "itemsCollected")]
    items_collected: u32,
    hits: u32,
    eliminations: u32,
    #[serde(rename = "zombieTicks")]
    zombie_ticks: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    level: u32,
    #[serde(rename = "move")]
    move_index: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: ScenarioResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(rename = "startedAt")]
    started_at: String,
    #[serde(rename = "finishedAt")]
    finished_at: String,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageMoves")]
    average_moves: u64,
    #[serde(rename = "outcomeCounts")]
    outcome_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    timestamp_ms: i64,
    level: String,
    event: String,
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(rename = "move", skip_serializing_if = "Option::is_none")]
    move_index: Option<u64>,
    details: Value,
}

#[derive(Default)]
struct AnomalyLog {
    messages: Vec<String>,
    records: Vec<AnomalyRecord>,
    seen: HashSet<String>,
}

impl AnomalyLog {
    fn push(&mut self, level: u32, move_index: u64, message: String) {
        self.records.push(AnomalyRecord {
            level,
            move_index,
            message: message.clone(),
        });
        if self.seen.insert(message.clone()) {
            self.messages.push(message);
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let scenarios = resolve_scenarios(&cli);
    let started_at = Utc::now();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let run_id = cli
        .run_id
        .clone()
        .unwrap_or_else(|| default_run_id(seed_hint, started_at.timestamp_millis()));
    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut outcome_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        emit_log(
            "info",
            "scenario_started",
            &run_id,
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({
                "players": scenario.players,
                "levels": scenario.levels,
                "maxMoves": scenario.max_moves,
            }),
        );
        let scenario_run = run_scenario(&scenario);

        for anomaly in &scenario_run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &run_id,
                Some(&scenario.name),
                Some(scenario.seed),
                Some(anomaly.move_index),
                json!({
                    "level": anomaly.level,
                    "message": anomaly.message,
                }),
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        *outcome_counts
            .entry(outcome_key(scenario_run.result.outcome).to_string())
            .or_insert(0) += 1;

        emit_log(
            "info",
            "scenario_finished",
            &run_id,
            Some(&scenario.name),
            Some(scenario.seed),
            Some(scenario_run.result.moves_attempted),
            json!({
                "outcome": scenario_run.result.outcome,
                "finalLevel": scenario_run.result.final_level,
                "levelsCompleted": scenario_run.result.levels_completed,
                "anomalyCount": scenario_run.anomaly_records.len(),
            }),
        );

        if let Ok(line) = serde_json::to_string(&scenario_run.result) {
            println!("{line}");
        }
        scenario_results.push(scenario_run.result);
    }

    let summary = build_run_summary(
        run_id.clone(),
        iso(started_at),
        iso(Utc::now()),
        scenario_results,
        outcome_counts,
        total_anomalies,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &run_id,
                None,
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        &run_id,
        None,
        None,
        None,
        json!({
            "scenarioCount": summary.scenario_count,
            "anomalyCount": summary.anomaly_count,
            "averageMoves": summary.average_moves,
            "outcomeCounts": summary.outcome_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn run_scenario(scenario: &Scenario) -> ScenarioRunResult {
    let settings = GameSettings::default();
    let start_players = (0..scenario.players)
        .map(|idx| StartPlayer {
            id: format!("bot_{}", idx + 1),
            lives: settings.player_lives,
        })
        .collect();
    let mut engine = GameEngine::new(
        1,
        start_players,
        settings,
        EngineOptions::default(),
        Rng::new(scenario.seed),
    );
    let mut walker = Rng::new(scenario.seed ^ 0x5eed_b075);

    let mut anomalies = AnomalyLog::default();
    let mut result = ScenarioResultLine {
        scenario: scenario.name.clone(),
        seed: scenario.seed,
        players: scenario.players,
        outcome: RunOutcome::Stalled,
        final_level: 1,
        levels_completed: 0,
        moves_attempted: 0,
        moves_accepted: 0,
        items_collected: 0,
        hits: 0,
        eliminations: 0,
        zombie_ticks: 0,
        anomalies: Vec::new(),
    };

    loop {
        let level = engine.level;
        result.final_level = level;
        let mut level_moves = 0u64;
        let mut last_lives = lives_by_player(&engine.build_snapshot());

        while engine.state() == SessionState::Active && level_moves < scenario.max_moves {
            let before = engine.build_snapshot();
            let roster = &before.players;
            if roster.is_empty() {
                break;
            }
            let mover = &roster[(level_moves as usize) % roster.len()];
            let dir = choose_direction(&before, mover, &mut walker);
            level_moves += 1;
            result.moves_attempted += 1;

            match engine.try_move(&mover.id, dir) {
                Ok(_) => result.moves_accepted += 1,
                Err(reason) => {
                    if reason == MoveRejection::GameOver || reason == MoveRejection::UnknownPlayer {
                        anomalies.push(
                            level,
                            result.moves_attempted,
                            format!("active bot {} rejected with {reason}", mover.id),
                        );
                    }
                    if snapshot_value(&engine.build_snapshot()) != snapshot_value(&before) {
                        anomalies.push(
                            level,
                            result.moves_attempted,
                            format!("rejected move ({reason}) mutated state"),
                        );
                    }
                }
            }

            for event in engine.drain_events() {
                match event {
                    RuntimeEvent::ItemCollected { .. } => result.items_collected += 1,
                    RuntimeEvent::PlayerHit { .. } => result.hits += 1,
                    RuntimeEvent::PlayerEliminated { .. } => result.eliminations += 1,
                    RuntimeEvent::ZombiesMoved { .. } => result.zombie_ticks += 1,
                    _ => {}
                }
            }

            let after = engine.build_snapshot();
            for message in collect_snapshot_anomalies(&after, &last_lives) {
                anomalies.push(level, result.moves_attempted, message);
            }
            last_lives = lives_by_player(&after);
        }

        debug!("level {level} final field:\n{}", render_field(&engine, &engine.settings));

        match engine.state() {
            SessionState::GameOver if !engine.is_level_complete() => {
                result.outcome = RunOutcome::GameOver;
                break;
            }
            SessionState::Active => {
                result.outcome = RunOutcome::Stalled;
                break;
            }
            _ => {}
        }

        result.levels_completed += 1;
        if engine.is_game_over() {
            result.outcome = RunOutcome::GameOver;
            break;
        }
        if level >= scenario.levels {
            result.outcome = RunOutcome::Cleared;
            break;
        }

        let next = GameEngine::create_next_level(&engine);
        for message in collect_carry_over_anomalies(&engine, &next) {
            anomalies.push(level + 1, result.moves_attempted, message);
        }
        engine = next;
    }

    result.anomalies = anomalies.messages;
    ScenarioRunResult {
        result,
        anomaly_records: anomalies.records,
    }
}

/// Heads for the nearest item until the threshold is met, then for the portal.
/// One move in four is random.
fn choose_direction(snapshot: &Snapshot, mover: &PlayerView, rng: &mut Rng) -> Direction {
    let here = Vec2::new(mover.x, mover.y);
    let held: u32 = mover.inventory.values().sum();
    let target = if held >= snapshot.required_items {
        snapshot.portal
    } else {
        snapshot
            .items
            .iter()
            .map(|item| Vec2::new(item.x, item.y))
            .min_by_key(|cell| distance(here, *cell))
    };

    if let Some(target) = target {
        if !rng.bool(0.25) {
            let closer: Vec<Direction> = Direction::ALL
                .into_iter()
                .filter(|dir| distance(here.step(*dir), target) < distance(here, target))
                .collect();
            if !closer.is_empty() {
                return closer[rng.pick_index(closer.len())];
            }
        }
    }
    Direction::ALL[rng.pick_index(Direction::ALL.len())]
}

fn distance(a: Vec2, b: Vec2) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

fn lives_by_player(snapshot: &Snapshot) -> BTreeMap<String, u32> {
    snapshot
        .players
        .iter()
        .map(|player| (player.id.clone(), player.lives))
        .collect()
}

fn snapshot_value(snapshot: &Snapshot) -> Value {
    serde_json::to_value(snapshot).unwrap_or(Value::Null)
}

fn collect_snapshot_anomalies(snapshot: &Snapshot, last_lives: &BTreeMap<String, u32>) -> Vec<String> {
    let mut anomalies = Vec::new();
    let in_bounds = |cell: Vec2| {
        cell.x >= 0 && cell.y >= 0 && cell.x < snapshot.width && cell.y < snapshot.height
    };
    let obstacles: HashSet<Vec2> = snapshot.obstacles.iter().copied().collect();

    let mut occupied = HashSet::new();
    for player in &snapshot.players {
        let cell = Vec2::new(player.x, player.y);
        if !in_bounds(cell) {
            anomalies.push(format!("player out of bounds: {} at {},{}", player.id, cell.x, cell.y));
        }
        if obstacles.contains(&cell) {
            anomalies.push(format!("player on obstacle: {} at {},{}", player.id, cell.x, cell.y));
        }
        if !occupied.insert(cell) {
            anomalies.push(format!("players share cell {},{}", cell.x, cell.y));
        }
        if player.lives == 0 {
            anomalies.push(format!("active player with zero lives: {}", player.id));
        }
        if let Some(previous) = last_lives.get(&player.id) {
            if player.lives > *previous {
                anomalies.push(format!(
                    "lives increased: {} {} -> {}",
                    player.id, previous, player.lives
                ));
            }
        }
    }

    for zombie in &snapshot.zombies {
        if !in_bounds(*zombie) || obstacles.contains(zombie) {
            anomalies.push(format!("zombie on invalid cell {},{}", zombie.x, zombie.y));
        }
    }
    for item in &snapshot.items {
        if obstacles.contains(&Vec2::new(item.x, item.y)) {
            anomalies.push(format!("item on obstacle {},{}", item.x, item.y));
        }
    }
    if snapshot.state == SessionState::LevelComplete && snapshot.winner.is_none() {
        anomalies.push("level complete without a winner".to_string());
    }
    anomalies
}

fn collect_carry_over_anomalies(previous: &GameEngine, next: &GameEngine) -> Vec<String> {
    let mut anomalies = Vec::new();
    if next.roster() != previous.roster() {
        anomalies.push(format!(
            "roster changed across levels: {:?} -> {:?}",
            previous.roster(),
            next.roster()
        ));
    }
    for id in next.roster() {
        if next.player_lives(id) != previous.player_lives(id) {
            anomalies.push(format!("lives not carried for {id}"));
        }
        if next.wins(id) != previous.wins(id) {
            anomalies.push(format!("wins not carried for {id}"));
        }
        if next.player_identity(id) != previous.player_identity(id) {
            anomalies.push(format!("identity not carried for {id}"));
        }
        if next
            .inventory(id)
            .is_some_and(|inventory| inventory.values().any(|count| *count > 0))
        {
            anomalies.push(format!("inventory not reset for {id}"));
        }
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = normalize_seed(
        cli.seed
            .unwrap_or_else(|| Utc::now().timestamp_millis().max(0) as u64),
    );
    let max_moves = cli.max_moves.unwrap_or(2_000).clamp(1, 1_000_000);
    let levels = cli.levels.unwrap_or(5).clamp(1, 50);

    if let Some(players) = cli.players {
        let players = players.clamp(1, 16);
        return vec![Scenario {
            name: format!("custom-p{players}"),
            players,
            levels,
            max_moves,
            seed,
        }];
    }

    vec![
        Scenario {
            name: "solo-check-p1".to_string(),
            players: 1,
            levels,
            max_moves,
            seed,
        },
        Scenario {
            name: "party-check-p4".to_string(),
            players: 4,
            levels,
            max_moves,
            seed: normalize_seed(seed as u64 + 1),
        },
    ]
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn default_run_id(seed: u32, timestamp_ms: i64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    run_id: String,
    started_at: String,
    finished_at: String,
    scenarios: Vec<ScenarioResultLine>,
    outcome_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let total_moves: u64 = scenarios.iter().map(|line| line.moves_attempted).sum();
    let average_moves = if scenario_count == 0 {
        0
    } else {
        total_moves / scenario_count as u64
    };
    RunSummary {
        run_id,
        started_at,
        finished_at,
        scenario_count,
        anomaly_count,
        average_moves,
        outcome_counts,
        scenarios,
    }
}

fn emit_log(
    level: &str,
    event: &str,
    run_id: &str,
    scenario: Option<&str>,
    seed: Option<u32>,
    move_index: Option<u64>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        timestamp_ms: Utc::now().timestamp_millis(),
        level: level.to_string(),
        event: event.to_string(),
        run_id: run_id.to_string(),
        scenario: scenario.map(|value| value.to_string()),
        seed,
        move_index,
        details,
    };
    if let Ok(line) = serde_json::to_string(&log_line) {
        eprintln!("{line}");
    }
}

fn outcome_key(outcome: RunOutcome) -> &'static str {
    match outcome {
        RunOutcome::Cleared => "cleared",
        RunOutcome::GameOver => "game_over",
        RunOutcome::Stalled => "stalled",
    }
}

fn iso(at: chrono::DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}
