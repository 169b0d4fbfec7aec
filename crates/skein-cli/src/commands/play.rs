//! Interactive terminal session for the demo story.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use colored::Colorize;

use skein_engine::{DrawOutcome, EngineError, GameState, Presenter, StoryEngine};

use crate::demo;
use crate::presenter::TermPresenter;

pub fn run(seed: Option<u64>, load: Option<&Path>) -> Result<(), String> {
    let game = Arc::new(demo::game());
    let mut engine = StoryEngine::new(game, TermPresenter)
        .map_err(|e| format!("failed to start engine: {e}"))?;

    println!("  {} '{}'", "Playing".bold(), engine.game().title);
    println!("  Pick choices by number. Cards: d <n> draw, p <n> play, c <n> pinned.");
    println!("  Also: status, save <file>, load <file>, restart, q to quit.");
    println!();

    match load {
        Some(path) => load_state(&mut engine, path)?,
        None => start(&mut engine, seed)?,
    }

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut line = String::new();

    loop {
        if engine.is_game_over() {
            println!(
                "  {}",
                "(the story has ended — restart, load <file>, or q)".dimmed()
            );
        }
        print!("> ");
        io::stdout().flush().map_err(|e| e.to_string())?;

        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break, // EOF
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let (command, rest) = match input.split_once(' ') {
            Some((command, rest)) => (command, rest.trim()),
            None => (input, ""),
        };

        let outcome = match command.to_lowercase().as_str() {
            "q" | "quit" => break,
            "status" => {
                super::print_qualities(&engine);
                Ok(())
            }
            "restart" => start(&mut engine, seed),
            "save" => save_state(&engine, rest),
            "load" => load_state(&mut engine, Path::new(rest)),
            "d" => draw(&mut engine, rest),
            "p" => play_hand_card(&mut engine, rest),
            "c" => play_pinned(&mut engine, rest),
            _ => commit_choice(&mut engine, input),
        };
        if let Err(message) = outcome {
            println!("{}", message.yellow());
            println!();
        }
    }

    Ok(())
}

fn start<P: Presenter>(engine: &mut StoryEngine<P>, seed: Option<u64>) -> Result<(), String> {
    match seed {
        Some(seed) => engine.begin_game_with_seeds(&[seed]),
        None => engine.begin_game(),
    }
    .map_err(|e| format!("failed to begin game: {e}"))
}

fn commit_choice<P: Presenter>(engine: &mut StoryEngine<P>, input: &str) -> Result<(), String> {
    let number: usize = input
        .parse()
        .map_err(|_| format!("unknown command: {input}"))?;
    if number == 0 {
        return Err("choices are numbered from 1".into());
    }
    engine.choose(number - 1).map_err(readable)
}

fn draw<P: Presenter>(engine: &mut StoryEngine<P>, rest: &str) -> Result<(), String> {
    let deck_id = nth_deck(engine, rest)?;
    match engine.draw_card(&deck_id).map_err(readable)? {
        DrawOutcome::Drawn(_) => Ok(()),
        DrawOutcome::HandFull => Err("your hand is full — play a card first".into()),
        DrawOutcome::DeckEmpty => Err("that deck has no cards left for you".into()),
    }
}

fn play_hand_card<P: Presenter>(engine: &mut StoryEngine<P>, rest: &str) -> Result<(), String> {
    let number = parse_index(rest)?;
    let scene_id = engine
        .state()
        .scene_id
        .clone()
        .ok_or_else(|| "no scene to play from".to_string())?;
    let card_id = engine
        .state()
        .current_hands
        .get(&scene_id)
        .and_then(|hand| hand.get(number - 1))
        .map(|card| card.id.clone())
        .ok_or_else(|| format!("no card {number} in hand"))?;
    engine.play_card(&card_id).map_err(readable)
}

fn play_pinned<P: Presenter>(engine: &mut StoryEngine<P>, rest: &str) -> Result<(), String> {
    let number = parse_index(rest)?;
    let pinned: Vec<String> = match engine.current_choices() {
        Some(choices) => choices
            .iter()
            .filter(|choice| {
                engine
                    .game()
                    .scenes
                    .get(&choice.id)
                    .is_some_and(|scene| scene.is_pinned_card)
            })
            .map(|choice| choice.id.clone())
            .collect(),
        None => Vec::new(),
    };
    let card_id = pinned
        .get(number - 1)
        .cloned()
        .ok_or_else(|| format!("no pinned card {number}"))?;
    engine.play_pinned_card(&card_id).map_err(readable)
}

fn nth_deck<P: Presenter>(engine: &StoryEngine<P>, rest: &str) -> Result<String, String> {
    let number = parse_index(rest)?;
    let decks: Vec<String> = match engine.current_choices() {
        Some(choices) => choices
            .iter()
            .filter(|choice| choice.is_deck)
            .map(|choice| choice.id.clone())
            .collect(),
        None => Vec::new(),
    };
    decks
        .get(number - 1)
        .cloned()
        .ok_or_else(|| format!("no deck {number} here"))
}

fn parse_index(rest: &str) -> Result<usize, String> {
    let number: usize = rest
        .parse()
        .map_err(|_| format!("expected a number, got '{rest}'"))?;
    if number == 0 {
        return Err("cards and decks are numbered from 1".into());
    }
    Ok(number)
}

fn save_state<P: Presenter>(engine: &StoryEngine<P>, path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("usage: save <file>".into());
    }
    let blob = serde_json::to_string_pretty(engine.exportable_state())
        .map_err(|e| format!("could not serialize the game: {e}"))?;
    fs::write(path, blob).map_err(|e| format!("could not write {path}: {e}"))?;
    println!("  {}", format!("saved to {path}").dimmed());
    Ok(())
}

fn load_state<P: Presenter>(engine: &mut StoryEngine<P>, path: &Path) -> Result<(), String> {
    let blob =
        fs::read_to_string(path).map_err(|e| format!("could not read {}: {e}", path.display()))?;
    let state: GameState =
        serde_json::from_str(&blob).map_err(|e| format!("not a valid save file: {e}"))?;
    engine.set_state(state).map_err(readable)
}

/// Engine errors worth showing the player, in plainer words.
fn readable(error: EngineError) -> String {
    match error {
        EngineError::ChoiceOutOfRange { available, .. } => {
            format!("pick a number between 1 and {available}")
        }
        EngineError::ChoiceUnavailable(_) => "that choice is not available right now".into(),
        EngineError::NoChoicesActive => "there is nothing to choose right now".into(),
        EngineError::GameIsOver => "the story has ended — restart or load a save".into(),
        other => other.to_string(),
    }
}
