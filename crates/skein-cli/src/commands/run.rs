//! Scripted, deterministic playthrough of the demo story.
//!
//! Plays headless with the transcript enabled, then prints the transcript
//! and the final quality table. Same seed and choices, same output.

use std::sync::Arc;

use colored::Colorize;

use skein_engine::{NullPresenter, StoryEngine};

use crate::demo;

pub fn run(seed: u64, choices: &str) -> Result<(), String> {
    let game = Arc::new(demo::game());
    let mut engine = StoryEngine::new(game, NullPresenter)
        .map_err(|e| format!("failed to start engine: {e}"))?;
    engine.set_transcript_enabled(true);

    println!(
        "  {} '{}' {}",
        "Running".bold(),
        engine.game().title,
        format!("(seed={seed})").dimmed()
    );
    println!();

    engine
        .begin_game_with_seeds(&[seed])
        .map_err(|e| format!("failed to begin game: {e}"))?;

    for token in choices.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let index: usize = token
            .parse()
            .map_err(|_| format!("bad choice index: {token}"))?;
        if index == 0 {
            return Err("choice indices are 1-based".into());
        }
        if engine.is_game_over() {
            break;
        }
        engine
            .choose(index - 1)
            .map_err(|e| format!("choice {token} rejected: {e}"))?;
    }

    for line in engine.transcript() {
        println!("{line}");
    }
    println!();
    println!("  {}", "Final state".bold());
    super::print_qualities(&engine);
    println!("  game over: {}", engine.is_game_over());
    Ok(())
}
