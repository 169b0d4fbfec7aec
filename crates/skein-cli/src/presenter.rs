//! Terminal implementation of the engine's presentation interface.

use colored::Colorize;

use skein_engine::content::to_plain_text;
use skein_engine::{Choice, ContentNode, HandCard, Presenter};

/// Renders engine output as plain, lightly colored terminal text.
#[derive(Debug, Default)]
pub struct TermPresenter;

impl TermPresenter {
    fn print_choice_line(&self, number: usize, choice: &Choice) {
        let title = to_plain_text(&choice.title);
        let label = format!("[{number}]");
        if choice.can_choose {
            println!("  {} {}", label.bold(), title);
        } else {
            println!("  {} {}", label.dimmed(), title.dimmed());
        }
        if let Some(subtitle) = &choice.subtitle {
            println!("      {}", to_plain_text(subtitle).dimmed());
        }
        if let Some(check) = &choice.check {
            let percent = (check.success_probability * 100.0).floor();
            println!(
                "      {}",
                format!("{}: {} ({percent}%)", check.quality, check.difficulty).dimmed()
            );
        }
    }
}

impl Presenter for TermPresenter {
    fn display_content(&mut self, content: &[ContentNode], _face_image: Option<&str>) {
        let text = to_plain_text(content);
        if !text.is_empty() {
            println!("{text}");
            println!();
        }
    }

    fn display_choices(&mut self, choices: &[Choice]) {
        for (index, choice) in choices.iter().enumerate() {
            self.print_choice_line(index + 1, choice);
        }
        println!();
    }

    fn display_decks(&mut self, decks: &[Choice]) {
        if decks.is_empty() {
            return;
        }
        println!("  {}", "Decks (d <n> to draw)".bold());
        for (index, deck) in decks.iter().enumerate() {
            self.print_choice_line(index + 1, deck);
        }
        println!();
    }

    fn display_hand(&mut self, hand: &[HandCard], max_cards: Option<usize>) {
        let capacity = match max_cards {
            Some(max) => format!("{}/{max}", hand.len()),
            None => hand.len().to_string(),
        };
        println!("  {} {}", "Hand".bold(), format!("({capacity})").dimmed());
        if hand.is_empty() {
            println!("      {}", "(empty — draw from a deck)".dimmed());
        }
        for (index, card) in hand.iter().enumerate() {
            println!("  [{}] {}", index + 1, to_plain_text(&card.title));
        }
        println!();
    }

    fn display_pinned_cards(&mut self, cards: &[Choice]) {
        if cards.is_empty() {
            return;
        }
        println!("  {}", "On the table (c <n> to play)".bold());
        for (index, card) in cards.iter().enumerate() {
            self.print_choice_line(index + 1, card);
        }
        println!();
    }

    fn display_game_over(&mut self) {
        println!("{}", "*** Game Over ***".bold());
    }

    fn new_page(&mut self) {
        println!("{}", "────────────────────────────────".dimmed());
    }
}
