//! The bundled demo story: a small harbor vignette exercising qualities,
//! checks, random go-tos, decks, and a game-over exit.

use skein_engine::content::{DisplayRange, QualityDisplay};
use skein_engine::{
    Action, ContentBlock, ContentNode, Expression, GameDefinition, GoTo, Predicate, QualityDef,
    Scene, SceneCheck, SceneOption, StateDep,
};

/// Build the demo game definition.
pub fn game() -> GameDefinition {
    let mut game = GameDefinition::new("The Lantern Harbor");
    game.author = Some("skein".into());
    game.first_scene = Some("quayside".into());

    game.add_quality("coins", QualityDef::new().with_min(0.0).with_initial(3.0));
    game.add_quality("nerve", QualityDef::new().with_initial(2.0));
    game.add_qdisplay(
        "wealth",
        QualityDisplay {
            cases: vec![
                DisplayRange {
                    min: None,
                    max: Some(0.0),
                    output: Some("penniless".into()),
                },
                DisplayRange {
                    min: Some(1.0),
                    max: Some(5.0),
                    output: Some("getting by".into()),
                },
                DisplayRange {
                    min: Some(6.0),
                    max: None,
                    output: Some("flush".into()),
                },
            ],
        },
    );

    game.add_scene(quayside());
    game.add_scene(tavern());
    game.add_scene(dice_game());
    game.add_scene(dice_win());
    game.add_scene(dice_lose());
    game.add_scene(card_table());
    game.add_scene(rumor_deck());
    game.add_scene(ship_out());

    for scene in rumor_cards() {
        game.add_scene(scene);
    }
    game.add_scene(leave_table());

    game
}

fn quayside() -> Scene {
    let mut content = ContentBlock::default();
    let wealth = content.push_dependency(StateDep::Insert {
        expression: Expression::quality("coins"),
        qdisplay: Some("wealth".into()),
    });
    let steady = content.push_dependency(StateDep::Predicate(Predicate::new(|_, qualities| {
        Ok(qualities.number("nerve") >= 4.0)
    })));
    content.nodes = vec![
        ContentNode::Paragraph(vec![ContentNode::Text(
            "Lanterns sway over the quayside. Somewhere out past the breakwater \
             is the ship that will take you away from this town."
                .into(),
        )]),
        ContentNode::Paragraph(vec![
            ContentNode::Text("You are ".into()),
            ContentNode::Insert(wealth),
            ContentNode::Text(".".into()),
            ContentNode::Conditional {
                predicate: steady,
                content: vec![ContentNode::Text(
                    " Your hands, for once, are steady.".into(),
                )],
            },
        ]),
    ];

    Scene::new("quayside")
        .with_title("The Quayside")
        .with_content_block(content)
        .with_option(SceneOption::scene("tavern"))
        .with_option(SceneOption::scene("dice_game"))
        .with_option(SceneOption::scene("card_table"))
        .with_option(SceneOption::scene("ship_out"))
}

fn tavern() -> Scene {
    let mut scene = Scene::new("tavern")
        .with_title("Work a shift at the Rusted Anchor")
        .with_content(
            "You haul crates and pour watered wine until the small hours. \
             The landlord presses a coin into your palm.",
        )
        .with_option(SceneOption::scene("quayside").with_title("Back to the quayside"));
    scene.on_arrival.push(Action::add_quality("coins", 1.0));
    scene.on_arrival.push(Action::add_quality("nerve", 1.0));
    scene
}

fn dice_game() -> Scene {
    let mut scene = Scene::new("dice_game").with_title("Join the dice game");
    scene.subtitle = Some(ContentBlock::text("Nerve against the bones."));
    scene.check = Some(SceneCheck::broad("nerve", 4.0, "dice_win", "dice_lose"));
    scene
}

fn dice_win() -> Scene {
    let mut scene = Scene::new("dice_win")
        .with_title("A lucky throw")
        .with_content("The bones come up sixes. Coins slide across the barrel-top toward you.")
        .with_option(SceneOption::scene("quayside").with_title("Pocket your winnings"));
    scene.on_arrival.push(Action::add_quality("coins", 3.0));
    scene
}

fn dice_lose() -> Scene {
    let mut scene = Scene::new("dice_lose")
        .with_title("A bad throw")
        .with_content("Snake eyes. The fishermen laugh, not unkindly, and take your coin.")
        .with_option(SceneOption::scene("quayside").with_title("Slink away"));
    scene.on_arrival.push(Action::add_quality("coins", -1.0));
    scene
}

fn card_table() -> Scene {
    let mut scene = Scene::new("card_table")
        .with_title("Sit at the card table")
        .with_content(
            "A half-circle of strangers trade rumors over a deck of salt-stained cards.",
        )
        .with_option(SceneOption::scene("rumor_deck"))
        .with_option(SceneOption::scene("leave_table"));
    scene.is_hand = true;
    scene.max_cards = Some(2);
    scene
}

fn rumor_deck() -> Scene {
    let mut scene = Scene::new("rumor_deck").with_title("The rumor deck");
    scene.unavailable_subtitle = Some(ContentBlock::text("You've heard everything tonight."));
    scene.is_deck = true;
    scene = scene
        .with_option(SceneOption::scene("rumor_tide"))
        .with_option(SceneOption::scene("rumor_captain"))
        .with_option(SceneOption::scene("rumor_lighthouse"));
    scene
}

fn rumor_cards() -> Vec<Scene> {
    let rumors = [
        (
            "rumor_tide",
            "The tide bell",
            "\"The tide bell rang twice at noon,\" a netmaker whispers. \
             \"That means money moving after dark.\"",
        ),
        (
            "rumor_captain",
            "The captain's debt",
            "\"The Mariposa's captain owes the harbormaster,\" says a clerk. \
             \"He'll take on anyone who pays cash, no questions.\"",
        ),
        (
            "rumor_lighthouse",
            "The dark lighthouse",
            "\"Lighthouse went dark on Sunday,\" mutters an old pilot. \
             \"Somebody paid the keeper to look the other way.\"",
        ),
    ];
    rumors
        .into_iter()
        .map(|(id, title, text)| {
            let mut scene = Scene::new(id)
                .with_title(title)
                .with_content(text)
                .with_option(SceneOption::scene("card_table").with_title("Back to the table"));
            scene.is_card = true;
            scene.on_arrival.push(Action::add_quality("nerve", 1.0));
            scene
        })
        .collect()
}

fn leave_table() -> Scene {
    let mut scene = Scene::new("leave_table").with_title("Push back your chair");
    scene.is_pinned_card = true;
    scene = scene.with_go_to(GoTo::to("quayside"));
    scene
}

fn ship_out() -> Scene {
    let mut scene = Scene::new("ship_out")
        .with_title("Buy passage on the Mariposa")
        .with_content(
            "You count ten coins into the purser's hand and climb the gangway. \
             The lanterns of the harbor shrink behind you, and the open sea takes the rest.",
        );
    scene.choose_if = Some(Predicate::new(|_, qualities| {
        Ok(qualities.number("coins") >= 10.0)
    }));
    scene.unavailable_subtitle = Some(ContentBlock::text("Passage costs ten coins."));
    scene.game_over = Some(true);
    scene
}
