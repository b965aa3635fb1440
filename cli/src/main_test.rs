use clap::CommandFactory;

use super::*;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).expect("arguments should parse")
}

#[test]
fn command_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn name_is_accepted_after_the_subcommand() {
    let board_id = Uuid::new_v4();
    let board = board_id.to_string();
    let cli = parse(&["sketch", "watch", &board, "--name", "Ada"]);
    assert_eq!(cli.name, "Ada");
    assert!(matches!(cli.command, Command::Watch { board_id: id } if id == board_id));
}

#[test]
fn shared_options_work_on_either_side_of_the_subcommand() {
    let board = Uuid::new_v4().to_string();
    let before = parse(&["sketch", "--name", "Bea", "--timeout-secs", "3", "clear", &board]);
    let after = parse(&["sketch", "clear", &board, "--name", "Bea", "--timeout-secs", "3"]);
    assert_eq!((before.name.as_str(), before.timeout_secs), ("Bea", 3));
    assert_eq!((after.name.as_str(), after.timeout_secs), ("Bea", 3));
}

#[test]
fn scribble_options_parse() {
    let board = Uuid::new_v4().to_string();
    let cli = parse(&["sketch", "scribble", &board, "--color", "#ff0000", "--points", "4", "--base-url", "http://h:9"]);
    assert_eq!(cli.base_url, "http://h:9");
    let Command::Scribble(args) = cli.command else {
        panic!("expected scribble");
    };
    assert_eq!(args.points, 4);
    assert_eq!(args.color, Rgba::rgb(255, 0, 0));
}

#[test]
fn zigzag_spans_the_canvas() {
    assert_eq!(zigzag(0, 5), PixelPoint::new(100.0, 400.0));
    assert_eq!(zigzag(1, 5), PixelPoint::new(300.0, 600.0));
    assert_eq!(zigzag(4, 5), PixelPoint::new(900.0, 400.0));
}
