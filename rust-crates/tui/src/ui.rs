use crate::{
    casino_client::BetOutcome,
    client::{
        Game,
        Tone,
    },
};
use chrono::{
    DateTime,
    Local,
    Utc,
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEvent,
        KeyEventKind,
        KeyModifiers,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use futures::StreamExt;
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;

const MAX_AMOUNT_DIGITS: usize = 12;

pub enum UserEvent {
    Quit,
    Redraw,
    SubmitBet { amount: i64, number: i64 },
    Withdraw,
    Reset,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Field {
    #[default]
    Amount,
    Number,
}

impl Field {
    fn other(self) -> Field {
        match self {
            Field::Amount => Field::Number,
            Field::Number => Field::Amount,
        }
    }
}

#[derive(Debug, Default)]
pub struct UiState {
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
    amount: String,
    number: String,
    focus: Field,
    show_history: bool,
}

pub type InputEventReceiver = EventStream;

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn input_event_stream() -> InputEventReceiver {
    EventStream::new()
}

pub async fn next_raw_event(events: &mut InputEventReceiver) -> Result<Event> {
    match events.next().await {
        Some(ev) => Ok(ev?),
        None => Err(eyre!("terminal input stream closed")),
    }
}

pub fn clear_form(state: &mut UiState) {
    state.amount.clear();
    state.number.clear();
    state.focus = Field::Amount;
}

pub fn draw(state: &mut UiState, game: &Game) -> Result<()> {
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, game))?;
        state.terminal = Some(term);
    }
    Ok(())
}

/// Applies form editing keys to `state` and turns the rest into user events.
pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    match event {
        Event::Key(key) => interpret_key(state, key),
        Event::Resize(_, _) => Some(UserEvent::Redraw),
        _ => None,
    }
}

fn interpret_key(state: &mut UiState, k: KeyEvent) -> Option<UserEvent> {
    if k.kind != KeyEventKind::Press {
        return None;
    }
    if k.modifiers.contains(KeyModifiers::CONTROL) {
        return match k.code {
            KeyCode::Char('c') => Some(UserEvent::Quit),
            _ => None,
        };
    }
    match k.code {
        KeyCode::Esc | KeyCode::Char('q') => Some(UserEvent::Quit),
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            state.focus = state.focus.other();
            Some(UserEvent::Redraw)
        }
        KeyCode::Backspace => {
            focused_field(state).pop();
            Some(UserEvent::Redraw)
        }
        KeyCode::Char(c) if c.is_ascii_digit() => {
            let limit = match state.focus {
                Field::Amount => MAX_AMOUNT_DIGITS,
                Field::Number => 1,
            };
            let field = focused_field(state);
            if field.len() < limit {
                field.push(c);
            }
            Some(UserEvent::Redraw)
        }
        KeyCode::Enter => Some(UserEvent::SubmitBet {
            amount: state.amount.parse().unwrap_or(0),
            number: state.number.parse().unwrap_or(0),
        }),
        KeyCode::Char('h') => {
            state.show_history = !state.show_history;
            Some(UserEvent::Redraw)
        }
        KeyCode::Char('w') => Some(UserEvent::Withdraw),
        KeyCode::Char('r') => Some(UserEvent::Reset),
        _ => None,
    }
}

fn focused_field(state: &mut UiState) -> &mut String {
    match state.focus {
        Field::Amount => &mut state.amount,
        Field::Number => &mut state.number,
    }
}

fn ui(f: &mut Frame, state: &UiState, game: &Game) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Length(6), // result + bet form
            Constraint::Min(5),    // history
            Constraint::Length(3), // status
            Constraint::Length(3), // help
        ])
        .split(f.area());

    let title = Paragraph::new("Gomboc Gambling Casino")
        .alignment(Alignment::Center)
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);
    draw_result(f, middle[0], game);
    draw_bet_form(f, middle[1], state, game);
    draw_history(f, chunks[2], state, game);
    draw_status(f, chunks[3], game);
    draw_help(f, chunks[4], game);
}

fn draw_result(f: &mut Frame, area: Rect, game: &Game) {
    let face = game
        .shown_face()
        .map_or_else(|| "-".to_string(), |n| n.to_string());
    let result_style = match game.outcome {
        Some(BetOutcome::Win) => Style::default().fg(Color::Green),
        Some(BetOutcome::Lose) => Style::default().fg(Color::Red),
        None => Style::default(),
    };
    let lines = vec![
        Line::from(vec![
            Span::raw("Dice Roll: "),
            Span::styled(face, Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from(vec![
            Span::raw("Result: "),
            Span::styled(game.result_message(), result_style),
        ]),
        Line::from(format!("Balance: ${}.00", game.balance)),
    ];
    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Result"));
    f.render_widget(widget, area);
}

fn draw_bet_form(f: &mut Frame, area: Rect, state: &UiState, game: &Game) {
    let field_line = |label: &'static str, value: &str, field: Field| {
        let focused = state.focus == field;
        let style = if focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let cursor = if focused { "_" } else { "" };
        Line::from(vec![
            Span::raw(label),
            Span::styled(format!("{value}{cursor}"), style),
        ])
    };
    let submit = if game.is_rolling() {
        Line::styled("Rolling Dice...", Style::default().fg(Color::Yellow))
    } else if game.can_bet() {
        Line::from("Enter: Submit Bet")
    } else {
        Line::styled("Game over", Style::default().fg(Color::DarkGray))
    };
    let lines = vec![
        field_line("Bet Amount: ", &state.amount, Field::Amount),
        field_line("Dice Number (1-6): ", &state.number, Field::Number),
        submit,
    ];
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Place Your Bets"));
    f.render_widget(widget, area);
}

fn draw_history(f: &mut Frame, area: Rect, state: &UiState, game: &Game) {
    let block = Block::default().borders(Borders::ALL).title(if state.show_history {
        "Bet History (h to hide)"
    } else {
        "Bet History (h to show)"
    });
    if !state.show_history {
        f.render_widget(block, area);
        return;
    }
    let items: Vec<ListItem> = if game.history.is_empty() {
        vec![ListItem::new("No history available.")]
    } else {
        game.history_newest_first()
            .map(|entry| {
                let outcome_style = match entry.outcome {
                    BetOutcome::Win => Style::default().fg(Color::Green),
                    BetOutcome::Lose => Style::default().fg(Color::Red),
                };
                let outcome = match entry.outcome {
                    BetOutcome::Win => "win",
                    BetOutcome::Lose => "lose",
                };
                ListItem::new(Line::from(vec![
                    Span::raw(format!(
                        "{}: Bet: ${}, Number: {}, Dice Roll: {}, Result: ",
                        local_time(entry.date),
                        entry.amount,
                        entry.number,
                        entry.dice_roll
                    )),
                    Span::styled(outcome, outcome_style),
                ]))
            })
            .collect()
    };
    f.render_widget(List::new(items).block(block), area);
}

/// Bet timestamps are stored in UTC; the player reads them in their own zone.
fn local_time(date: DateTime<Utc>) -> String {
    date.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S %Z")
        .to_string()
}

fn draw_status(f: &mut Frame, area: Rect, game: &Game) {
    let (text, style) = match &game.status {
        Some(status) => {
            let color = match status.tone {
                Tone::Info => Color::Yellow,
                Tone::Success => Color::Green,
                Tone::Error => Color::Red,
            };
            (status.text.as_str(), Style::default().fg(color))
        }
        None => ("Ready", Style::default().fg(Color::Green)),
    };
    let widget = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(widget, area);
}

fn draw_help(f: &mut Frame, area: Rect, game: &Game) {
    let mut keys = vec!["Tab switch field", "0-9 type", "Backspace delete"];
    if game.can_bet() {
        keys.push("Enter bet");
    }
    if game.can_withdraw() {
        keys.push("w withdraw");
    }
    keys.extend(["r reset", "h history", "q/Esc quit"]);
    let help = Paragraph::new(keys.join(" | "))
        .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;

    fn press(state: &mut UiState, code: KeyCode) -> Option<UserEvent> {
        interpret_event(
            state,
            Event::Key(KeyEvent::new(code, KeyModifiers::NONE)),
        )
    }

    fn type_digits(state: &mut UiState, digits: &str) {
        for c in digits.chars() {
            press(state, KeyCode::Char(c));
        }
    }

    #[test]
    fn interpret_event__typed_fields__submit_parsed_bet() {
        // given
        let mut state = UiState::default();
        type_digits(&mut state, "250");
        press(&mut state, KeyCode::Tab);
        type_digits(&mut state, "4");

        // when
        let event = press(&mut state, KeyCode::Enter);

        // then
        match event {
            Some(UserEvent::SubmitBet { amount, number }) => {
                assert_eq!(amount, 250);
                assert_eq!(number, 4);
            }
            _ => panic!("expected a bet submission"),
        }
    }

    #[test]
    fn interpret_event__empty_fields__submit_zeroes() {
        let mut state = UiState::default();

        match press(&mut state, KeyCode::Enter) {
            Some(UserEvent::SubmitBet { amount, number }) => {
                assert_eq!((amount, number), (0, 0));
            }
            _ => panic!("expected a bet submission"),
        }
    }

    #[test]
    fn interpret_event__number_field__keeps_single_digit() {
        let mut state = UiState::default();
        press(&mut state, KeyCode::Tab);

        type_digits(&mut state, "78");

        assert_eq!(state.number, "7");
        assert_eq!(state.amount, "");
    }

    #[test]
    fn interpret_event__amount_field__caps_length_and_edits() {
        let mut state = UiState::default();

        type_digits(&mut state, "99999999999999999");
        assert_eq!(state.amount.len(), MAX_AMOUNT_DIGITS);

        press(&mut state, KeyCode::Backspace);
        assert_eq!(state.amount.len(), MAX_AMOUNT_DIGITS - 1);
    }

    #[test]
    fn interpret_event__command_keys() {
        let mut state = UiState::default();

        assert!(matches!(press(&mut state, KeyCode::Char('w')), Some(UserEvent::Withdraw)));
        assert!(matches!(press(&mut state, KeyCode::Char('r')), Some(UserEvent::Reset)));
        assert!(matches!(press(&mut state, KeyCode::Char('q')), Some(UserEvent::Quit)));
        assert!(matches!(press(&mut state, KeyCode::Esc), Some(UserEvent::Quit)));
        assert!(press(&mut state, KeyCode::Char('x')).is_none());

        assert!(!state.show_history);
        press(&mut state, KeyCode::Char('h'));
        assert!(state.show_history);
    }

    #[test]
    fn interpret_event__ctrl_c__quits() {
        let mut state = UiState::default();
        let event = interpret_event(
            &mut state,
            Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        );
        assert!(matches!(event, Some(UserEvent::Quit)));
    }

    #[test]
    fn local_time__converts_from_utc() {
        let date = DateTime::parse_from_rfc3339("2024-03-05T23:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let local = date.with_timezone(&Local);

        let shown = local_time(date);

        assert!(shown.starts_with(&local.format("%Y-%m-%d %H:%M:%S").to_string()));
        assert_eq!(shown, local.format("%Y-%m-%d %H:%M:%S %Z").to_string());
    }

    #[test]
    fn clear_form__empties_fields_and_refocuses_amount() {
        let mut state = UiState::default();
        type_digits(&mut state, "10");
        press(&mut state, KeyCode::Tab);
        type_digits(&mut state, "3");

        clear_form(&mut state);

        assert_eq!(state.amount, "");
        assert_eq!(state.number, "");
        assert_eq!(state.focus, Field::Amount);
    }
}
