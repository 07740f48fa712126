use crate::client::{
    AppSnapshot,
    ReelView,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use crossterm::{
    event::{
        self,
        Event,
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
use itertools::Itertools;
use lootbox::{
    Case,
    Item,
    Rarity,
    battle::{
        Battle,
        BattleMode,
        BattleStatus,
    },
    ledger::InventorySort,
};
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;
use tokio::sync::mpsc;
use unicode_width::UnicodeWidthStr;

const INPUT_LIMIT: usize = 64;
const DEFAULT_ROUNDS: u32 = 3;

pub type InputEventReceiver = mpsc::UnboundedReceiver<std::io::Result<Event>>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    Redraw,
    OpenCase(String),
    CloseOpening,
    SellItems(Vec<String>),
    SellAll,
    JoinBattle(String),
    CreateBattle {
        mode: BattleMode,
        case_id: String,
        rounds: u32,
    },
    SignIn(String),
    SignOut,
    AddFunds(String),
    SetClientSeed(String),
    RotateSeed,
    VerifyLastOpening,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Page {
    #[default]
    Cases,
    Inventory,
    Battles,
    Leaderboard,
    Fairness,
    Profile,
}

impl Page {
    const ALL: [Page; 6] = [
        Page::Cases,
        Page::Inventory,
        Page::Battles,
        Page::Leaderboard,
        Page::Fairness,
        Page::Profile,
    ];

    fn index(self) -> usize {
        Page::ALL.iter().position(|p| *p == self).unwrap_or(0)
    }

    fn title(self) -> &'static str {
        match self {
            Page::Cases => "1 Cases",
            Page::Inventory => "2 Inventory",
            Page::Battles => "3 Battles",
            Page::Leaderboard => "4 Leaderboard",
            Page::Fairness => "5 Provably Fair",
            Page::Profile => "6 Profile",
        }
    }

    fn next(self) -> Page {
        Page::ALL[(self.index() + 1) % Page::ALL.len()]
    }

    fn prev(self) -> Page {
        Page::ALL[(self.index() + Page::ALL.len() - 1) % Page::ALL.len()]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InputPurpose {
    SignIn,
    AddFunds,
    ClientSeed,
}

impl InputPurpose {
    fn title(self) -> &'static str {
        match self {
            InputPurpose::SignIn => "Sign In (email or name)",
            InputPurpose::AddFunds => "Add Funds (e.g. 25.00)",
            InputPurpose::ClientSeed => "New Client Seed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct InputState {
    purpose: InputPurpose,
    text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct CreateBattleState {
    mode_idx: usize,
    case_idx: usize,
    rounds: u32,
}

impl Default for CreateBattleState {
    fn default() -> Self {
        CreateBattleState {
            mode_idx: 0,
            case_idx: 0,
            rounds: DEFAULT_ROUNDS,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    Input(InputState),
    CreateBattle(CreateBattleState),
    QuitModal,
}

#[derive(Default)]
pub struct UiState {
    page: Page,
    mode: Mode,
    case_idx: usize,
    item_idx: usize,
    battle_idx: usize,
    category: Option<String>,
    featured_only: bool,
    rarity_filter: Option<Rarity>,
    sort: InventorySort,
    battle_filter: Option<BattleStatus>,
    // rows into `item_ids`; duplicate ids are distinct rows
    selected: Vec<usize>,
    // refreshed on every draw
    categories: Vec<String>,
    all_case_ids: Vec<String>,
    case_ids: Vec<String>,
    item_ids: Vec<String>,
    battle_ids: Vec<String>,
    reel_open: bool,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

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

/// Reads terminal events on a dedicated thread so the async loop can select
/// on them alongside timers.
pub fn input_event_stream() -> InputEventReceiver {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        loop {
            let event = event::read();
            let failed = event.is_err();
            if tx.send(event).is_err() || failed {
                break;
            }
        }
    });
    rx
}

pub async fn next_raw_event(input_events: &mut InputEventReceiver) -> Result<Event> {
    let event = input_events
        .recv()
        .await
        .ok_or_else(|| eyre!("terminal input closed"))?;
    event.wrap_err("reading terminal input failed")
}

pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => interpret_key(state, key),
        Event::Resize(_, _) => Some(UserEvent::Redraw),
        _ => None,
    }
}

fn move_cursor(idx: &mut usize, len: usize, down: bool) {
    if len == 0 {
        *idx = 0;
    } else if down {
        *idx = (*idx + 1).min(len - 1);
    } else {
        *idx = idx.saturating_sub(1);
    }
}

fn cycle<T: Clone + PartialEq>(current: &Option<T>, options: &[T]) -> Option<T> {
    match current {
        None => options.first().cloned(),
        Some(value) => {
            let pos = options.iter().position(|o| o == value)?;
            options.get(pos + 1).cloned()
        }
    }
}

/// Maps a key press to an action, updating local view state on the way.
pub fn interpret_key(state: &mut UiState, key: KeyEvent) -> Option<UserEvent> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(UserEvent::Quit);
    }

    match &mut state.mode {
        Mode::Input(input) => {
            return match key.code {
                KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                KeyCode::Enter => {
                    let text = input.text.trim().to_string();
                    let purpose = input.purpose;
                    state.mode = Mode::Normal;
                    Some(match purpose {
                        InputPurpose::SignIn => UserEvent::SignIn(text),
                        InputPurpose::AddFunds => UserEvent::AddFunds(text),
                        InputPurpose::ClientSeed => UserEvent::SetClientSeed(text),
                    })
                }
                KeyCode::Backspace => {
                    input.text.pop();
                    Some(UserEvent::Redraw)
                }
                KeyCode::Char(c) if input.text.chars().count() < INPUT_LIMIT => {
                    input.text.push(c);
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::CreateBattle(cb) => {
            return match key.code {
                KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    move_cursor(&mut cb.case_idx, state.all_case_ids.len(), false);
                    Some(UserEvent::Redraw)
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    move_cursor(&mut cb.case_idx, state.all_case_ids.len(), true);
                    Some(UserEvent::Redraw)
                }
                KeyCode::Left | KeyCode::Char('-') => {
                    cb.rounds = cb.rounds.saturating_sub(1).max(1);
                    Some(UserEvent::Redraw)
                }
                KeyCode::Right | KeyCode::Char('+') => {
                    cb.rounds = (cb.rounds + 1).min(lootbox::battle::MAX_ROUNDS);
                    Some(UserEvent::Redraw)
                }
                KeyCode::Char('m') => {
                    cb.mode_idx = (cb.mode_idx + 1) % BattleMode::ALL.len();
                    Some(UserEvent::Redraw)
                }
                KeyCode::Enter => {
                    let case_id = state.all_case_ids.get(cb.case_idx).cloned()?;
                    let event = UserEvent::CreateBattle {
                        mode: BattleMode::ALL[cb.mode_idx],
                        case_id,
                        rounds: cb.rounds,
                    };
                    state.mode = Mode::Normal;
                    Some(event)
                }
                _ => None,
            };
        }
        Mode::QuitModal => {
            return match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::Normal => {}
    }

    if state.reel_open {
        return match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char(' ') => Some(UserEvent::CloseOpening),
            _ => None,
        };
    }

    let open_input = |state: &mut UiState, purpose| {
        state.mode = Mode::Input(InputState {
            purpose,
            text: String::new(),
        });
        Some(UserEvent::Redraw)
    };

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            state.mode = Mode::QuitModal;
            return Some(UserEvent::Redraw);
        }
        KeyCode::Tab | KeyCode::Right => {
            state.page = state.page.next();
            return Some(UserEvent::Redraw);
        }
        KeyCode::BackTab | KeyCode::Left => {
            state.page = state.page.prev();
            return Some(UserEvent::Redraw);
        }
        KeyCode::Char(c @ '1'..='6') => {
            let index = c as usize - '1' as usize;
            state.page = Page::ALL[index];
            return Some(UserEvent::Redraw);
        }
        KeyCode::Char('i') => return open_input(state, InputPurpose::SignIn),
        KeyCode::Char('d') => return open_input(state, InputPurpose::AddFunds),
        KeyCode::Char('x') => return Some(UserEvent::SignOut),
        _ => {}
    }

    match state.page {
        Page::Cases => match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                move_cursor(&mut state.case_idx, state.case_ids.len(), false);
                Some(UserEvent::Redraw)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                move_cursor(&mut state.case_idx, state.case_ids.len(), true);
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter | KeyCode::Char('o') => state
                .case_ids
                .get(state.case_idx)
                .cloned()
                .map(UserEvent::OpenCase),
            KeyCode::Char('c') => {
                state.category = cycle(&state.category, &state.categories);
                state.case_idx = 0;
                Some(UserEvent::Redraw)
            }
            KeyCode::Char('f') => {
                state.featured_only = !state.featured_only;
                state.case_idx = 0;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Page::Inventory => match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                move_cursor(&mut state.item_idx, state.item_ids.len(), false);
                Some(UserEvent::Redraw)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                move_cursor(&mut state.item_idx, state.item_ids.len(), true);
                Some(UserEvent::Redraw)
            }
            KeyCode::Char(' ') => {
                let row = state.item_idx;
                if row >= state.item_ids.len() {
                    return None;
                }
                match state.selected.iter().position(|r| *r == row) {
                    Some(pos) => {
                        state.selected.remove(pos);
                    }
                    None => state.selected.push(row),
                }
                Some(UserEvent::Redraw)
            }
            // the selection survives until the inventory actually changes
            KeyCode::Char('s') => {
                let ids: Vec<String> = if state.selected.is_empty() {
                    vec![state.item_ids.get(state.item_idx).cloned()?]
                } else {
                    state
                        .selected
                        .iter()
                        .filter_map(|row| state.item_ids.get(*row).cloned())
                        .collect()
                };
                Some(UserEvent::SellItems(ids))
            }
            KeyCode::Char('S') => {
                state.selected.clear();
                Some(UserEvent::SellAll)
            }
            KeyCode::Char('r') => {
                state.rarity_filter = cycle(&state.rarity_filter, &Rarity::DRAW_ORDER);
                state.item_idx = 0;
                state.selected.clear();
                Some(UserEvent::Redraw)
            }
            KeyCode::Char('o') => {
                state.sort = state.sort.next();
                state.item_idx = 0;
                state.selected.clear();
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Page::Battles => match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                move_cursor(&mut state.battle_idx, state.battle_ids.len(), false);
                Some(UserEvent::Redraw)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                move_cursor(&mut state.battle_idx, state.battle_ids.len(), true);
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => state
                .battle_ids
                .get(state.battle_idx)
                .cloned()
                .map(UserEvent::JoinBattle),
            KeyCode::Char('n') => {
                state.mode = Mode::CreateBattle(CreateBattleState::default());
                Some(UserEvent::Redraw)
            }
            KeyCode::Char('w') => {
                state.battle_filter = cycle(
                    &state.battle_filter,
                    &[BattleStatus::Waiting, BattleStatus::Finished],
                );
                state.battle_idx = 0;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Page::Fairness => match key.code {
            KeyCode::Char('e') => open_input(state, InputPurpose::ClientSeed),
            KeyCode::Char('r') => Some(UserEvent::RotateSeed),
            KeyCode::Char('v') => Some(UserEvent::VerifyLastOpening),
            _ => None,
        },
        Page::Leaderboard | Page::Profile => None,
    }
}

fn visible_cases<'a>(state: &UiState, snap: &'a AppSnapshot) -> Vec<&'a Case> {
    snap.cases
        .iter()
        .filter(|c| state.category.as_ref().is_none_or(|cat| c.in_category(cat)))
        .filter(|c| !state.featured_only || c.featured)
        .collect()
}

fn visible_items<'a>(state: &UiState, snap: &'a AppSnapshot) -> Vec<&'a Item> {
    snap.inventory
        .sorted(state.sort)
        .into_iter()
        .filter(|item| state.rarity_filter.is_none_or(|r| item.rarity == r))
        .collect()
}

fn visible_battles<'a>(state: &UiState, snap: &'a AppSnapshot) -> Vec<&'a Battle> {
    snap.battles
        .iter()
        .filter(|b| state.battle_filter.is_none_or(|s| b.status == s))
        .collect()
}

fn clamp(idx: &mut usize, len: usize) {
    *idx = (*idx).min(len.saturating_sub(1));
}

/// Row selections only mean something against the list they were made on.
fn refresh_item_rows(state: &mut UiState, item_ids: Vec<String>) {
    if state.item_ids != item_ids {
        state.selected.clear();
    }
    state.item_ids = item_ids;
}

/// Refreshes the cached ids the key handler needs from the latest snapshot.
fn sync_with_snapshot(state: &mut UiState, snap: &AppSnapshot) {
    state.categories = snap.categories.clone();
    state.all_case_ids = snap.cases.iter().map(|c| c.id.clone()).collect();
    state.case_ids = visible_cases(state, snap)
        .iter()
        .map(|c| c.id.clone())
        .collect();
    let item_ids = visible_items(state, snap)
        .iter()
        .map(|i| i.id.clone())
        .collect();
    refresh_item_rows(state, item_ids);
    state.battle_ids = visible_battles(state, snap)
        .iter()
        .map(|b| b.id.clone())
        .collect();
    state.reel_open = snap.reel.is_some();
    clamp(&mut state.case_idx, state.case_ids.len());
    clamp(&mut state.item_idx, state.item_ids.len());
    clamp(&mut state.battle_idx, state.battle_ids.len());
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    sync_with_snapshot(state, snap);
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(7),
        ])
        .split(f.area());

    draw_header(f, chunks[0], state, snap);
    match state.page {
        Page::Cases => draw_cases(f, chunks[1], state, snap),
        Page::Inventory => draw_inventory(f, chunks[1], state, snap),
        Page::Battles => draw_battles(f, chunks[1], state, snap),
        Page::Leaderboard => draw_leaderboard(f, chunks[1], snap),
        Page::Fairness => draw_fairness(f, chunks[1], snap),
        Page::Profile => draw_profile(f, chunks[1], snap),
    }
    draw_bottom(f, chunks[2], state, snap);
    if let Some(reel) = &snap.reel {
        draw_reel(f, reel);
    }
    draw_modals(f, state, snap);
}

fn draw_header(f: &mut Frame, area: Rect, state: &UiState, snap: &AppSnapshot) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Length(36)])
        .split(area);
    let tabs = Tabs::new(Page::ALL.iter().map(|p| p.title()))
        .select(state.page.index())
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .block(Block::default().borders(Borders::ALL).title("Lootbox"));
    f.render_widget(tabs, cols[0]);

    let who = snap.user.as_deref().unwrap_or("guest");
    let wallet = Paragraph::new(format!("{}  |  {}", fit_width(who, 16), snap.balance))
        .block(Block::default().borders(Borders::ALL).title("Wallet"));
    f.render_widget(wallet, cols[1]);
}

fn rarity_color(rarity: Rarity) -> Color {
    match rarity {
        Rarity::Common => Color::Gray,
        Rarity::Rare => Color::Blue,
        Rarity::Epic => Color::Magenta,
        Rarity::Legendary => Color::Yellow,
        Rarity::Mythic => Color::Red,
    }
}

fn cursor(selected: bool) -> &'static str {
    if selected { ">" } else { " " }
}

fn draw_cases(f: &mut Frame, area: Rect, state: &UiState, snap: &AppSnapshot) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);
    let cases = visible_cases(state, snap);

    let filter = match (&state.category, state.featured_only) {
        (Some(cat), true) => format!("{cat}, featured"),
        (Some(cat), false) => cat.clone(),
        (None, true) => "featured".to_string(),
        (None, false) => "all".to_string(),
    };
    let name_width = cols[0].width.saturating_sub(20) as usize;
    let lines: Vec<Line> = cases
        .iter()
        .enumerate()
        .map(|(i, case)| {
            let star = if case.featured { "*" } else { " " };
            let text = format!(
                "{} {} {:<name_width$} {:>9}",
                cursor(i == state.case_idx),
                star,
                fit_width(&case.name, name_width),
                case.price.to_string(),
            );
            if i == state.case_idx {
                Line::styled(text, Style::default().add_modifier(Modifier::BOLD))
            } else {
                Line::from(text)
            }
        })
        .collect();
    let list = Paragraph::new(lines)
        .scroll((scroll_offset(state.case_idx, cols[0].height), 0))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Cases [{filter}]")),
        );
    f.render_widget(list, cols[0]);

    let mut detail = Vec::new();
    if let Some(case) = cases.get(state.case_idx) {
        detail.push(Line::from(format!(
            "{}  {}  [{}]",
            case.name, case.price, case.category
        )));
        detail.push(Line::from(""));
        for (item, chance) in case.odds(&snap.weights, snap.policy) {
            detail.push(Line::styled(
                format!(
                    "{:<10} {:<28} {:>9} {:>7.2}%",
                    item.rarity.to_string(),
                    fit_width(&item.name, 28),
                    item.value.to_string(),
                    chance * 100.0
                ),
                Style::default().fg(rarity_color(item.rarity)),
            ));
        }
    } else {
        detail.push(Line::from("No cases match this filter"));
    }
    let detail = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title("Contents & Odds"));
    f.render_widget(detail, cols[1]);
}

fn scroll_offset(cursor: usize, height: u16) -> u16 {
    let visible = height.saturating_sub(2) as usize;
    if visible == 0 || cursor < visible {
        0
    } else {
        (cursor + 1 - visible) as u16
    }
}

fn draw_inventory(f: &mut Frame, area: Rect, state: &UiState, snap: &AppSnapshot) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let counts = snap
        .inventory
        .count_by_rarity()
        .iter()
        .rev()
        .map(|(rarity, n)| format!("{rarity} {n}"))
        .join(" | ");
    let summary = Paragraph::new(format!(
        "Items: {}  Value: {}  Filter: {}  Sort: {}  Selected: {}  {}",
        snap.inventory.len(),
        snap.inventory.total_value(),
        state
            .rarity_filter
            .map_or("all".to_string(), |r| r.to_string()),
        state.sort.label(),
        state.selected.len(),
        counts
    ))
    .block(Block::default().borders(Borders::ALL).title("Inventory"));
    f.render_widget(summary, rows[0]);

    let items = visible_items(state, snap);
    let lines: Vec<Line> = if items.is_empty() {
        vec![Line::from("Nothing here yet. Open a case!")]
    } else {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let mark = if state.selected.contains(&i) {
                    "[x]"
                } else {
                    "[ ]"
                };
                Line::styled(
                    format!(
                        "{} {} {:<32} {:<10} {:>9}",
                        cursor(i == state.item_idx),
                        mark,
                        fit_width(&item.name, 32),
                        item.rarity.to_string(),
                        item.value.to_string()
                    ),
                    Style::default().fg(rarity_color(item.rarity)),
                )
            })
            .collect()
    };
    let list = Paragraph::new(lines)
        .scroll((scroll_offset(state.item_idx, rows[1].height), 0))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(list, rows[1]);
}

fn draw_battles(f: &mut Frame, area: Rect, state: &UiState, snap: &AppSnapshot) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);
    let battles = visible_battles(state, snap);
    let case_of = |battle: &Battle| snap.cases.iter().find(|c| c.id == battle.case_id);

    let lines: Vec<Line> = battles
        .iter()
        .enumerate()
        .map(|(i, battle)| {
            let cost = case_of(battle)
                .and_then(|case| battle.entry_cost(case).ok())
                .map_or_else(|| "-".to_string(), |m| m.to_string());
            let status = match battle.status {
                BattleStatus::Waiting => format!("{} open", battle.open_seats()),
                BattleStatus::Finished => "finished".to_string(),
            };
            let text = format!(
                "{} {:<18} {:<8} {:>2}r {:>9}  {}",
                cursor(i == state.battle_idx),
                fit_width(&battle.name, 18),
                battle.mode.to_string(),
                battle.rounds,
                cost,
                status
            );
            match battle.status {
                BattleStatus::Waiting => Line::from(text),
                BattleStatus::Finished => {
                    Line::styled(text, Style::default().fg(Color::DarkGray))
                }
            }
        })
        .collect();
    let filter = state
        .battle_filter
        .map_or("all".to_string(), |s| format!("{s:?}").to_lowercase());
    let list = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Battles [{filter}]")),
    );
    f.render_widget(list, cols[0]);

    let mut detail = Vec::new();
    if let Some(battle) = battles.get(state.battle_idx) {
        let case_name = case_of(battle).map_or("unknown case", |c| c.name.as_str());
        detail.push(Line::from(format!("{} on {}", battle.name, case_name)));
        let totals = battle.team_totals();
        for (seat_idx, seat) in battle.seats.iter().enumerate() {
            let team = battle.mode.team_of(seat_idx);
            let who = if seat.is_player { " (you)" } else { "" };
            detail.push(Line::from(format!(
                "  team {} {}{} {}",
                team + 1,
                fit_width(&seat.name, 16),
                who,
                seat.total()
            )));
        }
        if let Some(team) = battle.winning_team {
            detail.push(Line::styled(
                format!("Winner: team {} with {}", team + 1, totals[team]),
                Style::default().fg(Color::Green),
            ));
        }
    }
    if let Some(outcome) = &snap.last_battle {
        detail.push(Line::from(""));
        let verdict = if outcome.player_won {
            format!("You won {} item(s) worth {}", outcome.winnings.len(), outcome.prize())
        } else {
            format!("You lost {}", outcome.cost)
        };
        detail.push(Line::from(format!("Last battle #{}: {verdict}", outcome.battle_id)));
        detail.push(Line::from(format!(
            "Team totals: {}",
            outcome.team_totals.iter().join(" / ")
        )));
    }
    let detail = Paragraph::new(detail)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Details"));
    f.render_widget(detail, cols[1]);
}

fn draw_leaderboard(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let c = snap.countdown;
    let header = Row::new(vec!["#", "Player", "Wagered", "Cases", "Win %", "Prize"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = snap
        .standings
        .iter()
        .map(|s| {
            let row = Row::new(vec![
                s.rank.to_string(),
                s.username.clone(),
                s.wagered.to_string(),
                s.cases_opened.to_string(),
                format!("{:.0}", s.win_rate),
                s.prize.to_string(),
            ]);
            if s.is_player {
                row.style(Style::default().fg(Color::Yellow))
            } else {
                row
            }
        })
        .collect();
    let widths = [
        Constraint::Length(4),
        Constraint::Length(18),
        Constraint::Length(12),
        Constraint::Length(7),
        Constraint::Length(6),
        Constraint::Length(10),
    ];
    let table = Table::new(rows, widths).header(header).block(
        Block::default().borders(Borders::ALL).title(format!(
            "Weekly Race - resets in {}d {:02}h {:02}m {:02}s",
            c.days, c.hours, c.minutes, c.seconds
        )),
    );
    f.render_widget(table, area);
}

fn draw_fairness(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let fair = &snap.fairness;
    let mut lines = vec![
        Line::from(format!("Server seed commitment (SHA-256): {}", fair.commitment)),
        Line::from(format!("Client seed: {}", fair.client_seed)),
        Line::from(format!("Next nonce: {}", fair.nonce)),
        Line::from(""),
        Line::from("Each opening draws from HMAC-SHA256(server seed, \"client:nonce:round\")."),
        Line::from("Rotate to reveal the server seed and check the commitment yourself."),
        Line::from(""),
    ];
    match &fair.last_opening {
        Some(record) => lines.push(Line::from(format!(
            "Last opening: {} (nonce {}, committed {})",
            record.item_name,
            record.proof.nonce,
            fit_width(&record.proof.commitment, 20)
        ))),
        None => lines.push(Line::from("Last opening: none yet")),
    }
    if let Some(verification) = &fair.verification {
        let color = if verification.starts_with("VERIFIED") {
            Color::Green
        } else {
            Color::Red
        };
        lines.push(Line::styled(verification.clone(), Style::default().fg(color)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from("Revealed seeds (newest first):"));
    for revealed in fair.revealed.iter().rev().take(5) {
        lines.push(Line::from(format!(
            "  {}  ->  {}",
            revealed.seed_hex,
            fit_width(&revealed.commitment, 20)
        )));
    }
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Provably Fair"));
    f.render_widget(p, area);
}

fn draw_profile(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(38), Constraint::Min(20)])
        .split(area);
    let stats = &snap.stats;
    let lines = vec![
        Line::from(format!("Player: {}", snap.user.as_deref().unwrap_or("not signed in"))),
        Line::from(format!("Balance: {}", snap.balance)),
        Line::from(""),
        Line::from(format!("Cases opened: {}", stats.cases_opened)),
        Line::from(format!("Battles won: {}/{}", stats.battles_won, stats.battles_played)),
        Line::from(format!("Win rate: {:.1}%", stats.win_rate())),
        Line::from(format!("Total spent: {}", stats.total_spent)),
        Line::from(format!("Total winnings: {}", stats.total_won)),
        Line::from(format!("Total sold: {}", stats.total_sold)),
        Line::from(format!("Deposited: {}", stats.deposited)),
    ];
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Profile")),
        cols[0],
    );

    let activity: Vec<Line> = snap
        .activity
        .iter()
        .map(|a| {
            Line::from(format!(
                "{} {:<11} {:<30} {:>9}",
                a.at.format("%H:%M:%S"),
                a.kind.verb(),
                fit_width(&a.label, 30),
                a.value.to_string()
            ))
        })
        .collect();
    f.render_widget(
        Paragraph::new(activity)
            .block(Block::default().borders(Borders::ALL).title("Recent Activity")),
        cols[1],
    );
}

fn draw_bottom(f: &mut Frame, area: Rect, state: &UiState, snap: &AppSnapshot) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);
    let mut lines = vec![Line::from(snap.status.clone())];
    for err in snap.errors.iter().rev().take(3) {
        lines.push(Line::styled(err.clone(), Style::default().fg(Color::Red)));
    }
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Status")),
        rows[0],
    );

    let page_help = match state.page {
        Page::Cases => "Enter open | c category | f featured",
        Page::Inventory => "Space select | s sell | S sell all | r rarity | o sort",
        Page::Battles => "Enter join | n new | w filter",
        Page::Fairness => "e client seed | r rotate | v verify last",
        Page::Leaderboard | Page::Profile => "",
    };
    let help = format!(
        "Tab/1-6 pages | j/k move | {page_help} | i sign in | d deposit | x sign out | q quit"
    );
    f.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        rows[1],
    );
}

fn draw_reel(f: &mut Frame, reel: &ReelView) {
    let area = centered_rect(90, 40, f.area());
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Opening {} ({}) - nonce {}", reel.case_name, reel.price, reel.nonce));
    f.render_widget(Clear, area);
    f.render_widget(block.clone(), area);
    let inner = block.inner(area);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(2)])
        .split(inner);

    let slots = reel.slots.len().max(1) as u16;
    let col_w = rows[0].width / slots;
    for (i, item) in reel.slots.iter().enumerate() {
        let rect = Rect::new(rows[0].x + i as u16 * col_w, rows[0].y, col_w, rows[0].height);
        let under_marker = i == reel.marker;
        let mut border = Style::default().fg(rarity_color(item.rarity));
        if under_marker {
            border = border.add_modifier(Modifier::BOLD);
        }
        let cell = Block::default()
            .borders(Borders::ALL)
            .border_type(if under_marker {
                BorderType::Double
            } else {
                BorderType::Plain
            })
            .border_style(border)
            .title(if under_marker { "v" } else { "" });
        let width = col_w.saturating_sub(2) as usize;
        let text = vec![
            Line::from(fit_width(&item.name, width)),
            Line::from(item.value.to_string()),
        ];
        f.render_widget(Paragraph::new(text).block(cell), rect);
    }

    let footer = reel_footer(reel);
    f.render_widget(Paragraph::new(footer).alignment(Alignment::Center), rows[1]);
}

fn reel_footer(reel: &ReelView) -> Line<'static> {
    let item = match &reel.revealed {
        Some(item) if reel.can_close => item,
        _ => return Line::from("Spinning... (closing is disabled until the reel stops)"),
    };
    let mut style = Style::default()
        .fg(rarity_color(item.rarity))
        .add_modifier(Modifier::BOLD);
    let shout = if item.rarity.is_jackpot() {
        style = style.add_modifier(Modifier::SLOW_BLINK);
        "JACKPOT! "
    } else {
        ""
    };
    Line::styled(
        format!(
            "{shout}You won {} ({}) worth {}!  Enter to close",
            item.name, item.rarity, item.value
        ),
        style,
    )
}

fn draw_modals(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    match &state.mode {
        Mode::Input(input) => {
            let area = centered_rect(50, 20, f.area());
            let block = Block::default()
                .borders(Borders::ALL)
                .title(input.purpose.title());
            let p = Paragraph::new(format!("> {}_\nEnter=confirm Esc=cancel", input.text));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::CreateBattle(cb) => {
            let area = centered_rect(50, 30, f.area());
            let block = Block::default().borders(Borders::ALL).title("Create Battle");
            let case = state
                .all_case_ids
                .get(cb.case_idx)
                .and_then(|id| snap.cases.iter().find(|c| c.id == *id));
            let case_line = case.map_or_else(
                || "Case: none".to_string(),
                |c| format!("Case: {} ({})", c.name, c.price),
            );
            let lines = vec![
                Line::from(format!("Mode: {}", BattleMode::ALL[cb.mode_idx])),
                Line::from(case_line),
                Line::from(format!("Rounds: {}", cb.rounds)),
                Line::from(""),
                Line::from("m mode | j/k case | +/- rounds | Enter create | Esc cancel"),
            ];
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(Paragraph::new(lines), block.inner(area));
        }
        Mode::QuitModal => {
            let area = centered_rect(40, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Confirm Quit");
            let p = Paragraph::new("Leave the storefront? (Y/N)");
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::Normal => {}
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Truncates to `max` terminal columns, marking the cut with an ellipsis.
fn fit_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    for ch in text.chars() {
        out.push(ch);
        if out.width() + 1 > max {
            out.pop();
            break;
        }
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use proptest::prelude::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn state_with_cases(ids: &[&str]) -> UiState {
        let ids: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
        UiState {
            case_ids: ids.clone(),
            all_case_ids: ids,
            ..UiState::default()
        }
    }

    #[test]
    fn interpret_key__enter_opens_case_under_cursor() {
        // given
        let mut state = state_with_cases(&["1", "2", "3"]);

        // when
        interpret_key(&mut state, press(KeyCode::Down));
        let event = interpret_key(&mut state, press(KeyCode::Enter));

        // then
        assert_eq!(event, Some(UserEvent::OpenCase("2".to_string())));
    }

    #[test]
    fn interpret_key__reel_swallows_everything_but_close() {
        let mut state = state_with_cases(&["1"]);
        state.reel_open = true;

        assert_eq!(interpret_key(&mut state, press(KeyCode::Char('2'))), None);
        assert_eq!(state.page, Page::Cases);
        assert_eq!(
            interpret_key(&mut state, press(KeyCode::Esc)),
            Some(UserEvent::CloseOpening)
        );
    }

    #[test]
    fn interpret_key__quit_needs_confirmation() {
        let mut state = UiState::default();
        assert_eq!(
            interpret_key(&mut state, press(KeyCode::Char('q'))),
            Some(UserEvent::Redraw)
        );
        assert_eq!(state.mode, Mode::QuitModal);
        assert_eq!(
            interpret_key(&mut state, press(KeyCode::Char('y'))),
            Some(UserEvent::Quit)
        );
    }

    #[test]
    fn interpret_key__ctrl_c_quits_from_any_mode() {
        let mut state = UiState::default();
        interpret_key(&mut state, press(KeyCode::Char('i')));
        let event = interpret_key(
            &mut state,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        );
        assert_eq!(event, Some(UserEvent::Quit));
    }

    #[test]
    fn interpret_key__sign_in_collects_text() {
        // given
        let mut state = UiState::default();
        interpret_key(&mut state, press(KeyCode::Char('i')));

        // when
        for c in "me@x.io".chars() {
            interpret_key(&mut state, press(KeyCode::Char(c)));
        }
        interpret_key(&mut state, press(KeyCode::Backspace));
        let event = interpret_key(&mut state, press(KeyCode::Enter));

        // then
        assert_eq!(event, Some(UserEvent::SignIn("me@x.i".to_string())));
        assert_eq!(state.mode, Mode::Normal);
    }

    #[test]
    fn interpret_key__sell_prefers_selection() {
        // given
        let mut state = UiState {
            page: Page::Inventory,
            item_ids: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            ..UiState::default()
        };

        // when
        interpret_key(&mut state, press(KeyCode::Char(' ')));
        interpret_key(&mut state, press(KeyCode::Down));
        interpret_key(&mut state, press(KeyCode::Down));
        interpret_key(&mut state, press(KeyCode::Char(' ')));
        let event = interpret_key(&mut state, press(KeyCode::Char('s')));

        // then
        assert_eq!(
            event,
            Some(UserEvent::SellItems(vec!["a".to_string(), "c".to_string()]))
        );
    }

    #[test]
    fn interpret_key__sell_selects_duplicate_copies_separately() {
        // given
        let mut state = UiState {
            page: Page::Inventory,
            item_ids: vec!["7".to_string(), "7".to_string(), "9".to_string()],
            ..UiState::default()
        };

        // when
        interpret_key(&mut state, press(KeyCode::Char(' ')));
        interpret_key(&mut state, press(KeyCode::Down));
        interpret_key(&mut state, press(KeyCode::Char(' ')));
        let event = interpret_key(&mut state, press(KeyCode::Char('s')));

        // then
        assert_eq!(
            event,
            Some(UserEvent::SellItems(vec!["7".to_string(), "7".to_string()]))
        );
        assert_eq!(state.selected, vec![0, 1]);
    }

    #[test]
    fn refresh_item_rows__keeps_selection_until_inventory_changes() {
        // given
        let ids = vec!["7".to_string(), "7".to_string(), "9".to_string()];
        let mut state = UiState {
            page: Page::Inventory,
            item_ids: ids.clone(),
            selected: vec![0, 1],
            ..UiState::default()
        };

        // when a sale is refused the list is unchanged
        refresh_item_rows(&mut state, ids);

        // then
        assert_eq!(state.selected, vec![0, 1]);

        // when the copies are gone
        refresh_item_rows(&mut state, vec!["9".to_string()]);

        // then
        assert!(state.selected.is_empty());
    }

    #[test]
    fn interpret_key__sell_without_selection_sells_cursor_item() {
        let mut state = UiState {
            page: Page::Inventory,
            item_ids: vec!["a".to_string(), "b".to_string()],
            item_idx: 1,
            ..UiState::default()
        };
        assert_eq!(
            interpret_key(&mut state, press(KeyCode::Char('s'))),
            Some(UserEvent::SellItems(vec!["b".to_string()]))
        );
    }

    #[test]
    fn interpret_key__create_battle_modal_builds_request() {
        // given
        let mut state = state_with_cases(&["1", "2"]);
        state.page = Page::Battles;
        interpret_key(&mut state, press(KeyCode::Char('n')));

        // when
        interpret_key(&mut state, press(KeyCode::Char('m')));
        interpret_key(&mut state, press(KeyCode::Down));
        interpret_key(&mut state, press(KeyCode::Char('+')));
        let event = interpret_key(&mut state, press(KeyCode::Enter));

        // then
        assert_eq!(
            event,
            Some(UserEvent::CreateBattle {
                mode: BattleMode::TwoVsTwo,
                case_id: "2".to_string(),
                rounds: DEFAULT_ROUNDS + 1,
            })
        );
    }

    #[test]
    fn interpret_key__category_filter_cycles_back_to_all() {
        let mut state = UiState {
            categories: vec!["gaming".to_string(), "tech".to_string()],
            ..UiState::default()
        };
        interpret_key(&mut state, press(KeyCode::Char('c')));
        assert_eq!(state.category.as_deref(), Some("gaming"));
        interpret_key(&mut state, press(KeyCode::Char('c')));
        assert_eq!(state.category.as_deref(), Some("tech"));
        interpret_key(&mut state, press(KeyCode::Char('c')));
        assert_eq!(state.category, None);
    }

    fn reel(revealed: Option<Rarity>, can_close: bool) -> ReelView {
        ReelView {
            case_name: "Starter Pack".to_string(),
            price: lootbox::Money::from_cents(99),
            slots: Vec::new(),
            marker: 0,
            revealed: revealed.map(|rarity| Item {
                id: "1-1".to_string(),
                name: "Premium Gaming Headset".to_string(),
                image: String::new(),
                rarity,
                value: lootbox::Money::from_cents(2_850),
                category: "audio".to_string(),
            }),
            can_close,
            nonce: 1,
        }
    }

    fn footer_text(reel: &ReelView) -> String {
        reel_footer(reel)
            .spans
            .iter()
            .map(|span| span.content.as_ref())
            .collect()
    }

    #[test]
    fn reel_footer__offers_close_only_when_closable() {
        assert!(footer_text(&reel(None, false)).starts_with("Spinning"));
        assert!(footer_text(&reel(Some(Rarity::Epic), false)).starts_with("Spinning"));

        let text = footer_text(&reel(Some(Rarity::Epic), true));
        assert!(text.starts_with("You won Premium Gaming Headset"));
        assert!(text.ends_with("Enter to close"));
    }

    #[test]
    fn reel_footer__calls_out_jackpots() {
        assert!(footer_text(&reel(Some(Rarity::Mythic), true)).starts_with("JACKPOT! "));
        assert!(!footer_text(&reel(Some(Rarity::Rare), true)).contains("JACKPOT"));
    }

    #[test]
    fn page__tab_wraps_around() {
        assert_eq!(Page::Profile.next(), Page::Cases);
        assert_eq!(Page::Cases.prev(), Page::Profile);
    }

    #[test]
    fn fit_width__marks_truncation() {
        assert_eq!(fit_width("Gaming Mouse Pro", 8), "Gaming …");
        assert_eq!(fit_width("short", 8), "short");
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64, .. ProptestConfig::default()
        })]

        #[test]
        fn fit_width__never_exceeds_budget(text in "[a-zA-Z0-9 \u{4e00}-\u{4e20}]{0,40}", max in 0usize..30) {
            prop_assert!(fit_width(&text, max).width() <= max);
        }
    }
}
