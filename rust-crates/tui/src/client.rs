use crate::ui;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use lootbox::{
    Case,
    Catalog,
    EmptyTierPolicy,
    Error,
    Item,
    Money,
    Opening,
    RarityWeights,
    Session,
    StoreConfig,
    battle::{
        Battle,
        BattleLobby,
        BattleMode,
        BattleOutcome,
    },
    fairness::{
        self,
        FairnessProof,
        FairnessState,
        RevealedSeed,
    },
    leaderboard::{
        self,
        Countdown,
        Standing,
    },
    ledger::Inventory,
    session::{
        Activity,
        SessionStats,
    },
};
use rand::{
    SeedableRng,
    rngs::StdRng,
};
use std::path::PathBuf;
use tokio::time::{
    self,
    Duration,
    Instant,
    MissedTickBehavior,
};
use tracing::{
    error,
    info,
    warn,
};

const ERROR_LIMIT: usize = 50;
const FRAME_INTERVAL: Duration = Duration::from_millis(50);
const REEL_RADIUS: usize = 4;
const BOT_NAMES_PER_BATTLE: usize = 3;

#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub catalog_path: Option<PathBuf>,
    pub client_seed: Option<String>,
    pub rng_seed: Option<u64>,
    pub user: Option<String>,
}

/// The last revealed opening, kept so it can be checked once its seed is out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpeningRecord {
    pub case_id: String,
    pub item_id: String,
    pub item_name: String,
    pub proof: FairnessProof,
}

#[derive(Clone, Debug)]
pub struct ReelView {
    pub case_name: String,
    pub price: Money,
    pub slots: Vec<Item>,
    pub marker: usize,
    pub revealed: Option<Item>,
    pub can_close: bool,
    pub nonce: u64,
}

#[derive(Clone, Debug)]
pub struct FairnessView {
    pub commitment: String,
    pub client_seed: String,
    pub nonce: u64,
    pub revealed: Vec<RevealedSeed>,
    pub last_opening: Option<OpeningRecord>,
    pub verification: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub user: Option<String>,
    pub balance: Money,
    pub cases: Vec<Case>,
    pub categories: Vec<String>,
    pub weights: RarityWeights,
    pub policy: EmptyTierPolicy,
    pub inventory: Inventory,
    pub battles: Vec<Battle>,
    pub last_battle: Option<BattleOutcome>,
    pub standings: Vec<Standing>,
    pub countdown: Countdown,
    pub fairness: FairnessView,
    pub stats: SessionStats,
    pub activity: Vec<Activity>,
    pub reel: Option<ReelView>,
    pub status: String,
    pub errors: Vec<String>,
}

pub struct AppController {
    config: StoreConfig,
    catalog: Catalog,
    session: Session,
    lobby: BattleLobby,
    rng: StdRng,
    opening: Option<Opening>,
    opening_started: Option<Instant>,
    last_opening: Option<OpeningRecord>,
    last_battle: Option<BattleOutcome>,
    verification: Option<String>,
    status: String,
    errors: Vec<String>,
}

impl AppController {
    pub fn new(config: AppConfig) -> Result<Self> {
        config
            .store
            .validate()
            .wrap_err("invalid store configuration")?;
        let catalog = match &config.catalog_path {
            Some(path) => Catalog::from_path(path, &config.store.weights)
                .wrap_err_with(|| format!("loading catalog from {}", path.display()))?,
            None => Catalog::embedded(&config.store.weights)
                .wrap_err("loading built-in catalog")?,
        };
        let fairness = match &config.client_seed {
            Some(seed) => FairnessState::new(seed),
            None => FairnessState::default(),
        };
        let mut session = Session::with_fairness(config.store.starting_balance, fairness);
        if let Some(user) = &config.user {
            session
                .sign_in(user)
                .wrap_err_with(|| format!("signing in as {user}"))?;
            if !config.store.starting_balance.is_zero() {
                session
                    .add_funds(config.store.starting_balance)
                    .wrap_err("funding starting balance")?;
            }
        }
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        info!(cases = catalog.len(), "storefront ready");
        Ok(AppController {
            config: config.store,
            catalog,
            session,
            lobby: BattleLobby::storefront(),
            rng,
            opening: None,
            opening_started: None,
            last_opening: None,
            last_battle: None,
            verification: None,
            status: String::from("Welcome! Pick a case and press Enter to open it."),
            errors: Vec::new(),
        })
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
        info!(status = %self.status);
    }

    fn push_errors(&mut self, mut items: Vec<String>) {
        if items.is_empty() {
            return;
        }
        for item in &items {
            error!("{}", item);
        }
        self.errors.append(&mut items);
        if self.errors.len() > ERROR_LIMIT {
            let drain = self.errors.len() - ERROR_LIMIT;
            self.errors.drain(0..drain);
        }
    }

    fn report(&mut self, err: Error) {
        if let Error::ItemNotFound(id) = &err {
            warn!(item = %id, "inventory and screen disagree");
        }
        self.push_errors(vec![err.to_string()]);
    }

    pub fn is_spinning(&self) -> bool {
        self.opening.as_ref().is_some_and(Opening::is_spinning)
    }

    /// When the current reel should stop, if one is spinning.
    pub fn reveal_deadline(&self) -> Option<Instant> {
        let opening = self.opening.as_ref().filter(|o| o.is_spinning())?;
        Some(self.opening_started? + opening.config.reveal_delay())
    }

    fn spin_progress(&self, now: Instant) -> f64 {
        match (&self.opening, self.opening_started) {
            (Some(opening), Some(started)) if opening.is_spinning() => {
                let delay = opening.config.reveal_delay().as_secs_f64();
                if delay == 0.0 {
                    return 1.0;
                }
                (now.saturating_duration_since(started).as_secs_f64() / delay).min(1.0)
            }
            _ => 1.0,
        }
    }

    pub fn open_case(&mut self, case_id: &str, now: Instant) -> lootbox::Result<()> {
        if self.is_spinning() {
            return Err(Error::OpeningInProgress);
        }
        let case = self.catalog.get(case_id)?;
        let opening = self.session.open_case(
            case,
            &self.config.opening,
            &self.config.weights,
            self.config.empty_tier_policy,
            &mut self.rng,
        )?;
        let message = format!("Opening {} for {}...", case.name, case.price);
        self.opening = Some(opening);
        self.opening_started = Some(now);
        self.set_status(message);
        Ok(())
    }

    pub fn reveal(&mut self) -> lootbox::Result<Item> {
        let opening = self.opening.as_mut().ok_or(Error::NotSpinning)?;
        let won = self.session.reveal(opening)?.clone();
        self.last_opening = Some(OpeningRecord {
            case_id: opening.case_id.clone(),
            item_id: won.id.clone(),
            item_name: won.name.clone(),
            proof: opening.proof.clone(),
        });
        self.set_status(format!(
            "You won {} ({}) worth {}",
            won.name, won.rarity, won.value
        ));
        Ok(won)
    }

    /// Dismisses the reel; refused while it is still spinning.
    pub fn close_opening(&mut self) -> bool {
        if self.opening.as_ref().is_some_and(|o| !o.can_close()) {
            self.set_status("The reel is still spinning");
            return false;
        }
        self.opening = None;
        self.opening_started = None;
        true
    }

    pub fn sell_items(&mut self, item_ids: &[String]) -> lootbox::Result<Money> {
        let refund = match item_ids {
            [] => return Ok(Money::ZERO),
            [single] => self.session.sell(single)?,
            many => self.session.sell_many(many)?,
        };
        self.set_status(format!(
            "Sold {} item(s) for {}",
            item_ids.len(),
            refund
        ));
        Ok(refund)
    }

    pub fn sell_all(&mut self) -> lootbox::Result<Money> {
        let count = self.session.inventory().len();
        let refund = self.session.sell_all()?;
        self.set_status(format!("Sold all {count} item(s) for {refund}"));
        Ok(refund)
    }

    pub fn sign_in(&mut self, identity: &str) -> lootbox::Result<()> {
        let name = self.session.sign_in(identity)?.name.clone();
        self.set_status(format!("Signed in as {name}"));
        Ok(())
    }

    pub fn sign_out(&mut self) {
        self.session.sign_out();
        self.last_opening = None;
        self.last_battle = None;
        self.verification = None;
        self.set_status("Signed out");
    }

    pub fn add_funds(&mut self, amount: &str) -> lootbox::Result<Money> {
        let amount: Money = amount.parse()?;
        let balance = self.session.add_funds(amount)?;
        self.set_status(format!("Added {amount}; balance is now {balance}"));
        Ok(balance)
    }

    pub fn join_battle(&mut self, battle_id: &str) -> lootbox::Result<()> {
        let bots: Vec<String> = (0..BOT_NAMES_PER_BATTLE)
            .map(|_| fakeit::internet::username())
            .collect();
        let outcome = self.session.join_battle(
            &mut self.lobby,
            battle_id,
            &self.catalog,
            &self.config.weights,
            self.config.empty_tier_policy,
            bots,
            &mut self.rng,
        )?;
        let message = if outcome.player_won {
            format!("Battle won! {} item(s) worth {}", outcome.winnings.len(), outcome.prize())
        } else {
            format!("Battle lost; team {} took the pot", outcome.winning_team + 1)
        };
        self.last_battle = Some(outcome);
        self.set_status(message);
        Ok(())
    }

    pub fn create_battle(
        &mut self,
        mode: BattleMode,
        case_id: &str,
        rounds: u32,
    ) -> lootbox::Result<()> {
        let battle = self.lobby.create(&self.catalog, "", mode, case_id, rounds)?;
        let message = format!("Created {} ({mode}, {rounds} rounds)", battle.name);
        self.set_status(message);
        Ok(())
    }

    pub fn rotate_seed(&mut self) {
        let revealed = self.session.fairness_mut().rotate();
        self.verification = None;
        self.set_status(format!("Revealed server seed {}", short_hex(&revealed.seed_hex)));
    }

    pub fn set_client_seed(&mut self, client_seed: &str) -> lootbox::Result<()> {
        self.session.fairness_mut().set_client_seed(client_seed)?;
        self.verification = None;
        self.set_status("Client seed updated; server seed rotated");
        Ok(())
    }

    /// Replays the last revealed opening against its now-public seed.
    pub fn verify_last_opening(&mut self) -> lootbox::Result<bool> {
        let record = self
            .last_opening
            .clone()
            .ok_or_else(|| Error::Fairness("no opening to verify yet".to_string()))?;
        let revealed = self
            .session
            .fairness()
            .find_revealed(&record.proof.commitment)
            .cloned()
            .ok_or_else(|| {
                Error::Fairness("rotate the server seed to reveal it first".to_string())
            })?;
        let case = self.catalog.get(&record.case_id)?;
        let replayed = fairness::replay_opening(
            case,
            &self.config.weights,
            self.config.empty_tier_policy,
            &revealed.seed_hex,
            &record.proof.client_seed,
            record.proof.nonce,
        )?;
        let check = fairness::verify_roll(
            &revealed.seed_hex,
            &record.proof.client_seed,
            record.proof.nonce,
            Some(&record.proof.commitment),
        )?;
        let verified = replayed.id == record.item_id && check.matches_commitment == Some(true);
        let message = if verified {
            format!(
                "VERIFIED: nonce {} replays to {} (roll {})",
                record.proof.nonce, replayed.name, check.roll
            )
        } else {
            format!(
                "MISMATCH: nonce {} replays to {}, credited {}",
                record.proof.nonce, replayed.name, record.item_name
            )
        };
        self.verification = Some(message.clone());
        self.set_status(message);
        Ok(verified)
    }

    pub fn apply(&mut self, event: ui::UserEvent, now: Instant) {
        let result = match event {
            ui::UserEvent::Quit | ui::UserEvent::Redraw => Ok(()),
            ui::UserEvent::OpenCase(case_id) => self.open_case(&case_id, now),
            ui::UserEvent::CloseOpening => {
                self.close_opening();
                Ok(())
            }
            ui::UserEvent::SellItems(ids) => self.sell_items(&ids).map(drop),
            ui::UserEvent::SellAll => self.sell_all().map(drop),
            ui::UserEvent::JoinBattle(battle_id) => self.join_battle(&battle_id),
            ui::UserEvent::CreateBattle {
                mode,
                case_id,
                rounds,
            } => self.create_battle(mode, &case_id, rounds),
            ui::UserEvent::SignIn(identity) => self.sign_in(&identity),
            ui::UserEvent::SignOut => {
                self.sign_out();
                Ok(())
            }
            ui::UserEvent::AddFunds(amount) => self.add_funds(&amount).map(drop),
            ui::UserEvent::SetClientSeed(seed) => self.set_client_seed(&seed),
            ui::UserEvent::RotateSeed => {
                self.rotate_seed();
                Ok(())
            }
            ui::UserEvent::VerifyLastOpening => self.verify_last_opening().map(drop),
        };
        if let Err(e) = result {
            self.report(e);
        }
    }

    fn reel_view(&self, now: Instant) -> Option<ReelView> {
        let opening = self.opening.as_ref()?;
        let position = opening.reel_position(self.spin_progress(now));
        let slots = opening.roll().window(position, REEL_RADIUS).to_vec();
        Some(ReelView {
            case_name: opening.case_name.clone(),
            price: opening.price,
            marker: position.min(REEL_RADIUS),
            slots,
            revealed: opening.revealed_item().cloned(),
            can_close: opening.can_close(),
            nonce: opening.proof.nonce,
        })
    }

    pub fn snapshot(&self, now: Instant) -> AppSnapshot {
        let fairness = self.session.fairness();
        AppSnapshot {
            user: self.session.profile().map(|p| p.name.clone()),
            balance: self.session.balance(),
            cases: self.catalog.iter().cloned().collect(),
            categories: self
                .catalog
                .categories()
                .into_iter()
                .map(String::from)
                .collect(),
            weights: self.config.weights,
            policy: self.config.empty_tier_policy,
            inventory: self.session.inventory().clone(),
            battles: self.lobby.iter().cloned().collect(),
            last_battle: self.last_battle.clone(),
            standings: leaderboard::standings(&self.session),
            countdown: leaderboard::countdown(chrono::Utc::now()),
            fairness: FairnessView {
                commitment: fairness.commitment(),
                client_seed: fairness.client_seed().to_string(),
                nonce: fairness.nonce(),
                revealed: fairness.revealed().to_vec(),
                last_opening: self.last_opening.clone(),
                verification: self.verification.clone(),
            },
            stats: self.session.stats().clone(),
            activity: self.session.activity().cloned().collect(),
            reel: self.reel_view(now),
            status: self.status.clone(),
            errors: self.errors.clone(),
        }
    }
}

fn short_hex(hex: &str) -> String {
    if hex.len() <= 16 {
        return hex.to_string();
    }
    format!("{}...", &hex[..16])
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let controller = AppController::new(config)?;
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    tracing::info!("Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    tracing::info!("UI ready");
    let res = run_loop(controller, &mut ui_state, &mut input_events).await;
    ui::terminal_exit()?;
    res
}

async fn run_loop(
    mut controller: AppController,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
) -> Result<()> {
    tracing::info!("Running app loop");
    let mut frames = time::interval(FRAME_INTERVAL);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let snapshot = controller.snapshot(Instant::now());
    ui::draw(ui_state, &snapshot).wrap_err("initial draw failed")?;

    loop {
        let reveal_at = controller.reveal_deadline();
        let spinning = reveal_at.is_some();
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            _ = time::sleep_until(reveal_at.unwrap_or_else(Instant::now)), if spinning => {
                if let Err(e) = controller.reveal() {
                    controller.report(e);
                }
            }
            _ = frames.tick(), if spinning => {}
            raw_ev = ui::next_raw_event(input_events) => {
                let event = raw_ev?;
                let Some(ev) = ui::interpret_event(ui_state, event) else {
                    continue;
                };
                if matches!(ev, ui::UserEvent::Quit) {
                    break;
                }
                controller.apply(ev, Instant::now());
            }
        }
        let snapshot = controller.snapshot(Instant::now());
        ui::draw(ui_state, &snapshot).wrap_err("draw failed")?;
    }
    tracing::info!("Leaving app loop");
    Ok(())
}
