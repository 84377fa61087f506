//! Robo Rush entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::spawn_local;
    use web_sys::{Document, HtmlCanvasElement, HtmlInputElement, KeyboardEvent, TouchEvent};

    use robo_rush::audio::{AudioManager, SoundEffect};
    use robo_rush::consts::SIM_DT;
    use robo_rush::leaderboard::format_time;
    use robo_rush::persistence::LocalStorage;
    use robo_rush::platform;
    use robo_rush::renderer::RenderState;
    use robo_rush::sim::{
        GameEvent, GamePhase, Level, LevelObserver, RunSummary, TickInput, create_level,
    };
    use robo_rush::sync::{HttpStore, ScoreSync, SyncOutcome};
    use robo_rush::{LevelConfig, Settings};

    type SharedSync = Rc<ScoreSync<LocalStorage, HttpStore>>;

    /// Drag distance (CSS pixels) for a full joystick deflection
    const JOYSTICK_RADIUS: f32 = 60.0;

    fn document() -> Option<Document> {
        web_sys::window()?.document()
    }

    fn set_text(selector: &str, text: &str) {
        if let Some(el) = document().and_then(|d| d.query_selector(selector).ok().flatten()) {
            el.set_text_content(Some(text));
        }
    }

    fn set_hidden(id: &str, hidden: bool) {
        if let Some(el) = document().and_then(|d| d.get_element_by_id(id)) {
            let _ = el.class_list().toggle_with_force("hidden", hidden);
        }
    }

    fn js_error(e: impl std::fmt::Display) -> JsValue {
        JsValue::from_str(&e.to_string())
    }

    /// Routes level events to audio, the HUD and score sync
    struct FrontendObserver {
        audio: Rc<RefCell<AudioManager>>,
        sync: SharedSync,
    }

    impl LevelObserver for FrontendObserver {
        fn on_event(&mut self, event: &GameEvent) {
            if let Some(effect) = SoundEffect::for_event(event) {
                self.audio.borrow().play(effect);
            }
        }

        fn on_score_changed(&mut self, score: u32) {
            set_text("#hud-score .hud-value", &score.to_string());
        }

        fn on_time_changed(&mut self, seconds_left: u32) {
            set_text("#hud-time .hud-value", &format_time(seconds_left));
        }

        fn on_lives_changed(&mut self, lives: u32) {
            set_text("#hud-lives .hud-value", &lives.to_string());
        }

        fn on_terminal(&mut self, summary: &RunSummary) {
            set_text("#final-score", &summary.score.to_string());
            set_text("#final-time", &format_time(summary.elapsed_time));

            let sync = self.sync.clone();
            let summary = *summary;
            spawn_local(async move {
                let outcome = sync.record_run(&summary).await;
                log::info!("Run recorded: {outcome:?}");
                update_sync_badge(&sync);
                refresh_leaderboard(&sync).await;
            });
        }
    }

    /// Game instance holding all state
    struct Game {
        level: Level,
        render_state: Option<RenderState>,
        audio: Rc<RefCell<AudioManager>>,
        sync: SharedSync,
        settings: Settings,
        last_time: f64,
        input: TickInput,
        /// Where the active touch started (joystick origin)
        touch_origin: Option<Vec2>,
        // FPS tracking
        frame_times: [f64; 60],
        frame_index: usize,
        fps: u32,
    }

    impl Game {
        fn new_level(seed: u64, audio: &Rc<RefCell<AudioManager>>, sync: &SharedSync) -> Level {
            let mut level = create_level(LevelConfig::default(), seed);
            level.subscribe(FrontendObserver {
                audio: audio.clone(),
                sync: sync.clone(),
            });
            level
        }

        fn start(&mut self) {
            match self.level.start() {
                Ok(()) => {
                    set_hidden("name-prompt", true);
                    set_hidden("hud", false);
                }
                Err(e) => log::warn!("Cannot start level: {e}"),
            }
        }

        /// Run simulation ticks
        fn update(&mut self, dt: f32, time: f64) {
            self.level.advance_frame(dt, &self.input);

            // Track frame times for FPS
            self.frame_times[self.frame_index] = time;
            self.frame_index = (self.frame_index + 1) % 60;

            // Calculate FPS from oldest to newest frame
            let oldest_time = self.frame_times[self.frame_index];
            if oldest_time > 0.0 {
                let elapsed = time - oldest_time;
                if elapsed > 0.0 {
                    self.fps = (60000.0 / elapsed).round() as u32;
                }
            }
        }

        /// Render the current frame
        fn render(&mut self) {
            if let Some(ref mut render_state) = self.render_state {
                match render_state.draw_state(self.level.state()) {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => {
                        render_state.resize(render_state.size.0, render_state.size.1);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of memory!");
                    }
                    Err(e) => log::warn!("Render error: {:?}", e),
                }
            }
        }

        /// Update phase overlays and modifier status in the DOM
        fn update_hud(&self) {
            let state = self.level.state();
            let phase = state.phase;

            set_hidden("pause-menu", phase != GamePhase::Paused);
            set_hidden("level-complete", phase != GamePhase::LevelComplete);
            set_hidden("game-over", !matches!(phase, GamePhase::GameOver(_)));

            set_hidden("hud-fps", !self.settings.show_fps);
            if self.settings.show_fps {
                set_text("#hud-fps .hud-value", &self.fps.to_string());
            }

            let modifier_label = |m: &robo_rush::sim::Modifier| {
                if m.is_active() {
                    format!("ON {}s", m.seconds_left())
                } else if m.is_cooling_down() {
                    format!("{}s", m.seconds_left())
                } else {
                    "READY".to_string()
                }
            };
            set_text("#hud-boost .hud-value", &modifier_label(&state.boost));
            set_text("#hud-autopilot .hud-value", &modifier_label(&state.autopilot));
            set_hidden("hud-overdrive", !self.level.is_overdrive());
        }

        fn handle_key(&mut self, key: &str, down: bool, repeat: bool) {
            match key {
                "ArrowUp" | "w" | "W" => self.input.up = down,
                "ArrowDown" | "s" | "S" => self.input.down = down,
                "ArrowLeft" | "a" | "A" => self.input.left = down,
                "ArrowRight" | "d" | "D" => self.input.right = down,
                _ if !down || repeat => {}
                "Escape" => {
                    if let Err(e) = self.level.toggle_pause() {
                        log::debug!("Pause ignored: {e}");
                    }
                }
                "b" | "B" => {
                    if let Err(e) = self.level.activate_boost() {
                        log::debug!("Boost unavailable: {e}");
                    }
                }
                "i" | "I" => {
                    if let Err(e) = self.level.activate_autopilot() {
                        log::debug!("Autopilot unavailable: {e}");
                    }
                }
                "r" | "R" => self.restart(),
                "m" | "M" => self.toggle_mute(),
                _ => {}
            }
        }

        fn restart(&mut self) {
            if let Err(e) = self.level.restart() {
                log::debug!("Restart ignored: {e}");
            }
        }

        fn toggle_mute(&mut self) {
            let muted = self.settings.toggle_mute();
            self.audio.borrow_mut().apply_settings(&self.settings);
            if let Err(e) = self.settings.save(self.sync.cache().storage()) {
                log::warn!("Failed to save settings: {e}");
            }
            log::info!("Muted: {muted}");
        }

        fn auto_pause(&mut self, reason: &str) {
            if self.level.phase() == GamePhase::Running && self.level.pause().is_ok() {
                log::info!("Auto-paused ({reason})");
            }
        }

        fn touch_start(&mut self, at: Vec2) {
            self.touch_origin = Some(at);
            self.input.joystick = Vec2::ZERO;
        }

        fn touch_move(&mut self, at: Vec2) {
            if let Some(origin) = self.touch_origin {
                self.input.joystick = (at - origin) / JOYSTICK_RADIUS;
            }
        }

        fn touch_end(&mut self) {
            self.touch_origin = None;
            self.input.joystick = Vec2::ZERO;
        }
    }

    fn update_sync_badge(sync: &SharedSync) {
        let status = sync.status();
        let label = if status.offline {
            "offline"
        } else if status.syncing {
            "syncing"
        } else if status.pending_sync {
            "pending"
        } else {
            "synced"
        };
        set_text("#sync-status", label);
    }

    async fn refresh_leaderboard(sync: &SharedSync) {
        let board = match sync.leaderboard().await {
            Ok(board) => board,
            Err(e) => {
                log::warn!("Leaderboard unavailable: {e}");
                return;
            }
        };
        let Some(document) = document() else { return };
        let Some(list) = document.get_element_by_id("leaderboard-list") else {
            return;
        };

        list.set_text_content(None);
        for record in &board {
            let Ok(row) = document.create_element("li") else {
                continue;
            };
            row.set_text_content(Some(&format!(
                "{}  {}  {}",
                record.name,
                record.score,
                format_time(record.time)
            )));
            if let Err(e) = list.append_child(&row) {
                log::warn!("Failed to add leaderboard row: {e:?}");
            }
        }
    }

    pub async fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).map_err(js_error)?;

        log::info!("Robo Rush starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        // Hide loading indicator
        set_hidden("loading", true);

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or("no canvas")?
            .dyn_into()?;

        // Set canvas size
        let dpr = window.device_pixel_ratio();
        let width = (canvas.client_width() as f64 * dpr) as u32;
        let height = (canvas.client_height() as f64 * dpr) as u32;
        canvas.set_width(width);
        canvas.set_height(height);

        let storage = LocalStorage::open().map_err(js_error)?;
        let sync: SharedSync = Rc::new(ScoreSync::new(
            storage,
            HttpStore::new(""),
            platform::is_online(),
        ));
        let settings = Settings::load(sync.cache().storage());
        let audio = Rc::new(RefCell::new(AudioManager::new(&settings)));

        // Initialize WebGPU
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU,
            ..Default::default()
        });

        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .map_err(js_error)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(js_error)?;

        log::info!("Using adapter: {:?}", adapter.get_info().name);

        let mut render_state = RenderState::new(surface, &adapter, width, height)
            .await
            .map_err(js_error)?;
        render_state.reduced_motion = settings.reduced_motion;

        let seed = js_sys::Date::now() as u64;
        let game = Rc::new(RefCell::new(Game {
            level: Game::new_level(seed, &audio, &sync),
            render_state: Some(render_state),
            audio,
            sync: sync.clone(),
            settings,
            last_time: 0.0,
            input: TickInput::default(),
            touch_origin: None,
            frame_times: [0.0; 60],
            frame_index: 0,
            fps: 0,
        }));
        log::info!("Game initialized with seed: {}", seed);

        setup_input_handlers(&canvas, game.clone());
        setup_buttons(game.clone());
        setup_auto_pause(game.clone());
        setup_network_listeners(sync.clone());

        match sync.player_name() {
            Some(name) => {
                log::info!("Welcome back, {name}");
                game.borrow_mut().start();
                spawn_local(async move {
                    let outcome = sync.start_session().await;
                    log::info!("Session sync: {outcome:?}");
                    update_sync_badge(&sync);
                    refresh_leaderboard(&sync).await;
                });
            }
            None => setup_name_prompt(game.clone()),
        }

        // Start game loop
        request_animation_frame(game);

        log::info!("Robo Rush running!");
        Ok(())
    }

    fn canvas_point(canvas: &HtmlCanvasElement, event: &TouchEvent) -> Option<Vec2> {
        let touch = event.touches().get(0)?;
        let rect = canvas.get_bounding_client_rect();
        Some(Vec2::new(
            touch.client_x() as f32 - rect.left() as f32,
            touch.client_y() as f32 - rect.top() as f32,
        ))
    }

    fn add_listener<E: wasm_bindgen::convert::FromWasmAbi + 'static>(
        target: &web_sys::EventTarget,
        event: &str,
        handler: impl FnMut(E) + 'static,
    ) {
        let closure = Closure::<dyn FnMut(E)>::new(handler);
        if let Err(e) = target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
        {
            log::warn!("Failed to listen for {event}: {e:?}");
        }
        closure.forget();
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };

        // Keyboard
        {
            let game = game.clone();
            add_listener(&window, "keydown", move |event: KeyboardEvent| {
                let mut g = game.borrow_mut();
                // Browsers only allow audio after a user gesture
                g.audio.borrow().resume();
                if event.key().starts_with("Arrow") {
                    event.prevent_default();
                }
                g.handle_key(&event.key(), true, event.repeat());
            });
        }
        {
            let game = game.clone();
            add_listener(&window, "keyup", move |event: KeyboardEvent| {
                game.borrow_mut().handle_key(&event.key(), false, false);
            });
        }

        // Touch joystick
        {
            let game = game.clone();
            let canvas_clone = canvas.clone();
            add_listener(canvas, "touchstart", move |event: TouchEvent| {
                event.prevent_default();
                if let Some(at) = canvas_point(&canvas_clone, &event) {
                    let mut g = game.borrow_mut();
                    g.audio.borrow().resume();
                    g.touch_start(at);
                }
            });
        }
        {
            let game = game.clone();
            let canvas_clone = canvas.clone();
            add_listener(canvas, "touchmove", move |event: TouchEvent| {
                event.prevent_default();
                if let Some(at) = canvas_point(&canvas_clone, &event) {
                    game.borrow_mut().touch_move(at);
                }
            });
        }
        for name in ["touchend", "touchcancel"] {
            let game = game.clone();
            add_listener(canvas, name, move |_event: TouchEvent| {
                game.borrow_mut().touch_end();
            });
        }
    }

    fn setup_buttons(game: Rc<RefCell<Game>>) {
        let Some(document) = document() else { return };

        let bind = |id: &str, action: fn(&mut Game)| {
            if let Some(btn) = document.get_element_by_id(id) {
                let game = game.clone();
                add_listener(&btn, "click", move |_event: web_sys::Event| {
                    action(&mut game.borrow_mut());
                });
            }
        };

        bind("resume-btn", |g| {
            if let Err(e) = g.level.resume() {
                log::debug!("Resume ignored: {e}");
            }
        });
        bind("restart-btn", Game::restart);
        bind("play-again-btn", Game::restart);
        bind("next-level-btn", Game::restart);
        bind("boost-btn", |g| {
            if let Err(e) = g.level.activate_boost() {
                log::debug!("Boost unavailable: {e}");
            }
        });
        bind("autopilot-btn", |g| {
            if let Err(e) = g.level.activate_autopilot() {
                log::debug!("Autopilot unavailable: {e}");
            }
        });
        bind("mute-btn", Game::toggle_mute);
        bind("retry-sync-btn", |g| {
            let sync = g.sync.clone();
            spawn_local(async move {
                let outcome = sync.retry_sync().await;
                log::info!("Retry sync: {outcome:?}");
                update_sync_badge(&sync);
                if matches!(outcome, SyncOutcome::Pushed(_) | SyncOutcome::UpToDate(_)) {
                    refresh_leaderboard(&sync).await;
                }
            });
        });
    }

    fn setup_name_prompt(game: Rc<RefCell<Game>>) {
        let Some(document) = document() else { return };
        set_hidden("name-prompt", false);

        let Some(btn) = document.get_element_by_id("name-submit-btn") else {
            log::warn!("Name prompt missing; playing without a player name");
            game.borrow_mut().start();
            return;
        };

        add_listener(&btn, "click", move |_event: web_sys::Event| {
            let Some(input) = document
                .get_element_by_id("name-input")
                .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
            else {
                return;
            };
            let name = input.value();
            let game = game.clone();
            spawn_local(async move {
                let sync = game.borrow().sync.clone();
                match sync.register_player(&name).await {
                    Ok(name) => {
                        log::info!("Playing as {name}");
                        set_text("#name-error", "");
                        game.borrow_mut().start();
                        refresh_leaderboard(&sync).await;
                    }
                    Err(e) => {
                        log::warn!("Registration failed: {e}");
                        set_text("#name-error", &e.to_string());
                    }
                }
                update_sync_badge(&sync);
            });
        });
    }

    fn setup_auto_pause(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };
        let Some(document) = window.document() else { return };

        // Visibility change (tab switch, minimize)
        {
            let game = game.clone();
            let document_clone = document.clone();
            add_listener(&document, "visibilitychange", move |_event: web_sys::Event| {
                let mut g = game.borrow_mut();
                if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                    g.auto_pause("tab hidden");
                    g.audio.borrow().suspend();
                } else {
                    g.audio.borrow().resume();
                }
            });
        }

        // Window blur (click outside)
        {
            let game = game.clone();
            add_listener(&window, "blur", move |_event: web_sys::FocusEvent| {
                let mut g = game.borrow_mut();
                g.auto_pause("window blur");
                let mute = g.settings.mute_on_blur;
                g.audio.borrow_mut().set_blurred(mute);
            });
        }
        {
            let game = game.clone();
            add_listener(&window, "focus", move |_event: web_sys::FocusEvent| {
                game.borrow().audio.borrow_mut().set_blurred(false);
            });
        }

        // Release the audio context on unload
        add_listener(&window, "pagehide", move |_event: web_sys::Event| {
            let mut g = game.borrow_mut();
            g.level.dispose();
            g.audio.borrow_mut().close();
        });
    }

    fn setup_network_listeners(sync: SharedSync) {
        let Some(window) = web_sys::window() else { return };
        for (name, online) in [("online", true), ("offline", false)] {
            let sync = sync.clone();
            add_listener(&window, name, move |_event: web_sys::Event| {
                let sync = sync.clone();
                spawn_local(async move {
                    if let Some(outcome) = sync.set_online(online).await {
                        log::info!("Reconnected sync: {outcome:?}");
                    }
                    update_sync_badge(&sync);
                });
            });
        }
        update_sync_badge(&sync);
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();

            // Calculate delta time
            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                SIM_DT
            };
            g.last_time = time;

            g.update(dt, time);
            g.render();
            g.update_hud();
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    if let Err(e) = wasm_game::run().await {
        log::error!("Robo Rush failed to start: {e:?}");
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Robo Rush (native) starting...");
    log::info!("Native mode runs a headless autopilot demo - use `trunk serve` for the web version");

    if let Err(e) = headless_demo() {
        log::error!("Demo failed: {e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Play one level on autopilot against the in-memory store and print the board
#[cfg(not(target_arch = "wasm32"))]
fn headless_demo() -> Result<(), Box<dyn std::error::Error>> {
    use std::cell::Cell;
    use std::rc::Rc;

    use robo_rush::consts::LEVEL_DURATION_SECS;
    use robo_rush::leaderboard::format_time;
    use robo_rush::persistence::MemoryStorage;
    use robo_rush::secs_to_ticks;
    use robo_rush::sim::{LevelCallbacks, RunSummary, TickInput, create_level};
    use robo_rush::sync::{MemoryStore, ScoreSync};
    use robo_rush::{LevelConfig, platform};

    let sync = ScoreSync::new(MemoryStorage::new(), MemoryStore::new(), true);
    let name = pollster::block_on(sync.register_player("demo-bot"))?;

    let seed = platform::now_ms() as u64;
    let finished: Rc<Cell<Option<RunSummary>>> = Rc::new(Cell::new(None));
    let mut level = create_level(LevelConfig::default(), seed);
    {
        let finished = finished.clone();
        level.subscribe(
            LevelCallbacks::new()
                .lives(|lives| log::info!("Lives: {lives}"))
                .terminal(move |summary| finished.set(Some(summary))),
        );
    }
    level.start()?;

    // A little past the countdown; the level always ends by then
    let input = TickInput::default();
    for _ in 0..secs_to_ticks(LEVEL_DURATION_SECS + 5) {
        if level.state().autopilot.is_ready()
            && let Err(e) = level.activate_autopilot()
        {
            log::debug!("Autopilot not engaged: {e}");
        }
        level.step(&input);
        if finished.get().is_some() {
            break;
        }
    }

    let summary = finished.get().ok_or("level never reached a terminal state")?;
    println!(
        "\n{name}: {:?} with {} points in {}",
        level.phase(),
        summary.score,
        format_time(summary.elapsed_time)
    );

    let outcome = pollster::block_on(sync.record_run(&summary));
    log::info!("Sync: {outcome:?}");

    println!("\nLeaderboard:");
    for (rank, record) in pollster::block_on(sync.leaderboard())?.iter().enumerate() {
        println!(
            "{:>2}. {:<20} {:>6} {}",
            rank + 1,
            record.name,
            record.score,
            format_time(record.time)
        );
    }
    Ok(())
}
