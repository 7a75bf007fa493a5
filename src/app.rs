//! The cooperative control loop, independent of the concrete board.
//!
//! `App` owns every piece of runtime state. The caller supplies the clock
//! and calls [`App::poll`] in a loop; the backlight runs on a fast period,
//! quotes on the board's slow period, and a tap on the touch board opens
//! the settings screen.

use embedded_graphics::{pixelcolor::Rgb565, prelude::*};
use log::{info, warn};

use crate::backlight::BacklightController;
use crate::board::{BoardConfig, BACKLIGHT_TICK_MS, LOOP_IDLE_MS};
use crate::hal::{Clock, LightSensor, NoPrefsStore, PrefsStore, PwmOutput, QuoteTransport, TouchInput};
use crate::prefs::UiPreferences;
use crate::quote::{self, QuoteRecord};
use crate::render;
use crate::schedule::Periodic;
use crate::settings;
use crate::touch::TapTracker;

/// What the panel currently shows; redrawn after the settings screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Blank,
    Quote(QuoteRecord),
    Error(String),
}

pub struct App<D, L, P, N> {
    board: BoardConfig,
    display: D,
    light: L,
    pwm: P,
    net: N,
    touch: Option<Box<dyn TouchInput>>,
    store: Box<dyn PrefsStore>,
    taps: TapTracker,
    backlight: BacklightController,
    prefs: UiPreferences,
    quote_url: String,
    backlight_tick: Periodic,
    refresh: Periodic,
    screen: Screen,
}

impl<D, L, P, N> App<D, L, P, N>
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: core::fmt::Debug,
    L: LightSensor,
    P: PwmOutput,
    N: QuoteTransport,
{
    pub fn new(board: BoardConfig, display: D, light: L, pwm: P, net: N, quote_url: &str) -> Self {
        Self {
            backlight: BacklightController::new(board.backlight),
            backlight_tick: Periodic::new(BACKLIGHT_TICK_MS, 0),
            refresh: Periodic::new(board.refresh_ms, 0),
            board,
            display,
            light,
            pwm,
            net,
            touch: None,
            store: Box::new(NoPrefsStore),
            taps: TapTracker::new(),
            prefs: UiPreferences::default(),
            quote_url: quote_url.to_string(),
            screen: Screen::Blank,
        }
    }

    /// Attach the touch panel and preference store, loading saved prefs.
    pub fn with_touch(mut self, touch: Box<dyn TouchInput>, mut store: Box<dyn PrefsStore>) -> Self {
        if let Some(saved) = store.load() {
            info!("Loaded display prefs: {:?}", saved);
            self.prefs = saved.sanitized();
        }
        self.touch = Some(touch);
        self.store = store;
        self
    }

    pub fn prefs(&self) -> &UiPreferences {
        &self.prefs
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn backlight(&self) -> &BacklightController {
        &self.backlight
    }

    /// Full brightness, then the first quote. A failed first fetch shows
    /// the placeholder quote instead of an error.
    pub fn boot(&mut self, now_ms: u32) {
        self.pwm.set_duty(self.backlight.startup_duty());
        info!("Backlight on (PWM)");

        match quote::fetch_quote(&mut self.net, &self.quote_url) {
            Ok(record) => self.screen = Screen::Quote(record),
            Err(e) => {
                warn!("Fetch failed: {}", e);
                self.screen = Screen::Quote(QuoteRecord::placeholder());
            }
        }
        self.paint();
        self.backlight_tick.reset(now_ms);
        self.refresh.reset(now_ms);
    }

    /// One pass of the control loop, without the idle sleep.
    pub fn poll(&mut self, clock: &mut dyn Clock) {
        let now = clock.now_ms();
        self.backlight_step(now);
        self.quote_step(now);
        self.touch_step(clock);
    }

    /// Loop forever: `poll` plus the idle sleep.
    pub fn run(&mut self, clock: &mut dyn Clock) -> ! {
        info!("Entering main loop");
        loop {
            self.poll(clock);
            clock.sleep_ms(LOOP_IDLE_MS);
        }
    }

    pub fn backlight_step(&mut self, now_ms: u32) {
        if !self.backlight_tick.due(now_ms) {
            return;
        }
        let raw = if self.board.backlight.sensor_enabled {
            self.light.read_raw()
        } else {
            0
        };
        self.backlight.tick(raw, now_ms, &mut self.pwm);
    }

    pub fn quote_step(&mut self, now_ms: u32) {
        if !self.refresh.due(now_ms) {
            return;
        }
        info!("Refreshing quote...");
        self.screen = match quote::fetch_quote(&mut self.net, &self.quote_url) {
            Ok(record) => Screen::Quote(record),
            Err(e) => {
                warn!("Refresh failed: {}", e);
                Screen::Error(e.to_string())
            }
        };
        self.paint();
    }

    /// Poll the touch panel; a completed tap opens the settings screen.
    pub fn touch_step(&mut self, clock: &mut dyn Clock) {
        let Some(touch) = self.touch.as_mut() else {
            return;
        };
        let Some(tap) = self.taps.update(touch.poll_point()) else {
            return;
        };
        info!("Tap at ({}, {}) -> settings", tap.x, tap.y);

        match settings::run(&mut self.display, &mut **touch, clock, &mut *self.store, self.prefs) {
            Ok(outcome) => {
                info!("Settings closed ({:?}, changed={})", outcome.exit, outcome.changed);
                self.prefs = outcome.prefs;
            }
            Err(e) => warn!("Settings screen failed: {}", e),
        }
        // the settings loop swallowed the release of its last tap
        self.taps = TapTracker::new();
        self.paint();
    }

    fn paint(&mut self) {
        let result = match &self.screen {
            Screen::Blank => self.display.clear(self.prefs.background()),
            Screen::Quote(record) => render::show_quote(&mut self.display, &self.prefs, record),
            Screen::Error(reason) => render::show_error(&mut self.display, &self.prefs, reason),
        };
        if let Err(e) = result {
            warn!("Display draw failed: {:?}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardVariant;
    use anyhow::{anyhow, Result};
    use crate::hal::HttpResponse;
    use crate::palette;
    use core::convert::Infallible;
    use embedded_graphics::primitives::Rectangle;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Default)]
    struct Panel {
        clears: Vec<Rgb565>,
    }

    impl Dimensions for Panel {
        fn bounding_box(&self) -> Rectangle {
            Rectangle::new(Point::zero(), Size::new(320, 240))
        }
    }

    impl DrawTarget for Panel {
        type Color = Rgb565;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            pixels.into_iter().for_each(drop);
            Ok(())
        }

        fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
            self.clears.push(color);
            Ok(())
        }
    }

    struct SteadyLight(u16);

    impl LightSensor for SteadyLight {
        fn read_raw(&mut self) -> u16 {
            self.0
        }
    }

    #[derive(Default)]
    struct DutyLog(Vec<u8>);

    impl PwmOutput for DutyLog {
        fn set_duty(&mut self, duty: u8) {
            self.0.push(duty);
        }
    }

    struct Net {
        replies: VecDeque<HttpResponse>,
        calls: usize,
    }

    impl Net {
        fn new(replies: &[(u16, &str)]) -> Self {
            Self {
                replies: replies
                    .iter()
                    .map(|(status, body)| HttpResponse { status: *status, body: body.to_string() })
                    .collect(),
                calls: 0,
            }
        }
    }

    impl QuoteTransport for Net {
        fn link_up(&self) -> bool {
            true
        }

        fn get(&mut self, _url: &str) -> Result<HttpResponse> {
            self.calls += 1;
            self.replies.pop_front().ok_or_else(|| anyhow!("timeout"))
        }
    }

    struct FakeClock {
        now: u32,
    }

    impl Clock for FakeClock {
        fn now_ms(&self) -> u32 {
            self.now
        }

        fn sleep_ms(&mut self, ms: u32) {
            self.now = self.now.wrapping_add(ms);
        }
    }

    struct ScriptedTouch(VecDeque<Option<Point>>);

    impl TouchInput for ScriptedTouch {
        fn poll_point(&mut self) -> Option<Point> {
            self.0.pop_front().flatten()
        }
    }

    #[derive(Clone, Default)]
    struct SharedStore(Rc<RefCell<Vec<UiPreferences>>>);

    impl PrefsStore for SharedStore {
        fn load(&mut self) -> Option<UiPreferences> {
            self.0.borrow().last().copied()
        }

        fn save(&mut self, prefs: &UiPreferences) -> Result<()> {
            self.0.borrow_mut().push(*prefs);
            Ok(())
        }
    }

    const GOOD: &str = r#"[{"q":"Simplicity is the soul of efficiency","a":"Austin Freeman"}]"#;

    fn basic_app(replies: &[(u16, &str)]) -> App<Panel, SteadyLight, DutyLog, Net> {
        let board = BoardConfig::for_variant(BoardVariant::Basic);
        App::new(board, Panel::default(), SteadyLight(1500), DutyLog::default(), Net::new(replies), quote::DEFAULT_QUOTE_URL)
    }

    #[test]
    fn boot_failure_shows_placeholder() {
        let mut app = basic_app(&[(503, "")]);
        app.boot(0);
        assert_eq!(app.screen(), &Screen::Quote(QuoteRecord::placeholder()));
        assert_eq!(app.pwm.0, vec![255]);
        assert_eq!(app.display.clears.len(), 1);
    }

    #[test]
    fn refresh_failure_shows_error_reason() {
        let mut app = basic_app(&[(200, GOOD), (500, "")]);
        app.boot(0);
        assert!(matches!(app.screen(), Screen::Quote(q) if q.author_name == "Austin Freeman"));
        app.quote_step(60_000);
        assert_eq!(app.net.calls, 1);
        app.quote_step(60_001);
        assert_eq!(app.screen(), &Screen::Error("HTTP error 500".to_string()));
        assert_eq!(app.display.clears.len(), 2);
    }

    #[test]
    fn loop_runs_backlight_fast_and_quotes_slow() {
        let mut app = basic_app(&[(200, GOOD), (200, GOOD)]);
        app.boot(0);
        let mut clock = FakeClock { now: 0 };
        while clock.now < 61_000 {
            app.poll(&mut clock);
            clock.sleep_ms(LOOP_IDLE_MS);
        }
        // one boot fetch plus one refresh
        assert_eq!(app.net.calls, 2);
        // startup duty plus roughly ten ticks a second
        let ticks = app.pwm.0.len() - 1;
        assert!((550..=620).contains(&ticks), "{} ticks", ticks);
        let cfg = app.backlight().config();
        assert!(app.pwm.0.iter().all(|d| (cfg.duty_min..=cfg.duty_max).contains(d)));
    }

    #[test]
    fn disabled_sensor_pins_full_brightness() {
        let mut board = BoardConfig::for_variant(BoardVariant::Basic);
        board.backlight.sensor_enabled = false;
        let mut app = App::new(board, Panel::default(), SteadyLight(0), DutyLog::default(), Net::new(&[]), "");
        app.backlight_step(101);
        app.backlight_step(202);
        assert_eq!(app.pwm.0, vec![255, 255]);
    }

    #[test]
    fn tap_opens_settings_and_restyles_quote() {
        let store = SharedStore::default();
        let mut samples = VecDeque::new();
        // tap on the quote screen, then Size ">" and Done inside settings
        for p in [Point::new(160, 120), Point::new(292, 142 + 14), Point::new(270, 206)] {
            samples.push_back(Some(p));
            samples.push_back(None);
        }
        let board = BoardConfig::for_variant(BoardVariant::TouchSetup);
        let mut app = App::new(board, Panel::default(), SteadyLight(1500), DutyLog::default(), Net::new(&[(200, GOOD)]), "")
            .with_touch(Box::new(ScriptedTouch(samples)), Box::new(store.clone()));
        app.boot(0);

        let mut clock = FakeClock { now: 10 };
        app.touch_step(&mut clock);
        assert_eq!(app.prefs().size_multiplier, 2);
        app.touch_step(&mut clock);

        assert_eq!(app.prefs().size_multiplier, 3);
        assert_eq!(store.0.borrow().len(), 1);
        // settings screen clear, then the quote repainted in the quote colors
        let clears = &app.display.clears;
        assert_eq!(clears[clears.len() - 2], palette::SETTINGS_BG);
        assert_eq!(clears[clears.len() - 1], app.prefs().background());
        assert!(matches!(app.screen(), Screen::Quote(_)));
    }

    #[test]
    fn saved_prefs_are_loaded_with_touch() {
        let store = SharedStore::default();
        let saved = UiPreferences { size_multiplier: 1, ..UiPreferences::default() };
        store.0.borrow_mut().push(saved);
        let board = BoardConfig::for_variant(BoardVariant::TouchSetup);
        let app = App::new(board, Panel::default(), SteadyLight(1500), DutyLog::default(), Net::new(&[]), "")
            .with_touch(Box::new(ScriptedTouch(VecDeque::new())), Box::new(store));
        assert_eq!(app.prefs(), &saved);
    }

    #[derive(Debug)]
    struct BusFault;

    struct DeadPanel;

    impl Dimensions for DeadPanel {
        fn bounding_box(&self) -> Rectangle {
            Rectangle::new(Point::zero(), Size::new(320, 240))
        }
    }

    impl DrawTarget for DeadPanel {
        type Color = Rgb565;
        type Error = BusFault;

        fn draw_iter<I>(&mut self, _pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            Err(BusFault)
        }
    }

    #[test]
    fn draw_errors_do_not_stop_the_loop() {
        let board = BoardConfig::for_variant(BoardVariant::Basic);
        let mut app = App::new(board, DeadPanel, SteadyLight(1500), DutyLog::default(), Net::new(&[(200, GOOD)]), "");
        app.boot(0);
        assert_eq!(
            app.screen(),
            &Screen::Quote(QuoteRecord::new("Simplicity is the soul of efficiency", "Austin Freeman"))
        );
        let mut clock = FakeClock { now: 0 };
        app.poll(&mut clock);
    }
}
