use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use atomsweeper_core as game;
use game::{GridEngine, Intent, TickScheduler, Update};
use gloo::timers::callback::Interval;
use wasm_bindgen::prelude::*;

use crate::settings::Args;
use crate::utils::*;

const TICK_MILLIS: u32 = 1_000;

/// Starts one browser interval per game session.
pub(crate) struct IntervalScheduler {
    on_tick: Rc<dyn Fn()>,
}

impl IntervalScheduler {
    fn new(on_tick: impl Fn() + 'static) -> Self {
        Self {
            on_tick: Rc::new(on_tick),
        }
    }
}

impl fmt::Debug for IntervalScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntervalScheduler").finish_non_exhaustive()
    }
}

impl TickScheduler for IntervalScheduler {
    type Handle = TickHandle;

    fn schedule(&mut self) -> Self::Handle {
        let on_tick = Rc::clone(&self.on_tick);
        TickHandle(Interval::new(TICK_MILLIS, move || on_tick()))
    }
}

/// Running interval; dropping it clears the interval.
pub(crate) struct TickHandle(Interval);

impl fmt::Debug for TickHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TickHandle").finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct HostState {
    engine: GridEngine<IntervalScheduler>,
    on_update: js_sys::Function,
}

/// Minesweeper engine handle for the page script.
///
/// Every call that changes the board passes an `Update` object (`{ changed, status, stats }`) to
/// the `on_update` callback given to the constructor; timer ticks pass one with no changed cells.
#[wasm_bindgen]
#[derive(Debug)]
pub struct Minesweeper {
    state: Rc<RefCell<HostState>>,
}

#[wasm_bindgen]
impl Minesweeper {
    #[wasm_bindgen(constructor)]
    pub fn new(on_update: js_sys::Function) -> Result<Minesweeper, JsValue> {
        let args = Args::from_location().map_err(to_js_error)?;
        let seed = args.seed.unwrap_or_else(js_random_seed);
        log::debug!("seed: {seed}, difficulty: {}", args.difficulty);

        let state = Rc::new_cyclic(|weak: &Weak<RefCell<HostState>>| {
            let weak = weak.clone();
            let scheduler = IntervalScheduler::new(move || {
                if let Some(state) = weak.upgrade() {
                    on_tick(&state);
                }
            });

            RefCell::new(HostState {
                engine: GridEngine::new(args.difficulty.config(), scheduler, seed),
                on_update,
            })
        });

        Ok(Self { state })
    }

    #[wasm_bindgen(js_name = activateCell)]
    pub fn activate_cell(&self, row: u8, col: u8) -> Result<(), JsValue> {
        log::debug!("reveal cell: {:?}", (row, col));
        self.apply(Intent::Activate((row, col)))
    }

    #[wasm_bindgen(js_name = toggleFlag)]
    pub fn toggle_flag(&self, row: u8, col: u8) -> Result<(), JsValue> {
        log::debug!("mark cell: {:?}", (row, col));
        self.apply(Intent::ToggleFlag((row, col)))
    }

    /// Keyboard activation on a focused cell. Returns whether the key was bound.
    #[wasm_bindgen(js_name = keyDown)]
    pub fn key_down(&self, row: u8, col: u8, key: &str) -> Result<bool, JsValue> {
        match Intent::from_key(key, (row, col)) {
            Some(intent) => self.apply(intent).map(|()| true),
            None => Ok(false),
        }
    }

    pub fn configure(&self, rows: u8, cols: u8, mines: u16) -> Result<(), JsValue> {
        let config = game::GameConfig::new((rows, cols), mines).map_err(to_js_error)?;
        self.apply(Intent::Configure(config))
    }

    #[wasm_bindgen(js_name = setDifficulty)]
    pub fn set_difficulty(&self, name: &str) -> Result<(), JsValue> {
        let difficulty = name.parse::<game::Difficulty>().map_err(to_js_error)?;
        self.apply(Intent::SetDifficulty(difficulty))
    }

    pub fn reset(&self) -> Result<(), JsValue> {
        self.apply(Intent::Reset)
    }

    /// Name of the active preset, if the board matches one.
    pub fn difficulty(&self) -> Option<String> {
        let config = self.state.borrow().engine.config();
        game::Difficulty::from_config(config).map(|difficulty| difficulty.to_string())
    }

    /// Full `Update` covering every cell, for the initial draw.
    pub fn board(&self) -> Result<JsValue, JsValue> {
        to_js(&self.state.borrow().engine.full_update())
    }

    pub fn stats(&self) -> Result<JsValue, JsValue> {
        to_js(&self.state.borrow().engine.stats())
    }

    fn apply(&self, intent: Intent) -> Result<(), JsValue> {
        let (update, on_update) = {
            let mut state = self.state.borrow_mut();
            let update = state.engine.apply(intent).map_err(to_js_error)?;
            (update, state.on_update.clone())
        };

        if update.has_update() {
            notify(&on_update, &update)?;
        }
        Ok(())
    }
}

fn on_tick(state: &RefCell<HostState>) {
    let (update, on_update) = {
        let mut state = state.borrow_mut();
        let Some(stats) = state.engine.tick() else {
            return;
        };
        let update = Update {
            changed: Vec::new(),
            status: state.engine.status(),
            stats,
        };
        (update, state.on_update.clone())
    };

    if let Err(err) = notify(&on_update, &update) {
        log::error!("failed to deliver tick: {:?}", err);
    }
}

/// Calls the page callback outside of any borrow so it may call back into the handle.
fn notify(on_update: &js_sys::Function, update: &Update) -> Result<(), JsValue> {
    let value = to_js(update)?;
    on_update.call1(&JsValue::NULL, &value)?;
    Ok(())
}
