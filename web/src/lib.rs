use wasm_bindgen::prelude::*;

mod host;
mod settings;
mod utils;

pub use host::Minesweeper;

#[wasm_bindgen(start)]
pub fn run_app() -> Result<(), JsValue> {
    #[cfg(feature = "console_error_panic_hook")]
    {
        console_error_panic_hook::set_once();
    }

    let args = settings::Args::from_location().map_err(utils::to_js_error)?;
    if let Some(log_level) = args.verbose.log_level() {
        console_log::init_with_level(log_level).map_err(utils::to_js_error)?;
    }
    log::debug!("seed: {:?}", args.seed);

    log::debug!("App started");
    Ok(())
}
