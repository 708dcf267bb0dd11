// GUI-subsystem binary: no console window is ever allocated by Windows.
#![windows_subsystem = "windows"]

use eframe::egui;
use mathboard::app::MathBoardApp;
use mathboard::logger;
use mathboard::recognition::service_base_url;

fn main() -> Result<(), eframe::Error> {
    // Initialize session log (overwrites previous session log)
    logger::init();

    // Resolve the recognition service endpoint once, before the UI starts.
    let base_url = service_base_url();
    mathboard::log_info!("recognition service: {}", base_url);

    // Define the native window options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_maximized(true)
            .with_title("MathBoard"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "MathBoard",
        options,
        Box::new(move |cc| Box::new(MathBoardApp::new(cc, base_url))),
    )
}
