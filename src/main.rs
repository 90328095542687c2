use eframe::egui;
use mask_label::app::{LabelApp, TITLE};
use mask_label::config::{CliArgs, Config};

fn main() {
    let args = match CliArgs::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{}", msg);
            eprintln!("{}", CliArgs::USAGE);
            std::process::exit(1);
        }
    };

    let (config, config_err) = Config::load_or_default(args.config.as_deref());
    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .init();
    if let Some((path, e)) = config_err {
        log::warn!("Ignoring config {}: {}", path.display(), e);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title(TITLE),
        ..Default::default()
    };

    let archive = args.archive;
    if let Err(e) = eframe::run_native(
        TITLE,
        options,
        Box::new(move |_cc| Ok(Box::new(LabelApp::new(config, archive)))),
    ) {
        log::error!("Failed to run eframe: {}", e);
        std::process::exit(1);
    }
}
