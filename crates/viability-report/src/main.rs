mod bootstrap;

use anyhow::Result;
use viability_core::settings::Settings;
use viability_data::reports::{select_year, ViabilityReport};
use viability_runtime::data_manager::DataManager;
use viability_ui::app::App;
use viability_ui::text_view;

fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("viability-report v{} starting", env!("CARGO_PKG_VERSION"));

    let data_dir = bootstrap::resolve_data_dir(&settings.data_dir);
    tracing::info!(
        "Data dir: {}, View: {}, Theme: {}",
        data_dir.display(),
        settings.view,
        settings.theme
    );

    let mut manager = DataManager::new(settings.cache_ttl, data_dir);

    if settings.is_interactive() {
        App::new(&settings.theme, manager, settings.year).run()?;
        return Ok(());
    }

    let dataset = manager.get_data(false);
    tracing::info!("{}", text_view::render_load_summary(&dataset.report));

    let year = select_year(dataset, settings.year)?;
    let report = ViabilityReport::build(dataset, year)?;
    print!("{}", text_view::render_report_text(&report));

    Ok(())
}
