// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::Result;
use std::env;
use std::io::Write;
use std::path::Path;

use formaliza::{
    export_csv, load_collection, Collection, Config, CrossFilterEngine, FilterState,
    SupabaseSource,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let cfg = Config::from_env();
    cfg.validate()?;
    let source = SupabaseSource::new(&cfg);

    match args.get(1).map(String::as_str) {
        Some("summary") => run_summary(&cfg, &source).await,
        Some("export") => run_export(&cfg, &source, args.get(2).map(String::as_str)).await,
        _ => run_ui_mode(&cfg, &source).await,
    }
}

/// Headless mode: load everything and print the aggregate bundle.
async fn run_summary(cfg: &Config, source: &SupabaseSource) -> Result<()> {
    println!("📊 Formaliza BI - aggregate summary");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let collection = load_collection(source, cfg.page_size).await?;
    println!("✓ Loaded {} records from {}", collection.len(), cfg.table);

    let engine = CrossFilterEngine::new(cfg.completed_statuses.clone());
    let (_, agg) = engine.apply(&collection.records, &FilterState::default());

    println!("\nVolume total:     R$ {:.2}", agg.total_value);
    println!("Propostas:        {}", agg.count);
    println!("Ticket médio:     R$ {:.2}", agg.average_value);
    println!("Índice entrega:   {:.1}%", agg.completion_rate);
    println!("Abrangência:      {} UFs", agg.region_ranking.len());

    println!("\nRanking regional:");
    for (i, entry) in agg.region_ranking.iter().take(10).enumerate() {
        println!("  {:>2}. {:<4} {:>6}", i + 1, entry.region, entry.count);
    }

    println!("\nTendência anual:");
    for entry in &agg.yearly_trend {
        println!("  {:<6} R$ {:.2}", entry.year, entry.total);
    }

    Ok(())
}

/// Headless mode: load everything and write the spreadsheet export.
async fn run_export(cfg: &Config, source: &SupabaseSource, path: Option<&str>) -> Result<()> {
    let path = Path::new(path.unwrap_or("formaliza_export.csv"));

    println!("📂 Loading {} ...", cfg.table);
    let collection = load_collection(source, cfg.page_size).await?;
    println!("✓ Loaded {} records", collection.len());

    let written = export_csv(&collection.records, path)?;
    println!("✓ Wrote {} rows to {}", written, path.display());

    Ok(())
}

/// Blocking retry loop for the initial load: a transport failure keeps the
/// user on a retry prompt instead of a half-drawn dashboard.
async fn load_with_retry(cfg: &Config, source: &SupabaseSource) -> Result<Option<Collection>> {
    loop {
        print!("📊 Loading {} ... ", cfg.table);
        std::io::stdout().flush()?;

        match load_collection(source, cfg.page_size).await {
            Ok(collection) => {
                println!("✓ {} records", collection.len());
                return Ok(Some(collection));
            }
            Err(err) => {
                println!("✗");
                eprintln!("Load failed: {}", err);
                print!("Retry? [y/N] ");
                std::io::stdout().flush()?;

                let mut answer = String::new();
                std::io::stdin().read_line(&mut answer)?;
                if !answer.trim().eq_ignore_ascii_case("y") {
                    return Ok(None);
                }
            }
        }
    }
}

#[cfg(feature = "tui")]
async fn run_ui_mode(cfg: &Config, source: &SupabaseSource) -> Result<()> {
    use formaliza::BatchEditor;

    let engine = CrossFilterEngine::new(cfg.completed_statuses.clone());
    let mut editor = BatchEditor::new();
    let mut filter = FilterState::default();
    let mut notice: Option<String> = None;

    loop {
        let Some(collection) = load_with_retry(cfg, source).await? else {
            return Ok(());
        };

        let mut app = ui::App::new(&engine, &mut editor, collection, filter, notice.take());
        let exit = ui::run_ui(&mut app)?;
        filter = app.filter.clone();
        drop(app);

        match exit {
            ui::UiExit::Quit => break,
            ui::UiExit::Reload => {
                notice = Some("Base recarregada".to_string());
            }
            ui::UiExit::Flush => {
                // Succeeded updates are committed either way; the reload on
                // the next loop turn picks them up. Failed records keep their
                // edits staged for a manual retry.
                notice = Some(match editor.flush(source).await {
                    Ok(n) => format!("{} registros atualizados", n),
                    Err(err) => format!("Falha parcial: {}", err),
                });
            }
        }
    }

    Ok(())
}

#[cfg(not(feature = "tui"))]
async fn run_ui_mode(_cfg: &Config, _source: &SupabaseSource) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API server: cargo run --bin formaliza-server --features server");
    std::process::exit(1);
}
