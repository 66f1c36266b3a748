use std::error::Error;
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event as CEvent},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use log::{error, info};
use tui::{backend::CrosstermBackend, Terminal};

use popdash::app::App;
use popdash::census;
use popdash::config::Config;
use popdash::ui::{self, Event};

fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env();
    init_logging(&config.log_path)?;
    info!("starting with {:?}", config);

    // Loaded once; every view below borrows it.
    let (table, age_columns) = match census::load(&config.csv_path, &config.encoding) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("load failed: {}", e);
            eprintln!("popdash: {}", e);
            return Err(e.into());
        }
    };
    info!("{} age columns, first {:?}", age_columns.len(), age_columns.first());

    let mut app = App::new(&table, &config);

    let stdout = io::stdout();
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    enable_raw_mode()?;

    let (tx, rx) = mpsc::channel();
    let tick_rate = Duration::from_millis(config.tick_rate_ms);
    thread::spawn(move || {
        let mut last_tick = Instant::now();
        loop {
            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_secs(0));

            match event::poll(timeout) {
                Ok(true) => {
                    if let Ok(CEvent::Key(key)) = event::read() {
                        if tx.send(Event::Input(key)).is_err() {
                            return;
                        }
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    error!("terminal input failed: {}", e);
                    return;
                }
            }

            if last_tick.elapsed() >= tick_rate {
                if tx.send(Event::Tick).is_err() {
                    return;
                }
                last_tick = Instant::now();
            }
        }
    });

    let result = ui::run(&mut terminal, &mut app, &rx);

    // Restore the shell whichever way the loop ended.
    let restored = disable_raw_mode()
        .and_then(|_| terminal.clear())
        .and_then(|_| terminal.show_cursor());
    if let Err(e) = &result {
        error!("dashboard stopped: {}", e);
    }
    result?;
    restored?;
    info!("bye");
    Ok(())
}

fn init_logging(path: &Path) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}
