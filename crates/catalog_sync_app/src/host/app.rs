use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use catalog_sync_core::{update, AppState, Msg};
use catalog_sync_engine::EngineHandle;
use sync_logging::{sync_info, sync_warn};

use super::commands::{self, Command, HELP};
use super::config::SyncConfig;
use super::effects::{EffectRunner, HostOutput};
use super::render;

const IDLE_SLEEP: Duration = Duration::from_millis(20);

enum Input {
    Line(String),
    Closed,
}

pub fn run(config: SyncConfig) -> anyhow::Result<()> {
    let engine = EngineHandle::new(config.api_settings())?;
    let mut session = Session::new(AppState::with_settings(config.sync_settings()), engine);

    let (input_tx, input_rx) = mpsc::channel::<Input>();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if input_tx.send(Input::Line(line)).is_err() {
                        return;
                    }
                }
                Err(err) => {
                    sync_warn!("Reading console input failed: {}", err);
                    break;
                }
            }
        }
        let _ = input_tx.send(Input::Closed);
    });

    for job in &config.jobs {
        session.dispatch(Msg::JobRegistered {
            job_id: job.job_id.clone(),
            provider: job.provider.clone(),
            mode: job.mode.into(),
        });
    }
    session.dispatch(Msg::SessionStarted);
    sync_info!("Session started against {}", config.base_url);
    println!("Type 'help' for commands.");

    loop {
        let mut idle = true;
        while let Ok(input) = input_rx.try_recv() {
            idle = false;
            let line = match input {
                Input::Line(line) => line,
                Input::Closed => return Ok(()),
            };
            match commands::parse_line(&line) {
                Ok(Some(Command::Msg(msg))) => session.dispatch(msg),
                Ok(Some(Command::Render)) => session.render(true),
                Ok(Some(Command::Help)) => println!("{HELP}"),
                Ok(Some(Command::Quit)) => return Ok(()),
                Ok(None) => {}
                Err(err) => println!("{err:#}"),
            }
        }
        for msg in session.runner.drain_events() {
            idle = false;
            session.dispatch(msg);
        }
        if idle {
            thread::sleep(IDLE_SLEEP);
        }
    }
}

struct Session {
    state: AppState,
    runner: EffectRunner,
    last_frame: String,
}

impl Session {
    fn new(state: AppState, engine: EngineHandle) -> Self {
        Self {
            state,
            runner: EffectRunner::new(engine),
            last_frame: String::new(),
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;

        for output in self.runner.run(effects) {
            match output {
                HostOutput::Notify(notification) => {
                    println!("{}", render::render_notification(&notification))
                }
                HostOutput::Open(item) => println!("{}", render::render_opened(&item)),
            }
        }

        if self.state.consume_dirty() {
            self.render(false);
        }
    }

    /// Prints the current frame unless it is identical to the last one.
    fn render(&mut self, force: bool) {
        let frame = render::render(&self.state.view());
        if force || frame != self.last_frame {
            print!("{frame}");
            let _ = io::stdout().flush();
            self.last_frame = frame;
        }
    }
}
